use thiserror::Error;

/// Errors surfaced by the robot client.
///
/// Every capability method returns `Result<_, RobotError>` so callers see a
/// categorized failure instead of a logged-and-swallowed `false`.
#[derive(Error, Debug)]
pub enum RobotError {
    /// Transport-level failure talking to the controller.
    #[error("link error: {0}")]
    Link(String),

    /// The controller answered with an error payload.
    #[error("command rejected: {0}")]
    Rejected(String),

    /// A movement command was issued before `base.start` succeeded.
    #[error("base is not started; call base/start first")]
    NotReady,

    /// A parameter was outside its documented range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The controller's reply could not be interpreted.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RobotError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
