//! The MCP server: JSON-RPC over a single HTTP POST endpoint.

pub mod protocol;
pub mod server;

pub use server::{build_router, run_server, AppState};
