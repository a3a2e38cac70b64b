//! Voice model resolution: turn a model source string into files on disk.
//!
//! A source is either a local filesystem path to a `.onnx` model or an
//! `https://` URL. Remote models are downloaded once into the model
//! cache directory and reused afterwards; the `.onnx.json` config
//! sidecar is fetched alongside the model.

use crate::voice::error::VoiceError;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A resolved voice model: the `.onnx` weights plus its JSON sidecar.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModel {
    pub model_path: PathBuf,
    pub config_path: PathBuf,
}

/// Maps a model source string to files on disk.
///
/// Resolution failures surface as [`VoiceError::ModelLoad`]: a model the
/// engine never received is a model that failed to load.
pub trait ModelResolver: Send + Sync {
    fn resolve(&self, source: &str) -> Result<ResolvedModel, VoiceError>;
}

/// Resolver that serves local paths directly and caches downloads.
pub struct CachingResolver {
    model_dir: PathBuf,
}

impl CachingResolver {
    pub fn new(model_dir: PathBuf) -> Self {
        Self { model_dir }
    }

    fn cache_path(&self, url: &str) -> PathBuf {
        // Keyed by URL hash so distinct voices with the same basename
        // never collide in the cache.
        let digest = hex::encode(Sha256::digest(url.as_bytes()));
        let stem = Path::new(url)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("voice");
        self.model_dir.join(format!("{stem}-{}.onnx", &digest[..12]))
    }

    fn download(&self, url: &str, dest: &Path) -> Result<(), VoiceError> {
        let response = reqwest::blocking::get(url)
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| VoiceError::ModelLoad(format!("download {url}: {e}")))?;
        let bytes = response
            .bytes()
            .map_err(|e| VoiceError::ModelLoad(format!("download {url}: {e}")))?;
        fs::write(dest, &bytes)
            .map_err(|e| VoiceError::ModelLoad(format!("write {}: {e}", dest.display())))?;
        info!(url, dest = %dest.display(), bytes = bytes.len(), "Downloaded voice model");
        Ok(())
    }

    /// Fetch model and sidecar through temporary names, renaming into
    /// place only once both downloads succeeded. An interrupted fetch
    /// leaves no files at the final paths, so the entry stays
    /// re-fetchable instead of poisoning the cache.
    fn fetch_pair(&self, source: &str, model_path: &Path, config_path: &Path) -> Result<(), VoiceError> {
        let model_tmp = part_path(model_path);
        let config_tmp = part_path(config_path);

        self.download(source, &model_tmp)?;
        if let Err(e) = self.download(&format!("{source}.json"), &config_tmp) {
            let _ = fs::remove_file(&model_tmp);
            return Err(e);
        }

        rename_into_place(&config_tmp, config_path)?;
        rename_into_place(&model_tmp, model_path)
    }
}

impl ModelResolver for CachingResolver {
    fn resolve(&self, source: &str) -> Result<ResolvedModel, VoiceError> {
        if source.starts_with("https://") || source.starts_with("http://") {
            fs::create_dir_all(&self.model_dir).map_err(|e| {
                VoiceError::ModelLoad(format!("create {}: {e}", self.model_dir.display()))
            })?;
            let model_path = self.cache_path(source);
            let config_path = sidecar_path(&model_path);
            // A hit requires the complete pair; a model missing its
            // sidecar is a broken entry and gets re-fetched.
            if model_path.exists() && config_path.exists() {
                debug!(model = %model_path.display(), "Voice model cache hit");
            } else {
                self.fetch_pair(source, &model_path, &config_path)?;
            }
            return Ok(ResolvedModel {
                model_path,
                config_path,
            });
        }

        let model_path = PathBuf::from(shellexpand::tilde(source).into_owned());
        if !model_path.exists() {
            return Err(VoiceError::ModelLoad(format!(
                "no such file: {}",
                model_path.display()
            )));
        }
        let config_path = sidecar_path(&model_path);
        if !config_path.exists() {
            return Err(VoiceError::ModelLoad(format!(
                "missing model config: {}",
                config_path.display()
            )));
        }
        Ok(ResolvedModel {
            model_path,
            config_path,
        })
    }
}

/// The piper convention: `foo.onnx` is described by `foo.onnx.json`.
fn sidecar_path(model_path: &Path) -> PathBuf {
    let mut s = model_path.as_os_str().to_os_string();
    s.push(".json");
    PathBuf::from(s)
}

/// In-progress download name for a cache file.
fn part_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".part");
    PathBuf::from(s)
}

fn rename_into_place(tmp: &Path, dest: &Path) -> Result<(), VoiceError> {
    fs::rename(tmp, dest)
        .map_err(|e| VoiceError::ModelLoad(format!("rename {}: {e}", dest.display())))
}
