use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the bridge. Each variant maps onto one diagnostic
/// line and a non-zero exit at the command layer.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The engine could not resolve the URL or returned unusable metadata.
    #[error("{0}")]
    Extraction(String),

    #[error("{action} {}", path.display())]
    FileSystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transfer or post-processing failed inside the engine.
    #[error("{0}")]
    Download(String),

    /// The engine executable could not be started at all.
    #[error("failed to run {program}")]
    Engine {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    pub fn file_system(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            action,
            path: path.into(),
            source,
        }
    }
}
