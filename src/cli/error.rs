use std::path::PathBuf;

use thiserror::Error;

use car_scanner::camera::CaptureError;
use car_scanner::config::ConfigError;
use car_scanner::recognition::RecognitionError;
use car_scanner::scan::{CollaboratorError, ScanError, ScanRejected};

/// Anything that ends the binary with a non-zero status.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Camera(#[from] CaptureError),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),

    #[error(transparent)]
    Rejected(#[from] ScanRejected),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("{0}")]
    Scan(ScanError),

    #[error("Failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No camera backend available: pass --replay FILE or build with the `camera` feature")]
    NoCameraBackend,

    #[error("Failed to install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),
}
