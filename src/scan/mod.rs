//! Scan workflow: camera or upload, then recognition, then a result or error.

mod collaborator;
mod error;
mod machine;
mod state;

pub use collaborator::{share_text, CollaboratorError, ConsoleCollaborator, ResultCollaborator};
pub use error::{ErrorKind, ScanError, ScanStep};
pub use machine::{ScanIntent, ScanRejected, ScanSettings, ScanStateMachine};
pub use state::{ScanSession, ScanState, ScanView};
