//! Save/share hand-off once a scan has a result.

use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use crate::payload::ImagePayload;
use crate::recognition::RecognitionResult;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("no recognition result to hand off")]
    NoResult,

    #[error("{0}")]
    Failed(String),
}

/// Receives the immutable result and image after a successful scan.
#[async_trait]
pub trait ResultCollaborator: Send + Sync {
    async fn save(
        &self,
        result: Arc<RecognitionResult>,
        image: Arc<ImagePayload>,
    ) -> Result<(), CollaboratorError>;

    async fn share(
        &self,
        result: Arc<RecognitionResult>,
        image: Arc<ImagePayload>,
    ) -> Result<(), CollaboratorError>;
}

/// Writes a JSON record on save and a one-line summary on share.
pub struct ConsoleCollaborator<W> {
    out: Mutex<W>,
}

impl ConsoleCollaborator<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleCollaborator<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_line(&self, line: &str) -> Result<(), CollaboratorError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| CollaboratorError::Failed("output lock poisoned".to_string()))?;
        writeln!(out, "{}", line).map_err(|e| CollaboratorError::Failed(e.to_string()))
    }
}

/// Summary line used when sharing.
pub fn share_text(result: &RecognitionResult) -> String {
    format!(
        "Spotted a {} ({}% match)",
        result.title(),
        result.confidence_percent()
    )
}

#[async_trait]
impl<W: Write + Send> ResultCollaborator for ConsoleCollaborator<W> {
    async fn save(
        &self,
        result: Arc<RecognitionResult>,
        image: Arc<ImagePayload>,
    ) -> Result<(), CollaboratorError> {
        let record = json!({
            "result": result.as_ref(),
            "image": {
                "digest": image.digest(),
                "source": image.source().to_string(),
                "mime": image.mime(),
                "width": image.width(),
                "height": image.height(),
                "bytes": image.bytes().len(),
            },
        });
        self.write_line(&record.to_string())
    }

    async fn share(
        &self,
        result: Arc<RecognitionResult>,
        _image: Arc<ImagePayload>,
    ) -> Result<(), CollaboratorError> {
        self.write_line(&share_text(&result))
    }
}
