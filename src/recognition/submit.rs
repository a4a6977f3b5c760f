//! Cancellable, time-bounded submission to any recognizer.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::RecognitionError;
use super::result::RecognitionResult;
use crate::payload::ImagePayload;

/// Anything that can turn an image into a vehicle.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, payload: &ImagePayload)
        -> Result<RecognitionResult, RecognitionError>;
}

/// Run one recognition attempt.
///
/// Resolves to `Cancelled` as soon as `cancel` fires (the recognizer future is
/// dropped), or to `Timeout` once `timeout` elapses. Never retries.
pub async fn submit(
    recognizer: &dyn Recognizer,
    payload: &ImagePayload,
    cancel: &CancellationToken,
    timeout: Duration,
) -> Result<RecognitionResult, RecognitionError> {
    if cancel.is_cancelled() {
        return Err(RecognitionError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RecognitionError::Cancelled),
        outcome = tokio::time::timeout(timeout, recognizer.recognize(payload)) => match outcome {
            Ok(result) => result,
            Err(_) => Err(RecognitionError::Timeout(timeout)),
        },
    }
}
