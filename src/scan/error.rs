//! Workflow-level errors: one kind, one failed step.

use std::fmt;

use thiserror::Error;

use crate::camera::CaptureError;
use crate::payload::CodecError;
use crate::recognition::RecognitionError;

/// Error code presentation maps to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PermissionDenied,
    DeviceUnavailable,
    NotActive,
    UnsupportedFormat,
    NetworkError,
    Timeout,
    InvalidResponse,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::PermissionDenied => "permission denied",
            ErrorKind::DeviceUnavailable => "device unavailable",
            ErrorKind::NotActive => "device not active",
            ErrorKind::UnsupportedFormat => "unsupported format",
            ErrorKind::NetworkError => "network error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InvalidResponse => "invalid response",
        };
        f.write_str(name)
    }
}

/// Which part of the workflow failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStep {
    AcquireDevice,
    CaptureFrame,
    DecodeUpload,
    Recognition,
}

impl fmt::Display for ScanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanStep::AcquireDevice => "camera start",
            ScanStep::CaptureFrame => "capture",
            ScanStep::DecodeUpload => "upload",
            ScanStep::Recognition => "recognition",
        };
        f.write_str(name)
    }
}

/// A failure stored in the `Error` state. Always recoverable with retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{step} failed ({kind}): {message}")]
pub struct ScanError {
    pub kind: ErrorKind,
    pub step: ScanStep,
    pub message: String,
}

impl ScanError {
    pub fn new(kind: ErrorKind, step: ScanStep, message: impl Into<String>) -> Self {
        Self {
            kind,
            step,
            message: message.into(),
        }
    }

    pub(crate) fn from_capture(step: ScanStep, error: &CaptureError) -> Self {
        let kind = match error {
            CaptureError::PermissionDenied => ErrorKind::PermissionDenied,
            CaptureError::DeviceUnavailable(_)
            | CaptureError::StreamFailed(_)
            | CaptureError::AlreadyActive => ErrorKind::DeviceUnavailable,
            CaptureError::NotActive => ErrorKind::NotActive,
            CaptureError::Encoding(_) => ErrorKind::UnsupportedFormat,
        };
        Self::new(kind, step, error.to_string())
    }

    pub(crate) fn from_codec(error: &CodecError) -> Self {
        Self::new(
            ErrorKind::UnsupportedFormat,
            ScanStep::DecodeUpload,
            error.to_string(),
        )
    }

    /// `None` for `Cancelled`, which is never surfaced.
    pub(crate) fn from_recognition(error: &RecognitionError) -> Option<Self> {
        let kind = match error {
            RecognitionError::Network { .. } => ErrorKind::NetworkError,
            RecognitionError::Timeout(_) => ErrorKind::Timeout,
            RecognitionError::InvalidResponse(_) => ErrorKind::InvalidResponse,
            RecognitionError::Cancelled => return None,
        };
        Some(Self::new(kind, ScanStep::Recognition, error.to_string()))
    }
}
