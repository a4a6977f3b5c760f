//! Session aggregate and the views presentation receives.

use std::fmt;
use std::sync::Arc;

use super::error::ScanError;
use crate::camera::PreviewHandle;
use crate::payload::ImagePayload;
use crate::recognition::RecognitionResult;

/// State tag of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    DeviceActive,
    Captured,
    Analyzing,
    Result,
    Error,
}

impl ScanState {
    /// `Result` and `Error` end a session; only a retry leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, ScanState::Result | ScanState::Error)
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanState::Idle => "idle",
            ScanState::DeviceActive => "device active",
            ScanState::Captured => "captured",
            ScanState::Analyzing => "analyzing",
            ScanState::Result => "result",
            ScanState::Error => "error",
        };
        f.write_str(name)
    }
}

/// The state plus exactly the data that is valid in it.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanView {
    Idle,
    DeviceActive {
        preview: PreviewHandle,
    },
    Captured {
        image: Arc<ImagePayload>,
    },
    Analyzing {
        image: Arc<ImagePayload>,
    },
    Result {
        image: Arc<ImagePayload>,
        result: Arc<RecognitionResult>,
    },
    Error {
        /// Absent when the failure happened before an image existed
        image: Option<Arc<ImagePayload>>,
        error: ScanError,
    },
}

impl ScanView {
    pub fn state(&self) -> ScanState {
        match self {
            ScanView::Idle => ScanState::Idle,
            ScanView::DeviceActive { .. } => ScanState::DeviceActive,
            ScanView::Captured { .. } => ScanState::Captured,
            ScanView::Analyzing { .. } => ScanState::Analyzing,
            ScanView::Result { .. } => ScanState::Result,
            ScanView::Error { .. } => ScanState::Error,
        }
    }

    pub fn image(&self) -> Option<&Arc<ImagePayload>> {
        match self {
            ScanView::Captured { image }
            | ScanView::Analyzing { image }
            | ScanView::Result { image, .. } => Some(image),
            ScanView::Error { image, .. } => image.as_ref(),
            ScanView::Idle | ScanView::DeviceActive { .. } => None,
        }
    }

    pub fn result(&self) -> Option<&Arc<RecognitionResult>> {
        match self {
            ScanView::Result { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ScanError> {
        match self {
            ScanView::Error { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn preview(&self) -> Option<&PreviewHandle> {
        match self {
            ScanView::DeviceActive { preview } => Some(preview),
            _ => None,
        }
    }

    /// Whether presentation should show the analyzing indicator.
    pub fn is_analyzing(&self) -> bool {
        matches!(self, ScanView::Analyzing { .. })
    }
}

/// One run of the workflow from `Idle` to a terminal state.
#[derive(Debug, Clone)]
pub struct ScanSession {
    id: u64,
    view: ScanView,
}

impl ScanSession {
    pub(crate) fn new(id: u64) -> Self {
        Self {
            id,
            view: ScanView::Idle,
        }
    }

    pub(crate) fn set_view(&mut self, view: ScanView) {
        self.view = view;
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn view(&self) -> &ScanView {
        &self.view
    }

    pub fn state(&self) -> ScanState {
        self.view.state()
    }

    pub fn image(&self) -> Option<&Arc<ImagePayload>> {
        self.view.image()
    }

    pub fn result(&self) -> Option<&Arc<RecognitionResult>> {
        self.view.result()
    }

    pub fn error(&self) -> Option<&ScanError> {
        self.view.error()
    }
}
