//! ScanStateMachine - the single owner of scan state.
//!
//! Intents and recognition completions are applied one at a time. Every
//! transition replaces the session view and is broadcast to subscribers.
//! A completion is applied only if it belongs to the attempt that is still
//! active; anything older is dropped.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use super::collaborator::{CollaboratorError, ResultCollaborator};
use super::error::{ScanError, ScanStep};
use super::state::{ScanSession, ScanState, ScanView};
use crate::camera::{CameraBackend, CaptureConstraints, CaptureDevice};
use crate::payload::{ImageCodec, ImagePayload};
use crate::recognition::{
    submit, RecognitionError, RecognitionResult, Recognizer, DEFAULT_TIMEOUT,
};

/// Views buffered per subscriber before the slowest one starts lagging.
const VIEW_CHANNEL_CAPACITY: usize = 64;

/// User intent delivered to the machine.
#[derive(Clone, PartialEq, Eq)]
pub enum ScanIntent {
    StartCamera,
    Capture,
    Cancel,
    UploadFile { bytes: Vec<u8>, mime: String },
    Retry,
}

impl ScanIntent {
    pub fn name(&self) -> &'static str {
        match self {
            ScanIntent::StartCamera => "start camera",
            ScanIntent::Capture => "capture",
            ScanIntent::Cancel => "cancel",
            ScanIntent::UploadFile { .. } => "upload file",
            ScanIntent::Retry => "retry",
        }
    }
}

impl fmt::Debug for ScanIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanIntent::UploadFile { bytes, mime } => f
                .debug_struct("UploadFile")
                .field("len", &bytes.len())
                .field("mime", mime)
                .finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// An intent that is not valid in the current state. State is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("'{intent}' is not accepted while {state}")]
pub struct ScanRejected {
    pub intent: &'static str,
    pub state: ScanState,
}

/// Knobs the machine passes to its collaborators.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub constraints: CaptureConstraints,
    /// Upper bound for one recognition attempt
    pub timeout: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            constraints: CaptureConstraints::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

struct Completion {
    generation: u64,
    outcome: Result<RecognitionResult, RecognitionError>,
}

struct InFlight {
    generation: u64,
    cancel: CancellationToken,
}

pub struct ScanStateMachine {
    device: CaptureDevice,
    codec: ImageCodec,
    recognizer: Arc<dyn Recognizer>,
    settings: ScanSettings,
    session: ScanSession,
    /// Bumped for every recognition attempt
    generation: u64,
    in_flight: Option<InFlight>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    views: broadcast::Sender<ScanView>,
}

impl fmt::Debug for ScanStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanStateMachine")
            .field("session", &self.session.id())
            .field("state", &self.state())
            .field("device", &self.device)
            .field("generation", &self.generation)
            .field("in_flight", &self.in_flight.is_some())
            .finish()
    }
}

impl ScanStateMachine {
    /// Camera frames and uploads both go through `codec`.
    pub fn new(
        camera: Arc<dyn CameraBackend>,
        recognizer: Arc<dyn Recognizer>,
        codec: ImageCodec,
        settings: ScanSettings,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (views, _) = broadcast::channel(VIEW_CHANNEL_CAPACITY);
        Self {
            device: CaptureDevice::new(camera, codec),
            codec,
            recognizer,
            settings,
            session: ScanSession::new(1),
            generation: 0,
            in_flight: None,
            completion_tx,
            completion_rx,
            views,
        }
    }

    pub fn state(&self) -> ScanState {
        self.session.state()
    }

    pub fn view(&self) -> &ScanView {
        self.session.view()
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Receive every view from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanView> {
        self.views.subscribe()
    }

    pub fn has_live_device(&self) -> bool {
        self.device.is_active()
    }

    pub fn has_request_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Apply one intent.
    ///
    /// `Retry` is accepted everywhere. `StartCamera` and `UploadFile` are
    /// accepted in `Idle` and, as a fresh attempt replacing the current
    /// session, in `Analyzing`, `Result` and `Error`. `Capture` and `Cancel`
    /// need a live device.
    pub async fn dispatch(&mut self, intent: ScanIntent) -> Result<ScanState, ScanRejected> {
        let state = self.state();
        log::debug!("dispatching {:?} in {}", intent, state);

        match (state, intent) {
            (_, ScanIntent::Retry) => self.reset(),
            (ScanState::DeviceActive, ScanIntent::Capture) => self.capture(),
            (ScanState::DeviceActive, ScanIntent::Cancel) => {
                self.device.release();
                self.transition(ScanView::Idle);
            }
            (
                ScanState::Idle | ScanState::Analyzing | ScanState::Result | ScanState::Error,
                ScanIntent::StartCamera,
            ) => {
                if state != ScanState::Idle {
                    self.reset();
                }
                self.start_camera().await;
            }
            (
                ScanState::Idle | ScanState::Analyzing | ScanState::Result | ScanState::Error,
                ScanIntent::UploadFile { bytes, mime },
            ) => {
                if state != ScanState::Idle {
                    self.reset();
                }
                self.upload(&bytes, &mime);
            }
            (state, intent) => {
                log::warn!("ignoring '{}' while {}", intent.name(), state);
                return Err(ScanRejected {
                    intent: intent.name(),
                    state,
                });
            }
        }

        Ok(self.state())
    }

    /// Apply every completion that has already arrived. Returns how many
    /// changed state.
    pub fn drain_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completion_rx.try_recv() {
            if self.apply_completion(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait until no recognition attempt is in flight.
    pub async fn settle(&mut self) -> ScanState {
        while self.in_flight.is_some() {
            match self.completion_rx.recv().await {
                Some(completion) => {
                    self.apply_completion(completion);
                }
                None => break,
            }
        }
        self.state()
    }

    /// Serve intents until the sender side closes, applying completions as
    /// they arrive. Releases everything before returning the last session.
    pub async fn run(mut self, mut intents: mpsc::Receiver<ScanIntent>) -> ScanSession {
        loop {
            tokio::select! {
                intent = intents.recv() => match intent {
                    Some(intent) => {
                        if let Err(rejected) = self.dispatch(intent).await {
                            log::debug!("{}", rejected);
                        }
                    }
                    None => break,
                },
                Some(completion) = self.completion_rx.recv() => {
                    self.apply_completion(completion);
                }
            }
        }

        self.shutdown();
        self.session.clone()
    }

    /// Hand the result to `collaborator` for saving. Only valid in `Result`.
    pub async fn save_result(
        &self,
        collaborator: &dyn ResultCollaborator,
    ) -> Result<(), CollaboratorError> {
        let (result, image) = self.completed().ok_or(CollaboratorError::NoResult)?;
        collaborator.save(result, image).await
    }

    /// Hand the result to `collaborator` for sharing. Only valid in `Result`.
    pub async fn share_result(
        &self,
        collaborator: &dyn ResultCollaborator,
    ) -> Result<(), CollaboratorError> {
        let (result, image) = self.completed().ok_or(CollaboratorError::NoResult)?;
        collaborator.share(result, image).await
    }

    fn completed(&self) -> Option<(Arc<RecognitionResult>, Arc<ImagePayload>)> {
        match self.session.view() {
            ScanView::Result { image, result } => Some((Arc::clone(result), Arc::clone(image))),
            _ => None,
        }
    }

    async fn start_camera(&mut self) {
        match self.device.acquire(&self.settings.constraints).await {
            Ok(preview) => {
                log::info!(
                    "camera '{}' streaming at {}",
                    self.device.backend_name(),
                    preview.stream_info().resolution
                );
                self.transition(ScanView::DeviceActive { preview });
            }
            Err(e) => {
                self.device.release();
                self.fail(None, ScanError::from_capture(ScanStep::AcquireDevice, &e));
            }
        }
    }

    fn capture(&mut self) {
        let captured = self.device.capture_frame();
        // The stream is not needed once a still exists, or once it failed
        self.device.release();

        match captured {
            Ok(image) => self.begin_analysis(Arc::new(image)),
            Err(e) => self.fail(None, ScanError::from_capture(ScanStep::CaptureFrame, &e)),
        }
    }

    fn upload(&mut self, bytes: &[u8], mime: &str) {
        match self.codec.from_upload(bytes, mime) {
            Ok(image) => self.begin_analysis(Arc::new(image)),
            Err(e) => self.fail(None, ScanError::from_codec(&e)),
        }
    }

    /// `Captured` then straight into `Analyzing` with a new attempt.
    fn begin_analysis(&mut self, image: Arc<ImagePayload>) {
        self.transition(ScanView::Captured {
            image: Arc::clone(&image),
        });

        self.generation += 1;
        let generation = self.generation;
        let cancel = CancellationToken::new();

        let recognizer = Arc::clone(&self.recognizer);
        let task_image = Arc::clone(&image);
        let task_cancel = cancel.clone();
        let completions = self.completion_tx.clone();
        let timeout = self.settings.timeout;

        let attempt = tokio::spawn(async move {
            submit(recognizer.as_ref(), &task_image, &task_cancel, timeout).await
        });
        tokio::spawn(async move {
            let outcome = match attempt.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!("recognition attempt {} failed: {}", generation, e);
                    Err(RecognitionError::Network {
                        message: "recognizer task failed".to_string(),
                        status: None,
                    })
                }
            };
            if matches!(outcome, Err(RecognitionError::Cancelled)) {
                log::debug!("recognition attempt {} cancelled", generation);
                return;
            }
            // Receiver gone means the machine was dropped
            let _ = completions.send(Completion {
                generation,
                outcome,
            });
        });

        log::info!(
            "analyzing {} ({}x{}, attempt {})",
            image.digest(),
            image.width(),
            image.height(),
            generation
        );
        self.in_flight = Some(InFlight { generation, cancel });
        self.transition(ScanView::Analyzing { image });
    }

    fn apply_completion(&mut self, completion: Completion) -> bool {
        let active = self.state() == ScanState::Analyzing
            && self
                .in_flight
                .as_ref()
                .is_some_and(|flight| flight.generation == completion.generation);
        if !active {
            log::debug!(
                "discarding stale recognition outcome (attempt {})",
                completion.generation
            );
            return false;
        }

        if matches!(completion.outcome, Err(RecognitionError::Cancelled)) {
            return false;
        }

        self.in_flight = None;
        let image = self.session.image().cloned();
        match completion.outcome {
            Ok(result) => {
                let Some(image) = image else {
                    return false;
                };
                log::info!(
                    "recognized {} ({}% confidence)",
                    result.title(),
                    result.confidence_percent()
                );
                self.transition(ScanView::Result {
                    image,
                    result: Arc::new(result),
                });
            }
            Err(e) => {
                if let Some(error) = ScanError::from_recognition(&e) {
                    self.fail(image, error);
                }
            }
        }
        true
    }

    /// Drop everything and start a new session in `Idle`.
    fn reset(&mut self) {
        self.abandon();
        self.session = ScanSession::new(self.session.id() + 1);
        log::info!("starting scan session {}", self.session.id());
        self.emit(ScanView::Idle);
    }

    fn abandon(&mut self) {
        if let Some(flight) = self.in_flight.take() {
            log::debug!("cancelling recognition attempt {}", flight.generation);
            flight.cancel.cancel();
        }
        self.device.release();
    }

    fn shutdown(&mut self) {
        self.abandon();
        log::debug!("scan machine stopped in {}", self.state());
    }

    fn fail(&mut self, image: Option<Arc<ImagePayload>>, error: ScanError) {
        log::warn!("scan failed: {}", error);
        self.transition(ScanView::Error { image, error });
    }

    fn transition(&mut self, view: ScanView) {
        log::info!("scan {}: {} -> {}", self.session.id(), self.state(), view.state());
        self.emit(view);
    }

    fn emit(&mut self, view: ScanView) {
        self.session.set_view(view.clone());
        // No subscribers is fine
        let _ = self.views.send(view);
    }
}

impl Drop for ScanStateMachine {
    fn drop(&mut self) {
        if let Some(flight) = self.in_flight.take() {
            flight.cancel.cancel();
        }
    }
}
