//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use car_scanner::camera::{
    CameraBackend, CameraInfo, CaptureConstraints, CaptureError, FrameSource, RawFrame,
    Resolution, StreamInfo,
};
use car_scanner::payload::ImagePayload;
use car_scanner::recognition::{
    FixedRecognizer, RecognitionError, RecognitionResult, Recognizer,
};
use car_scanner::scan::{CollaboratorError, ResultCollaborator};

// === Images ===

/// Deterministic RGB test pattern.
pub fn pattern_pixels(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            data.push((x * 255 / width.max(1)) as u8);
            data.push((y * 255 / height.max(1)) as u8);
            data.push(128);
        }
    }
    data
}

pub fn pattern_frame(width: u32, height: u32) -> RawFrame {
    RawFrame::rgb(width, height, pattern_pixels(width, height))
}

pub fn encode(width: u32, height: u32, format: image::ImageFormat) -> Vec<u8> {
    let img = image::RgbImage::from_raw(width, height, pattern_pixels(width, height)).unwrap();
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, format)
        .unwrap();
    out.into_inner()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, image::ImageFormat::Png)
}

/// The record the offline recognizer answers with.
pub fn tesla() -> RecognitionResult {
    car_scanner::recognition::parse_response(
        br#"{
            "make": "Tesla",
            "model": "Model S",
            "year": 2023,
            "confidence": 0.92,
            "type": "Electric Sedan",
            "engine": "Dual Motor",
            "horsepower": 670,
            "transmission": "Single-Speed",
            "price": "89,990"
        }"#,
    )
    .unwrap()
}

pub fn quick_fixed() -> Arc<FixedRecognizer> {
    Arc::new(FixedRecognizer::default().with_delay(Duration::from_millis(10)))
}

// === Camera ===

#[derive(Default)]
struct Counters {
    opens: AtomicUsize,
    closes: AtomicUsize,
    denied: AtomicBool,
}

/// In-memory camera that counts opens and closes.
#[derive(Clone)]
pub struct FakeBackend {
    counters: Arc<Counters>,
    frame: RawFrame,
    close_delay: Duration,
}

impl FakeBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            frame: pattern_frame(width, height),
            close_delay: Duration::ZERO,
        }
    }

    /// Make closing the stream block the capture thread for `delay`.
    pub fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }

    /// Refuse access until `set_denied(false)`.
    pub fn denied() -> Self {
        let backend = Self::new(32, 24);
        backend.set_denied(true);
        backend
    }

    pub fn set_denied(&self, denied: bool) {
        self.counters.denied.store(denied, Ordering::SeqCst);
    }

    pub fn opens(&self) -> usize {
        self.counters.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }

    /// Streams opened and not yet closed.
    pub fn live_streams(&self) -> usize {
        self.opens() - self.closes()
    }
}

impl CameraBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    fn list_devices(&self) -> Result<Vec<CameraInfo>, CaptureError> {
        Ok(vec![CameraInfo {
            index: 0,
            name: "Fake Camera".to_string(),
            description: "in-memory".to_string(),
        }])
    }

    fn create_source(&self) -> Box<dyn FrameSource> {
        Box::new(FakeSource {
            counters: Arc::clone(&self.counters),
            frame: self.frame.clone(),
            close_delay: self.close_delay,
            open: false,
        })
    }
}

struct FakeSource {
    counters: Arc<Counters>,
    frame: RawFrame,
    close_delay: Duration,
    open: bool,
}

impl FrameSource for FakeSource {
    fn open(&mut self, constraints: &CaptureConstraints) -> Result<StreamInfo, CaptureError> {
        if self.counters.denied.load(Ordering::SeqCst) {
            return Err(CaptureError::PermissionDenied);
        }
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        self.open = true;
        Ok(StreamInfo {
            resolution: Resolution {
                width: self.frame.width,
                height: self.frame.height,
            },
            fps: constraints.fps,
        })
    }

    fn read_frame(&mut self) -> Result<RawFrame, CaptureError> {
        if !self.open {
            return Err(CaptureError::NotActive);
        }
        let mut frame = self.frame.clone();
        frame.timestamp = Instant::now();
        Ok(frame)
    }

    fn close(&mut self) {
        if self.open {
            std::thread::sleep(self.close_delay);
            self.open = false;
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

// === Recognition ===

/// Increments a counter if dropped before being disarmed.
struct CancelGuard {
    counter: Arc<AtomicUsize>,
    armed: bool,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if self.armed {
            self.counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Answers with a scripted outcome once released, counting calls and
/// cancellations.
pub struct ScriptedRecognizer {
    outcome: Result<RecognitionResult, RecognitionError>,
    gate: Semaphore,
    calls: AtomicUsize,
    cancellations: Arc<AtomicUsize>,
    received: Mutex<Vec<ImagePayload>>,
}

impl ScriptedRecognizer {
    /// Waits for `release()` before answering.
    pub fn gated(outcome: Result<RecognitionResult, RecognitionError>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            cancellations: Arc::new(AtomicUsize::new(0)),
            received: Mutex::new(Vec::new()),
        })
    }

    /// Answers straight away.
    pub fn immediate(outcome: Result<RecognitionResult, RecognitionError>) -> Arc<Self> {
        let recognizer = Self::gated(outcome);
        recognizer.gate.add_permits(Semaphore::MAX_PERMITS / 2);
        recognizer
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn cancellations(&self) -> usize {
        self.cancellations.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<ImagePayload> {
        self.received.lock().unwrap().clone()
    }

    /// Poll until `cancellations()` reaches `expected`.
    pub async fn wait_for_cancellations(&self, expected: usize) -> usize {
        for _ in 0..100 {
            if self.cancellations() >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.cancellations()
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn recognize(
        &self,
        payload: &ImagePayload,
    ) -> Result<RecognitionResult, RecognitionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(payload.clone());

        let mut guard = CancelGuard {
            counter: Arc::clone(&self.cancellations),
            armed: true,
        };
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
        guard.armed = false;

        self.outcome.clone()
    }
}

// === Collaborators ===

/// Keeps whatever it is handed.
#[derive(Default)]
pub struct RecordingCollaborator {
    pub saved: Mutex<Vec<(Arc<RecognitionResult>, Arc<ImagePayload>)>>,
    pub shared: Mutex<Vec<(Arc<RecognitionResult>, Arc<ImagePayload>)>>,
}

#[async_trait]
impl ResultCollaborator for RecordingCollaborator {
    async fn save(
        &self,
        result: Arc<RecognitionResult>,
        image: Arc<ImagePayload>,
    ) -> Result<(), CollaboratorError> {
        self.saved.lock().unwrap().push((result, image));
        Ok(())
    }

    async fn share(
        &self,
        result: Arc<RecognitionResult>,
        image: Arc<ImagePayload>,
    ) -> Result<(), CollaboratorError> {
        self.shared.lock().unwrap().push((result, image));
        Ok(())
    }
}
