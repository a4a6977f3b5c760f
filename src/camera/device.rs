//! Exclusive live capture device and its preview handle.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::oneshot;

use super::backend::CameraBackend;
use super::frame_utils::mirror_horizontal;
use super::types::{CameraInfo, CaptureConstraints, CaptureError, RawFrame, StreamInfo};
use crate::payload::{ImageCodec, ImagePayload};

/// Consecutive read failures after which the stream counts as lost.
const MAX_CONSECUTIVE_READ_FAILURES: u32 = 10;

type FrameBuffer = Arc<Mutex<Option<RawFrame>>>;

/// Read-only view of the live stream for presentation.
///
/// Goes dark (no frame) once the device is released.
#[derive(Clone)]
pub struct PreviewHandle {
    buffer: FrameBuffer,
    info: StreamInfo,
}

impl PreviewHandle {
    /// Latest frame, or `None` after release.
    pub fn latest_frame(&self) -> Option<RawFrame> {
        self.buffer.lock().ok()?.clone()
    }

    pub fn stream_info(&self) -> StreamInfo {
        self.info
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl PartialEq for PreviewHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }
}

struct LiveStream {
    buffer: FrameBuffer,
    stop_signal: Arc<AtomicBool>,
    capture_thread: JoinHandle<()>,
}

/// Owner of the one live camera handle.
///
/// `acquire` spawns a capture thread that keeps the latest frame in a shared
/// buffer; `capture_frame` samples that buffer; `release` stops the thread.
/// Dropping the device releases it.
pub struct CaptureDevice {
    backend: Arc<dyn CameraBackend>,
    codec: ImageCodec,
    live: Option<LiveStream>,
}

impl fmt::Debug for CaptureDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureDevice")
            .field("backend", &self.backend.name())
            .field("codec", &self.codec)
            .field("is_active", &self.is_active())
            .finish()
    }
}

impl CaptureDevice {
    pub fn new(backend: Arc<dyn CameraBackend>, codec: ImageCodec) -> Self {
        Self {
            backend,
            codec,
            live: None,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn list_devices(&self) -> Result<Vec<CameraInfo>, CaptureError> {
        self.backend.list_devices()
    }

    /// Whether a live handle is held and its capture thread is still running.
    pub fn is_active(&self) -> bool {
        self.live
            .as_ref()
            .is_some_and(|live| !live.capture_thread.is_finished())
    }

    /// Request the device and start streaming.
    ///
    /// Resolves once the first frame is buffered. Opening may block on an OS
    /// permission prompt; that happens on the capture thread.
    ///
    /// # Errors
    /// * `CaptureError::AlreadyActive` - a live handle is already held
    /// * `CaptureError::PermissionDenied` - access refused
    /// * `CaptureError::DeviceUnavailable` - no such device, or it failed to open
    pub async fn acquire(
        &mut self,
        constraints: &CaptureConstraints,
    ) -> Result<PreviewHandle, CaptureError> {
        if self.is_active() {
            return Err(CaptureError::AlreadyActive);
        }
        // Clear out a stream whose thread died on its own
        self.release();

        let buffer: FrameBuffer = Arc::new(Mutex::new(None));
        let stop_signal = Arc::new(AtomicBool::new(false));
        let (info_tx, info_rx) = oneshot::channel();

        let thread_buffer = Arc::clone(&buffer);
        let thread_stop = Arc::clone(&stop_signal);
        let backend = Arc::clone(&self.backend);
        let settings = constraints.clone();

        let capture_thread = thread::Builder::new()
            .name("camera-capture".to_string())
            .spawn(move || {
                run_capture_loop(backend, settings, thread_buffer, thread_stop, info_tx);
            })
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

        self.live = Some(LiveStream {
            buffer: Arc::clone(&buffer),
            stop_signal,
            capture_thread,
        });

        match info_rx.await {
            Ok(Ok(info)) => {
                log::info!(
                    "{} camera {} streaming at {} ({} fps)",
                    self.backend.name(),
                    constraints.device_index,
                    info.resolution,
                    info.fps
                );
                Ok(PreviewHandle { buffer, info })
            }
            Ok(Err(e)) => {
                self.release();
                Err(e)
            }
            Err(_) => {
                self.release();
                Err(CaptureError::StreamFailed(
                    "capture thread terminated unexpectedly".to_string(),
                ))
            }
        }
    }

    /// Encode the current frame of the live stream.
    ///
    /// Does not release the device; the caller decides when the session ends.
    pub fn capture_frame(&self) -> Result<ImagePayload, CaptureError> {
        let live = match &self.live {
            Some(live) if !live.capture_thread.is_finished() => live,
            _ => return Err(CaptureError::NotActive),
        };

        let frame = live
            .buffer
            .lock()
            .ok()
            .and_then(|buffer| buffer.clone())
            .ok_or(CaptureError::NotActive)?;

        self.codec
            .from_frame(&frame)
            .map_err(|e| CaptureError::Encoding(e.to_string()))
    }

    /// Stop the stream and free the device. No-op when nothing is held.
    pub fn release(&mut self) {
        let Some(live) = self.live.take() else {
            return;
        };

        live.stop_signal.store(true, Ordering::SeqCst);
        if join_capture_thread(live.capture_thread).is_err() {
            log::warn!("camera capture thread panicked");
        }
        if let Ok(mut buffer) = live.buffer.lock() {
            *buffer = None;
        }
        log::info!("{} camera released", self.backend.name());
    }
}

impl Drop for CaptureDevice {
    fn drop(&mut self) {
        self.release();
    }
}

/// Wait for the capture thread to exit.
///
/// A backend read can block for a frame period or longer, so on a
/// multi-threaded runtime the worker is handed off first.
fn join_capture_thread(handle: JoinHandle<()>) -> thread::Result<()> {
    match Handle::try_current() {
        Ok(runtime) if runtime.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| handle.join())
        }
        _ => handle.join(),
    }
}

fn store_frame(buffer: &FrameBuffer, mut frame: RawFrame, mirror: bool) {
    if mirror {
        mirror_horizontal(&mut frame);
    }
    if let Ok(mut buf) = buffer.lock() {
        *buf = Some(frame);
    }
}

/// Body of the capture thread.
fn run_capture_loop(
    backend: Arc<dyn CameraBackend>,
    constraints: CaptureConstraints,
    buffer: FrameBuffer,
    stop: Arc<AtomicBool>,
    info_tx: oneshot::Sender<Result<StreamInfo, CaptureError>>,
) {
    let mut source = backend.create_source();

    let info = match source.open(&constraints) {
        Ok(info) => info,
        Err(e) => {
            let _ = info_tx.send(Err(e));
            return;
        }
    };

    // Only report ready once there is something to capture
    match source.read_frame() {
        Ok(frame) => store_frame(&buffer, frame, constraints.mirror),
        Err(e) => {
            source.close();
            let _ = info_tx.send(Err(e));
            return;
        }
    }
    let _ = info_tx.send(Ok(info));

    let interval = Duration::from_millis(1000 / u64::from(constraints.fps.max(1)));
    let mut failures = 0;

    while !stop.load(Ordering::Relaxed) {
        let started = Instant::now();

        match source.read_frame() {
            Ok(frame) => {
                failures = 0;
                store_frame(&buffer, frame, constraints.mirror);
            }
            Err(e) => {
                failures += 1;
                if failures >= MAX_CONSECUTIVE_READ_FAILURES {
                    log::warn!("camera stream lost: {}", e);
                    break;
                }
            }
        }

        if let Some(rest) = interval.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }

    source.close();
}
