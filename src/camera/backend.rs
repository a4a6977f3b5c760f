//! Capture backends.
//!
//! A [`CameraBackend`] hands out [`FrameSource`]s. Sources are created and
//! used on the capture thread only, so they need not be `Send`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use super::frame_utils::classify_open_error;
use super::types::{CameraInfo, CaptureConstraints, CaptureError, RawFrame, Resolution, StreamInfo};

/// One open-read-close cycle against a device.
pub trait FrameSource {
    /// Open the device and start streaming.
    fn open(&mut self, constraints: &CaptureConstraints) -> Result<StreamInfo, CaptureError>;

    /// Block until the next frame is available.
    fn read_frame(&mut self) -> Result<RawFrame, CaptureError>;

    /// Stop streaming. Called exactly once after a successful `open`.
    fn close(&mut self);
}

/// Factory for frame sources plus device discovery.
pub trait CameraBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    fn list_devices(&self) -> Result<Vec<CameraInfo>, CaptureError>;

    /// Create an unopened source. Called on the capture thread.
    fn create_source(&self) -> Box<dyn FrameSource>;
}

/// Serves a still image file as if it were a live camera.
///
/// Useful on machines without a webcam and for demos.
#[derive(Debug, Clone)]
pub struct ReplayBackend {
    path: PathBuf,
}

impl ReplayBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CameraBackend for ReplayBackend {
    fn name(&self) -> &str {
        "replay"
    }

    fn list_devices(&self) -> Result<Vec<CameraInfo>, CaptureError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        Ok(vec![CameraInfo {
            index: 0,
            name: "Replay".to_string(),
            description: self.path.display().to_string(),
        }])
    }

    fn create_source(&self) -> Box<dyn FrameSource> {
        Box::new(ReplaySource {
            path: self.path.clone(),
            frame: None,
        })
    }
}

struct ReplaySource {
    path: PathBuf,
    frame: Option<RawFrame>,
}

impl FrameSource for ReplaySource {
    fn open(&mut self, constraints: &CaptureConstraints) -> Result<StreamInfo, CaptureError> {
        if constraints.device_index != 0 {
            return Err(CaptureError::DeviceUnavailable(format!(
                "replay backend has a single device, got index {}",
                constraints.device_index
            )));
        }

        let image = image::open(&self.path)
            .map_err(|e| classify_open_error(&format!("{}: {}", self.path.display(), e)))?;
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        self.frame = Some(RawFrame::rgb(width, height, rgb.into_raw()));

        Ok(StreamInfo {
            resolution: Resolution { width, height },
            fps: constraints.fps,
        })
    }

    fn read_frame(&mut self) -> Result<RawFrame, CaptureError> {
        let frame = self.frame.as_ref().ok_or(CaptureError::NotActive)?;
        let mut frame = frame.clone();
        frame.timestamp = Instant::now();
        Ok(frame)
    }

    fn close(&mut self) {
        self.frame = None;
    }
}
