//! Webcam backend built on nokhwa.

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat as NokhwaFrameFormat, RequestedFormat,
    RequestedFormatType,
};
use nokhwa::Camera;

use super::backend::{CameraBackend, FrameSource};
use super::frame_utils::classify_open_error;
use super::types::{CameraInfo, CaptureConstraints, CaptureError, RawFrame, Resolution, StreamInfo};

/// Native webcams through the platform's default API.
#[derive(Debug, Default, Clone, Copy)]
pub struct NokhwaBackend;

impl CameraBackend for NokhwaBackend {
    fn name(&self) -> &str {
        "nokhwa"
    }

    fn list_devices(&self) -> Result<Vec<CameraInfo>, CaptureError> {
        let devices = nokhwa::query(ApiBackend::Auto)
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

        Ok(devices
            .into_iter()
            .map(|d| CameraInfo {
                index: d.index().as_index().unwrap_or(0),
                name: d.human_name(),
                description: d.description().to_string(),
            })
            .collect())
    }

    fn create_source(&self) -> Box<dyn FrameSource> {
        Box::new(NokhwaSource { camera: None })
    }
}

struct NokhwaSource {
    camera: Option<Camera>,
}

impl FrameSource for NokhwaSource {
    fn open(&mut self, constraints: &CaptureConstraints) -> Result<StreamInfo, CaptureError> {
        if constraints.facing != super::types::FacingMode::Environment {
            log::debug!(
                "nokhwa cannot select by facing, using device index {}",
                constraints.device_index
            );
        }

        let index = CameraIndex::Index(constraints.device_index);
        let mut camera = open_camera_with_fallback(&index, constraints)?;

        camera
            .open_stream()
            .map_err(|e| classify_open_error(&e.to_string()))?;

        let res = camera.resolution();
        let info = StreamInfo {
            resolution: Resolution {
                width: res.width(),
                height: res.height(),
            },
            fps: camera.frame_rate(),
        };
        self.camera = Some(camera);
        Ok(info)
    }

    fn read_frame(&mut self) -> Result<RawFrame, CaptureError> {
        let camera = self.camera.as_mut().ok_or(CaptureError::NotActive)?;
        let buffer = camera
            .frame()
            .map_err(|e| CaptureError::StreamFailed(e.to_string()))?;
        // MJPEG, YUYV and NV12 all decode to RGB here
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::StreamFailed(e.to_string()))?;
        let resolution = buffer.resolution();

        Ok(RawFrame::rgb(
            resolution.width(),
            resolution.height(),
            decoded.into_raw(),
        ))
    }

    fn close(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            let _ = camera.stop_stream();
        }
    }
}

/// Try the preferred formats in order, then let the camera pick.
fn open_camera_with_fallback(
    index: &CameraIndex,
    constraints: &CaptureConstraints,
) -> Result<Camera, CaptureError> {
    let wanted = nokhwa::utils::Resolution::new(
        constraints.resolution.width,
        constraints.resolution.height,
    );
    let format_attempts = [
        // MJPEG is the common high-resolution format
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            wanted,
            NokhwaFrameFormat::MJPEG,
            constraints.fps,
        ))),
        // NV12 is native on macOS
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            wanted,
            NokhwaFrameFormat::NV12,
            constraints.fps,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution),
    ];

    let mut last_error = None;
    for requested in format_attempts {
        match Camera::new(index.clone(), requested) {
            Ok(cam) => return Ok(cam),
            Err(e) => last_error = Some(e),
        }
    }

    Err(match last_error {
        Some(e) => classify_open_error(&e.to_string()),
        None => CaptureError::DeviceUnavailable(format!("camera {:?}", index)),
    })
}
