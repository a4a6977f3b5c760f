//! Camera capture: live device lifecycle and frame sources.
//!
//! - Device ownership via [`CaptureDevice`] (acquire, capture one frame, release)
//! - Pluggable backends via [`CameraBackend`]: [`ReplayBackend`] always, and
//!   `NokhwaBackend` for real webcams with the `camera` feature
//! - Configuration via [`CaptureConstraints`] and [`Resolution`]

mod backend;
mod device;
mod frame_utils;
#[cfg(feature = "camera")]
mod nokhwa_backend;
mod types;

pub use backend::{CameraBackend, FrameSource, ReplayBackend};
pub use device::{CaptureDevice, PreviewHandle};
#[cfg(feature = "camera")]
pub use nokhwa_backend::NokhwaBackend;
pub use types::{
    CameraInfo, CaptureConstraints, CaptureError, FacingMode, PixelFormat, RawFrame, Resolution,
    StreamInfo,
};
