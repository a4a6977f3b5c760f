//! Camera types and data structures.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Information about an available camera device.
#[derive(Debug, Clone)]
pub struct CameraInfo {
    /// Device index for selection
    pub index: u32,
    /// Human-readable device name
    pub name: String,
    /// Device description
    pub description: String,
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.index, self.name, self.description)
    }
}

/// Camera resolution settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// 1280x720
    pub const HD: Resolution = Resolution {
        width: 1280,
        height: 720,
    };

    /// 1920x1080 - preferred for recognition
    pub const FULL_HD: Resolution = Resolution {
        width: 1920,
        height: 1080,
    };
}

impl Default for Resolution {
    fn default() -> Self {
        Self::FULL_HD
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Which way the camera should face.
///
/// Backends that cannot tell cameras apart by facing treat this as a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear camera, pointed away from the user
    #[default]
    Environment,
    /// Front (selfie) camera
    User,
}

/// What the caller asks for when acquiring a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConstraints {
    /// Camera device index
    pub device_index: u32,
    /// Preferred facing
    pub facing: FacingMode,
    /// Preferred resolution (actual may differ)
    pub resolution: Resolution,
    /// Target FPS (actual may vary)
    pub fps: u32,
    /// Mirror horizontally
    pub mirror: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            device_index: 0,
            facing: FacingMode::Environment,
            resolution: Resolution::FULL_HD,
            fps: 30,
            mirror: false,
        }
    }
}

/// Pixel layout of a raw frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 3 bytes per pixel
    Rgb,
    /// 4 bytes per pixel, alpha is discarded on encode
    Rgba,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// An uncompressed frame as produced by a capture backend.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Raw pixel data, row-major
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel format
    pub format: PixelFormat,
    /// When the frame was read from the device
    pub timestamp: Instant,
}

impl RawFrame {
    /// Build an RGB frame stamped now.
    pub fn rgb(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            data,
            width,
            height,
            format: PixelFormat::Rgb,
            timestamp: Instant::now(),
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.format.bytes_per_pixel()
    }

    /// Number of bytes the stated geometry requires.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.bytes_per_pixel()
    }
}

/// What the device actually delivers once streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub resolution: Resolution,
    pub fps: u32,
}

/// Errors that can occur during camera operations.
#[derive(Debug)]
pub enum CaptureError {
    /// User or OS refused camera access
    PermissionDenied,
    /// No device matches, or it could not be opened
    DeviceUnavailable(String),
    /// Stream opened but failed while running
    StreamFailed(String),
    /// No live handle is held
    NotActive,
    /// A live handle is already held
    AlreadyActive,
    /// The sampled frame could not be turned into a payload
    Encoding(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::PermissionDenied => write!(f, "Camera permission denied"),
            CaptureError::DeviceUnavailable(msg) => write!(f, "Camera unavailable: {}", msg),
            CaptureError::StreamFailed(msg) => write!(f, "Camera stream failed: {}", msg),
            CaptureError::NotActive => write!(f, "Camera is not active"),
            CaptureError::AlreadyActive => write!(f, "Camera is already active"),
            CaptureError::Encoding(msg) => write!(f, "Failed to encode frame: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}
