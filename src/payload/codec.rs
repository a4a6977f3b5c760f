//! Frame and upload normalization.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, RgbImage, RgbaImage};
use thiserror::Error;

use super::image_payload::{ImagePayload, ImageSource};
use crate::camera::{PixelFormat, RawFrame};

/// JPEG quality used when nothing else is configured.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Longest edge kept before downscaling.
pub const DEFAULT_MAX_DIMENSION: u32 = 1920;

/// Reasons an input cannot become a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unsupported file type '{0}': expected an image")]
    UnsupportedMime(String),

    #[error("could not decode image: {0}")]
    Undecodable(String),

    #[error("frame buffer is {len} bytes, {width}x{height} needs {expected}")]
    InvalidFrame {
        width: u32,
        height: u32,
        len: usize,
        expected: usize,
    },

    #[error("JPEG encoding failed: {0}")]
    Encode(String),
}

/// Produces [`ImagePayload`]s from either capture path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageCodec {
    quality: u8,
    max_dimension: u32,
}

impl Default for ImageCodec {
    fn default() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

impl ImageCodec {
    /// Quality is clamped to 1-100, the dimension to at least 1.
    pub fn new(quality: u8, max_dimension: u32) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            max_dimension: max_dimension.max(1),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Validate and decode an uploaded file.
    ///
    /// The declared MIME must be `image/*`; the actual format is sniffed from
    /// the bytes. EXIF orientation is applied so phone photos come out upright.
    pub fn from_upload(
        &self,
        bytes: &[u8],
        declared_mime: &str,
    ) -> Result<ImagePayload, CodecError> {
        let mime = normalize_mime(declared_mime);
        if !mime.starts_with("image/") {
            return Err(CodecError::UnsupportedMime(declared_mime.trim().to_string()));
        }
        if bytes.is_empty() {
            return Err(CodecError::Undecodable("file is empty".to_string()));
        }

        let rgb = decode_upload(bytes)?;
        self.encode(rgb, ImageSource::Upload)
    }

    /// Wrap a captured frame.
    pub fn from_frame(&self, frame: &RawFrame) -> Result<ImagePayload, CodecError> {
        let expected = frame.expected_len();
        if frame.width == 0 || frame.height == 0 || frame.data.len() != expected {
            return Err(CodecError::InvalidFrame {
                width: frame.width,
                height: frame.height,
                len: frame.data.len(),
                expected,
            });
        }

        let rgb = match frame.format {
            PixelFormat::Rgb => RgbImage::from_raw(frame.width, frame.height, frame.data.clone()),
            PixelFormat::Rgba => RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
                .map(|rgba| DynamicImage::ImageRgba8(rgba).to_rgb8()),
        };
        let rgb = rgb.ok_or(CodecError::InvalidFrame {
            width: frame.width,
            height: frame.height,
            len: frame.data.len(),
            expected,
        })?;

        self.encode(rgb, ImageSource::Camera)
    }

    /// The single encoder both paths go through.
    fn encode(&self, rgb: RgbImage, source: ImageSource) -> Result<ImagePayload, CodecError> {
        let (width, height) = fit_within(rgb.width(), rgb.height(), self.max_dimension);
        let rgb = if (width, height) == rgb.dimensions() {
            rgb
        } else {
            image::imageops::resize(&rgb, width, height, FilterType::Triangle)
        };

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, self.quality)
            .encode_image(&rgb)
            .map_err(|e| CodecError::Encode(e.to_string()))?;

        Ok(ImagePayload::new(bytes, width, height, source, self.quality))
    }
}

fn decode_upload(bytes: &[u8]) -> Result<RgbImage, CodecError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CodecError::Undecodable(e.to_string()))?;
    if reader.format().is_none() {
        return Err(CodecError::Undecodable(
            "content is not a recognised image format".to_string(),
        ));
    }

    let mut decoder = reader
        .into_decoder()
        .map_err(|e| CodecError::Undecodable(e.to_string()))?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut image =
        DynamicImage::from_decoder(decoder).map_err(|e| CodecError::Undecodable(e.to_string()))?;
    image.apply_orientation(orientation);

    Ok(image.to_rgb8())
}

/// Lowercase, parameters stripped: `"Image/PNG; q=1"` -> `"image/png"`.
fn normalize_mime(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Scale (width, height) down to fit a square of `max` preserving aspect.
fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max {
        return (width, height);
    }
    let scale = f64::from(max) / f64::from(longest);
    let scaled = |v: u32| ((f64::from(v) * scale).round() as u32).clamp(1, max);
    (scaled(width), scaled(height))
}
