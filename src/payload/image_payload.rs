//! The immutable image value handed to recognition.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// MIME type of every canonical payload.
pub const CANONICAL_MIME: &str = "image/jpeg";

/// Where an image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    Camera,
    Upload,
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Camera => write!(f, "camera"),
            ImageSource::Upload => write!(f, "upload"),
        }
    }
}

/// Encoded still image. Built only by [`super::ImageCodec`].
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    source: ImageSource,
    quality: u8,
}

impl ImagePayload {
    pub(super) fn new(
        bytes: Vec<u8>,
        width: u32,
        height: u32,
        source: ImageSource,
        quality: u8,
    ) -> Self {
        Self {
            bytes,
            width,
            height,
            source,
            quality,
        }
    }

    /// Encoded JPEG bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn source(&self) -> ImageSource {
        self.source
    }

    pub fn mime(&self) -> &'static str {
        CANONICAL_MIME
    }

    /// JPEG quality the bytes were encoded with (1-100).
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Short content hash for logs.
    ///
    /// 32 hex chars (first 16 bytes of SHA-256 over the encoded bytes).
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        let result = hasher.finalize();
        hex::encode(&result[..16])
    }

    /// Standard base64 of the encoded bytes.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// `data:image/jpeg;base64,...`, as browsers render it.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", CANONICAL_MIME, self.to_base64())
    }
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("source", &self.source)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.bytes.len())
            .field("quality", &self.quality)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ImagePayload {
        ImagePayload::new(vec![0xFF, 0xD8, 0xFF, 0xD9], 2, 1, ImageSource::Upload, 80)
    }

    #[test]
    fn test_digest_is_stable_and_short() {
        let payload = sample();
        assert_eq!(payload.digest().len(), 32);
        assert_eq!(payload.digest(), sample().digest());
    }

    #[test]
    fn test_data_url_prefix() {
        let url = sample().to_data_url();
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert!(url.ends_with(&sample().to_base64()));
    }

    #[test]
    fn test_debug_omits_bytes() {
        let debug = format!("{:?}", sample());
        assert!(debug.contains("len: 4"));
        assert!(!debug.contains("255"));
    }

    #[test]
    fn test_source_display() {
        assert_eq!(ImageSource::Camera.to_string(), "camera");
        assert_eq!(ImageSource::Upload.to_string(), "upload");
    }
}
