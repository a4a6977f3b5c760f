//! Canonical image payload and the codec that produces it.
//!
//! Camera frames and uploaded files both end up as an [`ImagePayload`]:
//! RGB pixels, bounded in size, JPEG-encoded at one quality. Downstream code
//! never needs to know which path an image came from.

mod codec;
mod image_payload;

pub use codec::{CodecError, ImageCodec, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_DIMENSION};
pub use image_payload::{ImagePayload, ImageSource, CANONICAL_MIME};
