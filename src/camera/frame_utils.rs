//! Frame transformation and backend error helpers.

use super::types::{CaptureError, RawFrame};

/// Mirror a frame horizontally (flip left-right).
pub fn mirror_horizontal(frame: &mut RawFrame) {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let bpp = frame.bytes_per_pixel();

    if frame.data.len() < width * height * bpp {
        return;
    }

    for y in 0..height {
        let row_start = y * width * bpp;
        let row = &mut frame.data[row_start..row_start + width * bpp];

        for x in 0..width / 2 {
            let left = x * bpp;
            let right = (width - 1 - x) * bpp;
            for i in 0..bpp {
                row.swap(left + i, right + i);
            }
        }
    }
}

/// Turn a backend's "could not open" message into a typed error.
///
/// Backends rarely expose a distinct permission error, so the message text
/// is the only signal.
pub fn classify_open_error(message: &str) -> CaptureError {
    let msg = message.to_lowercase();
    if msg.contains("permission")
        || msg.contains("denied")
        || msg.contains("authorization")
        || msg.contains("not authorized")
    {
        CaptureError::PermissionDenied
    } else {
        CaptureError::DeviceUnavailable(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_horizontal_2x1() {
        let mut frame = RawFrame::rgb(2, 1, vec![1, 2, 3, 4, 5, 6]);
        mirror_horizontal(&mut frame);
        assert_eq!(frame.data, vec![4, 5, 6, 1, 2, 3]);
    }

    #[test]
    fn test_mirror_horizontal_3x2() {
        let mut frame = RawFrame::rgb(
            3,
            2,
            vec![
                1, 1, 1, 2, 2, 2, 3, 3, 3, // Row 0: A, B, C
                4, 4, 4, 5, 5, 5, 6, 6, 6, // Row 1: D, E, F
            ],
        );
        mirror_horizontal(&mut frame);
        assert_eq!(
            frame.data,
            vec![
                3, 3, 3, 2, 2, 2, 1, 1, 1, // Row 0: C, B, A
                6, 6, 6, 5, 5, 5, 4, 4, 4, // Row 1: F, E, D
            ]
        );
    }

    #[test]
    fn test_mirror_horizontal_single_pixel() {
        let mut frame = RawFrame::rgb(1, 1, vec![1, 2, 3]);
        mirror_horizontal(&mut frame);
        assert_eq!(frame.data, vec![1, 2, 3]);
    }

    #[test]
    fn test_mirror_horizontal_ignores_short_buffer() {
        let mut frame = RawFrame::rgb(2, 2, vec![1, 2, 3]);
        mirror_horizontal(&mut frame);
        assert_eq!(frame.data, vec![1, 2, 3]);
    }

    #[test]
    fn test_classify_open_error_permission() {
        assert!(matches!(
            classify_open_error("Camera access denied by user"),
            CaptureError::PermissionDenied
        ));
        assert!(matches!(
            classify_open_error("AVFoundation: Not Authorized"),
            CaptureError::PermissionDenied
        ));
    }

    #[test]
    fn test_classify_open_error_other() {
        match classify_open_error("No such device: /dev/video4") {
            CaptureError::DeviceUnavailable(msg) => assert!(msg.contains("/dev/video4")),
            other => panic!("Expected DeviceUnavailable, got {:?}", other),
        }
    }
}
