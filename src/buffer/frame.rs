//! Compressed frame payloads
//!
//! A single timestamped frame as stored in the replay ring: one compressed
//! image payload plus the pixel dimensions it had at capture time.

use chrono::{DateTime, Utc};

/// One compressed frame held by a ring slot.
///
/// Immutable once stored. A frame is owned by exactly one slot and is released
/// either when the slot is overwritten or when the ring is cleared/disposed.
#[derive(Debug, Clone)]
pub struct CompressedFrame {
    /// Compressed image data (JPEG)
    payload: Vec<u8>,

    /// Pixel width at capture time
    width: u32,

    /// Pixel height at capture time
    height: u32,

    /// Wall-clock time the frame was captured
    captured_at: DateTime<Utc>,
}

impl CompressedFrame {
    /// Create a frame captured now.
    pub fn new(payload: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            payload,
            width,
            height,
            captured_at: Utc::now(),
        }
    }

    /// Compressed payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Pixel width at capture time.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Pixel height at capture time.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Capture timestamp.
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_accessors() {
        let frame = CompressedFrame::new(vec![1, 2, 3], 640, 360);
        assert_eq!(frame.payload(), &[1, 2, 3]);
        assert_eq!(frame.len(), 3);
        assert!(!frame.is_empty());
        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 360);
    }

    #[test]
    fn test_empty_payload() {
        let frame = CompressedFrame::new(Vec::new(), 0, 0);
        assert!(frame.is_empty());
        assert_eq!(frame.len(), 0);
    }
}
