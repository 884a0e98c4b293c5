//! Fixed-capacity frame ring
//!
//! Circular store for the replay window. Once full, every push overwrites the
//! single oldest frame; there is no separate eviction pass and no resize.

use super::frame::CompressedFrame;

/// Fixed-capacity circular store of compressed frames.
///
/// Capacity is `fps * window_seconds`, fixed for the lifetime of the instance.
/// The last-observed capture dimensions are tracked separately from the stored
/// frames and may diverge from older slots if the source resolution changes
/// mid-session; the ring does not reconcile this, the encoder rescales at
/// export time.
#[derive(Debug)]
pub struct FrameRingBuffer {
    slots: Vec<Option<CompressedFrame>>,
    capacity: usize,
    write_cursor: usize,
    count: usize,
    fps: u32,
    last_width: u32,
    last_height: u32,
    disposed: bool,
}

impl FrameRingBuffer {
    /// Create a ring holding `fps * window_seconds` frames.
    ///
    /// A zero capacity is legal but yields a permanently empty ring that
    /// silently drops pushes; callers validate positive values upstream.
    pub fn new(fps: u32, window_seconds: u32) -> Self {
        let capacity = (fps as usize) * (window_seconds as usize);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        Self {
            slots,
            capacity,
            write_cursor: 0,
            count: 0,
            fps,
            last_width: 0,
            last_height: 0,
            disposed: false,
        }
    }

    /// Push a frame, overwriting the oldest once full. O(1).
    ///
    /// Overflow is the intended steady-state: the evicted frame is released
    /// silently. Pushes into a disposed or zero-capacity ring are no-ops.
    pub fn push(&mut self, frame: CompressedFrame) {
        if self.disposed || self.capacity == 0 {
            return;
        }

        self.last_width = frame.width();
        self.last_height = frame.height();

        // Overwriting the slot releases the previous payload.
        self.slots[self.write_cursor] = Some(frame);
        self.write_cursor = (self.write_cursor + 1) % self.capacity;
        if self.count < self.capacity {
            self.count += 1;
        }
    }

    /// Visit the stored frames from oldest to newest.
    ///
    /// `visit` receives a 0-based chronological index and the frame. Read-only;
    /// cursor and count are untouched. No invocations occur when empty.
    pub fn read_in_order<F>(&self, mut visit: F)
    where
        F: FnMut(usize, &CompressedFrame),
    {
        for i in 0..self.count {
            let slot = (self.write_cursor + self.capacity - self.count + i) % self.capacity;
            if let Some(frame) = &self.slots[slot] {
                visit(i, frame);
            }
        }
    }

    /// Number of frames currently stored.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the ring holds no frames.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Maximum number of frames the ring can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Configured sampling rate.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Dimensions of the most recently pushed frame, `(0, 0)` before any push.
    pub fn last_dimensions(&self) -> (u32, u32) {
        (self.last_width, self.last_height)
    }

    /// Sum of payload sizes across the live slots, recomputed on demand.
    ///
    /// Used for diagnostics and "how much memory will this replay consume"
    /// estimates.
    pub fn estimated_memory_bytes(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .map(CompressedFrame::len)
            .sum()
    }

    /// Release all payloads and reset the cursor. Idempotent.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.write_cursor = 0;
        self.count = 0;
    }

    /// Clear and mark the ring unusable; later pushes are dropped. Idempotent.
    pub fn dispose(&mut self) {
        self.clear();
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(label: u8, width: u32, height: u32) -> CompressedFrame {
        CompressedFrame::new(vec![label], width, height)
    }

    fn labels(ring: &FrameRingBuffer) -> Vec<u8> {
        let mut out = Vec::new();
        ring.read_in_order(|_, f| out.push(f.payload()[0]));
        out
    }

    #[test]
    fn test_capacity_from_fps_and_window() {
        let ring = FrameRingBuffer::new(30, 10);
        assert_eq!(ring.capacity(), 300);
        assert_eq!(ring.fps(), 30);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_wraparound_keeps_most_recent() {
        // fps=1, 3 seconds: capacity 3. Push A..E, expect C, D, E.
        let mut ring = FrameRingBuffer::new(1, 3);
        for label in [b'A', b'B', b'C', b'D', b'E'] {
            ring.push(frame(label, 4, 4));
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(labels(&ring), vec![b'C', b'D', b'E']);
    }

    #[test]
    fn test_chronological_index() {
        let mut ring = FrameRingBuffer::new(1, 3);
        ring.push(frame(1, 4, 4));
        ring.push(frame(2, 4, 4));

        let mut indices = Vec::new();
        ring.read_in_order(|i, _| indices.push(i));
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_count_never_exceeds_capacity() {
        let mut ring = FrameRingBuffer::new(2, 2);
        for i in 0..50 {
            ring.push(frame(i, 4, 4));
            assert!(ring.len() <= ring.capacity());
        }
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn test_read_in_order_on_empty() {
        let ring = FrameRingBuffer::new(1, 3);
        let mut calls = 0;
        ring.read_in_order(|_, _| calls += 1);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_memory_accounting_tracks_eviction() {
        let mut ring = FrameRingBuffer::new(1, 2);
        ring.push(CompressedFrame::new(vec![0; 100], 4, 4));
        ring.push(CompressedFrame::new(vec![0; 200], 4, 4));
        assert_eq!(ring.estimated_memory_bytes(), 300);

        // Evicts the 100-byte frame.
        ring.push(CompressedFrame::new(vec![0; 50], 4, 4));
        assert_eq!(ring.estimated_memory_bytes(), 250);
    }

    #[test]
    fn test_clear_and_dispose_idempotent() {
        let mut ring = FrameRingBuffer::new(1, 2);
        ring.clear();
        assert_eq!(ring.len(), 0);

        ring.push(frame(1, 4, 4));
        ring.dispose();
        assert_eq!(ring.len(), 0);
        ring.dispose();
        assert_eq!(ring.len(), 0);
    }

    #[test]
    fn test_push_after_dispose_is_noop() {
        let mut ring = FrameRingBuffer::new(1, 2);
        ring.dispose();
        ring.push(frame(1, 4, 4));
        assert!(ring.is_empty());
        assert_eq!(ring.estimated_memory_bytes(), 0);
    }

    #[test]
    fn test_zero_capacity_drops_pushes() {
        let mut ring = FrameRingBuffer::new(0, 5);
        ring.push(frame(1, 4, 4));
        assert_eq!(ring.capacity(), 0);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_last_dimensions_follow_newest_push() {
        let mut ring = FrameRingBuffer::new(1, 3);
        assert_eq!(ring.last_dimensions(), (0, 0));
        ring.push(frame(1, 640, 360));
        ring.push(frame(2, 1280, 720));
        // Older frames keep their own dimensions; the ring reports the newest.
        assert_eq!(ring.last_dimensions(), (1280, 720));
    }
}
