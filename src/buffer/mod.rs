//! Replay frame storage
//!
//! The rolling window of recent frames kept compressed in memory:
//! - CompressedFrame, one stored payload plus its capture dimensions
//! - FrameRingBuffer, the fixed-capacity circular store with overwrite-oldest
//!   semantics

pub mod frame;
pub mod ring;

pub use frame::CompressedFrame;
pub use ring::FrameRingBuffer;
