//! Byte accounting for a single streamed transfer.
//!
//! - [`ChunkAssembler`] buffers chunks in arrival order and counts bytes
//! - [`ProgressTracker`] turns byte counts into monotonic percentages
//! - [`TextEncoding`] decodes the assembled buffer

pub mod assembler;
pub mod decode;
pub mod progress;

pub use assembler::{ChunkAssembler, NotCompleteError};
pub use decode::{DecodeError, TextEncoding};
pub use progress::{NoopReporter, ProgressReporter, ProgressTracker, ProgressUpdate};
