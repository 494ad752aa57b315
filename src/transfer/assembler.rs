//! In-memory chunk buffer for a streamed download.

use bytes::Bytes;
use thiserror::Error;

/// `assemble` was called before the stream signalled completion.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("transfer not complete ({received} bytes buffered)")]
pub struct NotCompleteError {
    pub received: u64,
}

/// Collects the chunks of one transfer.
///
/// The whole body is held in memory until [`assemble`](Self::assemble);
/// callers gate large downloads before they start.
#[derive(Debug, Default)]
pub struct ChunkAssembler {
    total_bytes: Option<u64>,
    received: u64,
    chunks: Vec<Bytes>,
    complete: bool,
}

impl ChunkAssembler {
    /// Create an assembler for a transfer whose size may be known from a probe.
    pub fn new(total_bytes: Option<u64>) -> Self {
        Self {
            total_bytes,
            ..Default::default()
        }
    }

    /// Append the next chunk. Chunks are kept strictly in append order.
    pub fn append(&mut self, chunk: Bytes) {
        debug_assert!(!self.complete, "append after finish");
        self.received += chunk.len() as u64;
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    /// Bytes received so far (sum of all appended chunk lengths).
    pub fn total_received(&self) -> u64 {
        self.received
    }

    /// Total size from the probe, if the server reported one.
    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Fraction of the probed total received so far, clamped to 1.0.
    ///
    /// `None` when the total is unknown or zero.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(total) if total > 0 => Some((self.received as f64 / total as f64).min(1.0)),
            _ => None,
        }
    }

    /// More bytes arrived than the probe announced.
    pub fn is_overrun(&self) -> bool {
        matches!(self.total_bytes, Some(total) if self.received > total)
    }

    /// Mark the stream as complete.
    pub fn finish(&mut self) {
        self.complete = true;
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Concatenate all chunks into one buffer of exactly `total_received` bytes.
    pub fn assemble(self) -> Result<Vec<u8>, NotCompleteError> {
        if !self.complete {
            return Err(NotCompleteError {
                received: self.received,
            });
        }

        let mut buffer = Vec::with_capacity(self.received as usize);
        for chunk in &self.chunks {
            buffer.extend_from_slice(chunk);
        }
        Ok(buffer)
    }
}
