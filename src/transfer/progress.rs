//! Download progress reporting.

use serde::Serialize;

use crate::format::format_size;
use crate::models::LoadState;

/// Highest percentage reported while the stream is still open.
const STREAMING_PERCENT_CAP: u8 = 99;

/// Snapshot of a transfer's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    pub received_bytes: u64,
    /// Total from the size probe; `None` when the server did not send one.
    pub total_bytes: Option<u64>,
    /// 0..=100. `None` while the total is unknown.
    pub percentage: Option<u8>,
}

impl ProgressUpdate {
    /// Status line shown next to the progress bar.
    pub fn status_message(&self) -> String {
        match (self.total_bytes, self.percentage) {
            (Some(total), Some(pct)) => format!(
                "Downloaded {} of {} ({}%)",
                format_size(self.received_bytes),
                format_size(total),
                pct
            ),
            _ => format!("Downloaded {}", format_size(self.received_bytes)),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.percentage == Some(100)
    }
}

/// Sink for progress of a load.
pub trait ProgressReporter {
    /// The load moved to a new stage.
    fn on_stage(&self, _stage: LoadState) {}

    /// Called once when streaming starts, once per chunk, and once on completion.
    fn on_progress(&self, update: &ProgressUpdate);
}

/// Reporter that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_progress(&self, _update: &ProgressUpdate) {}
}

/// Computes percentages for one transfer.
///
/// Percentages never decrease, stay at or below 99 until
/// [`complete`](Self::complete) is called, and never exceed 100 even if
/// more bytes arrive than the probe announced.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_bytes: Option<u64>,
    last_percentage: u8,
}

impl ProgressTracker {
    pub fn new(total_bytes: Option<u64>) -> Self {
        Self {
            total_bytes,
            last_percentage: 0,
        }
    }

    /// Progress after `received_bytes` have arrived, stream still open.
    pub fn update(&mut self, received_bytes: u64) -> ProgressUpdate {
        let percentage = self.total_bytes.map(|total| {
            let raw = if total == 0 {
                0
            } else {
                (received_bytes.saturating_mul(100) / total).min(STREAMING_PERCENT_CAP as u64)
                    as u8
            };
            self.last_percentage = self.last_percentage.max(raw);
            self.last_percentage
        });

        ProgressUpdate {
            received_bytes,
            total_bytes: self.total_bytes,
            percentage,
        }
    }

    /// Final progress once the stream signalled completion.
    pub fn complete(&mut self, received_bytes: u64) -> ProgressUpdate {
        self.last_percentage = 100;
        ProgressUpdate {
            received_bytes,
            total_bytes: self.total_bytes,
            percentage: Some(100),
        }
    }
}
