//! Two-phase file loading: size probe, then a streamed body read.

use std::sync::Arc;

use futures::StreamExt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::format::format_size;
use crate::models::{FetchTarget, LoadState, ViewContent};
use crate::session::LoadTicket;
use crate::source::{ContentSource, SourceError};
use crate::transfer::{
    ChunkAssembler, DecodeError, NotCompleteError, ProgressReporter, ProgressTracker, TextEncoding,
};

/// Files above this size (5 MiB) need confirmation before download.
pub const DEFAULT_MAX_SAFE_SIZE: u64 = 5 * 1024 * 1024;

/// Asks the user whether to go ahead with a slow download.
pub trait ConfirmPrompt: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

/// Prompt that accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl ConfirmPrompt for AlwaysConfirm {
    fn confirm(&self, _message: &str) -> bool {
        true
    }
}

impl<F> ConfirmPrompt for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// Errors that abort a load.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not check file size: {0}")]
    Probe(#[source] SourceError),
    #[error("download failed after {received} bytes: {source}")]
    Transport {
        received: u64,
        #[source]
        source: SourceError,
    },
    #[error("could not decode file: {0}")]
    Decode(#[from] DecodeError),
    /// The buffer was assembled before the stream finished. Indicates a bug
    /// in the load sequence, never a transfer problem.
    #[error("internal error: {0}")]
    Internal(#[source] NotCompleteError),
}

/// Category of a [`LoadError`], carried by failure events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadErrorKind {
    Probe,
    Transport,
    Decode,
    Internal,
}

impl LoadError {
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            LoadError::Probe(_) => LoadErrorKind::Probe,
            LoadError::Transport { .. } => LoadErrorKind::Transport,
            LoadError::Decode(_) => LoadErrorKind::Decode,
            LoadError::Internal(_) => LoadErrorKind::Internal,
        }
    }
}

/// How a load ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(ViewContent),
    /// The user declined the large-file prompt. Nothing was downloaded.
    Declined,
    /// A newer load started; this one stopped early.
    Superseded,
}

/// Loads files from a [`ContentSource`].
pub struct StreamFetcher<S> {
    source: S,
    prompt: Arc<dyn ConfirmPrompt>,
    max_safe_size: u64,
}

impl<S: ContentSource> StreamFetcher<S> {
    pub fn new(source: S, prompt: Arc<dyn ConfirmPrompt>) -> Self {
        Self {
            source,
            prompt,
            max_safe_size: DEFAULT_MAX_SAFE_SIZE,
        }
    }

    /// Override the confirmation threshold.
    pub fn with_max_safe_size(mut self, max_safe_size: u64) -> Self {
        self.max_safe_size = max_safe_size;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn max_safe_size(&self) -> u64 {
        self.max_safe_size
    }

    /// Load and decode one file.
    ///
    /// Progress goes to `reporter` only while `ticket` is current. Partial
    /// data is dropped on any error.
    pub async fn load(
        &self,
        target: &FetchTarget,
        ticket: &LoadTicket,
        reporter: &dyn ProgressReporter,
    ) -> Result<LoadOutcome, LoadError> {
        reporter.on_stage(LoadState::Probing);
        let probe = self.source.probe(target).await.map_err(LoadError::Probe)?;
        if !ticket.is_current() {
            debug!("Load of {} superseded after probe", target);
            return Ok(LoadOutcome::Superseded);
        }

        let total = probe.content_length;
        match total {
            Some(size) => debug!("{} is {} ({} bytes)", target, format_size(size), size),
            None => info!(
                "No content length for {}, progress will be indeterminate",
                target
            ),
        }

        if let Some(size) = total.filter(|size| *size > self.max_safe_size) {
            reporter.on_stage(LoadState::AwaitingConfirmation);
            if !self.prompt.confirm(&large_file_message(size)) {
                info!("Download of {} ({}) declined", target, format_size(size));
                return Ok(LoadOutcome::Declined);
            }
            if !ticket.is_current() {
                return Ok(LoadOutcome::Superseded);
            }
        }

        reporter.on_stage(LoadState::Streaming);
        let opened = self
            .source
            .open_stream(target)
            .await
            .map_err(|source| LoadError::Transport {
                received: 0,
                source,
            })?;

        let mut assembler = ChunkAssembler::new(total);
        let mut tracker = ProgressTracker::new(total);
        let mut warned_overrun = false;
        let mut chunks = opened.chunks;

        reporter.on_progress(&tracker.update(0));

        while let Some(next) = chunks.next().await {
            let chunk = next.map_err(|source| LoadError::Transport {
                received: assembler.total_received(),
                source,
            })?;
            if !ticket.is_current() {
                debug!(
                    "Load of {} superseded after {} bytes",
                    target,
                    assembler.total_received()
                );
                return Ok(LoadOutcome::Superseded);
            }

            assembler.append(chunk);
            if assembler.is_overrun() && !warned_overrun {
                warned_overrun = true;
                warn!(
                    "{} sent more than the {} bytes it announced",
                    target,
                    total.unwrap_or_default()
                );
            }
            reporter.on_progress(&tracker.update(assembler.total_received()));
        }

        assembler.finish();
        let received = assembler.total_received();
        debug!(
            "Received {} in {} chunks for {}",
            format_size(received),
            assembler.chunk_count(),
            target
        );
        reporter.on_progress(&tracker.complete(received));

        reporter.on_stage(LoadState::Decoding);
        let content_type = opened.content_type.or(probe.content_type);
        let encoding = TextEncoding::from_content_type(content_type.as_deref())?;
        debug_assert!(assembler.is_complete());
        let buffer = assembler.assemble().map_err(LoadError::Internal)?;
        let text = encoding.decode(buffer)?;

        Ok(LoadOutcome::Loaded(ViewContent::new(text)))
    }
}

/// Prompt text for the large-file gate.
pub fn large_file_message(size: u64) -> String {
    format!(
        "This file is large ({}) and may take a while to load. Would you like to proceed?",
        format_size(size)
    )
}
