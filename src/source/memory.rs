//! In-memory content source.
//!
//! Serves files from memory in fixed-size chunks. Files can misreport their
//! size or fail part-way through the body, which makes it suitable for
//! embedding the viewer without a server and for exercising error paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};

use super::{ContentSource, OpenedStream, Probe, SourceError};
use crate::models::{FetchTarget, FileEntry};

/// Default chunk size for streamed bodies.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// A file held by a [`MemorySource`].
#[derive(Debug, Clone)]
pub struct MemoryFile {
    data: Bytes,
    content_type: Option<String>,
    /// What the probe reports. Defaults to the real length.
    declared_length: Option<u64>,
    /// Fail the stream once this many bytes have been delivered.
    fail_after: Option<usize>,
}

impl MemoryFile {
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            declared_length: Some(data.len() as u64),
            data,
            content_type: None,
            fail_after: None,
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    /// Report this length from the probe instead of the real one.
    pub fn with_declared_length(mut self, length: u64) -> Self {
        self.declared_length = Some(length);
        self
    }

    /// Probe reports no length at all.
    pub fn without_length(mut self) -> Self {
        self.declared_length = None;
        self
    }

    /// Break the stream after `bytes` bytes.
    pub fn failing_after(mut self, bytes: usize) -> Self {
        self.fail_after = Some(bytes);
        self
    }
}

/// Content source backed by in-memory folders.
#[derive(Debug, Clone)]
pub struct MemorySource {
    folders: BTreeMap<String, BTreeMap<String, MemoryFile>>,
    chunk_size: usize,
    probes: Arc<AtomicUsize>,
    fetches: Arc<AtomicUsize>,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            folders: BTreeMap::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            probes: Arc::new(AtomicUsize::new(0)),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Add an empty folder.
    pub fn with_folder(mut self, folder: &str) -> Self {
        self.folders.entry(folder.to_string()).or_default();
        self
    }

    /// Add a file.
    pub fn with_file(mut self, folder: &str, name: &str, file: MemoryFile) -> Self {
        self.folders
            .entry(folder.to_string())
            .or_default()
            .insert(name.to_string(), file);
        self
    }

    /// Number of size probes served.
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Number of body streams opened.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn file(&self, target: &FetchTarget) -> Result<&MemoryFile, SourceError> {
        self.folders
            .get(&target.folder)
            .and_then(|files| files.get(&target.filename))
            .ok_or_else(|| SourceError::Status {
                status: 404,
                url: format!("memory:{}", target),
            })
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn list_folder(&self, folder: &str) -> Result<Vec<FileEntry>, SourceError> {
        let files = self.folders.get(folder).ok_or_else(|| SourceError::Status {
            status: 404,
            url: format!("memory:{}", folder),
        })?;

        Ok(files
            .iter()
            .map(|(name, file)| FileEntry::new(name.clone(), Some(file.data.len() as u64)))
            .collect())
    }

    async fn probe(&self, target: &FetchTarget) -> Result<Probe, SourceError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let file = self.file(target)?;
        Ok(Probe {
            content_length: file.declared_length,
            content_type: file.content_type.clone(),
        })
    }

    async fn open_stream(&self, target: &FetchTarget) -> Result<OpenedStream, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let file = self.file(target)?;

        let deliverable = file
            .fail_after
            .map_or(file.data.len(), |limit| limit.min(file.data.len()));

        let mut items: Vec<Result<Bytes, SourceError>> = Vec::new();
        let mut start = 0;
        while start < deliverable {
            let end = (start + self.chunk_size).min(deliverable);
            items.push(Ok(file.data.slice(start..end)));
            start = end;
        }
        if file.fail_after.is_some() {
            items.push(Err(SourceError::Read(format!(
                "connection reset after {} bytes",
                deliverable
            ))));
        }

        Ok(OpenedStream {
            content_type: file.content_type.clone(),
            chunks: stream::iter(items).boxed(),
        })
    }
}
