//! Content sources: where folder listings, size probes and byte streams come from.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::models::{FetchTarget, FileEntry};

pub use http::HttpSource;
pub use memory::{MemoryFile, MemorySource};

/// Ordered chunks of a response body. The stream ends after the last chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, SourceError>>;

/// Errors from a content source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },
    /// Request could not be sent or no response arrived.
    #[error("connection error: {0}")]
    Connection(String),
    /// Body read failed after the response started.
    #[error("read error: {0}")]
    Read(String),
    /// Response body was not what we expected.
    #[error("invalid response: {0}")]
    Parse(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// Result of a header-only size probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Probe {
    /// `None` when the server did not send a usable Content-Length.
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
}

/// An opened body stream.
pub struct OpenedStream {
    pub content_type: Option<String>,
    pub chunks: ByteStream,
}

/// Where the viewer gets its data.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// List files in a folder.
    async fn list_folder(&self, folder: &str) -> Result<Vec<FileEntry>, SourceError>;

    /// Learn the size of a file without downloading it.
    async fn probe(&self, target: &FetchTarget) -> Result<Probe, SourceError>;

    /// Start downloading a file.
    async fn open_stream(&self, target: &FetchTarget) -> Result<OpenedStream, SourceError>;
}
