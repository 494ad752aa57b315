//! Core data types shared by the fetch pipeline and the viewer session.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A file to view, addressed by its folder and filename on the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchTarget {
    pub folder: String,
    pub filename: String,
}

impl FetchTarget {
    pub fn new(folder: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            filename: filename.into(),
        }
    }
}

impl fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.folder, self.filename)
    }
}

/// One entry of a folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    /// Size in bytes as reported by the listing, if any.
    #[serde(default)]
    pub size: Option<u64>,
}

impl FileEntry {
    pub fn new(name: impl Into<String>, size: Option<u64>) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// Decoded text of a loaded file.
///
/// `length` counts chars, not bytes, so page windows never split a
/// character. Clones share the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewContent {
    text: Arc<str>,
    length: usize,
}

impl ViewContent {
    pub fn new(text: String) -> Self {
        let length = text.chars().count();
        Self {
            text: text.into(),
            length,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in chars.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// True when every char is a single byte, so char offsets are byte offsets.
    pub(crate) fn is_single_byte(&self) -> bool {
        self.text.len() == self.length
    }
}

/// Stage of the current (or most recent) load of a viewer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Idle,
    Probing,
    AwaitingConfirmation,
    Streaming,
    Decoding,
    Ready,
    Failed,
}

impl LoadState {
    /// Whether a load is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            LoadState::Probing
                | LoadState::AwaitingConfirmation
                | LoadState::Streaming
                | LoadState::Decoding
        )
    }
}
