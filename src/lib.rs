//! dataview - streaming viewer for large remote data files.
//!
//! The crate covers the content pipeline of the viewer: a size probe, an
//! optional confirmation gate for large files, a streamed download with
//! byte-accurate progress, reassembly and decoding, and fixed-size paging
//! over the decoded text. Rendering is left to the caller, which observes
//! a [`ViewerSession`] through [`ViewerEvent`]s.

pub mod config;
pub mod fetcher;
pub mod folders;
pub mod format;
pub mod models;
pub mod pager;
pub mod session;
pub mod source;
pub mod transfer;

pub use crate::fetcher::{
    AlwaysConfirm, ConfirmPrompt, LoadError, LoadErrorKind, LoadOutcome, StreamFetcher,
    DEFAULT_MAX_SAFE_SIZE,
};
pub use crate::folders::{FolderNode, FolderTreeModel};
pub use crate::format::format_size;
pub use crate::models::{FetchTarget, FileEntry, LoadState, ViewContent};
pub use crate::pager::{PageCursor, PageView, DEFAULT_PAGE_SIZE};
pub use crate::session::{EventSink, LoadTicket, PendingLoad, ViewerEvent, ViewerSession};
pub use crate::source::{ContentSource, HttpSource, MemoryFile, MemorySource, SourceError};
pub use crate::transfer::{ChunkAssembler, NotCompleteError, ProgressReporter, ProgressUpdate};
