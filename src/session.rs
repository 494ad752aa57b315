//! Viewer session: the current file, its page cursor, and load bookkeeping.
//!
//! A load runs in three steps so that a newer load can supersede an older
//! one while it is still in flight:
//!
//! 1. [`ViewerSession::begin`] bumps the session generation and hands out a
//!    [`PendingLoad`].
//! 2. [`ViewerSession::fetch`] runs the download. Events from a load whose
//!    generation is no longer current are dropped.
//! 3. [`ViewerSession::commit`] applies the result, or discards it if the
//!    load was superseded in the meantime.
//!
//! [`ViewerSession::load`] does all three for the common case.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::fetcher::{LoadError, LoadErrorKind, LoadOutcome, StreamFetcher};
use crate::models::{FetchTarget, LoadState, ViewContent};
use crate::pager::{self, PageCursor, PageView};
use crate::source::ContentSource;
use crate::transfer::{ProgressReporter, ProgressUpdate};

/// Events emitted by a session for whatever renders it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ViewerEvent {
    StateChanged {
        state: LoadState,
    },
    Progress {
        update: ProgressUpdate,
        message: String,
    },
    LoadComplete {
        target: FetchTarget,
        content: ViewContent,
    },
    LoadFailed {
        kind: LoadErrorKind,
        message: String,
    },
    PageChanged {
        page: PageView,
    },
}

/// Receives viewer events.
pub trait EventSink {
    fn emit(&self, event: ViewerEvent);
}

impl<F> EventSink for F
where
    F: Fn(ViewerEvent),
{
    fn emit(&self, event: ViewerEvent) {
        self(event)
    }
}

/// Generation stamp of one load.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl LoadTicket {
    /// A ticket not tied to any session; it is always current.
    pub fn detached() -> Self {
        Self {
            generation: 0,
            current: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// False once a newer load has begun on the same session.
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }
}

/// A load that has begun but not been committed.
#[derive(Debug, Clone)]
pub struct PendingLoad {
    pub target: FetchTarget,
    pub ticket: LoadTicket,
}

/// One viewer: at most one file shown, at most one load in effect.
pub struct ViewerSession<S, E> {
    fetcher: StreamFetcher<S>,
    sink: E,
    page_size: usize,
    generation: Arc<AtomicU64>,
    state: Cell<LoadState>,
    target: Option<FetchTarget>,
    content: Option<ViewContent>,
    cursor: PageCursor,
}

impl<S: ContentSource, E: EventSink> ViewerSession<S, E> {
    pub fn new(fetcher: StreamFetcher<S>, sink: E, page_size: usize) -> Self {
        let cursor = PageCursor::new(page_size);
        Self {
            fetcher,
            sink,
            page_size: cursor.page_size(),
            generation: Arc::new(AtomicU64::new(0)),
            state: Cell::new(LoadState::Idle),
            target: None,
            content: None,
            cursor,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state.get()
    }

    /// The file currently shown.
    pub fn target(&self) -> Option<&FetchTarget> {
        self.target.as_ref()
    }

    pub fn content(&self) -> Option<&ViewContent> {
        self.content.as_ref()
    }

    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    pub fn fetcher(&self) -> &StreamFetcher<S> {
        &self.fetcher
    }

    /// Start a new load, superseding any load still in flight.
    pub fn begin(&self, target: FetchTarget) -> PendingLoad {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Begin load {} of {}", generation, target);
        self.set_state(LoadState::Probing);
        PendingLoad {
            target,
            ticket: LoadTicket {
                generation,
                current: self.generation.clone(),
            },
        }
    }

    /// Run the download for a pending load.
    pub async fn fetch(&self, pending: &PendingLoad) -> Result<LoadOutcome, LoadError> {
        let reporter = SessionReporter {
            ticket: &pending.ticket,
            sink: &self.sink,
            state: &self.state,
        };
        self.fetcher
            .load(&pending.target, &pending.ticket, &reporter)
            .await
    }

    /// Apply the result of a load. Returns the first page if a file was loaded.
    ///
    /// Results of superseded loads are discarded. On failure or a declined
    /// prompt the previous content and cursor stay as they were.
    pub fn commit(
        &mut self,
        pending: PendingLoad,
        result: Result<LoadOutcome, LoadError>,
    ) -> Option<PageView> {
        if !pending.ticket.is_current() {
            debug!(
                "Discarding result of superseded load {} ({})",
                pending.ticket.generation(),
                pending.target
            );
            return None;
        }

        match result {
            Ok(LoadOutcome::Loaded(content)) => {
                let length = content.length();
                info!("Loaded {} ({} chars)", pending.target, length);
                self.content = Some(content.clone());
                self.target = Some(pending.target.clone());
                self.cursor = PageCursor::new(self.page_size);
                self.set_state(LoadState::Ready);
                self.sink.emit(ViewerEvent::LoadComplete {
                    target: pending.target,
                    content,
                });
                self.emit_page()
            }
            Ok(LoadOutcome::Declined) => {
                self.set_state(self.resting_state());
                None
            }
            Ok(LoadOutcome::Superseded) => None,
            Err(e) => {
                warn!("Error loading {}: {}", pending.target, e);
                self.set_state(LoadState::Failed);
                self.sink.emit(ViewerEvent::LoadFailed {
                    kind: e.kind(),
                    message: format!("Error loading file: {}", e),
                });
                None
            }
        }
    }

    /// Begin, fetch and commit in one go.
    pub async fn load(&mut self, target: FetchTarget) -> Option<PageView> {
        let pending = self.begin(target);
        let result = self.fetch(&pending).await;
        self.commit(pending, result)
    }

    /// The page at the cursor, if a file is loaded.
    pub fn current_page(&self) -> Option<PageView> {
        self.content
            .as_ref()
            .map(|content| pager::page(content, self.cursor))
    }

    /// Move to the next page. A no-op on the last page.
    pub fn next_page(&mut self) -> Option<PageView> {
        let content = self.content.as_ref()?;
        let next = pager::advance(content, self.cursor);
        self.move_to(next)
    }

    /// Move to the previous page. A no-op on the first page.
    pub fn previous_page(&mut self) -> Option<PageView> {
        self.content.as_ref()?;
        let previous = pager::retreat(self.cursor);
        self.move_to(previous)
    }

    fn move_to(&mut self, cursor: PageCursor) -> Option<PageView> {
        if cursor == self.cursor {
            return self.current_page();
        }
        self.cursor = cursor;
        self.emit_page()
    }

    fn emit_page(&self) -> Option<PageView> {
        let page = self.current_page()?;
        self.sink.emit(ViewerEvent::PageChanged { page: page.clone() });
        Some(page)
    }

    /// State to fall back to when a load ends without new content.
    fn resting_state(&self) -> LoadState {
        if self.content.is_some() {
            LoadState::Ready
        } else {
            LoadState::Idle
        }
    }

    fn set_state(&self, state: LoadState) {
        if self.state.replace(state) != state {
            self.sink.emit(ViewerEvent::StateChanged { state });
        }
    }
}

/// Forwards fetcher progress to the sink while the load is current.
struct SessionReporter<'a, E> {
    ticket: &'a LoadTicket,
    sink: &'a E,
    state: &'a Cell<LoadState>,
}

impl<E: EventSink> ProgressReporter for SessionReporter<'_, E> {
    fn on_stage(&self, stage: LoadState) {
        if self.ticket.is_current() && self.state.replace(stage) != stage {
            self.sink.emit(ViewerEvent::StateChanged { state: stage });
        }
    }

    fn on_progress(&self, update: &ProgressUpdate) {
        if self.ticket.is_current() {
            self.sink.emit(ViewerEvent::Progress {
                update: *update,
                message: update.status_message(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::fetcher::AlwaysConfirm;
    use crate::source::{MemoryFile, MemorySource};

    fn session(
        source: MemorySource,
        page_size: usize,
    ) -> (
        ViewerSession<MemorySource, impl EventSink>,
        Rc<RefCell<Vec<ViewerEvent>>>,
    ) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink_events = events.clone();
        let fetcher = StreamFetcher::new(source, Arc::new(AlwaysConfirm));
        let sink = move |event: ViewerEvent| sink_events.borrow_mut().push(event);
        (ViewerSession::new(fetcher, sink, page_size), events)
    }

    #[test]
    fn test_ticket_supersession() {
        let source = MemorySource::new();
        let (session, _events) = session(source, 10);
        let first = session.begin(FetchTarget::new("a", "1"));
        assert!(first.ticket.is_current());
        let second = session.begin(FetchTarget::new("a", "2"));
        assert!(!first.ticket.is_current());
        assert!(second.ticket.is_current());
        assert!(second.ticket.generation() > first.ticket.generation());
    }

    #[tokio::test]
    async fn test_load_resets_cursor_and_emits_events() {
        let source = MemorySource::new()
            .with_file("market", "one.txt", MemoryFile::new("a".repeat(25)))
            .with_file("market", "two.txt", MemoryFile::new("b".repeat(5)));
        let (mut session, events) = session(source, 10);

        let page = session
            .load(FetchTarget::new("market", "one.txt"))
            .await
            .unwrap();
        assert_eq!(page.total_pages, 3);
        session.next_page();
        session.next_page();
        assert_eq!(session.cursor().current_page(), 3);

        let page = session
            .load(FetchTarget::new("market", "two.txt"))
            .await
            .unwrap();
        assert_eq!(page.page_number, 1);
        assert_eq!(page.text, "bbbbb");
        assert_eq!(session.cursor().offset(), 0);
        assert_eq!(session.state(), LoadState::Ready);

        let events = events.borrow();
        let states: Vec<LoadState> = events
            .iter()
            .filter_map(|e| match e {
                ViewerEvent::StateChanged { state } => Some(*state),
                _ => None,
            })
            .collect();
        assert_eq!(
            &states[..4],
            &[
                LoadState::Probing,
                LoadState::Streaming,
                LoadState::Decoding,
                LoadState::Ready
            ]
        );
        let loaded: Vec<&ViewContent> = events
            .iter()
            .filter_map(|e| match e {
                ViewerEvent::LoadComplete { content, .. } => Some(content),
                _ => None,
            })
            .collect();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].length(), 25);
        assert_eq!(loaded[1].text(), "bbbbb");
    }

    #[tokio::test]
    async fn test_navigation_without_content_is_none() {
        let (mut session, events) = session(MemorySource::new(), 10);
        assert!(session.next_page().is_none());
        assert!(session.previous_page().is_none());
        assert!(session.current_page().is_none());
        assert!(events.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_boundary_navigation_emits_nothing() {
        let source =
            MemorySource::new().with_file("market", "short.txt", MemoryFile::new("abc"));
        let (mut session, events) = session(source, 10);
        session.load(FetchTarget::new("market", "short.txt")).await;
        let before = events.borrow().len();

        let page = session.next_page().unwrap();
        assert!(page.is_first_page && page.is_last_page);
        session.previous_page();
        assert_eq!(events.borrow().len(), before);
    }

    #[tokio::test]
    async fn test_stale_commit_is_discarded() {
        let source = MemorySource::new()
            .with_file("market", "slow.txt", MemoryFile::new("slow"))
            .with_file("market", "fast.txt", MemoryFile::new("fast"));
        let (mut session, _events) = session(source, 10);

        let slow = session.begin(FetchTarget::new("market", "slow.txt"));
        let fast = session.begin(FetchTarget::new("market", "fast.txt"));

        let fast_result = session.fetch(&fast).await;
        assert!(session.commit(fast, fast_result).is_some());

        let slow_result = session.fetch(&slow).await;
        assert!(matches!(slow_result, Ok(LoadOutcome::Superseded)));
        assert!(session.commit(slow, slow_result).is_none());

        assert_eq!(session.content().unwrap().text(), "fast");
        assert_eq!(session.target().unwrap().filename, "fast.txt");
    }
}
