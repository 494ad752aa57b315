//! Fixed-size paging over decoded text.
//!
//! Offsets and page sizes count chars. Pages are computed on demand from the
//! loaded [`ViewContent`]; nothing is re-fetched when paging.

use serde::Serialize;

use crate::models::ViewContent;

/// Chars per page.
pub const DEFAULT_PAGE_SIZE: usize = 100_000;

/// Position within loaded content.
///
/// `offset` is always a multiple of `page_size` and lies inside the content
/// (or is zero for empty content).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    offset: usize,
    page_size: usize,
}

impl PageCursor {
    /// Cursor at the start of the content.
    pub fn new(page_size: usize) -> Self {
        Self {
            offset: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// 1-based page number.
    pub fn current_page(&self) -> usize {
        self.offset / self.page_size + 1
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// What the viewer shows for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageView {
    pub text: String,
    pub page_number: usize,
    pub total_pages: usize,
    /// Previous control disabled.
    pub is_first_page: bool,
    /// Next control disabled.
    pub is_last_page: bool,
}

impl PageView {
    /// Pagination controls are only shown for multi-page content.
    pub fn show_controls(&self) -> bool {
        self.total_pages > 1
    }

    pub fn label(&self) -> String {
        format!("Page {} of {}", self.page_number, self.total_pages)
    }
}

/// Number of pages for `length` chars. Empty content still has one page.
pub fn total_pages(length: usize, page_size: usize) -> usize {
    length.div_ceil(page_size.max(1)).max(1)
}

/// Render the page at `cursor`. The last page may be short.
pub fn page(content: &ViewContent, cursor: PageCursor) -> PageView {
    let total = total_pages(content.length(), cursor.page_size);
    let page_number = cursor.current_page();

    PageView {
        text: window(content, cursor.offset, cursor.page_size).to_string(),
        page_number,
        total_pages: total,
        is_first_page: page_number == 1,
        is_last_page: page_number == total,
    }
}

/// Next page, or the same cursor if there is none.
pub fn advance(content: &ViewContent, cursor: PageCursor) -> PageCursor {
    let next = cursor.offset + cursor.page_size;
    if next >= content.length() {
        return cursor;
    }
    PageCursor {
        offset: next,
        ..cursor
    }
}

/// Previous page, or the same cursor on the first page.
pub fn retreat(cursor: PageCursor) -> PageCursor {
    if cursor.offset == 0 {
        return cursor;
    }
    PageCursor {
        offset: cursor.offset.saturating_sub(cursor.page_size),
        ..cursor
    }
}

/// Chars `[start, start + len)` of the content, clipped to its end.
fn window(content: &ViewContent, start: usize, len: usize) -> &str {
    let text = content.text();
    if content.is_single_byte() {
        let begin = start.min(text.len());
        let end = start.saturating_add(len).min(text.len());
        return &text[begin..end];
    }

    let mut boundaries = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()));
    let begin = boundaries.nth(start).unwrap_or(text.len());
    let end = boundaries.nth(len - 1).unwrap_or(text.len());
    &text[begin..end]
}
