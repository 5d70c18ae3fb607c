//! Page arithmetic for the table grid

/// Rows per page unless configured otherwise
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Number of pages needed for `row_count` rows
///
/// A zero page size is treated as one row per page.
pub fn total_pages(row_count: u64, page_size: u64) -> u64 {
    row_count.div_ceil(page_size.max(1))
}

/// Clamp a requested page into `1..=total_pages` (page 1 when there are no pages)
pub fn clamp_page(page: u64, total_pages: u64) -> u64 {
    page.clamp(1, total_pages.max(1))
}

/// Row offset of the first row on `page`
pub fn page_offset(page: u64, page_size: u64) -> u64 {
    page.saturating_sub(1) * page_size
}

/// Pagination state of the browser
///
/// Holds `1 <= current_page <= total_pages` whenever `total_pages > 0`.
/// With no pages the current page stays at 1 and nothing is navigable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    current_page: u64,
    total_pages: u64,
}

impl Default for PageState {
    fn default() -> Self {
        Self::new()
    }
}

impl PageState {
    pub fn new() -> Self {
        Self {
            current_page: 1,
            total_pages: 0,
        }
    }

    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    /// Back to page 1, used whenever the table changes
    pub fn reset(&mut self) {
        self.current_page = 1;
        self.total_pages = 0;
    }

    /// Record the outcome of a page load
    pub fn apply(&mut self, loaded_page: u64, total_pages: u64) {
        self.total_pages = total_pages;
        self.current_page = clamp_page(loaded_page, total_pages);
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// Step back one page; `false` when already on the first page
    pub fn previous(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        self.current_page -= 1;
        true
    }

    /// Step forward one page; `false` when already on the last page
    pub fn next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.current_page += 1;
        true
    }

    pub fn label(&self) -> String {
        format!("Page {} of {}", self.current_page, self.total_pages)
    }
}
