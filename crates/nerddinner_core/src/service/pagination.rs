//! Page slicing for list views.

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 50;

/// One page of items plus the counts needed to render pager links.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedList<T> {
    pub items: Vec<T>,
    /// Zero-based page index.
    pub page_index: u32,
    pub page_size: u32,
    pub total_count: usize,
}

impl<T> PaginatedList<T> {
    /// Slices `source` into the requested page.
    ///
    /// Pages past the end are empty but keep the real `total_count`.
    pub fn new(source: Vec<T>, page_index: u32, page_size: Option<u32>) -> Self {
        let page_size = normalize_page_size(page_size);
        let total_count = source.len();
        let start = (page_index as usize).saturating_mul(page_size as usize);
        let items = source
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .collect();
        Self {
            items,
            page_index,
            page_size,
            total_count,
        }
    }

    pub fn total_pages(&self) -> u32 {
        let pages = self.total_count.div_ceil(self.page_size as usize);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_previous_page(&self) -> bool {
        self.page_index > 0
    }

    pub fn has_next_page(&self) -> bool {
        self.page_index.saturating_add(1) < self.total_pages()
    }
}

/// Normalizes page size: `None`/`0` fall back to 10, values clamp to 50.
pub fn normalize_page_size(page_size: Option<u32>) -> u32 {
    match page_size {
        Some(0) | None => DEFAULT_PAGE_SIZE,
        Some(value) if value > MAX_PAGE_SIZE => MAX_PAGE_SIZE,
        Some(value) => value,
    }
}
