//! Paged sequences and pagination link arithmetic.
//!
//! A [`Paginator`] is the capability a listener hands back when it can serve a
//! sequence one page at a time and knows the total number of items. Plain
//! arrays are wrapped in an [`ArrayPaginator`].
//!
//! ```
//! use armature_hal::{ArrayPaginator, PageRequest, Paginator};
//! use serde_json::json;
//!
//! let items: Vec<_> = (1..=45).map(|i| json!({"id": i})).collect();
//! let paginator = ArrayPaginator::new(items);
//! let request = PageRequest::new(2, 30);
//!
//! assert_eq!(paginator.total_item_count(), 45);
//! assert_eq!(paginator.items(request.offset(), request.limit()).len(), 15);
//! assert_eq!(request.page_count(45), 2);
//! ```

use serde_json::Value;

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: u64 = 30;

/// A sequence that can be read one page at a time.
pub trait Paginator: Send + Sync {
    /// Total number of items across all pages.
    fn total_item_count(&self) -> u64;

    /// Items in `[offset, offset + limit)`.
    fn items(&self, offset: u64, limit: u64) -> Vec<Value>;
}

/// In-memory paginator over an already loaded sequence.
#[derive(Debug, Clone, Default)]
pub struct ArrayPaginator {
    items: Vec<Value>,
}

impl ArrayPaginator {
    pub fn new(items: Vec<Value>) -> Self {
        Self { items }
    }
}

impl Paginator for ArrayPaginator {
    fn total_item_count(&self) -> u64 {
        self.items.len() as u64
    }

    fn items(&self, offset: u64, limit: u64) -> Vec<Value> {
        self.items
            .iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

/// Requested page number (1-indexed) and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    /// Both values are clamped to at least 1.
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    /// Saturates for page numbers beyond the addressable range.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }

    /// Number of pages needed for `total` items; never less than 1.
    pub fn page_count(&self, total: u64) -> u64 {
        total.div_ceil(self.page_size).max(1)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// Page numbers for the `first`, `prev`, `next` and `last` relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationPages {
    pub first: u64,
    pub prev: Option<u64>,
    pub next: Option<u64>,
    pub last: u64,
}

impl PaginationPages {
    /// Compute pagination pages for a known total.
    ///
    /// Returns `None` when everything fits on one page or when `page` lies
    /// outside `[1, last]`; no pagination links are emitted in either case.
    pub fn compute(page: u64, page_size: u64, total: u64) -> Option<Self> {
        let request = PageRequest::new(page, page_size);
        let last = request.page_count(total);
        if last <= 1 || page < 1 || page > last {
            return None;
        }

        Some(Self {
            first: 1,
            prev: (page > 1).then(|| (page - 1).clamp(1, last)),
            next: (page < last).then(|| (page + 1).clamp(1, last)),
            last,
        })
    }
}
