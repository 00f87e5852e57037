//! Offset pagination over ordered listings.
//!
//! Page numbers come straight from the `page` query parameter. Resolution
//! follows the classic paginator policy: anything that is not an integer
//! falls back to the first page, while numbers below one or past the end land
//! on the last page. An empty listing still has one (empty) page.

use std::num::IntErrorKind;

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Slice of an ordered query, expressed as LIMIT/OFFSET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u64,
}

impl PageRequest {
    pub fn new(limit: u32, offset: u64) -> Self {
        Self { limit, offset }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: u32,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Paginator {
    /// A zero page size is bumped to one.
    pub fn new(per_page: u32) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn num_pages(&self, total: u64) -> u32 {
        if total == 0 {
            return 1;
        }
        let pages = total.div_ceil(u64::from(self.per_page));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Resolve the raw `page` parameter against a listing of `total` items.
    pub fn resolve(&self, requested: Option<&str>, total: u64) -> PageWindow {
        let num_pages = self.num_pages(total);
        let number = match requested.map(str::trim).map(str::parse::<i64>) {
            None => 1,
            // Integers too wide for i64 are still out of range.
            Some(Err(err))
                if matches!(
                    err.kind(),
                    IntErrorKind::PosOverflow | IntErrorKind::NegOverflow
                ) =>
            {
                num_pages
            }
            Some(Err(_)) => 1,
            Some(Ok(value)) if value < 1 || value > i64::from(num_pages) => num_pages,
            Some(Ok(value)) => value as u32,
        };

        PageWindow {
            number,
            num_pages,
            per_page: self.per_page,
            total,
        }
    }
}

/// Where a resolved page sits inside its listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub number: u32,
    pub num_pages: u32,
    pub per_page: u32,
    pub total: u64,
}

impl PageWindow {
    pub fn request(&self) -> PageRequest {
        let offset = u64::from(self.number - 1) * u64::from(self.per_page);
        PageRequest::new(self.per_page, offset)
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_page_number(&self) -> Option<u32> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn previous_page_number(&self) -> Option<u32> {
        self.has_previous().then(|| self.number - 1)
    }
}

/// A page of items together with its window.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub window: PageWindow,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self { items, window }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            window: self.window,
        }
    }
}
