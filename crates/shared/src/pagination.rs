//! Page-based pagination utilities.

use serde::{Deserialize, Serialize};

/// Page request as read from `?page=&per_page=`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    /// Resolves the request against an endpoint's default and ceiling.
    ///
    /// Page numbers start at 1; `per_page` is clamped to `1..=max`.
    pub fn resolve(&self, default_per_page: u32, max_per_page: u32) -> Page {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(default_per_page)
            .clamp(1, max_per_page.max(1));
        Page { page, per_page }
    }
}

/// A resolved page: always valid, ready for LIMIT/OFFSET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }
}

/// One page of results plus the totals clients need to render pagers.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub current_page: u32,
    pub per_page: u32,
    pub total: i64,
    pub last_page: u32,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, page: Page, total: i64) -> Self {
        let per_page = page.per_page.max(1) as i64;
        let last_page = ((total.max(0) + per_page - 1) / per_page).max(1) as u32;
        Self {
            data,
            current_page: page.page,
            per_page: page.per_page,
            total,
            last_page,
        }
    }

    /// Converts the items while keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            current_page: self.current_page,
            per_page: self.per_page,
            total: self.total,
            last_page: self.last_page,
        }
    }
}
