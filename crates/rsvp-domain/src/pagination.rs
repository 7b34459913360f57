//! Pagination types for admin list endpoints.

use serde::{Deserialize, Serialize};

/// Largest page size a caller may request.
pub const MAX_PER_PAGE: u32 = 100;

/// Page selection shared across list endpoints.
///
/// - `per_page`: 1–100, default 25 (wire name `per-page`)
/// - `page`: ≥ 1, default 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_per_page", rename = "per-page")]
    pub per_page: u32,
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_per_page() -> u32 {
    25
}

fn default_page() -> u32 {
    1
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            page: default_page(),
        }
    }
}

impl PageRequest {
    /// Clamp `per_page` to 1–100 and `page` to ≥ 1.
    pub fn clamped(self) -> Self {
        Self {
            per_page: self.per_page.clamp(1, MAX_PER_PAGE),
            page: self.page.max(1),
        }
    }

    /// Rows to skip for this page. Assumes a clamped request.
    pub fn offset(self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    pub fn limit(self) -> u64 {
        u64::from(self.per_page)
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}
