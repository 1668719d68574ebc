use serde::{Deserialize, Serialize};

use crate::core::{AppError, Result};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Requested page, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            size: default_size(),
        }
    }
}

impl PageParams {
    /// Validated constructor
    pub fn new(page: u32, size: u32) -> Result<Self> {
        let params = Self { page, size };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page < 1 {
            return Err(AppError::validation("page must be greater than or equal to 1"));
        }
        if self.size < 1 || self.size > MAX_PAGE_SIZE {
            return Err(AppError::validation(format!(
                "size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(())
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.size)
    }
}

/// One slice of results plus total-count metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub size: u32,
    pub pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, params: PageParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            size: params.size,
            pages: page_count(total, params.size),
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
            pages: self.pages,
        }
    }
}

/// `ceil(total / size)`, zero for an empty result
pub fn page_count(total: i64, size: u32) -> u32 {
    if total <= 0 || size == 0 {
        return 0;
    }
    let size = i64::from(size);
    u32::try_from((total + size - 1) / size).unwrap_or(u32::MAX)
}
