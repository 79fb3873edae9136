// src/catalog.rs
//! Read side: page/per_page/query → store query → response envelope.

use std::sync::Arc;

use serde::Serialize;

use crate::store::{PageQuery, StoreError, TitleFilter, Video, VideoStore};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PER_PAGE: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{name} must be >= 1, got {value}")]
    InvalidParam { name: &'static str, value: i64 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Validated list parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub page: u64,
    pub per_page: u64,
    pub filter: Option<TitleFilter>,
}

impl ListRequest {
    pub fn new(page: i64, per_page: i64, query: &str) -> Result<Self, CatalogError> {
        let page = positive("page", page)?;
        let per_page = positive("per_page", per_page)?;
        Ok(Self {
            page,
            per_page,
            filter: TitleFilter::new(query),
        })
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

fn positive(name: &'static str, value: i64) -> Result<u64, CatalogError> {
    u64::try_from(value)
        .ok()
        .filter(|v| *v >= 1)
        .ok_or(CatalogError::InvalidParam { name, value })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogPage {
    pub videos: Vec<Video>,
    pub total: u64,
    pub pages: u64,
    pub current_page: u64,
}

/// `ceil(total / per_page)`; 0 when the catalog (or the filtered view) is empty.
pub fn page_count(total: u64, per_page: u64) -> u64 {
    total / per_page + u64::from(total % per_page > 0)
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn VideoStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn VideoStore>) -> Self {
        Self { store }
    }

    /// Pages past the end come back with no videos but real `total`/`pages`.
    pub async fn list(&self, req: &ListRequest) -> Result<CatalogPage, CatalogError> {
        let total = self.store.count(req.filter.as_ref()).await?;
        let videos = self
            .store
            .find_page(&PageQuery {
                skip: req.skip(),
                limit: req.per_page,
                filter: req.filter.clone(),
            })
            .await?;

        Ok(CatalogPage {
            videos,
            total,
            pages: page_count(total, req.per_page),
            current_page: req.page,
        })
    }
}
