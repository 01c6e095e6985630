//! Storage layer: repository traits with a Postgres backend and an
//! in-memory backend used when no database is configured.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::db::models::{
    AdminUser, Booking, CaseStudy, ContentBlock, ContentBlockUpdate, Insight, Lead, MediaAsset,
    NewContentBlock, Service, SiteSetting, Testimonial,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// Listing filter
// ============================================================================

/// Query parameters shared by every collection listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListFilter {
    pub status: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    /// Include unpublished rows (admin only)
    #[serde(default)]
    pub all: bool,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl ListFilter {
    pub const MAX_PAGE_SIZE: usize = 100;

    /// Requested status, ignoring blanks and `all`
    pub fn status_filter(&self) -> Option<&str> {
        self.status.as_deref().filter(|s| !s.is_empty() && *s != "all")
    }

    /// Requested category, ignoring blanks and `all`
    pub fn category_filter(&self) -> Option<&str> {
        self.category.as_deref().filter(|s| !s.is_empty() && *s != "all")
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Decide whether a row with the given facets is visible under this filter.
    pub fn admits(
        &self,
        status: Option<&str>,
        category: Option<&str>,
        published: Option<bool>,
        text: &[&str],
    ) -> bool {
        if published == Some(false) && !self.all {
            return false;
        }
        if let Some(wanted) = self.status_filter() {
            if status != Some(wanted) {
                return false;
            }
        }
        if let Some(wanted) = self.category_filter() {
            if !category.is_some_and(|c| c.eq_ignore_ascii_case(wanted)) {
                return false;
            }
        }
        if let Some(needle) = self.search_term() {
            let needle = needle.to_lowercase();
            if !text.iter().any(|hay| hay.to_lowercase().contains(&needle)) {
                return false;
            }
        }
        true
    }

    /// Slice an already filtered listing. Returns the page and the total.
    pub fn paginate<T>(&self, rows: Vec<T>) -> (Vec<T>, usize) {
        let total = rows.len();
        match self.page {
            None => (rows, total),
            Some(page) => {
                let size = self.page_size.unwrap_or(10).clamp(1, Self::MAX_PAGE_SIZE);
                let offset = page.saturating_sub(1).saturating_mul(size);
                let items = rows.into_iter().skip(offset).take(size).collect();
                (items, total)
            }
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A flat record managed through the generic repository
pub trait Entity: Clone + Send + Sync + Unpin + 'static {
    type Draft: Send + Sync + 'static;
    type Patch: Send + Sync + 'static;

    /// Human readable name used in errors and logs
    const KIND: &'static str;

    fn id(&self) -> i64;

    fn from_draft(id: i64, draft: Self::Draft, now: DateTime<Utc>) -> Self;

    fn apply_patch(&mut self, patch: Self::Patch, now: DateTime<Utc>);

    /// Natural unique key, if the table has one
    fn slug(&self) -> Option<&str> {
        None
    }

    fn matches(&self, filter: &ListFilter) -> bool;

    /// Listing order. Newest first unless overridden.
    fn listing_order(&self, other: &Self) -> Ordering {
        other.id().cmp(&self.id())
    }
}

#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// All rows in listing order
    async fn list(&self) -> StoreResult<Vec<T>>;

    async fn get(&self, id: i64) -> StoreResult<T>;

    async fn create(&self, draft: T::Draft) -> StoreResult<T>;

    async fn update(&self, id: i64, patch: T::Patch) -> StoreResult<T>;

    async fn delete(&self, id: i64) -> StoreResult<()>;

    async fn find_by_slug(&self, slug: &str) -> StoreResult<T> {
        self.list()
            .await?
            .into_iter()
            .find(|row| row.slug().is_some_and(|s| s.eq_ignore_ascii_case(slug)))
            .ok_or_else(|| StoreError::not_found(T::KIND, slug))
    }

    async fn filtered(&self, filter: &ListFilter) -> StoreResult<Vec<T>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|row| row.matches(filter))
            .collect())
    }
}

#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Blocks for a page (optionally one section) ordered by section, then position
    async fn list(&self, page: &str, section: Option<&str>) -> StoreResult<Vec<ContentBlock>>;

    async fn get(&self, id: i64) -> StoreResult<ContentBlock>;

    async fn update(&self, id: i64, update: ContentBlockUpdate) -> StoreResult<ContentBlock>;

    /// Insert or replace the block addressed by `(page, section, block_key)`
    async fn upsert(&self, block: NewContentBlock) -> StoreResult<ContentBlock>;

    async fn count(&self) -> StoreResult<usize>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn all(&self) -> StoreResult<Vec<SiteSetting>>;

    async fn get(&self, key: &str) -> StoreResult<SiteSetting>;

    async fn put(&self, key: &str, value: Value) -> StoreResult<SiteSetting>;

    async fn delete(&self, key: &str) -> StoreResult<()>;
}

// ============================================================================
// Store bundle
// ============================================================================

/// Every repository the application uses, behind one cloneable handle
#[derive(Clone)]
pub struct Store {
    pub content: Arc<dyn ContentRepository>,
    pub settings: Arc<dyn SettingsRepository>,
    pub leads: Arc<dyn Repository<Lead>>,
    pub bookings: Arc<dyn Repository<Booking>>,
    pub case_studies: Arc<dyn Repository<CaseStudy>>,
    pub services: Arc<dyn Repository<Service>>,
    pub testimonials: Arc<dyn Repository<Testimonial>>,
    pub insights: Arc<dyn Repository<Insight>>,
    pub media: Arc<dyn Repository<MediaAsset>>,
    pub users: Arc<dyn Repository<AdminUser>>,
    pool: Option<PgPool>,
}

impl Store {
    pub fn postgres(pool: PgPool) -> Self {
        use postgres::{PgContent, PgSettings, PgTable};
        Self {
            content: Arc::new(PgContent::new(pool.clone())),
            settings: Arc::new(PgSettings::new(pool.clone())),
            leads: Arc::new(PgTable::<Lead>::new(pool.clone())),
            bookings: Arc::new(PgTable::<Booking>::new(pool.clone())),
            case_studies: Arc::new(PgTable::<CaseStudy>::new(pool.clone())),
            services: Arc::new(PgTable::<Service>::new(pool.clone())),
            testimonials: Arc::new(PgTable::<Testimonial>::new(pool.clone())),
            insights: Arc::new(PgTable::<Insight>::new(pool.clone())),
            media: Arc::new(PgTable::<MediaAsset>::new(pool.clone())),
            users: Arc::new(PgTable::<AdminUser>::new(pool.clone())),
            pool: Some(pool),
        }
    }

    pub fn memory() -> Self {
        use memory::{MemoryContent, MemorySettings, MemoryTable};
        Self {
            content: Arc::new(MemoryContent::default()),
            settings: Arc::new(MemorySettings::default()),
            leads: Arc::new(MemoryTable::<Lead>::default()),
            bookings: Arc::new(MemoryTable::<Booking>::default()),
            case_studies: Arc::new(MemoryTable::<CaseStudy>::default()),
            services: Arc::new(MemoryTable::<Service>::default()),
            testimonials: Arc::new(MemoryTable::<Testimonial>::default()),
            insights: Arc::new(MemoryTable::<Insight>::default()),
            media: Arc::new(MemoryTable::<MediaAsset>::default()),
            users: Arc::new(MemoryTable::<AdminUser>::default()),
            pool: None,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        if self.pool.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }

    /// Round-trip latency to the backing database
    pub async fn ping(&self) -> StoreResult<Duration> {
        let start = Instant::now();
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(start.elapsed())
    }

    /// Create tables if missing. A no-op for the in-memory backend.
    pub async fn migrate(&self) -> StoreResult<()> {
        if let Some(pool) = &self.pool {
            crate::db::run_migrations(pool).await?;
        }
        Ok(())
    }
}
