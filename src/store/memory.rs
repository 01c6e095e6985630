//! In-memory backend: used when DATABASE_URL is absent and by tests.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use super::{ContentRepository, Entity, Repository, SettingsRepository, StoreError, StoreResult};
use crate::db::models::{ContentBlock, ContentBlockUpdate, NewContentBlock, SiteSetting};

/// A table of entities keyed by an auto-incrementing id
pub struct MemoryTable<T> {
    rows: RwLock<BTreeMap<i64, T>>,
    next_id: AtomicI64,
}

impl<T> Default for MemoryTable<T> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

fn slug_taken<T: Entity>(rows: &BTreeMap<i64, T>, candidate: &T) -> bool {
    let Some(slug) = candidate.slug() else {
        return false;
    };
    rows.values().any(|row| {
        row.id() != candidate.id() && row.slug().is_some_and(|s| s.eq_ignore_ascii_case(slug))
    })
}

#[async_trait]
impl<T: Entity> Repository<T> for MemoryTable<T> {
    async fn list(&self) -> StoreResult<Vec<T>> {
        let rows = self.rows.read().await;
        let mut items: Vec<T> = rows.values().cloned().collect();
        items.sort_by(|a, b| a.listing_order(b));
        Ok(items)
    }

    async fn get(&self, id: i64) -> StoreResult<T> {
        self.rows
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(T::KIND, id))
    }

    async fn create(&self, draft: T::Draft) -> StoreResult<T> {
        let mut rows = self.rows.write().await;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let row = T::from_draft(id, draft, Utc::now());
        if slug_taken(&rows, &row) {
            return Err(StoreError::Conflict(format!(
                "{} '{}' already exists",
                T::KIND,
                row.slug().unwrap_or_default()
            )));
        }
        rows.insert(id, row.clone());
        Ok(row)
    }

    async fn update(&self, id: i64, patch: T::Patch) -> StoreResult<T> {
        let mut rows = self.rows.write().await;
        let mut row = rows
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(T::KIND, id))?;
        row.apply_patch(patch, Utc::now());
        if slug_taken(&rows, &row) {
            return Err(StoreError::Conflict(format!(
                "{} '{}' already exists",
                T::KIND,
                row.slug().unwrap_or_default()
            )));
        }
        rows.insert(id, row.clone());
        Ok(row)
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(T::KIND, id))
    }
}

// ============================================================================
// Content blocks
// ============================================================================

#[derive(Default)]
pub struct MemoryContent {
    table: MemoryTable<ContentBlock>,
}

fn sort_blocks(blocks: &mut [ContentBlock]) {
    blocks.sort_by(|a, b| a.section.cmp(&b.section).then(a.position(b)));
}

#[async_trait]
impl ContentRepository for MemoryContent {
    async fn list(&self, page: &str, section: Option<&str>) -> StoreResult<Vec<ContentBlock>> {
        let rows = self.table.rows.read().await;
        let mut blocks: Vec<ContentBlock> = rows
            .values()
            .filter(|b| b.page == page && section.map_or(true, |s| b.section == s))
            .cloned()
            .collect();
        sort_blocks(&mut blocks);
        Ok(blocks)
    }

    async fn get(&self, id: i64) -> StoreResult<ContentBlock> {
        self.table
            .rows
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("content block", id))
    }

    async fn update(&self, id: i64, update: ContentBlockUpdate) -> StoreResult<ContentBlock> {
        let mut rows = self.table.rows.write().await;
        let block = rows
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("content block", id))?;
        if let Some(content) = update.content {
            block.content = content;
        }
        if let Some(sort_order) = update.sort_order {
            block.sort_order = sort_order;
        }
        if let Some(block_type) = update.block_type {
            block.block_type = block_type;
        }
        block.updated_at = Utc::now();
        Ok(block.clone())
    }

    async fn upsert(&self, new: NewContentBlock) -> StoreResult<ContentBlock> {
        let mut rows = self.table.rows.write().await;
        let now = Utc::now();
        let existing = rows.values_mut().find(|b| {
            b.page == new.page && b.section == new.section && b.block_key == new.block_key
        });
        if let Some(block) = existing {
            block.block_type = new.block_type;
            block.content = new.content;
            block.sort_order = new.sort_order;
            block.updated_at = now;
            return Ok(block.clone());
        }
        let id = self.table.next_id.fetch_add(1, Ordering::SeqCst);
        let block = ContentBlock {
            id,
            page: new.page,
            section: new.section,
            block_type: new.block_type,
            block_key: new.block_key,
            content: new.content,
            sort_order: new.sort_order,
            created_at: now,
            updated_at: now,
        };
        rows.insert(id, block.clone());
        Ok(block)
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.table.rows.read().await.len())
    }
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, SiteSetting>>,
}

#[async_trait]
impl SettingsRepository for MemorySettings {
    async fn all(&self) -> StoreResult<Vec<SiteSetting>> {
        let values = self.values.read().await;
        let mut settings: Vec<SiteSetting> = values.values().cloned().collect();
        settings.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(settings)
    }

    async fn get(&self, key: &str) -> StoreResult<SiteSetting> {
        self.values
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::not_found("setting", key))
    }

    async fn put(&self, key: &str, value: Value) -> StoreResult<SiteSetting> {
        let setting = SiteSetting {
            key: key.to_string(),
            value,
            updated_at: Utc::now(),
        };
        self.values
            .write()
            .await
            .insert(key.to_string(), setting.clone());
        Ok(setting)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.values
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("setting", key))
    }
}
