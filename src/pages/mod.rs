//! Page resolver: loads a page's blocks and merges them with the seeded
//! defaults. Single blocks fall back field by field; repeatable collections
//! fall back all-or-nothing.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::blocks::{self, BlockType};
use crate::db::models::{ContentBlock, NewContentBlock};
use crate::seed;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionSource {
    Content,
    Defaults,
}

#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    pub source: CollectionSource,
    pub items: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolvedSection {
    /// Non-repeatable blocks by `block_key`
    pub blocks: BTreeMap<String, Value>,
    /// Repeatable blocks by `block_type`
    pub collections: BTreeMap<String, Collection>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPage {
    pub page: String,
    pub sections: BTreeMap<String, ResolvedSection>,
}

/// `section -> block_key -> block`
pub type GroupedBlocks = BTreeMap<String, BTreeMap<String, ContentBlock>>;

pub fn group_blocks(blocks: Vec<ContentBlock>) -> GroupedBlocks {
    let mut grouped = GroupedBlocks::new();
    for block in blocks {
        grouped
            .entry(block.section.clone())
            .or_default()
            .insert(block.block_key.clone(), block);
    }
    grouped
}

/// Default fields, each replaced by the stored field when present and non-null.
fn merge_fields(defaults: &Value, stored: &Value) -> Value {
    let mut merged: Map<String, Value> = defaults.as_object().cloned().unwrap_or_default();
    if let Some(stored) = stored.as_object() {
        for (field, value) in stored {
            if !value.is_null() {
                merged.insert(field.clone(), value.clone());
            }
        }
    }
    Value::Object(merged)
}

fn resolve_single(default: &NewContentBlock, stored: Option<&ContentBlock>) -> Option<Value> {
    let fallback = || {
        blocks::display(default.block_type, &default.block_key, &default.content).ok()
    };
    let Some(stored) = stored else {
        return fallback();
    };
    if stored.block_type != default.block_type {
        return blocks::render(stored);
    }
    if let Err(e) = blocks::validate(stored.block_type, &stored.content) {
        tracing::warn!(block_id = stored.id, error = %e, "Using defaults for malformed block");
        return fallback();
    }
    let merged = merge_fields(&default.content, &stored.content);
    blocks::display(stored.block_type, &stored.block_key, &merged).ok()
}

fn resolve_collection(stored: &[&ContentBlock], defaults: &[&NewContentBlock]) -> Collection {
    let mut stored = stored.to_vec();
    stored.sort_by(|a, b| a.position(b));
    let items: Vec<Value> = stored.into_iter().filter_map(blocks::render).collect();
    if !items.is_empty() {
        return Collection {
            source: CollectionSource::Content,
            items,
        };
    }

    let mut defaults = defaults.to_vec();
    defaults.sort_by_key(|d| d.sort_order);
    Collection {
        source: CollectionSource::Defaults,
        items: defaults
            .into_iter()
            .filter_map(|d| blocks::display(d.block_type, &d.block_key, &d.content).ok())
            .collect(),
    }
}

fn resolve_section(
    stored: Option<&BTreeMap<String, ContentBlock>>,
    defaults: &[&NewContentBlock],
) -> ResolvedSection {
    let empty = BTreeMap::new();
    let stored = stored.unwrap_or(&empty);
    let mut section = ResolvedSection::default();

    for default in defaults.iter().filter(|d| !d.block_type.is_repeatable()) {
        if let Some(value) = resolve_single(default, stored.get(&default.block_key)) {
            section.blocks.insert(default.block_key.clone(), value);
        }
    }
    for block in stored.values().filter(|b| !b.block_type.is_repeatable()) {
        if section.blocks.contains_key(&block.block_key) {
            continue;
        }
        if let Some(value) = blocks::render(block) {
            section.blocks.insert(block.block_key.clone(), value);
        }
    }

    let repeatable: BTreeSet<BlockType> = stored
        .values()
        .map(|b| b.block_type)
        .chain(defaults.iter().map(|d| d.block_type))
        .filter(|t| t.is_repeatable())
        .collect();
    for block_type in repeatable {
        let real: Vec<&ContentBlock> = stored
            .values()
            .filter(|b| b.block_type == block_type)
            .collect();
        let fallback: Vec<&NewContentBlock> = defaults
            .iter()
            .copied()
            .filter(|d| d.block_type == block_type)
            .collect();
        section
            .collections
            .insert(block_type.to_string(), resolve_collection(&real, &fallback));
    }

    section
}

/// Merge stored blocks with defaults. `None` when the page has neither.
pub fn resolve_page(
    page: &str,
    stored: Vec<ContentBlock>,
    defaults: &[NewContentBlock],
) -> Option<ResolvedPage> {
    if stored.is_empty() && defaults.is_empty() {
        return None;
    }
    let grouped = group_blocks(stored);

    let section_names: BTreeSet<&str> = grouped
        .keys()
        .map(String::as_str)
        .chain(defaults.iter().map(|d| d.section.as_str()))
        .collect();

    let sections = section_names
        .into_iter()
        .map(|name| {
            let section_defaults: Vec<&NewContentBlock> =
                defaults.iter().filter(|d| d.section == name).collect();
            (
                name.to_string(),
                resolve_section(grouped.get(name), &section_defaults),
            )
        })
        .collect();

    Some(ResolvedPage {
        page: page.to_string(),
        sections,
    })
}

/// Load and resolve a page. A store failure is logged and the page is
/// rendered from defaults alone.
pub async fn load_page(store: &Store, page: &str) -> Option<ResolvedPage> {
    let stored = match store.content.list(page, None).await {
        Ok(blocks) => blocks,
        Err(e) => {
            tracing::warn!(page, error = %e, "Failed to load content blocks; using defaults");
            Vec::new()
        }
    };
    resolve_page(page, stored, &seed::defaults_for(page))
}
