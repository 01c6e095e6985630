/**
 * Insight Routes
 * The firm's blog: articles with sanitized HTML bodies
 */
use std::sync::Arc;

use super::resource::{require_slug, require_text, sanitize_html, trim, trim_opt, Resource};
use crate::db::models::{Insight, InsightDraft, InsightPatch};
use crate::error::ApiResult;
use crate::store::{Repository, Store};

fn clean_tags(tags: &mut Vec<String>) {
    for tag in tags.iter_mut() {
        *tag = tag.trim().to_lowercase();
    }
    tags.retain(|t| !t.is_empty());
    tags.sort();
    tags.dedup();
}

impl Resource for Insight {
    const PUBLIC_READ: bool = true;

    fn repo(store: &Store) -> &Arc<dyn Repository<Self>> {
        &store.insights
    }

    fn validate_draft(draft: &mut InsightDraft) -> ApiResult<()> {
        trim(&mut draft.title);
        trim(&mut draft.slug);
        trim_opt(&mut draft.summary);
        trim_opt(&mut draft.author);
        trim_opt(&mut draft.cover_image);
        require_text("title", &draft.title)?;
        require_slug(&draft.slug)?;
        draft.content_html = draft.content_html.as_deref().map(sanitize_html);
        clean_tags(&mut draft.tags);
        Ok(())
    }

    fn validate_patch(&self, patch: &mut InsightPatch) -> ApiResult<()> {
        if let Some(title) = &patch.title {
            require_text("title", title)?;
        }
        if let Some(slug) = &patch.slug {
            require_slug(slug)?;
        }
        if let Some(Some(html)) = patch.content_html.as_mut() {
            *html = sanitize_html(html);
        }
        if let Some(tags) = patch.tags.as_mut() {
            clean_tags(tags);
        }
        Ok(())
    }

    fn is_public(&self) -> bool {
        self.published
    }
}
