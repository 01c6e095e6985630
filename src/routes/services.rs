/**
 * Service Routes
 */
use std::sync::Arc;

use super::resource::{require_slug, require_text, trim, trim_opt, Resource};
use crate::db::models::{Service, ServiceDraft, ServicePatch};
use crate::error::ApiResult;
use crate::store::{Repository, Store};

impl Resource for Service {
    const PUBLIC_READ: bool = true;

    fn repo(store: &Store) -> &Arc<dyn Repository<Self>> {
        &store.services
    }

    fn validate_draft(draft: &mut ServiceDraft) -> ApiResult<()> {
        trim(&mut draft.title);
        trim(&mut draft.slug);
        trim_opt(&mut draft.icon);
        draft.features.retain(|f| !f.trim().is_empty());
        require_text("title", &draft.title)?;
        require_slug(&draft.slug)
    }

    fn validate_patch(&self, patch: &mut ServicePatch) -> ApiResult<()> {
        if let Some(title) = &patch.title {
            require_text("title", title)?;
        }
        if let Some(slug) = &patch.slug {
            require_slug(slug)?;
        }
        if let Some(features) = patch.features.as_mut() {
            features.retain(|f| !f.trim().is_empty());
        }
        Ok(())
    }

    fn is_public(&self) -> bool {
        self.published
    }
}
