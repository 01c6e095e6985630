/**
 * Lead Routes
 * Contact form submissions and the admin lead pipeline
 */
use std::sync::Arc;

use super::resource::{require_email, require_text, trim, trim_opt, Resource};
use crate::db::models::{Lead, LeadDraft, LeadPatch};
use crate::error::{ApiError, ApiResult};
use crate::notify::Notification;
use crate::state::AppState;
use crate::store::{Repository, Store};

const DEFAULT_SOURCE: &str = "contact_form";

impl Resource for Lead {
    const PUBLIC_CREATE: bool = true;

    fn repo(store: &Store) -> &Arc<dyn Repository<Self>> {
        &store.leads
    }

    fn validate_draft(draft: &mut LeadDraft) -> ApiResult<()> {
        trim(&mut draft.name);
        trim(&mut draft.email);
        trim_opt(&mut draft.phone);
        trim_opt(&mut draft.company);
        trim_opt(&mut draft.service_interest);
        trim_opt(&mut draft.message);
        trim_opt(&mut draft.source);
        require_text("name", &draft.name)?;
        require_email(&draft.email)?;
        draft.source.get_or_insert_with(|| DEFAULT_SOURCE.to_string());
        Ok(())
    }

    fn validate_patch(&self, patch: &mut LeadPatch) -> ApiResult<()> {
        if let Some(name) = &patch.name {
            require_text("name", name)?;
        }
        if let Some(email) = &patch.email {
            require_email(email)?;
        }
        if let Some(next) = patch.status {
            if !self.status.can_transition_to(next) {
                return Err(ApiError::validation(format!(
                    "Lead cannot move from '{}' to '{}'",
                    self.status, next
                )));
            }
        }
        Ok(())
    }

    fn on_created(&self, state: &AppState) {
        state.notifier.send(Notification::LeadCreated(self.clone()));
    }
}
