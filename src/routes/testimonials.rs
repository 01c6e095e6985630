/**
 * Testimonial Routes
 */
use std::sync::Arc;

use super::resource::{require_text, trim, trim_opt, Resource};
use crate::db::models::{Testimonial, TestimonialDraft, TestimonialPatch};
use crate::error::{ApiError, ApiResult};
use crate::store::{Repository, Store};

fn check_rating(rating: i32) -> ApiResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(ApiError::validation("rating must be between 1 and 5"));
    }
    Ok(())
}

impl Resource for Testimonial {
    const PUBLIC_READ: bool = true;

    fn repo(store: &Store) -> &Arc<dyn Repository<Self>> {
        &store.testimonials
    }

    fn validate_draft(draft: &mut TestimonialDraft) -> ApiResult<()> {
        trim(&mut draft.client_name);
        trim(&mut draft.quote);
        trim_opt(&mut draft.client_title);
        trim_opt(&mut draft.company);
        trim_opt(&mut draft.image_url);
        require_text("client_name", &draft.client_name)?;
        require_text("quote", &draft.quote)?;
        check_rating(draft.rating)
    }

    fn validate_patch(&self, patch: &mut TestimonialPatch) -> ApiResult<()> {
        if let Some(quote) = &patch.quote {
            require_text("quote", quote)?;
        }
        if let Some(rating) = patch.rating {
            check_rating(rating)?;
        }
        Ok(())
    }

    fn is_public(&self) -> bool {
        self.published
    }
}
