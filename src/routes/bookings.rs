/**
 * Booking Routes
 * Consultation bookings from the public site
 */
use chrono::Utc;
use std::sync::Arc;

use super::resource::{require_email, require_text, trim, trim_opt, Resource};
use crate::db::models::{Booking, BookingDraft, BookingPatch};
use crate::error::{ApiError, ApiResult};
use crate::notify::Notification;
use crate::state::AppState;
use crate::store::{Repository, Store};

impl Resource for Booking {
    const PUBLIC_CREATE: bool = true;

    fn repo(store: &Store) -> &Arc<dyn Repository<Self>> {
        &store.bookings
    }

    fn validate_draft(draft: &mut BookingDraft) -> ApiResult<()> {
        trim(&mut draft.name);
        trim(&mut draft.email);
        trim(&mut draft.service_type);
        trim_opt(&mut draft.phone);
        trim_opt(&mut draft.company);
        trim_opt(&mut draft.preferred_time);
        trim_opt(&mut draft.message);
        require_text("name", &draft.name)?;
        require_email(&draft.email)?;
        require_text("service_type", &draft.service_type)?;
        if draft.preferred_date < Utc::now().date_naive() {
            return Err(ApiError::validation("preferred_date cannot be in the past"));
        }
        Ok(())
    }

    fn validate_patch(&self, patch: &mut BookingPatch) -> ApiResult<()> {
        if let Some(service_type) = &patch.service_type {
            require_text("service_type", service_type)?;
        }
        if let Some(next) = patch.status {
            if !self.status.can_transition_to(next) {
                return Err(ApiError::validation(format!(
                    "Booking cannot move from '{}' to '{}'",
                    self.status, next
                )));
            }
        }
        Ok(())
    }

    fn on_created(&self, state: &AppState) {
        state.notifier.send(Notification::BookingCreated(self.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::BookingStatus;
    use chrono::Duration;

    fn draft(days_ahead: i64) -> BookingDraft {
        BookingDraft {
            name: "Ben".to_string(),
            email: "ben@example.com".to_string(),
            phone: None,
            company: None,
            service_type: " HR audit ".to_string(),
            preferred_date: (Utc::now() + Duration::days(days_ahead)).date_naive(),
            preferred_time: Some("10:00".to_string()),
            message: None,
        }
    }

    #[test]
    fn test_draft_trims_service_type() {
        let mut d = draft(3);
        Booking::validate_draft(&mut d).unwrap();
        assert_eq!(d.service_type, "HR audit");
    }

    #[test]
    fn test_draft_rejects_past_date() {
        assert!(Booking::validate_draft(&mut draft(-2)).is_err());
    }

    #[test]
    fn test_completed_booking_cannot_be_cancelled() {
        let mut d = draft(1);
        Booking::validate_draft(&mut d).unwrap();
        let mut booking = <Booking as crate::store::Entity>::from_draft(1, d, Utc::now());
        booking.status = BookingStatus::Completed;
        let mut patch = BookingPatch {
            status: Some(BookingStatus::Cancelled),
            ..Default::default()
        };
        assert!(booking.validate_patch(&mut patch).is_err());
    }
}
