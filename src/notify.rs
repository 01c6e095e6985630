//! Fire-and-forget webhook notifications for new leads and bookings.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::time::Duration;

use crate::db::models::{Booking, Lead};

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_default()
});

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Notification {
    LeadCreated(Lead),
    BookingCreated(Booking),
}

impl Notification {
    fn name(&self) -> &'static str {
        match self {
            Notification::LeadCreated(_) => "lead_created",
            Notification::BookingCreated(_) => "booking_created",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Notifier {
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self { webhook_url }
    }

    /// Post the notification on a background task. The caller never waits
    /// and a failure is only logged.
    pub fn send(&self, notification: Notification) {
        let Some(url) = self.webhook_url.clone() else {
            tracing::debug!(event = notification.name(), "No webhook configured; skipping");
            return;
        };

        tokio::spawn(async move {
            let event = notification.name();
            match HTTP_CLIENT.post(&url).json(&notification).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::info!(event, "Notification delivered");
                }
                Ok(response) => {
                    tracing::warn!(event, status = %response.status(), "Notification webhook rejected");
                }
                Err(e) => {
                    tracing::warn!(event, error = %e, "Notification webhook failed");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::db::models::LeadStatus;

    #[test]
    fn test_notification_payload_is_tagged() {
        let lead = Lead {
            id: 3,
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            company: None,
            service_interest: None,
            message: None,
            source: "contact_form".to_string(),
            status: LeadStatus::New,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(Notification::LeadCreated(lead)).unwrap();
        assert_eq!(value["event"], "lead_created");
        assert_eq!(value["data"]["id"], 3);
    }

    #[tokio::test]
    async fn test_send_without_webhook_is_noop() {
        Notifier::default().send(Notification::BookingCreated(crate::db::models::Booking {
            id: 1,
            name: "Ben".to_string(),
            email: "ben@example.com".to_string(),
            phone: None,
            company: None,
            service_type: "audit".to_string(),
            preferred_date: chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            preferred_time: None,
            message: None,
            status: crate::db::models::BookingStatus::Pending,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }));
    }
}
