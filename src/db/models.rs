//! Database Models - structs representing database tables (used by sqlx/serde).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::cmp::Ordering;
use thiserror::Error;

use crate::blocks::BlockType;
use crate::store::{Entity, ListFilter};

/// Patch field where an absent key leaves the value alone and `null` clears it
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A text column held a value outside its enum
#[derive(Debug, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed string enum stored as TEXT and serialized in snake_case.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, UnknownVariant> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = UnknownVariant;

            fn try_from(value: String) -> Result<Self, UnknownVariant> {
                value.parse()
            }
        }
    };
}

pub(crate) use text_enum;

text_enum!(
    /// Lead pipeline: new → contacted → qualified → converted | lost
    LeadStatus, "lead status" {
        New => "new",
        Contacted => "contacted",
        Qualified => "qualified",
        Converted => "converted",
        Lost => "lost",
    }
);

impl LeadStatus {
    fn rank(&self) -> u8 {
        match self {
            LeadStatus::New => 0,
            LeadStatus::Contacted => 1,
            LeadStatus::Qualified => 2,
            LeadStatus::Converted | LeadStatus::Lost => 3,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LeadStatus::Converted | LeadStatus::Lost)
    }

    pub fn can_transition_to(&self, next: LeadStatus) -> bool {
        *self == next || (!self.is_terminal() && next.rank() > self.rank())
    }
}

text_enum!(
    /// Booking lifecycle: pending → confirmed → completed | cancelled
    BookingStatus, "booking status" {
        Pending => "pending",
        Confirmed => "confirmed",
        Completed => "completed",
        Cancelled => "cancelled",
    }
);

impl BookingStatus {
    fn rank(&self) -> u8 {
        match self {
            BookingStatus::Pending => 0,
            BookingStatus::Confirmed => 1,
            BookingStatus::Completed | BookingStatus::Cancelled => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        *self == next || (!self.is_terminal() && next.rank() > self.rank())
    }
}

text_enum!(
    AdminRole, "admin role" {
        SuperAdmin => "super_admin",
        Admin => "admin",
        Editor => "editor",
    }
);

impl AdminRole {
    pub fn can_manage_users(&self) -> bool {
        matches!(self, AdminRole::SuperAdmin | AdminRole::Admin)
    }
}

// ============================================================================
// Content blocks
// ============================================================================

/// One editable piece of page copy
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ContentBlock {
    pub id: i64,
    pub page: String,
    pub section: String,
    #[sqlx(try_from = "String")]
    pub block_type: BlockType,
    pub block_key: String,
    pub content: Value,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentBlock {
    pub fn position(&self, other: &Self) -> Ordering {
        self.sort_order
            .cmp(&other.sort_order)
            .then(self.id.cmp(&other.id))
    }
}

/// Row for an upsert keyed by `(page, section, block_key)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContentBlock {
    pub page: String,
    pub section: String,
    pub block_type: BlockType,
    pub block_key: String,
    pub content: Value,
    #[serde(default)]
    pub sort_order: i32,
}

/// Body of PUT /api/content/:id. The identity triple cannot change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentBlockUpdate {
    pub content: Option<Value>,
    pub sort_order: Option<i32>,
    pub block_type: Option<BlockType>,
}

// ============================================================================
// Leads
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub service_interest: Option<String>,
    pub message: Option<String>,
    pub source: String,
    #[sqlx(try_from = "String")]
    pub status: LeadStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Contact form submission
#[derive(Debug, Clone, Deserialize)]
pub struct LeadDraft {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub service_interest: Option<String>,
    pub message: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub company: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub service_interest: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub message: Option<Option<String>>,
    pub status: Option<LeadStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

impl Entity for Lead {
    type Draft = LeadDraft;
    type Patch = LeadPatch;
    const KIND: &'static str = "lead";

    fn id(&self) -> i64 {
        self.id
    }

    fn from_draft(id: i64, draft: LeadDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            email: draft.email,
            phone: draft.phone,
            company: draft.company,
            service_interest: draft.service_interest,
            message: draft.message,
            source: draft.source.unwrap_or_else(|| "contact_form".to_string()),
            status: LeadStatus::New,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, patch: LeadPatch, now: DateTime<Utc>) {
        if let Some(v) = patch.name {
            self.name = v;
        }
        if let Some(v) = patch.email {
            self.email = v;
        }
        if let Some(v) = patch.phone {
            self.phone = v;
        }
        if let Some(v) = patch.company {
            self.company = v;
        }
        if let Some(v) = patch.service_interest {
            self.service_interest = v;
        }
        if let Some(v) = patch.message {
            self.message = v;
        }
        if let Some(v) = patch.notes {
            self.notes = v;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = now;
    }

    fn matches(&self, filter: &ListFilter) -> bool {
        filter.admits(
            Some(self.status.as_str()),
            self.service_interest.as_deref(),
            None,
            &[
                &self.name,
                &self.email,
                self.company.as_deref().unwrap_or(""),
            ],
        )
    }
}

// ============================================================================
// Bookings
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub service_type: String,
    pub preferred_date: NaiveDate,
    pub preferred_time: Option<String>,
    pub message: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingDraft {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub service_type: String,
    pub preferred_date: NaiveDate,
    pub preferred_time: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingPatch {
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub company: Option<Option<String>>,
    pub service_type: Option<String>,
    pub preferred_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "nullable")]
    pub preferred_time: Option<Option<String>>,
    pub status: Option<BookingStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

impl Entity for Booking {
    type Draft = BookingDraft;
    type Patch = BookingPatch;
    const KIND: &'static str = "booking";

    fn id(&self) -> i64 {
        self.id
    }

    fn from_draft(id: i64, draft: BookingDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            email: draft.email,
            phone: draft.phone,
            company: draft.company,
            service_type: draft.service_type,
            preferred_date: draft.preferred_date,
            preferred_time: draft.preferred_time,
            message: draft.message,
            status: BookingStatus::Pending,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, patch: BookingPatch, now: DateTime<Utc>) {
        if let Some(v) = patch.phone {
            self.phone = v;
        }
        if let Some(v) = patch.company {
            self.company = v;
        }
        if let Some(v) = patch.service_type {
            self.service_type = v;
        }
        if let Some(v) = patch.preferred_date {
            self.preferred_date = v;
        }
        if let Some(v) = patch.preferred_time {
            self.preferred_time = v;
        }
        if let Some(v) = patch.notes {
            self.notes = v;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = now;
    }

    fn matches(&self, filter: &ListFilter) -> bool {
        filter.admits(
            Some(self.status.as_str()),
            Some(&self.service_type),
            None,
            &[
                &self.name,
                &self.email,
                self.company.as_deref().unwrap_or(""),
            ],
        )
    }
}

// ============================================================================
// Case studies
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CaseStudy {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub client_name: String,
    pub industry: String,
    pub category: String,
    pub challenge: String,
    pub solution: String,
    pub results: Vec<String>,
    pub image_url: Option<String>,
    pub published: bool,
    pub featured: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaseStudyDraft {
    pub title: String,
    pub slug: String,
    pub client_name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub challenge: String,
    #[serde(default)]
    pub solution: String,
    #[serde(default)]
    pub results: Vec<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaseStudyPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub client_name: Option<String>,
    pub industry: Option<String>,
    pub category: Option<String>,
    pub challenge: Option<String>,
    pub solution: Option<String>,
    pub results: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
    pub published: Option<bool>,
    pub featured: Option<bool>,
    pub sort_order: Option<i32>,
}

impl Entity for CaseStudy {
    type Draft = CaseStudyDraft;
    type Patch = CaseStudyPatch;
    const KIND: &'static str = "case study";

    fn id(&self) -> i64 {
        self.id
    }

    fn from_draft(id: i64, d: CaseStudyDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: d.title,
            slug: d.slug,
            client_name: d.client_name,
            industry: d.industry,
            category: d.category,
            challenge: d.challenge,
            solution: d.solution,
            results: d.results,
            image_url: d.image_url,
            published: d.published,
            featured: d.featured,
            sort_order: d.sort_order,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, p: CaseStudyPatch, now: DateTime<Utc>) {
        if let Some(v) = p.title {
            self.title = v;
        }
        if let Some(v) = p.slug {
            self.slug = v;
        }
        if let Some(v) = p.client_name {
            self.client_name = v;
        }
        if let Some(v) = p.industry {
            self.industry = v;
        }
        if let Some(v) = p.category {
            self.category = v;
        }
        if let Some(v) = p.challenge {
            self.challenge = v;
        }
        if let Some(v) = p.solution {
            self.solution = v;
        }
        if let Some(v) = p.results {
            self.results = v;
        }
        if let Some(v) = p.image_url {
            self.image_url = v;
        }
        if let Some(v) = p.published {
            self.published = v;
        }
        if let Some(v) = p.featured {
            self.featured = v;
        }
        if let Some(v) = p.sort_order {
            self.sort_order = v;
        }
        self.updated_at = now;
    }

    fn slug(&self) -> Option<&str> {
        Some(&self.slug)
    }

    fn matches(&self, filter: &ListFilter) -> bool {
        filter.admits(
            None,
            Some(&self.category),
            Some(self.published),
            &[&self.title, &self.client_name, &self.industry],
        )
    }

    fn listing_order(&self, other: &Self) -> Ordering {
        self.sort_order
            .cmp(&other.sort_order)
            .then(self.id.cmp(&other.id))
    }
}

// ============================================================================
// Services
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub description: String,
    pub category: String,
    pub icon: Option<String>,
    pub features: Vec<String>,
    pub published: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDraft {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub icon: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicePatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub icon: Option<Option<String>>,
    pub features: Option<Vec<String>>,
    pub published: Option<bool>,
    pub sort_order: Option<i32>,
}

impl Entity for Service {
    type Draft = ServiceDraft;
    type Patch = ServicePatch;
    const KIND: &'static str = "service";

    fn id(&self) -> i64 {
        self.id
    }

    fn from_draft(id: i64, d: ServiceDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: d.title,
            slug: d.slug,
            summary: d.summary,
            description: d.description,
            category: d.category,
            icon: d.icon,
            features: d.features,
            published: d.published,
            sort_order: d.sort_order,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, p: ServicePatch, now: DateTime<Utc>) {
        if let Some(v) = p.title {
            self.title = v;
        }
        if let Some(v) = p.slug {
            self.slug = v;
        }
        if let Some(v) = p.summary {
            self.summary = v;
        }
        if let Some(v) = p.description {
            self.description = v;
        }
        if let Some(v) = p.category {
            self.category = v;
        }
        if let Some(v) = p.icon {
            self.icon = v;
        }
        if let Some(v) = p.features {
            self.features = v;
        }
        if let Some(v) = p.published {
            self.published = v;
        }
        if let Some(v) = p.sort_order {
            self.sort_order = v;
        }
        self.updated_at = now;
    }

    fn slug(&self) -> Option<&str> {
        Some(&self.slug)
    }

    fn matches(&self, filter: &ListFilter) -> bool {
        filter.admits(
            None,
            Some(&self.category),
            Some(self.published),
            &[&self.title, &self.summary],
        )
    }

    fn listing_order(&self, other: &Self) -> Ordering {
        self.sort_order
            .cmp(&other.sort_order)
            .then(self.id.cmp(&other.id))
    }
}

// ============================================================================
// Testimonials
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Testimonial {
    pub id: i64,
    pub client_name: String,
    pub client_title: Option<String>,
    pub company: Option<String>,
    pub quote: String,
    pub rating: i32,
    pub image_url: Option<String>,
    pub published: bool,
    pub featured: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_rating() -> i32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestimonialDraft {
    pub client_name: String,
    pub client_title: Option<String>,
    pub company: Option<String>,
    pub quote: String,
    #[serde(default = "default_rating")]
    pub rating: i32,
    pub image_url: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestimonialPatch {
    pub client_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub client_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub company: Option<Option<String>>,
    pub quote: Option<String>,
    pub rating: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
    pub published: Option<bool>,
    pub featured: Option<bool>,
    pub sort_order: Option<i32>,
}

impl Entity for Testimonial {
    type Draft = TestimonialDraft;
    type Patch = TestimonialPatch;
    const KIND: &'static str = "testimonial";

    fn id(&self) -> i64 {
        self.id
    }

    fn from_draft(id: i64, d: TestimonialDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            client_name: d.client_name,
            client_title: d.client_title,
            company: d.company,
            quote: d.quote,
            rating: d.rating,
            image_url: d.image_url,
            published: d.published,
            featured: d.featured,
            sort_order: d.sort_order,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, p: TestimonialPatch, now: DateTime<Utc>) {
        if let Some(v) = p.client_name {
            self.client_name = v;
        }
        if let Some(v) = p.client_title {
            self.client_title = v;
        }
        if let Some(v) = p.company {
            self.company = v;
        }
        if let Some(v) = p.quote {
            self.quote = v;
        }
        if let Some(v) = p.rating {
            self.rating = v;
        }
        if let Some(v) = p.image_url {
            self.image_url = v;
        }
        if let Some(v) = p.published {
            self.published = v;
        }
        if let Some(v) = p.featured {
            self.featured = v;
        }
        if let Some(v) = p.sort_order {
            self.sort_order = v;
        }
        self.updated_at = now;
    }

    fn matches(&self, filter: &ListFilter) -> bool {
        filter.admits(
            None,
            None,
            Some(self.published),
            &[
                &self.client_name,
                self.company.as_deref().unwrap_or(""),
                &self.quote,
            ],
        )
    }

    fn listing_order(&self, other: &Self) -> Ordering {
        self.sort_order
            .cmp(&other.sort_order)
            .then(self.id.cmp(&other.id))
    }
}

// ============================================================================
// Insights (blog)
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Insight {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub summary: Option<String>,
    pub content_html: Option<String>,
    pub category: String,
    pub author: Option<String>,
    pub tags: Vec<String>,
    pub cover_image: Option<String>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsightDraft {
    pub title: String,
    pub slug: String,
    pub summary: Option<String>,
    pub content_html: Option<String>,
    #[serde(default)]
    pub category: String,
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub cover_image: Option<String>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InsightPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub summary: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub content_html: Option<Option<String>>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub author: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub cover_image: Option<Option<String>>,
    pub published: Option<bool>,
}

impl Entity for Insight {
    type Draft = InsightDraft;
    type Patch = InsightPatch;
    const KIND: &'static str = "insight";

    fn id(&self) -> i64 {
        self.id
    }

    fn from_draft(id: i64, d: InsightDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: d.title,
            slug: d.slug,
            summary: d.summary,
            content_html: d.content_html,
            category: d.category,
            author: d.author,
            tags: d.tags,
            cover_image: d.cover_image,
            published: d.published,
            published_at: d.published.then_some(now),
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, p: InsightPatch, now: DateTime<Utc>) {
        if let Some(v) = p.title {
            self.title = v;
        }
        if let Some(v) = p.slug {
            self.slug = v;
        }
        if let Some(v) = p.summary {
            self.summary = v;
        }
        if let Some(v) = p.content_html {
            self.content_html = v;
        }
        if let Some(v) = p.category {
            self.category = v;
        }
        if let Some(v) = p.author {
            self.author = v;
        }
        if let Some(v) = p.tags {
            self.tags = v;
        }
        if let Some(v) = p.cover_image {
            self.cover_image = v;
        }
        if let Some(published) = p.published {
            // First publication stamps the date; unpublishing keeps it.
            if published && self.published_at.is_none() {
                self.published_at = Some(now);
            }
            self.published = published;
        }
        self.updated_at = now;
    }

    fn slug(&self) -> Option<&str> {
        Some(&self.slug)
    }

    fn matches(&self, filter: &ListFilter) -> bool {
        let tags = self.tags.join(" ");
        filter.admits(
            None,
            Some(&self.category),
            Some(self.published),
            &[&self.title, self.summary.as_deref().unwrap_or(""), &tags],
        )
    }
}

// ============================================================================
// Media
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: i64,
    pub filename: String,
    pub original_name: String,
    pub url: String,
    pub file_size: i64,
    pub mime_type: String,
    pub checksum: String,
    pub alt_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Built by the upload handler once the file is on disk
#[derive(Debug, Clone)]
pub struct MediaDraft {
    pub filename: String,
    pub original_name: String,
    pub url: String,
    pub file_size: i64,
    pub mime_type: String,
    pub checksum: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaPatch {
    #[serde(default, deserialize_with = "nullable")]
    pub alt_text: Option<Option<String>>,
    pub original_name: Option<String>,
}

impl Entity for MediaAsset {
    type Draft = MediaDraft;
    type Patch = MediaPatch;
    const KIND: &'static str = "media asset";

    fn id(&self) -> i64 {
        self.id
    }

    fn from_draft(id: i64, d: MediaDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            filename: d.filename,
            original_name: d.original_name,
            url: d.url,
            file_size: d.file_size,
            mime_type: d.mime_type,
            checksum: d.checksum,
            alt_text: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, p: MediaPatch, now: DateTime<Utc>) {
        if let Some(v) = p.alt_text {
            self.alt_text = v;
        }
        if let Some(v) = p.original_name {
            self.original_name = v;
        }
        self.updated_at = now;
    }

    fn matches(&self, filter: &ListFilter) -> bool {
        let family = self.mime_type.split('/').next().unwrap_or("");
        filter.admits(
            None,
            Some(family),
            None,
            &[&self.original_name, self.alt_text.as_deref().unwrap_or("")],
        )
    }
}

// ============================================================================
// Admin users
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: AdminRole,
    pub is_active: bool,
    pub login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AdminUserDraft {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: AdminRole,
}

#[derive(Debug, Clone, Default)]
pub struct AdminUserPatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<AdminRole>,
    pub is_active: Option<bool>,
    pub login_attempts: Option<i32>,
    pub locked_until: Option<Option<DateTime<Utc>>>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Entity for AdminUser {
    type Draft = AdminUserDraft;
    type Patch = AdminUserPatch;
    const KIND: &'static str = "admin user";

    fn id(&self) -> i64 {
        self.id
    }

    fn from_draft(id: i64, d: AdminUserDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email: d.email,
            name: d.name,
            password_hash: d.password_hash,
            role: d.role,
            is_active: true,
            login_attempts: 0,
            locked_until: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, p: AdminUserPatch, now: DateTime<Utc>) {
        if let Some(v) = p.email {
            self.email = v;
        }
        if let Some(v) = p.name {
            self.name = v;
        }
        if let Some(v) = p.password_hash {
            self.password_hash = v;
        }
        if let Some(v) = p.role {
            self.role = v;
        }
        if let Some(v) = p.is_active {
            self.is_active = v;
        }
        if let Some(v) = p.login_attempts {
            self.login_attempts = v;
        }
        if let Some(v) = p.locked_until {
            self.locked_until = v;
        }
        if let Some(v) = p.last_login_at {
            self.last_login_at = Some(v);
        }
        self.updated_at = now;
    }

    /// Emails are unique case-insensitively.
    fn slug(&self) -> Option<&str> {
        Some(&self.email)
    }

    fn matches(&self, filter: &ListFilter) -> bool {
        filter.admits(
            Some(self.role.as_str()),
            None,
            None,
            &[&self.email, &self.name],
        )
    }

    fn listing_order(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Site-wide key/value setting
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SiteSetting {
    pub key: String,
    pub value: Value,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_status_moves_forward_only() {
        assert!(LeadStatus::New.can_transition_to(LeadStatus::Qualified));
        assert!(LeadStatus::Qualified.can_transition_to(LeadStatus::Lost));
        assert!(!LeadStatus::Qualified.can_transition_to(LeadStatus::Contacted));
        assert!(!LeadStatus::Converted.can_transition_to(LeadStatus::Lost));
        assert!(LeadStatus::Lost.can_transition_to(LeadStatus::Lost));
    }

    #[test]
    fn test_booking_cancel_only_before_completion() {
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Cancelled));
        assert!(BookingStatus::Confirmed.can_transition_to(BookingStatus::Completed));
        assert!(!BookingStatus::Completed.can_transition_to(BookingStatus::Cancelled));
        assert!(!BookingStatus::Confirmed.can_transition_to(BookingStatus::Pending));
    }

    #[test]
    fn test_text_enum_round_trips_through_strings() {
        for role in AdminRole::ALL {
            assert_eq!(role.as_str().parse::<AdminRole>().unwrap(), *role);
        }
        let err = "owner".parse::<AdminRole>().unwrap_err();
        assert_eq!(err.to_string(), "unknown admin role 'owner'");
    }

    #[test]
    fn test_admin_user_hides_password_hash() {
        let user = AdminUser::from_draft(
            1,
            AdminUserDraft {
                email: "a@eshrm.com".to_string(),
                name: "A".to_string(),
                password_hash: "$2b$secret".to_string(),
                role: AdminRole::Admin,
            },
            Utc::now(),
        );
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_insight_publication_date_set_once() {
        let now = Utc::now();
        let mut insight = Insight::from_draft(
            1,
            InsightDraft {
                title: "Payroll in Kenya".to_string(),
                slug: "payroll-in-kenya".to_string(),
                summary: None,
                content_html: None,
                category: "compliance".to_string(),
                author: None,
                tags: vec![],
                cover_image: None,
                published: false,
            },
            now,
        );
        assert!(insight.published_at.is_none());
        insight.apply_patch(
            InsightPatch {
                published: Some(true),
                ..Default::default()
            },
            now,
        );
        assert_eq!(insight.published_at, Some(now));
    }

    #[test]
    fn test_null_clears_optional_field_and_absent_keeps_it() {
        let now = Utc::now();
        let mut lead = Lead::from_draft(
            1,
            LeadDraft {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                phone: Some("+233 20 000 0000".to_string()),
                company: Some("Acme".to_string()),
                service_interest: None,
                message: None,
                source: None,
            },
            now,
        );

        let keep: LeadPatch = serde_json::from_value(serde_json::json!({ "name": "Ada L." })).unwrap();
        assert!(keep.phone.is_none());
        lead.apply_patch(keep, now);
        assert_eq!(lead.phone.as_deref(), Some("+233 20 000 0000"));

        let clear: LeadPatch =
            serde_json::from_value(serde_json::json!({ "phone": null, "company": "Globex" })).unwrap();
        assert_eq!(clear.phone, Some(None));
        lead.apply_patch(clear, now);
        assert!(lead.phone.is_none());
        assert_eq!(lead.company.as_deref(), Some("Globex"));
        assert_eq!(lead.name, "Ada L.");
    }
}
