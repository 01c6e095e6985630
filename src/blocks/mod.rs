//! Block type registry.
//!
//! One table keyed by [`BlockType`] drives the typed content decoder, the
//! display renderer used by the page resolver and the admin edit form.

pub mod content;
pub mod editor;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::db::models::{text_enum, ContentBlock, UnknownVariant};
use content::*;

text_enum!(
    /// Shape tag of a content block's JSON payload
    BlockType, "block type" {
        Text => "text",
        Image => "image",
        Button => "button",
        Stats => "stats",
        Testimonial => "testimonial",
        TrustIndicators => "trust_indicators",
        Feature => "feature",
        TeamMember => "team_member",
        Contact => "contact",
        Categories => "categories",
        ContactInfo => "contact_info",
        AfricaFocus => "africa_focus",
        StatsItem => "stats_item",
        ContactDetail => "contact_detail",
        ServicesList => "services_list",
        BrandName => "brand_name",
        Client => "client",
        Navigation => "navigation",
        CtaButtons => "cta_buttons",
        Links => "links",
        SocialLinks => "social_links",
        CaseStudy => "case_study",
        ProcessStep => "process_step",
        Faq => "faq",
        Reason => "reason",
    }
);

impl BlockType {
    pub fn kind(self) -> &'static BlockKind {
        &REGISTRY[self as usize]
    }

    /// Repeatable types render as collections with all-or-nothing defaults
    pub fn is_repeatable(self) -> bool {
        self.kind().repeatable
    }
}

// ============================================================================
// Registry
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    #[serde(rename = "textarea")]
    TextArea,
    Url,
    Number,
    /// Edited as newline-delimited text, stored as an array of strings
    List,
    Group {
        fields: &'static [FieldSpec],
    },
    /// Edited as raw JSON text
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    #[serde(flatten)]
    pub kind: FieldKind,
}

const fn field(name: &'static str, label: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, label, kind }
}

#[derive(Debug, Serialize)]
pub struct BlockKind {
    pub block_type: BlockType,
    pub label: &'static str,
    pub repeatable: bool,
    pub fields: &'static [FieldSpec],
}

impl BlockKind {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

use FieldKind::{Json, List, Number, Text, TextArea, Url};

const BUTTON_FIELDS: &[FieldSpec] = &[
    field("text", "Text", Text),
    field("url", "URL", Url),
    field("variant", "Variant", Text),
];

/// Indexed by `BlockType as usize`; order must follow the enum declaration.
static REGISTRY: [BlockKind; 25] = [
    BlockKind {
        block_type: BlockType::Text,
        label: "Text",
        repeatable: false,
        fields: &[
            field("text", "Text", TextArea),
            field("title", "Title", Text),
            field("description", "Description", TextArea),
        ],
    },
    BlockKind {
        block_type: BlockType::Image,
        label: "Image",
        repeatable: false,
        fields: &[
            field("url", "Image URL", Url),
            field("alt", "Alt text", Text),
            field("caption", "Caption", Text),
        ],
    },
    BlockKind {
        block_type: BlockType::Button,
        label: "Button",
        repeatable: false,
        fields: BUTTON_FIELDS,
    },
    BlockKind {
        block_type: BlockType::Stats,
        label: "Statistics",
        repeatable: false,
        fields: &[field("title", "Title", Text), field("items", "Items", Json)],
    },
    BlockKind {
        block_type: BlockType::Testimonial,
        label: "Testimonial",
        repeatable: true,
        fields: &[
            field("quote", "Quote", TextArea),
            field("author", "Author", Text),
            field("title", "Job title", Text),
            field("company", "Company", Text),
            field("rating", "Rating", Number),
            field("image", "Photo URL", Url),
        ],
    },
    BlockKind {
        block_type: BlockType::TrustIndicators,
        label: "Trust indicators",
        repeatable: false,
        fields: &[
            field("title", "Title", Text),
            field("indicators", "Indicators (one per line)", List),
        ],
    },
    BlockKind {
        block_type: BlockType::Feature,
        label: "Feature",
        repeatable: true,
        fields: &[
            field("title", "Title", Text),
            field("description", "Description", TextArea),
            field("icon", "Icon", Text),
        ],
    },
    BlockKind {
        block_type: BlockType::TeamMember,
        label: "Team member",
        repeatable: true,
        fields: &[
            field("name", "Name", Text),
            field("role", "Role", Text),
            field("bio", "Bio", TextArea),
            field("image", "Photo URL", Url),
            field("linkedin", "LinkedIn", Url),
            field("expertise_areas", "Expertise areas (one per line)", List),
        ],
    },
    BlockKind {
        block_type: BlockType::Contact,
        label: "Contact call-out",
        repeatable: false,
        fields: &[
            field("title", "Title", Text),
            field("description", "Description", TextArea),
            field("email", "Email", Text),
            field("phone", "Phone", Text),
        ],
    },
    BlockKind {
        block_type: BlockType::Categories,
        label: "Categories",
        repeatable: false,
        fields: &[
            field("title", "Title", Text),
            field("categories", "Categories (one per line)", List),
        ],
    },
    BlockKind {
        block_type: BlockType::ContactInfo,
        label: "Contact information",
        repeatable: false,
        fields: &[
            field("email", "Email", Text),
            field("phone", "Phone", Text),
            field("address", "Address", TextArea),
            field("hours", "Office hours", Text),
        ],
    },
    BlockKind {
        block_type: BlockType::AfricaFocus,
        label: "Africa focus",
        repeatable: false,
        fields: &[
            field("title", "Title", Text),
            field("description", "Description", TextArea),
            field("image", "Image URL", Url),
        ],
    },
    BlockKind {
        block_type: BlockType::StatsItem,
        label: "Statistic",
        repeatable: true,
        fields: &[
            field("value", "Value", Text),
            field("label", "Label", Text),
            field("suffix", "Suffix", Text),
        ],
    },
    BlockKind {
        block_type: BlockType::ContactDetail,
        label: "Contact detail",
        repeatable: true,
        fields: &[
            field("label", "Label", Text),
            field("value", "Value", Text),
            field("icon", "Icon", Text),
            field("link", "Link", Url),
        ],
    },
    BlockKind {
        block_type: BlockType::ServicesList,
        label: "Services list",
        repeatable: false,
        fields: &[
            field("title", "Title", Text),
            field("services", "Services (one per line)", List),
        ],
    },
    BlockKind {
        block_type: BlockType::BrandName,
        label: "Brand",
        repeatable: false,
        fields: &[
            field("name", "Name", Text),
            field("tagline", "Tagline", Text),
            field("logo", "Logo URL", Url),
        ],
    },
    BlockKind {
        block_type: BlockType::Client,
        label: "Client",
        repeatable: true,
        fields: &[
            field("name", "Name", Text),
            field("logo", "Logo URL", Url),
            field("url", "Website", Url),
        ],
    },
    BlockKind {
        block_type: BlockType::Navigation,
        label: "Navigation",
        repeatable: false,
        fields: &[field("items", "Menu items", Json)],
    },
    BlockKind {
        block_type: BlockType::CtaButtons,
        label: "Call-to-action buttons",
        repeatable: false,
        fields: &[
            field("primary", "Primary button", FieldKind::Group { fields: BUTTON_FIELDS }),
            field("secondary", "Secondary button", FieldKind::Group { fields: BUTTON_FIELDS }),
        ],
    },
    BlockKind {
        block_type: BlockType::Links,
        label: "Links",
        repeatable: false,
        fields: &[field("title", "Title", Text), field("links", "Links", Json)],
    },
    BlockKind {
        block_type: BlockType::SocialLinks,
        label: "Social links",
        repeatable: false,
        fields: &[
            field("linkedin", "LinkedIn", Url),
            field("twitter", "Twitter / X", Url),
            field("facebook", "Facebook", Url),
            field("instagram", "Instagram", Url),
        ],
    },
    BlockKind {
        block_type: BlockType::CaseStudy,
        label: "Case study",
        repeatable: true,
        fields: &[
            field("title", "Title", Text),
            field("client", "Client", Text),
            field("industry", "Industry", Text),
            field("summary", "Summary", TextArea),
            field("results", "Results (one per line)", List),
            field("image", "Image URL", Url),
        ],
    },
    BlockKind {
        block_type: BlockType::ProcessStep,
        label: "Process step",
        repeatable: true,
        fields: &[
            field("step", "Step number", Number),
            field("title", "Title", Text),
            field("description", "Description", TextArea),
        ],
    },
    BlockKind {
        block_type: BlockType::Faq,
        label: "FAQ",
        repeatable: true,
        fields: &[
            field("question", "Question", Text),
            field("answer", "Answer", TextArea),
        ],
    },
    BlockKind {
        block_type: BlockType::Reason,
        label: "Reason",
        repeatable: true,
        fields: &[
            field("title", "Title", Text),
            field("description", "Description", TextArea),
            field("icon", "Icon", Text),
        ],
    },
];

pub fn registry() -> &'static [BlockKind] {
    &REGISTRY
}

// ============================================================================
// Typed content
// ============================================================================

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{0} content must be a JSON object")]
    NotAnObject(BlockType),

    #[error("invalid {block_type} content: {source}")]
    Shape {
        block_type: BlockType,
        source: serde_json::Error,
    },

    #[error("{block_type} {field} is out of range")]
    OutOfRange {
        block_type: BlockType,
        field: &'static str,
    },
}

/// Content decoded into the variant named by its block type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BlockContent {
    Text(TextContent),
    Image(ImageContent),
    Button(ButtonContent),
    Stats(StatsContent),
    Testimonial(TestimonialContent),
    TrustIndicators(TrustIndicatorsContent),
    Feature(FeatureContent),
    TeamMember(TeamMemberContent),
    Contact(ContactContent),
    Categories(CategoriesContent),
    ContactInfo(ContactInfoContent),
    AfricaFocus(AfricaFocusContent),
    StatsItem(StatsItemContent),
    ContactDetail(ContactDetailContent),
    ServicesList(ServicesListContent),
    BrandName(BrandNameContent),
    Client(ClientContent),
    Navigation(NavigationContent),
    CtaButtons(CtaButtonsContent),
    Links(LinksContent),
    SocialLinks(SocialLinksContent),
    CaseStudy(CaseStudyContent),
    ProcessStep(ProcessStepContent),
    Faq(FaqContent),
    Reason(ReasonContent),
}

fn typed<T: serde::de::DeserializeOwned>(
    block_type: BlockType,
    content: &Value,
) -> Result<T, ContentError> {
    serde_json::from_value(content.clone())
        .map_err(|source| ContentError::Shape { block_type, source })
}

impl BlockContent {
    pub fn decode(block_type: BlockType, content: &Value) -> Result<Self, ContentError> {
        if !content.is_object() {
            return Err(ContentError::NotAnObject(block_type));
        }
        let t = block_type;
        Ok(match block_type {
            BlockType::Text => Self::Text(typed(t, content)?),
            BlockType::Image => Self::Image(typed(t, content)?),
            BlockType::Button => Self::Button(typed(t, content)?),
            BlockType::Stats => Self::Stats(typed(t, content)?),
            BlockType::Testimonial => {
                let testimonial: TestimonialContent = typed(t, content)?;
                if testimonial.rating.is_some_and(|r| !(1..=5).contains(&r)) {
                    return Err(ContentError::OutOfRange {
                        block_type: t,
                        field: "rating",
                    });
                }
                Self::Testimonial(testimonial)
            }
            BlockType::TrustIndicators => Self::TrustIndicators(typed(t, content)?),
            BlockType::Feature => Self::Feature(typed(t, content)?),
            BlockType::TeamMember => Self::TeamMember(typed(t, content)?),
            BlockType::Contact => Self::Contact(typed(t, content)?),
            BlockType::Categories => Self::Categories(typed(t, content)?),
            BlockType::ContactInfo => Self::ContactInfo(typed(t, content)?),
            BlockType::AfricaFocus => Self::AfricaFocus(typed(t, content)?),
            BlockType::StatsItem => Self::StatsItem(typed(t, content)?),
            BlockType::ContactDetail => Self::ContactDetail(typed(t, content)?),
            BlockType::ServicesList => Self::ServicesList(typed(t, content)?),
            BlockType::BrandName => Self::BrandName(typed(t, content)?),
            BlockType::Client => Self::Client(typed(t, content)?),
            BlockType::Navigation => Self::Navigation(typed(t, content)?),
            BlockType::CtaButtons => Self::CtaButtons(typed(t, content)?),
            BlockType::Links => Self::Links(typed(t, content)?),
            BlockType::SocialLinks => Self::SocialLinks(typed(t, content)?),
            BlockType::CaseStudy => Self::CaseStudy(typed(t, content)?),
            BlockType::ProcessStep => Self::ProcessStep(typed(t, content)?),
            BlockType::Faq => Self::Faq(typed(t, content)?),
            BlockType::Reason => Self::Reason(typed(t, content)?),
        })
    }

    /// Display object: the known fields that are set
    pub fn to_display(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Reject content that does not decode as its block type.
pub fn validate(block_type: BlockType, content: &Value) -> Result<(), ContentError> {
    BlockContent::decode(block_type, content).map(|_| ())
}

/// Decode `content` and return its display object tagged with `key`.
pub fn display(block_type: BlockType, key: &str, content: &Value) -> Result<Value, ContentError> {
    let mut display = BlockContent::decode(block_type, content)?.to_display();
    if let Value::Object(map) = &mut display {
        map.insert("key".to_string(), Value::String(key.to_string()));
    }
    Ok(display)
}

/// Render a stored block to the object handed to the public site.
/// Malformed rows render as `None`.
pub fn render(block: &ContentBlock) -> Option<Value> {
    match display(block.block_type, &block.block_key, &block.content) {
        Ok(display) => Some(display),
        Err(e) => {
            tracing::warn!(
                block_id = block.id,
                page = %block.page,
                section = %block.section,
                error = %e,
                "Skipping malformed content block"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn block(block_type: BlockType, key: &str, content: Value) -> ContentBlock {
        ContentBlock {
            id: 1,
            page: "about".to_string(),
            section: "values".to_string(),
            block_type,
            block_key: key.to_string(),
            content,
            sort_order: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_registry_is_indexed_by_block_type() {
        assert_eq!(REGISTRY.len(), BlockType::ALL.len());
        for block_type in BlockType::ALL {
            assert_eq!(block_type.kind().block_type, *block_type);
        }
    }

    #[test]
    fn test_repeatable_types() {
        let repeatable: Vec<&str> = BlockType::ALL
            .iter()
            .filter(|t| t.is_repeatable())
            .map(|t| t.as_str())
            .collect();
        assert_eq!(
            repeatable,
            vec![
                "testimonial",
                "feature",
                "team_member",
                "stats_item",
                "contact_detail",
                "client",
                "case_study",
                "process_step",
                "faq",
                "reason"
            ]
        );
    }

    #[test]
    fn test_decode_accepts_partial_content() {
        let decoded =
            BlockContent::decode(BlockType::TeamMember, &json!({ "name": "Amina" })).unwrap();
        assert_eq!(decoded.to_display(), json!({ "name": "Amina" }));
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        assert!(matches!(
            validate(BlockType::Feature, &json!("just a string")),
            Err(ContentError::NotAnObject(BlockType::Feature))
        ));
        assert!(matches!(
            validate(BlockType::TeamMember, &json!({ "expertise_areas": "Payroll" })),
            Err(ContentError::Shape { .. })
        ));
        assert!(validate(BlockType::Testimonial, &json!({ "rating": 9000 })).is_err());
    }

    #[test]
    fn test_testimonial_rating_is_bounded() {
        for rating in [0, 6, 255] {
            assert!(matches!(
                validate(BlockType::Testimonial, &json!({ "rating": rating })),
                Err(ContentError::OutOfRange { field: "rating", .. })
            ));
        }
        assert!(validate(BlockType::Testimonial, &json!({ "rating": 1 })).is_ok());
        assert!(validate(BlockType::Testimonial, &json!({ "rating": 5 })).is_ok());
    }

    #[test]
    fn test_render_adds_key_and_drops_unknown_fields() {
        let rendered = render(&block(
            BlockType::Feature,
            "excellence",
            json!({ "title": "Excellence", "legacy": true }),
        ))
        .unwrap();
        assert_eq!(rendered, json!({ "title": "Excellence", "key": "excellence" }));
    }

    #[test]
    fn test_render_skips_malformed_block() {
        assert!(render(&block(BlockType::Faq, "q1", json!([1, 2]))).is_none());
    }

    #[test]
    fn test_field_kind_serializes_with_tag() {
        let spec = BlockType::CtaButtons.kind().field("primary").unwrap();
        let value = serde_json::to_value(spec).unwrap();
        assert_eq!(value["kind"], "group");
        assert_eq!(value["fields"][1]["name"], "url");
        assert_eq!(value["fields"][1]["kind"], "url");
    }
}
