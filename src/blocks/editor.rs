//! Admin edit-form contract: form views and the generic field setter.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::{BlockKind, BlockType, FieldKind, FieldSpec};
use crate::db::models::ContentBlock;

#[derive(Debug, Error, PartialEq)]
pub enum EditError {
    #[error("unknown field '{field}' for {block_type} blocks")]
    UnknownField { block_type: BlockType, field: String },

    #[error("field paths nest at most one level: '{0}'")]
    TooDeep(String),

    #[error("field '{field}' expects {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("invalid JSON: {0}")]
    InvalidJson(String),
}

/// A form field with its current value, as shown in the edit dialog
#[derive(Debug, Serialize)]
pub struct FormField {
    #[serde(flatten)]
    pub spec: FieldSpec,
    pub value: Value,
}

#[derive(Debug, Serialize)]
pub struct BlockForm {
    pub id: i64,
    pub page: String,
    pub section: String,
    pub block_key: String,
    pub block_type: BlockType,
    pub label: &'static str,
    pub fields: Vec<FormField>,
    /// Whole content as pretty-printed JSON, for the raw editor
    pub raw: String,
}

fn form_value(spec: &FieldSpec, current: Option<&Value>) -> Value {
    match (spec.kind, current) {
        (FieldKind::List, Some(Value::Array(items))) => Value::String(
            items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        (FieldKind::List, _) => Value::String(String::new()),
        (FieldKind::Group { fields }, current) => {
            let nested = current.and_then(Value::as_object);
            Value::Object(
                fields
                    .iter()
                    .map(|f| {
                        (
                            f.name.to_string(),
                            form_value(f, nested.and_then(|m| m.get(f.name))),
                        )
                    })
                    .collect(),
            )
        }
        (FieldKind::Json, Some(v)) => {
            Value::String(serde_json::to_string_pretty(v).unwrap_or_default())
        }
        (FieldKind::Json, None) => Value::String(String::new()),
        (_, Some(v)) => v.clone(),
        (_, None) => Value::Null,
    }
}

pub fn form(block: &ContentBlock) -> BlockForm {
    let kind: &BlockKind = block.block_type.kind();
    let content = block.content.as_object();
    let fields = kind
        .fields
        .iter()
        .map(|spec| FormField {
            spec: *spec,
            value: form_value(spec, content.and_then(|c| c.get(spec.name))),
        })
        .collect();

    BlockForm {
        id: block.id,
        page: block.page.clone(),
        section: block.section.clone(),
        block_key: block.block_key.clone(),
        block_type: block.block_type,
        label: kind.label,
        fields,
        raw: serde_json::to_string_pretty(&block.content).unwrap_or_default(),
    }
}

/// Split newline-delimited editor text into list items.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

fn coerce(spec: &FieldSpec, path: &str, value: Value) -> Result<Value, EditError> {
    let wrong = |expected| EditError::WrongType {
        field: path.to_string(),
        expected,
    };
    match spec.kind {
        FieldKind::Text | FieldKind::TextArea | FieldKind::Url => match value {
            Value::String(_) | Value::Null => Ok(value),
            _ => Err(wrong("a string")),
        },
        FieldKind::List => match value {
            Value::String(text) => Ok(Value::from(split_lines(&text))),
            Value::Array(_) | Value::Null => Ok(value),
            _ => Err(wrong("newline-delimited text")),
        },
        FieldKind::Number => match value {
            Value::Number(_) | Value::Null => Ok(value),
            Value::String(text) => {
                let text = text.trim();
                if text.is_empty() {
                    Ok(Value::Null)
                } else if let Ok(n) = text.parse::<i64>() {
                    Ok(Value::from(n))
                } else {
                    text.parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                        .map(Value::Number)
                        .ok_or_else(|| wrong("a number"))
                }
            }
            _ => Err(wrong("a number")),
        },
        FieldKind::Json => match value {
            Value::String(text) => parse_raw(&text),
            other => Ok(other),
        },
        FieldKind::Group { .. } => match value {
            Value::Object(_) | Value::Null => Ok(value),
            _ => Err(wrong("an object")),
        },
    }
}

/// Apply one field edit to a copy of `content`.
///
/// `field` is `name` or `parent.name`. The result still has to pass
/// [`super::validate`] before it is stored.
pub fn set_field(
    block_type: BlockType,
    content: &Value,
    field: &str,
    value: Value,
) -> Result<Value, EditError> {
    let unknown = || EditError::UnknownField {
        block_type,
        field: field.to_string(),
    };
    let kind = block_type.kind();
    let mut root = content.as_object().cloned().unwrap_or_default();

    match field.split('.').collect::<Vec<_>>().as_slice() {
        [name] => {
            let spec = kind.field(name).ok_or_else(unknown)?;
            root.insert(name.to_string(), coerce(spec, field, value)?);
        }
        [parent, name] => {
            let parent_spec = kind.field(parent).ok_or_else(unknown)?;
            let FieldKind::Group { fields } = parent_spec.kind else {
                return Err(unknown());
            };
            let spec = fields.iter().find(|f| f.name == *name).ok_or_else(unknown)?;
            let coerced = coerce(spec, field, value)?;
            let mut nested: Map<String, Value> = root
                .get(*parent)
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            nested.insert(name.to_string(), coerced);
            root.insert(parent.to_string(), Value::Object(nested));
        }
        _ => return Err(EditError::TooDeep(field.to_string())),
    }

    Ok(Value::Object(root))
}

/// Parse raw editor JSON. Invalid input is an error, never a silent no-op.
pub fn parse_raw(text: &str) -> Result<Value, EditError> {
    serde_json::from_str(text).map_err(|e| EditError::InvalidJson(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_list_field_splits_lines() {
        let updated = set_field(
            BlockType::TeamMember,
            &json!({ "name": "Amina" }),
            "expertise_areas",
            json!("Payroll\n\n  Talent acquisition  \n"),
        )
        .unwrap();
        assert_eq!(
            updated,
            json!({ "name": "Amina", "expertise_areas": ["Payroll", "Talent acquisition"] })
        );
    }

    #[test]
    fn test_nested_field_merges_into_parent() {
        let content = json!({ "primary": { "text": "Book", "url": "/booking" } });
        let updated = set_field(
            BlockType::CtaButtons,
            &content,
            "primary.text",
            json!("Book a consultation"),
        )
        .unwrap();
        assert_eq!(updated["primary"]["text"], "Book a consultation");
        assert_eq!(updated["primary"]["url"], "/booking");
    }

    #[test]
    fn test_number_field_is_parsed() {
        let updated =
            set_field(BlockType::Testimonial, &json!({}), "rating", json!(" 4 ")).unwrap();
        assert_eq!(updated["rating"], 4);
        assert!(matches!(
            set_field(BlockType::Testimonial, &json!({}), "rating", json!("five")),
            Err(EditError::WrongType { .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_and_deep_paths() {
        assert!(matches!(
            set_field(BlockType::Faq, &json!({}), "colour", json!("red")),
            Err(EditError::UnknownField { .. })
        ));
        assert!(matches!(
            set_field(BlockType::CtaButtons, &json!({}), "primary.text.x", json!("a")),
            Err(EditError::TooDeep(_))
        ));
    }

    #[test]
    fn test_invalid_raw_json_is_reported() {
        assert!(matches!(parse_raw("{ nope"), Err(EditError::InvalidJson(_))));
        assert!(matches!(
            set_field(BlockType::Navigation, &json!({}), "items", json!("[oops")),
            Err(EditError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_form_joins_list_fields() {
        let block = ContentBlock {
            id: 7,
            page: "home".to_string(),
            section: "trust".to_string(),
            block_type: BlockType::TrustIndicators,
            block_key: "indicators".to_string(),
            content: json!({ "indicators": ["SHRM certified", "20+ years"] }),
            sort_order: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let form = form(&block);
        assert_eq!(form.label, "Trust indicators");
        assert_eq!(form.fields[0].value, Value::Null);
        assert_eq!(form.fields[1].value, json!("SHRM certified\n20+ years"));
    }
}
