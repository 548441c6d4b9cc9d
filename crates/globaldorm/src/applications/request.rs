//! Validation of raw caller input before it reaches the lifecycle manager.

use serde_json::{Map, Value};

use super::domain::{ApplicationId, NewApplication};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("request body is not valid JSON: {0}")]
    MalformedBody(String),
    #[error("request body must be a JSON object")]
    NotAnObject,
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("{field} {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
}

impl NewApplication {
    pub fn new(room_id: u64, user_id: &str, user_email: &str) -> Result<Self, ValidationError> {
        if room_id == 0 {
            return Err(ValidationError::InvalidField {
                field: "room_id",
                reason: "must be a positive integer",
            });
        }
        let user_id = non_blank("user_id", user_id)?;
        let user_email = non_blank("user_email", user_email)?;
        if !looks_like_email(&user_email) {
            return Err(ValidationError::InvalidField {
                field: "user_email",
                reason: "must be an email address",
            });
        }

        Ok(Self {
            room_id,
            user_id,
            user_email,
        })
    }

    /// Parses `{"room_id": 1, "user_id": "...", "user_email": "..."}`.
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let fields = body.as_object().ok_or(ValidationError::NotAnObject)?;

        let missing: Vec<&'static str> = ["room_id", "user_id", "user_email"]
            .into_iter()
            .filter(|key| fields.get(*key).map_or(true, Value::is_null))
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        Self::new(
            positive_id(fields, "room_id")?,
            text_field(fields, "user_id")?,
            text_field(fields, "user_email")?,
        )
    }
}

/// Validated input for a cancellation: the path id and the requesting user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelApplication {
    pub application_id: ApplicationId,
    pub user_id: String,
}

impl CancelApplication {
    pub fn from_parts(raw_id: &str, body: &Value) -> Result<Self, ValidationError> {
        let application_id = raw_id
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|id| *id > 0)
            .map(ApplicationId)
            .ok_or(ValidationError::InvalidField {
                field: "application_id",
                reason: "must be a positive integer",
            })?;

        let fields = body.as_object().ok_or(ValidationError::NotAnObject)?;
        if fields.get("user_id").map_or(true, Value::is_null) {
            return Err(ValidationError::MissingFields(vec!["user_id"]));
        }
        let user_id = non_blank("user_id", text_field(fields, "user_id")?)?;

        Ok(Self {
            application_id,
            user_id,
        })
    }
}

fn positive_id(fields: &Map<String, Value>, field: &'static str) -> Result<u64, ValidationError> {
    fields
        .get(field)
        .and_then(Value::as_u64)
        .filter(|id| *id > 0)
        .ok_or(ValidationError::InvalidField {
            field,
            reason: "must be a positive integer",
        })
}

fn text_field<'a>(
    fields: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    fields
        .get(field)
        .and_then(Value::as_str)
        .ok_or(ValidationError::InvalidField {
            field,
            reason: "must be a string",
        })
}

fn non_blank(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let text = value.trim();
    if text.is_empty() {
        return Err(ValidationError::InvalidField {
            field,
            reason: "must not be blank",
        });
    }
    Ok(text.to_string())
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
