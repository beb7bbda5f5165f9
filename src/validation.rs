//! Request body validation against declared shapes
//!
//! A [`Shape`] lists the fields a JSON body is expected to carry. Validation
//! runs before anything is persisted and reports every failing field at once.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, Result};

/// JSON type a field must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    /// A JSON number without a fractional part
    Integer,
}

impl FieldKind {
    fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Integer => value.is_i64(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl Field {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// Declared shape of a request body
#[derive(Debug, Clone, Copy)]
pub struct Shape {
    fields: &'static [Field],
}

impl Shape {
    pub const fn new(fields: &'static [Field]) -> Self {
        Self { fields }
    }

    /// Collect every field error for `body`
    pub fn errors(&self, body: &Value) -> Vec<String> {
        let Some(object) = body.as_object() else {
            return vec!["body must be an `object` type".to_string()];
        };

        let mut errors = Vec::new();
        for field in self.fields {
            match object.get(field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        errors.push(format!("{} is a required field", field.name));
                    }
                }
                Some(value) if !field.kind.matches(value) => {
                    errors.push(format!(
                        "{} must be a `{}` type",
                        field.name,
                        field.kind.as_str()
                    ));
                }
                Some(Value::String(s)) if field.required && s.trim().is_empty() => {
                    errors.push(format!("{} is a required field", field.name));
                }
                Some(_) => {}
            }
        }
        errors
    }

    pub fn validate(&self, body: &Value) -> Result<()> {
        let errors = self.errors(body);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors.join(", ")))
        }
    }

    /// Validate `body` and then decode it into a typed request
    pub fn parse<T: DeserializeOwned>(&self, body: Value) -> Result<T> {
        self.validate(&body)?;
        serde_json::from_value(body).map_err(|e| AppError::Validation(e.to_string()))
    }
}

pub const CREATE_PROBLEM: Shape = Shape::new(&[
    Field::required("description", FieldKind::String),
    Field::required("deliveryman_id", FieldKind::Integer),
]);

pub const CREATE_DELIVERY: Shape = Shape::new(&[
    Field::required("product", FieldKind::String),
    Field::required("recipient_id", FieldKind::Integer),
    Field::required("deliveryman_id", FieldKind::Integer),
]);

pub const CREATE_DELIVERYMAN: Shape = Shape::new(&[
    Field::required("name", FieldKind::String),
    Field::required("email", FieldKind::String),
]);

pub const CREATE_RECIPIENT: Shape = Shape::new(&[
    Field::required("name", FieldKind::String),
    Field::required("street", FieldKind::String),
    Field::required("number", FieldKind::String),
    Field::optional("complement", FieldKind::String),
    Field::required("state", FieldKind::String),
    Field::required("city", FieldKind::String),
    Field::required("zip_code", FieldKind::String),
]);
