//! Typed task attributes.

use serde::{Deserialize, Serialize};

use crate::EditError;

/// Declared type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrType {
    Bool,
    Int,
    Float,
    String,
    /// A string restricted to the listed constants.
    Enum(Vec<String>),
}

impl AttrType {
    pub fn enumeration<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttrType::Enum(variants.into_iter().map(Into::into).collect())
    }

    pub fn describe(&self) -> String {
        match self {
            AttrType::Bool => "bool".to_string(),
            AttrType::Int => "int".to_string(),
            AttrType::Float => "float".to_string(),
            AttrType::String => "string".to_string(),
            AttrType::Enum(variants) => format!("one of {}", variants.join("|")),
        }
    }

    /// Check `value` against this type, widening an int into a float attribute.
    pub fn coerce(&self, name: &str, value: AttrValue) -> Result<AttrValue, EditError> {
        match (self, value) {
            (AttrType::Bool, v @ AttrValue::Bool(_))
            | (AttrType::Int, v @ AttrValue::Int(_))
            | (AttrType::Float, v @ AttrValue::Float(_))
            | (AttrType::String, v @ AttrValue::String(_)) => Ok(v),
            (AttrType::Float, AttrValue::Int(i)) => Ok(AttrValue::Float(i as f64)),
            (AttrType::Enum(variants), AttrValue::String(s)) if variants.contains(&s) => {
                Ok(AttrValue::String(s))
            }
            (_, other) => {
                let found = match other {
                    AttrValue::String(s) => format!("\"{s}\""),
                    other => other.type_name().to_string(),
                };
                Err(EditError::TypeMismatch {
                    name: name.to_string(),
                    expected: self.describe(),
                    found,
                })
            }
        }
    }
}

/// Value of one attribute. Enum constants are stored as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttrValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Bool(_) => "bool",
            AttrValue::Int(_) => "int",
            AttrValue::Float(_) => "float",
            AttrValue::String(_) => "string",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttrValue::Float(f) => Some(*f),
            AttrValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}

/// Schema entry of one attribute of a task kind.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    pub name: String,
    pub ty: AttrType,
    pub required: bool,
    /// Value a freshly added task starts with.
    pub default: Option<AttrValue>,
    pub comment: Option<String>,
}

impl AttributeSpec {
    pub fn new(name: impl Into<String>, ty: AttrType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
            default: None,
            comment: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<AttrValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}
