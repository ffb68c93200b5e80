//! Correlation descriptors and values

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A scalar a correlation property may take.
///
/// Equality lookups compare a stored field against one of these. Values
/// follow JSON semantics: `Bool` matches JSON `true`/`false`, `Integer` and
/// `Real` match JSON numbers, `Text` matches JSON strings (UUIDs are stored
/// as their hyphenated string form). `Null` matches a JSON `null` or an
/// absent field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrelationValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl fmt::Display for CorrelationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationValue::Null => write!(f, "null"),
            CorrelationValue::Bool(b) => write!(f, "{}", b),
            CorrelationValue::Integer(i) => write!(f, "{}", i),
            CorrelationValue::Real(r) => write!(f, "{}", r),
            CorrelationValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for CorrelationValue {
    fn from(value: bool) -> Self {
        CorrelationValue::Bool(value)
    }
}

impl From<i32> for CorrelationValue {
    fn from(value: i32) -> Self {
        CorrelationValue::Integer(i64::from(value))
    }
}

impl From<u32> for CorrelationValue {
    fn from(value: u32) -> Self {
        CorrelationValue::Integer(i64::from(value))
    }
}

impl From<i64> for CorrelationValue {
    fn from(value: i64) -> Self {
        CorrelationValue::Integer(value)
    }
}

impl From<f64> for CorrelationValue {
    fn from(value: f64) -> Self {
        CorrelationValue::Real(value)
    }
}

impl From<&str> for CorrelationValue {
    fn from(value: &str) -> Self {
        CorrelationValue::Text(value.to_string())
    }
}

impl From<String> for CorrelationValue {
    fn from(value: String) -> Self {
        CorrelationValue::Text(value)
    }
}

impl From<&String> for CorrelationValue {
    fn from(value: &String) -> Self {
        CorrelationValue::Text(value.clone())
    }
}

impl From<Uuid> for CorrelationValue {
    fn from(value: Uuid) -> Self {
        CorrelationValue::Text(value.to_string())
    }
}

impl<T: Into<CorrelationValue>> From<Option<T>> for CorrelationValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CorrelationValue::Null, Into::into)
    }
}

/// Describes one correlation property of saga type `T`.
///
/// `property_name` is the dot-separated path of the field inside the
/// serialized payload; `accessor` reads the same field from a typed value.
/// The two must agree: the accessor's value is what gets compared against
/// the stored field at `property_name`.
pub struct CorrelationProperty<T> {
    property_name: &'static str,
    accessor: fn(&T) -> CorrelationValue,
}

impl<T> CorrelationProperty<T> {
    pub const fn new(property_name: &'static str, accessor: fn(&T) -> CorrelationValue) -> Self {
        Self {
            property_name,
            accessor,
        }
    }

    /// Read this property's value from `data`
    pub fn resolve(&self, data: &T) -> ResolvedCorrelation {
        ResolvedCorrelation {
            property_name: self.property_name.to_string(),
            value: (self.accessor)(data),
        }
    }
}

// Manual impls: a derive would demand `T: Clone`/`T: Debug`.
impl<T> Clone for CorrelationProperty<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for CorrelationProperty<T> {}

impl<T> fmt::Debug for CorrelationProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelationProperty")
            .field("property_name", &self.property_name)
            .finish()
    }
}

/// A correlation property already evaluated against one record
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCorrelation {
    pub property_name: String,
    pub value: CorrelationValue,
}

impl ResolvedCorrelation {
    pub fn new(property_name: impl Into<String>, value: impl Into<CorrelationValue>) -> Self {
        Self {
            property_name: property_name.into(),
            value: value.into(),
        }
    }
}
