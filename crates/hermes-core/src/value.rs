//! Dynamic parameter values.
//!
//! Parameters arrive on the wire as strings, arrays and hashes only. After
//! validation they carry their declared types. [`Value`] models both shapes
//! so that already-validated maps can be validated again unchanged.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered map of parameter name to value.
pub type Params = IndexMap<String, Value>;

/// An interned, immutable name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(Arc<str>);

impl Symbol {
    /// Creates a symbol from a string.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Returns the symbol name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A wire or typed parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value (the wire literal `"null"`).
    Null,
    /// A string. All wire scalars start out as strings.
    String(String),
    /// A signed integer.
    Integer(i64),
    /// A floating point number.
    Float(f64),
    /// An interned name.
    Symbol(Symbol),
    /// A boolean.
    Boolean(bool),
    /// A timestamp with offset.
    DateTime(DateTime<FixedOffset>),
    /// A sequence of values.
    Array(Vec<Value>),
    /// A nested map.
    Hash(Params),
}

impl Value {
    /// Returns the type name used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::String(_) => "String",
            Self::Integer(_) => "Integer",
            Self::Float(_) => "Float",
            Self::Symbol(_) => "Symbol",
            Self::Boolean(_) => "Boolean",
            Self::DateTime(_) => "DateTime",
            Self::Array(_) => "Array",
            Self::Hash(_) => "Hash",
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the string slice for string values.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Symbol(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the integer for integer values.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns a float for integer or float values.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the boolean for boolean values.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the elements of an array value.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the entries of a hash value.
    #[must_use]
    pub fn as_hash(&self) -> Option<&Params> {
        match self {
            Self::Hash(map) => Some(map),
            _ => None,
        }
    }

    /// Converts this value into JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Renders this value back into its wire form (strings, arrays, hashes).
    #[must_use]
    pub fn to_wire(&self) -> Self {
        match self {
            Self::Null => Self::String("null".to_string()),
            Self::String(_) => self.clone(),
            Self::Array(items) => Self::Array(items.iter().map(Self::to_wire).collect()),
            Self::Hash(map) => Self::Hash(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_wire()))
                    .collect(),
            ),
            other => Self::String(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::String(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Symbol(s) => write!(f, "{s}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::DateTime(dt) => f.write_str(&dt.to_rfc3339()),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Hash(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{k}:{v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Symbol> for Value {
    fn from(s: Symbol) -> Self {
        Self::Symbol(s)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self::DateTime(dt)
    }
}

impl From<Params> for Value {
    fn from(map: Params) -> Self {
        Self::Hash(map)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

/// Builds a [`Params`] map from `key => value` pairs.
///
/// # Example
///
/// ```
/// use hermes_core::{params, Value};
///
/// let p = params! { "name" => "widget", "tags" => vec!["a", "b"] };
/// assert_eq!(p["name"], Value::from("widget"));
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::Params::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::Params::new();
        $(map.insert(::std::string::String::from($key), $crate::Value::from($value));)+
        map
    }};
}
