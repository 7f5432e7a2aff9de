//! Field descriptors.

use std::fmt;
use std::sync::Arc;

use hermes_core::Value;
use regex::Regex;

use crate::schema::Schema;

/// The declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Text, passed through unchanged.
    String,
    /// Signed 64-bit integer.
    Integer,
    /// 64-bit float.
    Float,
    /// Interned name.
    Symbol,
    /// `true` / `false` (case-insensitive on the wire).
    Boolean,
    /// Timestamp (RFC 3339 or a common date/time layout).
    DateTime,
    /// Sequence of elements of one [`FieldType`].
    Array,
    /// Nested map, optionally validated by a nested [`Schema`].
    Hash,
}

impl FieldType {
    /// Returns the type name with its article, for error messages.
    #[must_use]
    pub const fn described(&self) -> &'static str {
        match self {
            Self::String => "a String",
            Self::Integer => "an Integer",
            Self::Float => "a Float",
            Self::Symbol => "a Symbol",
            Self::Boolean => "a Boolean",
            Self::DateTime => "a DateTime",
            Self::Array => "an Array",
            Self::Hash => "a Hash",
        }
    }

    /// Returns `true` for container types that may carry a nested schema.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self, Self::Array | Self::Hash)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "String",
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Symbol => "Symbol",
            Self::Boolean => "Boolean",
            Self::DateTime => "DateTime",
            Self::Array => "Array",
            Self::Hash => "Hash",
        };
        f.write_str(name)
    }
}

/// How a field selects the parameter keys it applies to.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Exactly one key.
    Name(String),
    /// Every key matching the pattern.
    Pattern(Regex),
}

impl Matcher {
    /// Returns `true` if `key` is covered by this matcher.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Name(name) => name == key,
            Self::Pattern(pattern) => pattern.is_match(key),
        }
    }

    /// Returns the literal name, if this is a name matcher.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Pattern(_) => None,
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Pattern(pattern) => write!(f, "/{}/", pattern.as_str()),
        }
    }
}

/// A named predicate applied to a coerced value.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateCall {
    /// Predicate name, e.g. `between?`.
    pub name: String,
    /// Declared arguments.
    pub args: Vec<Value>,
}

impl fmt::Display for PredicateCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

/// A field declaration.
///
/// # Example
///
/// ```
/// use hermes_schema::{Field, FieldType};
///
/// let age = Field::integer("age").required().check("between?", [0, 120]);
/// assert!(age.is_required());
/// assert_eq!(age.field_type(), FieldType::Integer);
/// ```
#[derive(Debug, Clone)]
pub struct Field {
    pub(crate) matcher: Matcher,
    pub(crate) ty: FieldType,
    pub(crate) required: bool,
    pub(crate) default: Option<Value>,
    pub(crate) strict: Option<bool>,
    pub(crate) element: FieldType,
    pub(crate) nested: Option<Arc<Schema>>,
    pub(crate) predicates: Vec<PredicateCall>,
}

impl Field {
    /// Declares a field with an explicit matcher and type.
    #[must_use]
    pub fn new(matcher: Matcher, ty: FieldType) -> Self {
        Self {
            matcher,
            ty,
            required: false,
            default: None,
            strict: None,
            element: FieldType::String,
            nested: None,
            predicates: Vec::new(),
        }
    }

    /// Declares a literal-named field.
    #[must_use]
    pub fn named(name: impl Into<String>, ty: FieldType) -> Self {
        Self::new(Matcher::Name(name.into()), ty)
    }

    /// Declares a dynamically named field covering every key matching `pattern`.
    #[must_use]
    pub fn matching(pattern: Regex, ty: FieldType) -> Self {
        Self::new(Matcher::Pattern(pattern), ty)
    }

    /// Declares a `String` field.
    #[must_use]
    pub fn string(name: impl Into<String>) -> Self {
        Self::named(name, FieldType::String)
    }

    /// Declares an `Integer` field.
    #[must_use]
    pub fn integer(name: impl Into<String>) -> Self {
        Self::named(name, FieldType::Integer)
    }

    /// Declares a `Float` field.
    #[must_use]
    pub fn float(name: impl Into<String>) -> Self {
        Self::named(name, FieldType::Float)
    }

    /// Declares a `Symbol` field.
    #[must_use]
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::named(name, FieldType::Symbol)
    }

    /// Declares a `Boolean` field.
    #[must_use]
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::named(name, FieldType::Boolean)
    }

    /// Declares a `DateTime` field.
    #[must_use]
    pub fn datetime(name: impl Into<String>) -> Self {
        Self::named(name, FieldType::DateTime)
    }

    /// Declares an `Array` field (elements default to `String`).
    #[must_use]
    pub fn array(name: impl Into<String>) -> Self {
        Self::named(name, FieldType::Array)
    }

    /// Declares a `Hash` field.
    #[must_use]
    pub fn hash(name: impl Into<String>) -> Self {
        Self::named(name, FieldType::Hash)
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets a default applied when the key is absent.
    ///
    /// A defaulted field is never reported as missing.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Overrides the strictness inherited by a nested schema.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    /// Sets the element type of an `Array` field.
    #[must_use]
    pub fn of(mut self, element: FieldType) -> Self {
        self.element = element;
        self
    }

    /// Attaches the nested schema for a `Hash` field or an `Array` of `Hash`.
    #[must_use]
    pub fn schema(mut self, schema: Schema) -> Self {
        self.nested = Some(Arc::new(schema));
        self
    }

    /// Appends a predicate check run after coercion.
    #[must_use]
    pub fn check<I, V>(mut self, name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.predicates.push(PredicateCall {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Restricts the value to one of `allowed`.
    #[must_use]
    pub fn within<I, V>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let set: Vec<Value> = allowed.into_iter().map(Into::into).collect();
        self.predicates.push(PredicateCall {
            name: "within".to_string(),
            args: vec![Value::Array(set)],
        });
        self
    }

    /// Returns the matcher.
    #[must_use]
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Returns the declared type.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.ty
    }

    /// Returns `true` if the field is required.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Returns the default value, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Returns the declared predicates in order.
    #[must_use]
    pub fn predicates(&self) -> &[PredicateCall] {
        &self.predicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_call_display() {
        let call = PredicateCall {
            name: "between?".to_string(),
            args: vec![Value::from(0), Value::from(120)],
        };
        assert_eq!(call.to_string(), "between?(0,120)");
    }

    #[test]
    fn test_matcher() {
        let name = Matcher::Name("age".to_string());
        assert!(name.matches("age"));
        assert!(!name.matches("ages"));

        let pattern = Matcher::Pattern(Regex::new("^meta_\\w+$").unwrap());
        assert!(pattern.matches("meta_color"));
        assert!(!pattern.matches("color"));
        assert_eq!(pattern.name(), None);
        assert_eq!(pattern.to_string(), "/^meta_\\w+$/");
    }

    #[test]
    fn test_within_wraps_set() {
        let field = Field::symbol("status").within(["open", "closed"]);
        assert_eq!(field.predicates()[0].name, "within");
        assert_eq!(
            field.predicates()[0].args,
            vec![Value::from(vec!["open", "closed"])]
        );
    }

    #[test]
    fn test_defaults_to_string_elements() {
        let field = Field::array("tags");
        assert_eq!(field.element, FieldType::String);
        assert_eq!(field.of(FieldType::Integer).element, FieldType::Integer);
    }
}
