//! Schema building and validation.
//!
//! A [`SchemaBuilder`] collects field declarations (and other schemas merged
//! with [`SchemaBuilder::use_schema`]) and produces an immutable [`Schema`].
//! Since building consumes the builder, a schema can no longer change once
//! validation is possible.

use hermes_core::{FieldErrors, HermesError, HermesResult, Params, Value};

use crate::coerce::{coerce_scalar, is_null};
use crate::error::SchemaError;
use crate::field::{Field, FieldType, Matcher};
use crate::predicate::PredicateTable;

/// A compiled, immutable parameter schema.
///
/// # Example
///
/// ```
/// use hermes_core::{params, Value};
/// use hermes_schema::{Field, Schema};
///
/// let schema = Schema::builder()
///     .field(Field::integer("age").required().check("between?", [0, 120]))
///     .field(Field::boolean("active").default(true))
///     .build()
///     .unwrap();
///
/// let typed = schema.validate(&params! { "age" => "42" }).unwrap();
/// assert_eq!(typed["age"], Value::from(42));
/// assert_eq!(typed["active"], Value::Boolean(true));
///
/// let err = schema.validate(&params! { "age" => "200" }).unwrap_err();
/// assert_eq!(err.to_string(), "age failed between?(0,120) validation");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<Field>,
    strict: Option<bool>,
    predicates: PredicateTable,
}

impl Schema {
    /// Starts a new schema.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Returns a schema with no fields that accepts any parameters.
    #[must_use]
    pub fn open() -> Self {
        Self::default()
    }

    /// Returns the declared fields in order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns `true` if undeclared keys are rejected.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict.unwrap_or(false)
    }

    /// Validates and coerces `params`.
    ///
    /// Returns the typed map: declared fields coerced, defaults applied, and
    /// (for non-strict schemas) undeclared keys passed through unchanged.
    pub fn validate(&self, params: &Params) -> HermesResult<Params> {
        self.validate_at(params, None, self.is_strict(), &[])
    }

    /// Validates `params`, accepting the keys in `allowed` even when strict.
    ///
    /// Allowed keys that are not declared pass through unchanged.
    pub fn validate_allowing(&self, params: &Params, allowed: &[String]) -> HermesResult<Params> {
        self.validate_at(params, None, self.is_strict(), allowed)
    }

    fn covers(&self, key: &str) -> bool {
        self.fields.iter().any(|f| f.matcher.matches(key))
    }

    fn named(&self, key: &str) -> bool {
        self.fields.iter().any(|f| f.matcher.name() == Some(key))
    }

    fn validate_at(
        &self,
        params: &Params,
        prefix: Option<&str>,
        strict: bool,
        allowed: &[String],
    ) -> HermesResult<Params> {
        let missing: Vec<String> = self
            .fields
            .iter()
            .filter(|f| f.required && f.default.is_none())
            .filter_map(|f| f.matcher.name())
            .filter(|name| !params.contains_key(*name))
            .map(|name| field_path(prefix, name))
            .collect();

        if !missing.is_empty() {
            let mut errors = FieldErrors::new();
            for name in &missing {
                errors.add(name.clone(), "is required");
            }
            tracing::debug!(missing = ?missing, "missing required parameters");
            return Err(HermesError::validation_with_fields(
                format!("missing required parameters: {}", missing.join(", ")),
                errors,
            ));
        }

        if strict {
            let unexpected: Vec<String> = params
                .keys()
                .filter(|key| !allowed.contains(key) && !self.covers(key))
                .map(|key| field_path(prefix, key))
                .collect();

            if !unexpected.is_empty() {
                let mut errors = FieldErrors::new();
                for name in &unexpected {
                    errors.add(name.clone(), "is not allowed");
                }
                tracing::debug!(unexpected = ?unexpected, "unexpected parameters");
                return Err(HermesError::validation_with_fields(
                    format!("unexpected parameters: {}", unexpected.join(", ")),
                    errors,
                ));
            }
        }

        let mut typed = Params::with_capacity(params.len());

        for field in &self.fields {
            match &field.matcher {
                Matcher::Name(name) => {
                    if let Some(raw) = params.get(name) {
                        let path = field_path(prefix, name);
                        let value = self.coerce_field(field, raw, &path, strict)?;
                        typed.insert(name.clone(), value);
                    } else if let Some(default) = &field.default {
                        typed.insert(name.clone(), default.clone());
                    }
                }
                Matcher::Pattern(_) => {
                    for (key, raw) in params {
                        if typed.contains_key(key) || self.named(key) || !field.matcher.matches(key)
                        {
                            continue;
                        }
                        let path = field_path(prefix, key);
                        let value = self.coerce_field(field, raw, &path, strict)?;
                        typed.insert(key.clone(), value);
                    }
                }
            }
        }

        for (key, raw) in params {
            if !typed.contains_key(key) && !self.covers(key) {
                typed.insert(key.clone(), raw.clone());
            }
        }

        Ok(typed)
    }

    fn coerce_field(
        &self,
        field: &Field,
        raw: &Value,
        path: &str,
        strict: bool,
    ) -> HermesResult<Value> {
        if is_null(raw) {
            if field.required {
                return Err(HermesError::validation(format!("{path} cannot be null")));
            }
            return Ok(Value::Null);
        }

        let value = match field.ty {
            FieldType::Array => {
                let items = raw
                    .as_array()
                    .ok_or_else(|| type_error(path, FieldType::Array, raw.type_name()))?;
                let mut coerced = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{index}]");
                    coerced.push(Self::coerce_element(field, item, &item_path, strict)?);
                }
                Value::Array(coerced)
            }
            FieldType::Hash => {
                let map = raw
                    .as_hash()
                    .ok_or_else(|| type_error(path, FieldType::Hash, raw.type_name()))?;
                Self::coerce_nested(field, map, path, strict)?
            }
            scalar => coerce_scalar(raw, scalar).map_err(|reason| type_error(path, scalar, &reason))?,
        };

        self.check_predicates(field, &value, path)?;
        Ok(value)
    }

    fn coerce_element(field: &Field, item: &Value, path: &str, strict: bool) -> HermesResult<Value> {
        match field.element {
            FieldType::Hash => {
                if is_null(item) {
                    return Ok(Value::Null);
                }
                let map = item
                    .as_hash()
                    .ok_or_else(|| type_error(path, FieldType::Hash, item.type_name()))?;
                Self::coerce_nested(field, map, path, strict)
            }
            element => coerce_scalar(item, element).map_err(|reason| type_error(path, element, &reason)),
        }
    }

    fn coerce_nested(field: &Field, map: &Params, path: &str, strict: bool) -> HermesResult<Value> {
        match &field.nested {
            Some(nested) => {
                let nested_strict = field.strict.or(nested.strict).unwrap_or(strict);
                nested
                    .validate_at(map, Some(path), nested_strict, &[])
                    .map(Value::Hash)
            }
            None => Ok(Value::Hash(map.clone())),
        }
    }

    fn check_predicates(&self, field: &Field, value: &Value, path: &str) -> HermesResult<()> {
        if value.is_null() {
            return Ok(());
        }
        for call in &field.predicates {
            if !self.predicates.evaluate(call, value).unwrap_or(false) {
                tracing::debug!(field = %path, predicate = %call, "predicate failed");
                return Err(HermesError::validation(format!(
                    "{path} failed {call} validation"
                )));
            }
        }
        Ok(())
    }
}

fn field_path(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(parent) => format!("{parent}[{key}]"),
        None => key.to_string(),
    }
}

fn type_error(path: &str, expected: FieldType, reason: &str) -> HermesError {
    let mut errors = FieldErrors::new();
    errors.add(path, reason);
    HermesError::validation_with_fields(format!("{path} must be {}", expected.described()), errors)
}

/// Collects field declarations into a [`Schema`].
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    fields: Vec<Field>,
    strict: Option<bool>,
    predicates: PredicateTable,
}

impl SchemaBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects undeclared keys when `true`.
    ///
    /// When left unset on a nested schema, strictness is inherited from the
    /// enclosing schema.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    /// Declares a field. A later declaration of the same name replaces the
    /// earlier one.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        if let Some(name) = field.matcher.name() {
            if let Some(existing) = self
                .fields
                .iter_mut()
                .find(|f| f.matcher.name() == Some(name))
            {
                *existing = field;
                return self;
            }
        }
        self.fields.push(field);
        self
    }

    /// Declares several fields.
    #[must_use]
    pub fn fields(self, fields: impl IntoIterator<Item = Field>) -> Self {
        fields.into_iter().fold(self, Self::field)
    }

    /// Merges the fields, defaults, required set and custom predicates of
    /// another schema into this one.
    #[must_use]
    pub fn use_schema(mut self, other: &Schema) -> Self {
        self.predicates.extend_from(&other.predicates);
        other
            .fields
            .iter()
            .cloned()
            .fold(self, Self::field)
    }

    /// Registers a custom predicate usable by this schema's fields.
    #[must_use]
    pub fn predicate<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> bool + Send + Sync + 'static,
    {
        self.predicates.register(name, predicate);
        self
    }

    /// Checks the declarations and produces the immutable schema.
    pub fn build(mut self) -> Result<Schema, SchemaError> {
        for field in &mut self.fields {
            let label = field.matcher.to_string();

            if matches!(field.matcher, Matcher::Pattern(_))
                && (field.required || field.default.is_some())
            {
                return Err(SchemaError::PatternRequirement { field: label });
            }

            let nested_allowed = field.ty == FieldType::Hash
                || (field.ty == FieldType::Array && field.element == FieldType::Hash);
            if field.nested.is_some() && !nested_allowed {
                return Err(SchemaError::NestedOnScalar {
                    field: label,
                    ty: field.ty.to_string(),
                });
            }

            for call in &field.predicates {
                if !self.predicates.resolves(&call.name) {
                    return Err(SchemaError::UnknownPredicate {
                        field: label,
                        predicate: call.name.clone(),
                    });
                }
            }

            if let Some(default) = &field.default {
                let coerced = coerce_scalar(default, field.ty).map_err(|reason| {
                    SchemaError::InvalidDefault {
                        field: label.clone(),
                        expected: field.ty.described(),
                        reason,
                    }
                })?;
                field.default = Some(coerced);
            }
        }

        Ok(Schema {
            fields: self.fields,
            strict: self.strict,
            predicates: self.predicates,
        })
    }
}
