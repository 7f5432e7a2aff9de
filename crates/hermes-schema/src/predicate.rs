//! Predicate capability table.
//!
//! Predicates are looked up by name in a table built before validation
//! starts. The built-in table mirrors the usual value predicates
//! (`between?`, `positive?`, `include?`, ...); schemas can register their own.
//! `within` is handled directly: it tests membership in its argument set.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use hermes_core::Value;
use regex::Regex;

use crate::field::PredicateCall;

/// Name of the membership predicate.
pub const WITHIN: &str = "within";

/// A predicate over a coerced value and its declared arguments.
pub type PredicateFn = Arc<dyn Fn(&Value, &[Value]) -> bool + Send + Sync>;

/// A name → predicate table.
#[derive(Clone, Default)]
pub struct PredicateTable {
    entries: HashMap<String, PredicateFn>,
}

impl fmt::Debug for PredicateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("PredicateTable").field("names", &names).finish()
    }
}

impl PredicateTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a predicate.
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Value, &[Value]) -> bool + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Arc::new(predicate));
    }

    /// Returns the predicate registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PredicateFn> {
        self.entries.get(name)
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Copies every entry of `other` into this table.
    pub fn extend_from(&mut self, other: &Self) {
        for (name, predicate) in &other.entries {
            self.entries.insert(name.clone(), Arc::clone(predicate));
        }
    }

    /// Returns the shared table of built-in predicates.
    pub fn builtin() -> &'static Self {
        static BUILTIN: OnceLock<PredicateTable> = OnceLock::new();
        BUILTIN.get_or_init(build_builtin)
    }

    /// Returns `true` if `name` can be resolved against this table or the builtins.
    #[must_use]
    pub fn resolves(&self, name: &str) -> bool {
        name == WITHIN || self.contains(name) || Self::builtin().contains(name)
    }

    /// Evaluates a predicate call, preferring entries in this table over builtins.
    ///
    /// Returns `None` if the predicate is unknown.
    #[must_use]
    pub fn evaluate(&self, call: &PredicateCall, value: &Value) -> Option<bool> {
        if call.name == WITHIN {
            return Some(within(value, &call.args));
        }
        let predicate = self
            .get(&call.name)
            .or_else(|| Self::builtin().get(&call.name))?;
        Some(predicate(value, &call.args))
    }
}

fn within(value: &Value, args: &[Value]) -> bool {
    let set = match args {
        [Value::Array(items)] => items.as_slice(),
        other => other,
    };
    set.iter().any(|candidate| loosely_equal(value, candidate))
}

/// Compares two values of compatible kinds.
#[must_use]
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
        (Value::Boolean(x), Value::Boolean(y)) => Some(x.cmp(y)),
        _ => {
            if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
                return x.partial_cmp(&y);
            }
            match (a.as_str(), b.as_str()) {
                (Some(x), Some(y)) => Some(x.cmp(y)),
                _ => None,
            }
        }
    }
}

/// Equality that treats symbols, strings and numerics by their rendered value.
#[must_use]
pub fn loosely_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Array(_) | Value::Hash(_), _) | (_, Value::Array(_) | Value::Hash(_)) => false,
        _ => compare(a, b) == Some(Ordering::Equal) || a.to_string() == b.to_string(),
    }
}

fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Symbol(s) => Some(s.as_str().chars().count()),
        Value::Array(items) => Some(items.len()),
        Value::Hash(map) => Some(map.len()),
        _ => None,
    }
}

fn compare_with(value: &Value, args: &[Value], accept: fn(Ordering) -> bool) -> bool {
    match args {
        [other] => compare(value, other).is_some_and(accept),
        _ => false,
    }
}

fn build_builtin() -> PredicateTable {
    let mut table = PredicateTable::new();

    table.register("between?", |value, args| match args {
        [min, max] => {
            compare(value, min).is_some_and(Ordering::is_ge)
                && compare(value, max).is_some_and(Ordering::is_le)
        }
        _ => false,
    });
    table.register(">", |value, args| compare_with(value, args, Ordering::is_gt));
    table.register(">=", |value, args| compare_with(value, args, Ordering::is_ge));
    table.register("<", |value, args| compare_with(value, args, Ordering::is_lt));
    table.register("<=", |value, args| compare_with(value, args, Ordering::is_le));

    table.register("positive?", |value, _| value.as_f64().is_some_and(|x| x > 0.0));
    table.register("negative?", |value, _| value.as_f64().is_some_and(|x| x < 0.0));
    table.register("zero?", |value, _| value.as_f64().is_some_and(|x| x == 0.0));
    table.register("nonzero?", |value, _| value.as_f64().is_some_and(|x| x != 0.0));
    table.register("even?", |value, _| value.as_i64().is_some_and(|i| i % 2 == 0));
    table.register("odd?", |value, _| value.as_i64().is_some_and(|i| i % 2 != 0));

    table.register("empty?", |value, _| length(value) == Some(0));
    table.register("any?", |value, _| length(value).is_some_and(|n| n > 0));

    table.register("include?", |value, args| match (value, args) {
        (Value::Array(items), [needle]) => items.iter().any(|item| loosely_equal(item, needle)),
        (Value::Hash(map), [key]) => key.as_str().is_some_and(|k| map.contains_key(k)),
        (_, [needle]) => match (value.as_str(), needle.as_str()) {
            (Some(haystack), Some(needle)) => haystack.contains(needle),
            _ => false,
        },
        _ => false,
    });
    table.register("start_with?", |value, args| {
        value.as_str().is_some_and(|s| {
            args.iter()
                .filter_map(Value::as_str)
                .any(|prefix| s.starts_with(prefix))
        })
    });
    table.register("end_with?", |value, args| {
        value.as_str().is_some_and(|s| {
            args.iter()
                .filter_map(Value::as_str)
                .any(|suffix| s.ends_with(suffix))
        })
    });
    table.register("match?", |value, args| match (value.as_str(), args) {
        (Some(s), [pattern]) => pattern
            .as_str()
            .and_then(|p| Regex::new(p).ok())
            .is_some_and(|re| re.is_match(s)),
        _ => false,
    });

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::Symbol;

    fn call(name: &str, args: Vec<Value>) -> PredicateCall {
        PredicateCall {
            name: name.to_string(),
            args,
        }
    }

    #[test]
    fn test_between() {
        let table = PredicateTable::new();
        let between = call("between?", vec![Value::from(0), Value::from(120)]);
        assert_eq!(table.evaluate(&between, &Value::from(30)), Some(true));
        assert_eq!(table.evaluate(&between, &Value::from(120)), Some(true));
        assert_eq!(table.evaluate(&between, &Value::from(200)), Some(false));
        assert_eq!(table.evaluate(&between, &Value::from(0.5)), Some(true));
    }

    #[test]
    fn test_within_accepts_symbols_against_strings() {
        let table = PredicateTable::new();
        let within = call(WITHIN, vec![Value::from(vec!["open", "closed"])]);
        assert_eq!(
            table.evaluate(&within, &Value::Symbol(Symbol::new("open"))),
            Some(true)
        );
        assert_eq!(table.evaluate(&within, &Value::from("pending")), Some(false));
    }

    #[test]
    fn test_within_with_bare_args() {
        let table = PredicateTable::new();
        let within = call(WITHIN, vec![Value::from(1), Value::from(2)]);
        assert_eq!(table.evaluate(&within, &Value::from(2)), Some(true));
        assert_eq!(table.evaluate(&within, &Value::from(3)), Some(false));
    }

    #[test]
    fn test_unknown_predicate() {
        let table = PredicateTable::new();
        assert_eq!(table.evaluate(&call("prime?", vec![]), &Value::from(7)), None);
        assert!(!table.resolves("prime?"));
    }

    #[test]
    fn test_custom_predicate_overrides_builtin() {
        let mut table = PredicateTable::new();
        table.register("positive?", |_, _| false);
        table.register("prime?", |value, _| {
            value
                .as_i64()
                .is_some_and(|n| n > 1 && (2..n).all(|d| n % d != 0))
        });

        assert_eq!(table.evaluate(&call("positive?", vec![]), &Value::from(5)), Some(false));
        assert_eq!(table.evaluate(&call("prime?", vec![]), &Value::from(7)), Some(true));
        assert!(table.resolves("prime?"));
    }

    #[test]
    fn test_string_predicates() {
        let table = PredicateTable::new();
        let value = Value::from("hermes-client");
        assert_eq!(
            table.evaluate(&call("start_with?", vec![Value::from("herm")]), &value),
            Some(true)
        );
        assert_eq!(
            table.evaluate(&call("include?", vec![Value::from("client")]), &value),
            Some(true)
        );
        assert_eq!(
            table.evaluate(&call("match?", vec![Value::from("^[a-z-]+$")]), &value),
            Some(true)
        );
        assert_eq!(table.evaluate(&call("empty?", vec![]), &value), Some(false));
    }

    #[test]
    fn test_predicates_on_wrong_kind_fail() {
        let table = PredicateTable::new();
        assert_eq!(table.evaluate(&call("even?", vec![]), &Value::from("2")), Some(false));
        assert_eq!(
            table.evaluate(&call("between?", vec![Value::from(1)]), &Value::from(1)),
            Some(false)
        );
    }
}
