//! Nested form encoding.
//!
//! Query strings and form bodies carry nested parameters using bracket
//! notation:
//!
//! ```text
//! filter[status]=open&ids[]=1&ids[]=2&items[][sku]=a&items[][sku]=b
//! ```
//!
//! [`encode`] renders a [`Params`] map in that form and [`decode`] parses it
//! back into wire values (strings, arrays and hashes).

use crate::value::{Params, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Push,
}

/// Encodes parameters as an `application/x-www-form-urlencoded` string.
///
/// Typed values are rendered in their wire form first.
///
/// # Example
///
/// ```
/// use hermes_core::{params, wire};
///
/// let p = params! { "ids" => vec!["1", "2"] };
/// assert_eq!(wire::encode(&p), "ids%5B%5D=1&ids%5B%5D=2");
/// ```
#[must_use]
pub fn encode(params: &Params) -> String {
    let mut pairs = Vec::new();
    for (key, value) in params {
        encode_value(key, &value.to_wire(), &mut pairs);
    }
    pairs.join("&")
}

fn encode_value(prefix: &str, value: &Value, pairs: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            let nested = format!("{prefix}[]");
            for item in items {
                encode_value(&nested, item, pairs);
            }
        }
        Value::Hash(map) => {
            for (key, item) in map {
                encode_value(&format!("{prefix}[{key}]"), item, pairs);
            }
        }
        scalar => pairs.push(format!(
            "{}={}",
            urlencoding::encode(prefix),
            urlencoding::encode(&scalar.to_string())
        )),
    }
}

/// Decodes an `application/x-www-form-urlencoded` string into wire values.
///
/// Malformed percent escapes are kept verbatim; empty pairs are skipped.
///
/// # Example
///
/// ```
/// use hermes_core::{wire, Value};
///
/// let p = wire::decode("filter[status]=open&ids[]=1&ids[]=2");
/// assert_eq!(p["filter"].as_hash().unwrap()["status"], Value::from("open"));
/// assert_eq!(p["ids"], Value::from(vec!["1", "2"]));
/// ```
#[must_use]
pub fn decode(input: &str) -> Params {
    let mut params = Params::new();

    for pair in input.split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = unescape(raw_key);
        let value = unescape(raw_value);

        let (base, segments) = parse_key(&key);
        if base.is_empty() {
            continue;
        }
        insert_into_map(&mut params, base, &segments, value);
    }

    params
}

fn unescape(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or(spaced)
}

fn parse_key(key: &str) -> (&str, Vec<Segment>) {
    let Some(open) = key.find('[') else {
        return (key, Vec::new());
    };

    let base = &key[..open];
    let mut segments = Vec::new();
    let mut rest = &key[open..];

    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            break;
        };
        let name = &stripped[..close];
        segments.push(if name.is_empty() {
            Segment::Push
        } else {
            Segment::Key(name.to_string())
        });
        rest = &stripped[close + 1..];
    }

    (base, segments)
}

fn insert_into_map(map: &mut Params, key: &str, rest: &[Segment], value: String) {
    match rest.first() {
        None => {
            map.insert(key.to_string(), Value::String(value));
        }
        Some(Segment::Key(_)) => {
            let entry = map
                .entry(key.to_string())
                .or_insert_with(|| Value::Hash(Params::new()));
            if !matches!(entry, Value::Hash(_)) {
                *entry = Value::Hash(Params::new());
            }
            if let (Value::Hash(inner), Some(Segment::Key(next))) = (entry, rest.first()) {
                insert_into_map(inner, next, &rest[1..], value);
            }
        }
        Some(Segment::Push) => {
            let entry = map
                .entry(key.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if !matches!(entry, Value::Array(_)) {
                *entry = Value::Array(Vec::new());
            }
            if let Value::Array(items) = entry {
                push_into_array(items, &rest[1..], value);
            }
        }
    }
}

fn push_into_array(items: &mut Vec<Value>, rest: &[Segment], value: String) {
    match rest.first() {
        None => items.push(Value::String(value)),
        Some(Segment::Key(name)) => {
            // `items[][a]=1&items[][b]=2` fills one hash until a key repeats.
            let reuse = matches!(
                items.last(),
                Some(Value::Hash(last)) if !last.contains_key(name.as_str()) || rest.len() > 1
            );
            if !reuse {
                items.push(Value::Hash(Params::new()));
            }
            if let Some(Value::Hash(last)) = items.last_mut() {
                insert_into_map(last, name, &rest[1..], value);
            }
        }
        Some(Segment::Push) => {
            let mut nested = Vec::new();
            push_into_array(&mut nested, &rest[1..], value);
            items.push(Value::Array(nested));
        }
    }
}
