//! Versioned path resolution.
//!
//! A request path has the shape `/v<digits>/<name>[/<id>[/<name>[/<id>]]...]`
//! and is shorter than 256 characters. Segments after the version alternate
//! between resource names and identifiers.

use std::fmt;
use std::sync::OnceLock;

use hermes_core::{HermesError, HermesResult};
use regex::Regex;
use smallvec::SmallVec;

/// Paths of this many characters or more are rejected. Accepted paths are
/// ASCII, so the byte length is the character count.
pub const MAX_PATH_LEN: usize = 256;

/// Maximum number of chain links stored inline.
const INLINE_LINKS: usize = 4;

fn matches_shape(path: &str) -> bool {
    static SHAPE: OnceLock<Option<Regex>> = OnceLock::new();
    SHAPE
        .get_or_init(|| Regex::new(r"(?i)^/v[0-9]+/([A-Za-z0-9_]+/?)+$").ok())
        .as_ref()
        .is_some_and(|shape| shape.is_match(path))
}

/// One `(name, id)` pair of an object chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLink {
    /// Resource name as it appears in the path.
    pub name: String,
    /// Identifier following the name, if any.
    pub id: Option<String>,
}

impl ChainLink {
    /// Creates a link.
    #[must_use]
    pub fn new(name: impl Into<String>, id: Option<String>) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

/// A parsed request path.
///
/// # Example
///
/// ```rust
/// use hermes_router::RequestDescriptor;
///
/// let descriptor = RequestDescriptor::parse("/V2/tests/abc123/mounted_objects").unwrap();
/// assert_eq!(descriptor.version(), 2);
/// assert_eq!(descriptor.object_chain().len(), 2);
/// assert_eq!(descriptor.object_chain()[0].id.as_deref(), Some("abc123"));
/// assert!(!descriptor.is_identified());
/// assert_eq!(descriptor.to_path(), "/v2/tests/abc123/mounted_objects");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    version: u32,
    chain: SmallVec<[ChainLink; INLINE_LINKS]>,
}

impl RequestDescriptor {
    /// Parses `path`, returning `None` if it is malformed or too long.
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        if path.len() >= MAX_PATH_LEN || !matches_shape(path) {
            return None;
        }

        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let version = segments.next()?.get(1..)?.parse::<u32>().ok()?;

        let mut chain = SmallVec::new();
        while let Some(name) = segments.next() {
            chain.push(ChainLink::new(name, segments.next().map(ToString::to_string)));
        }

        Some(Self { version, chain })
    }

    /// Returns the numeric API version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Returns the lower-cased version tag, e.g. `v1`.
    #[must_use]
    pub fn version_tag(&self) -> String {
        format!("v{}", self.version)
    }

    /// Returns the `(name, id)` pairs in path order.
    #[must_use]
    pub fn object_chain(&self) -> &[ChainLink] {
        &self.chain
    }

    /// Returns `true` if the final resource carries an id.
    #[must_use]
    pub fn is_identified(&self) -> bool {
        self.chain.last().is_some_and(|link| link.id.is_some())
    }

    /// Rebuilds the canonical path.
    #[must_use]
    pub fn to_path(&self) -> String {
        let mut path = self.version_tag();
        path.insert(0, '/');
        for link in &self.chain {
            path.push('/');
            path.push_str(&link.name);
            if let Some(id) = &link.id {
                path.push('/');
                path.push_str(id);
            }
        }
        path
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path())
    }
}

/// Parses `path` into a [`RequestDescriptor`].
///
/// A malformed path is reported as not found; it is indistinguishable from
/// an unknown route.
pub fn resolve(path: &str) -> HermesResult<RequestDescriptor> {
    RequestDescriptor::parse(path)
        .ok_or_else(|| HermesError::not_found(format!("no route for {path}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::ErrorCategory;
    use proptest::prelude::*;

    #[test]
    fn test_collection_path() {
        let d = RequestDescriptor::parse("/v1/tests").unwrap();
        assert_eq!(d.version(), 1);
        assert_eq!(d.object_chain(), &[ChainLink::new("tests", None)]);
        assert!(!d.is_identified());
    }

    #[test]
    fn test_identified_path() {
        let d = RequestDescriptor::parse("/v1/tests/abc123").unwrap();
        assert_eq!(
            d.object_chain(),
            &[ChainLink::new("tests", Some("abc123".to_string()))]
        );
        assert!(d.is_identified());
    }

    #[test]
    fn test_deep_mount_chain() {
        let d = RequestDescriptor::parse("/v3/a/1/b/2/c").unwrap();
        let names: Vec<_> = d.object_chain().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(d.object_chain()[1].id.as_deref(), Some("2"));
        assert!(!d.is_identified());
    }

    #[test]
    fn test_version_is_case_insensitive() {
        let d = RequestDescriptor::parse("/V7/tests/").unwrap();
        assert_eq!(d.version_tag(), "v7");
        assert_eq!(d.to_path(), "/v7/tests");
    }

    #[test]
    fn test_rejects_malformed_paths() {
        for path in [
            "",
            "/",
            "/v1",
            "/v1/",
            "/1/tests",
            "/vx/tests",
            "v1/tests",
            "/v1//tests",
            "/v1/te-sts",
            "/v1/tests?x=1",
            "/v1/tësts",
            "/v١/tests",
            "/v1/tests/é",
        ] {
            assert!(RequestDescriptor::parse(path).is_none(), "{path} should be rejected");
        }
    }

    #[test]
    fn test_length_limit() {
        let long = format!("/v1/{}", "a".repeat(MAX_PATH_LEN - 4));
        assert_eq!(long.len(), MAX_PATH_LEN);
        assert!(RequestDescriptor::parse(&long).is_none());

        let fits = format!("/v1/{}", "a".repeat(MAX_PATH_LEN - 5));
        assert_eq!(fits.len(), MAX_PATH_LEN - 1);
        assert!(RequestDescriptor::parse(&fits).is_some());

        let short_but_wide = format!("/v1/{}", "é".repeat(100));
        assert!(short_but_wide.chars().count() < MAX_PATH_LEN);
        assert!(RequestDescriptor::parse(&short_but_wide).is_none());
    }

    #[test]
    fn test_resolve_reports_not_found() {
        let err = resolve("/nope").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    proptest! {
        #[test]
        fn prop_parse_round_trips(
            version in 0u32..10_000,
            segments in proptest::collection::vec("[A-Za-z0-9_]{1,12}", 1..8),
        ) {
            let path = format!("/v{version}/{}", segments.join("/"));
            prop_assume!(path.len() < MAX_PATH_LEN);

            let descriptor = RequestDescriptor::parse(&path).unwrap();
            prop_assert_eq!(descriptor.version(), version);
            prop_assert_eq!(descriptor.object_chain().len(), segments.len().div_ceil(2));
            prop_assert_eq!(descriptor.to_path(), path.clone());
            prop_assert_eq!(RequestDescriptor::parse(&descriptor.to_path()), Some(descriptor));
        }
    }
}
