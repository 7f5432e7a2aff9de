//! API version registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use hermes_core::{HermesError, HermesResult};
use indexmap::IndexMap;

use crate::resource::ResourceType;

/// The top-level resources published under each API version.
///
/// # Example
///
/// ```rust
/// use hermes_router::{Api, ResourceBuilder};
///
/// let tests = ResourceBuilder::new("tests", |_| ()).build().unwrap();
/// let api = Api::builder().version(1, [tests]).build().unwrap();
///
/// assert!(api.resource(1, "tests").is_some());
/// assert!(api.resource(2, "tests").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Api {
    versions: BTreeMap<u32, IndexMap<String, Arc<ResourceType>>>,
}

impl Api {
    /// Starts a new registry.
    #[must_use]
    pub fn builder() -> ApiBuilder {
        ApiBuilder::default()
    }

    /// Looks up a top-level resource of `version`.
    #[must_use]
    pub fn resource(&self, version: u32, name: &str) -> Option<&Arc<ResourceType>> {
        self.versions.get(&version)?.get(name)
    }

    /// Returns the published versions in ascending order.
    pub fn versions(&self) -> impl Iterator<Item = u32> + '_ {
        self.versions.keys().copied()
    }

    /// Returns the top-level resources of `version`.
    pub fn resources(&self, version: u32) -> impl Iterator<Item = &Arc<ResourceType>> {
        self.versions.get(&version).into_iter().flat_map(IndexMap::values)
    }
}

/// Builder for [`Api`].
#[derive(Debug, Default)]
pub struct ApiBuilder {
    versions: BTreeMap<u32, Vec<Arc<ResourceType>>>,
}

impl ApiBuilder {
    /// Publishes `resources` under `version`. May be called repeatedly.
    #[must_use]
    pub fn version(
        mut self,
        version: u32,
        resources: impl IntoIterator<Item = Arc<ResourceType>>,
    ) -> Self {
        self.versions.entry(version).or_default().extend(resources);
        self
    }

    /// Publishes one resource under `version`.
    #[must_use]
    pub fn resource(self, version: u32, resource: Arc<ResourceType>) -> Self {
        self.version(version, [resource])
    }

    /// Freezes the registry.
    ///
    /// # Errors
    ///
    /// Returns `HermesError::MethodDefinition` if two resources of one version
    /// share a name.
    pub fn build(self) -> HermesResult<Api> {
        let mut versions = BTreeMap::new();
        for (version, resources) in self.versions {
            let mut published = IndexMap::with_capacity(resources.len());
            for resource in resources {
                let name = resource.name().to_string();
                if published.insert(name.clone(), resource).is_some() {
                    return Err(HermesError::method_definition(
                        name,
                        format!("v{version}"),
                        "published more than once",
                    ));
                }
            }
            versions.insert(version, published);
        }
        Ok(Api { versions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceBuilder;

    #[test]
    fn test_versions_are_independent() {
        let v1 = ResourceBuilder::new("tests", |_| ()).build().unwrap();
        let v2 = ResourceBuilder::new("tests", |_| ()).id_name("uuid").build().unwrap();

        let api = Api::builder()
            .version(1, [v1])
            .resource(2, v2)
            .build()
            .unwrap();

        assert_eq!(api.versions().collect::<Vec<_>>(), [1, 2]);
        assert_eq!(api.resource(1, "tests").unwrap().id_param(), "test_id");
        assert_eq!(api.resource(2, "tests").unwrap().id_param(), "test_uuid");
        assert_eq!(api.resources(3).count(), 0);
    }

    #[test]
    fn test_duplicate_resource_rejected() {
        let a = ResourceBuilder::new("tests", |_| ()).build().unwrap();
        let err = Api::builder()
            .version(1, [Arc::clone(&a)])
            .version(1, [a])
            .build()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid definition of tests#v1: published more than once"
        );
    }
}
