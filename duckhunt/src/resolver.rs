//! Bidirectional kind/resource lookups per group version
//!
//! A [`ResourceMapper`] is a plain value. The control loop keeps the live table in a
//! [`SharedResourceMapper`], rebuilds it whenever discovery changes, and gives every
//! reconciliation pass its own [`snapshot`](SharedResourceMapper::snapshot).
use std::{collections::HashMap, sync::Arc};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResourceList;
use parking_lot::RwLock;
use tracing::debug;

use crate::{Error, Result};

/// Kind and resource mappings for a single group version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Mapping {
    kind_to_resource: HashMap<String, String>,
    resource_to_kind: HashMap<String, String>,
}

/// Converts between Resource and Kind, and validates that a Resource or Kind
/// exists at a group version on the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceMapper {
    mappings: HashMap<String, Mapping>,
}

impl ResourceMapper {
    /// Builds a mapper from discovery results.
    ///
    /// Subresources (names containing a `/`, like `widgets/status`) are skipped.
    /// A group version listed twice keeps only its last listing.
    pub fn new(lists: &[APIResourceList]) -> Self {
        Self::from_entries(lists.iter().map(|list| {
            let resources = list.resources.iter().map(|ar| (ar.kind.as_str(), ar.name.as_str()));
            (list.group_version.as_str(), resources)
        }))
    }

    /// Builds a mapper from `(groupVersion, [(kind, plural)])` entries.
    pub fn from_entries<'a, I, R>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, R)>,
        R: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut mappings = HashMap::new();
        for (group_version, resources) in entries {
            let mut mapping = Mapping::default();
            for (kind, resource) in resources {
                // skip subresources
                if resource.contains('/') {
                    continue;
                }
                mapping.kind_to_resource.insert(kind.to_string(), resource.to_string());
                mapping.resource_to_kind.insert(resource.to_string(), kind.to_string());
            }
            mappings.insert(group_version.to_string(), mapping);
        }
        Self { mappings }
    }

    /// Returns true if `kind` is known at `group_version`
    pub fn kind_exists(&self, group_version: &str, kind: &str) -> bool {
        self.mappings
            .get(group_version)
            .is_some_and(|m| m.kind_to_resource.contains_key(kind))
    }

    /// Returns true if `resource` is known at `group_version`
    pub fn resource_exists(&self, group_version: &str, resource: &str) -> bool {
        self.mappings
            .get(group_version)
            .is_some_and(|m| m.resource_to_kind.contains_key(resource))
    }

    /// Returns the Kind served under `resource` at `group_version`
    pub fn kind_for(&self, group_version: &str, resource: &str) -> Result<String> {
        self.mappings
            .get(group_version)
            .and_then(|m| m.resource_to_kind.get(resource))
            .cloned()
            .ok_or_else(|| Error::KindNotFound {
                resource: resource.to_string(),
                group_version: group_version.to_string(),
            })
    }

    /// Returns the plural resource name of `kind` at `group_version`
    pub fn resource_for(&self, group_version: &str, kind: &str) -> Result<String> {
        self.mappings
            .get(group_version)
            .and_then(|m| m.kind_to_resource.get(kind))
            .cloned()
            .ok_or_else(|| Error::ResourceNotFound {
                kind: kind.to_string(),
                group_version: group_version.to_string(),
            })
    }

    /// Number of group versions known to the mapper
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Whether the mapper knows no group versions at all
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// The live, rebuildable [`ResourceMapper`] shared between the resync path and reconcilers.
///
/// Cloning produces a new handle to the same table.
#[derive(Debug, Clone, Default)]
pub struct SharedResourceMapper {
    inner: Arc<RwLock<ResourceMapper>>,
}

impl SharedResourceMapper {
    /// Wraps an initial mapper
    pub fn new(mapper: ResourceMapper) -> Self {
        Self {
            inner: Arc::new(RwLock::new(mapper)),
        }
    }

    /// Replaces the table with one built from fresh discovery results
    pub fn rebuild(&self, lists: &[APIResourceList]) {
        // build outside the lock so readers only wait for the swap
        let mapper = ResourceMapper::new(lists);
        let group_versions = mapper.len();
        *self.inner.write() = mapper;
        debug!(group_versions, "rebuilt resource mapper");
    }

    /// Returns an independent deep copy of the current table
    #[must_use]
    pub fn snapshot(&self) -> ResourceMapper {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResource;

    fn api_resource(name: &str, kind: &str) -> APIResource {
        APIResource {
            name: name.into(),
            kind: kind.into(),
            namespaced: true,
            ..APIResource::default()
        }
    }

    fn swan_lake() -> Vec<APIResourceList> {
        vec![APIResourceList {
            group_version: "swan.lake/v1".into(),
            resources: vec![
                api_resource("ballets", "Ballet"),
                api_resource("ballets/status", "Ballet"),
                api_resource("dancers", "Dancer"),
            ],
        }]
    }

    #[test]
    fn builds_both_directions() {
        let mapper = ResourceMapper::new(&swan_lake());
        let expected = ResourceMapper::from_entries([(
            "swan.lake/v1",
            [("Ballet", "ballets"), ("Dancer", "dancers")],
        )]);
        assert_eq!(mapper, expected);
        assert_eq!(mapper.len(), 1);
    }

    #[test]
    fn skips_subresources() {
        let mapper = ResourceMapper::new(&swan_lake());
        assert!(!mapper.resource_exists("swan.lake/v1", "ballets/status"));
        assert!(mapper.resource_exists("swan.lake/v1", "ballets"));
        assert_eq!(mapper.resource_for("swan.lake/v1", "Ballet").unwrap(), "ballets");
    }

    #[test]
    fn lookups() {
        let mapper = ResourceMapper::new(&swan_lake());
        assert!(mapper.kind_exists("swan.lake/v1", "Ballet"));
        assert!(!mapper.kind_exists("swan.lake/v1", "Swan"));
        assert!(!mapper.kind_exists("swan.lake/v2", "Ballet"));
        assert!(!mapper.resource_exists("swan.lake/v2", "ballets"));

        assert_eq!(mapper.kind_for("swan.lake/v1", "dancers").unwrap(), "Dancer");
        assert_eq!(
            mapper.kind_for("swan.lake/v1", "swans"),
            Err(Error::KindNotFound {
                resource: "swans".into(),
                group_version: "swan.lake/v1".into(),
            })
        );
        assert_eq!(
            mapper.resource_for("swan.lake/v2", "Ballet"),
            Err(Error::ResourceNotFound {
                kind: "Ballet".into(),
                group_version: "swan.lake/v2".into(),
            })
        );
    }

    #[test]
    fn empty_mapper_finds_nothing() {
        let mapper = ResourceMapper::default();
        assert!(mapper.is_empty());
        assert!(!mapper.kind_exists("", ""));
        assert!(mapper.kind_for("v1", "pods").is_err());
    }

    #[test]
    fn snapshots_are_independent_of_rebuilds() {
        let shared = SharedResourceMapper::new(ResourceMapper::new(&swan_lake()));
        let before = shared.snapshot();

        shared.rebuild(&[APIResourceList {
            group_version: "teach.me.how/v2".into(),
            resources: vec![api_resource("duckies", "Ducky")],
        }]);

        assert!(before.kind_exists("swan.lake/v1", "Ballet"));
        assert!(!before.kind_exists("teach.me.how/v2", "Ducky"));

        let after = shared.clone().snapshot();
        assert!(after.kind_exists("teach.me.how/v2", "Ducky"));
        assert!(!after.kind_exists("swan.lake/v1", "Ballet"));
    }
}
