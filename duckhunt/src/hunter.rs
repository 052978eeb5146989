//! Classifies definitions and references into duck type versions
//!
//! A [`DuckHunter`] lives for one reconciliation pass. Producers append `(duck version, meta)`
//! pairs through [`DuckHunter::add_crds`] and [`DuckHunter::add_ref`]; [`DuckHunter::ducks`]
//! de-duplicates, sorts and annotates them in one place.
use std::collections::{BTreeMap, BTreeSet};

use k8s_openapi::{
    api::rbac::v1::ClusterRole,
    apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use duckhunt_core::{ducktype::ClusterDuckTypeSpec, ResourceMeta, ResourceRef, Scope};

use crate::{access::AccessIndex, resolver::ResourceMapper, Error, Result};

/// Label and annotation rules that route definitions into duck versions.
///
/// An empty field disables that rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuckFilters {
    /// Label key in the form `<group>/<names.singular>`.
    ///
    /// A definition carrying it participates only when the value is `"true"`.
    /// A definition without it is not filtered.
    #[serde(default)]
    pub duck_label: String,

    /// Annotation prefix in the form `<names.plural>.<group>`.
    ///
    /// `<prefix>/<duck version>: <csv of definition versions>` maps definition versions
    /// into duck versions.
    #[serde(default)]
    pub duck_version_prefix: String,
}

impl DuckFilters {
    /// The filters a `ClusterDuckType` implies for its definitions
    pub fn for_duck_type(spec: &ClusterDuckTypeSpec) -> Self {
        Self {
            duck_label: spec.duck_label(),
            duck_version_prefix: spec.duck_version_prefix(),
        }
    }

    /// Duck versions named by version annotations, with the definition versions each lists
    fn annotated_versions(&self, annotations: &BTreeMap<String, String>) -> BTreeMap<String, BTreeSet<String>> {
        if self.duck_version_prefix.is_empty() {
            return BTreeMap::new();
        }
        let prefix = format!("{}/", self.duck_version_prefix);
        annotations
            .iter()
            .filter_map(|(key, value)| {
                let duck_version = key.strip_prefix(&prefix)?;
                let versions = value
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(String::from)
                    .collect();
                Some((duck_version.to_string(), versions))
            })
            .collect()
    }
}

/// How a single definition is routed, decided once before any of its versions are placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routing {
    /// Every served version goes to every default duck version
    Unfiltered,
    /// The duck label says no; the definition goes nowhere
    Rejected,
    /// Served versions go only to the duck versions whose annotation lists them.
    ///
    /// May place nothing when no listed version is served.
    Annotated(BTreeMap<String, BTreeSet<String>>),
}

impl Routing {
    /// Decides the routing of a definition with the given labels and annotations
    pub fn decide(
        filters: Option<&DuckFilters>,
        labels: &BTreeMap<String, String>,
        annotations: &BTreeMap<String, String>,
    ) -> Self {
        let Some(filters) = filters else {
            return Routing::Unfiltered;
        };
        if !filters.duck_label.is_empty() {
            if let Some(value) = labels.get(&filters.duck_label) {
                if value != "true" {
                    return Routing::Rejected;
                }
            }
        }
        let annotated = filters.annotated_versions(annotations);
        if annotated.is_empty() {
            Routing::Unfiltered
        } else {
            Routing::Annotated(annotated)
        }
    }
}

/// Counts of definitions that contributed nothing to any duck version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HuntStats {
    /// Definitions whose duck label was not `"true"`
    pub rejected: usize,
    /// Definitions with version annotations naming none of their served versions
    pub unmatched: usize,
}

/// Collects, sorts and buckets the kinds implementing a duck type.
///
/// Build one per reconciliation pass; nothing carries over between passes.
#[derive(Debug, Clone)]
pub struct DuckHunter {
    /// Resolves and validates references; `None` trusts references naming a kind
    mapper: Option<ResourceMapper>,
    filters: Option<DuckFilters>,
    /// Duck versions that unfiltered definitions are added to
    default_versions: Vec<String>,
    /// Every duck version seen so far, including ones that are still empty
    declared: BTreeSet<String>,
    /// Raw `(duck version, meta)` pairs in insertion order
    found: Vec<(String, ResourceMeta)>,
    access: AccessIndex,
    stats: HuntStats,
}

impl DuckHunter {
    /// Creates a hunter.
    ///
    /// `default_versions` receive every definition that is not routed by annotation;
    /// repeated names collapse to one.
    pub fn new<I, S>(
        mapper: Option<ResourceMapper>,
        default_versions: I,
        filters: Option<DuckFilters>,
        role: Option<&ClusterRole>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut declared = BTreeSet::new();
        let default_versions = default_versions
            .into_iter()
            .map(Into::into)
            .filter(|v: &String| declared.insert(v.clone()))
            .collect();
        Self {
            mapper,
            filters,
            default_versions,
            declared,
            found: vec![],
            access: AccessIndex::new(role),
            stats: HuntStats::default(),
        }
    }

    /// Adds each definition in order, see [`DuckHunter::add_crd`]
    pub fn add_crds<'a>(&mut self, crds: impl IntoIterator<Item = &'a CustomResourceDefinition>) {
        for crd in crds {
            self.add_crd(crd);
        }
    }

    /// Adds the served versions of a definition to the duck versions its routing selects
    pub fn add_crd(&mut self, crd: &CustomResourceDefinition) {
        let metas = served_metas(crd);
        if metas.is_empty() {
            return;
        }
        let empty = BTreeMap::new();
        let labels = crd.metadata.labels.as_ref().unwrap_or(&empty);
        let annotations = crd.metadata.annotations.as_ref().unwrap_or(&empty);
        let name = crd.metadata.name.as_deref().unwrap_or_default();

        match Routing::decide(self.filters.as_ref(), labels, annotations) {
            Routing::Unfiltered => {
                debug!(crd = name, versions = metas.len(), "adding definition to default duck versions");
                for meta in metas {
                    for duck_version in &self.default_versions {
                        self.found.push((duck_version.clone(), meta.clone()));
                    }
                }
            }
            Routing::Rejected => {
                debug!(crd = name, "definition opted out by duck label");
                self.stats.rejected += 1;
            }
            Routing::Annotated(routes) => {
                self.declared.extend(routes.keys().cloned());
                let before = self.found.len();
                for meta in metas {
                    for (duck_version, versions) in &routes {
                        if versions.contains(meta.version()) {
                            self.found.push((duck_version.clone(), meta.clone()));
                        }
                    }
                }
                if self.found.len() == before {
                    debug!(crd = name, "version annotations match no served version");
                    self.stats.unmatched += 1;
                }
            }
        }
    }

    /// Adds an explicitly referenced resource to `duck_version`.
    ///
    /// A reference naming only a resource is resolved to its kind through the mapper.
    /// With a mapper, the kind must exist at the referenced group version.
    /// Nothing is added when an error is returned.
    pub fn add_ref(&mut self, duck_version: &str, rf: &ResourceRef) -> Result<()> {
        let meta = self.resolve(rf).inspect_err(|err| {
            warn!(duck_version, error = %err, "unable to resolve resource reference");
        })?;
        self.declared.insert(duck_version.to_string());
        self.found.push((duck_version.to_string(), meta));
        Ok(())
    }

    fn resolve(&self, rf: &ResourceRef) -> Result<ResourceMeta> {
        let group_version = rf.group_version();
        let kind = if !rf.kind.is_empty() {
            rf.kind.clone()
        } else if let Some(mapper) = &self.mapper {
            mapper.kind_for(&group_version, &rf.resource)?
        } else {
            return Err(Error::KindNotFound {
                resource: rf.resource.clone(),
                group_version,
            });
        };

        if let Some(mapper) = &self.mapper {
            if !mapper.kind_exists(&group_version, &kind) {
                return Err(Error::UnknownResource {
                    kind,
                    api_version: group_version,
                });
            }
        }

        Ok(ResourceMeta {
            api_version: group_version,
            kind,
            scope: rf.scope.unwrap_or_default(),
            accessible_via_policy: false,
        })
    }

    /// Every duck version declared so far, whether or not anything was added to it
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.declared.iter().map(String::as_str)
    }

    /// Definitions that contributed to no duck version so far
    pub fn stats(&self) -> HuntStats {
        self.stats
    }

    /// The current collection of ducks, keyed by duck version.
    ///
    /// Each list is unique by `(apiVersion, kind)`, sorted ascending by it, and annotated with
    /// policy access. Duck versions without any duck are left out.
    pub fn ducks(&self) -> BTreeMap<String, Vec<ResourceMeta>> {
        let mut ducks: BTreeMap<String, Vec<ResourceMeta>> = BTreeMap::new();
        for (duck_version, meta) in &self.found {
            ducks.entry(duck_version.clone()).or_default().push(meta.clone());
        }
        for metas in ducks.values_mut() {
            metas.sort_by(|a, b| a.key().cmp(&b.key()));
            metas.dedup_by(|a, b| a.key() == b.key());
            self.access.annotate(metas);
        }
        ducks
    }
}

/// One meta per served version of the definition
fn served_metas(crd: &CustomResourceDefinition) -> Vec<ResourceMeta> {
    let spec = &crd.spec;
    let scope = spec.scope.parse::<Scope>().unwrap_or_default();
    spec.versions
        .iter()
        .filter(|v| v.served)
        .map(|v| ResourceMeta::new(&spec.group, &v.name, &spec.names.kind, scope))
        .collect()
}
