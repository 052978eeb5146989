//! Computes the observed state of a `ClusterDuckType` for one reconciliation pass
//!
//! The surrounding control loop lists definitions, takes a mapper snapshot, fetches the
//! policy `ClusterRole`, and writes back whatever [`reconcile`] returns.
use std::collections::{BTreeMap, BTreeSet};

use k8s_openapi::{
    api::rbac::v1::ClusterRole,
    apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition,
};
use tracing::{debug, instrument, warn};

use duckhunt_core::{
    ducktype::{ClusterDuckType, ClusterDuckTypeSpec, ClusterDuckTypeStatus, Condition},
    ResourceMeta, Selector,
};

use crate::{
    hunter::{DuckFilters, DuckHunter},
    resolver::ResourceMapper,
    Error, Result,
};

/// Ready reason when the hunt completed
pub const REASON_DUCKS_FOUND: &str = "DucksFound";
/// Ready reason when an explicit reference does not exist on the cluster
pub const REASON_REF_NOT_KNOWN: &str = "ResourceRefNotKnown";
/// Ready reason when a definition selector cannot be parsed
pub const REASON_INVALID_SELECTOR: &str = "InvalidSelector";

/// Picks the definitions matched by any of the duck type's selectors.
///
/// A definition matched by several selectors is returned once. No selectors match nothing.
pub fn select_crds<'a>(
    spec: &ClusterDuckTypeSpec,
    crds: &'a [CustomResourceDefinition],
) -> Result<Vec<&'a CustomResourceDefinition>> {
    let selectors = spec
        .selectors
        .iter()
        .map(|s| s.label_selector.parse::<Selector>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(Error::InvalidSelector)?;

    let empty = BTreeMap::new();
    let mut seen = BTreeSet::new();
    Ok(crds
        .iter()
        .filter(|crd| {
            let labels = crd.metadata.labels.as_ref().unwrap_or(&empty);
            selectors.iter().any(|s| s.matches(labels))
        })
        .filter(|crd| seen.insert(crd.metadata.name.clone().unwrap_or_default()))
        .collect())
}

/// Runs a hunt for the duck type over the given definitions and its declared refs
pub fn hunt(
    dt: &ClusterDuckType,
    crds: &[CustomResourceDefinition],
    mapper: Option<ResourceMapper>,
    role: Option<&ClusterRole>,
) -> Result<BTreeMap<String, Vec<ResourceMeta>>> {
    let spec = &dt.spec;
    let mut hunter = DuckHunter::new(
        mapper,
        spec.versions.iter().map(|v| v.name.as_str()),
        Some(DuckFilters::for_duck_type(spec)),
        role,
    );
    hunter.add_crds(select_crds(spec, crds)?);
    for version in &spec.versions {
        for rf in &version.refs {
            hunter.add_ref(&version.name, rf)?;
        }
    }

    let stats = hunter.stats();
    debug!(rejected = stats.rejected, unmatched = stats.unmatched, "hunt finished");
    Ok(hunter.ducks())
}

/// Number of distinct `(group, kind)` pairs across all duck versions
pub fn duck_count(ducks: &BTreeMap<String, Vec<ResourceMeta>>) -> usize {
    ducks
        .values()
        .flatten()
        .map(|meta| (meta.group(), meta.kind.as_str()))
        .collect::<BTreeSet<_>>()
        .len()
}

/// Computes the status of `dt`.
///
/// Failures become a `Ready=False` condition with no ducks; they are configuration problems
/// and are not retried here.
#[instrument(skip_all, fields(duck_type = dt.metadata.name.as_deref().unwrap_or_default()))]
pub fn reconcile(
    dt: &ClusterDuckType,
    crds: &[CustomResourceDefinition],
    mapper: Option<ResourceMapper>,
    role: Option<&ClusterRole>,
) -> ClusterDuckTypeStatus {
    let mut status = ClusterDuckTypeStatus {
        observed_generation: dt.metadata.generation,
        ..ClusterDuckTypeStatus::default()
    };
    match hunt(dt, crds, mapper, role) {
        Ok(ducks) => {
            status.duck_count = duck_count(&ducks);
            status.ducks = ducks;
            status.conditions.push(Condition::ready(REASON_DUCKS_FOUND));
            debug!(duck_count = status.duck_count, "duck type ready");
        }
        Err(err) => {
            warn!(error = %err, "duck type not ready");
            let reason = match err {
                Error::InvalidSelector(_) => REASON_INVALID_SELECTOR,
                _ => REASON_REF_NOT_KNOWN,
            };
            status.conditions.push(Condition::not_ready(reason, err.to_string()));
        }
    }
    status
}
