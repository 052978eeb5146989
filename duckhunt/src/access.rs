//! Which ducks a `ClusterRole` can get, watch and list
use std::collections::HashSet;

use k8s_openapi::api::rbac::v1::{ClusterRole, PolicyRule};

use duckhunt_core::discovery::{verbs, ResourceMeta};

const WILDCARD: &str = "*";

/// The lowercase `apiGroup:resource` pairs a policy grants the baseline verbs on.
///
/// Wildcard rules are stored as written (`*:*`, `*:resource`, `group:*`) and matched at lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessIndex {
    granted: HashSet<String>,
}

impl AccessIndex {
    /// Indexes every rule of `role` whose verbs cover [`verbs::BASELINE`]
    pub fn new(role: Option<&ClusterRole>) -> Self {
        let granted = role
            .and_then(|r| r.rules.as_deref())
            .unwrap_or_default()
            .iter()
            .filter(|rule| grants_baseline(rule))
            .flat_map(|rule| {
                let groups = rule.api_groups.as_deref().unwrap_or_default();
                let resources = rule.resources.as_deref().unwrap_or_default();
                groups
                    .iter()
                    .flat_map(move |group| resources.iter().map(move |resource| key(group, resource)))
            })
            .collect();
        Self { granted }
    }

    /// Whether the indexed policy lets a reader observe `meta`.
    ///
    /// The resource name is guessed as the lowercased kind plus `s`.
    pub fn allows(&self, meta: &ResourceMeta) -> bool {
        let group = meta.group();
        let resource = format!("{}s", meta.kind);
        [
            key(group, &resource),
            key(WILDCARD, WILDCARD),
            key(WILDCARD, &resource),
            key(group, WILDCARD),
        ]
        .iter()
        .any(|k| self.granted.contains(k))
    }

    /// Sets `accessible_via_policy` on every meta
    pub fn annotate(&self, metas: &mut [ResourceMeta]) {
        for meta in metas {
            meta.accessible_via_policy = self.allows(meta);
        }
    }
}

fn key(group: &str, resource: &str) -> String {
    format!("{group}:{resource}").to_lowercase()
}

/// A rule grants the baseline when its verbs are a superset of it, or contain `*`
fn grants_baseline(rule: &PolicyRule) -> bool {
    if rule.verbs.iter().any(|v| v == verbs::ALL) {
        return true;
    }
    verbs::BASELINE.iter().all(|expected| rule.verbs.iter().any(|v| v == expected))
}
