//! The `ClusterDuckType` object: a declared duck type and its observed implementations
use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

use crate::discovery::{ResourceMeta, ResourceRef};

/// A query for, and the found implementations of, a duck type installed in a cluster.
///
/// The object name is expected to be `<names.plural>.<group>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterDuckType {
    /// Standard object metadata
    #[serde(default)]
    pub metadata: ObjectMeta,

    /// Desired state of the duck type
    pub spec: ClusterDuckTypeSpec,

    /// Observed state of the duck type, written by the reconciler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ClusterDuckTypeStatus>,
}

/// Desired state of a [`ClusterDuckType`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDuckTypeSpec {
    /// API group of the duck type
    pub group: String,

    /// Naming conventions for this duck type
    pub names: DuckTypeNames,

    /// Versions of the duck type, each of which gets a bucket of implementations
    pub versions: Vec<DuckVersion>,

    /// Selectors for the definitions that implement the duck type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selectors: Vec<CustomResourceDefinitionSelector>,
}

/// Naming rules for a duck type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuckTypeNames {
    /// CamelCase singular name of the duck type
    pub name: String,

    /// Lowercase plural name of the duck type
    pub plural: String,

    /// Lowercase singular name of the duck type, defaults to the lowercased `name`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub singular: String,
}

/// A named version of a duck type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuckVersion {
    /// Name of this duck type version, e.g. `v1`
    pub name: String,

    /// Resources declared by hand to implement this version
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<ResourceRef>,
}

/// Picks definitions that implement a duck type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomResourceDefinitionSelector {
    /// Label selector over definitions, typically `<group>/<names.singular>=true`
    ///
    /// Versions of a matching definition are mapped to duck versions with annotations of the form
    /// `<names.plural>.<group>/<duck version>=<definition version>[,<definition version>...]`.
    /// Without such an annotation the definition applies to every duck version.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label_selector: String,
}

impl ClusterDuckTypeSpec {
    /// Singular name, falling back to the lowercased `names.name`
    pub fn singular(&self) -> String {
        if self.names.singular.is_empty() {
            self.names.name.to_lowercase()
        } else {
            self.names.singular.clone()
        }
    }

    /// Label key that marks a definition as (not) implementing the duck: `<group>/<singular>`
    pub fn duck_label(&self) -> String {
        format!("{}/{}", self.group, self.singular())
    }

    /// Annotation prefix that maps definition versions to duck versions: `<plural>.<group>`
    pub fn duck_version_prefix(&self) -> String {
        format!("{}.{}", self.names.plural, self.group)
    }
}

/// Observed state of a [`ClusterDuckType`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDuckTypeStatus {
    /// The generation of the spec this status was computed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Current conditions, currently only `Ready`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Found implementations, keyed by duck version
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ducks: BTreeMap<String, Vec<ResourceMeta>>,

    /// Number of distinct kinds found across all duck versions
    pub duck_count: usize,
}

impl ClusterDuckTypeStatus {
    /// Look up a condition by type
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    /// Whether the `Ready` condition is `True`
    pub fn is_ready(&self) -> bool {
        self.condition(Condition::READY)
            .is_some_and(|c| c.status == Condition::TRUE)
    }
}

/// A status condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Condition type, e.g. `Ready`
    #[serde(rename = "type")]
    pub type_: String,

    /// `True`, `False` or `Unknown`
    pub status: String,

    /// One-word CamelCase reason for the last transition
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Human readable details about the transition
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl Condition {
    /// Type of the readiness condition
    pub const READY: &'static str = "Ready";
    /// Condition status value for a satisfied condition
    pub const TRUE: &'static str = "True";
    /// Condition status value for an unsatisfied condition
    pub const FALSE: &'static str = "False";

    /// A `Ready=True` condition
    pub fn ready(reason: &str) -> Self {
        Self {
            type_: Self::READY.into(),
            status: Self::TRUE.into(),
            reason: reason.into(),
            message: String::new(),
        }
    }

    /// A `Ready=False` condition
    pub fn not_ready(reason: &str, message: impl Into<String>) -> Self {
        Self {
            type_: Self::READY.into(),
            status: Self::FALSE.into(),
            reason: reason.into(),
            message: message.into(),
        }
    }
}
