//! Type information structs for discovered duck type implementations
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::gvk::{api_version, split_api_version};

/// Resource scope
#[derive(Debug, Clone, Copy, Default, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    /// Objects are global
    Cluster,
    /// Each object lives in namespace.
    #[default]
    Namespaced,
}

impl FromStr for Scope {
    type Err = std::convert::Infallible;

    /// Anything other than `Cluster` is treated as namespaced, like the apiserver's default.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Cluster" => Scope::Cluster,
            _ => Scope::Namespaced,
        })
    }
}

/// Rbac verbs used to decide whether a duck is observable
pub mod verbs {
    /// Get single resource
    pub const GET: &str = "get";
    /// List objects
    pub const LIST: &str = "list";
    /// Watch for objects changes
    pub const WATCH: &str = "watch";
    /// Every verb
    pub const ALL: &str = "*";

    /// The verbs a policy must grant before a duck counts as accessible
    pub const BASELINE: [&str; 3] = [GET, WATCH, LIST];
}

/// A resolved resource kind that implements a duck type.
///
/// Two metas describe the same duck when their [`ResourceMeta::key`] is equal.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMeta {
    /// apiVersion of the resource (`version` for the core group, `group/version` otherwise)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    /// Singular PascalCase name of the resource
    pub kind: String,

    /// Whether the resource is cluster- or namespace-scoped
    pub scope: Scope,

    /// Whether the configured access policy grants get, watch and list on this resource
    #[serde(default)]
    pub accessible_via_policy: bool,
}

impl ResourceMeta {
    /// Creates a ResourceMeta from a group, version and kind
    pub fn new(group: &str, version: &str, kind: &str, scope: Scope) -> Self {
        Self {
            api_version: api_version(group, version),
            kind: kind.to_string(),
            scope,
            accessible_via_policy: false,
        }
    }

    /// The group half of the apiVersion, empty for the core group
    pub fn group(&self) -> &str {
        split_api_version(&self.api_version).0
    }

    /// The version half of the apiVersion
    pub fn version(&self) -> &str {
        split_api_version(&self.api_version).1
    }

    /// Identity of this meta within a duck version: `(apiVersion, kind)`
    pub fn key(&self) -> (&str, &str) {
        (&self.api_version, &self.kind)
    }
}

/// An explicit pointer to a resource kind that implements a duck type.
///
/// One of `version` or `api_version` is set, and one of `kind` or `resource`.
/// `group` is only meaningful together with `version`.
/// Shape is checked before references reach the hunter.
#[derive(Debug, Clone, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    /// Resource group
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,

    /// Version the duck type applies to for the resource
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    /// Group and version of the resource combined
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    /// Plural resource name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource: String,

    /// CamelCased resource kind
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    /// Whether the resource is cluster- or namespace-scoped, defaults to `Namespaced`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
}

impl ResourceRef {
    /// The `group/version` this reference points at, or `api_version` when that is given
    pub fn group_version(&self) -> String {
        if !self.api_version.is_empty() {
            return self.api_version.clone();
        }
        api_version(&self.group, &self.version)
    }
}
