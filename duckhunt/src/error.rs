//! Error handling in [`duckhunt`][crate]
use thiserror::Error;

use duckhunt_core::ParseSelectorError;

/// Possible errors when hunting for ducks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No resource is registered under this name at the group version
    #[error("kind not found for {resource} in {group_version}")]
    KindNotFound {
        /// The resource that was looked up
        resource: String,
        /// The group version that was searched
        group_version: String,
    },

    /// No kind is registered under this name at the group version
    #[error("resource not found for {kind} in {group_version}")]
    ResourceNotFound {
        /// The kind that was looked up
        kind: String,
        /// The group version that was searched
        group_version: String,
    },

    /// An explicit reference names a kind the cluster does not serve
    ///
    /// This is a configuration mismatch rather than a transient fault.
    #[error("resource \"{kind} {api_version}\" not known to the cluster")]
    UnknownResource {
        /// The referenced kind
        kind: String,
        /// The referenced apiVersion
        api_version: String,
    },

    /// A duck type selector could not be parsed
    #[error("invalid definition selector: {0}")]
    InvalidSelector(#[source] ParseSelectorError),
}
