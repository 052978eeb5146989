//! Crate that finds the resource kinds implementing a duck type
//!
//! A duck type is a named interface that concrete kinds declare (by label and annotation on
//! their `CustomResourceDefinition`) or are declared (by explicit reference) to implement.
//! The [`DuckHunter`] takes definitions and references for one reconciliation pass and
//! classifies them into duck versions, resolving references against a [`ResourceMapper`]
//! snapshot and marking which results a `ClusterRole` can observe.
//!
//! Nothing in this crate talks to an apiserver; callers hand in already listed objects.
//! [`reconcile::reconcile`] wires the pieces together for a `ClusterDuckType`.
#![deny(unsafe_code)]
#![deny(missing_docs)]

pub mod access;
pub use access::AccessIndex;

pub mod hunter;
pub use hunter::{DuckFilters, DuckHunter, HuntStats};

pub mod reconcile;

pub mod resolver;
pub use resolver::{ResourceMapper, SharedResourceMapper};

mod error;
pub use error::Error;

/// Re-exports from `duckhunt-core`
pub use duckhunt_core as core;

/// Convient alias for `Result<T, Error>`
pub type Result<T, E = Error> = std::result::Result<T, E>;
