//! Crate with types necessary for describing duck types and the resources that implement them
//!
//! This crate holds the client-less half of duck type discovery: apiVersion helpers,
//! resolved resource descriptors, explicit resource references, label selectors,
//! and the `ClusterDuckType` object whose status the hunter fills in.
//! The same information is re-exported from `duckhunt` under `duckhunt::core`.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod discovery;
pub use discovery::{ResourceMeta, ResourceRef, Scope};

pub mod ducktype;
pub use ducktype::{ClusterDuckType, ClusterDuckTypeSpec, ClusterDuckTypeStatus};

pub mod gvk;

pub mod labels;
pub use labels::Selector;

mod error;
pub use error::ParseSelectorError;
