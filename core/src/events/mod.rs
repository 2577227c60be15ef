//! Event definitions and registry
//!
//! This module provides:
//! - **Definitions**: callback bundles describing what an event does when
//!   it fires (simple, timed, or data-bound)
//! - **Registry**: the definition store with duplicate rejection and
//!   cost-ordered listings
//! - **Catalog**: TOML loading for config-declared events

mod catalog;
mod definition;
mod error;
mod registry;

#[cfg(test)]
mod registry_tests;

pub use catalog::{CatalogEntry, CatalogVariant, load_catalog, parse_catalog};
pub use definition::{ActionError, ActionFn, DataFn, EventDefinition, EventKind, ExpireFn};
pub use error::CatalogError;
pub use registry::EventRegistry;
