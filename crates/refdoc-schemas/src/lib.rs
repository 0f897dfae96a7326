//! Schema definitions for refdoc output.
//!
//! This crate contains the data structures produced by type extraction and
//! consumed by documentation renderers: an arena of type nodes addressed by
//! [`TypeId`], and the namespace/version groups that list the declared and
//! root types of each API version.
//!
//! The schemas are designed to be:
//! - **Self-describing**: JSON Schema is derived from the Rust types
//! - **Canonical**: one node per type identity, edges are ids into the arena
//! - **Deterministic**: groups and references have a defined order

mod reference_docs;
#[cfg(test)]
mod testutil;
mod type_graph;

#[doc(inline)]
pub use reference_docs::*;
#[doc(inline)]
pub use type_graph::*;
