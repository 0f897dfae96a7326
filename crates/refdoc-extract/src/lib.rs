//! Type graph extraction for API reference documentation.
//!
//! This crate walks the packages reported by a [`SourceProvider`], finds
//! those that declare an API namespace, and resolves every exported type
//! they declare into a [`TypeGraph`]. The graph records structure (fields,
//! element types, underlying types), documentation, root kinds and
//! "referenced by" edges, grouped by namespace and version.
//!
//! ## Usage
//!
//! ```no_run
//! use refdoc_extract::{Config, Snapshot, run};
//!
//! let file = std::fs::File::open("api.json").unwrap();
//! let snapshot = Snapshot::from_reader(file).unwrap();
//! let mut output = Vec::new();
//! run(&snapshot, &Config::default(), &mut output).unwrap();
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports types from `refdoc_schemas` for convenience.
//! See [`refdoc_schemas`] for schema documentation.

mod config;
mod error;
mod fields;
mod identity;
mod inline;
mod namespaces;
mod provider;
mod references;
mod resolver;
mod snapshot;

use std::io::Write;

// Re-export schema types for convenience.
#[doc(inline)]
pub use refdoc_schemas::{
    Field, NamespaceVersion, NamespaceVersionGroup, ReferenceDocs, RootKind,
    TypeGraph, TypeId, TypeIdentity, TypeKind, TypeNode, TypeShape,
};
use tracing::{info, instrument};

#[doc(inline)]
pub use crate::config::{CompiledConfig, Config, DEFAULT_MAX_DEPTH};
#[doc(inline)]
pub use crate::error::{ExtractError, ProviderError};
#[doc(inline)]
pub use crate::identity::{TypeHeader, identity_of, type_string};
#[doc(inline)]
pub use crate::namespaces::{
    GROUP_NAME_MARKER, OBJECT_ROOT_MARKER, VERSION_NAME_MARKER,
};
#[doc(inline)]
pub use crate::provider::{
    Descriptor, FieldDecl, Markers, PackageRef, SERIALIZATION_TAG_KEY,
    SourceProvider, TypeInfo, tag_lookup,
};
#[doc(inline)]
pub use crate::snapshot::{Snapshot, SnapshotPackage};
use crate::inline::inline_types;
use crate::namespaces::NamespaceScan;
use crate::resolver::Resolver;

/// Extracts the reference docs for every namespace the provider declares.
///
/// Runs in four phases:
/// 1. Scan packages and resolve their declared types.
/// 2. Flatten inlined embedded fields.
/// 3. Index reference edges, propagate them across inlined types and write
///    each node's `references`.
/// 4. Assemble the namespace/version groups.
///
/// # Errors
///
/// Returns [`ExtractError`] if:
/// - The provider cannot enumerate or load a package
///   ([`ExtractError::is_provider`])
/// - A registered type is missing from the graph
///   ([`ExtractError::is_type_not_loaded`])
#[instrument(skip_all, fields(max_depth = config.max_depth))]
pub fn extract<P: SourceProvider + ?Sized>(
    provider: &P,
    config: &CompiledConfig,
) -> Result<ReferenceDocs, ExtractError> {
    let mut resolver = Resolver::new(provider, config);
    let scan = NamespaceScan::scan(&mut resolver)?;
    let (mut graph, edges) = resolver.finish();

    let merges = inline_types(&mut graph);

    let mut index = edges.index(&graph);
    index.propagate_all(&merges);
    index.materialize(&mut graph, |node| {
        !config.ignores_type(node.identity.as_str())
    })?;

    let groups = scan.assemble(&graph, config)?;
    info!(groups = groups.len(), types = graph.len(), "extracted type graph");
    Ok(ReferenceDocs { groups, graph })
}

/// Run the extract operation.
///
/// Compiles the configuration, extracts the reference docs and writes them
/// to the provided output writer as JSON.
///
/// # Errors
///
/// Returns [`ExtractError`] if:
/// - An exclusion pattern is invalid ([`ExtractError::is_invalid_pattern`])
/// - Extraction fails (see [`extract`])
/// - Writing to the output fails ([`ExtractError::is_io`])
/// - JSON serialization fails ([`ExtractError::is_serialization`])
pub fn run<P: SourceProvider + ?Sized>(
    provider: &P,
    config: &Config,
    output: &mut dyn Write,
) -> Result<(), ExtractError> {
    let config = config.compile()?;
    let docs = extract(provider, &config)?;
    serde_json::to_writer_pretty(&mut *output, &docs)?;
    writeln!(output)?;
    Ok(())
}
