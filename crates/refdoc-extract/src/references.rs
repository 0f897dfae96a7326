//! Reverse reference tracking.
//!
//! A reference edge records that a parent type contains a child type, either
//! directly or through pointer/slice/array/map wrapping. Only alias and
//! struct children are tracked: basic, interface and opaque types are never
//! listed as "referenced by" anything.
//!
//! Edges are recorded as raw `(parent, child)` pairs while the resolver is
//! running and indexed once the graph is complete. Unwrapping wrappers at
//! that point sees every node's final kind, including nodes that were
//! resolved in place after an earlier cutoff.

use std::collections::{BTreeMap, BTreeSet};

use refdoc_schemas::{TypeGraph, TypeId, TypeIdentity, TypeNode, TypeShape};
use tracing::debug;

use crate::error::ExtractError;

/// Raw parent → child containment edges collected during resolution.
#[derive(Debug, Default)]
pub(crate) struct ReferenceEdges {
    edges: Vec<(TypeId, TypeId)>,
}

impl ReferenceEdges {
    /// Records that `parent` contains `child`.
    pub(crate) fn add_reference(&mut self, parent: TypeId, child: TypeId) {
        self.edges.push((parent, child));
    }

    /// Unwraps every recorded edge against the finished graph.
    pub(crate) fn index(&self, graph: &TypeGraph) -> ReferenceIndex {
        let mut index = ReferenceIndex::default();
        for &(parent, child) in &self.edges {
            index.add(graph, parent, child);
        }
        index
    }
}

/// Child identity → identities of the types that contain it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct ReferenceIndex {
    parents: BTreeMap<TypeIdentity, BTreeSet<TypeIdentity>>,
}

impl ReferenceIndex {
    /// Adds `parent` to the back-references of `child`, looking through
    /// pointer, slice and array elements and both sides of a map.
    pub(crate) fn add(
        &mut self,
        graph: &TypeGraph,
        parent: TypeId,
        child: TypeId,
    ) {
        let node = &graph[child];
        match node.shape {
            TypeShape::Pointer { elem }
            | TypeShape::Slice { elem }
            | TypeShape::Array { elem, .. } => {
                if let Some(elem) = elem {
                    self.add(graph, parent, elem);
                }
            }
            TypeShape::Map { key, value } => {
                for side in [key, value].into_iter().flatten() {
                    self.add(graph, parent, side);
                }
            }
            _ if node.kind().is_reference_target() => {
                self.parents
                    .entry(node.identity.clone())
                    .or_default()
                    .insert(graph[parent].identity.clone());
            }
            _ => {}
        }
    }

    /// Identities recorded as containing `child`.
    pub(crate) fn parents_of(
        &self,
        child: &str,
    ) -> impl Iterator<Item = &TypeIdentity> {
        self.parents.get(child).into_iter().flatten()
    }

    /// Wherever `original` is recorded as a parent, records `additional`
    /// too. Returns true if anything changed.
    pub(crate) fn propagate(
        &mut self,
        original: &TypeIdentity,
        additional: &TypeIdentity,
    ) -> bool {
        let mut changed = false;
        for parents in self.parents.values_mut() {
            if parents.contains(original) {
                changed |= parents.insert(additional.clone());
            }
        }
        changed
    }

    /// Applies every merge until no parent set grows any further.
    ///
    /// The result does not depend on the order of `merges`: a merge `(a, b)`
    /// followed by `(b, c)` gives the same index as the reverse order, since
    /// the second round picks up what the first one missed.
    pub(crate) fn propagate_all(
        &mut self,
        merges: &[(TypeIdentity, TypeIdentity)],
    ) {
        let mut rounds = 0;
        loop {
            rounds += 1;
            let mut changed = false;
            for (original, additional) in merges {
                changed |= self.propagate(original, additional);
            }
            if !changed {
                break;
            }
        }
        debug!(merges = merges.len(), rounds, "propagated references");
    }

    /// Writes each node's `references`, sorted by identity.
    ///
    /// Parents that are missing from the graph or rejected by `keep` are
    /// left out.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::is_type_not_loaded`] if a referenced child
    /// has no node, which means the graph and index disagree.
    pub(crate) fn materialize(
        &self,
        graph: &mut TypeGraph,
        keep: impl Fn(&TypeNode) -> bool,
    ) -> Result<(), ExtractError> {
        for (child, parents) in &self.parents {
            let child_id = graph
                .lookup(child.as_str())
                .ok_or_else(|| ExtractError::type_not_loaded(child))?;

            let references: Vec<TypeId> = parents
                .iter()
                .filter_map(|p| graph.lookup(p.as_str()))
                .filter(|&id| keep(&graph[id]))
                .collect();

            if let Some(node) = graph.get_mut(child_id) {
                node.references = references;
            }
        }
        Ok(())
    }
}
