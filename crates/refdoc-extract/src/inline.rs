//! Flattening of inlined embedded fields.
//!
//! An embedded field without a serialized name (`json:",inline"` or no tag
//! at all) contributes its type's fields directly to the embedding struct.
//! This pass replaces each such field, at its position, with the fields of
//! its type. Types are inlined innermost first: a struct is only copied
//! into others once it has no inlined fields left of its own.

use refdoc_schemas::{Field, TypeGraph, TypeId, TypeIdentity, TypeShape};
use tracing::{debug, warn};

/// Upper bound on flattening rounds. Each round resolves at least one level
/// of nesting, so only cyclic embedding can reach it.
pub(crate) const MAX_INLINE_ROUNDS: usize = 100;

/// Flattens inlined fields across the graph.
///
/// Returns one `(embedded, embedding)` pair per successful inlining, to be
/// propagated through the reference index.
pub(crate) fn inline_types(
    graph: &mut TypeGraph,
) -> Vec<(TypeIdentity, TypeIdentity)> {
    let mut merges = Vec::new();

    for round in 1..=MAX_INLINE_ROUNDS {
        let pending: Vec<TypeId> = graph
            .ids()
            .filter(|&id| graph[id].has_inlined_fields())
            .collect();
        if pending.is_empty() {
            debug!(
                rounds = round - 1,
                merges = merges.len(),
                "inlined embedded types"
            );
            return merges;
        }

        let mut progressed = false;
        for id in pending {
            progressed |= inline_fields(graph, id, &mut merges);
        }
        if !progressed {
            warn!(
                types = %unresolved(graph),
                "embedded types could not be inlined; embedding is cyclic"
            );
            return merges;
        }
    }

    warn!(
        rounds = MAX_INLINE_ROUNDS,
        types = %unresolved(graph),
        "stopped inlining embedded types"
    );
    merges
}

/// Rewrites the field list of `id`. Returns true if anything changed.
fn inline_fields(
    graph: &mut TypeGraph,
    id: TypeId,
    merges: &mut Vec<(TypeIdentity, TypeIdentity)>,
) -> bool {
    let node = &graph[id];
    let mut changed = false;
    let mut fields = Vec::with_capacity(node.fields().len());

    for field in node.fields() {
        if !field.inlined {
            fields.push(field.clone());
            continue;
        }

        match struct_target(graph, field.type_id).map(|t| &graph[t]) {
            Some(embedded) if embedded.has_inlined_fields() => {
                // Wait until the embedded type is flat itself.
                fields.push(field.clone());
            }
            Some(embedded)
                if matches!(embedded.shape, TypeShape::Struct { .. }) =>
            {
                debug!(
                    parent = %node.identity,
                    embedded = %embedded.identity,
                    "inlining embedded fields"
                );
                fields.extend(embedded.fields().iter().cloned());
                merges.push((embedded.identity.clone(), node.identity.clone()));
                changed = true;
            }
            _ => {
                warn!(
                    parent = %node.identity,
                    field = %field.name,
                    ty = %graph.display_name(field.type_id),
                    "inlined field is not a struct; keeping it as is"
                );
                fields.push(Field {
                    inlined: false,
                    ..field.clone()
                });
                changed = true;
            }
        }
    }

    if changed {
        let shape = graph.get_mut(id).map(|n| &mut n.shape);
        if let Some(TypeShape::Struct { fields: slot }) = shape {
            *slot = fields;
        }
    }
    changed
}

/// Follows pointers from `id` to the type they point at.
fn struct_target(graph: &TypeGraph, mut id: TypeId) -> Option<TypeId> {
    loop {
        match graph[id].shape {
            TypeShape::Pointer { elem } => id = elem?,
            _ => return Some(id),
        }
    }
}

fn unresolved(graph: &TypeGraph) -> String {
    graph
        .iter()
        .filter(|(_, node)| node.has_inlined_fields())
        .map(|(_, node)| node.identity.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
