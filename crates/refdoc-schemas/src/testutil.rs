//! Shared proptest strategies for schema tests.

use proptest::prelude::*;

use crate::{TypeGraph, TypeIdentity, TypeNode, TypeShape};

/// Strategy for generating arbitrary identifier-like type names.
pub fn arb_name() -> impl Strategy<Value = String> {
    "[A-Z][A-Za-z0-9]{0,11}"
}

/// Strategy for generating arbitrary package paths.
pub fn arb_package() -> impl Strategy<Value = String> {
    ("[a-z]{1,8}", "v[1-3]").prop_map(|(repo, v)| format!("{repo}.test/{v}"))
}

/// Strategy for generating graphs whose edges only point at earlier nodes.
///
/// Nodes are generated flat and then wired up by position, which keeps
/// every `TypeId` valid without recursive strategies.
pub fn arb_type_graph() -> impl Strategy<Value = TypeGraph> {
    prop::collection::btree_map(
        (arb_package(), arb_name()),
        (0..4u8, any::<bool>()),
        1..12,
    )
    .prop_map(|entries| {
        let mut graph = TypeGraph::new();
        for (i, ((package, name), (shape, imported))) in
            entries.into_iter().enumerate()
        {
            let previous = graph.ids().take(i).last();
            let mut node = TypeNode::new(
                TypeIdentity::new(format!("{package}.{name}")),
                name,
                package,
            );
            node.imported = imported;
            node.shape = match (shape, previous) {
                (1, Some(prev)) => TypeShape::Alias {
                    underlying: Some(prev),
                },
                (2, Some(prev)) => TypeShape::Slice { elem: Some(prev) },
                (3, _) => TypeShape::Struct { fields: Vec::new() },
                _ => TypeShape::Basic,
            };
            if let Some(prev) = previous {
                node.references.push(prev);
            }
            graph
                .insert(node)
                .expect("btree keys yield unique identities");
        }
        graph
    })
}
