//! Struct field extraction.

use refdoc_schemas::{Field, TypeId, TypeShape};
use tracing::debug;

use crate::identity::TypeHeader;
use crate::provider::{FieldDecl, SourceProvider};
use crate::resolver::Resolver;

impl<P: SourceProvider + ?Sized> Resolver<'_, P> {
    /// Appends the fields of `struct_id`, in declaration order.
    ///
    /// Field types are resolved at the struct's own depth. A field is
    /// skipped when its type is unknown to the provider or when it matches
    /// the field exclusion policy; excluded fields are never resolved.
    pub(crate) fn extract_fields(
        &mut self,
        package: &str,
        struct_id: TypeId,
        decls: &[FieldDecl],
        depth: usize,
    ) {
        let struct_identity = self.graph[struct_id].identity.clone();
        debug!(package, parent = %struct_identity, "processing struct fields");

        for decl in decls {
            let Some(ty) = &decl.ty else {
                debug!(field = %decl.name, "failed to determine type of field");
                continue;
            };

            let embedded = decl.name.is_empty();
            let tag_name = decl.serialized_name();
            let inlined = embedded && tag_name.is_none();
            let name = match tag_name {
                Some(name) => name,
                None if embedded => TypeHeader::new(package, ty).name,
                None => decl.name.clone(),
            };

            if self.config.ignores_field(struct_identity.as_str(), &name) {
                debug!(
                    parent = %struct_identity,
                    field = %name,
                    "skipping excluded field"
                );
                continue;
            }

            debug!(field = %name, "loading field type");
            let Some(type_id) = self.resolve(package, None, ty, depth) else {
                debug!(field = %name, "failed to load type for field");
                continue;
            };

            // Types reached as a field are documented where they are used.
            self.node_mut(type_id).imported = false;

            if let TypeShape::Struct { fields } =
                &mut self.node_mut(struct_id).shape
            {
                fields.push(Field {
                    name,
                    doc: decl.doc.clone(),
                    type_id,
                    embedded,
                    inlined,
                });
            }
            self.references.add_reference(struct_id, type_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use refdoc_schemas::{TypeGraph, TypeKind, TypeNode};

    use super::*;
    use crate::config::{CompiledConfig, Config};
    use crate::provider::{Descriptor, TypeInfo};
    use crate::snapshot::{Snapshot, SnapshotPackage};

    const API: &str = "example.com/api/v1";
    const META: &str = "example.com/meta/v1";

    fn snapshot(fields: Vec<FieldDecl>) -> Snapshot {
        Snapshot::new()
            .with_package(
                API,
                SnapshotPackage::new("v1")
                    .with_import(META)
                    .with_type(TypeInfo::new(
                        "Guestbook",
                        Descriptor::structure(fields),
                    ))
                    .with_type(TypeInfo::new(
                        "Spec",
                        Descriptor::structure(vec![FieldDecl::new(
                            "Page",
                            Descriptor::basic("int32"),
                        )]),
                    )),
            )
            .with_package(
                META,
                SnapshotPackage::new("v1")
                    .with_type(TypeInfo::new(
                        "TypeMeta",
                        Descriptor::structure(vec![
                            FieldDecl::new("Kind", Descriptor::basic("string"))
                                .with_tag(r#"json:"kind,omitempty""#),
                        ]),
                    ))
                    .with_type(TypeInfo::new(
                        "ObjectMeta",
                        Descriptor::structure(vec![]),
                    )),
            )
    }

    fn guestbook(
        snapshot: &Snapshot,
        config: &CompiledConfig,
    ) -> (TypeGraph, TypeId) {
        let mut resolver = Resolver::new(snapshot, config);
        let id = resolver.resolve_declared(API, "Guestbook").unwrap();
        let (graph, _) = resolver.finish();
        (graph, id)
    }

    fn field_names(node: &TypeNode) -> Vec<&str> {
        node.fields().iter().map(|f| f.name.as_str()).collect()
    }

    fn standard_fields() -> Vec<FieldDecl> {
        vec![
            FieldDecl::embedded(Descriptor::named(META, "TypeMeta"))
                .with_tag(r#"json:",inline""#),
            FieldDecl::embedded(Descriptor::named(META, "ObjectMeta"))
                .with_tag(r#"json:"metadata,omitempty""#),
            FieldDecl::new("Spec", Descriptor::named(API, "Spec"))
                .with_tag(r#"json:"spec,omitempty""#)
                .with_doc("Spec is the desired state."),
            FieldDecl::new(
                "Notes",
                Descriptor::pointer(Descriptor::basic("string")),
            ),
            FieldDecl::untyped("Broken"),
        ]
    }

    #[test]
    fn test_field_names_and_flags() {
        let snapshot = snapshot(standard_fields());
        let config = CompiledConfig::default();
        let (graph, id) = guestbook(&snapshot, &config);
        let node = &graph[id];

        assert_eq!(
            field_names(node),
            ["TypeMeta", "metadata", "spec", "Notes"]
        );

        let [type_meta, object_meta, spec, notes] = node.fields() else {
            panic!("expected four fields");
        };
        assert!(type_meta.embedded && type_meta.inlined);
        assert!(object_meta.embedded && !object_meta.inlined);
        assert!(!spec.embedded && !spec.inlined);
        assert_eq!(spec.doc.as_deref(), Some("Spec is the desired state."));
        assert_eq!(graph[notes.type_id].kind(), TypeKind::Pointer);
    }

    #[test]
    fn test_field_types_are_not_imported() {
        let snapshot = snapshot(standard_fields());
        let config = CompiledConfig::default();
        let (graph, id) = guestbook(&snapshot, &config);

        let object_meta = &graph[graph[id].fields()[1].type_id];
        assert_eq!(object_meta.package, META);
        assert!(!object_meta.imported);
    }

    #[test]
    fn test_excluded_field_is_never_resolved() {
        let snapshot = snapshot(standard_fields());
        let config = Config {
            ignore_fields: vec![r"\.spec$".into(), "TypeMeta$".into()],
            ..Config::default()
        }
        .compile()
        .unwrap();
        let (graph, id) = guestbook(&snapshot, &config);

        assert_eq!(field_names(&graph[id]), ["metadata", "Notes"]);
        assert_eq!(graph.lookup("example.com/api/v1.Spec"), None);
        assert_eq!(graph.lookup("example.com/meta/v1.TypeMeta"), None);
    }

    #[test]
    fn test_field_exclusion_is_scoped_to_owning_type() {
        let snapshot = snapshot(standard_fields());
        let config = Config {
            ignore_fields: vec![r"^example\.com/api/v1\.Spec\.Page$".into()],
            ..Config::default()
        }
        .compile()
        .unwrap();
        let (graph, id) = guestbook(&snapshot, &config);

        let spec = &graph[graph[id].fields()[2].type_id];
        assert!(spec.fields().is_empty());
        assert_eq!(field_names(&graph[id]).len(), 4);
    }

    #[test]
    fn test_fields_record_references() {
        let snapshot = snapshot(standard_fields());
        let config = CompiledConfig::default();
        let mut resolver = Resolver::new(&snapshot, &config);
        resolver.resolve_declared(API, "Guestbook").unwrap();
        let (graph, edges) = resolver.finish();
        let index = edges.index(&graph);

        let parents: Vec<_> = index
            .parents_of("example.com/api/v1.Spec")
            .map(|p| p.as_str())
            .collect();
        assert_eq!(parents, ["example.com/api/v1.Guestbook"]);
    }
}
