//! Discovery of API namespaces and their declared types.
//!
//! A package belongs to an API namespace when it carries the `groupName`
//! marker. Its version is the package's short name unless `versionName`
//! overrides it. Several packages may contribute to the same
//! namespace/version; the first one scanned provides the group's
//! documentation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use refdoc_schemas::{
    NamespaceVersion, NamespaceVersionGroup, RootKind, TypeGraph, TypeIdentity,
};
use regex::Regex;
use tracing::{debug, info};

use crate::config::CompiledConfig;
use crate::error::ExtractError;
use crate::provider::{PackageRef, SourceProvider};
use crate::resolver::Resolver;

/// Package marker naming the API namespace.
pub const GROUP_NAME_MARKER: &str = "groupName";

/// Package marker overriding the version.
pub const VERSION_NAME_MARKER: &str = "versionName";

/// Type marker flagging a root object.
pub const OBJECT_ROOT_MARKER: &str = "kubebuilder:object:root";

/// Package doc lines dropped from group documentation: marker lines and
/// license headers. Only an unindented `+` counts as a marker.
static IGNORED_DOC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:\+|copyright)").expect("doc filter pattern is valid")
});

#[derive(Debug, Default)]
struct ScannedGroup {
    doc: String,
    kinds: BTreeSet<String>,
    types: BTreeMap<String, TypeIdentity>,
}

/// Namespace/version groups found while scanning packages, keyed and
/// therefore ordered by namespace, then version.
#[derive(Debug, Default)]
pub(crate) struct NamespaceScan {
    groups: BTreeMap<NamespaceVersion, ScannedGroup>,
}

impl NamespaceScan {
    /// Scans every package the provider knows, resolving the declared types
    /// of those that belong to a namespace.
    pub(crate) fn scan<P: SourceProvider + ?Sized>(
        resolver: &mut Resolver<'_, P>,
    ) -> Result<Self, ExtractError> {
        let packages = resolver
            .provider
            .packages()
            .map_err(|e| ExtractError::provider(None, e))?;

        let mut scan = Self::default();
        for package in &packages {
            let Some(id) = namespace_version(resolver.provider, package) else {
                continue;
            };
            if resolver.config.ignores_group_version(&id) {
                debug!(group_version = %id, "skipping excluded group version");
                continue;
            }
            info!(
                package = %package.path,
                group_version = %id,
                "scanning package"
            );
            scan.scan_package(resolver, package, id)?;
        }
        Ok(scan)
    }

    fn scan_package<P: SourceProvider + ?Sized>(
        &mut self,
        resolver: &mut Resolver<'_, P>,
        package: &PackageRef,
        id: NamespaceVersion,
    ) -> Result<(), ExtractError> {
        let declared = resolver
            .provider
            .declared_types(&package.path)
            .map_err(|e| {
                ExtractError::provider(Some(package.path.as_str()), e)
            })?;

        let group = self
            .groups
            .entry(id.clone())
            .or_insert_with(|| ScannedGroup {
                doc: package_doc(resolver.provider, &package.path),
                ..ScannedGroup::default()
            });

        for info in declared {
            let identity = format!("{}.{}", package.path, info.name);
            if resolver.config.ignores_type(&identity) {
                debug!(ty = %identity, "skipping excluded type");
                continue;
            }
            if !info.exported {
                continue;
            }

            let Some(type_id) =
                resolver.resolve_declared(&package.path, &info.name)
            else {
                continue;
            };
            let identity = resolver.graph[type_id].identity.clone();
            group.types.insert(info.name.clone(), identity);

            if is_root(info.markers.get(OBJECT_ROOT_MARKER)) {
                group.kinds.insert(info.name.clone());
                resolver.node_mut(type_id).root_kind =
                    Some(RootKind::new(&id.namespace, &id.version, &info.name));
            }
        }
        Ok(())
    }

    /// Builds the output groups against the finished graph, dropping types
    /// matched by the exclusion policy.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::is_type_not_loaded`] if a declared type has
    /// no node in the graph.
    pub(crate) fn assemble(
        self,
        graph: &TypeGraph,
        config: &CompiledConfig,
    ) -> Result<Vec<NamespaceVersionGroup>, ExtractError> {
        let mut groups = Vec::with_capacity(self.groups.len());
        for (id, scanned) in self.groups {
            let mut group = NamespaceVersionGroup::new(&id, scanned.doc);
            group.kinds = scanned.kinds;
            for (name, identity) in scanned.types {
                if config.ignores_type(identity.as_str()) {
                    debug!(ty = %identity, "skipping excluded type");
                    continue;
                }
                let type_id = graph
                    .lookup(identity.as_str())
                    .ok_or_else(|| ExtractError::type_not_loaded(&identity))?;
                group.types.insert(name, type_id);
            }
            groups.push(group);
        }
        Ok(groups)
    }
}

fn namespace_version<P: SourceProvider + ?Sized>(
    provider: &P,
    package: &PackageRef,
) -> Option<NamespaceVersion> {
    let mut markers = provider.package_markers(&package.path);
    let namespace = markers.remove(GROUP_NAME_MARKER)?;
    let version = markers
        .remove(VERSION_NAME_MARKER)
        .unwrap_or_else(|| package.name.clone());
    Some(NamespaceVersion::new(namespace, version))
}

/// Root markers carry an optional boolean; only an explicit `false` opts out.
fn is_root(marker: Option<&String>) -> bool {
    marker.is_some_and(|value| value != "false")
}

fn package_doc<P: SourceProvider + ?Sized>(
    provider: &P,
    path: &str,
) -> String {
    provider
        .package_docs(path)
        .iter()
        .flat_map(|doc| doc.split('\n'))
        .filter(|line| !IGNORED_DOC_LINE.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::provider::{Descriptor, TypeInfo};
    use crate::snapshot::{Snapshot, SnapshotPackage};

    const API_V1: &str = "example.com/api/v1";
    const API_V2: &str = "example.com/api/v2";
    const OTHER: &str = "example.com/other/v1";
    const INTERNAL: &str = "example.com/internal";

    fn empty() -> Descriptor {
        Descriptor::structure(vec![])
    }

    fn root(name: &str, value: &str) -> TypeInfo {
        TypeInfo::new(name, empty()).with_marker(OBJECT_ROOT_MARKER, value)
    }

    fn snapshot() -> Snapshot {
        Snapshot::new()
            .with_package(
                API_V2,
                SnapshotPackage::new("v2")
                    .with_marker(GROUP_NAME_MARKER, "webapp.test")
                    .with_doc("Package v2 is the second version.\n")
                    .with_type(root("Guestbook", "")),
            )
            .with_package(
                API_V1,
                SnapshotPackage::new("v1")
                    .with_marker(GROUP_NAME_MARKER, "webapp.test")
                    .with_doc(
                        "Copyright 2024 The Authors.\n\
                         +kubebuilder:object:generate=true\n",
                    )
                    .with_doc(
                        "Package v1 contains API Schema definitions.\n\
                         +groupName=webapp.test\n",
                    )
                    .with_type(root("Guestbook", "true"))
                    .with_type(TypeInfo::new("GuestbookSpec", empty()))
                    .with_type(root("Scratch", "false"))
                    .with_type(root("helper", "").unexported()),
            )
            .with_package(
                OTHER,
                SnapshotPackage::new("other")
                    .with_marker(GROUP_NAME_MARKER, "alpha.test")
                    .with_marker(VERSION_NAME_MARKER, "v1beta1")
                    .with_doc("  +indented lines are not markers\n")
                    .with_type(TypeInfo::new("Widget", empty())),
            )
            .with_package(
                INTERNAL,
                SnapshotPackage::new("internal")
                    .with_type(TypeInfo::new("Cache", empty())),
            )
    }

    fn scan_snapshot(
        snapshot: &Snapshot,
        config: &CompiledConfig,
    ) -> (Vec<NamespaceVersionGroup>, TypeGraph) {
        let mut resolver = Resolver::new(snapshot, config);
        let scan = NamespaceScan::scan(&mut resolver).unwrap();
        let (graph, _) = resolver.finish();
        let groups = scan.assemble(&graph, config).unwrap();
        (groups, graph)
    }

    fn scan(
        config: &CompiledConfig,
    ) -> (Vec<NamespaceVersionGroup>, TypeGraph) {
        scan_snapshot(&snapshot(), config)
    }

    fn ids(groups: &[NamespaceVersionGroup]) -> Vec<String> {
        groups
            .iter()
            .map(|g| g.namespace_version().to_string())
            .collect()
    }

    #[test]
    fn test_groups_sorted_and_version_overridden() {
        let (groups, _) = scan(&CompiledConfig::default());
        assert_eq!(
            ids(&groups),
            ["alpha.test/v1beta1", "webapp.test/v1", "webapp.test/v2"]
        );
    }

    #[test]
    fn test_package_without_namespace_is_ignored() {
        let (_, graph) = scan(&CompiledConfig::default());
        assert_eq!(graph.lookup("example.com/internal.Cache"), None);
    }

    #[test]
    fn test_group_doc_drops_markers_and_copyright() {
        let (groups, _) = scan(&CompiledConfig::default());
        assert_eq!(
            groups[1].doc,
            "\nPackage v1 contains API Schema definitions.\n"
        );
        assert_eq!(groups[2].doc, "Package v2 is the second version.\n");
        assert_eq!(groups[0].doc, "  +indented lines are not markers\n");
    }

    #[test]
    fn test_kinds_and_root_identity() {
        let (groups, graph) = scan(&CompiledConfig::default());
        let v1 = &groups[1];
        assert_eq!(v1.kinds.iter().collect::<Vec<_>>(), ["Guestbook"]);
        assert_eq!(
            v1.types.keys().collect::<Vec<_>>(),
            ["Guestbook", "GuestbookSpec", "Scratch"]
        );

        let guestbook = &graph[v1.types["Guestbook"]];
        assert_eq!(
            guestbook.root_kind,
            Some(RootKind::new("webapp.test", "v1", "Guestbook"))
        );
        assert!(graph[v1.types["Scratch"]].root_kind.is_none());

        // Same name in another version is a different type.
        assert_ne!(groups[2].types["Guestbook"], v1.types["Guestbook"]);
    }

    #[test]
    fn test_unexported_type_is_skipped() {
        let (_, graph) = scan(&CompiledConfig::default());
        assert_eq!(graph.lookup("example.com/api/v1.helper"), None);
    }

    #[test]
    fn test_packages_sharing_group_version_are_merged() {
        const SPLIT: &str = "example.com/api/v1/extra";
        let snapshot = Snapshot::new()
            .with_package(
                API_V1,
                SnapshotPackage::new("v1")
                    .with_marker(GROUP_NAME_MARKER, "webapp.test")
                    .with_doc("Doc A\n")
                    .with_type(root("A", "")),
            )
            .with_package(
                SPLIT,
                SnapshotPackage::new("v1")
                    .with_marker(GROUP_NAME_MARKER, "webapp.test")
                    .with_doc("Doc B\n")
                    .with_type(root("B", "")),
            );
        let (groups, graph) =
            scan_snapshot(&snapshot, &CompiledConfig::default());

        assert_eq!(ids(&groups), ["webapp.test/v1"]);
        let group = &groups[0];
        assert_eq!(group.doc, "Doc A\n");
        assert_eq!(group.kinds.iter().collect::<Vec<_>>(), ["A", "B"]);
        assert_eq!(group.types.keys().collect::<Vec<_>>(), ["A", "B"]);
        assert_eq!(graph[group.types["B"]].package, SPLIT);
    }

    #[test]
    fn test_excluded_group_version_and_type() {
        let config = Config {
            ignore_group_versions: vec!["^webapp.test/v2$".into()],
            ignore_types: vec![r"\.GuestbookSpec$".into()],
            ..Config::default()
        }
        .compile()
        .unwrap();
        let (groups, graph) = scan(&config);

        assert_eq!(ids(&groups), ["alpha.test/v1beta1", "webapp.test/v1"]);
        assert!(!groups[1].types.contains_key("GuestbookSpec"));
        assert_eq!(graph.lookup("example.com/api/v1.GuestbookSpec"), None);
        assert_eq!(graph.lookup("example.com/api/v2.Guestbook"), None);
    }

    #[test]
    fn test_unknown_package_is_provider_error() {
        struct Broken;
        impl SourceProvider for Broken {
            fn packages(
                &self,
            ) -> Result<Vec<PackageRef>, crate::ProviderError> {
                Ok(vec![PackageRef {
                    path: "example.com/gone".into(),
                    name: "gone".into(),
                }])
            }
            fn declared_types(
                &self,
                package: &str,
            ) -> Result<Vec<TypeInfo>, crate::ProviderError> {
                Err(format!("cannot load {package}").into())
            }
            fn lookup_type(&self, _: &str, _: &str) -> Option<TypeInfo> {
                None
            }
            fn package_markers(&self, _: &str) -> crate::provider::Markers {
                let marker = GROUP_NAME_MARKER.to_owned();
                [(marker, "gone.test".to_owned())].into()
            }
            fn package_docs(&self, _: &str) -> Vec<String> {
                Vec::new()
            }
            fn resolve_import(&self, _: &str, _: &str) -> Option<String> {
                None
            }
        }

        let config = CompiledConfig::default();
        let mut resolver = Resolver::new(&Broken, &config);
        let err = NamespaceScan::scan(&mut resolver).unwrap_err();
        assert!(err.is_provider());
        assert!(err.to_string().contains("example.com/gone"));
    }
}
