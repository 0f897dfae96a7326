//! In-memory source provider.
//!
//! A [`Snapshot`] is a serialized dump of everything the resolver needs
//! from a source tree: packages keyed by import path, their markers, doc
//! comments, imports and type declarations. Snapshots are written by a
//! language-specific front end and read here as JSON:
//!
//! ```json
//! {
//!   "packages": {
//!     "example.com/api/v1": {
//!       "name": "v1",
//!       "markers": { "groupName": "webapp.test" },
//!       "imports": ["example.com/meta/v1"],
//!       "types": [
//!         {
//!           "name": "Rating",
//!           "underlying": { "kind": "basic", "name": "string" }
//!         }
//!       ]
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::provider::{Markers, PackageRef, SourceProvider, TypeInfo};

/// One package of a [`Snapshot`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotPackage {
    /// Short package name.
    pub name: String,

    #[serde(default, skip_serializing_if = "Markers::is_empty")]
    pub markers: Markers,

    /// Package doc comments, one per file.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<String>,

    /// Import paths this package may reference.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,

    /// Type declarations in declaration order.
    #[serde(default)]
    pub types: Vec<TypeInfo>,
}

impl SnapshotPackage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_marker(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.markers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.docs.push(doc.into());
        self
    }

    #[must_use]
    pub fn with_import(mut self, path: impl Into<String>) -> Self {
        self.imports.push(path.into());
        self
    }

    #[must_use]
    pub fn with_type(mut self, info: TypeInfo) -> Self {
        self.types.push(info);
        self
    }
}

/// Source provider backed by a fully materialized package dump.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Packages by import path. Enumerated in path order.
    pub packages: BTreeMap<String, SnapshotPackage>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_package(
        mut self,
        path: impl Into<String>,
        package: SnapshotPackage,
    ) -> Self {
        self.packages.insert(path.into(), package);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(reader)
    }

    fn package(&self, path: &str) -> Option<&SnapshotPackage> {
        self.packages.get(path)
    }
}

impl SourceProvider for Snapshot {
    fn packages(&self) -> Result<Vec<PackageRef>, ProviderError> {
        Ok(self
            .packages
            .iter()
            .map(|(path, pkg)| PackageRef {
                path: path.clone(),
                name: pkg.name.clone(),
            })
            .collect())
    }

    fn declared_types(
        &self,
        package: &str,
    ) -> Result<Vec<TypeInfo>, ProviderError> {
        self.package(package)
            .map(|pkg| pkg.types.clone())
            .ok_or_else(|| {
                format!("package {package} is not in the snapshot").into()
            })
    }

    fn lookup_type(&self, package: &str, name: &str) -> Option<TypeInfo> {
        self.package(package)?
            .types
            .iter()
            .find(|t| t.name == name)
            .cloned()
    }

    fn package_markers(&self, package: &str) -> Markers {
        self.package(package)
            .map(|pkg| pkg.markers.clone())
            .unwrap_or_default()
    }

    fn package_docs(&self, package: &str) -> Vec<String> {
        self.package(package)
            .map(|pkg| pkg.docs.clone())
            .unwrap_or_default()
    }

    fn resolve_import(
        &self,
        package: &str,
        import_path: &str,
    ) -> Option<String> {
        let importer = self.package(package)?;
        if !importer.imports.iter().any(|i| i == import_path) {
            return None;
        }
        self.package(import_path).map(|_| import_path.to_owned())
    }
}
