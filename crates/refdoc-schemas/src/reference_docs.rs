//! Namespace/version grouping of resolved types.
//!
//! This is the shape handed to renderers: an ordered list of groups, each
//! naming the root kinds and the types declared for one namespace/version,
//! plus the [`TypeGraph`] those types live in.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{TypeGraph, TypeId, TypeNode};

/// A logical API namespace together with one of its versions.
///
/// Ordering is by namespace, then version, which is the order groups are
/// emitted in.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub struct NamespaceVersion {
    pub namespace: String,
    pub version: String,
}

impl NamespaceVersion {
    pub fn new(
        namespace: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for NamespaceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.version)
    }
}

/// Identity of a root object: the namespace/version it belongs to and the
/// kind name it is addressed by.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct RootKind {
    pub namespace: String,
    pub version: String,
    pub kind: String,
}

impl RootKind {
    pub fn new(
        namespace: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }
}

/// All types declared for one namespace/version.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
pub struct NamespaceVersionGroup {
    pub namespace: String,
    pub version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,

    /// Names of the root kinds declared in this group.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub kinds: BTreeSet<String>,

    /// Declared types by name, local to the group.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub types: BTreeMap<String, TypeId>,
}

impl NamespaceVersionGroup {
    pub fn new(id: &NamespaceVersion, doc: impl Into<String>) -> Self {
        Self {
            namespace: id.namespace.clone(),
            version: id.version.clone(),
            doc: doc.into(),
            kinds: BTreeSet::new(),
            types: BTreeMap::new(),
        }
    }

    pub fn namespace_version(&self) -> NamespaceVersion {
        NamespaceVersion::new(&self.namespace, &self.version)
    }
}

/// Output of an extraction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReferenceDocs {
    /// Groups sorted by namespace, then version.
    pub groups: Vec<NamespaceVersionGroup>,

    pub graph: TypeGraph,
}

impl ReferenceDocs {
    /// Finds the group for a namespace/version.
    pub fn group(
        &self,
        namespace: &str,
        version: &str,
    ) -> Option<&NamespaceVersionGroup> {
        self.groups
            .iter()
            .find(|g| g.namespace == namespace && g.version == version)
    }

    /// Looks up a declared type of a group by name.
    pub fn type_in(
        &self,
        group: &NamespaceVersionGroup,
        name: &str,
    ) -> Option<(TypeId, &TypeNode)> {
        let id = *group.types.get(name)?;
        self.graph.get(id).map(|node| (id, node))
    }
}
