//! Type graph schema for representing resolved type definitions.
//!
//! The type graph holds one [`TypeNode`] per distinct type identity seen
//! during extraction. Nodes live in an arena and refer to each other by
//! [`TypeId`], so every edge (field types, element types, map keys and
//! values, back-references) points at the single canonical node for that
//! identity. Cycles in the source types are plain index cycles here.
//!
//! ## Terminology
//!
//! - **Identity**: the fully qualified type string reported by the source
//!   provider (e.g. `example.com/api/v1.Guestbook`, `[]string`). Two
//!   descriptors with the same identity are the same type.
//! - **Package**: the package-equivalent scope that defines a type. Basic
//!   types have no package.
//! - **Reference**: a type that contains this type, directly or through
//!   pointer/slice/map wrapping. Computed, never authored.

use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use crate::RootKind;

/// Dense index of a node in a [`TypeGraph`].
///
/// Ids are assigned in insertion order and are only meaningful for the
/// graph that produced them.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(transparent)]
pub struct TypeId(usize);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Canonical identity of a type: its fully qualified type string.
///
/// Serializes transparently as a plain string.
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
#[serde(transparent)]
pub struct TypeIdentity(String);

impl TypeIdentity {
    /// Creates an identity from a type string.
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    /// Returns the underlying string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::borrow::Borrow<str> for TypeIdentity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Payload-free tag of a [`TypeShape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Basic,
    Struct,
    Alias,
    Pointer,
    Slice,
    Array,
    Map,
    Interface,
    Unsupported,
    Unknown,
}

impl TypeKind {
    /// Returns true for kinds that can appear as targets of reference
    /// edges. Everything else is either a primitive or opaque.
    pub fn is_reference_target(self) -> bool {
        matches!(self, TypeKind::Alias | TypeKind::Struct)
    }
}

/// Kind of a type together with its kind-specific payload.
///
/// Element and key/value ids are optional because resolution of a nested
/// type can be absorbed (a named struct) or fail without aborting the run.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeShape {
    /// A primitive such as `string` or `int32`.
    Basic,

    /// A struct with its fields in declaration order.
    Struct {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        fields: Vec<Field>,
    },

    /// A named type defined over another type.
    Alias {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        underlying: Option<TypeId>,
    },

    Pointer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        elem: Option<TypeId>,
    },

    Slice {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        elem: Option<TypeId>,
    },

    Array {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        elem: Option<TypeId>,
        len: u64,
    },

    Map {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<TypeId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<TypeId>,
    },

    Interface,

    /// A type that cannot be rendered as a referenceable entity, such as an
    /// anonymous struct or a function type.
    Unsupported,

    /// A type whose structure could not be determined.
    #[default]
    Unknown,
}

impl TypeShape {
    /// Returns the payload-free kind tag.
    pub fn kind(&self) -> TypeKind {
        match self {
            TypeShape::Basic => TypeKind::Basic,
            TypeShape::Struct { .. } => TypeKind::Struct,
            TypeShape::Alias { .. } => TypeKind::Alias,
            TypeShape::Pointer { .. } => TypeKind::Pointer,
            TypeShape::Slice { .. } => TypeKind::Slice,
            TypeShape::Array { .. } => TypeKind::Array,
            TypeShape::Map { .. } => TypeKind::Map,
            TypeShape::Interface => TypeKind::Interface,
            TypeShape::Unsupported => TypeKind::Unsupported,
            TypeShape::Unknown => TypeKind::Unknown,
        }
    }
}

/// A struct member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Field {
    /// Display name: the serialization name when one is declared, otherwise
    /// the declared name, otherwise (for embedded members) the type name.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    #[serde(rename = "type")]
    pub type_id: TypeId,

    /// The member was declared without a field name.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub embedded: bool,

    /// The member is embedded and has no serialization name either, so its
    /// own fields belong to the enclosing struct.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub inlined: bool,
}

/// One distinct type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TypeNode {
    pub identity: TypeIdentity,

    /// Type name relative to its package. Empty for anonymous structs.
    pub name: String,

    /// Defining package. Empty for basic types and anonymous structs.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub package: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    #[serde(flatten)]
    pub shape: TypeShape,

    /// Present when the type is marked as a root object of a
    /// namespace/version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_kind: Option<RootKind>,

    /// Types that contain this type, sorted by identity.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<TypeId>,

    /// The type is defined outside the package being processed when it was
    /// first seen.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub imported: bool,
}

impl TypeNode {
    /// Creates a node of unknown shape.
    pub fn new(
        identity: TypeIdentity,
        name: impl Into<String>,
        package: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            name: name.into(),
            package: package.into(),
            doc: None,
            shape: TypeShape::Unknown,
            root_kind: None,
            references: Vec::new(),
            imported: false,
        }
    }

    pub fn kind(&self) -> TypeKind {
        self.shape.kind()
    }

    /// Struct fields, or an empty slice for every other kind.
    pub fn fields(&self) -> &[Field] {
        match &self.shape {
            TypeShape::Struct { fields } => fields,
            _ => &[],
        }
    }

    /// The wrapped type of an alias, pointer, slice or array.
    pub fn underlying(&self) -> Option<TypeId> {
        match self.shape {
            TypeShape::Alias { underlying } => underlying,
            TypeShape::Pointer { elem }
            | TypeShape::Slice { elem }
            | TypeShape::Array { elem, .. } => elem,
            _ => None,
        }
    }

    /// Returns true if any field is still waiting to be inlined.
    pub fn has_inlined_fields(&self) -> bool {
        self.fields().iter().any(|f| f.inlined)
    }
}

/// Error returned when a second node is inserted for an identity that the
/// graph already holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateIdentity(pub TypeIdentity);

impl fmt::Display for DuplicateIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type graph already contains a node for {}", self.0)
    }
}

impl std::error::Error for DuplicateIdentity {}

/// Arena of type nodes with an identity index.
///
/// The graph enforces the "one node per identity" invariant: the only way
/// to add a node is [`TypeGraph::insert`], which refuses duplicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, JsonSchema)]
pub struct TypeGraph {
    nodes: Vec<TypeNode>,

    #[serde(skip)]
    index: HashMap<TypeIdentity, TypeId>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from nodes in id order, rebuilding the identity index.
    pub fn from_nodes(
        nodes: Vec<TypeNode>,
    ) -> Result<Self, DuplicateIdentity> {
        let mut graph = Self::new();
        for node in nodes {
            graph.insert(node)?;
        }
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a node and returns its id.
    pub fn insert(
        &mut self,
        node: TypeNode,
    ) -> Result<TypeId, DuplicateIdentity> {
        if self.index.contains_key(&node.identity) {
            return Err(DuplicateIdentity(node.identity));
        }
        let id = TypeId(self.nodes.len());
        self.index.insert(node.identity.clone(), id);
        self.nodes.push(node);
        Ok(id)
    }

    /// Looks up the node id for an identity.
    pub fn lookup(&self, identity: &str) -> Option<TypeId> {
        self.index.get(identity).copied()
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeNode> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: TypeId) -> Option<&mut TypeNode> {
        self.nodes.get_mut(id.0)
    }

    /// Iterates nodes in id order.
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (TypeId(i), n))
    }

    pub fn ids(&self) -> impl Iterator<Item = TypeId> + use<> {
        (0..self.nodes.len()).map(TypeId)
    }

    /// Returns true if a renderer should emit a section for this type:
    /// it is a root object or something refers to it.
    pub fn is_renderable(&self, id: TypeId) -> bool {
        let node = &self[id];
        node.root_kind.is_some() || !node.references.is_empty()
    }

    /// Renders the type as it reads in a field table, following element
    /// and key/value edges (`[]Foo`, `map[string]Bar`, `*Baz`).
    pub fn display_name(&self, id: TypeId) -> String {
        let node = &self[id];
        let inner = |elem: Option<TypeId>| {
            elem.map(|e| self.display_name(e))
                .unwrap_or_else(|| node.name.clone())
        };
        match &node.shape {
            TypeShape::Pointer { elem } => format!("*{}", inner(*elem)),
            TypeShape::Slice { elem } => format!("[]{}", inner(*elem)),
            TypeShape::Array { elem, len } => {
                format!("[{len}]{}", inner(*elem))
            }
            TypeShape::Map { key, value } => match (key, value) {
                (Some(k), Some(v)) => format!(
                    "map[{}]{}",
                    self.display_name(*k),
                    self.display_name(*v)
                ),
                _ => node.name.clone(),
            },
            _ => node.name.clone(),
        }
    }
}

impl Index<TypeId> for TypeGraph {
    type Output = TypeNode;

    fn index(&self, id: TypeId) -> &TypeNode {
        &self.nodes[id.0]
    }
}

impl<'de> Deserialize<'de> for TypeGraph {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Nodes {
            nodes: Vec<TypeNode>,
        }

        let Nodes { nodes } = Nodes::deserialize(deserializer)?;
        Self::from_nodes(nodes).map_err(serde::de::Error::custom)
    }
}
