//! Interface to the source-analysis provider.
//!
//! Extraction never reads source text. Everything it knows about packages,
//! type declarations, documentation and markers comes through
//! [`SourceProvider`]. The provider may do I/O (loading packages on demand);
//! from the resolver's perspective every call is synchronous.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Marker annotations on a package or type, by marker name.
pub type Markers = BTreeMap<String, String>;

/// A package known to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    /// Import path, unique per package.
    pub path: String,
    /// Short package name. Used as the version when no override marker
    /// is present.
    pub name: String,
}

/// Raw type descriptor as reported by the provider.
///
/// A named type is referenced by package and name only. Its underlying
/// representation is looked up on demand with
/// [`SourceProvider::lookup_type`], which keeps recursive types finite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Descriptor {
    Basic {
        name: String,
    },
    Named {
        package: String,
        name: String,
    },
    Pointer {
        elem: Box<Descriptor>,
    },
    Slice {
        elem: Box<Descriptor>,
    },
    Array {
        len: u64,
        elem: Box<Descriptor>,
    },
    Map {
        key: Box<Descriptor>,
        value: Box<Descriptor>,
    },
    /// A struct literal.
    Struct {
        #[serde(default)]
        fields: Vec<FieldDecl>,
    },
    Interface,
    /// Any other type (functions, channels, ...), by its type string.
    Other {
        text: String,
    },
    /// The provider could not determine the type.
    Unresolved,
}

impl Descriptor {
    pub fn basic(name: impl Into<String>) -> Self {
        Self::Basic { name: name.into() }
    }

    pub fn named(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Named {
            package: package.into(),
            name: name.into(),
        }
    }

    pub fn pointer(elem: Descriptor) -> Self {
        Self::Pointer {
            elem: Box::new(elem),
        }
    }

    pub fn slice(elem: Descriptor) -> Self {
        Self::Slice {
            elem: Box::new(elem),
        }
    }

    pub fn array(len: u64, elem: Descriptor) -> Self {
        Self::Array {
            len,
            elem: Box::new(elem),
        }
    }

    pub fn map(key: Descriptor, value: Descriptor) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn structure(fields: Vec<FieldDecl>) -> Self {
        Self::Struct { fields }
    }
}

/// A member of a struct literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    /// Declared name. Empty for embedded members.
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    /// Declared type, or `None` when the provider could not type it.
    #[serde(rename = "type", default)]
    pub ty: Option<Descriptor>,

    /// Raw struct tag, e.g. `json:"name,omitempty"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: Descriptor) -> Self {
        Self {
            name: name.into(),
            doc: None,
            ty: Some(ty),
            tag: None,
        }
    }

    /// An embedded member: no declared name.
    pub fn embedded(ty: Descriptor) -> Self {
        Self::new("", ty)
    }

    /// A member whose type the provider could not determine.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            ty: None,
            tag: None,
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// The name from the serialization tag (`json:"name,..."`), if present
    /// and non-empty.
    pub fn serialized_name(&self) -> Option<String> {
        let value = tag_lookup(self.tag.as_deref()?, SERIALIZATION_TAG_KEY)?;
        let name = value.split(',').next().unwrap_or_default();
        (!name.is_empty()).then(|| name.to_owned())
    }
}

/// Tag key holding the serialized field name.
pub const SERIALIZATION_TAG_KEY: &str = "json";

/// A type declaration in a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub name: String,

    /// Underlying representation of the declared type.
    pub underlying: Descriptor,

    #[serde(default = "exported_by_default")]
    pub exported: bool,

    /// Documentation with comment markers and marker lines removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    /// Documentation exactly as written, keeping line breaks and indentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_doc: Option<String>,

    #[serde(default, skip_serializing_if = "Markers::is_empty")]
    pub markers: Markers,
}

fn exported_by_default() -> bool {
    true
}

impl TypeInfo {
    pub fn new(name: impl Into<String>, underlying: Descriptor) -> Self {
        Self {
            name: name.into(),
            underlying,
            exported: true,
            doc: None,
            raw_doc: None,
            markers: Markers::new(),
        }
    }

    #[must_use]
    pub fn unexported(mut self) -> Self {
        self.exported = false;
        self
    }

    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    #[must_use]
    pub fn with_raw_doc(mut self, raw: impl Into<String>) -> Self {
        self.raw_doc = Some(raw.into());
        self
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
}

/// Source of packages, type declarations and annotations.
pub trait SourceProvider {
    /// Enumerates all packages to scan.
    fn packages(&self) -> Result<Vec<PackageRef>, ProviderError>;

    /// Lists the type declarations of a package in declaration order.
    fn declared_types(
        &self,
        package: &str,
    ) -> Result<Vec<TypeInfo>, ProviderError>;

    /// Looks up one type declaration.
    fn lookup_type(&self, package: &str, name: &str) -> Option<TypeInfo>;

    /// Package-level markers, such as the namespace name.
    fn package_markers(&self, package: &str) -> Markers;

    /// Package documentation comments, one entry per source file that has
    /// one.
    fn package_docs(&self, package: &str) -> Vec<String>;

    /// Resolves an import of `package` to the imported package's path.
    /// Returns `None` when the import cannot be located.
    fn resolve_import(&self, package: &str, import_path: &str)
    -> Option<String>;
}

/// Looks up `key` in a conventional struct tag (`k1:"v1" k2:"v2"`).
///
/// Returns the unquoted value, or `None` if the key is absent or the tag is
/// malformed before the key is reached.
pub fn tag_lookup(tag: &str, key: &str) -> Option<String> {
    let mut rest = tag;
    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            return None;
        }

        // Key runs up to ':' and may not contain spaces, quotes or controls.
        let colon = rest.find(|c: char| {
            c == ':' || c == ' ' || c == '"' || c.is_control()
        })?;
        if colon == 0 || !rest[colon..].starts_with(":\"") {
            return None;
        }
        let name = &rest[..colon];
        rest = &rest[colon + 1..];

        let (value, remainder) = split_quoted(rest)?;
        if name == key {
            return Some(value);
        }
        rest = remainder;
    }
}

/// Splits a leading double-quoted string off `text`, returning the
/// unescaped contents and the text after the closing quote.
fn split_quoted(text: &str) -> Option<(String, &str)> {
    let mut chars = text.char_indices();
    if chars.next() != Some((0, '"')) {
        return None;
    }

    let mut value = String::new();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((value, &text[i + 1..])),
            '\\' => {
                let (_, escaped) = chars.next()?;
                value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
            }
            other => value.push(other),
        }
    }
    None
}
