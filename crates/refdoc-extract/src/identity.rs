//! Type identity and naming.
//!
//! Every descriptor has a fully qualified type string that serves as its
//! identity: `example.com/api/v1.Guestbook`, `*example.com/api/v1.Guestbook`,
//! `[]string`, `map[string]example.com/meta/v1.Time`. Identity depends only
//! on the descriptor, never on where it was reached from, so the same type
//! found through two different paths maps to one node.
//!
//! Display names are the same type string written relative to the package
//! being processed, with pointer/slice/array prefixes stripped.

use std::fmt::Write;

use refdoc_schemas::{TypeIdentity, TypeNode};

use crate::provider::Descriptor;

/// Returns the canonical identity of a descriptor.
pub fn identity_of(descriptor: &Descriptor) -> TypeIdentity {
    TypeIdentity::new(type_string(descriptor, None))
}

/// Renders a descriptor as a type string. Named types from `relative_to`
/// are written unqualified; all others are qualified with their package.
pub fn type_string(
    descriptor: &Descriptor,
    relative_to: Option<&str>,
) -> String {
    let mut out = String::new();
    write_type(&mut out, descriptor, relative_to);
    out
}

fn write_type(
    out: &mut String,
    descriptor: &Descriptor,
    relative_to: Option<&str>,
) {
    match descriptor {
        Descriptor::Basic { name } => out.push_str(name),
        Descriptor::Named { package, name } => {
            if relative_to != Some(package.as_str()) && !package.is_empty() {
                out.push_str(package);
                out.push('.');
            }
            out.push_str(name);
        }
        Descriptor::Pointer { elem } => {
            out.push('*');
            write_type(out, elem, relative_to);
        }
        Descriptor::Slice { elem } => {
            out.push_str("[]");
            write_type(out, elem, relative_to);
        }
        Descriptor::Array { len, elem } => {
            let _ = write!(out, "[{len}]");
            write_type(out, elem, relative_to);
        }
        Descriptor::Map { key, value } => {
            out.push_str("map[");
            write_type(out, key, relative_to);
            out.push(']');
            write_type(out, value, relative_to);
        }
        Descriptor::Struct { fields } => {
            out.push_str("struct{");
            for (i, field) in fields.iter().enumerate() {
                if i > 0 {
                    out.push_str("; ");
                }
                if !field.name.is_empty() {
                    out.push_str(&field.name);
                    out.push(' ');
                }
                match &field.ty {
                    Some(ty) => write_type(out, ty, relative_to),
                    None => out.push_str("invalid type"),
                }
                if let Some(tag) = &field.tag {
                    let _ = write!(out, " {tag:?}");
                }
            }
            out.push('}');
        }
        Descriptor::Interface => out.push_str("interface{}"),
        Descriptor::Other { text } => out.push_str(text),
        Descriptor::Unresolved => out.push_str("invalid type"),
    }
}

/// Strips pointer, slice and array wrappers.
fn element(mut descriptor: &Descriptor) -> &Descriptor {
    loop {
        match descriptor {
            Descriptor::Pointer { elem }
            | Descriptor::Slice { elem }
            | Descriptor::Array { elem, .. } => descriptor = elem,
            other => return other,
        }
    }
}

/// Identity and naming of a descriptor as seen from one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeHeader {
    pub identity: TypeIdentity,
    pub name: String,
    pub package: String,
    pub imported: bool,
}

impl TypeHeader {
    /// Derives the header of `descriptor` while processing `package`.
    ///
    /// A type whose innermost element is a named type from another package
    /// takes that package and the unqualified name, and is imported. Basic
    /// types and struct literals are never imported.
    pub fn new(package: &str, descriptor: &Descriptor) -> Self {
        let identity = identity_of(descriptor);
        match element(descriptor) {
            Descriptor::Named {
                package: defining,
                name,
            } if defining != package && !defining.is_empty() => Self {
                identity,
                name: name.clone(),
                package: defining.clone(),
                imported: true,
            },
            inner => Self {
                identity,
                name: type_string(inner, Some(package)),
                package: package.to_owned(),
                imported: false,
            },
        }
    }

    /// Creates an unresolved node carrying this header.
    pub fn into_node(self) -> TypeNode {
        let mut node = TypeNode::new(self.identity, self.name, self.package);
        node.imported = self.imported;
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::FieldDecl;

    const API: &str = "example.com/api/v1";
    const META: &str = "example.com/meta/v1";

    #[test]
    fn test_identity_is_fully_qualified() {
        let guestbook = Descriptor::named(API, "Guestbook");
        let list = Descriptor::slice(Descriptor::pointer(guestbook));
        assert_eq!(
            identity_of(&list).as_str(),
            "[]*example.com/api/v1.Guestbook"
        );

        let map = Descriptor::map(
            Descriptor::basic("string"),
            Descriptor::named(META, "Time"),
        );
        assert_eq!(
            identity_of(&map).as_str(),
            "map[string]example.com/meta/v1.Time"
        );

        let array = Descriptor::array(4, Descriptor::basic("byte"));
        assert_eq!(identity_of(&array).as_str(), "[4]byte");
    }

    #[test]
    fn test_identity_of_struct_literal() {
        let literal = Descriptor::structure(vec![
            FieldDecl::new("Name", Descriptor::basic("string"))
                .with_tag(r#"json:"name""#),
            FieldDecl::embedded(Descriptor::named(META, "ObjectMeta")),
        ]);
        assert_eq!(
            identity_of(&literal).as_str(),
            r#"struct{Name string "json:\"name\""; example.com/meta/v1.ObjectMeta}"#
        );
    }

    #[test]
    fn test_identity_is_independent_of_package() {
        let d = Descriptor::pointer(Descriptor::named(API, "Guestbook"));
        assert_eq!(
            TypeHeader::new(API, &d).identity,
            TypeHeader::new(META, &d).identity
        );
    }

    #[test]
    fn test_header_local_named() {
        let ptr = Descriptor::pointer(Descriptor::named(API, "Guestbook"));
        let header = TypeHeader::new(API, &ptr);
        assert_eq!(header.name, "Guestbook");
        assert_eq!(header.package, API);
        assert!(!header.imported);
    }

    #[test]
    fn test_header_imported_named() {
        let list = Descriptor::slice(Descriptor::named(META, "ObjectMeta"));
        let header = TypeHeader::new(API, &list);
        assert_eq!(header.name, "ObjectMeta");
        assert_eq!(header.package, META);
        assert!(header.imported);
    }

    #[test]
    fn test_header_basic_and_struct_never_imported() {
        let basic = TypeHeader::new(API, &Descriptor::basic("string"));
        assert_eq!(basic.name, "string");
        assert!(!basic.imported);

        let literal = Descriptor::structure(vec![FieldDecl::new(
            "At",
            Descriptor::named(META, "Time"),
        )]);
        let header = TypeHeader::new(API, &literal);
        assert!(!header.imported);
        assert_eq!(header.name, "struct{At example.com/meta/v1.Time}");
    }

    #[test]
    fn test_header_map_name_is_relative() {
        let map = Descriptor::map(
            Descriptor::basic("string"),
            Descriptor::named(API, "Rating"),
        );
        let header = TypeHeader::new(API, &map);
        assert_eq!(header.name, "map[string]Rating");
        assert!(!header.imported);
    }
}
