//! Recursive type resolution.
//!
//! The [`Resolver`] turns descriptors into nodes of a [`TypeGraph`]. It is
//! the single context object of a run: it owns the graph, the raw reference
//! edges and the set of provisional nodes, and is consumed by
//! [`Resolver::finish`] once every package has been scanned.
//!
//! ## Termination
//!
//! Two mechanisms keep resolution finite:
//!
//! 1. A node is inserted into the graph *before* its nested structure is
//!    resolved. Re-entering the same identity (a struct that points at
//!    itself, two structs that point at each other) hits the memo and
//!    returns the in-progress node.
//! 2. Indirection through pointer, slice, array, map and alias-underlying
//!    edges increments a depth counter. Past `max_depth` the node is left
//!    `Unknown`. Struct fields are resolved at the struct's own depth.
//!
//! A node left `Unknown` by the depth cutoff, or because its package could
//! not be located, is *provisional*. The next encounter at an admissible
//! depth resolves the same node in place, so an early deep path never
//! hides information from a later shallow one.

use std::collections::HashSet;

use refdoc_schemas::{TypeGraph, TypeId, TypeNode, TypeShape};
use tracing::{debug, warn};

use crate::config::CompiledConfig;
use crate::identity::TypeHeader;
use crate::provider::{Descriptor, FieldDecl, SourceProvider, TypeInfo};
use crate::references::ReferenceEdges;

/// Single-run resolution context.
pub(crate) struct Resolver<'a, P: SourceProvider + ?Sized> {
    pub(crate) provider: &'a P,
    pub(crate) config: &'a CompiledConfig,
    pub(crate) graph: TypeGraph,
    pub(crate) references: ReferenceEdges,
    provisional: HashSet<TypeId>,
}

impl<'a, P: SourceProvider + ?Sized> Resolver<'a, P> {
    pub(crate) fn new(provider: &'a P, config: &'a CompiledConfig) -> Self {
        Self {
            provider,
            config,
            graph: TypeGraph::new(),
            references: ReferenceEdges::default(),
            provisional: HashSet::new(),
        }
    }

    /// Ends the run, handing back the graph and the raw reference edges.
    pub(crate) fn finish(self) -> (TypeGraph, ReferenceEdges) {
        if !self.provisional.is_empty() {
            debug!(
                count = self.provisional.len(),
                "types left unresolved after depth cutoff or missing import"
            );
        }
        (self.graph, self.references)
    }

    /// Resolves the type declared as `name` in `package`.
    pub(crate) fn resolve_declared(
        &mut self,
        package: &str,
        name: &str,
    ) -> Option<TypeId> {
        self.resolve(package, None, &Descriptor::named(package, name), 0)
    }

    /// Resolves `descriptor`, seen from `package`, into a node.
    ///
    /// `parent` is the named type whose underlying representation is being
    /// resolved, if any. A struct literal under a parent is absorbed into
    /// it: the parent becomes the struct and `None` is returned.
    pub(crate) fn resolve(
        &mut self,
        package: &str,
        parent: Option<TypeId>,
        descriptor: &Descriptor,
        depth: usize,
    ) -> Option<TypeId> {
        if let (Descriptor::Struct { fields }, Some(parent)) =
            (descriptor, parent)
        {
            self.absorb_struct(package, parent, fields, depth);
            return None;
        }

        let header = TypeHeader::new(package, descriptor);
        let id = match self.graph.lookup(header.identity.as_str()) {
            Some(id)
                if self.provisional.contains(&id)
                    && depth <= self.config.max_depth =>
            {
                debug!(
                    identity = %header.identity,
                    depth,
                    "resolving provisional type"
                );
                self.provisional.remove(&id);
                id
            }
            Some(id) => return Some(id),
            None => self
                .graph
                .insert(header.into_node())
                .expect("identity was just looked up and is absent"),
        };

        if depth > self.config.max_depth {
            debug!(
                identity = %self.graph[id].identity,
                depth,
                "not loading type due to reaching max recursion depth"
            );
            self.provisional.insert(id);
            return Some(id);
        }

        debug!(
            package = %self.graph[id].package,
            name = %self.graph[id].name,
            "load"
        );

        let shape = match descriptor {
            Descriptor::Named {
                package: defining,
                name,
            } => {
                self.resolve_named(package, id, defining, name, depth);
                return Some(id);
            }
            Descriptor::Struct { .. } => {
                warn!(
                    package,
                    identity = %self.graph[id].identity,
                    "anonymous structs are not supported"
                );
                let node = self.node_mut(id);
                node.name.clear();
                node.package.clear();
                TypeShape::Unsupported
            }
            Descriptor::Pointer { elem } => {
                let elem = self.resolve(package, None, elem, depth + 1);
                self.inherit_package(id, elem);
                TypeShape::Pointer { elem }
            }
            Descriptor::Slice { elem } => {
                let elem = self.resolve(package, None, elem, depth + 1);
                self.inherit_package(id, elem);
                TypeShape::Slice { elem }
            }
            Descriptor::Array { len, elem } => {
                let elem = self.resolve(package, None, elem, depth + 1);
                self.inherit_package(id, elem);
                TypeShape::Array { elem, len: *len }
            }
            Descriptor::Map { key, value } => {
                let key = self.resolve(package, None, key, depth + 1);
                let value = self.resolve(package, None, value, depth + 1);
                self.inherit_package(id, value);
                TypeShape::Map { key, value }
            }
            Descriptor::Basic { .. } => {
                self.node_mut(id).package.clear();
                TypeShape::Basic
            }
            Descriptor::Interface => TypeShape::Interface,
            Descriptor::Other { .. } => TypeShape::Unsupported,
            Descriptor::Unresolved => {
                warn!(package, "failed to determine type");
                TypeShape::Unknown
            }
        };

        self.node_mut(id).shape = shape;
        Some(id)
    }

    /// Resolves a named type: switches to its defining package, attaches
    /// documentation and resolves the underlying representation with the
    /// named node as parent.
    fn resolve_named(
        &mut self,
        package: &str,
        id: TypeId,
        defining: &str,
        name: &str,
        depth: usize,
    ) {
        let active = if defining == package || defining.is_empty() {
            package.to_owned()
        } else {
            match self.provider.resolve_import(package, defining) {
                Some(imported) => imported,
                None => {
                    warn!(
                        name,
                        package = defining,
                        "imported type cannot be found"
                    );
                    self.provisional.insert(id);
                    return;
                }
            }
        };

        let Some(info) = self.provider.lookup_type(&active, name) else {
            warn!(name, package = %active, "type declaration not found");
            return;
        };

        self.attach_doc(id, &info);

        // The underlying call overwrites this when it absorbs a struct.
        self.node_mut(id).shape = TypeShape::Alias { underlying: None };

        let underlying =
            self.resolve(&active, Some(id), &info.underlying, depth + 1);
        if let Some(underlying) = underlying {
            if let TypeShape::Alias { underlying: slot } =
                &mut self.node_mut(id).shape
            {
                *slot = Some(underlying);
            }
            self.references.add_reference(id, underlying);
        }
    }

    /// Turns `parent` into a struct and extracts its fields.
    fn absorb_struct(
        &mut self,
        package: &str,
        parent: TypeId,
        fields: &[FieldDecl],
        depth: usize,
    ) {
        if depth > self.config.max_depth {
            debug!(
                identity = %self.graph[parent].identity,
                depth,
                "not loading struct fields due to reaching max recursion depth"
            );
            self.node_mut(parent).shape = TypeShape::Unknown;
            self.provisional.insert(parent);
            return;
        }

        self.node_mut(parent).shape = TypeShape::Struct { fields: Vec::new() };
        self.extract_fields(package, parent, fields, depth);
    }

    fn attach_doc(&mut self, id: TypeId, info: &TypeInfo) {
        let doc = match (&info.raw_doc, &info.doc) {
            // Raw text keeps multi-line formatting and indentation.
            (Some(raw), _) if self.config.use_raw_docstring => {
                Some(raw.strip_suffix('\n').unwrap_or(raw).to_owned())
            }
            (_, doc) => doc.clone(),
        };
        self.node_mut(id).doc = doc;
    }

    /// Pointers, slices and maps live in the package of their element.
    fn inherit_package(&mut self, id: TypeId, elem: Option<TypeId>) {
        if let Some(elem) = elem {
            let package = self.graph[elem].package.clone();
            self.node_mut(id).package = package;
        }
    }

    pub(crate) fn node_mut(&mut self, id: TypeId) -> &mut TypeNode {
        self.graph
            .get_mut(id)
            .expect("ids handed out by this graph are always valid")
    }
}
