//! Cycle-safe walking over a declaration graph.
//!
//! Declarations refer to each other by [`NamedType`] references, so the graph
//! formed by following linked references can contain cycles (a struct holding
//! a pointer to itself, two structs pointing at each other). Every walk here
//! carries an explicit visited set keyed by [`DeclHash`]; a node seen before is
//! represented by its name instead of being expanded again.
//!
//! Unresolved references are leaves: nothing here looks a name up on its own.

use std::fmt::Write;

use rustc_hash::FxHashSet;

use crate::{
    BuiltinType, DeclCategory, DeclHash, DeclKey, DefinedType, NamedType, NativeRecord,
    NativeType, NativeTypeDef, ResolvedTarget, TypeRef,
};

/// A declaration reached through a linked reference.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Typedef(&'a NativeTypeDef),
    Defined(&'a DefinedType),
}

impl<'a> NodeRef<'a> {
    pub fn name(&self) -> &'a str {
        match *self {
            NodeRef::Typedef(td) => &td.name,
            NodeRef::Defined(DefinedType::Struct(r) | DefinedType::Union(r)) => &r.name,
            NodeRef::Defined(DefinedType::Enum(e)) => &e.name,
        }
    }
}

/// Read access to committed typedefs and defined types by name.
pub trait DeclarationLookup {
    fn typedef(&self, name: &str) -> Option<&NativeTypeDef>;

    fn defined_type(&self, name: &str) -> Option<&DefinedType>;

    fn node(&self, key: &DeclKey) -> Option<NodeRef<'_>> {
        match key.category {
            DeclCategory::Typedef => self.typedef(&key.name).map(NodeRef::Typedef),
            DeclCategory::DefinedType => self.defined_type(&key.name).map(NodeRef::Defined),
            DeclCategory::Constant | DeclCategory::Procedure => None,
        }
    }

    /// Follow a linked reference; `None` when unresolved or dangling.
    fn follow(&self, named: &NamedType) -> Option<NodeRef<'_>> {
        match &named.target {
            TypeRef::Resolved(ResolvedTarget::Decl(key)) => self.node(key),
            _ => None,
        }
    }
}

// ============================================================================
// Canonicalization
// ============================================================================

/// What a type ultimately denotes once typedef chains are unwrapped.
#[derive(Debug, Clone, Copy)]
pub enum CanonicalKind<'a> {
    Builtin(BuiltinType),
    Defined(&'a DefinedType),
    /// A structural node: pointer, array, function pointer or inline body.
    Type(&'a NativeType),
    /// An unresolved or dangling reference, by name.
    Unresolved(&'a str),
    /// A typedef chain that loops back on itself.
    Cycle(&'a str),
}

/// The result of unwrapping a type.
#[derive(Debug, Clone, Copy)]
pub struct Canonical<'a> {
    pub kind: CanonicalKind<'a>,
    /// Outermost alias name the chain went through, if any.
    pub alias: Option<&'a str>,
    /// Innermost alias: the typedef that owns the final node. Names an
    /// anonymous inline body (`typedef struct { .. } FOO`).
    pub owner: Option<&'a str>,
    /// Whether any reference along the chain was `const`.
    pub is_const: bool,
}

impl<'a> Canonical<'a> {
    pub fn builtin(&self) -> Option<BuiltinType> {
        match self.kind {
            CanonicalKind::Builtin(b) => Some(b),
            _ => None,
        }
    }

    pub fn defined(&self) -> Option<&'a DefinedType> {
        match self.kind {
            CanonicalKind::Defined(d) => Some(d),
            _ => None,
        }
    }

    /// Whether this is a struct or union, linked or inline.
    pub fn is_record(&self) -> bool {
        matches!(
            self.kind,
            CanonicalKind::Defined(DefinedType::Struct(_) | DefinedType::Union(_))
                | CanonicalKind::Type(NativeType::Struct(_) | NativeType::Union(_))
        )
    }

    /// The struct or union body, linked or inline.
    pub fn record(&self) -> Option<&'a NativeRecord> {
        match self.kind {
            CanonicalKind::Defined(DefinedType::Struct(r) | DefinedType::Union(r)) => Some(r),
            CanonicalKind::Type(NativeType::Struct(r) | NativeType::Union(r)) => Some(r),
            _ => None,
        }
    }
}

/// Unwrap typedefs and linked references down to the type they denote.
pub fn canonical<'a, L>(ty: &'a NativeType, lookup: &'a L) -> Canonical<'a>
where
    L: DeclarationLookup + ?Sized,
{
    let mut visited = FxHashSet::default();
    let mut alias = None;
    let mut owner = None;
    let mut is_const = false;
    let mut current = ty;

    let kind = loop {
        match current {
            NativeType::Builtin(b) => break CanonicalKind::Builtin(*b),
            NativeType::TypeDef(td) => {
                if !visited.insert(DeclHash::from_parts(DeclCategory::Typedef, &td.name)) {
                    break CanonicalKind::Cycle(td.name.as_str());
                }
                alias.get_or_insert(td.name.as_str());
                owner = Some(td.name.as_str());
                current = &td.target;
            }
            NativeType::Named(named) => {
                is_const |= named.is_const();
                let key = match &named.target {
                    TypeRef::Resolved(ResolvedTarget::Builtin(b)) => break CanonicalKind::Builtin(*b),
                    TypeRef::Resolved(ResolvedTarget::Decl(key)) => key,
                    TypeRef::Unresolved => break CanonicalKind::Unresolved(named.name.as_str()),
                };
                if !visited.insert(key.decl_hash()) {
                    break CanonicalKind::Cycle(named.name.as_str());
                }
                match lookup.node(key) {
                    Some(NodeRef::Typedef(td)) => {
                        alias.get_or_insert(td.name.as_str());
                        owner = Some(td.name.as_str());
                        current = &td.target;
                    }
                    Some(NodeRef::Defined(defined)) => break CanonicalKind::Defined(defined),
                    None => break CanonicalKind::Unresolved(named.name.as_str()),
                }
            }
            other => break CanonicalKind::Type(other),
        }
    };

    Canonical {
        kind,
        alias,
        owner,
        is_const,
    }
}

// ============================================================================
// Walker
// ============================================================================

/// Visited-set bookkeeping for one walk over the graph.
#[derive(Debug, Default)]
pub struct GraphWalker {
    visited: FxHashSet<DeclHash>,
}

impl GraphWalker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` visited. Returns `false` if it already was; the caller should
    /// then emit a by-name reference instead of recursing.
    pub fn enter(&mut self, key: &DeclKey) -> bool {
        self.visited.insert(key.decl_hash())
    }

    pub fn is_visited(&self, key: &DeclKey) -> bool {
        self.visited.contains(&key.decl_hash())
    }

    pub fn reset(&mut self) {
        self.visited.clear();
    }

    /// Every declaration reachable from `ty` through linked references,
    /// in first-visit order. Each is reported once.
    pub fn reachable<'a, L>(&mut self, ty: &'a NativeType, lookup: &'a L) -> Vec<DeclKey>
    where
        L: DeclarationLookup + ?Sized,
    {
        let mut out = Vec::new();
        let mut pending: Vec<&'a NativeType> = vec![ty];

        while let Some(current) = pending.pop() {
            if let NativeType::Named(named) = current {
                if let TypeRef::Resolved(ResolvedTarget::Decl(key)) = &named.target {
                    if self.enter(key) {
                        out.push(key.clone());
                        match lookup.node(key) {
                            Some(NodeRef::Typedef(td)) => pending.push(&td.target),
                            Some(NodeRef::Defined(defined)) => {
                                pending.extend(defined.member_types().into_iter().rev());
                            }
                            None => {}
                        }
                    }
                }
                continue;
            }
            pending.extend(current.children().into_iter().rev());
        }
        out
    }
}

// ============================================================================
// Symbol printer
// ============================================================================

/// Prints a declaration graph as `name(child)(child)...`.
///
/// Linked references are expanded the first time they are reached and printed
/// by name afterwards, so self-referential structures print finitely.
pub struct SymbolPrinter<'a, L: DeclarationLookup + ?Sized> {
    lookup: &'a L,
    walker: GraphWalker,
    out: String,
}

impl<'a, L: DeclarationLookup + ?Sized> SymbolPrinter<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self {
            lookup,
            walker: GraphWalker::new(),
            out: String::new(),
        }
    }

    pub fn print_type(&mut self, ty: &NativeType) -> String {
        self.walker.reset();
        self.out.clear();
        self.write_type(ty);
        std::mem::take(&mut self.out)
    }

    /// Print a committed typedef or defined type; `None` if absent.
    pub fn print_declaration(&mut self, key: &DeclKey) -> Option<String> {
        let lookup = self.lookup;
        let node = lookup.node(key)?;
        self.walker.reset();
        self.out.clear();
        self.walker.enter(key);
        self.write_node(node);
        Some(std::mem::take(&mut self.out))
    }

    fn write_node(&mut self, node: NodeRef<'_>) {
        match node {
            NodeRef::Typedef(td) => {
                self.out.push_str(&td.name);
                self.child(|p| p.write_type(&td.target));
            }
            NodeRef::Defined(DefinedType::Struct(r) | DefinedType::Union(r)) => {
                self.out.push_str(&r.name);
                self.write_members(r);
            }
            NodeRef::Defined(DefinedType::Enum(e)) => {
                self.out.push_str(&e.name);
                for member in &e.members {
                    self.child(|p| {
                        p.out.push_str(&member.name);
                        if let Some(value) = &member.value {
                            let _ = write!(p.out, "={value}");
                        }
                    });
                }
            }
        }
    }

    fn write_members(&mut self, record: &NativeRecord) {
        for member in &record.members {
            self.child(|p| {
                p.out.push_str(&member.name);
                p.child(|p| p.write_type(&member.ty));
            });
        }
    }

    fn write_type(&mut self, ty: &NativeType) {
        match ty {
            NativeType::Builtin(b) => self.out.push_str(b.c_name()),
            NativeType::Pointer { pointee } => {
                self.out.push('*');
                self.child(|p| p.write_type(pointee));
            }
            NativeType::Array {
                element, length, ..
            } => {
                match length {
                    Some(crate::ArrayLength::Fixed(n)) => {
                        let _ = write!(self.out, "[{n}]");
                    }
                    Some(crate::ArrayLength::Constant(c)) => {
                        let _ = write!(self.out, "[{c}]");
                    }
                    None => self.out.push_str("[]"),
                }
                self.child(|p| p.write_type(element));
            }
            NativeType::TypeDef(td) => {
                self.out.push_str(&td.name);
                if self.walker.enter(&DeclKey::typedef(td.name.as_str())) {
                    self.child(|p| p.write_type(&td.target));
                }
            }
            NativeType::Named(named) => {
                if named.is_const() {
                    self.out.push_str("const ");
                }
                let lookup = self.lookup;
                match &named.target {
                    TypeRef::Resolved(ResolvedTarget::Decl(key)) if self.walker.enter(key) => {
                        match lookup.node(key) {
                            Some(node) => self.write_node(node),
                            None => self.out.push_str(&named.name),
                        }
                    }
                    _ => self.out.push_str(&named.name),
                }
            }
            NativeType::Struct(r) | NativeType::Union(r) => {
                if r.is_anonymous() {
                    self.out.push_str(if matches!(ty, NativeType::Struct(_)) {
                        "struct"
                    } else {
                        "union"
                    });
                    self.write_members(r);
                } else {
                    self.out.push_str(&r.name);
                    if self.walker.enter(&DeclKey::defined(r.name.as_str())) {
                        self.write_members(r);
                    }
                }
            }
            NativeType::Enum(e) => {
                self.out.push_str(if e.name.is_empty() { "enum" } else { &e.name });
                for member in &e.members {
                    self.child(|p| p.out.push_str(&member.name));
                }
            }
            NativeType::FunctionPointer(fp) => {
                self.out.push_str(if fp.name.is_empty() { "fn" } else { &fp.name });
                self.child(|p| p.write_type(&fp.return_type));
                for param in &fp.params {
                    self.child(|p| p.write_type(&param.ty));
                }
            }
        }
    }

    fn child(&mut self, f: impl FnOnce(&mut Self)) {
        self.out.push('(');
        f(self);
        self.out.push(')');
    }
}
