//! The declared-type graph.
//!
//! Types are arena-interned: declaring a type yields a [`TypeId`] and the id
//! is the identity used by every later comparison. Aliases are ordinary
//! declarations pointing at an earlier one; `resolve_alias` follows the chain
//! to the underlying declaration. Alias cycles are rejected upstream by name
//! resolution, so chains here are finite.

use indexmap::IndexMap;
use serde::Serialize;

/// A lightweight handle to a type declaration.
///
/// Comparing two ids is O(1) and compares declaration identity, never
/// structure.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub struct TypeId(u32);

impl TypeId {
    /// Raw index for serialization/debugging.
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Create a TypeId from a raw index. Use only for deserialization.
    #[inline]
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Builtin scalar types, pre-registered by [`TypeTable::new`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum PrimitiveType {
    Integer,
    Float,
    Boolean,
    Charstring,
    Octetstring,
    Verdict,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 6] = [
        PrimitiveType::Integer,
        PrimitiveType::Float,
        PrimitiveType::Boolean,
        PrimitiveType::Charstring,
        PrimitiveType::Octetstring,
        PrimitiveType::Verdict,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Integer => "integer",
            PrimitiveType::Float => "float",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Charstring => "charstring",
            PrimitiveType::Octetstring => "octetstring",
            PrimitiveType::Verdict => "verdict",
        }
    }
}

/// An array dimension. Arrays are not necessarily zero-based.
///
/// Dimension identity is size AND offset; two dimensions with the same size
/// but different offsets are distinct.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub struct Dimension {
    pub size: u64,
    pub offset: i64,
}

impl Dimension {
    pub fn new(size: u64, offset: i64) -> Self {
        Self { size, offset }
    }

    pub fn is_identical(self, other: Dimension) -> bool {
        self == other
    }
}

/// A named member of a record, set, or choice.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
    pub optional: bool,
}

impl Field {
    pub fn required(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: true,
        }
    }
}

/// The closed set of type shapes.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub enum TypeKind {
    Primitive(PrimitiveType),
    /// Fixed-size, possibly non-zero-based sequence of one element type.
    Array { element: TypeId, dimension: Dimension },
    /// Fixed, ordered, named fields.
    Record { fields: Vec<Field> },
    /// Unbounded homogeneous sequence.
    RecordOf { element: TypeId },
    /// Unordered named fields.
    Set { fields: Vec<Field> },
    /// Unbounded homogeneous unordered collection.
    SetOf { element: TypeId },
    /// Exactly one of the named alternatives is chosen at runtime.
    Choice { alternatives: Vec<Field> },
    /// Open variant over the listed alternatives.
    Anytype { alternatives: Vec<Field> },
    /// Another name for an earlier declaration.
    Alias { target: TypeId },
}

impl TypeKind {
    /// Short kind name used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            TypeKind::Primitive(_) => "primitive",
            TypeKind::Array { .. } => "array",
            TypeKind::Record { .. } => "record",
            TypeKind::RecordOf { .. } => "record of",
            TypeKind::Set { .. } => "set",
            TypeKind::SetOf { .. } => "set of",
            TypeKind::Choice { .. } => "union",
            TypeKind::Anytype { .. } => "anytype",
            TypeKind::Alias { .. } => "alias",
        }
    }

    pub fn is_alias(&self) -> bool {
        matches!(self, TypeKind::Alias { .. })
    }
}

/// One declared type.
#[derive(Clone, Debug, Serialize)]
pub struct TypeNode {
    pub name: String,
    kind: Option<TypeKind>,
    erroneous: bool,
}

impl TypeNode {
    /// The shape of this declaration.
    ///
    /// # Panics
    /// Panics if the declaration was reserved but never defined.
    pub fn kind(&self) -> &TypeKind {
        self.kind
            .as_ref()
            .expect("reserved type must be defined before use")
    }

    pub fn is_erroneous(&self) -> bool {
        self.erroneous
    }
}

/// Arena of type declarations.
///
/// Builtin primitives are pre-registered at fixed ids. Mutually recursive
/// declarations are built in two steps: `reserve` the name, reference the id
/// from other declarations, then `define` the shape.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TypeTable {
    nodes: Vec<TypeNode>,
    by_name: IndexMap<String, TypeId>,
}

impl TypeTable {
    pub fn new() -> Self {
        let mut table = Self::default();
        for prim in PrimitiveType::ALL {
            let id = table.declare(prim.name(), TypeKind::Primitive(prim));
            debug_assert_eq!(id.index(), prim as usize);
        }
        table
    }

    /// The pre-registered declaration of a builtin primitive.
    pub fn primitive(&self, prim: PrimitiveType) -> TypeId {
        TypeId(prim as u32)
    }

    /// Declare a type with a known shape.
    pub fn declare(&mut self, name: impl Into<String>, kind: TypeKind) -> TypeId {
        let id = self.reserve(name);
        self.define(id, kind);
        id
    }

    /// Reserve a declaration so recursive types can reference it before its
    /// shape is known. Using the id before `define` is an internal error.
    pub fn reserve(&mut self, name: impl Into<String>) -> TypeId {
        let name = name.into();
        let id = TypeId(self.nodes.len() as u32);
        self.by_name.insert(name.clone(), id);
        self.nodes.push(TypeNode {
            name,
            kind: None,
            erroneous: false,
        });
        id
    }

    /// Give a reserved declaration its shape.
    pub fn define(&mut self, id: TypeId, kind: TypeKind) {
        let node = &mut self.nodes[id.index()];
        debug_assert!(node.kind.is_none(), "type defined twice");
        node.kind = Some(kind);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: TypeId) -> &TypeNode {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        self.nodes[id.index()].kind()
    }

    pub fn name(&self, id: TypeId) -> &str {
        &self.nodes[id.index()].name
    }

    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Mark a declaration erroneous. Erroneous types suppress all further
    /// diagnostics derived from them.
    pub fn mark_erroneous(&mut self, id: TypeId) {
        self.nodes[id.index()].erroneous = true;
    }

    pub fn is_erroneous(&self, id: TypeId) -> bool {
        self.nodes[id.index()].erroneous
    }

    /// Follow alias declarations to the underlying one.
    ///
    /// Chains are acyclic (name resolution rejects alias cycles); the hop
    /// bound only guards against malformed input escaping an infinite loop.
    pub fn resolve_alias(&self, id: TypeId) -> TypeId {
        let mut current = id;
        for _ in 0..self.nodes.len() {
            match self.nodes[current.index()].kind() {
                TypeKind::Alias { target } => current = *target,
                _ => return current,
            }
        }
        current
    }

    /// The element type of an array, record-of, or set-of declaration.
    pub fn element_type(&self, id: TypeId) -> Option<TypeId> {
        match self.kind(id) {
            TypeKind::Array { element, .. }
            | TypeKind::RecordOf { element }
            | TypeKind::SetOf { element } => Some(*element),
            _ => None,
        }
    }

    /// The fields or alternatives of a named-member declaration.
    pub fn fields(&self, id: TypeId) -> Option<&[Field]> {
        match self.kind(id) {
            TypeKind::Record { fields }
            | TypeKind::Set { fields }
            | TypeKind::Choice {
                alternatives: fields,
            }
            | TypeKind::Anytype {
                alternatives: fields,
            } => Some(fields),
            _ => None,
        }
    }

    /// The dimension of an array declaration.
    pub fn dimension(&self, id: TypeId) -> Option<Dimension> {
        match self.kind(id) {
            TypeKind::Array { dimension, .. } => Some(*dimension),
            _ => None,
        }
    }
}
