//! Literal aggregate values and templates.
//!
//! A literal is populated in exactly one of two modes:
//! - **dense**: an ordered list of elements, implicitly indexed from 0;
//! - **sparse**: an explicit list of `(index, element)` pairs.
//!
//! The same node type carries both values and templates; template-only
//! constructs (`?`, `*`, permutations) are rejected by the validator when
//! they show up in value position.

use rowan::TextRange;

use crate::types::TypeId;

/// A leaf constant. The concrete payload is opaque to structure checking.
#[derive(Clone, PartialEq, Debug)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

/// An index expression of a sparse assignment.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum IndexExpr {
    /// Known at compile time.
    Const(i64),
    /// Computed at run time; rejected where constant evaluation is required.
    Dynamic,
}

/// One `(index, element)` pair of a sparse assignment.
#[derive(Clone, Debug)]
pub struct IndexedValue {
    pub index: IndexExpr,
    /// Location of the index expression, for index diagnostics.
    pub index_range: TextRange,
    pub value: Value,
}

impl IndexedValue {
    pub fn new(index: IndexExpr, index_range: TextRange, value: Value) -> Self {
        Self {
            index,
            index_range,
            value,
        }
    }
}

/// The body of a literal value or template node.
#[derive(Clone, Debug)]
pub enum ValueBody {
    Literal(Literal),
    /// Reference to a named definition. Used to detect values that refer to
    /// the very container being defined for them.
    Reference(String),
    /// Dense (positional) population.
    List(Vec<Value>),
    /// Sparse (indexed) population.
    Indexed(Vec<IndexedValue>),
    /// The `-` placeholder: not supplied here, filled by a base template.
    NotUsed,
    /// Omitted optional field.
    Omit,
    /// Template-only `?`: any bound value.
    AnyValue,
    /// Template-only `*`: any value or omitted.
    AnyOrOmit,
    /// Template-only unordered group of sub-templates.
    Permutation(Vec<Value>),
    /// Template-only `*` inside a list: any number of elements, or none.
    /// Makes the enclosing list's length contribution unbounded.
    AnyElementsOrNone,
}

impl ValueBody {
    /// Whether this body may only appear in template position.
    pub fn is_template_only(&self) -> bool {
        matches!(
            self,
            ValueBody::AnyValue
                | ValueBody::AnyOrOmit
                | ValueBody::Permutation(_)
                | ValueBody::AnyElementsOrNone
        )
    }

    pub fn describe(&self) -> &'static str {
        match self {
            ValueBody::Literal(_) => "literal",
            ValueBody::Reference(_) => "reference",
            ValueBody::List(_) => "value list",
            ValueBody::Indexed(_) => "indexed value list",
            ValueBody::NotUsed => "not-used symbol",
            ValueBody::Omit => "omit",
            ValueBody::AnyValue => "any-value wildcard",
            ValueBody::AnyOrOmit => "any-or-omit wildcard",
            ValueBody::Permutation(_) => "permutation",
            ValueBody::AnyElementsOrNone => "any-elements-or-none wildcard",
        }
    }
}

/// A literal value or template node.
#[derive(Clone, Debug)]
pub struct Value {
    pub range: TextRange,
    pub body: ValueBody,
    governor: Option<TypeId>,
    erroneous: bool,
}

impl Value {
    pub fn new(range: TextRange, body: ValueBody) -> Self {
        Self {
            range,
            body,
            governor: None,
            erroneous: false,
        }
    }

    /// A node with an empty range. Convenient for synthetic values and tests.
    pub fn detached(body: ValueBody) -> Self {
        Self::new(TextRange::empty(0.into()), body)
    }

    /// Number of components in either population mode. Leaves have none.
    pub fn component_count(&self) -> usize {
        match &self.body {
            ValueBody::List(elements) => elements.len(),
            ValueBody::Indexed(pairs) => pairs.len(),
            ValueBody::Permutation(members) => members.len(),
            _ => 0,
        }
    }

    pub fn component(&self, i: usize) -> Option<&Value> {
        match &self.body {
            ValueBody::List(elements) => elements.get(i),
            ValueBody::Indexed(pairs) => pairs.get(i).map(|p| &p.value),
            ValueBody::Permutation(members) => members.get(i),
            _ => None,
        }
    }

    /// The index expression of the i-th component. Sparse mode only.
    pub fn index_at(&self, i: usize) -> Option<IndexExpr> {
        match &self.body {
            ValueBody::Indexed(pairs) => pairs.get(i).map(|p| p.index),
            _ => None,
        }
    }

    pub fn is_dense(&self) -> bool {
        matches!(self.body, ValueBody::List(_))
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self.body, ValueBody::Indexed(_))
    }

    /// Whether this node carries a value at all. The `-` placeholder does not.
    pub fn is_bound(&self) -> bool {
        !matches!(self.body, ValueBody::NotUsed)
    }

    /// The type this node was last checked against.
    pub fn governor(&self) -> Option<TypeId> {
        self.governor
    }

    pub fn set_governor(&mut self, ty: TypeId) {
        self.governor = Some(ty);
    }

    /// Mark this node erroneous after reporting a diagnostic for it, so later
    /// passes do not pile secondary errors on top.
    pub fn mark_erroneous(&mut self) {
        self.erroneous = true;
    }

    pub fn is_erroneous(&self) -> bool {
        self.erroneous
    }
}
