//! Structural validation of literal values and templates.
//!
//! A literal aggregate is populated either densely (positional list) or
//! sparsely (explicit index assignments); the validator checks the chosen
//! population against the declared shape of the governing type. Diagnostics
//! accumulate; only misplaced template constructs and unknown shapes are
//! internal errors.


use indexmap::IndexMap;
use tessera_core::{Field, IndexExpr, TypeId, TypeKind, TypeTable, Value, ValueBody};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::{Error, Result};

/// How strictly the checked construct must be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpectedKind {
    /// A constant definition. Indices must be compile-time constants and
    /// fixed-size sparse populations may not leave holes.
    #[default]
    Constant,
    /// A runtime value. Indices may be computed; holes are a runtime concern.
    DynamicValue,
    /// A template. Wildcards and permutations are admitted.
    Template,
}

/// Options for one validation call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationOptions<'a> {
    pub expected_kind: ExpectedKind,
    /// Whether the `-` placeholder is acceptable (a base template fills it).
    pub incomplete_allowed: bool,
    /// Whether trailing optional fields may be left out of a dense record.
    pub implicit_omit: bool,
    /// Name of the definition whose right-hand side is being checked.
    /// References to it are returned as self-references.
    pub lhs: Option<&'a str>,
}

/// Validates values and templates against declared aggregate shapes.
///
/// Both entry points return whether the construct references its own
/// container; the caller uses that to reject self-referential constants.
pub struct StructureValidator<'t, 'd> {
    table: &'t TypeTable,
    diagnostics: &'d mut Diagnostics,
}

impl<'t, 'd> StructureValidator<'t, 'd> {
    pub fn new(table: &'t TypeTable, diagnostics: &'d mut Diagnostics) -> Self {
        Self { table, diagnostics }
    }

    /// Check a value against its declared type.
    pub fn check_value_structure(
        &mut self,
        ty: TypeId,
        value: &mut Value,
        opts: ValidationOptions,
    ) -> Result<bool> {
        debug_assert!(opts.expected_kind != ExpectedKind::Template);
        self.check(ty, value, opts)
    }

    /// Check a template against its declared type.
    pub fn check_template_structure(
        &mut self,
        ty: TypeId,
        template: &mut Value,
        mut opts: ValidationOptions,
    ) -> Result<bool> {
        opts.expected_kind = ExpectedKind::Template;
        self.check(ty, template, opts)
    }

    fn check(&mut self, ty: TypeId, value: &mut Value, opts: ValidationOptions) -> Result<bool> {
        let ty = self.table.resolve_alias(ty);
        value.set_governor(ty);

        // Cascade suppression: an erroneous governor or an already-reported
        // construct produces no further diagnostics.
        if self.table.is_erroneous(ty) || value.is_erroneous() {
            return Ok(false);
        }

        let in_template = opts.expected_kind == ExpectedKind::Template;

        match &value.body {
            // Leaf payloads are typechecked by the expression checker.
            ValueBody::Literal(_) => Ok(false),
            ValueBody::Reference(name) => Ok(opts.lhs.is_some_and(|lhs| lhs == name)),
            // Omit legality depends on the field position and is checked there.
            ValueBody::Omit => Ok(false),
            ValueBody::NotUsed => {
                if !opts.incomplete_allowed {
                    self.diagnostics
                        .report(DiagnosticKind::NotUsedNotAllowed, value.range)
                        .emit();
                    value.mark_erroneous();
                }
                Ok(false)
            }
            ValueBody::AnyValue | ValueBody::AnyOrOmit => {
                if in_template {
                    Ok(false)
                } else {
                    Err(Error::UnsupportedConstruct {
                        construct: value.body.describe(),
                        context: "a value",
                    })
                }
            }
            // Permutations and list wildcards are consumed by the enclosing
            // list walk; reaching one here means it sits in a non-list slot.
            ValueBody::Permutation(_) | ValueBody::AnyElementsOrNone => {
                Err(Error::UnsupportedConstruct {
                    construct: value.body.describe(),
                    context: if in_template {
                        "a non-list position"
                    } else {
                        "a value"
                    },
                })
            }
            ValueBody::List(_) => self.check_dense(ty, value, opts),
            ValueBody::Indexed(_) => self.check_sparse(ty, value, opts),
        }
    }

    fn check_dense(
        &mut self,
        ty: TypeId,
        value: &mut Value,
        opts: ValidationOptions,
    ) -> Result<bool> {
        let table = self.table;
        match table.kind(ty) {
            TypeKind::Array { element, dimension } => {
                self.check_dense_list(*element, Some(dimension.size), value, opts)
            }
            TypeKind::RecordOf { element } | TypeKind::SetOf { element } => {
                self.check_dense_list(*element, None, value, opts)
            }
            TypeKind::Record { fields } | TypeKind::Set { fields } => {
                self.check_dense_fields(fields, value, opts)
            }
            other @ (TypeKind::Primitive(_)
            | TypeKind::Choice { .. }
            | TypeKind::Anytype { .. }) => {
                self.diagnostics
                    .report(DiagnosticKind::ValueListNotAllowed, value.range)
                    .message(format!("{} type `{}`", other.describe(), table.name(ty)))
                    .emit();
                value.mark_erroneous();
                Ok(false)
            }
            TypeKind::Alias { .. } => unreachable!("aliases are resolved before dispatch"),
        }
    }

    /// Dense population of an array, record-of, or set-of.
    fn check_dense_list(
        &mut self,
        element_ty: TypeId,
        fixed_size: Option<u64>,
        value: &mut Value,
        opts: ValidationOptions,
    ) -> Result<bool> {
        let in_template = opts.expected_kind == ExpectedKind::Template;

        // Exact-count checking applies only when every element contributes a
        // statically known length; a list wildcard makes the length unbounded.
        let static_count = match &value.body {
            ValueBody::List(elements) => static_component_count(elements),
            _ => unreachable!("dense check on a non-list body"),
        };
        if let (Some(size), Some(count)) = (fixed_size, static_count)
            && count as u64 != size
        {
            let kind = if count as u64 > size {
                DiagnosticKind::TooManyElements
            } else {
                DiagnosticKind::TooFewElements
            };
            self.diagnostics
                .report(kind, value.range)
                .message(format!("{size} was expected instead of {count}"))
                .emit();
            value.mark_erroneous();
        }

        let mut self_ref = false;
        let ValueBody::List(elements) = &mut value.body else {
            unreachable!()
        };
        for element in elements.iter_mut() {
            match &mut element.body {
                ValueBody::Permutation(members) => {
                    if !in_template {
                        return Err(Error::UnsupportedConstruct {
                            construct: "permutation",
                            context: "a value",
                        });
                    }
                    for member in members.iter_mut() {
                        if matches!(member.body, ValueBody::AnyElementsOrNone) {
                            continue;
                        }
                        self_ref |= self.check(element_ty, member, opts)?;
                    }
                }
                ValueBody::AnyElementsOrNone => {
                    if !in_template {
                        return Err(Error::UnsupportedConstruct {
                            construct: "any-elements-or-none wildcard",
                            context: "a value",
                        });
                    }
                }
                _ => {
                    self_ref |= self.check(element_ty, element, opts)?;
                }
            }
        }
        Ok(self_ref)
    }

    /// Dense (positional) population of a record or set.
    fn check_dense_fields(
        &mut self,
        fields: &[Field],
        value: &mut Value,
        opts: ValidationOptions,
    ) -> Result<bool> {
        let count = value.component_count();
        if count > fields.len() {
            self.diagnostics
                .report(DiagnosticKind::TooManyElements, value.range)
                .message(format!("{} was expected instead of {}", fields.len(), count))
                .emit();
            value.mark_erroneous();
        } else if count < fields.len() {
            let trailing_optional = fields[count..].iter().all(|f| f.optional);
            if !(opts.implicit_omit && trailing_optional) {
                self.diagnostics
                    .report(DiagnosticKind::TooFewElements, value.range)
                    .message(format!("{} was expected instead of {}", fields.len(), count))
                    .emit();
                value.mark_erroneous();
            }
        }

        let mut self_ref = false;
        let ValueBody::List(elements) = &mut value.body else {
            unreachable!()
        };
        for (field, element) in fields.iter().zip(elements.iter_mut()) {
            if matches!(element.body, ValueBody::Omit) {
                if !field.optional {
                    self.diagnostics
                        .report(DiagnosticKind::OmitOnMandatoryField, element.range)
                        .message(&field.name)
                        .emit();
                    element.mark_erroneous();
                }
                continue;
            }
            self_ref |= self.check(field.ty, element, opts)?;
        }
        Ok(self_ref)
    }

    /// Sparse (indexed) population. Only list-like types admit it.
    fn check_sparse(
        &mut self,
        ty: TypeId,
        value: &mut Value,
        opts: ValidationOptions,
    ) -> Result<bool> {
        let table = self.table;
        let (element_ty, fixed_size) = match table.kind(ty) {
            TypeKind::Array { element, dimension } => (*element, Some(dimension.size)),
            TypeKind::RecordOf { element } | TypeKind::SetOf { element } => (*element, None),
            other => {
                self.diagnostics
                    .report(DiagnosticKind::IndexedListNotAllowed, value.range)
                    .message(format!("{} type `{}`", other.describe(), table.name(ty)))
                    .emit();
                value.mark_erroneous();
                return Ok(false);
            }
        };

        let type_name = table.name(ty);
        let constant_context = opts.expected_kind == ExpectedKind::Constant;
        // Hole checking needs a consistent index set; the first inconsistent
        // index turns it off for this value.
        let mut holes_enabled = true;
        let mut seen: IndexMap<i64, usize> = IndexMap::new();
        let mut self_ref = false;

        let ValueBody::Indexed(pairs) = &mut value.body else {
            unreachable!("sparse check on a non-indexed body")
        };
        for (position, pair) in pairs.iter_mut().enumerate() {
            let component = position + 1;
            match pair.index {
                IndexExpr::Dynamic => {
                    if constant_context {
                        self.diagnostics
                            .report(DiagnosticKind::NonConstantIndex, pair.index_range)
                            .emit();
                    }
                    holes_enabled = false;
                }
                IndexExpr::Const(i) => {
                    if i < 0 {
                        self.diagnostics
                            .report(DiagnosticKind::NegativeIndex, pair.index_range)
                            .message(format!("{i} in a value of type `{type_name}`"))
                            .emit();
                        holes_enabled = false;
                    } else if i >= i64::from(i32::MAX) {
                        self.diagnostics
                            .report(DiagnosticKind::IndexOverflow, pair.index_range)
                            .message(format!("{i} in a value of type `{type_name}`"))
                            .emit();
                        holes_enabled = false;
                    } else if let Some(size) = fixed_size
                        && i as u64 >= size
                    {
                        self.diagnostics
                            .report(DiagnosticKind::IndexOutOfRange, pair.index_range)
                            .message(format!(
                                "{} exceeds the last index {} of type `{}`",
                                i,
                                size - 1,
                                type_name
                            ))
                            .emit();
                        holes_enabled = false;
                    } else if let Some(&first) = seen.get(&i) {
                        self.diagnostics
                            .report(DiagnosticKind::DuplicateIndex, pair.index_range)
                            .message(format!("{i} for components {first} and {component}"))
                            .emit();
                        holes_enabled = false;
                    } else {
                        seen.insert(i, component);
                    }
                }
            }
            self_ref |= self.check(element_ty, &mut pair.value, opts)?;
        }

        // Constant definitions of fixed-size types must populate every index.
        if constant_context
            && holes_enabled
            && let Some(size) = fixed_size
        {
            let mut holes = false;
            for i in 0..size as i64 {
                if !seen.contains_key(&i) {
                    self.diagnostics
                        .report(DiagnosticKind::MissingIndex, value.range)
                        .message(format!("{i} in a value of type `{type_name}`"))
                        .emit();
                    holes = true;
                }
            }
            if holes {
                value.mark_erroneous();
            }
        }
        Ok(self_ref)
    }
}

/// Statically known element count of a dense list, or `None` when a list
/// wildcard makes the length unbounded.
fn static_component_count(elements: &[Value]) -> Option<usize> {
    let mut count = 0usize;
    for element in elements {
        match &element.body {
            ValueBody::Permutation(members) => {
                if members
                    .iter()
                    .any(|m| matches!(m.body, ValueBody::AnyElementsOrNone))
                {
                    return None;
                }
                count += members.len();
            }
            ValueBody::AnyElementsOrNone => return None,
            _ => count += 1,
        }
    }
    Some(count)
}
