//! Recursive, cycle-safe aggregate type compatibility.
//!
//! Two declared types may be used interchangeably when they are structurally
//! compatible; when they are compatible but differ in shape, the verdict also
//! says a runtime conversion is required. The algorithm terminates on
//! mutually self-referential type definitions: each operand carries a chain
//! of visited declarations, and a subfield pair where *both* chains loop is
//! accepted without further descent.
//!
//! Results are memoized per check generation. The surrounding compiler bumps
//! the generation once per check pass; repeated checks within one pass return
//! the cached verdict.

mod chain;

#[cfg(test)]
mod checker_tests;

pub use chain::CompatibilityChain;

use std::collections::HashMap;

use rowan::TextRange;
use tessera_core::{Dimension, Field, TypeId, TypeKind, TypeTable};

use crate::diagnostics::{DiagnosticKind, Diagnostics};

/// Monotonic check-pass counter.
pub type Generation = u64;

/// Where and why two types failed to match.
///
/// Paths are field-access strings rooted at the operand type names, built
/// bottom-up while the recursion unwinds (`".field"` for named fields, `"[]"`
/// for element descent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatch {
    pub left_path: String,
    pub right_path: String,
    /// The innermost pair that actually failed.
    pub left_type: TypeId,
    pub right_type: TypeId,
    pub message: String,
}

impl TypeMismatch {
    /// The complete, path-qualified mismatch sentence.
    pub fn full_message(&self) -> String {
        format!(
            "`{}` and `{}` are not compatible: {}",
            self.left_path, self.right_path, self.message
        )
    }
}

/// Verdict of a compatibility check.
#[derive(Debug, Clone)]
pub struct CompatibilityResult {
    pub compatible: bool,
    /// Compatible, but the two representations differ at runtime.
    pub needs_conversion: bool,
    pub diagnostic: Option<TypeMismatch>,
}

impl CompatibilityResult {
    /// Report the mismatch, if any, into the diagnostics sink.
    pub fn emit_to(&self, diag: &mut Diagnostics, range: TextRange) {
        if let Some(mismatch) = &self.diagnostic {
            diag.report(DiagnosticKind::IncompatibleTypes, range)
                .message(mismatch.full_message())
                .emit();
        }
    }
}

/// Mismatch details accumulated by the recursive core.
#[derive(Debug, Default)]
struct CompatInfo {
    left_path: String,
    right_path: String,
    leaf: Option<(TypeId, TypeId)>,
    reason: Option<String>,
    needs_conversion: bool,
}

impl CompatInfo {
    /// Record the innermost failure. Later (outer) calls keep the first one.
    fn mismatch(&mut self, left: TypeId, right: TypeId, reason: String) {
        if self.reason.is_none() {
            self.leaf = Some((left, right));
            self.reason = Some(reason);
        }
    }

    fn prepend_paths(&mut self, left_seg: &str, right_seg: &str) {
        self.left_path.insert_str(0, left_seg);
        self.right_path.insert_str(0, right_seg);
    }
}

/// The family partition. Cross-family pairs are never compatible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    List,
    Set,
    Variant,
    Primitive,
}

impl Family {
    fn of(kind: &TypeKind) -> Family {
        match kind {
            TypeKind::Array { .. } | TypeKind::Record { .. } | TypeKind::RecordOf { .. } => {
                Family::List
            }
            TypeKind::Set { .. } | TypeKind::SetOf { .. } => Family::Set,
            TypeKind::Choice { .. } | TypeKind::Anytype { .. } => Family::Variant,
            TypeKind::Primitive(_) => Family::Primitive,
            TypeKind::Alias { .. } => unreachable!("aliases are resolved before family dispatch"),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Family::List => "array and record types",
            Family::Set => "set and set of types",
            Family::Variant => "union and anytype types",
            Family::Primitive => "primitive types",
        }
    }

    fn cross_message(left: Family, right: Family) -> String {
        format!(
            "{} are compatible only with other {}, not with {}",
            left.describe(),
            left.describe(),
            right.describe()
        )
    }
}

/// The compatibility algorithm over a type table.
///
/// Holds no state besides the generation-stamped memo, so one checker per
/// compilation unit is the expected shape.
pub struct CompatibilityChecker<'t> {
    table: &'t TypeTable,
    generation: Generation,
    memo: HashMap<(TypeId, TypeId), (Generation, CompatibilityResult)>,
}

impl<'t> CompatibilityChecker<'t> {
    pub fn new(table: &'t TypeTable) -> Self {
        Self {
            table,
            generation: 0,
            memo: HashMap::new(),
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Start a new check pass. Verdicts cached in older passes are recomputed
    /// the next time their pair is checked.
    pub fn bump_generation(&mut self) {
        self.generation += 1;
    }

    /// Decide whether `left` and `right` may be used interchangeably.
    pub fn check_compatible(&mut self, left: TypeId, right: TypeId) -> CompatibilityResult {
        if let Some((stamp, cached)) = self.memo.get(&(left, right))
            && *stamp >= self.generation
        {
            return cached.clone();
        }

        let mut info = CompatInfo::default();
        let mut left_chain = CompatibilityChain::new();
        let mut right_chain = CompatibilityChain::new();
        let compatible =
            self.is_compatible(left, right, &mut left_chain, &mut right_chain, &mut info);
        debug_assert!(left_chain.is_empty() && right_chain.is_empty());

        let result = if compatible {
            CompatibilityResult {
                compatible: true,
                needs_conversion: info.needs_conversion,
                diagnostic: None,
            }
        } else {
            let (leaf_left, leaf_right) = info.leaf.unwrap_or((left, right));
            CompatibilityResult {
                compatible: false,
                needs_conversion: false,
                diagnostic: Some(TypeMismatch {
                    left_path: format!("{}{}", self.table.name(left), info.left_path),
                    right_path: format!("{}{}", self.table.name(right), info.right_path),
                    left_type: leaf_left,
                    right_type: leaf_right,
                    message: info
                        .reason
                        .unwrap_or_else(|| "types are not compatible".to_string()),
                }),
            }
        };

        self.memo
            .insert((left, right), (self.generation, result.clone()));
        result
    }

    /// The recursive core. Fills `info` by side effect on failure.
    fn is_compatible(
        &self,
        left: TypeId,
        right: TypeId,
        left_chain: &mut CompatibilityChain,
        right_chain: &mut CompatibilityChain,
        info: &mut CompatInfo,
    ) -> bool {
        let left = self.table.resolve_alias(left);
        let right = self.table.resolve_alias(right);

        // Erroneous types are universally compatible so one root error does
        // not flood the user with derived incompatibilities.
        if self.table.is_erroneous(left) || self.table.is_erroneous(right) {
            return true;
        }
        if left == right {
            return true;
        }

        let left_kind = self.table.kind(left);
        let right_kind = self.table.kind(right);

        let left_family = Family::of(left_kind);
        let right_family = Family::of(right_kind);
        if left_family != right_family {
            info.mismatch(left, right, Family::cross_message(left_family, right_family));
            return false;
        }

        // Structural compatibility across different shapes always implies a
        // representation change at runtime.
        if std::mem::discriminant(left_kind) != std::mem::discriminant(right_kind) {
            info.needs_conversion = true;
        }

        match (left_kind, right_kind) {
            (TypeKind::Primitive(a), TypeKind::Primitive(b)) => {
                if a == b {
                    true
                } else {
                    info.mismatch(
                        left,
                        right,
                        format!(
                            "`{}` and `{}` are distinct primitive types",
                            a.name(),
                            b.name()
                        ),
                    );
                    false
                }
            }

            // List family
            (TypeKind::Record { fields: lf }, TypeKind::Record { fields: rf }) => {
                self.fields_vs_fields(left, right, lf, rf, left_chain, right_chain, info)
            }
            (TypeKind::Record { fields }, TypeKind::Array { element, dimension }) => self
                .fields_vs_array(
                    left, right, fields, *element, *dimension, false, left_chain, right_chain,
                    info,
                ),
            (TypeKind::Array { element, dimension }, TypeKind::Record { fields }) => self
                .fields_vs_array(
                    right, left, fields, *element, *dimension, true, left_chain, right_chain, info,
                ),
            (TypeKind::Record { fields }, TypeKind::RecordOf { element }) => self
                .fields_vs_element(fields, *element, true, left_chain, right_chain, info),
            (TypeKind::RecordOf { element }, TypeKind::Record { fields }) => self
                .fields_vs_element(fields, *element, false, left_chain, right_chain, info),
            (TypeKind::RecordOf { element: le }, TypeKind::RecordOf { element: re }) => {
                self.element_vs_element(*le, *re, left_chain, right_chain, info)
            }
            (TypeKind::RecordOf { element: le }, TypeKind::Array { element: re, .. })
            | (TypeKind::Array { element: le, .. }, TypeKind::RecordOf { element: re }) => {
                // Arity of a record-of is a runtime concern, not a compile-time one.
                self.element_vs_element(*le, *re, left_chain, right_chain, info)
            }
            (
                TypeKind::Array {
                    element: le,
                    dimension: ld,
                },
                TypeKind::Array {
                    element: re,
                    dimension: rd,
                },
            ) => {
                if !ld.is_identical(*rd) {
                    info.mismatch(left, right, self.dimension_message(left, right, *ld, *rd));
                    false
                } else {
                    self.element_vs_element(*le, *re, left_chain, right_chain, info)
                }
            }

            // Set family
            (TypeKind::Set { fields: lf }, TypeKind::Set { fields: rf }) => {
                self.fields_vs_fields(left, right, lf, rf, left_chain, right_chain, info)
            }
            (TypeKind::Set { fields }, TypeKind::SetOf { element }) => self
                .fields_vs_element(fields, *element, true, left_chain, right_chain, info),
            (TypeKind::SetOf { element }, TypeKind::Set { fields }) => self
                .fields_vs_element(fields, *element, false, left_chain, right_chain, info),
            (TypeKind::SetOf { element: le }, TypeKind::SetOf { element: re }) => {
                self.element_vs_element(*le, *re, left_chain, right_chain, info)
            }

            // Variant family
            (
                TypeKind::Choice { alternatives: la } | TypeKind::Anytype { alternatives: la },
                TypeKind::Choice { alternatives: ra } | TypeKind::Anytype { alternatives: ra },
            ) => self.alternatives_compatible(left, right, la, ra, left_chain, right_chain, info),

            _ => unreachable!("cross-family pairs are rejected before kind dispatch"),
        }
    }

    /// Bracketed subfield descent: mark both chains, push the resolved pair,
    /// apply the cycle-breaking rule, recurse, restore both chains. On
    /// failure the path segments are prepended while unwinding.
    fn check_sub(
        &self,
        left: TypeId,
        right: TypeId,
        left_chain: &mut CompatibilityChain,
        right_chain: &mut CompatibilityChain,
        info: &mut CompatInfo,
        left_seg: &str,
        right_seg: &str,
    ) -> bool {
        let left = self.table.resolve_alias(left);
        let right = self.table.resolve_alias(right);

        left_chain.mark_state();
        right_chain.mark_state();
        left_chain.push(left);
        right_chain.push(right);

        // When both operands loop back on themselves the pair is accepted
        // without further descent; this is what bounds the recursion for
        // self-referential type definitions.
        let compatible = if left_chain.has_recursion() && right_chain.has_recursion() {
            true
        } else {
            self.is_compatible(left, right, left_chain, right_chain, info)
        };

        left_chain.previous_state();
        right_chain.previous_state();

        if !compatible {
            info.prepend_paths(left_seg, right_seg);
        }
        compatible
    }

    fn fields_vs_fields(
        &self,
        left: TypeId,
        right: TypeId,
        lf: &[Field],
        rf: &[Field],
        left_chain: &mut CompatibilityChain,
        right_chain: &mut CompatibilityChain,
        info: &mut CompatInfo,
    ) -> bool {
        if lf.len() != rf.len() {
            info.mismatch(
                left,
                right,
                format!(
                    "field counts differ: `{}` has {} fields but `{}` has {}",
                    self.table.name(left),
                    lf.len(),
                    self.table.name(right),
                    rf.len()
                ),
            );
            return false;
        }
        for (lfield, rfield) in lf.iter().zip(rf) {
            if lfield.optional != rfield.optional {
                info.mismatch(
                    left,
                    right,
                    format!(
                        "field `{}` and field `{}` differ in optionality",
                        lfield.name, rfield.name
                    ),
                );
                return false;
            }
            let left_seg = format!(".{}", lfield.name);
            let right_seg = format!(".{}", rfield.name);
            if !self.check_sub(
                lfield.ty,
                rfield.ty,
                left_chain,
                right_chain,
                info,
                &left_seg,
                &right_seg,
            ) {
                return false;
            }
        }
        true
    }

    /// Record against Array: the arities must agree exactly, and the array
    /// contributes the same element type at every field position.
    #[allow(clippy::too_many_arguments)]
    fn fields_vs_array(
        &self,
        record_id: TypeId,
        array_id: TypeId,
        fields: &[Field],
        element: TypeId,
        dimension: Dimension,
        array_on_left: bool,
        left_chain: &mut CompatibilityChain,
        right_chain: &mut CompatibilityChain,
        info: &mut CompatInfo,
    ) -> bool {
        let (left_id, right_id) = if array_on_left {
            (array_id, record_id)
        } else {
            (record_id, array_id)
        };

        if fields.is_empty() {
            info.mismatch(
                left_id,
                right_id,
                "a record with no fields is never compatible with an array".to_string(),
            );
            return false;
        }
        if dimension.size != fields.len() as u64 {
            info.mismatch(
                left_id,
                right_id,
                format!(
                    "field counts differ: `{}` has {} fields but `{}` has {} elements",
                    self.table.name(record_id),
                    fields.len(),
                    self.table.name(array_id),
                    dimension.size
                ),
            );
            return false;
        }

        for field in fields {
            let field_seg = format!(".{}", field.name);
            let ok = if array_on_left {
                self.check_sub(
                    element,
                    field.ty,
                    left_chain,
                    right_chain,
                    info,
                    "[]",
                    &field_seg,
                )
            } else {
                self.check_sub(
                    field.ty,
                    element,
                    left_chain,
                    right_chain,
                    info,
                    &field_seg,
                    "[]",
                )
            };
            if !ok {
                return false;
            }
        }
        true
    }

    /// Record/Set against its -of counterpart: every field checks against
    /// the single element type; arity is unconstrained.
    fn fields_vs_element(
        &self,
        fields: &[Field],
        element: TypeId,
        fields_on_left: bool,
        left_chain: &mut CompatibilityChain,
        right_chain: &mut CompatibilityChain,
        info: &mut CompatInfo,
    ) -> bool {
        for field in fields {
            let field_seg = format!(".{}", field.name);
            let ok = if fields_on_left {
                self.check_sub(
                    field.ty,
                    element,
                    left_chain,
                    right_chain,
                    info,
                    &field_seg,
                    "[]",
                )
            } else {
                self.check_sub(
                    element,
                    field.ty,
                    left_chain,
                    right_chain,
                    info,
                    "[]",
                    &field_seg,
                )
            };
            if !ok {
                return false;
            }
        }
        true
    }

    fn element_vs_element(
        &self,
        left: TypeId,
        right: TypeId,
        left_chain: &mut CompatibilityChain,
        right_chain: &mut CompatibilityChain,
        info: &mut CompatInfo,
    ) -> bool {
        self.check_sub(left, right, left_chain, right_chain, info, "[]", "[]")
    }

    /// Variant rule: every alternative of the right operand needs a
    /// same-named, compatible alternative on the left.
    fn alternatives_compatible(
        &self,
        left: TypeId,
        right: TypeId,
        la: &[Field],
        ra: &[Field],
        left_chain: &mut CompatibilityChain,
        right_chain: &mut CompatibilityChain,
        info: &mut CompatInfo,
    ) -> bool {
        for alt in ra {
            let Some(matching) = la.iter().find(|l| l.name == alt.name) else {
                info.mismatch(
                    left,
                    right,
                    format!(
                        "`{}` has no alternative named `{}`",
                        self.table.name(left),
                        alt.name
                    ),
                );
                return false;
            };
            let seg = format!(".{}", alt.name);
            if !self.check_sub(matching.ty, alt.ty, left_chain, right_chain, info, &seg, &seg) {
                return false;
            }
        }
        true
    }

    fn dimension_message(
        &self,
        left: TypeId,
        right: TypeId,
        ld: Dimension,
        rd: Dimension,
    ) -> String {
        format!(
            "array dimensions differ: `{}` has size {} at offset {} but `{}` has size {} at offset {}",
            self.table.name(left),
            ld.size,
            ld.offset,
            self.table.name(right),
            rd.size,
            rd.offset
        )
    }
}
