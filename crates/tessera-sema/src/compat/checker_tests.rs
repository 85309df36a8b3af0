use rowan::TextRange;
use tessera_core::{Dimension, Field, PrimitiveType, TypeId, TypeKind, TypeTable};

use super::CompatibilityChecker;
use crate::diagnostics::Diagnostics;

fn int(table: &TypeTable) -> TypeId {
    table.primitive(PrimitiveType::Integer)
}

fn float(table: &TypeTable) -> TypeId {
    table.primitive(PrimitiveType::Float)
}

fn int_array(table: &mut TypeTable, name: &str, size: u64, offset: i64) -> TypeId {
    let element = int(table);
    table.declare(
        name,
        TypeKind::Array {
            element,
            dimension: Dimension::new(size, offset),
        },
    )
}

#[test]
fn same_declaration_is_compatible() {
    let mut table = TypeTable::new();
    let pair = table.declare(
        "Pair",
        TypeKind::Record {
            fields: vec![
                Field::required("x", int(&table)),
                Field::required("y", int(&table)),
            ],
        },
    );

    let mut checker = CompatibilityChecker::new(&table);
    let result = checker.check_compatible(pair, pair);
    assert!(result.compatible);
    assert!(!result.needs_conversion);
    assert!(result.diagnostic.is_none());
}

#[test]
fn distinct_primitives_are_incompatible() {
    let table = TypeTable::new();
    let mut checker = CompatibilityChecker::new(&table);

    let result = checker.check_compatible(int(&table), float(&table));
    assert!(!result.compatible);
    let mismatch = result.diagnostic.unwrap();
    insta::assert_snapshot!(
        mismatch.full_message(),
        @"`integer` and `float` are not compatible: `integer` and `float` are distinct primitive types"
    );
}

#[test]
fn structurally_equal_records_need_no_conversion() {
    let mut table = TypeTable::new();
    let a = table.declare(
        "A",
        TypeKind::Record {
            fields: vec![
                Field::required("x", int(&table)),
                Field::optional("y", float(&table)),
            ],
        },
    );
    let b = table.declare(
        "B",
        TypeKind::Record {
            fields: vec![
                Field::required("p", int(&table)),
                Field::optional("q", float(&table)),
            ],
        },
    );

    let mut checker = CompatibilityChecker::new(&table);
    let result = checker.check_compatible(a, b);
    assert!(result.compatible);
    assert!(!result.needs_conversion);
}

#[test]
fn record_field_count_mismatch() {
    let mut table = TypeTable::new();
    let a = table.declare(
        "A",
        TypeKind::Record {
            fields: vec![
                Field::required("x", int(&table)),
                Field::required("y", int(&table)),
            ],
        },
    );
    let b = table.declare(
        "B",
        TypeKind::Record {
            fields: vec![Field::required("x", int(&table))],
        },
    );

    let mut checker = CompatibilityChecker::new(&table);
    let result = checker.check_compatible(a, b);
    assert!(!result.compatible);
    insta::assert_snapshot!(
        result.diagnostic.unwrap().full_message(),
        @"`A` and `B` are not compatible: field counts differ: `A` has 2 fields but `B` has 1"
    );
}

#[test]
fn optionality_must_agree() {
    let mut table = TypeTable::new();
    let a = table.declare(
        "A",
        TypeKind::Record {
            fields: vec![Field::required("x", int(&table))],
        },
    );
    let b = table.declare(
        "B",
        TypeKind::Record {
            fields: vec![Field::optional("x", int(&table))],
        },
    );

    let mut checker = CompatibilityChecker::new(&table);
    let result = checker.check_compatible(a, b);
    assert!(!result.compatible);
    insta::assert_snapshot!(
        result.diagnostic.unwrap().full_message(),
        @"`A` and `B` are not compatible: field `x` and field `x` differ in optionality"
    );
}

#[test]
fn record_against_array_of_matching_arity() {
    let mut table = TypeTable::new();
    let pair = table.declare(
        "Pair",
        TypeKind::Record {
            fields: vec![
                Field::required("x", int(&table)),
                Field::required("y", int(&table)),
            ],
        },
    );
    let arr = int_array(&mut table, "IntPair", 2, 0);

    let mut checker = CompatibilityChecker::new(&table);
    let result = checker.check_compatible(pair, arr);
    assert!(result.compatible);
    // Shapes differ, so assignment crosses representations.
    assert!(result.needs_conversion);

    // Same verdict with the array on the left.
    let result = checker.check_compatible(arr, pair);
    assert!(result.compatible);
    assert!(result.needs_conversion);
}

#[test]
fn record_against_array_of_wrong_arity() {
    let mut table = TypeTable::new();
    let triple = table.declare(
        "Triple",
        TypeKind::Record {
            fields: vec![
                Field::required("a", int(&table)),
                Field::required("b", int(&table)),
                Field::required("c", int(&table)),
            ],
        },
    );
    let two = int_array(&mut table, "Arr2", 2, 0);
    let three = int_array(&mut table, "Arr3", 3, 0);

    let mut checker = CompatibilityChecker::new(&table);
    let result = checker.check_compatible(triple, two);
    assert!(!result.compatible);
    insta::assert_snapshot!(
        result.diagnostic.unwrap().full_message(),
        @"`Triple` and `Arr2` are not compatible: field counts differ: `Triple` has 3 fields but `Arr2` has 2 elements"
    );

    assert!(checker.check_compatible(triple, three).compatible);
}

#[test]
fn empty_record_never_matches_an_array() {
    let mut table = TypeTable::new();
    let empty = table.declare("Empty", TypeKind::Record { fields: vec![] });
    let arr = int_array(&mut table, "Arr", 1, 0);

    let mut checker = CompatibilityChecker::new(&table);
    assert!(!checker.check_compatible(empty, arr).compatible);
    assert!(!checker.check_compatible(arr, empty).compatible);
}

#[test]
fn array_dimension_identity_includes_offset() {
    let mut table = TypeTable::new();
    let a = int_array(&mut table, "A", 2, 0);
    let b = int_array(&mut table, "B", 2, 1);

    let mut checker = CompatibilityChecker::new(&table);
    let result = checker.check_compatible(a, b);
    assert!(!result.compatible);
    insta::assert_snapshot!(
        result.diagnostic.unwrap().full_message(),
        @"`A` and `B` are not compatible: array dimensions differ: `A` has size 2 at offset 0 but `B` has size 2 at offset 1"
    );
}

#[test]
fn record_of_against_array_ignores_arity() {
    let mut table = TypeTable::new();
    let element = int(&table);
    let ro = table.declare("Ints", TypeKind::RecordOf { element });
    let arr = int_array(&mut table, "Arr5", 5, 0);

    let mut checker = CompatibilityChecker::new(&table);
    let result = checker.check_compatible(ro, arr);
    assert!(result.compatible);
    assert!(result.needs_conversion);
}

#[test]
fn families_never_mix() {
    let mut table = TypeTable::new();
    let element = int(&table);
    let rec = table.declare(
        "Rec",
        TypeKind::Record {
            fields: vec![Field::required("x", element)],
        },
    );
    let set = table.declare("Ints", TypeKind::SetOf { element });

    let mut checker = CompatibilityChecker::new(&table);
    let result = checker.check_compatible(rec, set);
    assert!(!result.compatible);
    insta::assert_snapshot!(
        result.diagnostic.unwrap().full_message(),
        @"`Rec` and `Ints` are not compatible: array and record types are compatible only with other array and record types, not with set and set of types"
    );
}

#[test]
fn set_rules_mirror_record_rules() {
    let mut table = TypeTable::new();
    let a = table.declare(
        "SA",
        TypeKind::Set {
            fields: vec![
                Field::required("x", int(&table)),
                Field::required("y", int(&table)),
            ],
        },
    );
    let element = int(&table);
    let b = table.declare("SB", TypeKind::SetOf { element });

    let mut checker = CompatibilityChecker::new(&table);
    let result = checker.check_compatible(a, b);
    assert!(result.compatible);
    assert!(result.needs_conversion);
}

#[test]
fn mismatch_paths_name_the_failing_subfields() {
    let mut table = TypeTable::new();
    let inner_a = table.declare(
        "InnerA",
        TypeKind::Record {
            fields: vec![Field::required("b", int(&table))],
        },
    );
    let outer_a = table.declare(
        "OuterA",
        TypeKind::Record {
            fields: vec![Field::required("a", inner_a)],
        },
    );
    let inner_b = table.declare(
        "InnerB",
        TypeKind::Record {
            fields: vec![Field::required("d", float(&table))],
        },
    );
    let outer_b = table.declare(
        "OuterB",
        TypeKind::Record {
            fields: vec![Field::required("c", inner_b)],
        },
    );

    let mut checker = CompatibilityChecker::new(&table);
    let result = checker.check_compatible(outer_a, outer_b);
    assert!(!result.compatible);
    let mismatch = result.diagnostic.unwrap();
    assert_eq!(mismatch.left_path, "OuterA.a.b");
    assert_eq!(mismatch.right_path, "OuterB.c.d");
    assert_eq!(mismatch.left_type, int(&table));
    assert_eq!(mismatch.right_type, float(&table));
}

#[test]
fn mutually_recursive_records_terminate() {
    let mut table = TypeTable::new();
    let a = table.reserve("NodeA");
    table.define(
        a,
        TypeKind::Record {
            fields: vec![
                Field::required("value", int(&table)),
                Field::optional("next", a),
            ],
        },
    );
    let b = table.reserve("NodeB");
    table.define(
        b,
        TypeKind::Record {
            fields: vec![
                Field::required("value", int(&table)),
                Field::optional("next", b),
            ],
        },
    );

    let mut checker = CompatibilityChecker::new(&table);
    let result = checker.check_compatible(a, b);
    assert!(result.compatible);
    assert!(!result.needs_conversion);
}

#[test]
fn recursive_records_with_differing_payloads_are_incompatible() {
    let mut table = TypeTable::new();
    let a = table.reserve("NodeA");
    table.define(
        a,
        TypeKind::Record {
            fields: vec![
                Field::required("value", int(&table)),
                Field::optional("next", a),
            ],
        },
    );
    let b = table.reserve("NodeB");
    table.define(
        b,
        TypeKind::Record {
            fields: vec![
                Field::required("value", float(&table)),
                Field::optional("next", b),
            ],
        },
    );

    let mut checker = CompatibilityChecker::new(&table);
    let result = checker.check_compatible(a, b);
    assert!(!result.compatible);
    let mismatch = result.diagnostic.unwrap();
    assert_eq!(mismatch.left_path, "NodeA.value");
    assert_eq!(mismatch.right_path, "NodeB.value");
}

#[test]
fn recursion_through_an_intermediate_terminates() {
    // NodeA loops in one hop, NodeB through an intermediate declaration.
    let mut table = TypeTable::new();
    let a = table.reserve("NodeA");
    table.define(
        a,
        TypeKind::Record {
            fields: vec![Field::optional("next", a)],
        },
    );
    let b = table.reserve("NodeB");
    let link = table.declare(
        "Link",
        TypeKind::Record {
            fields: vec![Field::optional("next", b)],
        },
    );
    table.define(
        b,
        TypeKind::Record {
            fields: vec![Field::optional("next", link)],
        },
    );

    let mut checker = CompatibilityChecker::new(&table);
    // Verdicts aside, these checks must not loop forever.
    checker.check_compatible(a, b);
    checker.check_compatible(b, a);
}

#[test]
fn one_sided_recursion_still_finds_the_mismatch() {
    let mut table = TypeTable::new();
    let a = table.reserve("NodeA");
    table.define(
        a,
        TypeKind::Record {
            fields: vec![Field::optional("next", a)],
        },
    );
    let b = table.declare(
        "Flat",
        TypeKind::Record {
            fields: vec![Field::optional("next", int(&table))],
        },
    );

    let mut checker = CompatibilityChecker::new(&table);
    let result = checker.check_compatible(a, b);
    assert!(!result.compatible);
    let mismatch = result.diagnostic.unwrap();
    assert_eq!(mismatch.left_path, "NodeA.next");
    assert_eq!(mismatch.right_path, "Flat.next");
}

#[test]
fn variant_needs_every_right_alternative_on_the_left() {
    let mut table = TypeTable::new();
    let wide = table.declare(
        "Wide",
        TypeKind::Choice {
            alternatives: vec![
                Field::required("i", int(&table)),
                Field::required("f", float(&table)),
            ],
        },
    );
    let narrow = table.declare(
        "Narrow",
        TypeKind::Choice {
            alternatives: vec![Field::required("i", int(&table))],
        },
    );

    let mut checker = CompatibilityChecker::new(&table);
    assert!(checker.check_compatible(wide, narrow).compatible);

    let result = checker.check_compatible(narrow, wide);
    assert!(!result.compatible);
    insta::assert_snapshot!(
        result.diagnostic.unwrap().full_message(),
        @"`Narrow` and `Wide` are not compatible: `Narrow` has no alternative named `f`"
    );
}

#[test]
fn anytype_and_union_share_the_variant_rule() {
    let mut table = TypeTable::new();
    let any = table.declare(
        "Any",
        TypeKind::Anytype {
            alternatives: vec![
                Field::required("i", int(&table)),
                Field::required("f", float(&table)),
            ],
        },
    );
    let choice = table.declare(
        "Choice",
        TypeKind::Choice {
            alternatives: vec![Field::required("i", int(&table))],
        },
    );

    let mut checker = CompatibilityChecker::new(&table);
    let result = checker.check_compatible(any, choice);
    assert!(result.compatible);
    assert!(result.needs_conversion);
}

#[test]
fn aliases_are_transparent() {
    let mut table = TypeTable::new();
    let pair = table.declare(
        "Pair",
        TypeKind::Record {
            fields: vec![
                Field::required("x", int(&table)),
                Field::required("y", int(&table)),
            ],
        },
    );
    let alias = table.declare("PairAlias", TypeKind::Alias { target: pair });
    let arr = int_array(&mut table, "Arr2", 2, 0);

    let mut checker = CompatibilityChecker::new(&table);
    let result = checker.check_compatible(alias, pair);
    assert!(result.compatible);
    assert!(!result.needs_conversion);

    let result = checker.check_compatible(alias, arr);
    assert!(result.compatible);
    assert!(result.needs_conversion);
}

#[test]
fn erroneous_types_are_compatible_with_anything() {
    let mut table = TypeTable::new();
    let rec = table.declare(
        "Rec",
        TypeKind::Record {
            fields: vec![Field::required("x", int(&table))],
        },
    );
    let element = int(&table);
    let set = table.declare("Ints", TypeKind::SetOf { element });
    table.mark_erroneous(rec);

    let mut checker = CompatibilityChecker::new(&table);
    let result = checker.check_compatible(rec, set);
    assert!(result.compatible);
    assert!(result.diagnostic.is_none());
}

#[test]
fn verdicts_are_memoized_per_generation() {
    let mut table = TypeTable::new();
    let a = table.declare(
        "A",
        TypeKind::Record {
            fields: vec![Field::required("x", int(&table))],
        },
    );
    let b = table.declare(
        "B",
        TypeKind::Record {
            fields: vec![Field::required("x", float(&table))],
        },
    );

    let mut checker = CompatibilityChecker::new(&table);
    let first = checker.check_compatible(a, b);
    let second = checker.check_compatible(a, b);
    assert!(!first.compatible && !second.compatible);
    assert_eq!(first.diagnostic, second.diagnostic);

    checker.bump_generation();
    assert_eq!(checker.generation(), 1);
    let third = checker.check_compatible(a, b);
    assert_eq!(first.diagnostic, third.diagnostic);
}

#[test]
fn emit_reports_the_mismatch_once() {
    let mut table = TypeTable::new();
    let a = table.declare(
        "A",
        TypeKind::Record {
            fields: vec![Field::required("x", int(&table))],
        },
    );
    let b = table.declare(
        "B",
        TypeKind::Record {
            fields: vec![Field::required("x", float(&table))],
        },
    );

    let mut checker = CompatibilityChecker::new(&table);
    let mut diagnostics = Diagnostics::new();

    let ok = checker.check_compatible(a, a);
    ok.emit_to(&mut diagnostics, TextRange::new(0.into(), 4.into()));
    assert!(diagnostics.is_empty());

    let bad = checker.check_compatible(a, b);
    bad.emit_to(&mut diagnostics, TextRange::new(0.into(), 4.into()));
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics.message_at(0),
        Some(
            "type mismatch: `A.x` and `B.x` are not compatible: `integer` and `float` are distinct primitive types"
        )
    );
}
