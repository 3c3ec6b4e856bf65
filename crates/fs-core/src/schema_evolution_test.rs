use super::*;
use LogicalType::*;

fn snap(pairs: &[(&str, LogicalType)]) -> SchemaSnapshot {
    SchemaSnapshot::from_pairs(pairs.iter().copied())
}

#[test]
fn test_diff_widen_remove_add() {
    let prev = snap(&[("a", Int32), ("b", String)]);
    let cur = snap(&[("a", Int64), ("c", String)]);
    let changes = diff_schemas(&prev, &cur);

    assert_eq!(changes.len(), 3);
    assert_eq!(changes[0].name, "b");
    assert_eq!(changes[0].kind, FieldChangeKind::Removed);
    assert_eq!(changes[1].name, "c");
    assert_eq!(changes[1].kind, FieldChangeKind::Added);
    assert_eq!(changes[2].name, "a");
    assert_eq!(changes[2].kind, FieldChangeKind::Widened);
    assert_eq!(changes[2].old_type, Some(Int32));
    assert_eq!(changes[2].new_type, Some(Int64));
}

#[test]
fn test_diff_ignores_field_order() {
    let prev = snap(&[("a", Int32), ("b", String)]);
    let cur = snap(&[("b", String), ("a", Int32)]);
    assert!(diff_schemas(&prev, &cur).is_empty());
}

#[test]
fn test_modified_sorted_after_membership() {
    let prev = snap(&[("z", Int8), ("m", Float64), ("k", Bool)]);
    let cur = snap(&[("z", Int16), ("m", Int32), ("a", Date)]);
    let changes = diff_schemas(&prev, &cur);
    let names: Vec<(&str, FieldChangeKind)> =
        changes.iter().map(|c| (c.name.as_str(), c.kind)).collect();
    assert_eq!(
        names,
        vec![
            ("a", FieldChangeKind::Added),
            ("k", FieldChangeKind::Removed),
            ("m", FieldChangeKind::Narrowed),
            ("z", FieldChangeKind::Widened),
        ]
    );
}

#[test]
fn test_lattice_within_families() {
    assert_eq!(classify_type_change(Int8, Int64), Some(FieldChangeKind::Widened));
    assert_eq!(classify_type_change(Int64, Int16), Some(FieldChangeKind::Narrowed));
    assert_eq!(classify_type_change(Uint8, Uint32), Some(FieldChangeKind::Widened));
    assert_eq!(classify_type_change(Float32, Float64), Some(FieldChangeKind::Widened));
    assert_eq!(classify_type_change(Float64, Float32), Some(FieldChangeKind::Narrowed));
    assert_eq!(classify_type_change(Int32, Int32), None);
}

#[test]
fn test_lattice_across_numeric_families() {
    assert_eq!(classify_type_change(Uint16, Int32), Some(FieldChangeKind::Widened));
    assert_eq!(classify_type_change(Uint32, Int32), Some(FieldChangeKind::Narrowed));
    assert_eq!(classify_type_change(Int8, Uint64), Some(FieldChangeKind::Narrowed));
    assert_eq!(classify_type_change(Int64, Float64), Some(FieldChangeKind::Widened));
    assert_eq!(classify_type_change(Uint8, Float32), Some(FieldChangeKind::Widened));
    assert_eq!(classify_type_change(Float64, Int32), Some(FieldChangeKind::Narrowed));
}

#[test]
fn test_lattice_cross_family_incompatible() {
    assert_eq!(classify_type_change(String, Int64), Some(FieldChangeKind::Incompatible));
    assert_eq!(classify_type_change(Int64, String), Some(FieldChangeKind::Incompatible));
    assert_eq!(classify_type_change(Bool, Int8), Some(FieldChangeKind::Incompatible));
    assert_eq!(classify_type_change(Datetime, Int64), Some(FieldChangeKind::Incompatible));
    assert_eq!(classify_type_change(Date, Datetime), Some(FieldChangeKind::Widened));
    assert_eq!(classify_type_change(Datetime, Date), Some(FieldChangeKind::Narrowed));
}

#[test]
fn test_every_type_pair_is_classified_consistently() {
    let all = [
        Bool, Int8, Int16, Int32, Int64, Uint8, Uint16, Uint32, Uint64, Float32, Float64, String,
        Date, Datetime,
    ];
    for &a in &all {
        for &b in &all {
            let forward = classify_type_change(a, b);
            if a == b {
                assert_eq!(forward, None);
                continue;
            }
            let backward = classify_type_change(b, a);
            // A widening never widens back, and incompatibility is symmetric.
            if forward == Some(FieldChangeKind::Widened) {
                assert_ne!(backward, Some(FieldChangeKind::Widened), "{a} <-> {b}");
            }
            if forward == Some(FieldChangeKind::Incompatible) {
                assert_eq!(backward, Some(FieldChangeKind::Incompatible), "{a} <-> {b}");
            }
        }
    }
}

#[test]
fn test_migration_actions() {
    let evo = SchemaEvolution::detect(
        Some(&snap(&[("a", Int32), ("b", String)])),
        &snap(&[("a", Int64)]),
    );
    assert_eq!(evo.migration_action(), MigrationAction::Continue);
    assert!(!evo.requires_backfill());

    let evo = SchemaEvolution::detect(Some(&snap(&[("a", Int32)])), &snap(&[("a", String)]));
    assert!(evo.requires_backfill());

    let evo = SchemaEvolution::detect(Some(&snap(&[("a", Int32)])), &snap(&[("a", Int32), ("n", Bool)]));
    assert!(evo.requires_backfill());
}

#[test]
fn test_first_build_has_no_changes() {
    let evo = SchemaEvolution::detect(None, &snap(&[("a", Int32)]));
    assert!(evo.is_empty());
    assert_eq!(evo.migration_action(), MigrationAction::None);
}

#[test]
fn test_change_description() {
    let changes = diff_schemas(&snap(&[("a", Int32)]), &snap(&[("a", Int64)]));
    assert_eq!(changes[0].description(), "a widened (int32 -> int64)");
}
