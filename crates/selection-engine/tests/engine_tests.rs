//! End-to-end selection and bulk-edit behavior on small grids.

use selection_engine::{ApplyOp, Condition, Selection, SelectionEngine};
use test_utils::ramp_block;

#[test]
fn test_toggle_parity() {
    let raster = ramp_block(4, 4);
    let mut engine = SelectionEngine::new();

    // once: the singleton {(1, 2)}
    engine.toggle_point(&raster, 1.5, 2.5, true);
    assert_eq!(engine.count_on(&raster), 1);
    let cells = engine.selection().cells().unwrap();
    assert!(cells.contains((1, 2)));

    // twice: back to empty
    engine.toggle_point(&raster, 1.5, 2.5, true);
    assert_eq!(engine.count_on(&raster), 0);
}

#[test]
fn test_toggle_without_verify_appends() {
    let raster = ramp_block(4, 4);
    let mut engine = SelectionEngine::new();

    engine.toggle_point(&raster, 0.5, 0.5, false);
    engine.toggle_point(&raster, 0.5, 0.5, false);
    // fast path: no parity, caller owns uniqueness
    assert_eq!(engine.count_on(&raster), 2);
}

#[test]
fn test_toggle_points_unique_with_parity() {
    let raster = ramp_block(4, 4);
    let mut engine = SelectionEngine::new();

    let p = (0.5, 0.5);
    let q = (1.5, 0.5);
    // p appears twice (cancels), q three times (net toggle once)
    engine.toggle_points(&raster, &[p, q, p, q, q], true);
    let cells = engine.selection().cells().unwrap();
    assert_eq!(cells.cells(), &[(1, 0)]);
}

#[test]
fn test_out_of_footprint_points_are_dropped() {
    let raster = ramp_block(4, 4);
    let mut engine = SelectionEngine::new();
    engine.toggle_point(&raster, -10.0, 0.5, true);
    engine.toggle_points(&raster, &[(50.0, 50.0)], true);
    assert_eq!(engine.count_on(&raster), 0);
}

#[test]
fn test_conditional_edit_on_4x4_ramp() {
    // 4×4 grid, dx=dy=1, origin (0,0), values 1..16
    let mut raster = ramp_block(4, 4);
    let mut engine = SelectionEngine::new();

    engine.condition_select(&raster, Condition::Less(9.0));
    assert_eq!(engine.count_on(&raster), 8);

    engine.apply(&mut raster, ApplyOp::Add, 100.0, Condition::Less(9.0));

    // exactly the 8 cells below 9 gained 100, the rest are untouched
    for j in 0..4 {
        for i in 0..4 {
            let original = (1 + i + 4 * j) as f64;
            let expected = if original < 9.0 {
                original + 100.0
            } else {
                original
            };
            assert_eq!(raster.get(i, j), Some(expected), "cell ({i}, {j})");
        }
    }
}

#[test]
fn test_condition_select_intersects_existing_selection() {
    let raster = ramp_block(4, 4);
    let mut engine = SelectionEngine::new();

    engine.condition_select(&raster, Condition::Less(9.0)); // values 1..8
    engine.condition_select(&raster, Condition::Greater(4.0)); // intersect: 5..8
    assert_eq!(engine.count_on(&raster), 4);
    let cells = engine.selection().cells().unwrap();
    for &(i, j) in cells.cells() {
        let v = (1 + i + 4 * j) as f64;
        assert!(v > 4.0 && v < 9.0);
    }
}

#[test]
fn test_condition_select_skips_masked_cells() {
    let mut raster = ramp_block(4, 4);
    raster.mask_less(3.0); // masks values 1, 2
    let mut engine = SelectionEngine::new();

    engine.condition_select(&raster, Condition::Less(9.0));
    assert_eq!(engine.count_on(&raster), 6); // 3..8

    engine.clear();
    engine.condition_select(&raster, Condition::IsMasked);
    assert_eq!(engine.count_on(&raster), 2);
}

#[test]
fn test_apply_nan_condition_always_replaces() {
    let mut raster = ramp_block(2, 2);
    raster.set(0, 0, f64::NAN);
    raster.invalidate();
    let engine = SelectionEngine::new();

    // op says Add, but NaN fails every arithmetic identity: replace wins
    engine.apply(&mut raster, ApplyOp::Add, 0.0, Condition::IsNan);
    assert_eq!(raster.get(0, 0), Some(0.0));
    assert_eq!(raster.get(1, 1), Some(4.0));
}

#[test]
fn test_apply_scoped_to_explicit_selection() {
    let mut raster = ramp_block(4, 4);
    let mut engine = SelectionEngine::new();

    engine.toggle_point(&raster, 0.5, 0.5, true); // value 1
    engine.toggle_point(&raster, 3.5, 3.5, true); // value 16
    engine.apply(&mut raster, ApplyOp::Mul, 10.0, Condition::Greater(0.0));

    assert_eq!(raster.get(0, 0), Some(10.0));
    assert_eq!(raster.get(3, 3), Some(160.0));
    // a cell outside the scope
    assert_eq!(raster.get(1, 0), Some(2.0));
}

#[test]
fn test_apply_div_by_zero_is_noop() {
    let mut raster = ramp_block(2, 2);
    let engine = SelectionEngine::new();
    engine.apply(&mut raster, ApplyOp::Div, 0.0, Condition::Greater(0.0));
    assert_eq!(raster.get(0, 0), Some(1.0));
    assert_eq!(raster.get(1, 1), Some(4.0));
}

#[test]
fn test_apply_mask() {
    let mut raster = ramp_block(4, 4);
    let engine = SelectionEngine::new();

    engine.apply_mask(&mut raster, Condition::GreaterEq(13.0));
    assert_eq!(raster.not_null_count(), 12);
    assert!(raster.is_masked_at(0, 3));
    assert!(!raster.is_masked_at(0, 0));
}

#[test]
fn test_select_inside_polygon_and_materialize() {
    let raster = ramp_block(4, 4);
    let mut engine = SelectionEngine::new();

    // square over the 2×2 center
    let poly = [(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)];
    engine.select_inside_polygon(&raster, &poly, false);
    assert_eq!(engine.count_on(&raster), 4);

    let sub = engine.materialize(&raster).unwrap();
    assert_eq!(sub.shape(), (2, 2, 1));
    // minimal bounding header re-anchors at cell (1,1)
    assert_eq!(sub.header().ox, 1.0);
    assert_eq!(sub.header().oy, 1.0);
    assert_eq!(sub.get(0, 0), Some(6.0));
    assert_eq!(sub.get(1, 1), Some(11.0));
}

#[test]
fn test_materialize_sparse_selection_masks_gaps() {
    let raster = ramp_block(4, 4);
    let mut engine = SelectionEngine::new();

    engine.toggle_point(&raster, 0.5, 0.5, true); // (0,0)
    engine.toggle_point(&raster, 2.5, 2.5, true); // (2,2)
    let sub = engine.materialize(&raster).unwrap();

    assert_eq!(sub.shape(), (3, 3, 1));
    assert_eq!(sub.not_null_count(), 2);
    assert_eq!(sub.get(0, 0), Some(1.0));
    assert_eq!(sub.get(2, 2), Some(11.0));
    assert!(sub.is_masked_at(1, 1));
}

#[test]
fn test_materialize_empty_selection_fails() {
    let raster = ramp_block(2, 2);
    let engine = SelectionEngine::new();
    assert!(engine.materialize(&raster).is_err());
}

#[test]
fn test_select_under_polyline() {
    let raster = ramp_block(4, 4);
    let mut engine = SelectionEngine::new();
    engine.select_under_polyline(&raster, &[(0.5, 0.5), (3.5, 0.5)], false);
    let cells = engine.selection().cells().unwrap();
    assert_eq!(cells.cells(), &[(0, 0), (1, 0), (2, 0), (3, 0)]);
}

#[test]
fn test_stash_and_recall() {
    let raster = ramp_block(4, 4);
    let mut engine = SelectionEngine::new();

    engine.toggle_point(&raster, 0.5, 0.5, true);
    engine.stash("inlet", "boundary cells");
    assert!(matches!(engine.selection(), Selection::Empty));
    assert_eq!(engine.stashes().count(), 1);

    assert!(engine.recall("inlet"));
    assert_eq!(engine.count_on(&raster), 1);
    // recall detaches the bucket
    assert!(!engine.recall("inlet"));
    assert!(!engine.drop_stash("inlet"));
}

#[test]
fn test_echo_threshold_is_advisory() {
    let raster = ramp_block(4, 4);
    let mut engine = SelectionEngine::new();
    engine.select_all();

    assert!(!engine.echo_suppressed(&raster));
    engine.set_echo_threshold(Some(10));
    assert!(engine.echo_suppressed(&raster));
    engine.set_echo_threshold(Some(100));
    assert!(!engine.echo_suppressed(&raster));
}
