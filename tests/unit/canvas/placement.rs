use super::*;
use crate::canvas::block::CreationType;
use crate::foundation::core::Timestamp;
use crate::foundation::ids::ItemId;

fn at(id: &str, x: f64, y: f64) -> ResultItem {
    let mut item = ResultItem::new(ItemId::from(id), CreationType::Image, "", "", Timestamp(0));
    item.position = Some(Point::new(x, y));
    item
}

#[test]
fn wide_viewport_shifts_once_past_existing_item() {
    let existing = vec![at("a", 440.0, 0.0)];
    let p = place_result(
        Some(Point::ORIGIN),
        1440.0,
        &existing,
        &PlacementRules::default(),
    );
    assert_eq!(p.position, Point::new(780.0, 0.0));
    assert_eq!(p.shifts, 1);
}

#[test]
fn narrow_viewport_places_below() {
    let p = place_result(
        Some(Point::new(100.0, 50.0)),
        800.0,
        &[],
        &PlacementRules::default(),
    );
    assert_eq!(p.position, Point::new(100.0, 700.0));
    assert_eq!(p.shifts, 0);
}

#[test]
fn breakpoint_is_inclusive() {
    let p = place_result(Some(Point::ORIGIN), 1024.0, &[], &PlacementRules::default());
    assert_eq!(p.position, Point::new(440.0, 0.0));
}

#[test]
fn missing_anchor_and_positions_count_as_origin() {
    let mut unplaced = at("u", 0.0, 0.0);
    unplaced.position = None;
    let rules = PlacementRules {
        offset_wide: 0.0,
        ..PlacementRules::default()
    };
    let p = place_result(None, 2000.0, &[unplaced], &rules);
    assert_eq!(p.position, Point::new(340.0, 0.0));
}

#[test]
fn collision_threshold_is_strict() {
    let existing = vec![at("a", 490.0, 0.0)];
    let p = place_result(
        Some(Point::ORIGIN),
        1440.0,
        &existing,
        &PlacementRules::default(),
    );
    assert_eq!(p.shifts, 0);
}

#[test]
fn shifting_terminates_after_budget() {
    let existing: Vec<_> = (0..40)
        .map(|i| at(&format!("i{i}"), 440.0 + 340.0 * i as f64, 10.0))
        .collect();
    let p = place_result(
        Some(Point::ORIGIN),
        1440.0,
        &existing,
        &PlacementRules::default(),
    );
    assert_eq!(p.shifts, 10);
    assert_eq!(p.position, Point::new(440.0 + 3400.0, 0.0));
}

#[test]
fn dropped_files_stagger_from_drop_point() {
    let t = ViewportTransform {
        x: 100.0,
        y: 0.0,
        scale: 2.0,
    };
    let ps = place_dropped(Point::new(300.0, 200.0), 3, &t, &PlacementRules::default());
    assert_eq!(
        ps,
        vec![
            Point::new(100.0, 100.0),
            Point::new(120.0, 120.0),
            Point::new(140.0, 140.0)
        ]
    );
}
