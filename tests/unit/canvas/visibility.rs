use super::*;
use crate::canvas::block::BlockData;
use crate::foundation::core::{Point, Timestamp};
use crate::foundation::ids::BlockId;

fn block(i: usize, x: f64, y: f64) -> Block {
    Block {
        id: BlockId::from(format!("b{i}")),
        name: format!("B{i}"),
        position: Point::new(x, y),
        data: BlockData::default(),
        created_at: Timestamp(0),
        updated_at: Timestamp(0),
    }
}

fn ids(v: &[&Block]) -> Vec<String> {
    v.iter().map(|b| b.id.to_string()).collect()
}

#[test]
fn small_registries_are_not_filtered() {
    let blocks: Vec<_> = (0..9).map(|i| block(i, 1e9, 1e9)).collect();
    let v = visible_blocks(
        &blocks,
        &ViewportTransform::default(),
        Size::new(1000.0, 800.0),
        &VisibilityRules::default(),
    );
    assert_eq!(v.len(), 9);
}

#[test]
fn non_finite_transform_returns_first_two() {
    let blocks: Vec<_> = (0..3).map(|i| block(i, 0.0, 0.0)).collect();
    let t = ViewportTransform {
        x: f64::NAN,
        y: 0.0,
        scale: 1.0,
    };
    let v = visible_blocks(&blocks, &t, Size::new(1000.0, 800.0), &VisibilityRules::default());
    assert_eq!(ids(&v), vec!["b0", "b1"]);
}

#[test]
fn buffered_viewport_bounds_are_strict() {
    let mut blocks: Vec<_> = (0..10).map(|i| block(i, 500.0, 400.0)).collect();
    blocks[0].position = Point::new(2499.0, 0.0);
    blocks[1].position = Point::new(2500.0, 0.0);
    blocks[2].position = Point::new(-1500.0, 0.0);
    blocks[3].position = Point::new(-1499.0, -1499.0);
    blocks[4].position = Point::new(0.0, 2301.0);

    let v = visible_blocks(
        &blocks,
        &ViewportTransform::default(),
        Size::new(1000.0, 800.0),
        &VisibilityRules::default(),
    );
    let got = ids(&v);
    assert!(got.contains(&"b0".to_string()));
    assert!(!got.contains(&"b1".to_string()));
    assert!(!got.contains(&"b2".to_string()));
    assert!(got.contains(&"b3".to_string()));
    assert!(!got.contains(&"b4".to_string()));
    assert_eq!(got.len(), 7);
}

#[test]
fn filter_follows_pan_and_zoom() {
    let mut blocks: Vec<_> = (0..10).map(|i| block(i, 0.0, 0.0)).collect();
    blocks[9].position = Point::new(10_000.0, 0.0);
    let t = ViewportTransform {
        x: -10_000.0 * 0.5,
        y: 0.0,
        scale: 0.5,
    };
    let v = visible_blocks(&blocks, &t, Size::new(1000.0, 800.0), &VisibilityRules::default());
    assert_eq!(ids(&v), vec!["b9"]);
}
