use super::*;
use crate::canvas::block::BlockData;
use crate::foundation::core::{Point, Timestamp};

fn named(id: &str, name: &str) -> Block {
    Block {
        id: BlockId::from(id),
        name: name.to_string(),
        position: Point::ORIGIN,
        data: BlockData::default(),
        created_at: Timestamp(0),
        updated_at: Timestamp(0),
    }
}

fn blocks() -> Vec<Block> {
    vec![
        named("a", "Hero Banner"),
        named("b", "Story ad"),
        named("c", "banner v2"),
    ]
}

#[test]
fn search_is_case_insensitive() {
    let bs = blocks();
    let hits: Vec<_> = filter_layers(&bs, "  BANNER ").iter().map(|b| b.id.as_str()).collect();
    assert_eq!(hits, vec!["a", "c"]);
    assert_eq!(filter_layers(&bs, "").len(), 3);
}

#[test]
fn collapsed_panel_shows_active_only() {
    let bs = blocks();
    let active = BlockId::from("b");
    let p = layer_panel(&bs, "", false, Some(&active));
    assert_eq!(p.rows.len(), 1);
    assert_eq!(p.rows[0].id, active);
    assert_eq!(p.hidden, 2);
}

#[test]
fn collapsed_panel_falls_back_to_last() {
    let bs = blocks();
    let p = layer_panel(&bs, "", false, None);
    assert_eq!(p.rows[0].id, BlockId::from("c"));
}

#[test]
fn search_or_expansion_lists_all_matches() {
    let bs = blocks();
    let p = layer_panel(&bs, "banner", false, Some(&BlockId::from("b")));
    assert_eq!(p.rows.len(), 2);
    assert_eq!(p.hidden, 0);

    let p = layer_panel(&bs, "", true, None);
    assert_eq!(p.rows.len(), 3);
}

#[test]
fn no_matches_yields_empty_panel() {
    let bs = blocks();
    let p = layer_panel(&bs, "zzz", false, None);
    assert!(p.rows.is_empty());
    assert_eq!(p.hidden, 0);
}
