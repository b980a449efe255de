use super::*;
use crate::assets::media::{MediaKind, encode_data_uri};
use crate::assets::store::MemoryAssetStore;
use crate::assets::store::Blob;
use crate::canvas::block::{BlockDataPatch, MediaSlot, ReferenceRole};
use crate::canvas::registry::ExtraReferencePatch;
use crate::foundation::core::ManualClock;
use crate::input::pointer::{HitTarget, PointerButton, PointerEvent};
use crate::persist::kv::MemoryKv;
use crate::persist::snapshot::Slot;

fn clock(start: i64) -> &'static ManualClock {
    Box::leak(Box::new(ManualClock::new(start)))
}

fn inline(bytes: &[u8]) -> MediaSlot {
    MediaSlot::from_handle(encode_data_uri("image/png", bytes), MediaKind::Image)
}

fn editor_at(width: f64, clock: &'static ManualClock) -> Editor<MemoryAssetStore> {
    Editor::with_clock(
        EditorConfig::default(),
        MemoryAssetStore::new(),
        Size::new(width, 800.0),
        Box::new(clock),
    )
    .unwrap()
}

#[test]
fn empty_load_yields_one_active_default_block() {
    let mut ed = editor_at(800.0, clock(0));
    ed.load(&MemoryKv::new());
    let blocks = ed.registry().blocks();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].name, "Initial Block");
    assert_eq!(blocks[0].position, Point::new(200.0, 300.0));
    assert_eq!(ed.active_block(), Some(&blocks[0].id));
    assert!(ed.debouncer().is_hydrated());
}

#[test]
fn add_block_lands_right_of_the_last_one() {
    let mut ed = editor_at(800.0, clock(0));
    ed.load(&MemoryKv::new());
    let id = ed.add_block();
    let block = ed.registry().get(&id).unwrap();
    assert_eq!(block.position, Point::new(650.0, 300.0));
    assert_eq!(block.name, "Block 2");
    assert_eq!(ed.active_block(), Some(&id));
}

#[test]
fn save_is_suppressed_until_loaded() {
    let mut ed = editor_at(1280.0, clock(0));
    let mut kv = MemoryKv::new();
    ed.add_block();
    assert_eq!(ed.debouncer().deadline(), None);
    let out = ed.save(&mut kv);
    assert!(out.written.is_empty());
    assert!(kv.slots().unwrap().is_empty());
}

#[test]
fn debounced_save_waits_for_quiet_period() {
    let clk = clock(10_000);
    let mut ed = editor_at(1280.0, clk);
    let mut kv = MemoryKv::new();
    ed.load(&kv);

    ed.add_block();
    clk.advance(1_500);
    ed.add_block();
    clk.advance(1_999);
    assert!(ed.save_if_due(&mut kv).is_none());
    clk.advance(1);
    let out = ed.save_if_due(&mut kv).unwrap();
    assert!(out.is_clean());
    assert!(ed.save_if_due(&mut kv).is_none());

    let stored: Vec<Block> =
        serde_json::from_str(&kv.get(Slot::EditorBlocks.key()).unwrap().unwrap()).unwrap();
    assert_eq!(stored.len(), 3);
}

#[test]
fn save_attaches_keys_and_does_not_store_twice() {
    let mut ed = editor_at(1280.0, clock(0));
    let mut kv = MemoryKv::new();
    ed.load(&kv);
    let id = ed.active_block().cloned().unwrap();
    let inline = encode_data_uri("image/png", &[1, 2, 3, 4]);
    ed.update_block_data(
        &id,
        BlockDataPatch {
            main: Some(MediaSlot::from_handle(inline.clone(), MediaKind::Image)),
            ..BlockDataPatch::default()
        },
    );

    ed.save(&mut kv);
    let live = &ed.registry().get(&id).unwrap().data.main;
    assert_eq!(live.handle, inline);
    let key = live.asset_id.clone().unwrap();
    assert_eq!(ed.store().ref_count(&key), 1);

    ed.save(&mut kv);
    assert_eq!(ed.store().ref_count(&key), 1);

    let stored: Vec<Block> =
        serde_json::from_str(&kv.get(Slot::EditorBlocks.key()).unwrap().unwrap()).unwrap();
    assert!(stored[0].data.main.handle.is_empty());
    assert_eq!(stored[0].data.main.asset_id.as_ref(), Some(&key));
}

#[test]
fn reload_restores_blocks_and_live_media() {
    let mut ed = editor_at(1280.0, clock(0));
    let mut kv = MemoryKv::new();
    ed.load(&kv);
    let id = ed.active_block().cloned().unwrap();
    ed.update_block_data(
        &id,
        BlockDataPatch {
            style: Some(MediaSlot::from_handle(
                encode_data_uri("image/jpeg", &[7, 7]),
                MediaKind::Image,
            )),
            ..BlockDataPatch::default()
        },
    );
    ed.set_layers_expanded(false);
    ed.save(&mut kv);

    let store = ed.into_store();
    let mut again = Editor::with_clock(
        EditorConfig::default(),
        store,
        Size::new(1280.0, 800.0),
        Box::new(clock(5)),
    )
    .unwrap();
    let report = again.load(&kv);
    assert!(report.failures.is_empty());
    assert_eq!(again.registry().len(), 1);
    assert!(!again.registry().layers_expanded());
    let style = &again.registry().get(&id).unwrap().data.style;
    assert!(style.handle.starts_with("blob:"));
    let blob = again.store().resolve_handle(&style.handle).unwrap().unwrap();
    assert_eq!(blob.bytes, vec![7, 7]);
    assert_eq!(blob.mime_type, "image/jpeg");
}

#[test]
fn block_drag_previews_then_commits() {
    let mut ed = editor_at(1280.0, clock(0));
    ed.load(&MemoryKv::new());
    let id = ed.active_block().cloned().unwrap();
    let start = ed.registry().get(&id).unwrap().position;
    let entity = EntityRef::Block(id.clone());

    ed.handle_pointer(PointerEvent::Down {
        pointer: 1,
        button: PointerButton::Primary,
        position: Point::new(10.0, 10.0),
        target: HitTarget::DragHandle {
            entity: entity.clone(),
            position: start,
        },
    });
    ed.handle_pointer(PointerEvent::Move {
        pointer: 1,
        position: Point::new(60.0, 30.0),
    });
    ed.on_frame();
    assert_eq!(
        ed.display_position(&entity),
        Some(Point::new(start.x + 50.0, start.y + 20.0))
    );
    assert_eq!(ed.registry().get(&id).unwrap().position, start);

    ed.handle_pointer(PointerEvent::Up {
        pointer: 1,
        position: Point::new(60.0, 30.0),
    });
    let moved = Point::new(start.x + 50.0, start.y + 20.0);
    assert_eq!(ed.registry().get(&id).unwrap().position, moved);
    assert_eq!(ed.display_position(&entity), Some(moved));
}

#[test]
fn cancelled_drag_keeps_committed_position() {
    let mut ed = editor_at(1280.0, clock(0));
    ed.load(&MemoryKv::new());
    let id = ed.active_block().cloned().unwrap();
    let start = ed.registry().get(&id).unwrap().position;
    let entity = EntityRef::Block(id.clone());

    ed.handle_pointer(PointerEvent::Down {
        pointer: 3,
        button: PointerButton::Primary,
        position: Point::ORIGIN,
        target: HitTarget::DragHandle {
            entity: entity.clone(),
            position: start,
        },
    });
    ed.handle_pointer(PointerEvent::Move {
        pointer: 3,
        position: Point::new(100.0, 0.0),
    });
    ed.on_frame();
    ed.handle_pointer(PointerEvent::Cancel { pointer: 3 });
    assert_eq!(ed.display_position(&entity), Some(start));
}

#[test]
fn background_pan_and_wheel_are_applied_per_frame() {
    let mut ed = editor_at(1280.0, clock(0));
    ed.load(&MemoryKv::new());
    ed.handle_pointer(PointerEvent::Down {
        pointer: 1,
        button: PointerButton::Primary,
        position: Point::new(100.0, 100.0),
        target: HitTarget::Background,
    });
    ed.handle_pointer(PointerEvent::Move {
        pointer: 1,
        position: Point::new(120.0, 90.0),
    });
    ed.handle_pointer(PointerEvent::Wheel { delta_y: -100.0 });
    ed.handle_pointer(PointerEvent::Wheel { delta_y: 5000.0 });
    assert_eq!(ed.transform().x, 0.0);

    ed.on_frame();
    assert_eq!(ed.transform().x, 20.0);
    assert_eq!(ed.transform().y, -10.0);
    assert!((ed.transform().scale - 1.1).abs() < 1e-9);
}

#[test]
fn center_on_block_selects_and_expands() {
    let mut ed = editor_at(1000.0, clock(0));
    ed.load(&MemoryKv::new());
    let first = ed.active_block().cloned().unwrap();
    ed.add_block();
    ed.set_layers_expanded(false);

    assert!(ed.center_on_block(&first));
    let p = ed.registry().get(&first).unwrap().position;
    assert_eq!(ed.transform().x, -p.x + 500.0);
    assert_eq!(ed.transform().y, -p.y + 400.0);
    assert_eq!(ed.active_block(), Some(&first));
    assert!(ed.registry().layers_expanded());
    assert!(!ed.center_on_block(&BlockId::from("nope")));
}

#[test]
fn sign_out_clears_user_state_but_keeps_a_block() {
    let mut ed = editor_at(1280.0, clock(0));
    ed.load(&MemoryKv::new());
    ed.sign_in(UserProfile {
        email: "a@b.c".into(),
        name: None,
    });
    ed.add_folder("Campaign");
    ed.add_block();
    ed.sign_out();

    assert!(ed.session().user.is_none());
    assert_eq!(ed.session().credits, 0);
    assert!(ed.session().folders.is_empty());
    assert_eq!(ed.registry().len(), 1);
    assert!(ed.items().is_empty());
    assert!(ed.active_block().is_some());
}

#[test]
fn duplicate_owns_its_own_references() {
    let mut ed = editor_at(1280.0, clock(0));
    let mut kv = MemoryKv::new();
    ed.load(&kv);
    let src = ed.active_block().cloned().unwrap();
    ed.update_block_data(
        &src,
        BlockDataPatch {
            main: Some(inline(&[1, 1])),
            ..BlockDataPatch::default()
        },
    );
    let rid = ed
        .add_extra_reference(&src, inline(&[2, 2]), ReferenceRole::Product)
        .unwrap();
    ed.save(&mut kv);
    let data = &ed.registry().get(&src).unwrap().data;
    let main_key = data.main.asset_id.clone().unwrap();
    let ref_key = data.extra_refs[0].media.asset_id.clone().unwrap();
    assert_eq!(ed.store().ref_count(&ref_key), 1);

    let copy = ed.duplicate_block(&src).unwrap();
    let copy_rid = ed.registry().get(&copy).unwrap().data.extra_refs[0].id.clone();
    assert_ne!(copy_rid, rid);
    assert_eq!(ed.store().ref_count(&main_key), 2);
    assert_eq!(ed.store().ref_count(&ref_key), 2);

    assert!(ed.remove_extra_reference(&copy, &copy_rid));
    assert_eq!(ed.store().ref_count(&ref_key), 1);
    let source_ref = &ed.registry().get(&src).unwrap().data.extra_refs[0];
    assert_eq!(source_ref.id, rid);
    assert!(ed.store().get(&ref_key).unwrap().is_some());

    assert!(ed.remove_block(&copy));
    assert_eq!(ed.store().ref_count(&main_key), 1);
    assert!(ed.save(&mut kv).is_clean());
    assert_eq!(ed.store().get(&main_key).unwrap().unwrap().bytes, vec![1, 1]);
}

#[test]
fn replacing_media_releases_the_old_key() {
    let mut ed = editor_at(1280.0, clock(0));
    let mut kv = MemoryKv::new();
    ed.load(&kv);
    let id = ed.active_block().cloned().unwrap();
    ed.update_block_data(
        &id,
        BlockDataPatch {
            main: Some(inline(&[3])),
            ..BlockDataPatch::default()
        },
    );
    let rid = ed
        .add_extra_reference(&id, inline(&[4]), ReferenceRole::Style)
        .unwrap();
    ed.save(&mut kv);
    let data = &ed.registry().get(&id).unwrap().data;
    let main_key = data.main.asset_id.clone().unwrap();
    let ref_key = data.extra_refs[0].media.asset_id.clone().unwrap();

    // Note-only patches keep the media and its reference.
    assert!(ed.update_extra_reference(
        &id,
        &rid,
        ExtraReferencePatch {
            note: Some("brand blue".into()),
            ..ExtraReferencePatch::default()
        },
    ));
    assert_eq!(ed.store().ref_count(&ref_key), 1);

    assert!(ed.update_extra_reference(
        &id,
        &rid,
        ExtraReferencePatch {
            media: Some(MediaSlot::from_handle("https://cdn.test/ref.png", MediaKind::Image)),
            ..ExtraReferencePatch::default()
        },
    ));
    assert_eq!(ed.store().ref_count(&ref_key), 0);

    ed.update_block_data(
        &id,
        BlockDataPatch {
            prompt: Some("same media".into()),
            ..BlockDataPatch::default()
        },
    );
    assert_eq!(ed.store().ref_count(&main_key), 1);
    ed.update_block_data(
        &id,
        BlockDataPatch {
            main: Some(MediaSlot::default()),
            ..BlockDataPatch::default()
        },
    );
    assert_eq!(ed.store().ref_count(&main_key), 0);
}

#[test]
fn patching_in_a_shared_key_takes_a_reference() {
    let mut ed = editor_at(1280.0, clock(0));
    let mut kv = MemoryKv::new();
    ed.load(&kv);
    let a = ed.active_block().cloned().unwrap();
    ed.update_block_data(
        &a,
        BlockDataPatch {
            style: Some(inline(&[5])),
            ..BlockDataPatch::default()
        },
    );
    ed.save(&mut kv);
    let shared = ed.registry().get(&a).unwrap().data.style.clone();
    let key = shared.asset_id.clone().unwrap();

    let b = ed.add_block();
    ed.update_block_data(
        &b,
        BlockDataPatch {
            reference: Some(shared),
            ..BlockDataPatch::default()
        },
    );
    assert_eq!(ed.store().ref_count(&key), 2);
    assert!(ed.remove_block(&a));
    assert_eq!(ed.store().ref_count(&key), 1);
}

#[test]
fn detached_handles_are_bound_on_save_and_revoked_when_dropped() {
    let mut ed = editor_at(1280.0, clock(0));
    let mut kv = MemoryKv::new();
    ed.load(&kv);
    let id = ed.active_block().cloned().unwrap();
    let picked = ed.register_file(Blob::new(vec![6, 6, 6], "image/webp"));
    ed.update_block_data(
        &id,
        BlockDataPatch {
            main: Some(MediaSlot::from_handle(picked.clone(), MediaKind::Image)),
            ..BlockDataPatch::default()
        },
    );
    assert_eq!(ed.store().handle_counts(), (1, 1));

    assert!(ed.save(&mut kv).is_clean());
    assert_eq!(ed.store().handle_counts(), (1, 0));
    let blob = ed.store().resolve_handle(&picked).unwrap().unwrap();
    assert_eq!(blob.bytes, vec![6, 6, 6]);

    ed.update_block_data(
        &id,
        BlockDataPatch {
            main: Some(MediaSlot::default()),
            ..BlockDataPatch::default()
        },
    );
    assert_eq!(ed.store().handle_counts(), (0, 0));
}

#[test]
fn reload_and_item_deletes_do_not_grow_the_handle_table() {
    let mut ed = editor_at(1280.0, clock(0));
    let mut kv = MemoryKv::new();
    ed.load(&kv);
    let ids = ed
        .drop_files(
            vec![
                UploadedFile::new("a.png", Blob::new(vec![1], "image/png")),
                UploadedFile::new("b.png", Blob::new(vec![2], "image/png")),
            ],
            Point::ORIGIN,
        )
        .unwrap();
    assert_eq!(ed.store().handle_counts(), (2, 0));
    ed.save(&mut kv);

    ed.load(&kv);
    ed.load(&kv);
    assert_eq!(ed.store().handle_counts(), (2, 0));

    assert!(ed.delete_item(&ids[0]));
    assert_eq!(ed.store().handle_counts(), (1, 0));
    ed.sign_out();
    assert_eq!(ed.store().handle_counts(), (0, 0));
}
