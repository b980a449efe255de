use super::*;
use crate::assets::store::MemoryAssetStore;
use crate::foundation::config::EditorConfig;
use crate::foundation::core::{ManualClock, Point, Size};
use crate::persist::kv::MemoryKv;
use crate::persist::snapshot::UserProfile;

fn editor(width: f64) -> Editor<MemoryAssetStore> {
    let clock: &'static ManualClock = Box::leak(Box::new(ManualClock::new(1_700_000_000_000)));
    let mut ed = Editor::with_clock(
        EditorConfig::default(),
        MemoryAssetStore::new(),
        Size::new(width, 900.0),
        Box::new(clock),
    )
    .unwrap();
    ed.load(&MemoryKv::new());
    ed
}

fn prompt(ed: &mut Editor<MemoryAssetStore>, id: &BlockId, text: &str) {
    ed.update_block_data(
        id,
        BlockDataPatch {
            prompt: Some(text.to_string()),
            ..BlockDataPatch::default()
        },
    );
}

fn done(url: &str, bytes: Option<&[u8]>) -> CanvasResult<CompletedGeneration> {
    Ok(CompletedGeneration {
        output: GenerationOutput {
            url: url.to_string(),
        },
        media: bytes.map(|b| Blob::new(b.to_vec(), "image/png")),
        item_id: None,
    })
}

#[test]
fn begin_rejects_unknown_and_incomplete_blocks() {
    let mut ed = editor(1280.0);
    let err = ed.begin_generation(&BlockId::from("missing")).unwrap_err();
    assert!(matches!(err, CanvasError::Validation(_)));

    let id = ed.active_block().cloned().unwrap();
    let err = ed.begin_generation(&id).unwrap_err();
    assert!(matches!(err, CanvasError::Validation(_)));
    assert!(!ed.tracker().is_in_flight(&id));
}

#[test]
fn one_job_per_block_at_a_time() {
    let mut ed = editor(1280.0);
    let a = ed.active_block().cloned().unwrap();
    let b = ed.add_block();
    prompt(&mut ed, &a, "a fox");
    prompt(&mut ed, &b, "a hen");

    let first = ed.begin_generation(&a).unwrap();
    assert!(ed.begin_generation(&a).is_err());
    let other = ed.begin_generation(&b).unwrap();
    assert_eq!(ed.tracker().in_flight_count(), 2);
    assert_eq!(first.request.prompt, "a fox");
    assert_eq!(first.request.user_id, "anonymous");

    ed.complete_generation(&other.ticket, done("https://cdn.test/hen.png", None))
        .unwrap();
    assert!(ed.tracker().is_in_flight(&a));
    assert!(!ed.tracker().is_in_flight(&b));
}

#[test]
fn request_carries_signed_in_email() {
    let mut ed = editor(1280.0);
    ed.sign_in(UserProfile {
        email: "maker@studio.test".into(),
        name: Some("Maker".into()),
    });
    let id = ed.active_block().cloned().unwrap();
    prompt(&mut ed, &id, "poster");
    let pending = ed.begin_generation(&id).unwrap();
    assert_eq!(pending.request.user_id, "maker@studio.test");
}

#[test]
fn completion_places_item_right_of_block_and_on_top() {
    let mut ed = editor(1280.0);
    let id = ed.active_block().cloned().unwrap();
    let anchor = ed.registry().get(&id).unwrap().position;
    assert_eq!(anchor, Point::new(440.0, 300.0));
    prompt(&mut ed, &id, "a fox");

    let pending = ed.begin_generation(&id).unwrap();
    let item_id = ed
        .complete_generation(&pending.ticket, done("https://cdn.test/fox.png", Some(&[9, 9, 9])))
        .unwrap()
        .unwrap();

    let item = ed.items().get(&item_id).unwrap();
    assert_eq!(item.position, Some(Point::new(880.0, 300.0)));
    assert!(item.url.starts_with("blob:"));
    assert_eq!(item.prompt, "a fox");
    assert_eq!(item.saved_to_gallery, Some(true));
    assert_eq!(ed.items().history()[0], item_id);
    assert!(ed.debouncer().deadline().is_some());

    let key = item.asset_id.clone().unwrap();
    let last = &ed.registry().get(&id).unwrap().data.last_generated;
    assert_eq!(last.asset_id.as_ref(), Some(&key));
    assert_eq!(last.handle, item.url);
    assert_eq!(ed.store().ref_count(&key), 2);
    assert!(!ed.tracker().is_in_flight(&id));
}

#[test]
fn second_result_shifts_past_the_first_and_releases_old_last_result() {
    let mut ed = editor(1280.0);
    let id = ed.active_block().cloned().unwrap();
    prompt(&mut ed, &id, "a fox");

    let p = ed.begin_generation(&id).unwrap();
    let first = ed
        .complete_generation(&p.ticket, done("https://cdn.test/1.png", Some(&[1])))
        .unwrap()
        .unwrap();
    let first_key = ed.items().get(&first).unwrap().asset_id.clone().unwrap();

    let p = ed.begin_generation(&id).unwrap();
    let second = ed
        .complete_generation(&p.ticket, done("https://cdn.test/2.png", Some(&[2])))
        .unwrap()
        .unwrap();

    assert_eq!(
        ed.items().get(&second).unwrap().position,
        Some(Point::new(1220.0, 300.0))
    );
    assert_eq!(ed.store().ref_count(&first_key), 1);
    assert_eq!(ed.items().history()[..2], [second, first]);
}

#[test]
fn result_on_a_duplicate_keeps_the_source_result() {
    let mut ed = editor(1280.0);
    let src = ed.active_block().cloned().unwrap();
    prompt(&mut ed, &src, "a fox");
    let p = ed.begin_generation(&src).unwrap();
    let first = ed
        .complete_generation(&p.ticket, done("https://cdn.test/1.png", Some(&[1])))
        .unwrap()
        .unwrap();
    let key = ed.items().get(&first).unwrap().asset_id.clone().unwrap();
    assert!(ed.delete_item(&first));
    assert_eq!(ed.store().ref_count(&key), 1);

    let copy = ed.duplicate_block(&src).unwrap();
    assert_eq!(ed.store().ref_count(&key), 2);
    let p = ed.begin_generation(&copy).unwrap();
    ed.complete_generation(&p.ticket, done("https://cdn.test/2.png", Some(&[2])))
        .unwrap()
        .unwrap();

    assert_eq!(ed.store().ref_count(&key), 1);
    let last = &ed.registry().get(&src).unwrap().data.last_generated;
    assert_eq!(last.asset_id.as_ref(), Some(&key));
    assert_eq!(
        ed.store().resolve_handle(&last.handle).unwrap().unwrap().bytes,
        vec![1]
    );
}

#[test]
fn completion_reusing_an_item_id_releases_the_replaced_item() {
    let mut ed = editor(1280.0);
    let id = ed.active_block().cloned().unwrap();
    prompt(&mut ed, &id, "a fox");
    let with_id = |bytes: &[u8]| {
        done("https://cdn.test/r.png", Some(bytes)).map(|mut d| {
            d.item_id = Some(ItemId::from("server_7"));
            d
        })
    };

    let p = ed.begin_generation(&id).unwrap();
    ed.complete_generation(&p.ticket, with_id(&[1])).unwrap();
    let old = ed.items().get(&ItemId::from("server_7")).unwrap().clone();
    let old_key = old.asset_id.clone().unwrap();

    let p = ed.begin_generation(&id).unwrap();
    ed.complete_generation(&p.ticket, with_id(&[2])).unwrap();

    assert_eq!(ed.items().len(), 1);
    assert_eq!(ed.store().ref_count(&old_key), 0);
    assert!(ed.store().resolve_handle(&old.url).unwrap().is_none());
    assert_eq!(ed.store().handle_counts(), (1, 0));
}

#[test]
fn narrow_viewport_places_below_block() {
    let mut ed = editor(800.0);
    let id = ed.active_block().cloned().unwrap();
    prompt(&mut ed, &id, "a fox");
    let p = ed.begin_generation(&id).unwrap();
    let item = ed
        .complete_generation(&p.ticket, done("https://cdn.test/fox.png", None))
        .unwrap()
        .unwrap();
    let item = ed.items().get(&item).unwrap();
    assert_eq!(item.position, Some(Point::new(200.0, 950.0)));
    assert_eq!(item.url, "https://cdn.test/fox.png");
    assert!(item.asset_id.is_none());
}

#[test]
fn removed_block_still_gets_its_result_at_the_origin() {
    let mut ed = editor(1280.0);
    let keep = ed.active_block().cloned().unwrap();
    let gone = ed.add_block();
    prompt(&mut ed, &gone, "lost");
    let p = ed.begin_generation(&gone).unwrap();
    assert!(ed.remove_block(&gone));

    let item = ed
        .complete_generation(&p.ticket, done("https://cdn.test/lost.png", None))
        .unwrap()
        .unwrap();
    assert_eq!(
        ed.items().get(&item).unwrap().position,
        Some(Point::new(440.0, 0.0))
    );
    assert!(ed.registry().get(&keep).unwrap().data.last_generated.is_empty());
}

#[test]
fn completion_after_sign_out_is_discarded() {
    let mut ed = editor(1280.0);
    let id = ed.active_block().cloned().unwrap();
    prompt(&mut ed, &id, "a fox");
    let p = ed.begin_generation(&id).unwrap();
    ed.sign_out();

    let out = ed
        .complete_generation(&p.ticket, done("https://cdn.test/fox.png", Some(&[5])))
        .unwrap();
    assert_eq!(out, None);
    assert!(ed.items().is_empty());
    assert!(ed.store().is_empty());
}

#[test]
fn failure_returns_block_to_idle() {
    let mut ed = editor(1280.0);
    let id = ed.active_block().cloned().unwrap();
    prompt(&mut ed, &id, "a fox");
    let p = ed.begin_generation(&id).unwrap();

    let err = ed
        .complete_generation(&p.ticket, Err(CanvasError::generation("backend down")))
        .unwrap_err();
    assert!(err.to_string().contains("backend down"));
    assert!(!ed.tracker().is_in_flight(&id));
    assert!(ed.items().is_empty());
    assert!(ed.begin_generation(&id).is_ok());
}

struct FlakyService {
    retries: u32,
    seen: Vec<GenerationRequest>,
}

impl GenerationService for FlakyService {
    fn submit(
        &mut self,
        request: &GenerationRequest,
        on_retry: &mut dyn FnMut(u32),
    ) -> CanvasResult<GenerationOutput> {
        for attempt in 1..=self.retries {
            on_retry(attempt);
        }
        self.seen.push(request.clone());
        Ok(GenerationOutput {
            url: "https://cdn.test/run.png".to_string(),
        })
    }
}

#[test]
fn run_generation_keeps_remote_url_when_fetch_fails() {
    let mut ed = editor(1280.0);
    let id = ed.active_block().cloned().unwrap();
    prompt(&mut ed, &id, "a fox");
    let mut service = FlakyService {
        retries: 2,
        seen: Vec::new(),
    };

    let item = ed
        .run_generation(&id, &mut service, |_| Err(CanvasError::media("offline")))
        .unwrap()
        .unwrap();
    assert_eq!(service.seen.len(), 1);
    assert_eq!(ed.items().get(&item).unwrap().url, "https://cdn.test/run.png");
    let last = &ed.registry().get(&id).unwrap().data.last_generated;
    assert_eq!(last.handle, "https://cdn.test/run.png");
    assert_eq!(last.kind, MediaKind::Image);
}

#[test]
fn run_generation_stores_fetched_bytes() {
    let mut ed = editor(1280.0);
    let id = ed.active_block().cloned().unwrap();
    prompt(&mut ed, &id, "a fox");
    let mut service = FlakyService {
        retries: 0,
        seen: Vec::new(),
    };

    let item = ed
        .run_generation(&id, &mut service, |url| {
            assert_eq!(url, "https://cdn.test/run.png");
            Ok(Blob::new(vec![4, 2], "image/png"))
        })
        .unwrap()
        .unwrap();
    let item = ed.items().get(&item).unwrap();
    let blob = ed.store().resolve_handle(&item.url).unwrap().unwrap();
    assert_eq!(blob.bytes, vec![4, 2]);
}
