//! Conversion between live media handles and durable asset keys.
//!
//! Dehydration runs before a save: inline or ephemeral media is written to the asset store and
//! replaced by its key. Hydration runs after a load: keys get fresh display handles. Both work
//! field by field; one failing field never aborts the pass.

use crate::assets::media::MediaRef;
use crate::assets::store::{AssetKey, AssetStore, fetch_ephemeral};
use crate::canvas::block::{Block, MediaSlot};
use crate::canvas::items::ResultItem;
use crate::foundation::error::CanvasResult;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// Per-pass counters.
pub struct PassReport {
    /// Fields whose bytes were written to the store.
    pub stored: usize,
    /// Fields whose handle was dropped or refreshed.
    pub updated: usize,
    /// Fields left unchanged after a failure, as `"<owner>.<field>: <error>"`.
    pub failures: Vec<String>,
}

impl PassReport {
    fn fail(&mut self, owner: &str, field: &str, err: impl std::fmt::Display) {
        tracing::warn!(owner, field, %err, "media field left unchanged");
        self.failures.push(format!("{owner}.{field}: {err}"));
    }

    fn merge(&mut self, other: PassReport) {
        self.stored += other.stored;
        self.updated += other.updated;
        self.failures.extend(other.failures);
    }
}

enum Dehydrated {
    Untouched,
    Cleared,
    Stored(AssetKey),
}

fn dehydrate_handle<S: AssetStore + ?Sized>(
    handle: &str,
    key: Option<&AssetKey>,
    store: &mut S,
) -> CanvasResult<Dehydrated> {
    if key.is_some() {
        return Ok(if handle.is_empty() {
            Dehydrated::Untouched
        } else {
            Dehydrated::Cleared
        });
    }
    let reference = MediaRef::classify(handle);
    if !reference.is_ephemeral() {
        return Ok(Dehydrated::Untouched);
    }
    let blob = fetch_ephemeral(&*store, handle)?;
    let key = store.save(blob)?;
    if reference.is_live_handle() {
        store.bind_handle(handle, &key);
    }
    Ok(Dehydrated::Stored(key))
}

/// Dehydrate one slot in place. On success the slot is at rest.
pub fn dehydrate_slot<S: AssetStore + ?Sized>(
    slot: &mut MediaSlot,
    store: &mut S,
) -> CanvasResult<bool> {
    let changed = match dehydrate_handle(&slot.handle, slot.asset_id.as_ref(), store)? {
        Dehydrated::Untouched => false,
        Dehydrated::Cleared => {
            slot.handle.clear();
            true
        }
        Dehydrated::Stored(key) => {
            slot.asset_id = Some(key);
            slot.handle.clear();
            true
        }
    };
    debug_assert!(slot.is_at_rest());
    Ok(changed)
}

/// Dehydrate one item's url in place.
pub fn dehydrate_item<S: AssetStore + ?Sized>(
    item: &mut ResultItem,
    store: &mut S,
) -> CanvasResult<bool> {
    match dehydrate_handle(&item.url, item.asset_id.as_ref(), store)? {
        Dehydrated::Untouched => Ok(false),
        Dehydrated::Cleared => {
            item.url.clear();
            Ok(true)
        }
        Dehydrated::Stored(key) => {
            item.asset_id = Some(key);
            item.url.clear();
            Ok(true)
        }
    }
}

fn slot_names(block: &Block) -> Vec<String> {
    let mut names: Vec<String> = ["main", "style", "reference", "lastGenerated"]
        .into_iter()
        .map(str::to_string)
        .collect();
    names.extend(
        block
            .data
            .extra_refs
            .iter()
            .map(|r| format!("extraRefs[{}]", r.id)),
    );
    names
}

/// Dehydrate every media slot of `blocks`.
#[tracing::instrument(skip_all, fields(blocks = blocks.len()))]
pub fn dehydrate_blocks<S: AssetStore + ?Sized>(blocks: &mut [Block], store: &mut S) -> PassReport {
    let mut report = PassReport::default();
    for block in blocks.iter_mut() {
        let names = slot_names(block);
        let owner = block.id.to_string();
        for (slot, name) in block.data.all_slots_mut().zip(names.iter()) {
            let was_ephemeral = slot.needs_dehydration();
            match dehydrate_slot(slot, store) {
                Ok(true) if was_ephemeral => report.stored += 1,
                Ok(true) => report.updated += 1,
                Ok(false) => {}
                Err(err) => report.fail(&owner, name, err),
            }
        }
    }
    report
}

/// Dehydrate every item url.
#[tracing::instrument(skip_all, fields(items = items.len()))]
pub fn dehydrate_items<S: AssetStore + ?Sized>(
    items: &mut [ResultItem],
    store: &mut S,
) -> PassReport {
    let mut report = PassReport::default();
    for item in items.iter_mut() {
        let was_ephemeral = item.asset_id.is_none();
        match dehydrate_item(item, store) {
            Ok(true) if was_ephemeral => report.stored += 1,
            Ok(true) => report.updated += 1,
            Ok(false) => {}
            Err(err) => report.fail(item.id.as_str(), "url", err),
        }
    }
    report
}

fn fresh_handle<S: AssetStore + ?Sized>(
    handle: &str,
    key: Option<&AssetKey>,
    store: &mut S,
) -> CanvasResult<Option<String>> {
    let Some(key) = key else {
        return Ok(None);
    };
    if MediaRef::classify(handle).is_live_handle() {
        return Ok(None);
    }
    Ok(store.display_handle(key)?.map(|h| h.into_string()))
}

/// Hydrate every media slot of `blocks`. Missing entries leave the slot as-is.
#[tracing::instrument(skip_all, fields(blocks = blocks.len()))]
pub fn hydrate_blocks<S: AssetStore + ?Sized>(blocks: &mut [Block], store: &mut S) -> PassReport {
    let mut report = PassReport::default();
    for block in blocks.iter_mut() {
        let names = slot_names(block);
        let owner = block.id.to_string();
        for (slot, name) in block.data.all_slots_mut().zip(names.iter()) {
            if !slot.needs_hydration() {
                continue;
            }
            match fresh_handle(&slot.handle, slot.asset_id.as_ref(), store) {
                Ok(Some(handle)) => {
                    slot.handle = handle;
                    report.updated += 1;
                }
                Ok(None) => {}
                Err(err) => report.fail(&owner, name, err),
            }
        }
    }
    report
}

/// Hydrate every item url. Missing entries leave the item as-is.
#[tracing::instrument(skip_all, fields(items = items.len()))]
pub fn hydrate_items<S: AssetStore + ?Sized>(items: &mut [ResultItem], store: &mut S) -> PassReport {
    let mut report = PassReport::default();
    for item in items.iter_mut() {
        match fresh_handle(&item.url, item.asset_id.as_ref(), store) {
            Ok(Some(handle)) => {
                item.url = handle;
                report.updated += 1;
            }
            Ok(None) => {}
            Err(err) => report.fail(item.id.as_str(), "url", err),
        }
    }
    report
}

/// Dehydrate items then blocks, merging the reports.
pub fn dehydrate_all<S: AssetStore + ?Sized>(
    items: &mut [ResultItem],
    blocks: &mut [Block],
    store: &mut S,
) -> PassReport {
    let mut report = dehydrate_items(items, store);
    report.merge(dehydrate_blocks(blocks, store));
    report
}

/// Hydrate items then blocks, merging the reports.
pub fn hydrate_all<S: AssetStore + ?Sized>(
    items: &mut [ResultItem],
    blocks: &mut [Block],
    store: &mut S,
) -> PassReport {
    let mut report = hydrate_items(items, store);
    report.merge(hydrate_blocks(blocks, store));
    report
}

#[cfg(test)]
#[path = "../../tests/unit/persist/hydrate.rs"]
mod tests;
