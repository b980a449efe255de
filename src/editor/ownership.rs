//! Store reference bookkeeping for the live state.
//!
//! Every block slot and item holding a key owns one store reference. Live `blob:` handles are
//! revoked once nothing on the canvas shows them.

use std::collections::{HashMap, HashSet};

use crate::assets::media::MediaRef;
use crate::assets::store::{AssetKey, AssetStore};
use crate::canvas::block::{BlockData, MediaSlot};
use crate::canvas::items::ResultItem;
use crate::editor::Editor;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// Keys and live handles held by some part of the state.
pub(crate) struct Holdings {
    pub(crate) keys: Vec<AssetKey>,
    pub(crate) handles: Vec<String>,
}

impl Holdings {
    pub(crate) fn of_slot(slot: &MediaSlot) -> Self {
        let mut out = Self::default();
        out.add_slot(slot);
        out
    }

    pub(crate) fn of_data(data: &BlockData) -> Self {
        let mut out = Self::default();
        for slot in data.all_slots() {
            out.add_slot(slot);
        }
        out
    }

    pub(crate) fn of_item(item: &ResultItem) -> Self {
        let mut out = Self::default();
        out.keys.extend(item.asset_id.iter().cloned());
        out.add_handle(&item.url);
        out
    }

    fn add_slot(&mut self, slot: &MediaSlot) {
        self.keys.extend(slot.owned_keys().cloned());
        self.add_handle(&slot.handle);
    }

    fn add_handle(&mut self, handle: &str) {
        if MediaRef::classify(handle).is_live_handle() {
            self.handles.push(handle.to_string());
        }
    }
}

impl<S: AssetStore> Editor<S> {
    /// Handles currently shown by any block or item.
    pub(crate) fn live_holdings(&self) -> Holdings {
        let mut out = Holdings::default();
        for block in self.registry.blocks() {
            for slot in block.data.all_slots() {
                out.add_handle(&slot.handle);
            }
        }
        for item in self.items.items() {
            out.add_handle(&item.url);
        }
        out
    }

    /// Settle store references after `before` was replaced by `after`.
    ///
    /// Keys only `after` holds take a reference, keys only `before` held release one. Handles
    /// from `before` that nothing shows any more are revoked. Store failures are logged.
    pub(crate) fn rebalance(&mut self, before: Holdings, after: &Holdings) {
        let mut delta: HashMap<&AssetKey, isize> = HashMap::new();
        for key in &after.keys {
            *delta.entry(key).or_default() += 1;
        }
        for key in &before.keys {
            *delta.entry(key).or_default() -= 1;
        }
        for (key, d) in delta {
            for _ in 0..d.max(0) {
                match self.store.retain(key) {
                    Ok(true) => {}
                    Ok(false) => tracing::warn!(key = %key, "shared asset is missing from the store"),
                    Err(err) => tracing::warn!(%err, key = %key, "failed to retain asset"),
                }
            }
            for _ in 0..(-d).max(0) {
                if let Err(err) = self.store.delete(key) {
                    tracing::warn!(%err, key = %key, "failed to release asset");
                }
            }
        }
        self.release_handles(before.handles);
    }

    /// Revoke the given handles unless a block or item still shows them.
    pub(crate) fn release_handles(&mut self, handles: Vec<String>) {
        if handles.is_empty() {
            return;
        }
        let in_use: HashSet<String> = self.live_holdings().handles.into_iter().collect();
        for handle in handles {
            if !in_use.contains(&handle) {
                self.store.revoke_handle(&handle);
            }
        }
    }

    /// Insert an item as the newest one, releasing whatever a replaced item with the same id
    /// held.
    pub(crate) fn prepend_item(&mut self, item: ResultItem) {
        if let Some(old) = self.items.prepend(item) {
            tracing::debug!(item = %old.id, "item replaced");
            self.rebalance(Holdings::of_item(&old), &Holdings::default());
        }
    }
}
