use crate::assets::store::AssetStore;
use crate::canvas::block::{BlockData, BlockDataPatch, MediaSlot, ReferenceRole};
use crate::canvas::registry::ExtraReferencePatch;
use crate::editor::Editor;
use crate::editor::ownership::Holdings;
use crate::foundation::core::Point;
use crate::foundation::ids::{BlockId, ExtraRefId, FolderId, ItemId};
use crate::input::pointer::{EntityRef, InteractionEffect, PointerEvent};
use crate::persist::snapshot::{Folder, Theme, UserProfile};

impl<S: AssetStore> Editor<S> {
    // View.

    /// Pan by a screen-space delta. Non-finite results are dropped.
    pub fn pan(&mut self, dx: f64, dy: f64) -> bool {
        self.transform.pan(dx, dy)
    }

    /// Apply one wheel step immediately (hosts without frame coalescing).
    pub fn zoom(&mut self, delta_y: f64) -> bool {
        let limits = self.zoom_limits();
        self.transform.zoom_with(delta_y, limits)
    }

    /// Back to `{0, 0, 1}`.
    pub fn reset_view(&mut self) {
        self.transform.reset();
    }

    /// Center the view on a block, select it and expand the layer panel.
    pub fn center_on_block(&mut self, id: &BlockId) -> bool {
        let Some(position) = self.registry.get(id).map(|b| b.position) else {
            return false;
        };
        self.transform.center_on(position, self.viewport);
        self.registry.set_active(id);
        self.registry.set_layers_expanded(true);
        self.changed();
        true
    }

    // Pointer.

    /// Feed one pointer event and apply what it produces.
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        let effects = self.pointer.handle(event, &self.transform);
        self.apply_effects(effects);
    }

    /// Animation-frame tick.
    pub fn on_frame(&mut self) {
        let effects = self.pointer.on_frame(&self.transform);
        self.apply_effects(effects);
    }

    /// Apply interaction effects to the owned state.
    pub fn apply_effects<I: IntoIterator<Item = InteractionEffect>>(&mut self, effects: I) {
        for effect in effects {
            match effect {
                InteractionEffect::SetOffset(offset) => {
                    self.transform.set_offset(offset);
                }
                InteractionEffect::Zoom(delta_y) => {
                    self.zoom(delta_y);
                }
                InteractionEffect::Preview { entity, position } => {
                    self.previews.insert(entity, position);
                }
                InteractionEffect::Commit { entity, position } => {
                    self.previews.remove(&entity);
                    match &entity {
                        EntityRef::Block(id) => {
                            self.update_block_position(id, position);
                        }
                        EntityRef::Item(id) => {
                            self.update_item_position(id, position);
                        }
                    }
                }
                InteractionEffect::Abandon { entity } => {
                    self.previews.remove(&entity);
                }
            }
        }
    }

    // Blocks.

    /// Append an empty block after the last one.
    pub fn add_block(&mut self) -> BlockId {
        let now = self.now();
        let id = self.registry.add_block(now);
        self.changed();
        id
    }

    /// Append a block with caller data. Stored keys in `data` take their own reference.
    pub fn add_block_with(&mut self, data: BlockData, name: &str) -> BlockId {
        let now = self.now();
        let held = Holdings::of_data(&data);
        let id = self.registry.add_block_with(data, name, now);
        self.rebalance(Holdings::default(), &held);
        self.changed();
        id
    }

    /// Duplicate a block. The copy owns its own reference to every stored key.
    pub fn duplicate_block(&mut self, id: &BlockId) -> Option<BlockId> {
        let now = self.now();
        let copy = self.registry.duplicate_block(id, now)?;
        let held = self
            .registry
            .get(&copy)
            .map(|b| Holdings::of_data(&b.data))
            .unwrap_or_default();
        self.rebalance(Holdings::default(), &held);
        self.changed();
        Some(copy)
    }

    /// Remove a block and release its stored keys; the last one stays.
    pub fn remove_block(&mut self, id: &BlockId) -> bool {
        let before = self
            .registry
            .get(id)
            .map(|b| Holdings::of_data(&b.data))
            .unwrap_or_default();
        let ok = self.registry.remove_block(id);
        if ok {
            self.rebalance(before, &Holdings::default());
            self.previews.remove(&EntityRef::Block(id.clone()));
            self.changed();
        }
        ok
    }

    /// Move a block and select it.
    pub fn update_block_position(&mut self, id: &BlockId, position: Point) -> bool {
        let ok = self.registry.update_position(id, position);
        if ok {
            self.changed();
        }
        ok
    }

    /// Merge a data patch into a block.
    ///
    /// Keys the patch drops release a reference and keys it brings in take one.
    pub fn update_block_data(&mut self, id: &BlockId, patch: BlockDataPatch) -> bool {
        let Some(before) = self.registry.get(id).map(|b| Holdings::of_data(&b.data)) else {
            return false;
        };
        let now = self.now();
        if !self.registry.update_data(id, patch, now) {
            return false;
        }
        let after = self
            .registry
            .get(id)
            .map(|b| Holdings::of_data(&b.data))
            .unwrap_or_default();
        self.rebalance(before, &after);
        self.changed();
        true
    }

    /// Rename a block.
    pub fn rename_block(&mut self, id: &BlockId, name: &str) -> bool {
        let now = self.now();
        let ok = self.registry.rename(id, name, now);
        if ok {
            self.changed();
        }
        ok
    }

    /// Select a block.
    pub fn set_active_block(&mut self, id: &BlockId) -> bool {
        self.registry.set_active(id)
    }

    /// Expand or collapse the layer panel.
    pub fn set_layers_expanded(&mut self, expanded: bool) {
        if self.registry.layers_expanded() != expanded {
            self.registry.set_layers_expanded(expanded);
            self.changed();
        }
    }

    /// Add an extra reference to a block.
    pub fn add_extra_reference(
        &mut self,
        id: &BlockId,
        media: MediaSlot,
        role: ReferenceRole,
    ) -> Option<ExtraRefId> {
        let now = self.now();
        let out = self.registry.add_extra_reference(id, media, role, now);
        if out.is_some() {
            self.changed();
        }
        out
    }

    /// Patch an extra reference. Replaced media releases what it held.
    pub fn update_extra_reference(
        &mut self,
        id: &BlockId,
        ref_id: &ExtraRefId,
        patch: ExtraReferencePatch,
    ) -> bool {
        let replacing = patch.media.is_some();
        let before = self.extra_ref_holdings(id, ref_id);
        let now = self.now();
        if !self.registry.update_extra_reference(id, ref_id, patch, now) {
            return false;
        }
        if replacing {
            let after = self.extra_ref_holdings(id, ref_id);
            self.rebalance(before, &after);
        }
        self.changed();
        true
    }

    /// Remove an extra reference and release its stored bytes.
    pub fn remove_extra_reference(&mut self, id: &BlockId, ref_id: &ExtraRefId) -> bool {
        let before = self.extra_ref_holdings(id, ref_id);
        let now = self.now();
        let ok = self
            .registry
            .remove_extra_reference(id, ref_id, &mut self.store, now);
        if ok {
            self.release_handles(before.handles);
            self.changed();
        }
        ok
    }

    fn extra_ref_holdings(&self, id: &BlockId, ref_id: &ExtraRefId) -> Holdings {
        self.registry
            .get(id)
            .and_then(|b| b.data.extra_refs.iter().find(|r| &r.id == ref_id))
            .map(|r| Holdings::of_slot(&r.media))
            .unwrap_or_default()
    }

    // Items.

    /// Delete an item, its history entry and its stored bytes.
    pub fn delete_item(&mut self, id: &ItemId) -> bool {
        let before = self.items.get(id).map(Holdings::of_item).unwrap_or_default();
        let ok = self.items.delete(id, &mut self.store);
        if ok {
            self.release_handles(before.handles);
            self.previews.remove(&EntityRef::Item(id.clone()));
            self.changed();
        }
        ok
    }

    /// Move an item on the canvas.
    pub fn update_item_position(&mut self, id: &ItemId, position: Point) -> bool {
        let ok = self.items.update_position(id, position);
        if ok {
            self.changed();
        }
        ok
    }

    /// Put an item on top of the canvas.
    pub fn bring_to_front(&mut self, id: &ItemId) -> bool {
        if self.items.get(id).is_none() {
            return false;
        }
        self.items.push_history([id.clone()]);
        self.changed();
        true
    }

    /// Assign an item to a folder (`None` removes it).
    pub fn move_item_to_folder(&mut self, id: &ItemId, folder: Option<FolderId>) -> bool {
        let ok = self.items.move_to_folder(id, folder);
        if ok {
            self.changed();
        }
        ok
    }

    /// Replace an item's tags.
    pub fn set_item_tags(&mut self, id: &ItemId, tags: Vec<String>) -> bool {
        let ok = self.items.set_tags(id, tags);
        if ok {
            self.changed();
        }
        ok
    }

    /// Show an item in the gallery.
    pub fn save_item_to_gallery(&mut self, id: &ItemId) -> bool {
        let ok = self.items.save_to_gallery(id);
        if ok {
            self.changed();
        }
        ok
    }

    // Session.

    /// Create a gallery folder.
    pub fn add_folder(&mut self, name: &str) -> FolderId {
        let id = FolderId::generate();
        self.session.folders.push(Folder {
            id: id.clone(),
            name: name.trim().to_string(),
        });
        self.changed();
        id
    }

    /// Switch theme.
    pub fn set_theme(&mut self, theme: Theme) {
        if self.session.theme != theme {
            self.session.theme = theme;
            self.changed();
        }
    }

    /// Flip between light and dark.
    pub fn toggle_theme(&mut self) -> Theme {
        let next = self.session.theme.toggled();
        self.set_theme(next);
        next
    }

    /// Mirror the authoritative credit balance.
    pub fn set_credits(&mut self, credits: i64) {
        self.session.credits = credits;
        self.changed();
    }

    /// Record the signed-in user.
    pub fn sign_in(&mut self, user: UserProfile) {
        tracing::debug!(email = %user.email, "signed in");
        self.session.user = Some(user);
        self.changed();
    }

    /// Drop every per-user piece of state.
    ///
    /// Items, blocks, history, folders, purchases and presets are cleared and credits drop to
    /// zero. Jobs still in flight are forgotten, so their completions are discarded. A fresh
    /// default block keeps the registry non-empty.
    pub fn sign_out(&mut self) {
        let shown = self.live_holdings();
        let now = self.now();
        self.session.user = None;
        self.session.credits = 0;
        self.session.folders.clear();
        self.session.purchases.clear();
        self.session.presets.clear();
        self.items = Default::default();
        self.registry.clear();
        self.registry.ensure_default(self.viewport.width, now);
        self.tracker.clear();
        self.jobs.clear();
        self.previews.clear();
        self.pointer.reset();
        self.release_handles(shown.handles);
        self.changed();
    }
}
