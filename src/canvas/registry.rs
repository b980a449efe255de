use crate::assets::media::MediaKind;
use crate::assets::store::AssetStore;
use crate::canvas::block::{
    Block, BlockData, BlockDataPatch, CreationType, ExtraReference, MediaSlot, ReferenceRole,
};
use crate::foundation::config::EditorConfig;
use crate::foundation::core::{Point, Timestamp, finite_or, is_finite_point};
use crate::foundation::ids::{BlockId, ExtraRefId};

#[derive(Clone, Copy, Debug, PartialEq)]
/// Auto-layout constants of the registry.
pub struct BlockLayout {
    /// Gap to the right of the last block.
    pub spacing_x: f64,
    /// Offset of duplicates.
    pub duplicate_offset: f64,
    /// First position in an empty registry.
    pub first_position: Point,
    /// Extra reference slots per block.
    pub max_extra_refs: usize,
}

impl Default for BlockLayout {
    fn default() -> Self {
        Self::from(&EditorConfig::default())
    }
}

impl From<&EditorConfig> for BlockLayout {
    fn from(cfg: &EditorConfig) -> Self {
        Self {
            spacing_x: cfg.block_spacing_x,
            duplicate_offset: cfg.duplicate_offset,
            first_position: Point::new(cfg.first_block_position.0, cfg.first_block_position.1),
            max_extra_refs: cfg.max_extra_refs,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// How a library image seeds a new block.
pub enum LibraryInsertMode {
    /// Creative-model block with the image in the style slot.
    Model,
    /// Image block with the image as a composition reference.
    Reference,
}

/// Block data for a block created from a library image.
pub fn library_block_data(
    handle: impl Into<String>,
    mode: LibraryInsertMode,
    prompt: impl Into<String>,
) -> BlockData {
    let slot = MediaSlot::from_handle(handle, MediaKind::Image);
    let mut data = BlockData {
        prompt: prompt.into(),
        ..BlockData::default()
    };
    match mode {
        LibraryInsertMode::Model => {
            data.creation_type = CreationType::CreativeModel;
            data.style = slot;
        }
        LibraryInsertMode::Reference => {
            data.creation_type = CreationType::Image;
            data.reference = slot;
            data.reference_role = Some(ReferenceRole::Composition);
        }
    }
    data
}

#[derive(Clone, Debug, Default, PartialEq)]
/// Partial update of an extra reference.
pub struct ExtraReferencePatch {
    /// New role.
    pub role: Option<ReferenceRole>,
    /// New note.
    pub note: Option<String>,
    /// Replacement media.
    pub media: Option<MediaSlot>,
}

/// Ordered collection of generation blocks plus layer-panel selection state.
///
/// Structural violations (unknown id, removing the last block, non-finite positions) are
/// reported as `false`/`None` and leave the registry untouched.
#[derive(Clone, Debug, Default)]
pub struct BlockRegistry {
    blocks: Vec<Block>,
    active: Option<BlockId>,
    layers_expanded: bool,
    layout: BlockLayout,
}

impl BlockRegistry {
    /// Empty registry.
    pub fn new(layout: BlockLayout) -> Self {
        Self {
            blocks: Vec::new(),
            active: None,
            layers_expanded: false,
            layout,
        }
    }

    /// Registry seeded with loaded blocks; non-finite coordinates become `0`.
    pub fn from_blocks(blocks: Vec<Block>, layout: BlockLayout) -> Self {
        let mut out = Self::new(layout);
        out.blocks = blocks
            .into_iter()
            .map(|mut b| {
                b.position = Point::new(finite_or(b.position.x, 0.0), finite_or(b.position.y, 0.0));
                b
            })
            .collect();
        out
    }

    /// Blocks in registry order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// `true` when there are no blocks (only before `ensure_default` or after `clear`).
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Lookup by id.
    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    fn get_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| &b.id == id)
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    /// Active (selected) block.
    pub fn active(&self) -> Option<&BlockId> {
        self.active.as_ref()
    }

    /// Select `id` if it exists.
    pub fn set_active(&mut self, id: &BlockId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.active = Some(id.clone());
        true
    }

    /// Layer panel expansion flag.
    pub fn layers_expanded(&self) -> bool {
        self.layers_expanded
    }

    /// Set the layer panel expansion flag.
    pub fn set_layers_expanded(&mut self, expanded: bool) {
        self.layers_expanded = expanded;
    }

    /// Where the next appended block goes.
    pub fn next_position(&self) -> Point {
        match self.blocks.last() {
            Some(last) => {
                let x = last.position.x + self.layout.spacing_x;
                let y = last.position.y;
                Point::new(
                    finite_or(x, self.layout.first_position.x),
                    finite_or(y, self.layout.first_position.y),
                )
            }
            None => self.layout.first_position,
        }
    }

    /// Append a default block named `Block {n}`.
    pub fn add_block(&mut self, now: Timestamp) -> BlockId {
        let name = format!("Block {}", self.blocks.len() + 1);
        self.add_block_with(BlockData::default(), name, now)
    }

    /// Append a block with caller-supplied data; it becomes active and the layer panel opens.
    pub fn add_block_with(&mut self, data: BlockData, name: impl Into<String>, now: Timestamp) -> BlockId {
        let id = BlockId::generate();
        self.blocks.push(Block {
            id: id.clone(),
            name: name.into(),
            position: self.next_position(),
            data,
            created_at: now,
            updated_at: now,
        });
        self.active = Some(id.clone());
        self.layers_expanded = true;
        id
    }

    /// Clone `id` under a new id, offset diagonally and named `"{name} (Copy)"`.
    ///
    /// Extra references get fresh ids. Stored keys are shared with the source; the caller takes
    /// the extra store references.
    pub fn duplicate_block(&mut self, id: &BlockId, now: Timestamp) -> Option<BlockId> {
        let source = self.get(id)?;
        let offset = self.layout.duplicate_offset;
        let mut data = source.data.clone();
        for reference in &mut data.extra_refs {
            reference.id = ExtraRefId::generate();
        }
        let copy = Block {
            id: BlockId::generate(),
            name: format!("{} (Copy)", source.name),
            position: Point::new(source.position.x + offset, source.position.y + offset),
            data,
            created_at: now,
            updated_at: now,
        };
        let new_id = copy.id.clone();
        self.blocks.push(copy);
        self.active = Some(new_id.clone());
        Some(new_id)
    }

    /// Remove `id` unless it is the only block.
    pub fn remove_block(&mut self, id: &BlockId) -> bool {
        if self.blocks.len() <= 1 {
            return false;
        }
        let Some(idx) = self.blocks.iter().position(|b| &b.id == id) else {
            return false;
        };
        self.blocks.remove(idx);
        if self.active.as_ref() == Some(id) {
            self.active = None;
        }
        true
    }

    /// Move `id` to `position` and select it. Non-finite input is rejected.
    pub fn update_position(&mut self, id: &BlockId, position: Point) -> bool {
        if !is_finite_point(position) {
            return false;
        }
        let Some(block) = self.get_mut(id) else {
            return false;
        };
        block.position = position;
        self.active = Some(id.clone());
        true
    }

    /// Shallow-merge `patch` into the block's data and bump `updated_at`.
    pub fn update_data(&mut self, id: &BlockId, patch: BlockDataPatch, now: Timestamp) -> bool {
        let Some(block) = self.get_mut(id) else {
            return false;
        };
        patch.apply(&mut block.data);
        block.updated_at = now;
        true
    }

    /// Rename `id`; a blank name becomes `Block NNNN` from the last four digits of `now`.
    pub fn rename(&mut self, id: &BlockId, name: &str, now: Timestamp) -> bool {
        let Some(block) = self.get_mut(id) else {
            return false;
        };
        let trimmed = name.trim();
        block.name = if trimmed.is_empty() {
            format!("Block {:04}", now.as_millis().rem_euclid(10_000))
        } else {
            trimmed.to_string()
        };
        true
    }

    /// Guarantee at least one block.
    ///
    /// An empty registry gets a default block at `(viewport_width / 2 - 200, 300)`; otherwise the
    /// first block becomes active. Returns the active id.
    pub fn ensure_default(&mut self, viewport_width: f64, now: Timestamp) -> BlockId {
        if let Some(first) = self.blocks.first() {
            let id = first.id.clone();
            self.active = Some(id.clone());
            return id;
        }
        let id = BlockId::generate();
        self.blocks.push(Block {
            id: id.clone(),
            name: "Initial Block".to_string(),
            position: Point::new(finite_or(viewport_width / 2.0 - 200.0, 0.0), 300.0),
            data: BlockData::default(),
            created_at: now,
            updated_at: now,
        });
        self.active = Some(id.clone());
        id
    }

    /// Drop every block and the selection.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.active = None;
    }

    /// Add an extra reference slot. `None` when the block is unknown or already full.
    pub fn add_extra_reference(
        &mut self,
        id: &BlockId,
        media: MediaSlot,
        role: ReferenceRole,
        now: Timestamp,
    ) -> Option<ExtraRefId> {
        let max = self.layout.max_extra_refs;
        let block = self.get_mut(id)?;
        if block.data.extra_refs.len() >= max {
            return None;
        }
        let reference = ExtraReference::new(media, role, now);
        let ref_id = reference.id.clone();
        block.data.extra_refs.push(reference);
        block.updated_at = now;
        Some(ref_id)
    }

    /// Patch one extra reference. Replaced media is dropped without touching the store; the
    /// editor balances references.
    pub fn update_extra_reference(
        &mut self,
        id: &BlockId,
        ref_id: &ExtraRefId,
        patch: ExtraReferencePatch,
        now: Timestamp,
    ) -> bool {
        let Some(block) = self.get_mut(id) else {
            return false;
        };
        let Some(reference) = block.data.extra_refs.iter_mut().find(|r| &r.id == ref_id) else {
            return false;
        };
        if let Some(role) = patch.role {
            reference.role = role;
        }
        if let Some(note) = patch.note {
            reference.note = note;
        }
        if let Some(media) = patch.media {
            reference.media = media;
        }
        block.updated_at = now;
        true
    }

    /// Remove one extra reference and release its stored bytes.
    ///
    /// Store failures are logged; the slot is removed regardless.
    pub fn remove_extra_reference<S: AssetStore + ?Sized>(
        &mut self,
        id: &BlockId,
        ref_id: &ExtraRefId,
        store: &mut S,
        now: Timestamp,
    ) -> bool {
        let Some(block) = self.get_mut(id) else {
            return false;
        };
        let Some(idx) = block.data.extra_refs.iter().position(|r| &r.id == ref_id) else {
            return false;
        };
        let removed = block.data.extra_refs.remove(idx);
        block.updated_at = now;
        for key in removed.media.owned_keys() {
            if let Err(err) = store.delete(key) {
                tracing::warn!(%err, key = %key, "failed to delete extra reference asset");
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/registry.rs"]
mod tests;
