//! Editor controller: the single owner of canvas state.
//!
//! Hosts drive the editor through named update functions and read projections back for
//! rendering. Every persisted change restarts the save debouncer; the host polls
//! [`Editor::save_if_due`] from its timer.

use std::collections::HashMap;
use std::fmt;

use crate::assets::store::AssetStore;
use crate::canvas::block::Block;
use crate::canvas::items::{ItemCollection, ResultItem};
use crate::canvas::layers::{LayerPanel, layer_panel};
use crate::canvas::placement::PlacementRules;
use crate::canvas::registry::{BlockLayout, BlockRegistry};
use crate::canvas::visibility::{VisibilityRules, visible_blocks};
use crate::foundation::config::EditorConfig;
use crate::foundation::core::{Clock, Point, Size, SystemClock, Timestamp};
use crate::foundation::error::CanvasResult;
use crate::foundation::ids::BlockId;
use crate::generation::request::GenerationRequest;
use crate::generation::tracker::GenerationTracker;
use crate::input::pointer::{EntityRef, PointerMachine};
use crate::persist::debounce::SaveDebouncer;
use crate::persist::hydrate::{PassReport, dehydrate_all, hydrate_all};
use crate::persist::kv::KeyValueStore;
use crate::persist::snapshot::{
    Folder, Preset, Purchase, Retention, SaveOutcome, Snapshot, Theme, UserProfile,
    load_snapshot, save_snapshot,
};
use crate::viewport::transform::{ViewportTransform, ZoomLimits};

mod commands;
mod generation;
mod ownership;
mod uploads;

pub use generation::{CompletedGeneration, PendingGeneration};
pub use uploads::{LibraryEntry, UploadedFile};

#[derive(Clone, Debug, PartialEq)]
/// Account-level state carried alongside the canvas.
pub struct Session {
    /// Signed-in user.
    pub user: Option<UserProfile>,
    /// Credit balance.
    pub credits: i64,
    /// Gallery folders.
    pub folders: Vec<Folder>,
    /// Purchase history.
    pub purchases: Vec<Purchase>,
    /// Saved presets.
    pub presets: Vec<Preset>,
    /// UI theme.
    pub theme: Theme,
}

impl Default for Session {
    fn default() -> Self {
        let snap = Snapshot::default();
        Self {
            user: snap.user,
            credits: snap.credits,
            folders: snap.folders,
            purchases: snap.purchases,
            presets: snap.presets,
            theme: snap.theme,
        }
    }
}

/// Canvas editor state machine.
pub struct Editor<S: AssetStore> {
    pub(crate) config: EditorConfig,
    pub(crate) transform: ViewportTransform,
    pub(crate) viewport: Size,
    pub(crate) registry: BlockRegistry,
    pub(crate) items: ItemCollection,
    pub(crate) pointer: PointerMachine,
    pub(crate) previews: HashMap<EntityRef, Point>,
    pub(crate) tracker: GenerationTracker,
    pub(crate) jobs: HashMap<u64, GenerationRequest>,
    pub(crate) debounce: SaveDebouncer,
    pub(crate) session: Session,
    pub(crate) store: S,
    pub(crate) clock: Box<dyn Clock>,
}

impl<S: AssetStore> fmt::Debug for Editor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("transform", &self.transform)
            .field("viewport", &self.viewport)
            .field("blocks", &self.registry.len())
            .field("items", &self.items.len())
            .field("in_flight", &self.tracker.in_flight_count())
            .finish()
    }
}

impl<S: AssetStore> Editor<S> {
    /// Editor on the system clock.
    pub fn new(config: EditorConfig, store: S, viewport: Size) -> CanvasResult<Self> {
        Self::with_clock(config, store, viewport, Box::new(SystemClock))
    }

    /// Editor with an explicit clock.
    ///
    /// The registry starts with the default block so the at-least-one-block invariant holds
    /// before [`Editor::load`] runs; loading replaces it.
    pub fn with_clock(
        config: EditorConfig,
        store: S,
        viewport: Size,
        clock: Box<dyn Clock>,
    ) -> CanvasResult<Self> {
        config.validate()?;
        let mut registry = BlockRegistry::new(BlockLayout::from(&config));
        registry.ensure_default(viewport.width, clock.now());
        registry.set_layers_expanded(Snapshot::default().layers_expanded);
        Ok(Self {
            transform: ViewportTransform::default(),
            viewport,
            registry,
            items: ItemCollection::default(),
            pointer: PointerMachine::new(),
            previews: HashMap::new(),
            tracker: GenerationTracker::new(),
            jobs: HashMap::new(),
            debounce: SaveDebouncer::new(config.save_debounce_ms),
            session: Session::default(),
            store,
            clock,
            config,
        })
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub(crate) fn changed(&mut self) {
        let now = self.now();
        self.debounce.touch(now);
    }

    /// Tunables in effect.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Current view transform.
    pub fn transform(&self) -> &ViewportTransform {
        &self.transform
    }

    /// Viewport size in screen pixels.
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Block registry.
    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// Result items and display history.
    pub fn items(&self) -> &ItemCollection {
        &self.items
    }

    /// Account-level state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Asset store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Generation tracker.
    pub fn tracker(&self) -> &GenerationTracker {
        &self.tracker
    }

    /// Pointer state machine.
    pub fn pointer(&self) -> &PointerMachine {
        &self.pointer
    }

    /// Save scheduler.
    pub fn debouncer(&self) -> &SaveDebouncer {
        &self.debounce
    }

    /// Give the store back.
    pub fn into_store(self) -> S {
        self.store
    }

    pub(crate) fn zoom_limits(&self) -> ZoomLimits {
        ZoomLimits::from(&self.config)
    }

    pub(crate) fn placement_rules(&self) -> PlacementRules {
        PlacementRules::from(&self.config)
    }

    /// Blocks worth rendering for the current view.
    pub fn visible_blocks(&self) -> Vec<&Block> {
        visible_blocks(
            self.registry.blocks(),
            &self.transform,
            self.viewport,
            &VisibilityRules::from(&self.config),
        )
    }

    /// Layer panel rows for `query`.
    pub fn layer_panel(&self, query: &str) -> LayerPanel<'_> {
        layer_panel(
            self.registry.blocks(),
            query,
            self.registry.layers_expanded(),
            self.registry.active(),
        )
    }

    /// Canvas items in paint order (newest on top).
    pub fn paint_order(&self) -> Vec<&ResultItem> {
        self.items.paint_order()
    }

    /// Where `entity` should be drawn: the drag preview if one is active, else its committed
    /// position.
    pub fn display_position(&self, entity: &EntityRef) -> Option<Point> {
        if let Some(p) = self.previews.get(entity) {
            return Some(*p);
        }
        match entity {
            EntityRef::Block(id) => self.registry.get(id).map(|b| b.position),
            EntityRef::Item(id) => self.items.get(id).map(ResultItem::position_or_origin),
        }
    }

    /// Load persisted state and hydrate it.
    ///
    /// Missing slots fall back to defaults; an empty block list gets the default block. Saves
    /// are allowed from here on.
    #[tracing::instrument(skip_all)]
    pub fn load<K: KeyValueStore + ?Sized>(&mut self, kv: &K) -> PassReport {
        let Snapshot {
            user,
            credits,
            folders,
            purchases,
            presets,
            theme,
            history,
            mut blocks,
            mut items,
            layers_expanded,
        } = load_snapshot(kv);
        let shown = self.live_holdings();

        let report = hydrate_all(&mut items, &mut blocks, &mut self.store);
        if !report.failures.is_empty() {
            tracing::warn!(failures = report.failures.len(), "hydration incomplete");
        }

        let now = self.now();
        self.registry = BlockRegistry::from_blocks(blocks, BlockLayout::from(&self.config));
        self.registry.set_layers_expanded(layers_expanded);
        self.registry.ensure_default(self.viewport.width, now);
        self.items = ItemCollection::from_parts(items, history);
        self.session = Session {
            user,
            credits,
            folders,
            purchases,
            presets,
            theme,
        };
        self.release_handles(shown.handles);
        self.debounce.mark_hydrated();
        tracing::debug!(
            blocks = self.registry.len(),
            items = self.items.len(),
            "editor state loaded"
        );
        report
    }

    /// Dehydrated copy of the persisted state.
    ///
    /// Ephemeral media is written to the store and the new keys are attached to the live state
    /// as well, so the next cycle does not store the same field again. Only the items kept by
    /// retention are processed.
    pub fn snapshot(&mut self) -> (Snapshot, PassReport) {
        let keep = self.items.len().min(self.config.item_retention);
        let mut items: Vec<ResultItem> = self.items.items()[..keep].to_vec();
        let mut blocks: Vec<Block> = self.registry.blocks().to_vec();
        let report = dehydrate_all(&mut items, &mut blocks, &mut self.store);

        for (live, saved) in self.items.items_mut().iter_mut().zip(&items) {
            if live.asset_id.is_none() {
                live.asset_id.clone_from(&saved.asset_id);
            }
        }
        for (live, saved) in self.registry.blocks_mut().iter_mut().zip(&blocks) {
            for (slot, done) in live.data.all_slots_mut().zip(saved.data.all_slots()) {
                if slot.asset_id.is_none() {
                    slot.asset_id.clone_from(&done.asset_id);
                }
            }
        }

        let snap = Snapshot {
            user: self.session.user.clone(),
            credits: self.session.credits,
            folders: self.session.folders.clone(),
            purchases: self.session.purchases.clone(),
            presets: self.session.presets.clone(),
            theme: self.session.theme,
            history: self.items.history().to_vec(),
            blocks,
            items,
            layers_expanded: self.registry.layers_expanded(),
        };
        (snap, report)
    }

    /// Run one save cycle now: dehydrate, apply retention, write every slot.
    ///
    /// Never fails; problems are reported in the outcome and logged. Does nothing before
    /// [`Editor::load`].
    #[tracing::instrument(skip_all)]
    pub fn save<K: KeyValueStore + ?Sized>(&mut self, kv: &mut K) -> SaveOutcome {
        if !self.debounce.is_hydrated() {
            tracing::debug!("save skipped before initial load");
            return SaveOutcome::default();
        }
        self.debounce.cancel();
        let (snap, report) = self.snapshot();
        let mut outcome = save_snapshot(kv, &snap, Retention::from(&self.config));
        outcome.failures.extend(report.failures);
        outcome
    }

    /// Save when the debounce deadline has passed.
    pub fn save_if_due<K: KeyValueStore + ?Sized>(&mut self, kv: &mut K) -> Option<SaveOutcome> {
        let now = self.now();
        if self.debounce.take_due(now) {
            Some(self.save(kv))
        } else {
            None
        }
    }

    /// Resize the viewport.
    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    /// Active block, if any.
    pub fn active_block(&self) -> Option<&BlockId> {
        self.registry.active()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/editor/editor.rs"]
mod tests;
