use crate::canvas::block::{AspectRatio, Block, CreationType, Quality};
use crate::canvas::items::ResultItem;
use crate::foundation::config::EditorConfig;
use crate::foundation::core::Timestamp;
use crate::foundation::error::CanvasResult;
use crate::foundation::ids::{FolderId, ItemId};
use crate::persist::kv::KeyValueStore;

/// Prefix shared by every persisted slot name.
pub const SLOT_PREFIX: &str = "creativeflow_";

/// Credits assumed when the slot is missing or unreadable.
pub const DEFAULT_CREDITS: i64 = 150;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Persisted slot.
pub enum Slot {
    /// Signed-in user profile (`null` when signed out).
    User,
    /// Credit balance as a plain integer string.
    Credits,
    /// Gallery folders.
    Folders,
    /// Purchase history.
    PurchaseHistory,
    /// Saved presets.
    Presets,
    /// `light` or `dark`, stored raw.
    Theme,
    /// Canvas display-order history.
    EditorHistory,
    /// Canvas blocks.
    EditorBlocks,
    /// Result items.
    Items,
    /// Layer panel expansion, stored as `true`/`false`.
    LayersExpanded,
}

impl Slot {
    /// Every slot, in save order.
    pub const ALL: [Slot; 10] = [
        Slot::User,
        Slot::Credits,
        Slot::Folders,
        Slot::PurchaseHistory,
        Slot::Presets,
        Slot::Theme,
        Slot::EditorHistory,
        Slot::LayersExpanded,
        Slot::Items,
        Slot::EditorBlocks,
    ];

    /// Full slot name.
    pub fn key(self) -> &'static str {
        match self {
            Slot::User => "creativeflow_user",
            Slot::Credits => "creativeflow_credits",
            Slot::Folders => "creativeflow_folders",
            Slot::PurchaseHistory => "creativeflow_history",
            Slot::Presets => "creativeflow_presets",
            Slot::Theme => "creativeflow_theme",
            Slot::EditorHistory => "creativeflow_editor_history",
            Slot::EditorBlocks => "creativeflow_editor_blocks",
            Slot::Items => "creativeflow_items",
            Slot::LayersExpanded => "creativeflow_layers_expanded",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Gallery folder.
pub struct Folder {
    /// Stable id.
    pub id: FolderId,
    /// Display name.
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Purchase history entry.
pub struct Purchase {
    /// Stable id.
    pub id: String,
    /// Purchase time.
    pub date: Timestamp,
    /// Plan name.
    pub plan: String,
    /// Amount paid.
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Saved generation preset.
pub struct Preset {
    /// Stable id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Job type.
    #[serde(rename = "type")]
    pub creation_type: CreationType,
    /// Aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Quality tier.
    pub quality: Quality,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Signed-in user.
pub struct UserProfile {
    /// Account email.
    pub email: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
/// UI theme.
pub enum Theme {
    /// Light.
    Light,
    /// Dark.
    #[default]
    Dark,
}

impl Theme {
    /// Raw slot value.
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Parse a raw slot value.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    /// The other theme.
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
/// Everything persisted by the save cycle, with blocks and items already dehydrated.
pub struct Snapshot {
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
    /// Display-order history, most recent first.
    pub history: Vec<ItemId>,
    /// Canvas blocks.
    pub blocks: Vec<Block>,
    /// Result items, newest first.
    pub items: Vec<ResultItem>,
    /// Layer panel expansion.
    pub layers_expanded: bool,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            user: None,
            credits: DEFAULT_CREDITS,
            folders: Vec::new(),
            purchases: Vec::new(),
            presets: Vec::new(),
            theme: Theme::default(),
            history: Vec::new(),
            blocks: Vec::new(),
            items: Vec::new(),
            layers_expanded: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// How many history ids and items a save keeps.
pub struct Retention {
    /// History ids kept.
    pub history: usize,
    /// Items kept.
    pub items: usize,
    /// Items kept after a quota rejection.
    pub items_degraded: usize,
}

impl Default for Retention {
    fn default() -> Self {
        Self::from(&EditorConfig::default())
    }
}

impl From<&EditorConfig> for Retention {
    fn from(cfg: &EditorConfig) -> Self {
        Self {
            history: cfg.history_retention,
            items: cfg.item_retention,
            items_degraded: cfg.item_retention_degraded,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// Result of one save. Saves never fail outright; problems are reported here.
pub struct SaveOutcome {
    /// Slots written successfully.
    pub written: Vec<Slot>,
    /// Items actually persisted.
    pub items_saved: usize,
    /// History ids actually persisted.
    pub history_saved: usize,
    /// The item slot was rewritten with degraded retention after a quota rejection.
    pub degraded: bool,
    /// Failed slots as `"<slot>: <error>"`.
    pub failures: Vec<String>,
}

impl SaveOutcome {
    /// `true` when every slot was written at full retention.
    pub fn is_clean(&self) -> bool {
        !self.degraded && self.failures.is_empty()
    }

    fn fail(&mut self, slot: Slot, err: impl std::fmt::Display) {
        tracing::error!(slot = slot.key(), %err, "slot write failed");
        self.failures.push(format!("{}: {err}", slot.key()));
    }
}

fn read_json<K, T>(kv: &K, slot: Slot) -> Option<T>
where
    K: KeyValueStore + ?Sized,
    T: serde::de::DeserializeOwned,
{
    let raw = read_raw(kv, slot)?;
    match serde_json::from_str(&raw) {
        Ok(v) => Some(v),
        Err(err) => {
            tracing::warn!(slot = slot.key(), %err, "slot unparsable, using default");
            None
        }
    }
}

fn read_raw<K: KeyValueStore + ?Sized>(kv: &K, slot: Slot) -> Option<String> {
    match kv.get(slot.key()) {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!(slot = slot.key(), %err, "slot unreadable, using default");
            None
        }
    }
}

fn parse_credits(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v.trunc() as i64)
    })
}

/// Load every slot. Missing or unparsable slots fall back to their defaults.
///
/// Blocks and items come back exactly as stored (dehydrated); positions are not sanitized here.
#[tracing::instrument(skip_all)]
pub fn load_snapshot<K: KeyValueStore + ?Sized>(kv: &K) -> Snapshot {
    let defaults = Snapshot::default();
    Snapshot {
        user: read_json::<_, Option<UserProfile>>(kv, Slot::User).flatten(),
        credits: read_raw(kv, Slot::Credits)
            .and_then(|raw| parse_credits(&raw))
            .unwrap_or(defaults.credits),
        folders: read_json(kv, Slot::Folders).unwrap_or_default(),
        purchases: read_json(kv, Slot::PurchaseHistory).unwrap_or_default(),
        presets: read_json(kv, Slot::Presets).unwrap_or_default(),
        theme: read_raw(kv, Slot::Theme)
            .and_then(|raw| Theme::parse(&raw))
            .unwrap_or(defaults.theme),
        history: read_json(kv, Slot::EditorHistory).unwrap_or_default(),
        blocks: read_json(kv, Slot::EditorBlocks).unwrap_or_default(),
        items: read_json(kv, Slot::Items).unwrap_or_default(),
        layers_expanded: read_raw(kv, Slot::LayersExpanded)
            .map_or(defaults.layers_expanded, |raw| raw.trim() == "true"),
    }
}

fn write<K: KeyValueStore + ?Sized>(
    kv: &mut K,
    slot: Slot,
    value: CanvasResult<String>,
    outcome: &mut SaveOutcome,
) -> CanvasResult<()> {
    let res = value.and_then(|v| kv.set(slot.key(), &v));
    if res.is_ok() {
        outcome.written.push(slot);
    }
    res
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> CanvasResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Write every slot, applying retention.
///
/// Scalar and list slots are written independently; a failure is logged and the rest continue.
/// Items and blocks are written last. When either hits the storage quota, the item slot is
/// rewritten with [`Retention::items_degraded`] items.
#[tracing::instrument(skip_all, fields(items = snapshot.items.len(), blocks = snapshot.blocks.len()))]
pub fn save_snapshot<K: KeyValueStore + ?Sized>(
    kv: &mut K,
    snapshot: &Snapshot,
    retention: Retention,
) -> SaveOutcome {
    let mut out = SaveOutcome::default();
    let history = &snapshot.history[..snapshot.history.len().min(retention.history)];
    let items = &snapshot.items[..snapshot.items.len().min(retention.items)];

    let simple: [(Slot, CanvasResult<String>); 8] = [
        (Slot::User, to_json(&snapshot.user)),
        (Slot::Credits, Ok(snapshot.credits.to_string())),
        (Slot::Folders, to_json(&snapshot.folders)),
        (Slot::PurchaseHistory, to_json(&snapshot.purchases)),
        (Slot::Presets, to_json(&snapshot.presets)),
        (Slot::Theme, Ok(snapshot.theme.as_str().to_string())),
        (Slot::EditorHistory, to_json(history)),
        (Slot::LayersExpanded, Ok(snapshot.layers_expanded.to_string())),
    ];
    for (slot, value) in simple {
        if let Err(err) = write(kv, slot, value, &mut out) {
            out.fail(slot, err);
        }
    }
    if out.written.contains(&Slot::EditorHistory) {
        out.history_saved = history.len();
    }

    let items_res = write(kv, Slot::Items, to_json(items), &mut out);
    let blocks_res = items_res
        .as_ref()
        .ok()
        .map(|_| write(kv, Slot::EditorBlocks, to_json(&snapshot.blocks), &mut out));

    let quota_hit = matches!(&items_res, Err(e) if e.is_quota_exceeded())
        || matches!(&blocks_res, Some(Err(e)) if e.is_quota_exceeded());

    if quota_hit {
        tracing::warn!(keep = retention.items_degraded, "storage full, trimming saved items");
        out.written.retain(|s| *s != Slot::Items);
        let fewer = &items[..items.len().min(retention.items_degraded)];
        match write(kv, Slot::Items, to_json(fewer), &mut out) {
            Ok(()) => {
                out.items_saved = fewer.len();
                out.degraded = true;
            }
            Err(err) => out.fail(Slot::Items, err),
        }
        if let Some(Err(err)) = blocks_res {
            out.fail(Slot::EditorBlocks, err);
        }
    } else {
        match items_res {
            Ok(()) => out.items_saved = items.len(),
            Err(err) => out.fail(Slot::Items, err),
        }
        if let Some(Err(err)) = blocks_res {
            out.fail(Slot::EditorBlocks, err);
        }
    }
    out
}

/// Remove every stored slot except [`Slot::User`] and [`Slot::Credits`]. Returns how many slots
/// were removed.
pub fn clear_for_hard_reset<K: KeyValueStore + ?Sized>(kv: &mut K) -> CanvasResult<usize> {
    let keep = [Slot::User.key(), Slot::Credits.key()];
    let mut removed = 0;
    for slot in kv.slots()? {
        if !keep.contains(&slot.as_str()) {
            kv.remove(&slot)?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
#[path = "../../tests/unit/persist/snapshot.rs"]
mod tests;
