//! Crash capture and the two ways back to a usable editor.
//!
//! A soft reset only drops view and gesture state, which is what goes wrong in practice (a
//! corrupt transform or a stuck drag). A hard reset also wipes persisted canvas state while
//! keeping the account (`user` and `credits`).

use crate::assets::store::AssetStore;
use crate::editor::{Editor, Session};
use crate::foundation::core::Timestamp;
use crate::foundation::error::CanvasResult;
use crate::foundation::ids::BlockId;
use crate::persist::kv::KeyValueStore;
use crate::persist::snapshot::{Snapshot, clear_for_hard_reset};
use crate::viewport::transform::ViewportTransform;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// What the user can copy out of the crash screen.
pub struct CrashReport {
    /// Error message.
    pub message: String,
    /// Where it happened (component or operation name).
    pub context: String,
    /// RFC 3339 time of the failure.
    pub occurred_at: String,
    /// Same instant in epoch milliseconds.
    pub timestamp: Timestamp,
    /// View state at the time.
    pub transform: ViewportTransform,
    /// Selected block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_block: Option<BlockId>,
    /// Number of blocks.
    pub block_count: usize,
    /// Number of result items.
    pub item_count: usize,
}

impl CrashReport {
    /// Pretty JSON for the clipboard.
    pub fn to_json(&self) -> CanvasResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl<S: AssetStore> Editor<S> {
    /// Capture the current state around `error`.
    pub fn crash_report(&self, error: &dyn std::fmt::Display, context: &str) -> CrashReport {
        let now = self.now();
        let occurred_at = chrono::DateTime::from_timestamp_millis(now.as_millis())
            .unwrap_or_default()
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        tracing::error!(%error, context, "editor crashed");
        CrashReport {
            message: error.to_string(),
            context: context.to_string(),
            occurred_at,
            timestamp: now,
            transform: self.transform,
            active_block: self.registry.active().cloned(),
            block_count: self.registry.len(),
            item_count: self.items.len(),
        }
    }

    /// Reset the view transform and abandon any gesture. Canvas content is untouched.
    pub fn soft_reset(&mut self) {
        self.transform.reset();
        self.pointer.reset();
        self.previews.clear();
    }

    /// Wipe persisted and in-memory canvas state, keeping the signed-in user and credits.
    ///
    /// Stored asset bytes are left in place. Returns the number of slots removed.
    #[tracing::instrument(skip_all)]
    pub fn hard_reset<K: KeyValueStore + ?Sized>(&mut self, kv: &mut K) -> CanvasResult<usize> {
        let removed = clear_for_hard_reset(kv)?;
        let shown = self.live_holdings();

        let now = self.now();
        let defaults = Snapshot::default();
        self.session = Session {
            user: self.session.user.take(),
            credits: self.session.credits,
            ..Session::default()
        };
        self.items = Default::default();
        self.registry.clear();
        self.registry.ensure_default(self.viewport.width, now);
        self.registry.set_layers_expanded(defaults.layers_expanded);
        self.tracker.clear();
        self.jobs.clear();
        self.soft_reset();
        self.release_handles(shown.handles);
        self.debounce.cancel();
        tracing::info!(removed, "hard reset");
        Ok(removed)
    }
}
