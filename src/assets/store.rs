use std::collections::HashMap;
use std::fmt;

use sha2::{Digest, Sha256};

use crate::assets::media::{self, MediaRef};
use crate::foundation::core::{Clock, SystemClock, Timestamp};
use crate::foundation::error::{CanvasError, CanvasResult};

#[derive(Clone, Debug, PartialEq, Eq)]
/// Binary payload with its MIME type.
pub struct Blob {
    /// Raw bytes.
    pub bytes: Vec<u8>,
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
}

impl Blob {
    /// Construct a blob.
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Decode an inline `data:` URI.
    pub fn from_data_uri(uri: &str) -> CanvasResult<Self> {
        let decoded = media::decode_data_uri(uri)?;
        Ok(Self {
            bytes: decoded.bytes,
            mime_type: decoded.mime_type,
        })
    }

    /// Byte length.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// `true` when there are no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
/// Durable key of an Asset Store entry.
///
/// Keys are opaque to the rest of the crate. Stores in this crate derive them from content.
pub struct AssetKey(pub String);

impl AssetKey {
    /// `asset_<sha256 hex>` of `bytes`.
    pub fn for_content(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(format!("asset_{digest:x}"))
    }

    /// Borrow the raw key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// Ephemeral display handle (`blob:` URL) valid for the current session only.
pub struct DisplayHandle(pub String);

impl DisplayHandle {
    fn fresh() -> Self {
        Self(format!(
            "{}creativeflow/{}",
            media::BLOB_SCHEME,
            uuid::Uuid::now_v7()
        ))
    }

    /// Borrow the handle string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the handle string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DisplayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Stored asset record.
pub struct AssetEntry {
    /// Store key.
    pub id: AssetKey,
    /// Blob bytes.
    pub bytes: Vec<u8>,
    /// MIME type.
    pub mime_type: String,
    /// Time the content was first stored.
    pub timestamp: Timestamp,
}

impl AssetEntry {
    /// Copy out as a [`Blob`].
    pub fn to_blob(&self) -> Blob {
        Blob::new(self.bytes.clone(), self.mime_type.clone())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Aggregate store statistics.
pub struct AssetStats {
    /// Distinct entries.
    pub entries: usize,
    /// Sum of entry sizes.
    pub total_bytes: usize,
    /// Sum of reference counts.
    pub references: usize,
}

/// Local binary storage keyed by durable asset keys.
///
/// The store is the sole owner of bytes; blocks and items hold [`AssetKey`]s. Saving identical
/// content twice returns the same key and bumps its reference count; `delete` releases one
/// reference and drops the bytes with the last one.
pub trait AssetStore {
    /// Persist `blob` and return its key.
    fn save(&mut self, blob: Blob) -> CanvasResult<AssetKey>;

    /// Fresh ephemeral handle for `key`, or `None` when the entry is missing.
    fn display_handle(&mut self, key: &AssetKey) -> CanvasResult<Option<DisplayHandle>>;

    /// Take one more reference to an existing entry. Returns `false` when `key` is missing.
    fn retain(&mut self, key: &AssetKey) -> CanvasResult<bool>;

    /// Release one reference to `key`. Missing keys are ignored.
    fn delete(&mut self, key: &AssetKey) -> CanvasResult<()>;

    /// Read the bytes behind an ephemeral handle issued by this store.
    fn resolve_handle(&self, handle: &str) -> CanvasResult<Option<Blob>>;

    /// Issue a handle for bytes that are not (yet) stored, e.g. a freshly picked file.
    fn register_blob(&mut self, blob: Blob) -> DisplayHandle;

    /// Point a handle issued by [`AssetStore::register_blob`] at the stored entry `key`, dropping
    /// its private copy of the bytes. The handle string stays valid.
    fn bind_handle(&mut self, handle: &str, key: &AssetKey) -> bool;

    /// Invalidate one handle. Unknown handles are ignored.
    fn revoke_handle(&mut self, handle: &str);

    /// Load a stored entry.
    fn get(&self, key: &AssetKey) -> CanvasResult<Option<AssetEntry>>;

    /// Entry and byte totals.
    fn stats(&self) -> CanvasResult<AssetStats>;
}

/// Resolve any ephemeral media reference (`data:` URI or `blob:` handle) to bytes.
pub fn fetch_ephemeral<S: AssetStore + ?Sized>(store: &S, reference: &str) -> CanvasResult<Blob> {
    match MediaRef::classify(reference) {
        MediaRef::DataUri(uri) => Blob::from_data_uri(uri),
        MediaRef::Blob(handle) => store
            .resolve_handle(handle)?
            .ok_or_else(|| CanvasError::media(format!("revoked or unknown handle '{handle}'"))),
        MediaRef::Empty => Err(CanvasError::media("empty media reference")),
        MediaRef::Remote(url) => Err(CanvasError::media(format!(
            "remote reference '{url}' is not ephemeral"
        ))),
    }
}

#[derive(Clone, Debug)]
pub(crate) enum HandleTarget {
    Stored(AssetKey),
    Detached(Blob),
}

#[derive(Clone, Debug, Default)]
/// Session-scoped table of issued `blob:` handles.
pub(crate) struct HandleRegistry {
    handles: HashMap<String, HandleTarget>,
}

impl HandleRegistry {
    pub(crate) fn issue_stored(&mut self, key: &AssetKey) -> DisplayHandle {
        let handle = DisplayHandle::fresh();
        self.handles
            .insert(handle.0.clone(), HandleTarget::Stored(key.clone()));
        handle
    }

    pub(crate) fn issue_detached(&mut self, blob: Blob) -> DisplayHandle {
        let handle = DisplayHandle::fresh();
        self.handles
            .insert(handle.0.clone(), HandleTarget::Detached(blob));
        handle
    }

    pub(crate) fn lookup(&self, handle: &str) -> Option<&HandleTarget> {
        self.handles.get(handle)
    }

    pub(crate) fn bind(&mut self, handle: &str, key: &AssetKey) -> bool {
        let Some(target) = self.handles.get_mut(handle) else {
            return false;
        };
        if !matches!(target, HandleTarget::Detached(_)) {
            return false;
        }
        *target = HandleTarget::Stored(key.clone());
        true
    }

    pub(crate) fn revoke(&mut self, handle: &str) {
        self.handles.remove(handle);
    }

    pub(crate) fn detached_count(&self) -> usize {
        self.handles
            .values()
            .filter(|t| matches!(t, HandleTarget::Detached(_)))
            .count()
    }

    pub(crate) fn revoke_key(&mut self, key: &AssetKey) {
        self.handles
            .retain(|_, t| !matches!(t, HandleTarget::Stored(k) if k == key));
    }

    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }
}

#[derive(Clone, Debug)]
struct Slot {
    entry: AssetEntry,
    refs: usize,
}

/// In-memory [`AssetStore`].
pub struct MemoryAssetStore {
    entries: HashMap<AssetKey, Slot>,
    handles: HandleRegistry,
    clock: Box<dyn Clock>,
}

impl Default for MemoryAssetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryAssetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryAssetStore")
            .field("entries", &self.entries.len())
            .field("handles", &self.handles.len())
            .finish()
    }
}

impl MemoryAssetStore {
    /// Empty store stamping entries with the system clock.
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    /// Empty store stamping entries with `clock`.
    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            handles: HandleRegistry::default(),
            clock,
        }
    }

    /// Current reference count of `key` (0 when absent).
    pub fn ref_count(&self, key: &AssetKey) -> usize {
        self.entries.get(key).map_or(0, |s| s.refs)
    }

    /// Number of distinct entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Live handles, and how many of them still hold their own bytes.
    pub fn handle_counts(&self) -> (usize, usize) {
        (self.handles.len(), self.handles.detached_count())
    }

    /// `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AssetStore for MemoryAssetStore {
    fn save(&mut self, blob: Blob) -> CanvasResult<AssetKey> {
        let key = AssetKey::for_content(&blob.bytes);
        let now = self.clock.now();
        self.entries
            .entry(key.clone())
            .and_modify(|s| s.refs += 1)
            .or_insert_with(|| Slot {
                entry: AssetEntry {
                    id: key.clone(),
                    bytes: blob.bytes,
                    mime_type: blob.mime_type,
                    timestamp: now,
                },
                refs: 1,
            });
        Ok(key)
    }

    fn display_handle(&mut self, key: &AssetKey) -> CanvasResult<Option<DisplayHandle>> {
        if !self.entries.contains_key(key) {
            return Ok(None);
        }
        Ok(Some(self.handles.issue_stored(key)))
    }

    fn retain(&mut self, key: &AssetKey) -> CanvasResult<bool> {
        Ok(match self.entries.get_mut(key) {
            Some(slot) => {
                slot.refs += 1;
                true
            }
            None => false,
        })
    }

    fn delete(&mut self, key: &AssetKey) -> CanvasResult<()> {
        let Some(slot) = self.entries.get_mut(key) else {
            return Ok(());
        };
        slot.refs = slot.refs.saturating_sub(1);
        if slot.refs == 0 {
            self.entries.remove(key);
            self.handles.revoke_key(key);
        }
        Ok(())
    }

    fn resolve_handle(&self, handle: &str) -> CanvasResult<Option<Blob>> {
        Ok(match self.handles.lookup(handle) {
            None => None,
            Some(HandleTarget::Detached(blob)) => Some(blob.clone()),
            Some(HandleTarget::Stored(key)) => self.entries.get(key).map(|s| s.entry.to_blob()),
        })
    }

    fn register_blob(&mut self, blob: Blob) -> DisplayHandle {
        self.handles.issue_detached(blob)
    }

    fn bind_handle(&mut self, handle: &str, key: &AssetKey) -> bool {
        self.entries.contains_key(key) && self.handles.bind(handle, key)
    }

    fn revoke_handle(&mut self, handle: &str) {
        self.handles.revoke(handle);
    }

    fn get(&self, key: &AssetKey) -> CanvasResult<Option<AssetEntry>> {
        Ok(self.entries.get(key).map(|s| s.entry.clone()))
    }

    fn stats(&self) -> CanvasResult<AssetStats> {
        Ok(self
            .entries
            .values()
            .fold(AssetStats::default(), |mut acc, s| {
                acc.entries += 1;
                acc.total_bytes += s.entry.bytes.len();
                acc.references += s.refs;
                acc
            }))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
