use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::assets::store::{
    AssetEntry, AssetKey, AssetStats, AssetStore, Blob, DisplayHandle, HandleRegistry,
    HandleTarget,
};
use crate::foundation::core::{Clock, SystemClock, Timestamp};
use crate::foundation::error::{CanvasError, CanvasResult, StorageError};

const INDEX_FILE: &str = "index.json";

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexEntry {
    mime_type: String,
    timestamp: Timestamp,
    refs: usize,
    size: usize,
}

/// Directory-backed [`AssetStore`].
///
/// Layout: one `<key>.bin` file per entry plus an `index.json` holding MIME type, timestamp,
/// size and reference count. The index is rewritten after every mutation.
pub struct DirAssetStore {
    root: PathBuf,
    index: BTreeMap<AssetKey, IndexEntry>,
    handles: HandleRegistry,
    clock: Box<dyn Clock>,
}

impl fmt::Debug for DirAssetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirAssetStore")
            .field("root", &self.root)
            .field("entries", &self.index.len())
            .finish()
    }
}

impl DirAssetStore {
    /// Open (creating if needed) the store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> CanvasResult<Self> {
        Self::open_with_clock(root, Box::new(SystemClock))
    }

    /// Same as [`DirAssetStore::open`] with an explicit clock.
    #[tracing::instrument(skip(root, clock), fields(root = tracing::field::Empty))]
    pub fn open_with_clock(root: impl Into<PathBuf>, clock: Box<dyn Clock>) -> CanvasResult<Self> {
        let root = root.into();
        tracing::Span::current().record("root", tracing::field::display(root.display()));
        std::fs::create_dir_all(&root)
            .map_err(|e| StorageError::io(root.display().to_string(), e))?;

        let index_path = root.join(INDEX_FILE);
        let index = if index_path.exists() {
            let text = std::fs::read_to_string(&index_path)
                .map_err(|e| StorageError::io(index_path.display().to_string(), e))?;
            match serde_json::from_str(&text) {
                Ok(index) => index,
                Err(err) => {
                    tracing::warn!(%err, "asset index unreadable, starting empty");
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            root,
            index,
            handles: HandleRegistry::default(),
            clock,
        })
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keys currently stored, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &AssetKey> {
        self.index.keys()
    }

    /// Current reference count of `key` (0 when absent).
    pub fn ref_count(&self, key: &AssetKey) -> usize {
        self.index.get(key).map_or(0, |e| e.refs)
    }

    fn blob_path(&self, key: &AssetKey) -> CanvasResult<PathBuf> {
        let raw = key.as_str();
        if raw.is_empty()
            || raw
                .chars()
                .any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        {
            return Err(CanvasError::validation(format!(
                "asset key '{raw}' is not a safe file name"
            )));
        }
        Ok(self.root.join(format!("{raw}.bin")))
    }

    fn write_index(&self) -> CanvasResult<()> {
        let path = self.root.join(INDEX_FILE);
        let text = serde_json::to_string_pretty(&self.index)?;
        std::fs::write(&path, text).map_err(|e| StorageError::io(path.display().to_string(), e))?;
        Ok(())
    }

    fn read_blob(&self, key: &AssetKey) -> CanvasResult<Option<Blob>> {
        let Some(meta) = self.index.get(key) else {
            return Ok(None);
        };
        let path = self.blob_path(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(Blob::new(bytes, meta.mime_type.clone()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path.display().to_string(), e).into()),
        }
    }
}

impl AssetStore for DirAssetStore {
    fn save(&mut self, blob: Blob) -> CanvasResult<AssetKey> {
        let key = AssetKey::for_content(&blob.bytes);
        if let Some(meta) = self.index.get_mut(&key) {
            meta.refs += 1;
        } else {
            let path = self.blob_path(&key)?;
            std::fs::write(&path, &blob.bytes)
                .map_err(|e| StorageError::io(path.display().to_string(), e))?;
            self.index.insert(
                key.clone(),
                IndexEntry {
                    mime_type: blob.mime_type,
                    timestamp: self.clock.now(),
                    refs: 1,
                    size: blob.bytes.len(),
                },
            );
        }
        self.write_index()?;
        Ok(key)
    }

    fn display_handle(&mut self, key: &AssetKey) -> CanvasResult<Option<DisplayHandle>> {
        if !self.index.contains_key(key) || !self.blob_path(key)?.exists() {
            return Ok(None);
        }
        Ok(Some(self.handles.issue_stored(key)))
    }

    fn retain(&mut self, key: &AssetKey) -> CanvasResult<bool> {
        let Some(meta) = self.index.get_mut(key) else {
            return Ok(false);
        };
        meta.refs += 1;
        self.write_index()?;
        Ok(true)
    }

    fn delete(&mut self, key: &AssetKey) -> CanvasResult<()> {
        let Some(meta) = self.index.get_mut(key) else {
            return Ok(());
        };
        meta.refs = meta.refs.saturating_sub(1);
        if meta.refs == 0 {
            self.index.remove(key);
            self.handles.revoke_key(key);
            let path = self.blob_path(key)?;
            if let Err(e) = std::fs::remove_file(&path)
                && e.kind() != std::io::ErrorKind::NotFound
            {
                return Err(StorageError::io(path.display().to_string(), e).into());
            }
        }
        self.write_index()
    }

    fn resolve_handle(&self, handle: &str) -> CanvasResult<Option<Blob>> {
        match self.handles.lookup(handle) {
            None => Ok(None),
            Some(HandleTarget::Detached(blob)) => Ok(Some(blob.clone())),
            Some(HandleTarget::Stored(key)) => self.read_blob(key),
        }
    }

    fn register_blob(&mut self, blob: Blob) -> DisplayHandle {
        self.handles.issue_detached(blob)
    }

    fn bind_handle(&mut self, handle: &str, key: &AssetKey) -> bool {
        self.index.contains_key(key) && self.handles.bind(handle, key)
    }

    fn revoke_handle(&mut self, handle: &str) {
        self.handles.revoke(handle);
    }

    fn get(&self, key: &AssetKey) -> CanvasResult<Option<AssetEntry>> {
        let Some(blob) = self.read_blob(key)? else {
            return Ok(None);
        };
        let timestamp = self.index.get(key).map(|m| m.timestamp).unwrap_or_default();
        Ok(Some(AssetEntry {
            id: key.clone(),
            bytes: blob.bytes,
            mime_type: blob.mime_type,
            timestamp,
        }))
    }

    fn stats(&self) -> CanvasResult<AssetStats> {
        Ok(self
            .index
            .values()
            .fold(AssetStats::default(), |mut acc, m| {
                acc.entries += 1;
                acc.total_bytes += m.size;
                acc.references += m.refs;
                acc
            }))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/dir_store.rs"]
mod tests;
