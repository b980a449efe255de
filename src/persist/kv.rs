use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::foundation::error::{CanvasError, CanvasResult, StorageError};

/// String key-value collaborator holding the persisted slots.
pub trait KeyValueStore {
    /// Read a slot; `None` when absent.
    fn get(&self, slot: &str) -> CanvasResult<Option<String>>;

    /// Write a slot. Quota rejections surface as [`StorageError::QuotaExceeded`].
    fn set(&mut self, slot: &str, value: &str) -> CanvasResult<()>;

    /// Remove a slot. Missing slots are ignored.
    fn remove(&mut self, slot: &str) -> CanvasResult<()>;

    /// Every slot name, sorted.
    fn slots(&self) -> CanvasResult<Vec<String>>;
}

#[derive(Clone, Debug, Default)]
/// In-memory [`KeyValueStore`] with an optional byte quota over all values.
pub struct MemoryKv {
    values: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl MemoryKv {
    /// Unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store refusing writes that would push the total value size above `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            values: BTreeMap::new(),
            quota: Some(quota_bytes),
        }
    }

    /// Total bytes held.
    pub fn used_bytes(&self) -> usize {
        self.values.values().map(String::len).sum()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, slot: &str) -> CanvasResult<Option<String>> {
        Ok(self.values.get(slot).cloned())
    }

    fn set(&mut self, slot: &str, value: &str) -> CanvasResult<()> {
        if let Some(quota) = self.quota {
            let current = self.values.get(slot).map_or(0, String::len);
            let after = self.used_bytes() - current + value.len();
            if after > quota {
                return Err(StorageError::QuotaExceeded {
                    slot: slot.to_string(),
                    needed: value.len(),
                }
                .into());
            }
        }
        self.values.insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, slot: &str) -> CanvasResult<()> {
        self.values.remove(slot);
        Ok(())
    }

    fn slots(&self) -> CanvasResult<Vec<String>> {
        Ok(self.values.keys().cloned().collect())
    }
}

#[derive(Clone, Debug)]
/// Directory-backed [`KeyValueStore`]: one `<slot>.json` file per slot.
pub struct DirKv {
    root: PathBuf,
}

const SLOT_EXT: &str = "json";

impl DirKv {
    /// Open (creating if needed) the store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> CanvasResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| StorageError::io(root.display().to_string(), e))?;
        Ok(Self { root })
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn slot_path(&self, slot: &str) -> CanvasResult<PathBuf> {
        if slot.is_empty()
            || slot
                .chars()
                .any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        {
            return Err(CanvasError::validation(format!(
                "slot '{slot}' is not a safe file name"
            )));
        }
        Ok(self.root.join(format!("{slot}.{SLOT_EXT}")))
    }
}

impl KeyValueStore for DirKv {
    fn get(&self, slot: &str) -> CanvasResult<Option<String>> {
        let path = self.slot_path(slot)?;
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path.display().to_string(), e).into()),
        }
    }

    fn set(&mut self, slot: &str, value: &str) -> CanvasResult<()> {
        let path = self.slot_path(slot)?;
        match std::fs::write(&path, value) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::StorageFull => {
                Err(StorageError::QuotaExceeded {
                    slot: slot.to_string(),
                    needed: value.len(),
                }
                .into())
            }
            Err(e) => Err(StorageError::io(path.display().to_string(), e).into()),
        }
    }

    fn remove(&mut self, slot: &str) -> CanvasResult<()> {
        let path = self.slot_path(slot)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(path.display().to_string(), e).into()),
        }
    }

    fn slots(&self) -> CanvasResult<Vec<String>> {
        let rd = std::fs::read_dir(&self.root)
            .map_err(|e| StorageError::io(self.root.display().to_string(), e))?;
        let mut out = Vec::new();
        for entry in rd {
            let entry = entry.map_err(|e| StorageError::io(self.root.display().to_string(), e))?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some(SLOT_EXT)
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                out.push(stem.to_string());
            }
        }
        out.sort();
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/persist/kv.rs"]
mod tests;
