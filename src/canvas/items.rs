use std::collections::HashMap;

use crate::assets::store::{AssetKey, AssetStore};
use crate::canvas::block::{AspectRatio, CreationType, Quality};
use crate::foundation::core::{Point, Timestamp, is_finite_point};
use crate::foundation::ids::{FolderId, ItemId};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Generated or uploaded artifact.
pub struct ResultItem {
    /// Stable id.
    pub id: ItemId,
    /// Job type that produced it.
    #[serde(rename = "type", default)]
    pub creation_type: CreationType,
    /// Display handle (`blob:` handle, data URI or remote URL); empty when only `asset_id` is set.
    #[serde(default)]
    pub url: String,
    /// Durable Asset Store key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<AssetKey>,
    /// Prompt used.
    #[serde(default)]
    pub prompt: String,
    /// Creation time.
    #[serde(default)]
    pub created_at: Timestamp,
    /// Aspect ratio.
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    /// Quality tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<Quality>,
    /// Canvas position; missing counts as the origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    /// Gallery folder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<FolderId>,
    /// Gallery tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Shown in the gallery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_to_gallery: Option<bool>,
}

impl ResultItem {
    /// Item with default ratio and no placement, folder or tags.
    pub fn new(
        id: ItemId,
        creation_type: CreationType,
        url: impl Into<String>,
        prompt: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            creation_type,
            url: url.into(),
            asset_id: None,
            prompt: prompt.into(),
            created_at,
            aspect_ratio: AspectRatio::default(),
            quality: None,
            position: None,
            folder_id: None,
            tags: None,
            saved_to_gallery: None,
        }
    }

    /// Position with the origin standing in for a missing one.
    pub fn position_or_origin(&self) -> Point {
        self.position.unwrap_or(Point::ORIGIN)
    }
}

/// Result items (newest first) plus the display-order history that puts them on the canvas.
#[derive(Clone, Debug, Default)]
pub struct ItemCollection {
    items: Vec<ResultItem>,
    history: Vec<ItemId>,
}

impl ItemCollection {
    /// Collection from loaded state.
    pub fn from_parts(items: Vec<ResultItem>, history: Vec<ItemId>) -> Self {
        Self { items, history }
    }

    /// Items, newest first.
    pub fn items(&self) -> &[ResultItem] {
        &self.items
    }

    /// Display-order history, most recent first.
    pub fn history(&self) -> &[ItemId] {
        &self.history
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` when there are no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Lookup by id.
    pub fn get(&self, id: &ItemId) -> Option<&ResultItem> {
        self.items.iter().find(|i| &i.id == id)
    }

    fn get_mut(&mut self, id: &ItemId) -> Option<&mut ResultItem> {
        self.items.iter_mut().find(|i| &i.id == id)
    }

    /// Insert as the newest item. An item with the same id is replaced in place and handed
    /// back so the caller can release what it held.
    pub fn prepend(&mut self, item: ResultItem) -> Option<ResultItem> {
        if let Some(existing) = self.get_mut(&item.id) {
            Some(std::mem::replace(existing, item))
        } else {
            self.items.insert(0, item);
            None
        }
    }

    /// Put `ids` on top of the display history, in the given order.
    pub fn push_history<I: IntoIterator<Item = ItemId>>(&mut self, ids: I) {
        let mut ids: Vec<ItemId> = ids.into_iter().collect();
        self.history.retain(|h| !ids.contains(h));
        ids.append(&mut self.history);
        self.history = ids;
    }

    /// Items on the canvas in paint order: oldest first, so the newest ends up on top.
    ///
    /// History ids without a matching item are skipped.
    pub fn paint_order(&self) -> Vec<&ResultItem> {
        let by_id: HashMap<&ItemId, &ResultItem> = self.items.iter().map(|i| (&i.id, i)).collect();
        self.history
            .iter()
            .rev()
            .filter_map(|id| by_id.get(id).copied())
            .collect()
    }

    /// Delete an item, its history entry and its stored bytes.
    ///
    /// Store failures are logged; the item is removed regardless.
    pub fn delete<S: AssetStore + ?Sized>(&mut self, id: &ItemId, store: &mut S) -> bool {
        let Some(idx) = self.items.iter().position(|i| &i.id == id) else {
            return false;
        };
        let removed = self.items.remove(idx);
        self.history.retain(|h| h != id);
        if let Some(key) = &removed.asset_id
            && let Err(err) = store.delete(key)
        {
            tracing::warn!(%err, item = %id, "failed to delete item asset");
        }
        true
    }

    /// Move an item on the canvas. Non-finite input is rejected.
    pub fn update_position(&mut self, id: &ItemId, position: Point) -> bool {
        if !is_finite_point(position) {
            return false;
        }
        match self.get_mut(id) {
            Some(item) => {
                item.position = Some(position);
                true
            }
            None => false,
        }
    }

    /// Assign an item to a folder; `None` (or an empty id) removes the assignment.
    pub fn move_to_folder(&mut self, id: &ItemId, folder: Option<FolderId>) -> bool {
        let folder = folder.filter(|f| !f.as_str().is_empty());
        match self.get_mut(id) {
            Some(item) => {
                item.folder_id = folder;
                true
            }
            None => false,
        }
    }

    /// Replace an item's tags.
    pub fn set_tags(&mut self, id: &ItemId, tags: Vec<String>) -> bool {
        match self.get_mut(id) {
            Some(item) => {
                item.tags = Some(tags);
                true
            }
            None => false,
        }
    }

    /// Flag an item as saved to the gallery.
    pub fn save_to_gallery(&mut self, id: &ItemId) -> bool {
        match self.get_mut(id) {
            Some(item) => {
                item.saved_to_gallery = Some(true);
                true
            }
            None => false,
        }
    }

    pub(crate) fn items_mut(&mut self) -> &mut [ResultItem] {
        &mut self.items
    }

    /// Decompose into items and history.
    pub fn into_parts(self) -> (Vec<ResultItem>, Vec<ItemId>) {
        (self.items, self.history)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/items.rs"]
mod tests;
