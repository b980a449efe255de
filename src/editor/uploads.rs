use crate::assets::store::{AssetKey, AssetStore, Blob};
use crate::canvas::block::{AspectRatio, CreationType, Quality};
use crate::canvas::items::ResultItem;
use crate::canvas::placement::place_dropped;
use crate::canvas::registry::{LibraryInsertMode, library_block_data};
use crate::editor::Editor;
use crate::foundation::core::Point;
use crate::foundation::error::{CanvasError, CanvasResult};
use crate::foundation::ids::{BlockId, ItemId};

#[derive(Clone, Debug, PartialEq, Eq)]
/// File picked or dropped by the user.
pub struct UploadedFile {
    /// Original file name.
    pub name: String,
    /// Contents.
    pub blob: Blob,
}

impl UploadedFile {
    /// Named file.
    pub fn new(name: impl Into<String>, blob: Blob) -> Self {
        Self {
            name: name.into(),
            blob,
        }
    }

    /// `true` for `image/*` MIME types.
    pub fn is_image(&self) -> bool {
        self.blob.mime_type.starts_with("image/")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// Library image used to seed a block.
pub struct LibraryEntry {
    /// Image URL.
    pub url: String,
    /// Title, used for the block name.
    pub title: String,
    /// Prompt suggestion copied into the block.
    pub prompt_suggestion: String,
}

impl<S: AssetStore> Editor<S> {
    fn upload_item_id(&self) -> ItemId {
        let base = format!("upload_{}", self.now().as_millis());
        let mut id = ItemId::from(base.as_str());
        let mut n = 1;
        while self.items.get(&id).is_some() {
            id = ItemId::from(format!("{base}_{n}"));
            n += 1;
        }
        id
    }

    fn store_upload(&mut self, file: UploadedFile, position: Point) -> CanvasResult<ItemId> {
        let key: AssetKey = self.store.save(file.blob)?;
        let handle = self
            .store
            .display_handle(&key)?
            .ok_or_else(|| CanvasError::media(format!("stored upload '{key}' has no handle")))?;

        let id = self.upload_item_id();
        let mut item = ResultItem::new(
            id.clone(),
            CreationType::Image,
            handle.into_string(),
            format!("Upload: {}", file.name),
            self.now(),
        );
        item.asset_id = Some(key);
        item.aspect_ratio = AspectRatio::Square;
        item.quality = Some(Quality::K1);
        item.position = Some(position);
        item.saved_to_gallery = Some(true);
        self.prepend_item(item);
        Ok(id)
    }

    /// Display handle for picked bytes that are not stored yet, e.g. a reference image chosen
    /// for a block slot. The next save stores the bytes and keeps the handle valid.
    pub fn register_file(&mut self, blob: Blob) -> String {
        self.store.register_blob(blob).into_string()
    }

    /// Store a picked file as a gallery item at the origin. The canvas history is untouched.
    #[tracing::instrument(skip_all, fields(name = %file.name))]
    pub fn upload_file(&mut self, file: UploadedFile) -> CanvasResult<ItemId> {
        let id = self.store_upload(file, Point::ORIGIN).inspect_err(|err| {
            tracing::error!(%err, "upload failed");
        })?;
        self.changed();
        Ok(id)
    }

    /// Store files dropped at `screen` and put them on the canvas.
    ///
    /// Only `image/*` files are accepted; the i-th accepted file lands at
    /// `screen_to_world(screen) + (i * stagger, i * stagger)`. Files that fail to store are
    /// skipped. Fails when nothing in the drop is an image.
    #[tracing::instrument(skip_all, fields(files = files.len()))]
    pub fn drop_files(
        &mut self,
        files: Vec<UploadedFile>,
        screen: Point,
    ) -> CanvasResult<Vec<ItemId>> {
        let images: Vec<UploadedFile> = files.into_iter().filter(UploadedFile::is_image).collect();
        if images.is_empty() {
            return Err(CanvasError::validation(
                "unsupported format; drop PNG, JPG or WEBP images",
            ));
        }
        let positions = place_dropped(
            screen,
            images.len(),
            &self.transform,
            &self.placement_rules(),
        );

        let mut ids = Vec::new();
        for (file, position) in images.into_iter().zip(positions) {
            let name = file.name.clone();
            match self.store_upload(file, position) {
                Ok(id) => ids.push(id),
                Err(err) => tracing::warn!(%err, name = %name, "dropped file skipped"),
            }
        }
        if !ids.is_empty() {
            self.items.push_history(ids.iter().cloned());
            self.changed();
        }
        Ok(ids)
    }

    /// Create a block seeded with a library image and center the view on it.
    ///
    /// `fetched` carries the image bytes when the host could download them; they are stored and
    /// the block shows a local handle. Otherwise the block references `entry.url` directly.
    pub fn insert_from_library(
        &mut self,
        entry: &LibraryEntry,
        mode: LibraryInsertMode,
        fetched: Option<Blob>,
    ) -> BlockId {
        let mut handle = entry.url.clone();
        let mut key = None;
        if let Some(blob) = fetched {
            match self.store.save(blob) {
                Ok(k) => {
                    match self.store.display_handle(&k) {
                        Ok(Some(h)) => handle = h.into_string(),
                        Ok(None) => {}
                        Err(err) => tracing::warn!(%err, "no handle for library image"),
                    }
                    key = Some(k);
                }
                Err(err) => {
                    tracing::warn!(%err, url = %entry.url, "could not cache library image, using url");
                }
            }
        }

        let mut data = library_block_data(handle, mode, entry.prompt_suggestion.clone());
        let slot = match mode {
            LibraryInsertMode::Model => &mut data.style,
            LibraryInsertMode::Reference => &mut data.reference,
        };
        slot.asset_id = key;

        // `key`, when set, already carries the reference taken by `save`.
        let now = self.now();
        let id = self
            .registry
            .add_block_with(data, format!("Creative: {}", entry.title), now);
        self.changed();
        self.center_on_block(&id);
        id
    }
}

#[cfg(test)]
#[path = "../../tests/unit/editor/uploads.rs"]
mod tests;
