use crate::assets::media::MediaKind;
use crate::assets::store::{AssetKey, AssetStore, Blob};
use crate::canvas::block::{BlockDataPatch, MediaSlot};
use crate::canvas::items::ResultItem;
use crate::canvas::placement::place_result;
use crate::editor::Editor;
use crate::editor::ownership::Holdings;
use crate::foundation::error::{CanvasError, CanvasResult};
use crate::foundation::ids::{BlockId, ItemId};
use crate::generation::request::GenerationRequest;
use crate::generation::service::{GenerationOutput, GenerationService};
use crate::generation::tracker::JobTicket;
use crate::generation::validate::validate_block_data;

#[derive(Clone, Debug, PartialEq)]
/// Job accepted by [`Editor::begin_generation`], to be submitted by the host.
pub struct PendingGeneration {
    /// Ticket to hand back on completion.
    pub ticket: JobTicket,
    /// Payload to submit.
    pub request: GenerationRequest,
}

#[derive(Clone, Debug, PartialEq)]
/// Successful job result as delivered by the host.
pub struct CompletedGeneration {
    /// What the service returned.
    pub output: GenerationOutput,
    /// Bytes fetched from `output.url`; `None` keeps the remote URL as the display handle.
    pub media: Option<Blob>,
    /// Server-side id to reuse for the item, when the backend assigns one.
    pub item_id: Option<ItemId>,
}

impl<S: AssetStore> Editor<S> {
    /// Validate a block and mark it in flight.
    ///
    /// Fails when the block is unknown, its inputs are incomplete for its job type, or it
    /// already has a job running.
    #[tracing::instrument(skip_all, fields(block = %block))]
    pub fn begin_generation(&mut self, block: &BlockId) -> CanvasResult<PendingGeneration> {
        let data = self
            .registry
            .get(block)
            .map(|b| &b.data)
            .ok_or_else(|| CanvasError::validation(format!("unknown block '{block}'")))?;
        validate_block_data(data)?;

        let now = self.now();
        let user = self.session.user.as_ref().map(|u| u.email.as_str());
        let request = GenerationRequest::from_block(data, user, now);
        let ticket = self.tracker.begin(block, now).ok_or_else(|| {
            CanvasError::validation(format!("block '{block}' already has a job in flight"))
        })?;
        self.jobs.insert(ticket.seq, request.clone());
        Ok(PendingGeneration { ticket, request })
    }

    /// Record a retry reported by the service.
    pub fn note_generation_retry(&mut self, ticket: &JobTicket, attempt: u32) -> bool {
        self.tracker.note_retry(ticket, attempt)
    }

    /// Merge a finished job into the current state.
    ///
    /// On success the bytes (if any) are stored, the block's last result is replaced when the
    /// block still exists, and a new item is placed next to the block (or at the origin when it
    /// is gone) and put on top of the canvas. Tickets that are no longer current are discarded
    /// with `Ok(None)`. Failures return the block to idle and are passed through.
    #[tracing::instrument(skip_all, fields(block = %ticket.block, seq = ticket.seq))]
    pub fn complete_generation(
        &mut self,
        ticket: &JobTicket,
        result: CanvasResult<CompletedGeneration>,
    ) -> CanvasResult<Option<ItemId>> {
        let request = self.jobs.remove(&ticket.seq);
        if !self.tracker.finish(ticket) {
            tracing::debug!("stale job completion discarded");
            return Ok(None);
        }
        let Some(request) = request else {
            return Err(CanvasError::generation("no request recorded for job"));
        };
        let done = match result {
            Ok(done) => done,
            Err(err) => {
                tracing::error!(%err, "generation failed");
                return Err(err);
            }
        };

        let now = self.now();
        let kind = if request.creation_type.is_video() {
            MediaKind::Video
        } else {
            MediaKind::Image
        };
        let (display, key) = self.store_result(&done.output.url, done.media.as_ref());

        let anchor = self.registry.get(&ticket.block).map(|b| b.position);
        if anchor.is_some() {
            self.replace_last_generated(&ticket.block, &display, done.media, kind);
        } else {
            tracing::debug!("block removed before completion; result kept unanchored");
        }

        let placement = place_result(
            anchor,
            self.viewport.width,
            self.items.items(),
            &self.placement_rules(),
        );
        let id = done.item_id.unwrap_or_else(ItemId::generate);
        let mut item = ResultItem::new(
            id.clone(),
            request.creation_type,
            display,
            request.prompt,
            now,
        );
        item.asset_id = key;
        item.aspect_ratio = request.aspect_ratio;
        item.quality = request.quality;
        item.position = Some(placement.position);
        item.saved_to_gallery = Some(true);

        self.prepend_item(item);
        self.items.push_history([id.clone()]);
        self.changed();
        Ok(Some(id))
    }

    /// Begin, submit and complete a job in one call.
    ///
    /// `fetch` downloads the result bytes; a fetch failure is logged and the remote URL is kept.
    pub fn run_generation<G, F>(
        &mut self,
        block: &BlockId,
        service: &mut G,
        mut fetch: F,
    ) -> CanvasResult<Option<ItemId>>
    where
        G: GenerationService + ?Sized,
        F: FnMut(&str) -> CanvasResult<Blob>,
    {
        let pending = self.begin_generation(block)?;
        let tracker = &mut self.tracker;
        let ticket = &pending.ticket;
        let result = service
            .submit(&pending.request, &mut |attempt| {
                tracing::debug!(attempt, "generation retry");
                tracker.note_retry(ticket, attempt);
            })
            .map(|output| {
                let media = match fetch(&output.url) {
                    Ok(blob) => Some(blob),
                    Err(err) => {
                        tracing::warn!(%err, url = %output.url, "result fetch failed, keeping remote url");
                        None
                    }
                };
                CompletedGeneration {
                    output,
                    media,
                    item_id: None,
                }
            });
        self.complete_generation(&pending.ticket, result)
    }

    fn store_result(&mut self, url: &str, media: Option<&Blob>) -> (String, Option<AssetKey>) {
        let Some(blob) = media else {
            return (url.to_string(), None);
        };
        let key = match self.store.save(blob.clone()) {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!(%err, "could not store result, keeping remote url");
                return (url.to_string(), None);
            }
        };
        match self.store.display_handle(&key) {
            Ok(Some(handle)) => (handle.into_string(), Some(key)),
            Ok(None) => (url.to_string(), Some(key)),
            Err(err) => {
                tracing::warn!(%err, "no display handle for stored result");
                (url.to_string(), Some(key))
            }
        }
    }

    fn replace_last_generated(
        &mut self,
        block: &BlockId,
        display: &str,
        media: Option<Blob>,
        kind: MediaKind,
    ) {
        // The block slot owns its own reference to the bytes.
        let asset_id = media.and_then(|blob| match self.store.save(blob) {
            Ok(key) => Some(key),
            Err(err) => {
                tracing::warn!(%err, "could not store last result for block");
                None
            }
        });
        let previous = self
            .registry
            .get(block)
            .map(|b| Holdings::of_slot(&b.data.last_generated))
            .unwrap_or_default();

        let slot = MediaSlot {
            handle: display.to_string(),
            asset_id,
            file_id: None,
            kind,
        };
        let now = self.now();
        self.registry.update_data(
            block,
            BlockDataPatch {
                last_generated: Some(slot),
                ..BlockDataPatch::default()
            },
            now,
        );
        // The new key was counted by `save` above.
        self.rebalance(previous, &Holdings::default());
    }
}

#[cfg(test)]
#[path = "../../tests/unit/editor/generation.rs"]
mod tests;
