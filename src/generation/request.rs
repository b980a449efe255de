use crate::assets::store::AssetKey;
use crate::canvas::block::{
    AspectRatio, BlockData, CreationType, ImageFormat, MediaSlot, Quality, ReferenceRole,
    VideoDuration, VideoResolution,
};
use crate::foundation::core::Timestamp;
use crate::foundation::error::CanvasResult;
use crate::foundation::ids::ExtraRefId;

/// Session id sent when no user is signed in.
pub const ANONYMOUS_USER: &str = "anonymous";

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Extra reference as sent to the backend.
pub struct ExtraRefPayload {
    /// Slot id.
    pub id: ExtraRefId,
    /// Media reference (durable URL after upload).
    pub preview: String,
    /// Role tag.
    pub role: ReferenceRole,
    /// User note.
    pub note: String,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Generation job submission, serialized as the webhook JSON payload.
pub struct GenerationRequest {
    /// Job type.
    #[serde(rename = "type")]
    pub creation_type: CreationType,
    /// Prompt text.
    pub prompt: String,
    /// Aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Quality tier (still images).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<Quality>,
    /// Forced container (still images).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ImageFormat>,
    /// Length (video).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<VideoDuration>,
    /// Resolution (video).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_resolution: Option<VideoResolution>,
    /// Primary reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_preview: Option<String>,
    /// Stored original of the primary reference (video).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_id: Option<AssetKey>,
    /// Style reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_preview: Option<String>,
    /// Stored original of the style reference (video).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_id: Option<AssetKey>,
    /// Composition reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_preview: Option<String>,
    /// Role of the composition reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_role: Option<ReferenceRole>,
    /// Extra references.
    pub extra_refs: Vec<ExtraRefPayload>,
    /// Caller/session id.
    pub user_id: String,
    /// Submission time, RFC 3339.
    pub timestamp: String,
}

fn preview(slot: &MediaSlot) -> Option<String> {
    (!slot.handle.is_empty()).then(|| slot.handle.clone())
}

impl GenerationRequest {
    /// Build a request from block data.
    ///
    /// Media references are copied as-is; uploading inline media to durable URLs is the
    /// service's job. Still-image jobs carry quality/format/reference fields, video jobs carry
    /// duration/resolution and the stored originals.
    pub fn from_block(data: &BlockData, user_id: Option<&str>, now: Timestamp) -> Self {
        let video = data.creation_type.is_video();
        let timestamp = chrono::DateTime::from_timestamp_millis(now.as_millis())
            .unwrap_or_default()
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        Self {
            creation_type: data.creation_type,
            prompt: data.prompt.clone(),
            aspect_ratio: data.aspect_ratio,
            quality: (!video).then_some(data.quality),
            format: if video { None } else { data.format },
            duration: if video { data.duration } else { None },
            video_resolution: if video { data.video_resolution } else { None },
            main_preview: preview(&data.main),
            main_id: if video { data.main.file_id.clone() } else { None },
            style_preview: preview(&data.style),
            style_id: if video { data.style.file_id.clone() } else { None },
            reference_preview: if video { None } else { preview(&data.reference) },
            reference_role: if video { None } else { data.reference_role },
            extra_refs: data
                .extra_refs
                .iter()
                .filter(|r| !r.media.handle.is_empty())
                .map(|r| ExtraRefPayload {
                    id: r.id.clone(),
                    preview: r.media.handle.clone(),
                    role: r.role,
                    note: r.note.clone(),
                })
                .collect(),
            user_id: user_id
                .filter(|u| !u.is_empty())
                .unwrap_or(ANONYMOUS_USER)
                .to_string(),
            timestamp,
        }
    }

    /// Every media reference carried by the request, for upload passes.
    pub fn media_refs_mut(&mut self) -> impl Iterator<Item = &mut String> {
        self.main_preview
            .iter_mut()
            .chain(self.style_preview.iter_mut())
            .chain(self.reference_preview.iter_mut())
            .chain(self.extra_refs.iter_mut().map(|r| &mut r.preview))
    }

    /// Webhook JSON body.
    pub fn to_payload_json(&self) -> CanvasResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/generation/request.rs"]
mod tests;
