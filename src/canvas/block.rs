use crate::assets::media::{MediaKind, MediaRef};
use crate::assets::store::AssetKey;
use crate::foundation::core::{Point, Timestamp};
use crate::foundation::ids::{BlockId, ExtraRefId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Generation job type.
pub enum CreationType {
    /// Still image from prompt and optional references.
    #[default]
    Image,
    /// Avatar image.
    Avatar,
    /// Text-to-video.
    Video,
    /// Animate a still image.
    ImageToVideo,
    /// Talking-face video.
    FaceToVideo,
    /// Transfer motion from a source video onto an avatar.
    Mimic,
    /// Multi-slide carousel.
    Carousel,
    /// Restyle a subject after a model image.
    CreativeModel,
    /// Studio-style photo of a subject.
    ProfessionalPhoto,
}

impl CreationType {
    /// `true` for job types that produce video.
    pub fn is_video(self) -> bool {
        matches!(
            self,
            Self::Video | Self::ImageToVideo | Self::FaceToVideo | Self::Mimic
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
/// Output aspect ratio.
pub enum AspectRatio {
    /// 1:1
    #[default]
    #[serde(rename = "1:1")]
    Square,
    /// 16:9
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16
    #[serde(rename = "9:16")]
    Portrait,
    /// 2:3
    #[serde(rename = "2:3")]
    R2x3,
    /// 3:2
    #[serde(rename = "3:2")]
    R3x2,
    /// 3:4
    #[serde(rename = "3:4")]
    R3x4,
    /// 4:3
    #[serde(rename = "4:3")]
    R4x3,
    /// 4:5
    #[serde(rename = "4:5")]
    R4x5,
    /// 5:4
    #[serde(rename = "5:4")]
    R5x4,
    /// 21:9
    #[serde(rename = "21:9")]
    R21x9,
    /// Chosen by the backend.
    #[serde(rename = "Auto")]
    Auto,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
/// Output resolution tier.
pub enum Quality {
    /// ~1K pixels on the long edge.
    #[default]
    #[serde(rename = "1K")]
    K1,
    /// ~2K.
    #[serde(rename = "2K")]
    K2,
    /// ~4K.
    #[serde(rename = "4K")]
    K4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
/// Still-image container format.
pub enum ImageFormat {
    /// PNG.
    Png,
    /// JPEG.
    Jpg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
/// Video length.
pub enum VideoDuration {
    /// 5 seconds.
    #[serde(rename = "5")]
    Sec5,
    /// 10 seconds.
    #[serde(rename = "10")]
    Sec10,
    /// 15 seconds.
    #[serde(rename = "15")]
    Sec15,
    /// 20 seconds.
    #[serde(rename = "20")]
    Sec20,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
/// Video resolution.
pub enum VideoResolution {
    /// 1280x720.
    #[serde(rename = "720p")]
    P720,
    /// 1920x1080.
    #[serde(rename = "1080p")]
    P1080,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// What a reference image contributes to the generation.
pub enum ReferenceRole {
    /// Unspecified.
    #[default]
    Free,
    /// Visual style.
    Style,
    /// Color palette.
    Palette,
    /// Background or scenery.
    Background,
    /// Composition or layout.
    Composition,
    /// Product or object.
    Product,
    /// Logo or brand mark.
    Logo,
    /// Text or typography.
    Text,
    /// Example ad.
    Example,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
/// One media slot of a block.
///
/// `handle` is what the UI displays (data URI, `blob:` handle or remote URL); `asset_id` is the
/// durable Asset Store key. After dehydration at most one of the two is set.
pub struct MediaSlot {
    /// Display handle; empty when absent.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub handle: String,
    /// Durable key of the displayed bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<AssetKey>,
    /// Key of the original uploaded file (kept for video sources).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<AssetKey>,
    /// Image or video.
    pub kind: MediaKind,
}

impl MediaSlot {
    /// Slot showing `handle`.
    pub fn from_handle(handle: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            handle: handle.into(),
            kind,
            ..Self::default()
        }
    }

    /// `true` when the slot holds neither a handle nor a key.
    pub fn is_empty(&self) -> bool {
        self.handle.is_empty() && self.asset_id.is_none()
    }

    /// `true` when something can be shown or sent.
    pub fn has_media(&self) -> bool {
        !self.is_empty()
    }

    /// `true` when the handle is inline or ephemeral and no durable key exists yet.
    pub fn needs_dehydration(&self) -> bool {
        self.asset_id.is_none() && MediaRef::classify(&self.handle).is_ephemeral()
    }

    /// `true` when the slot has a key but no live `blob:` handle.
    pub fn needs_hydration(&self) -> bool {
        self.asset_id.is_some() && !MediaRef::classify(&self.handle).is_live_handle()
    }

    /// At most one of handle/key is populated.
    pub fn is_at_rest(&self) -> bool {
        self.handle.is_empty() || self.asset_id.is_none()
    }

    /// Keys owned by this slot.
    pub fn owned_keys(&self) -> impl Iterator<Item = &AssetKey> {
        self.asset_id.iter().chain(self.file_id.iter())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Additional reference image with a role and a free-form note.
pub struct ExtraReference {
    /// Slot id.
    pub id: ExtraRefId,
    /// Media.
    #[serde(default)]
    pub media: MediaSlot,
    /// Role tag.
    #[serde(default)]
    pub role: ReferenceRole,
    /// User note.
    #[serde(default)]
    pub note: String,
    /// Creation time.
    #[serde(default)]
    pub created_at: Timestamp,
}

impl ExtraReference {
    /// New slot holding `media`.
    pub fn new(media: MediaSlot, role: ReferenceRole, created_at: Timestamp) -> Self {
        Self {
            id: ExtraRefId::generate(),
            media,
            role,
            note: String::new(),
            created_at,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
/// Generation parameters of a block.
pub struct BlockData {
    /// Job type.
    #[serde(rename = "type")]
    pub creation_type: CreationType,
    /// Prompt text.
    pub prompt: String,
    /// Output aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Output quality tier.
    pub quality: Quality,
    /// Still-image container, when forced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ImageFormat>,
    /// Video length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<VideoDuration>,
    /// Video resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_resolution: Option<VideoResolution>,
    /// Primary slot (subject, motion source or face).
    pub main: MediaSlot,
    /// Style or avatar slot.
    pub style: MediaSlot,
    /// Reference slot.
    pub reference: MediaSlot,
    /// Role of the reference slot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_role: Option<ReferenceRole>,
    /// Most recent result of this block.
    pub last_generated: MediaSlot,
    /// Extra reference slots.
    pub extra_refs: Vec<ExtraReference>,
    /// Bumped when the prompt is replaced from outside the block (template insertion).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_prompt_update: Option<Timestamp>,
}

impl BlockData {
    /// Every media slot, extra references included.
    pub fn all_slots(&self) -> impl Iterator<Item = &MediaSlot> {
        [&self.main, &self.style, &self.reference, &self.last_generated]
            .into_iter()
            .chain(self.extra_refs.iter().map(|r| &r.media))
    }

    /// Mutable variant of [`BlockData::all_slots`].
    pub fn all_slots_mut(&mut self) -> impl Iterator<Item = &mut MediaSlot> {
        [
            &mut self.main,
            &mut self.style,
            &mut self.reference,
            &mut self.last_generated,
        ]
        .into_iter()
        .chain(self.extra_refs.iter_mut().map(|r| &mut r.media))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
/// Shallow partial update of [`BlockData`]; `None` leaves a field untouched.
///
/// Fields that are themselves optional take `Some(None)` to clear them.
pub struct BlockDataPatch {
    /// Job type.
    pub creation_type: Option<CreationType>,
    /// Prompt text.
    pub prompt: Option<String>,
    /// Aspect ratio.
    pub aspect_ratio: Option<AspectRatio>,
    /// Quality tier.
    pub quality: Option<Quality>,
    /// Image format.
    pub format: Option<Option<ImageFormat>>,
    /// Video length.
    pub duration: Option<Option<VideoDuration>>,
    /// Video resolution.
    pub video_resolution: Option<Option<VideoResolution>>,
    /// Primary slot.
    pub main: Option<MediaSlot>,
    /// Style slot.
    pub style: Option<MediaSlot>,
    /// Reference slot.
    pub reference: Option<MediaSlot>,
    /// Reference role.
    pub reference_role: Option<Option<ReferenceRole>>,
    /// Last generated result.
    pub last_generated: Option<MediaSlot>,
    /// Extra references, replaced wholesale.
    pub extra_refs: Option<Vec<ExtraReference>>,
    /// Prompt-update marker.
    pub last_prompt_update: Option<Option<Timestamp>>,
}

impl BlockDataPatch {
    /// Merge into `data`.
    pub fn apply(self, data: &mut BlockData) {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = self.$field {
                    data.$field = v;
                })*
            };
        }
        merge!(
            creation_type,
            prompt,
            aspect_ratio,
            quality,
            format,
            duration,
            video_resolution,
            main,
            style,
            reference,
            reference_role,
            last_generated,
            extra_refs,
            last_prompt_update,
        );
    }

    /// `true` when nothing would change.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Generation block placed on the canvas.
pub struct Block {
    /// Stable id.
    pub id: BlockId,
    /// Display name.
    pub name: String,
    /// World position.
    #[serde(default)]
    pub position: Point,
    /// Generation parameters.
    #[serde(default)]
    pub data: BlockData,
    /// Creation time.
    #[serde(default)]
    pub created_at: Timestamp,
    /// Last data change.
    #[serde(default)]
    pub updated_at: Timestamp,
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/block.rs"]
mod tests;
