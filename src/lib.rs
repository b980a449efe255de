//! Creativeflow is the state engine of an infinite-canvas creative editor.
//!
//! It owns everything between raw pointer input and persisted browser-style storage, and leaves
//! rendering and networking to the host:
//!
//! - Pan/zoom a [`ViewportTransform`] and drive gestures through a [`PointerMachine`]
//! - Keep generation [`Block`]s and [`ResultItem`]s, with auto-placement and virtualization
//! - Submit jobs through a host-provided [`GenerationService`]
//! - Persist state with media moved out into an [`AssetStore`] and keys left behind
//!
//! The [`Editor`] ties these together and is the only place state is mutated.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub(crate) mod assets;
pub(crate) mod canvas;
pub(crate) mod editor;
pub(crate) mod foundation;
pub(crate) mod generation;
pub(crate) mod input;
pub(crate) mod persist;
pub(crate) mod recovery;
pub(crate) mod viewport;

pub use crate::foundation::config::EditorConfig;
pub use crate::foundation::core::{
    Clock, ManualClock, Point, Rect, Size, SystemClock, Timestamp, Vec2, finite_or,
    is_finite_point, is_finite_vec,
};
pub use crate::foundation::error::{CanvasError, CanvasResult, StorageError};
pub use crate::foundation::ids::{BlockId, ExtraRefId, FolderId, ItemId};

pub use crate::assets::dir_store::DirAssetStore;
pub use crate::assets::media::{
    BLOB_SCHEME, DATA_SCHEME, DEFAULT_MIME, DecodedDataUri, MediaKind, MediaRef, data_uri_mime,
    decode_data_uri, encode_data_uri, extension_for_mime, extension_for_reference,
};
pub use crate::assets::store::{
    AssetEntry, AssetKey, AssetStats, AssetStore, Blob, DisplayHandle, MemoryAssetStore,
    fetch_ephemeral,
};

pub use crate::viewport::transform::{MAX_SCALE, MIN_SCALE, ViewportTransform, ZOOM_FACTOR, ZoomLimits};

pub use crate::input::pointer::{
    EntityRef, GestureState, HitTarget, InteractionEffect, PointerButton, PointerEvent, PointerId,
    PointerMachine,
};

pub use crate::canvas::block::{
    AspectRatio, Block, BlockData, BlockDataPatch, CreationType, ExtraReference, ImageFormat,
    MediaSlot, Quality, ReferenceRole, VideoDuration, VideoResolution,
};
pub use crate::canvas::items::{ItemCollection, ResultItem};
pub use crate::canvas::layers::{LayerPanel, filter_layers, layer_panel};
pub use crate::canvas::placement::{Placement, PlacementRules, place_dropped, place_result};
pub use crate::canvas::registry::{
    BlockLayout, BlockRegistry, ExtraReferencePatch, LibraryInsertMode, library_block_data,
};
pub use crate::canvas::visibility::{VisibilityRules, visible_blocks};

pub use crate::generation::request::{ANONYMOUS_USER, ExtraRefPayload, GenerationRequest};
pub use crate::generation::service::{GenerationOutput, GenerationService, parse_webhook_response};
pub use crate::generation::tracker::{GenerationTracker, JobState, JobTicket};
pub use crate::generation::validate::validate_block_data;

pub use crate::persist::debounce::SaveDebouncer;
pub use crate::persist::hydrate::{
    PassReport, dehydrate_all, dehydrate_blocks, dehydrate_item, dehydrate_items, dehydrate_slot,
    hydrate_all, hydrate_blocks, hydrate_items,
};
pub use crate::persist::kv::{DirKv, KeyValueStore, MemoryKv};
pub use crate::persist::snapshot::{
    DEFAULT_CREDITS, Folder, Preset, Purchase, Retention, SLOT_PREFIX, SaveOutcome, Slot, Snapshot,
    Theme, UserProfile, clear_for_hard_reset, load_snapshot, save_snapshot,
};

pub use crate::editor::{
    CompletedGeneration, Editor, LibraryEntry, PendingGeneration, Session, UploadedFile,
};
pub use crate::recovery::CrashReport;
