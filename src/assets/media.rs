use base64::Engine as _;

use crate::foundation::error::{CanvasError, CanvasResult};

/// Scheme prefix of inline media.
pub const DATA_SCHEME: &str = "data:";
/// Scheme prefix of ephemeral display handles.
pub const BLOB_SCHEME: &str = "blob:";

/// MIME type assumed when a `data:` URI omits one.
pub const DEFAULT_MIME: &str = "image/png";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
/// Kind of media held by a slot.
pub enum MediaKind {
    /// Still image.
    #[default]
    Image,
    /// Video clip.
    Video,
}

impl MediaKind {
    /// Infer the kind from a MIME type; anything that is not `video/*` counts as an image.
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("video/") {
            Self::Video
        } else {
            Self::Image
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Classification of a media reference string.
pub enum MediaRef<'a> {
    /// No media.
    Empty,
    /// Inline `data:` URI.
    DataUri(&'a str),
    /// Ephemeral `blob:` display handle.
    Blob(&'a str),
    /// Anything else, typically a durable remote URL.
    Remote(&'a str),
}

impl<'a> MediaRef<'a> {
    /// Classify `raw`.
    pub fn classify(raw: &'a str) -> Self {
        if raw.is_empty() {
            Self::Empty
        } else if raw.starts_with(DATA_SCHEME) {
            Self::DataUri(raw)
        } else if raw.starts_with(BLOB_SCHEME) {
            Self::Blob(raw)
        } else {
            Self::Remote(raw)
        }
    }

    /// `true` for inline data and ephemeral handles, the two forms that must be dehydrated.
    pub fn is_ephemeral(self) -> bool {
        matches!(self, Self::DataUri(_) | Self::Blob(_))
    }

    /// `true` for a `blob:` handle.
    pub fn is_live_handle(self) -> bool {
        matches!(self, Self::Blob(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Payload of a decoded `data:` URI.
pub struct DecodedDataUri {
    /// Declared MIME type, or [`DEFAULT_MIME`].
    pub mime_type: String,
    /// Raw bytes.
    pub bytes: Vec<u8>,
}

/// Decode a `data:[<mime>][;base64],<payload>` URI.
///
/// Non-base64 payloads are taken verbatim.
pub fn decode_data_uri(uri: &str) -> CanvasResult<DecodedDataUri> {
    let rest = uri
        .strip_prefix(DATA_SCHEME)
        .ok_or_else(|| CanvasError::media("not a data: URI"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| CanvasError::media("data: URI without payload separator"))?;

    let mut params = header.split(';');
    let mime = params.next().unwrap_or_default().trim();
    let is_base64 = params.any(|p| p.eq_ignore_ascii_case("base64"));

    let bytes = if is_base64 {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| CanvasError::media(format!("invalid base64 payload: {e}")))?
    } else {
        payload.as_bytes().to_vec()
    };

    Ok(DecodedDataUri {
        mime_type: if mime.is_empty() {
            DEFAULT_MIME.to_string()
        } else {
            mime.to_string()
        },
        bytes,
    })
}

/// Encode bytes as a base64 `data:` URI.
pub fn encode_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{mime_type};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// MIME type declared in a `data:` URI header, if any.
pub fn data_uri_mime(uri: &str) -> Option<&str> {
    let rest = uri.strip_prefix(DATA_SCHEME)?;
    let end = rest.find([';', ','])?;
    let mime = &rest[..end];
    (!mime.is_empty()).then_some(mime)
}

/// File extension for a MIME type.
///
/// Unknown image subtypes map to `jpg`, unknown video subtypes to `mp4`; other types yield `None`.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    if mime.starts_with("image/") {
        Some(if mime.contains("png") {
            "png"
        } else if mime.contains("jpeg") || mime.contains("jpg") {
            "jpg"
        } else if mime.contains("gif") {
            "gif"
        } else if mime.contains("webp") {
            "webp"
        } else {
            "jpg"
        })
    } else if mime.starts_with("video/") {
        Some(if mime.contains("mp4") {
            "mp4"
        } else if mime.contains("webm") {
            "webm"
        } else if mime.contains("quicktime") {
            "mov"
        } else {
            "mp4"
        })
    } else {
        None
    }
}

/// File extension used when uploading a media reference.
///
/// `data:` URIs are mapped through their declared MIME type; handles and URLs carry no type
/// information and fall back to `default_ext`. An empty reference yields `bin`.
pub fn extension_for_reference<'a>(reference: &str, default_ext: &'a str) -> &'a str {
    if reference.is_empty() {
        return "bin";
    }
    data_uri_mime(reference)
        .and_then(extension_for_mime)
        .unwrap_or(default_ext)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/media.rs"]
mod tests;
