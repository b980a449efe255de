use crate::foundation::error::{CanvasError, CanvasResult};
use crate::generation::request::GenerationRequest;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Result of a successful job.
pub struct GenerationOutput {
    /// Durable media URL.
    pub url: String,
}

/// External generation backend.
///
/// Implementations own upload, transport, retry and backoff. `on_retry` is called with the
/// 1-based attempt number before each retry so the UI can show progress.
pub trait GenerationService {
    /// Submit one job and wait for its media URL.
    fn submit(
        &mut self,
        request: &GenerationRequest,
        on_retry: &mut dyn FnMut(u32),
    ) -> CanvasResult<GenerationOutput>;
}

const URL_FIELDS: [&str; 5] = ["url", "imageUrl", "image_url", "videoUrl", "video_url"];

/// Extract the media URL from a webhook response body: the first non-empty string among
/// `url`, `imageUrl`, `image_url`, `videoUrl`, `video_url`.
pub fn parse_webhook_response(body: &str) -> CanvasResult<GenerationOutput> {
    if body.trim().is_empty() {
        return Err(CanvasError::generation("webhook returned an empty body"));
    }
    let value: serde_json::Value = serde_json::from_str(body)?;
    URL_FIELDS
        .iter()
        .filter_map(|k| value.get(k).and_then(|v| v.as_str()))
        .find(|s| !s.is_empty())
        .map(|url| GenerationOutput {
            url: url.to_string(),
        })
        .ok_or_else(|| CanvasError::generation("webhook response carries no media url"))
}
