use crate::canvas::block::{BlockData, CreationType};
use crate::foundation::error::{CanvasError, CanvasResult};

/// Check that `data` has the inputs its job type needs before anything is submitted.
pub fn validate_block_data(data: &BlockData) -> CanvasResult<()> {
    let has_prompt = !data.prompt.trim().is_empty();
    let main = data.main.has_media();
    let style = data.style.has_media();

    match data.creation_type {
        CreationType::Mimic => {
            if !main || data.main.file_id.is_none() {
                return Err(CanvasError::validation(
                    "mimic requires a stored motion video in the main slot",
                ));
            }
            if !style {
                return Err(CanvasError::validation("mimic requires an avatar in the style slot"));
            }
        }
        CreationType::ImageToVideo => {
            if !main {
                return Err(CanvasError::validation(
                    "image-to-video requires a base image in the main slot",
                ));
            }
        }
        CreationType::FaceToVideo => {
            if !main {
                return Err(CanvasError::validation(
                    "face-to-video requires a face in the main slot",
                ));
            }
            if !has_prompt {
                return Err(CanvasError::validation("face-to-video requires a prompt"));
            }
        }
        CreationType::CreativeModel => {
            if !main {
                return Err(CanvasError::validation(
                    "creative model requires a subject in the main slot",
                ));
            }
            if !style {
                return Err(CanvasError::validation(
                    "creative model requires a model image in the style slot",
                ));
            }
        }
        CreationType::ProfessionalPhoto => {
            if !main {
                return Err(CanvasError::validation(
                    "professional photo requires a subject in the main slot",
                ));
            }
        }
        CreationType::Image
        | CreationType::Avatar
        | CreationType::Video
        | CreationType::Carousel => {
            if !has_prompt && !main && !style && !data.reference.has_media() {
                return Err(CanvasError::validation(
                    "a prompt or at least one reference is required",
                ));
            }
        }
    }
    Ok(())
}
