use super::*;
use crate::assets::media::MediaKind;
use crate::canvas::block::ExtraReference;

#[test]
fn image_payload_uses_webhook_keys() {
    let mut data = BlockData {
        prompt: "red sneaker".into(),
        aspect_ratio: AspectRatio::Portrait,
        quality: Quality::K2,
        format: Some(ImageFormat::Png),
        main: MediaSlot::from_handle("https://cdn/main.png", MediaKind::Image),
        reference: MediaSlot::from_handle("https://cdn/ref.png", MediaKind::Image),
        reference_role: Some(ReferenceRole::Composition),
        duration: Some(VideoDuration::Sec5),
        ..BlockData::default()
    };
    data.extra_refs.push(ExtraReference::new(
        MediaSlot::from_handle("https://cdn/logo.png", MediaKind::Image),
        ReferenceRole::Logo,
        Timestamp(1),
    ));
    data.extra_refs.push(ExtraReference::new(
        MediaSlot::default(),
        ReferenceRole::Free,
        Timestamp(1),
    ));

    let req = GenerationRequest::from_block(&data, Some("user-7"), Timestamp(1_700_000_000_000));
    let json: serde_json::Value = serde_json::from_str(&req.to_payload_json().unwrap()).unwrap();

    assert_eq!(json["type"], "IMAGE");
    assert_eq!(json["prompt"], "red sneaker");
    assert_eq!(json["aspectRatio"], "9:16");
    assert_eq!(json["quality"], "2K");
    assert_eq!(json["format"], "PNG");
    assert_eq!(json["mainPreview"], "https://cdn/main.png");
    assert_eq!(json["referencePreview"], "https://cdn/ref.png");
    assert_eq!(json["referenceRole"], "composition");
    assert!(json.get("stylePreview").is_none());
    assert!(json.get("duration").is_none());
    assert_eq!(json["extraRefs"].as_array().unwrap().len(), 1);
    assert_eq!(json["extraRefs"][0]["role"], "logo");
    assert_eq!(json["userId"], "user-7");
    assert_eq!(json["timestamp"], "2023-11-14T22:13:20.000Z");
}

#[test]
fn video_payload_carries_duration_and_originals() {
    let data = BlockData {
        creation_type: CreationType::Mimic,
        duration: Some(VideoDuration::Sec10),
        video_resolution: Some(VideoResolution::P720),
        format: Some(ImageFormat::Jpg),
        main: MediaSlot {
            handle: "blob:creativeflow/1".into(),
            file_id: Some(AssetKey::from("asset_vid")),
            kind: MediaKind::Video,
            ..MediaSlot::default()
        },
        style: MediaSlot::from_handle("https://cdn/avatar.png", MediaKind::Image),
        ..BlockData::default()
    };
    let req = GenerationRequest::from_block(&data, None, Timestamp(0));
    assert_eq!(req.user_id, ANONYMOUS_USER);
    assert_eq!(req.quality, None);
    assert_eq!(req.format, None);
    assert_eq!(req.duration, Some(VideoDuration::Sec10));
    assert_eq!(req.main_id, Some(AssetKey::from("asset_vid")));

    let json: serde_json::Value = serde_json::to_value(&req).unwrap();
    assert_eq!(json["duration"], "10");
    assert_eq!(json["videoResolution"], "720p");
    assert_eq!(json["mainId"], "asset_vid");
}

#[test]
fn media_refs_can_be_rewritten_in_place() {
    let data = BlockData {
        main: MediaSlot::from_handle("data:image/png;base64,AA==", MediaKind::Image),
        style: MediaSlot::from_handle("blob:x", MediaKind::Image),
        ..BlockData::default()
    };
    let mut req = GenerationRequest::from_block(&data, Some(""), Timestamp(0));
    assert_eq!(req.user_id, ANONYMOUS_USER);
    for r in req.media_refs_mut() {
        *r = format!("https://uploads/{}", r.len());
    }
    assert_eq!(req.main_preview.as_deref(), Some("https://uploads/26"));
    assert_eq!(req.style_preview.as_deref(), Some("https://uploads/6"));
}
