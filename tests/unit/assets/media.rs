use super::*;

#[test]
fn classify_recognizes_all_forms() {
    assert_eq!(MediaRef::classify(""), MediaRef::Empty);
    assert!(matches!(
        MediaRef::classify("data:image/png;base64,AA=="),
        MediaRef::DataUri(_)
    ));
    assert!(MediaRef::classify("blob:creativeflow/abc").is_live_handle());
    assert!(MediaRef::classify("blob:creativeflow/abc").is_ephemeral());
    let remote = MediaRef::classify("https://cdn.example.com/a.png");
    assert_eq!(remote, MediaRef::Remote("https://cdn.example.com/a.png"));
    assert!(!remote.is_ephemeral());
}

#[test]
fn decode_base64_data_uri() {
    let uri = encode_data_uri("image/webp", b"\x00\x01hello");
    let d = decode_data_uri(&uri).unwrap();
    assert_eq!(d.mime_type, "image/webp");
    assert_eq!(d.bytes, b"\x00\x01hello");
}

#[test]
fn decode_plain_payload_and_default_mime() {
    let d = decode_data_uri("data:,hi%20there").unwrap();
    assert_eq!(d.mime_type, DEFAULT_MIME);
    assert_eq!(d.bytes, b"hi%20there");
}

#[test]
fn decode_rejects_malformed_input() {
    assert!(decode_data_uri("https://x").is_err());
    assert!(decode_data_uri("data:image/png;base64").is_err());
    let err = decode_data_uri("data:image/png;base64,@@@").unwrap_err();
    assert!(err.to_string().starts_with("media error:"));
}

#[test]
fn mime_extension_mapping() {
    assert_eq!(extension_for_mime("image/png"), Some("png"));
    assert_eq!(extension_for_mime("image/jpeg"), Some("jpg"));
    assert_eq!(extension_for_mime("image/gif"), Some("gif"));
    assert_eq!(extension_for_mime("image/webp"), Some("webp"));
    assert_eq!(extension_for_mime("image/tiff"), Some("jpg"));
    assert_eq!(extension_for_mime("video/webm"), Some("webm"));
    assert_eq!(extension_for_mime("video/quicktime"), Some("mov"));
    assert_eq!(extension_for_mime("video/x-matroska"), Some("mp4"));
    assert_eq!(extension_for_mime("application/pdf"), None);
}

#[test]
fn reference_extension_falls_back_to_context_default() {
    assert_eq!(extension_for_reference("", "jpg"), "bin");
    assert_eq!(extension_for_reference("data:video/mp4;base64,AA==", "jpg"), "mp4");
    assert_eq!(extension_for_reference("blob:creativeflow/1", "mp4"), "mp4");
    assert_eq!(extension_for_reference("data:text/plain,hi", "jpg"), "jpg");
}

#[test]
fn media_kind_from_mime() {
    assert_eq!(MediaKind::from_mime("video/mp4"), MediaKind::Video);
    assert_eq!(MediaKind::from_mime("image/png"), MediaKind::Image);
    assert_eq!(
        serde_json::to_string(&MediaKind::Video).unwrap(),
        "\"video\""
    );
}
