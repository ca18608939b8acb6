//! Upload payloads

use axum_test::multipart::{MultipartForm, Part};
use bytes::Bytes;

/// 8-byte PNG signature followed by filler; the pipeline never decodes images.
pub fn png_bytes() -> Vec<u8> {
    let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&[0u8; 56]);
    data
}

pub fn jpeg_bytes() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.extend_from_slice(&[0u8; 60]);
    data
}

/// `ftyp` box of an MP4 file plus filler.
pub fn mp4_bytes() -> Vec<u8> {
    let mut data = vec![0x00, 0x00, 0x00, 0x18];
    data.extend_from_slice(b"ftypmp42");
    data.extend_from_slice(&[0u8; 500]);
    data
}

pub fn form(field: &str, data: Vec<u8>, file_name: &str, mime_type: &str) -> MultipartForm {
    let part = Part::bytes(Bytes::from(data))
        .file_name(file_name.to_string())
        .mime_type(mime_type.to_string());
    MultipartForm::new().add_part(field.to_string(), part)
}

pub fn thumbnail_form(data: Vec<u8>, mime_type: &str) -> MultipartForm {
    form("thumbnail", data, "thumbnail", mime_type)
}

pub fn video_form(data: Vec<u8>, mime_type: &str) -> MultipartForm {
    form("video", data, "boots.mp4", mime_type)
}

pub const RAW_BOUNDARY: &str = "tubely-boundary";

/// Multipart body whose single file part carries no Content-Type header.
pub fn untyped_part_body(field: &str, data: &[u8]) -> Bytes {
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"upload.bin\"\r\n\r\n",
        b = RAW_BOUNDARY,
        f = field
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", RAW_BOUNDARY).as_bytes());
    Bytes::from(body)
}

pub fn raw_multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", RAW_BOUNDARY)
}
