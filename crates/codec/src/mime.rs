//! Content-type helpers.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Content type served for unknown extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// 16 base64 characters decode to 12 bytes, enough for every signature below.
const SNIFF_CHARS: usize = 16;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Look up the content type for a file by its extension (case-insensitive).
pub fn content_type_for_path(path: impl AsRef<Path>) -> &'static str {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        _ => OCTET_STREAM,
    }
}

/// Recognise an image format from the first bytes it decodes to.
///
/// Accepts standard or URL-safe base64 with or without padding. Only picks a
/// media type for the rebuilt data URI; decoding of the full payload happens
/// elsewhere.
pub fn sniff_image_mime(token: &str) -> Option<&'static str> {
    let head: String = token
        .chars()
        .take(SNIFF_CHARS)
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    if !head.is_ascii() {
        return None;
    }
    let whole_quads = head.len() - head.len() % 4;
    if whole_quads == 0 {
        return None;
    }
    let bytes = STANDARD.decode(&head[..whole_quads]).ok()?;
    sniff_image_bytes(&bytes)
}

/// Signature check on raw bytes.
pub fn sniff_image_bytes(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(PNG_SIGNATURE) {
        Some("image/png")
    } else if bytes.starts_with(JPEG_SIGNATURE) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}
