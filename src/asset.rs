//! Turning raw entry bytes into something a renderer can show.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Sniffed when nothing more specific matches.
pub const OCTET_STREAM: &str = "application/octet-stream";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Leading-byte signatures, checked in order.
const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"BM", "image/bmp"),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"II*\x00", "image/tiff"),
    (b"MM\x00*", "image/tiff"),
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b\x08", "application/x-gzip"),
];

/// Guess the MIME type of `data` from its first bytes.
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return "image/webp";
    }
    if let Some((_, mime)) = SIGNATURES.iter().find(|(sig, _)| data.starts_with(sig)) {
        return *mime;
    }

    // Only the first 512 bytes are looked at, so a multi-byte character cut
    // at the boundary still counts as text.
    let head = &data[..data.len().min(512)];
    let text = match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none() && head.len() == 512,
    };
    let binary = head
        .iter()
        .any(|&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c | 0x1b));
    if text && !binary {
        return TEXT_PLAIN;
    }

    OCTET_STREAM
}

/// Build an embeddable `data:` URI.
pub fn data_url(mime: &str, data: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(data))
}

/// A decoded entry ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayAsset {
    pub name: String,
    pub mime: &'static str,
    pub size: usize,
    pub data_url: String,
}

impl DisplayAsset {
    pub fn from_bytes(name: impl Into<String>, data: &[u8]) -> Self {
        let mime = sniff_content_type(data);
        Self {
            name: name.into(),
            mime,
            size: data.len(),
            data_url: data_url(mime, data),
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}
