//! Content type detection from leading bytes, with a name-based fallback.

/// How many leading bytes are inspected.
pub const SNIFF_LEN: usize = 512;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Signatures checked in order. The first match wins.
const SIGNATURES: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"BM", "image/bmp"),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b\x08", "application/x-gzip"),
    (b"Rar!\x1a\x07", "application/x-rar-compressed"),
    (b"7z\xbc\xaf\x27\x1c", "application/x-7z-compressed"),
    (b"OggS\x00", "application/ogg"),
    (b"ID3", "audio/mpeg"),
    (b"fLaC", "audio/flac"),
    (b"\x1aE\xdf\xa3", "video/webm"),
    (b"wOFF", "font/woff"),
    (b"wOF2", "font/woff2"),
    (b"\x00asm", "application/wasm"),
    (b"%!PS-Adobe-", "application/postscript"),
];

/// Append bytes from `chunk` to `head` until it holds [`SNIFF_LEN`] bytes.
pub fn fill_head(head: &mut Vec<u8>, chunk: &[u8]) {
    let room = SNIFF_LEN.saturating_sub(head.len());
    head.extend_from_slice(&chunk[..room.min(chunk.len())]);
}

/// Identify `head` by its leading bytes. `None` means the content looked
/// like arbitrary binary.
pub fn sniff(head: &[u8]) -> Option<&'static str> {
    let head = &head[..head.len().min(SNIFF_LEN)];

    if let Some((_, mime)) = SIGNATURES.iter().find(|(sig, _)| head.starts_with(sig)) {
        return Some(mime);
    }
    if head.len() >= 12 && &head[..4] == b"RIFF" {
        match &head[8..12] {
            b"WEBP" => return Some("image/webp"),
            b"WAVE" => return Some("audio/wave"),
            b"AVI " => return Some("video/avi"),
            _ => {}
        }
    }
    if head.len() >= 12 && &head[4..8] == b"ftyp" {
        return Some("video/mp4");
    }

    let trimmed = trim_leading_whitespace(head);
    if starts_with_ignore_case(trimmed, b"<!doctype html") || starts_with_ignore_case(trimmed, b"<html")
    {
        return Some("text/html; charset=utf-8");
    }
    if trimmed.starts_with(b"<?xml") {
        return Some("text/xml; charset=utf-8");
    }

    if looks_like_text(head) {
        return Some(TEXT_PLAIN);
    }
    None
}

/// Final content type for a stored file.
///
/// Recognized signatures win. Plain text and unknown binary defer to the
/// file extension when it names a type; otherwise they stay as sniffed.
pub fn detect(head: &[u8], file_name: &str) -> String {
    let by_name = || mime_guess::from_path(file_name).first_raw();
    match sniff(head) {
        Some(TEXT_PLAIN) => by_name().unwrap_or(TEXT_PLAIN).to_string(),
        Some(sniffed) => sniffed.to_string(),
        None => by_name().map_or_else(
            || mime::APPLICATION_OCTET_STREAM.to_string(),
            str::to_string,
        ),
    }
}

fn trim_leading_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' '))
        .unwrap_or(data.len());
    &data[start..]
}

fn starts_with_ignore_case(data: &[u8], prefix: &[u8]) -> bool {
    data.len() >= prefix.len() && data[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn looks_like_text(data: &[u8]) -> bool {
    let binary = data
        .iter()
        .any(|b| matches!(b, 0x00..=0x08 | 0x0b | 0x0e..=0x1a | 0x1c..=0x1f));
    if binary {
        return false;
    }
    // a multi-byte sequence may be cut at the sniff boundary
    match std::str::from_utf8(data) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}
