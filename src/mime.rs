//! Content type classification: MIME string -> coarse type code.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::rules::TypeCode;

pub const MEDIA_TYPE_NONE: TypeCode = 0;
pub const MEDIA_TYPE_IMAGE: TypeCode = 1;
pub const MEDIA_TYPE_AUDIO: TypeCode = 2;
pub const MEDIA_TYPE_VIDEO: TypeCode = 3;
pub const MEDIA_TYPE_PLAYLIST: TypeCode = 4;
pub const MEDIA_TYPE_SUBTITLE: TypeCode = 5;
pub const MEDIA_TYPE_DOCUMENT: TypeCode = 6;

/// External, pure classification of a MIME type string.
pub trait TypeClassifier: Send + Sync {
    fn classify(&self, mime_type: &str) -> TypeCode;
}

/// Default classifier following the media index's own buckets.
#[derive(Debug, Clone, Copy, Default)]
pub struct MimeClassifier;

impl TypeClassifier for MimeClassifier {
    fn classify(&self, mime_type: &str) -> TypeCode {
        let mime = mime_type.trim().to_ascii_lowercase();
        if mime.is_empty() {
            return MEDIA_TYPE_NONE;
        }
        if is_playlist(&mime) {
            return MEDIA_TYPE_PLAYLIST;
        }
        if is_subtitle(&mime) {
            return MEDIA_TYPE_SUBTITLE;
        }
        match mime.split('/').next().unwrap_or("") {
            "image" => MEDIA_TYPE_IMAGE,
            "audio" => MEDIA_TYPE_AUDIO,
            "video" => MEDIA_TYPE_VIDEO,
            _ if is_document(&mime) => MEDIA_TYPE_DOCUMENT,
            _ => MEDIA_TYPE_NONE,
        }
    }
}

fn is_playlist(mime: &str) -> bool {
    matches!(
        mime,
        "audio/mpegurl" | "audio/x-mpegurl" | "application/vnd.apple.mpegurl" | "audio/x-scpls"
            | "application/vnd.ms-wpl" | "application/x-extension-smpl"
    )
}

fn is_subtitle(mime: &str) -> bool {
    matches!(
        mime,
        "application/x-subrip" | "text/vtt" | "text/x-ssa" | "application/ttml+xml"
    )
}

fn is_document(mime: &str) -> bool {
    mime.starts_with("text/")
        || mime == "application/pdf"
        || mime == "application/rtf"
        || mime == "application/msword"
        || mime.starts_with("application/vnd.openxmlformats-officedocument.")
        || mime.starts_with("application/vnd.ms-")
        || mime.starts_with("application/vnd.oasis.opendocument.")
        || mime == "application/epub+zip"
}

static EXTENSION_TABLE: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("jpg", "image/jpeg"),
        ("jpeg", "image/jpeg"),
        ("png", "image/png"),
        ("gif", "image/gif"),
        ("webp", "image/webp"),
        ("heic", "image/heic"),
        ("bmp", "image/bmp"),
        ("mp3", "audio/mpeg"),
        ("m4a", "audio/mp4"),
        ("ogg", "audio/ogg"),
        ("flac", "audio/flac"),
        ("wav", "audio/x-wav"),
        ("m3u", "audio/x-mpegurl"),
        ("m3u8", "application/vnd.apple.mpegurl"),
        ("pls", "audio/x-scpls"),
        ("mp4", "video/mp4"),
        ("mkv", "video/x-matroska"),
        ("webm", "video/webm"),
        ("3gp", "video/3gpp"),
        ("srt", "application/x-subrip"),
        ("vtt", "text/vtt"),
        ("txt", "text/plain"),
        ("pdf", "application/pdf"),
        ("doc", "application/msword"),
        ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        ("epub", "application/epub+zip"),
        ("apk", "application/vnd.android.package-archive"),
        ("zip", "application/zip"),
    ])
});

/// MIME type implied by a file name's extension, if known.
pub fn mime_from_name(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    EXTENSION_TABLE.get(ext.to_ascii_lowercase().as_str()).copied()
}
