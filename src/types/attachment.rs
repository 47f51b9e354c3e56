//! Attachments and media-kind detection.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "rst", "csv", "tsv", "json", "yaml", "yml", "toml", "xml", "html",
    "htm", "log", "tex",
];

/// Detected kind of an attached file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    Image,
    Pdf,
    Text,
    Unsupported,
}

impl MediaKind {
    /// Classify by lower-cased extension. Returns `None` when the path has no extension.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = lowercase_extension(path)?;
        let kind = if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Self::Image
        } else if ext == "pdf" {
            Self::Pdf
        } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            Self::Text
        } else {
            Self::Unsupported
        };
        Some(kind)
    }

    /// Classify extension-less content by its leading bytes.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(b"%PDF-") {
            Self::Pdf
        } else if image_mime_from_magic(bytes).is_some() {
            Self::Image
        } else {
            match std::str::from_utf8(bytes) {
                Ok(_) => Self::Text,
                // A multi-byte char cut off at the end of the sample still counts as text.
                Err(e) if e.error_len().is_none() => Self::Text,
                Err(_) => Self::Unsupported,
            }
        }
    }

    /// Whether text can be extracted from this kind (for loading and indexing).
    pub fn is_textual(self) -> bool {
        matches!(self, Self::Pdf | Self::Text)
    }
}

/// An attached file with its detected kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl Attachment {
    /// Display name used to label the attachment's content.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

pub(crate) fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

/// MIME type for an image path, by extension first and magic bytes second.
pub fn image_mime_type(path: &Path, bytes: &[u8]) -> &'static str {
    match lowercase_extension(path).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => image_mime_from_magic(bytes).unwrap_or("image/jpeg"),
    }
}

fn image_mime_from_magic(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}
