//! Multimodal input normalization: query text plus attachments into content blocks.
//!
//! Every attachment is validated before any content is produced, so a bad file
//! fails the whole query with [`InputError`] and no partial conversation exists.

pub mod extract;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use tracing::debug;

use crate::error::{InputError, InputErrorReason};
use crate::types::{
    image_mime_type, Attachment, ContentBlock, DocumentText, ImageContent, MediaKind,
};
use crate::util::text::truncate_chars;

pub use extract::{DocumentExtractor, FsDocumentExtractor, EMPTY_PDF_TEXT};

/// Text used when the user supplied neither a query nor attachments.
pub const NO_INPUT_TEXT: &str = "No input provided.";

const SNIFF_BYTES: u64 = 8192;

/// Converts raw user input into model-consumable content blocks.
#[derive(Clone)]
pub struct InputNormalizer {
    extractor: Arc<dyn DocumentExtractor>,
    max_attachment_chars: usize,
}

impl std::fmt::Debug for InputNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputNormalizer")
            .field("max_attachment_chars", &self.max_attachment_chars)
            .finish()
    }
}

impl InputNormalizer {
    pub fn new(extractor: Arc<dyn DocumentExtractor>, max_attachment_chars: usize) -> Self {
        Self {
            extractor,
            max_attachment_chars,
        }
    }

    /// Validate a path and detect its media kind.
    pub fn detect(&self, path: &Path) -> Result<Attachment, InputError> {
        detect_attachment(path)
    }

    /// Build the content blocks for one user turn.
    pub fn normalize(&self, query: &str, paths: &[PathBuf]) -> Result<Vec<ContentBlock>, InputError> {
        let attachments = paths
            .iter()
            .map(|p| self.detect(p))
            .collect::<Result<Vec<_>, _>>()?;

        let mut blocks = Vec::with_capacity(attachments.len() + 1);
        if !query.trim().is_empty() {
            blocks.push(ContentBlock::Text {
                text: query.to_string(),
            });
        }

        for attachment in &attachments {
            blocks.push(self.block_for(attachment)?);
        }

        if blocks.is_empty() {
            blocks.push(ContentBlock::Text {
                text: NO_INPUT_TEXT.to_string(),
            });
        }
        Ok(blocks)
    }

    fn block_for(&self, attachment: &Attachment) -> Result<ContentBlock, InputError> {
        let path = attachment.path.as_path();
        match attachment.kind {
            MediaKind::Image => {
                let bytes = std::fs::read(path).map_err(|e| unreadable(path, e))?;
                debug!(path = %path.display(), bytes = bytes.len(), "embedding image attachment");
                Ok(ContentBlock::Image(ImageContent {
                    mime_type: image_mime_type(path, &bytes).to_string(),
                    data: base64::engine::general_purpose::STANDARD.encode(&bytes),
                    source: attachment.file_name(),
                }))
            }
            MediaKind::Pdf | MediaKind::Text => {
                let text = self
                    .extractor
                    .extract_text(path, attachment.kind)
                    .map_err(|e| unreadable(path, e))?;
                let (kept, truncated) = truncate_chars(&text, self.max_attachment_chars);
                debug!(
                    path = %path.display(),
                    kind = %attachment.kind,
                    chars = kept.chars().count(),
                    truncated,
                    "extracted attachment text"
                );
                Ok(ContentBlock::Document(DocumentText {
                    source: attachment.file_name(),
                    kind: attachment.kind,
                    text: kept.to_string(),
                    truncated,
                }))
            }
            MediaKind::Unsupported => Err(InputError::new(
                path,
                InputErrorReason::Unsupported {
                    extension: "unknown".into(),
                },
            )),
        }
    }
}

/// Validate that `path` is a readable regular file of a supported kind.
pub fn detect_attachment(path: &Path) -> Result<Attachment, InputError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        let reason = if e.kind() == std::io::ErrorKind::NotFound {
            InputErrorReason::NotFound
        } else {
            InputErrorReason::Unreadable(e.to_string())
        };
        InputError::new(path, reason)
    })?;
    if !metadata.is_file() {
        return Err(InputError::new(
            path,
            InputErrorReason::Unreadable("not a regular file".into()),
        ));
    }

    let kind = match MediaKind::from_extension(path) {
        Some(kind) => kind,
        None => MediaKind::sniff(&read_prefix(path)?),
    };
    if kind == MediaKind::Unsupported {
        let extension = crate::types::attachment::lowercase_extension(path)
            .unwrap_or_else(|| "unknown".to_string());
        return Err(InputError::new(
            path,
            InputErrorReason::Unsupported { extension },
        ));
    }

    Ok(Attachment {
        path: path.to_path_buf(),
        kind,
    })
}

fn read_prefix(path: &Path) -> Result<Vec<u8>, InputError> {
    let file = std::fs::File::open(path).map_err(|e| unreadable(path, e))?;
    let mut buf = Vec::new();
    file.take(SNIFF_BYTES)
        .read_to_end(&mut buf)
        .map_err(|e| unreadable(path, e))?;
    Ok(buf)
}

fn unreadable(path: &Path, err: impl ToString) -> InputError {
    InputError::new(path, InputErrorReason::Unreadable(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer(max_chars: usize) -> InputNormalizer {
        InputNormalizer::new(Arc::new(FsDocumentExtractor), max_chars)
    }

    #[test]
    fn empty_input_yields_placeholder_block() {
        let blocks = normalizer(100).normalize("   ", &[]).unwrap();
        assert_eq!(
            blocks,
            vec![ContentBlock::Text {
                text: NO_INPUT_TEXT.into()
            }]
        );
    }

    #[test]
    fn long_text_is_truncated_to_bound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.txt");
        std::fs::write(&path, "abcdefghij").unwrap();

        let blocks = normalizer(4).normalize("", &[path]).unwrap();

        match &blocks[0] {
            ContentBlock::Document(doc) => {
                assert_eq!(doc.text, "abcd");
                assert!(doc.truncated);
            }
            other => panic!("expected document block, got {other:?}"),
        }
    }

    #[test]
    fn extensionless_utf8_file_is_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NOTES");
        std::fs::write(&path, "just words").unwrap();

        let attachment = normalizer(100).detect(&path).unwrap();
        assert_eq!(attachment.kind, MediaKind::Text);
    }

    #[test]
    fn directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = normalizer(100).detect(dir.path()).unwrap_err();
        assert!(matches!(err.reason, InputErrorReason::Unreadable(_)));
    }

    #[test]
    fn image_is_base64_encoded_with_mime_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.gif");
        std::fs::write(&path, b"GIF89a").unwrap();

        let blocks = normalizer(100).normalize("what is this?", &[path]).unwrap();

        assert_eq!(blocks.len(), 2);
        match &blocks[1] {
            ContentBlock::Image(img) => {
                assert_eq!(img.mime_type, "image/gif");
                assert_eq!(img.data, "R0lGODlh");
                assert_eq!(img.source, "pixel.gif");
            }
            other => panic!("expected image block, got {other:?}"),
        }
    }
}
