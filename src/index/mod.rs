//! Persisted knowledge base: chunked documents with embeddings, searched by cosine similarity.
//!
//! The whole index lives in `<dir>/index.json`. Writers replace it atomically
//! (temp file + rename), so a reader always sees a complete snapshot.

pub mod chunk;
pub mod embedding;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{ResearchError, Result};
use crate::input::DocumentExtractor;
use crate::types::MediaKind;

pub use chunk::{chunk_text, CHUNK_OVERLAP, CHUNK_SIZE};
pub use embedding::{cosine_similarity, Embedder, HashingEmbedder, SparseVector};

pub const INDEX_FILE: &str = "index.json";
pub const INDEX_VERSION: u32 = 1;

/// Maximum per-file errors listed in a directory summary.
const MAX_REPORTED_ERRORS: usize = 5;

const IMAGE_NOT_INDEXABLE: &str =
    "Images cannot be indexed for text retrieval. Use PDF or text files.";

/// On-disk layout of `index.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredIndex {
    pub version: u32,
    pub embedder: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub documents: Vec<IndexedDocument>,
    pub chunks: Vec<IndexedChunk>,
}

impl StoredIndex {
    fn empty(embedder: String) -> Self {
        Self {
            version: INDEX_VERSION,
            embedder,
            updated_at: None,
            documents: Vec::new(),
            chunks: Vec::new(),
        }
    }

    fn document(&self, source: &str) -> Option<&IndexedDocument> {
        self.documents.iter().find(|d| d.source == source)
    }

    fn replace_document(&mut self, document: IndexedDocument, chunks: Vec<IndexedChunk>) {
        self.documents.retain(|d| d.source != document.source);
        self.chunks.retain(|c| c.source != document.source);
        self.documents.push(document);
        self.chunks.extend(chunks);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedDocument {
    pub source: String,
    pub sha256: String,
    pub chunk_count: usize,
    pub indexed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedChunk {
    pub id: String,
    pub source: String,
    pub text: String,
    pub embedding: SparseVector,
}

/// A retrieved passage.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub source: String,
    pub text: String,
    pub score: f32,
}

/// What happened to one file during indexing.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Indexed { chunks: usize },
    Unchanged { chunks: usize },
    Skipped(String),
    Failed(String),
}

impl FileOutcome {
    fn is_indexed(&self) -> bool {
        matches!(self, Self::Indexed { .. } | Self::Unchanged { .. })
    }
}

/// Result of indexing one target path (a file or a directory).
#[derive(Debug, Clone, PartialEq)]
pub struct IndexReport {
    pub target: PathBuf,
    pub is_dir: bool,
    pub files: Vec<(PathBuf, FileOutcome)>,
}

impl IndexReport {
    pub fn indexed_files(&self) -> usize {
        self.files.iter().filter(|(_, o)| o.is_indexed()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.files
            .iter()
            .any(|(_, o)| matches!(o, FileOutcome::Failed(_)))
    }
}

impl fmt::Display for IndexReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = self.target.display();
        if !self.is_dir {
            return match self.files.first() {
                Some((_, FileOutcome::Indexed { chunks })) => {
                    write!(f, "Indexed {chunks} chunks from {target}.")
                }
                Some((_, FileOutcome::Unchanged { chunks })) => {
                    write!(f, "Already indexed {target} ({chunks} chunks, unchanged).")
                }
                Some((_, FileOutcome::Skipped(msg))) => write!(f, "{msg}"),
                Some((_, FileOutcome::Failed(msg))) => write!(f, "Error: {msg}"),
                None => write!(f, "Nothing to index in {target}."),
            };
        }

        write!(f, "Indexed {} file(s) from {target}.", self.indexed_files())?;
        let errors: Vec<String> = self
            .files
            .iter()
            .filter_map(|(path, outcome)| {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                match outcome {
                    FileOutcome::Skipped(msg) | FileOutcome::Failed(msg) => {
                        Some(format!("{name}: {msg}"))
                    }
                    _ => None,
                }
            })
            .take(MAX_REPORTED_ERRORS)
            .collect();
        if !errors.is_empty() {
            write!(f, " {}", errors.join("; "))?;
        }
        Ok(())
    }
}

/// Local vector index over PDF and text documents.
#[derive(Clone)]
pub struct KnowledgeBase {
    dir: PathBuf,
    extractor: Arc<dyn DocumentExtractor>,
    embedder: Arc<dyn Embedder>,
}

impl fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("dir", &self.dir)
            .field("embedder", &self.embedder.id())
            .finish()
    }
}

impl KnowledgeBase {
    pub fn new(dir: impl Into<PathBuf>, extractor: Arc<dyn DocumentExtractor>) -> Self {
        Self {
            dir: dir.into(),
            extractor,
            embedder: Arc::new(HashingEmbedder::default()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_file_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    /// Read the current snapshot. A missing file is an empty index.
    pub fn load(&self) -> Result<StoredIndex> {
        let path = self.index_file_path();
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoredIndex::empty(self.embedder.id()));
            }
            Err(e) => return Err(e.into()),
        };
        let index: StoredIndex = serde_json::from_str(&raw).map_err(|e| {
            ResearchError::Index(format!("corrupt index at {}: {e}", path.display()))
        })?;
        if index.version != INDEX_VERSION {
            return Err(ResearchError::Index(format!(
                "unsupported index version {} (expected {INDEX_VERSION}); re-run indexing",
                index.version
            )));
        }
        if index.embedder != self.embedder.id() {
            return Err(ResearchError::Index(format!(
                "index was built with embedder '{}' but '{}' is configured; re-run indexing",
                index.embedder,
                self.embedder.id()
            )));
        }
        Ok(index)
    }

    fn save(&self, index: &mut StoredIndex) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        index.updated_at = Some(Utc::now());
        let target = self.index_file_path();
        let tmp = self.dir.join(format!("{INDEX_FILE}.{}.tmp", uuid::Uuid::new_v4().simple()));
        std::fs::write(&tmp, serde_json::to_vec(&*index)?)?;
        if let Err(e) = std::fs::rename(&tmp, &target) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Number of stored chunks.
    pub fn len(&self) -> Result<usize> {
        Ok(self.load()?.chunks.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Index files and directories, writing one new snapshot at the end.
    pub fn index_paths(&self, paths: &[PathBuf], recursive: bool) -> Result<Vec<IndexReport>> {
        let mut index = self.load()?;
        let mut changed = false;
        let mut reports = Vec::with_capacity(paths.len());

        for target in paths {
            let report = if target.is_dir() {
                let files = collect_files(target, recursive)
                    .into_iter()
                    .map(|file| {
                        let outcome = self.index_one(&mut index, &file, &mut changed);
                        (file, outcome)
                    })
                    .collect();
                IndexReport {
                    target: target.clone(),
                    is_dir: true,
                    files,
                }
            } else {
                let outcome = self.index_one(&mut index, target, &mut changed);
                IndexReport {
                    target: target.clone(),
                    is_dir: false,
                    files: vec![(target.clone(), outcome)],
                }
            };
            info!(target = %target.display(), files = report.indexed_files(), "indexed path");
            reports.push(report);
        }

        if changed {
            self.save(&mut index)?;
            debug!(
                path = %self.index_file_path().display(),
                documents = index.documents.len(),
                chunks = index.chunks.len(),
                "index saved"
            );
        }
        Ok(reports)
    }

    fn index_one(&self, index: &mut StoredIndex, path: &Path, changed: &mut bool) -> FileOutcome {
        match self.try_index_one(index, path) {
            Ok(outcome) => {
                if matches!(outcome, FileOutcome::Indexed { .. }) {
                    *changed = true;
                }
                outcome
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "indexing failed");
                FileOutcome::Failed(e.to_string())
            }
        }
    }

    fn try_index_one(&self, index: &mut StoredIndex, path: &Path) -> Result<FileOutcome> {
        let attachment = match crate::input::detect_attachment(path) {
            Ok(attachment) => attachment,
            Err(e) => return Ok(FileOutcome::Failed(e.to_string())),
        };
        if attachment.kind == MediaKind::Image {
            return Ok(FileOutcome::Skipped(IMAGE_NOT_INDEXABLE.to_string()));
        }

        let bytes = std::fs::read(path)?;
        let sha256 = format!("{:x}", Sha256::digest(&bytes));
        let source = source_key(path);

        if let Some(doc) = index.document(&source) {
            if doc.sha256 == sha256 {
                debug!(source = %source, "unchanged, skipping");
                return Ok(FileOutcome::Unchanged {
                    chunks: doc.chunk_count,
                });
            }
        }

        let text = self.extractor.extract_text(path, attachment.kind)?;
        let pieces = chunk_text(&text, CHUNK_SIZE, CHUNK_OVERLAP);
        if pieces.is_empty() {
            return Ok(FileOutcome::Skipped(format!(
                "No text extracted from {}.",
                path.display()
            )));
        }

        let chunks: Vec<IndexedChunk> = pieces
            .into_iter()
            .enumerate()
            .map(|(i, text)| IndexedChunk {
                id: format!("{}#{i}", &sha256[..12]),
                source: source.clone(),
                embedding: self.embedder.embed(&text),
                text,
            })
            .collect();
        let count = chunks.len();
        index.replace_document(
            IndexedDocument {
                source,
                sha256,
                chunk_count: count,
                indexed_at: Utc::now(),
            },
            chunks,
        );
        Ok(FileOutcome::Indexed { chunks: count })
    }

    /// Top `n` chunks by cosine similarity to `query`.
    pub fn search(&self, query: &str, n: usize) -> Result<Vec<SearchHit>> {
        let index = self.load()?;
        if index.chunks.is_empty() || n == 0 {
            return Ok(Vec::new());
        }
        let query = self.embedder.embed(query);
        let mut hits: Vec<SearchHit> = index
            .chunks
            .into_iter()
            .map(|chunk| SearchHit {
                score: cosine_similarity(&query, &chunk.embedding),
                source: chunk.source,
                text: chunk.text,
            })
            .collect();
        // Stable sort keeps insertion order among ties.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(n);
        Ok(hits)
    }
}

/// Identity of a document in the index: its canonical path when resolvable.
fn source_key(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

/// PDF and text-kind files under `dir`, sorted by path.
fn collect_files(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let mut walker = walkdir::WalkDir::new(dir).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }
    walker
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| MediaKind::from_extension(path).is_some_and(MediaKind::is_textual))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::FsDocumentExtractor;

    fn kb(dir: &Path) -> KnowledgeBase {
        KnowledgeBase::new(dir.join("kb"), Arc::new(FsDocumentExtractor))
    }

    #[test]
    fn missing_index_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(kb(dir.path()).is_empty().unwrap());
        assert!(kb(dir.path()).search("anything", 5).unwrap().is_empty());
    }

    #[test]
    fn file_summary_reports_chunk_count() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "Enzymes catalyse reactions in living cells.").unwrap();

        let reports = kb(dir.path()).index_paths(&[file.clone()], false).unwrap();

        assert_eq!(
            reports[0].to_string(),
            format!("Indexed 1 chunks from {}.", file.display())
        );
    }

    #[test]
    fn directory_summary_lists_errors() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir(&docs).unwrap();
        std::fs::write(docs.join("a.txt"), "alpha beta gamma").unwrap();
        std::fs::write(docs.join("empty.md"), "   ").unwrap();
        std::fs::write(docs.join("photo.png"), [0x89, b'P']).unwrap();

        let reports = kb(dir.path()).index_paths(&[docs.clone()], false).unwrap();

        let summary = reports[0].to_string();
        assert!(summary.starts_with(&format!("Indexed 1 file(s) from {}.", docs.display())));
        assert!(summary.contains("empty.md: No text extracted"));
        assert!(!summary.contains("photo.png"));
    }

    #[test]
    fn image_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("fig.png");
        std::fs::write(&img, [0x89, b'P', b'N', b'G']).unwrap();

        let reports = kb(dir.path()).index_paths(&[img], false).unwrap();

        assert_eq!(reports[0].to_string(), IMAGE_NOT_INDEXABLE);
    }
}
