//! Overlapping character windows for indexing.

pub const CHUNK_SIZE: usize = 800;
pub const CHUNK_OVERLAP: usize = 100;

/// Split `text` into `size`-char windows that overlap by `overlap` chars.
///
/// Windows are trimmed and whitespace-only windows are dropped.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let size = size.max(1);
    let step = size.saturating_sub(overlap).max(1);
    let chars: Vec<char> = text.chars().collect();

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        let trimmed = window.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        start += step;
    }
    chunks
}
