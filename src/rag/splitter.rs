//! Recursive text splitter.
//!
//! Splits on the coarsest boundary that yields pieces under `chunk_size`
//! (paragraph, line, sentence, word) and only falls back to cutting between
//! characters when a single word is still too long. Separators stay attached
//! to the piece they end, and lengths are counted in `char`s, so with
//! `chunk_overlap == 0` the chunks concatenate back to the input exactly.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::store::DocumentChunk;

pub const DEFAULT_SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "! ", "? ", " "];

/// A page submitted for grounding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub content: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub session_id: String,
}

#[derive(Debug, Clone)]
pub struct RecursiveTextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveTextSplitter {
    /// `chunk_overlap` is clamped below `chunk_size`; a zero size is treated as 1.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        self.split_level(text, 0)
            .into_iter()
            .filter(|chunk| !chunk.is_empty())
            .collect()
    }

    /// Splits `document` into chunks tagged with its metadata and `ingestion_id`.
    pub fn split_document(&self, document: &SourceDocument, ingestion_id: &str) -> Vec<DocumentChunk> {
        self.split_text(&document.content)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| DocumentChunk {
                chunk_id: format!("{}-{}", ingestion_id, chunk_index),
                content,
                title: document.title.clone(),
                source: document.url.clone(),
                session_id: document.session_id.clone(),
                ingestion_id: ingestion_id.to_string(),
                chunk_index,
            })
            .collect()
    }

    fn split_level(&self, text: &str, level: usize) -> Vec<String> {
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }

        let Some(separator) = self.separators.get(level) else {
            return self.split_chars(text);
        };

        let pieces = split_keep_separator(text, separator);
        if pieces.len() <= 1 {
            return self.split_level(text, level + 1);
        }

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) <= self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            chunks.extend(self.split_level(piece, level + 1));
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }
        chunks
    }

    /// Packs pieces (each within `chunk_size`) into chunks, carrying up to
    /// `chunk_overlap` trailing characters into the next chunk.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                chunks.push(window.iter().map(|(p, _)| *p).collect::<String>());
                while total > self.chunk_overlap || (total > 0 && total + len > self.chunk_size) {
                    let Some((_, dropped)) = window.pop_front() else {
                        break;
                    };
                    total -= dropped;
                }
            }
            window.push_back((piece, len));
            total += len;
        }

        if !window.is_empty() {
            chunks.push(window.iter().map(|(p, _)| *p).collect::<String>());
        }
        chunks
    }

    fn split_chars(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn split_keep_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for (idx, matched) in text.match_indices(separator) {
        let end = idx + matched.len();
        pieces.push(&text[last..end]);
        last = end;
    }
    if last < text.len() {
        pieces.push(&text[last..]);
    }
    pieces
}
