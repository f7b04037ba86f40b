#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use crate::index::record_id;

/// A bounded slice of a document's text, ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Filename of the document the chunk came from
    pub source: String,
    /// Position of this chunk within its document
    pub index: usize,
    /// The chunk text
    pub text: String,
}

impl Chunk {
    /// Identifier of the index record holding this chunk
    #[inline]
    pub fn id(&self) -> String {
        record_id(&self.source, self.index)
    }
}

/// Configuration for text chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters carried over from the end of one chunk to the next
    pub chunk_overlap: usize,
    /// Split points, tried in order from coarsest to finest
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            separators: ["\n\n", "\n", ". ", " "]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Split a document's text into indexed chunks
#[inline]
pub fn chunk_document(source: &str, text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = split_text(text, config)
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            source: source.to_string(),
            index,
            text,
        })
        .collect();

    debug!(
        "Chunked '{}' into {} chunks (avg {} chars)",
        source,
        chunks.len(),
        chunks.iter().map(|c| char_len(&c.text)).sum::<usize>() / chunks.len().max(1)
    );

    chunks
}

/// Split text into chunks of at most `chunk_size` characters.
///
/// The only chunks allowed to exceed the limit are single pieces that
/// contain none of the configured separators; those are kept whole.
#[inline]
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    split_recursive(text, &config.separators, config)
}

/// Length in characters, which is what `chunk_size` counts
#[inline]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn split_recursive(text: &str, separators: &[String], config: &ChunkingConfig) -> Vec<String> {
    let position = separators
        .iter()
        .position(|separator| text.contains(separator.as_str()));

    let (pieces, finer): (Vec<&str>, &[String]) = match position {
        Some(i) => (
            text.split_inclusive(separators[i].as_str())
                .filter(|piece| !piece.is_empty())
                .collect(),
            &separators[i + 1..],
        ),
        None => (vec![text], &[][..]),
    };

    let mut chunks = Vec::new();
    let mut mergeable: Vec<&str> = Vec::new();

    for piece in pieces {
        if char_len(piece) < config.chunk_size {
            mergeable.push(piece);
            continue;
        }

        if !mergeable.is_empty() {
            chunks.extend(merge_pieces(&mergeable, config));
            mergeable.clear();
        }

        if finer.is_empty() {
            let whole = piece.trim();
            if !whole.is_empty() {
                chunks.push(whole.to_string());
            }
        } else {
            chunks.extend(split_recursive(piece, finer, config));
        }
    }

    if !mergeable.is_empty() {
        chunks.extend(merge_pieces(&mergeable, config));
    }

    chunks
}

/// Greedily pack small pieces into chunks, seeding each new chunk with the
/// trailing pieces of the previous one up to `chunk_overlap` characters
fn merge_pieces(pieces: &[&str], config: &ChunkingConfig) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<(&str, usize)> = VecDeque::new();
    let mut total = 0;

    for &piece in pieces {
        let len = char_len(piece);

        if total + len > config.chunk_size && !window.is_empty() {
            push_joined(&mut chunks, &window);

            while total > config.chunk_overlap || (total > 0 && total + len > config.chunk_size)
            {
                match window.pop_front() {
                    Some((_, dropped)) => total -= dropped,
                    None => break,
                }
            }
        }

        window.push_back((piece, len));
        total += len;
    }

    push_joined(&mut chunks, &window);
    chunks
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<(&str, usize)>) {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
