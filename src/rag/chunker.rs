//! Markdown-aware text chunking for policy documents.
//!
//! Splits on the strongest separator that still yields pieces under the
//! chunk size: `## ` headings, then `### `, then blank lines, then single
//! newlines, then whitespace. Adjacent chunks overlap so retrieval does not
//! lose sentences that straddle a boundary.

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Chunk {
    pub content: String,
    pub source: String,
}

const SEPARATORS: &[&str] = &["\n## ", "\n### ", "\n\n", "\n", " "];

pub fn split_document(text: &str, source: &str, config: &ChunkerConfig) -> Vec<Chunk> {
    let mut pieces = Vec::new();
    split_recursive(text, config.chunk_size, SEPARATORS, &mut pieces);

    let merged = merge_with_overlap(&pieces, config);
    merged
        .into_iter()
        .map(|content| Chunk {
            content,
            source: source.to_string(),
        })
        .filter(|chunk| !chunk.content.trim().is_empty())
        .collect()
}

fn split_recursive(text: &str, chunk_size: usize, separators: &[&str], out: &mut Vec<String>) {
    if text.chars().count() <= chunk_size {
        if !text.trim().is_empty() {
            out.push(text.to_string());
        }
        return;
    }

    let Some((separator, rest)) = separators.split_first() else {
        // No separator left: hard-split on character count.
        let chars: Vec<char> = text.chars().collect();
        for window in chars.chunks(chunk_size) {
            let piece: String = window.iter().collect();
            if !piece.trim().is_empty() {
                out.push(piece);
            }
        }
        return;
    };

    let parts: Vec<&str> = text.split(separator).collect();
    if parts.len() == 1 {
        split_recursive(text, chunk_size, rest, out);
        return;
    }

    for (index, part) in parts.iter().enumerate() {
        // Re-attach the heading marker the split consumed.
        let piece = if index == 0 {
            part.to_string()
        } else {
            format!("{}{}", separator.trim_start_matches('\n'), part)
        };
        split_recursive(&piece, chunk_size, rest, out);
    }
}

fn merge_with_overlap(pieces: &[String], config: &ChunkerConfig) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for piece in pieces {
        let candidate_len = current.chars().count() + piece.chars().count() + 1;
        if !current.is_empty() && candidate_len > config.chunk_size {
            chunks.push(current.trim().to_string());
            current = tail_chars(&current, config.chunk_overlap);
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(piece);
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }
    chunks
}

fn tail_chars(text: &str, count: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let start = chars.len().saturating_sub(count);
    chars[start..].iter().collect()
}
