//! Context chunking engine
//!
//! Splits large text into token-budgeted chunks along content-aware
//! boundaries and scores each chunk's relative importance. Token counts use
//! the `len / 4` character heuristic throughout; this is an approximation,
//! not a real tokenizer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Closed set of content types, one splitting strategy per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Code,
    Documentation,
    Data,
    #[default]
    Mixed,
}

/// Estimated token count: one token per four characters.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

/// A priority-scored slice of a larger context.
#[derive(Debug, Clone, Serialize)]
pub struct ContextChunk {
    /// Content-addressed: session, ordinal, and a short hash of the content.
    pub id: String,
    pub content: String,
    pub token_count: usize,
    pub chunk_type: ContentType,
    /// 1-10, higher = more important.
    pub priority: u8,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkMetadata {
    pub session_id: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub created_at: DateTime<Utc>,
}

/// Splits content into budgeted chunks and scores them.
#[derive(Debug, Clone)]
pub struct ChunkingEngine {
    /// Token budget per chunk.
    chunk_size: usize,
}

impl ChunkingEngine {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Split `content` into ordered, scored chunks owned by `session_id`.
    pub fn split(
        &self,
        session_id: &str,
        content: &str,
        content_type: ContentType,
    ) -> Vec<ContextChunk> {
        let pieces = match content_type {
            ContentType::Code => self.split_lines(content),
            ContentType::Documentation => self.split_documentation(content),
            ContentType::Data => self.split_data(content),
            ContentType::Mixed => self.split_lines(content),
        };

        let total = pieces.len();
        let chunks: Vec<ContextChunk> = pieces
            .into_iter()
            .enumerate()
            .map(|(i, piece)| {
                let id = format!(
                    "{}_chunk_{}_{}",
                    session_id,
                    i,
                    short_hash(&piece)
                );
                ContextChunk {
                    id,
                    token_count: estimate_tokens(&piece),
                    priority: score_priority(&piece, content_type),
                    chunk_type: content_type,
                    content: piece,
                    metadata: ChunkMetadata {
                        session_id: session_id.to_string(),
                        chunk_index: i,
                        total_chunks: total,
                        created_at: Utc::now(),
                    },
                }
            })
            .collect();

        tracing::info!(
            session = %session_id,
            chunks = chunks.len(),
            ?content_type,
            "Split context into chunks"
        );
        chunks
    }

    /// Accumulate lines until the next line would exceed the budget. Never
    /// splits inside a line.
    fn split_lines(&self, content: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_size = 0;

        for line in content.split('\n') {
            let line_size = line.len() / 4;
            if current_size + line_size > self.chunk_size && !current.is_empty() {
                chunks.push(current.join("\n"));
                current = vec![line];
                current_size = line_size;
            } else {
                current.push(line);
                current_size += line_size;
            }
        }

        if !current.is_empty() {
            chunks.push(current.join("\n"));
        }
        chunks
    }

    /// Split on double-blank-line section boundaries; oversized sections
    /// fall back to sentence accumulation.
    fn split_documentation(&self, content: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        for section in content.split("\n\n\n") {
            if section.len() / 4 > self.chunk_size {
                chunks.extend(self.split_sentences(section));
            } else {
                chunks.push(section.to_string());
            }
        }
        chunks
    }

    fn split_sentences(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_size = 0;

        for sentence in text.split(". ") {
            let sentence_size = sentence.len() / 4;
            if current_size + sentence_size > self.chunk_size && !current.is_empty() {
                chunks.push(format!("{}.", current.join(". ")));
                current = vec![sentence];
                current_size = sentence_size;
            } else {
                current.push(sentence);
                current_size += sentence_size;
            }
        }

        if !current.is_empty() {
            chunks.push(current.join(". "));
        }
        chunks
    }

    /// Structured split for array-shaped data: slice the array into
    /// fixed-size sub-lists and re-serialize each. Anything else falls back
    /// to line accumulation.
    fn split_data(&self, content: &str) -> Vec<String> {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(content) {
            let records_per_chunk = (self.chunk_size / 4).max(1);
            return items
                .chunks(records_per_chunk)
                .map(|slice| {
                    serde_json::to_string_pretty(&Value::Array(slice.to_vec()))
                        .unwrap_or_else(|_| "[]".to_string())
                })
                .collect();
        }

        self.split_lines(content)
    }
}

/// Priority scoring: base 5, keyword bonuses per content type, clamped to
/// the 1-10 range.
fn score_priority(content: &str, content_type: ContentType) -> u8 {
    let lower = content.to_lowercase();
    let mut priority: i32 = 5;

    match content_type {
        ContentType::Code => {
            if contains_any(&lower, &["function", "class", "import", "export"]) {
                priority += 2;
            }
            if contains_any(&lower, &["error", "exception", "bug", "fix"]) {
                priority += 3;
            }
        }
        ContentType::Documentation => {
            if contains_any(&lower, &["important", "critical", "warning", "note"]) {
                priority += 2;
            }
            if content.starts_with('#') {
                priority += 1;
            }
        }
        ContentType::Data | ContentType::Mixed => {}
    }

    priority.clamp(1, 10) as u8
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

fn short_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest[..4].iter().map(|b| format!("{:02x}", b)).collect()
}
