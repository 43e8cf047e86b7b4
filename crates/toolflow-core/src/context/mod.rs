//! Large-context processing: chunking and file analysis.

pub mod analysis;
pub mod chunker;

pub use analysis::{analyze_file_content, FileAnalysis};
pub use chunker::{estimate_tokens, ChunkMetadata, ChunkingEngine, ContentType, ContextChunk};
