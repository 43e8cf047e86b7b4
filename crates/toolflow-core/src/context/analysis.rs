//! File content analysis
//!
//! Classifies file content by extension and rough structure so the chunker
//! can pick the right splitting strategy, and attaches a coarse 0-100
//! complexity score.

use serde::Serialize;
use std::path::Path;

use super::chunker::ContentType;

/// Result of analyzing one file's content.
#[derive(Debug, Clone, Serialize)]
pub struct FileAnalysis {
    pub file_type: String,
    pub content_type: ContentType,
    pub has_functions: bool,
    pub has_classes: bool,
    pub has_imports: bool,
    /// 0-100, counts of control-flow and structural markers.
    pub complexity_score: u32,
}

/// Analyze file content, using the extension as the primary signal.
pub fn analyze_file_content(content: &str, path: &Path) -> FileAnalysis {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let content_type = match extension.as_str() {
        "js" | "ts" | "jsx" | "tsx" | "py" | "rs" | "java" | "cpp" | "c" | "cs" | "go" => {
            ContentType::Code
        }
        "md" | "txt" | "rst" => ContentType::Documentation,
        "json" | "xml" | "yaml" | "yml" | "csv" | "toml" => ContentType::Data,
        _ => ContentType::Mixed,
    };

    let (has_functions, has_classes, has_imports) = if content_type == ContentType::Code {
        (
            contains_any(content, &["function", "def ", "fn ", "public ", "private "]),
            contains_any(content, &["class ", "interface ", "struct "]),
            contains_any(content, &["import ", "require(", "use ", "using "]),
        )
    } else {
        (false, false, false)
    };

    FileAnalysis {
        file_type: extension,
        content_type,
        has_functions,
        has_classes,
        has_imports,
        complexity_score: complexity_score(content, content_type),
    }
}

fn complexity_score(content: &str, content_type: ContentType) -> u32 {
    let mut score: usize = 0;

    match content_type {
        ContentType::Code => {
            score += count(content, "if ") * 2;
            score += count(content, "for ") * 3;
            score += count(content, "while ") * 3;
            score += count(content, "try ") * 2;
            score += count(content, "catch ") * 2;
            score += count(content, "function ");
            score += count(content, "class ") * 2;
            score += count(content, "import ");
            score += count(content, "export ");
        }
        ContentType::Documentation => {
            score += count(content, "#");
            score += count(content, "##") * 2;
            score += count(content, "###") * 3;
            score += count(content, "[");
            score += count(content, "```") * 2;
        }
        ContentType::Data | ContentType::Mixed => {}
    }

    score.min(100) as u32
}

fn count(content: &str, pattern: &str) -> usize {
    content.matches(pattern).count()
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}
