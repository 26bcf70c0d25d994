//! Per-file structural extraction.
//!
//! Two variants converge on [`FileRecord`]:
//! - [`python`]: tree-sitter walk of the declaration tree.
//! - [`pattern`]: regex and keyword heuristics for script languages without a
//!   grammar here.
//!
//! Everything in this module is a pure function of `(content, path)`.

pub mod pattern;
pub mod python;

use std::path::Path;

use crate::model::FileRecord;

/// Languages the extractor knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
}

impl Language {
    pub fn from_path(path: &str) -> Option<Self> {
        match extension(path)?.as_str() {
            "py" => Some(Self::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(Self::JavaScript),
            "ts" | "tsx" => Some(Self::TypeScript),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
        }
    }
}

/// Lower-cased extension of `path`, if any.
pub fn extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Language tag for any path, including ones the extractor does not analyse.
pub fn language_tag(path: &str) -> &'static str {
    if let Some(lang) = Language::from_path(path) {
        return lang.tag();
    }
    match extension(path).as_deref() {
        Some("go") => "go",
        Some("java") => "java",
        Some("rb") => "ruby",
        Some("php") => "php",
        Some("md") => "markdown",
        Some("json") => "json",
        _ => "unknown",
    }
}

/// Extract facts from one file. `None` means the language is unsupported and the
/// file should not be recorded.
pub fn extract(content: &str, path: &str) -> Option<FileRecord> {
    let record = match Language::from_path(path)? {
        Language::Python => python::extract(content, path),
        lang @ (Language::JavaScript | Language::TypeScript) => {
            pattern::extract(content, path, lang)
        }
    };
    Some(record)
}
