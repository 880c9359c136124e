//! Request types: what the editor hands to the orchestrator.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Languages the assistant builds prompts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    TypeScript,
    Python,
    Go,
    Rust,
}

impl Language {
    /// Lowercase identifier used in prompts and cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Go => "go",
            Language::Rust => "rust",
        }
    }

    /// Map an editor language id to a supported language.
    ///
    /// JavaScript shares the TypeScript prompts; anything unrecognised
    /// falls back to TypeScript.
    pub fn from_language_id(id: &str) -> Self {
        match id {
            "java" => Language::Java,
            "python" => Language::Python,
            "go" => Language::Go,
            "rust" => Language::Rust,
            _ => Language::TypeScript,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "java" => Ok(Language::Java),
            "typescript" | "ts" => Ok(Language::TypeScript),
            "python" | "py" => Ok(Language::Python),
            "go" => Ok(Language::Go),
            "rust" | "rs" => Ok(Language::Rust),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

/// Zero-based cursor position inside a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CursorPosition {
    pub line: u32,
    pub character: u32,
}

impl CursorPosition {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Opaque handle to the document a request came from (usually its URI or
/// file name). The orchestrator never dereferences it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef(String);

impl DocumentRef {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One unit of work for the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiRequest {
    pub context: String,
    pub language: Language,
    #[serde(default)]
    pub cursor: CursorPosition,
    #[serde(default)]
    pub document: DocumentRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl AiRequest {
    pub fn new(context: impl Into<String>, language: Language) -> Self {
        Self {
            context: context.into(),
            language,
            cursor: CursorPosition::default(),
            document: DocumentRef::default(),
            prompt: None,
        }
    }

    pub fn cursor(mut self, line: u32, character: u32) -> Self {
        self.cursor = CursorPosition::new(line, character);
        self
    }

    pub fn document(mut self, document: impl Into<String>) -> Self {
        self.document = DocumentRef::new(document);
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn javascript_maps_to_typescript() {
        assert_eq!(Language::from_language_id("javascript"), Language::TypeScript);
        assert_eq!(Language::from_language_id("rust"), Language::Rust);
        assert_eq!(Language::from_language_id("cobol"), Language::TypeScript);
    }

    #[test]
    fn parses_short_names() {
        assert_eq!("py".parse::<Language>(), Ok(Language::Python));
        assert_eq!("Go".parse::<Language>(), Ok(Language::Go));
        assert!("kotlin".parse::<Language>().is_err());
    }

    #[test]
    fn request_builder() {
        let request = AiRequest::new("let x = 1;", Language::Rust)
            .cursor(4, 2)
            .document("src/main.rs")
            .prompt("simplify");
        assert_eq!(request.cursor.line, 4);
        assert_eq!(request.document.as_str(), "src/main.rs");
        assert_eq!(request.prompt.as_deref(), Some("simplify"));
    }
}
