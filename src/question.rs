use std::fmt;

use serde::{Deserialize, Serialize};

/// BLAKE3 hex digest of the normalized question text.
pub type Digest = String;

/// Opaque metadata carried from the source listing into the store row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub industry: String,
    pub experience: String,
    pub tags: String,
}

impl Default for Category {
    fn default() -> Self {
        Self {
            industry: "Tech".to_string(),
            experience: "all".to_string(),
            tags: "auto-generated".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    text: String,
    link: Option<String>,
    category: Category,
}

impl Question {
    pub fn new(text: impl Into<String>, link: Option<String>, category: Category) -> Self {
        Self {
            text: text.into().trim().to_string(),
            link: link.filter(|l| !l.trim().is_empty()),
            category,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn digest(&self) -> Digest {
        digest(&self.text)
    }
}

/// Lowercase, trim and collapse whitespace so cosmetic differences dedup together.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn digest(text: &str) -> Digest {
    blake3::hash(normalize(text).as_bytes()).to_hex().to_string()
}

/// Where an answer came from, in descending order of trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    PageScrape,
    SearchSnippet,
    SearchApi,
    LanguageModel,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::PageScrape => "page-scrape",
            SourceKind::SearchSnippet => "search-snippet",
            SourceKind::SearchApi => "search-api",
            SourceKind::LanguageModel => "language-model",
        };
        f.write_str(name)
    }
}

/// An answer that passed the acceptance policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerCandidate {
    pub text: String,
    pub kind: SourceKind,
    pub word_count: usize,
}
