use crate::question::{AnswerCandidate, SourceKind};

/// Phrases that mark a non-answer: apologies, uncertainty, placeholder text.
const REJECT_MARKERS: &[&str] = &[
    "sorry",
    "don't know",
    "don’t know",
    "do not know",
    "i apologize",
    "i'm not sure",
    "i am not sure",
    "i cannot answer",
    "unable to answer",
    "answer not available",
];

pub const DEFAULT_MIN_WORDS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("blank answer")]
    Blank,
    #[error("too short ({words} words, need {min})")]
    TooShort { words: usize, min: usize },
    #[error("contains flagged phrase {0:?}")]
    Flagged(String),
}

/// Quality gate applied uniformly to every resolver's output.
#[derive(Debug, Clone)]
pub struct AcceptancePolicy {
    pub min_words: usize,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self {
            min_words: DEFAULT_MIN_WORDS,
        }
    }
}

impl AcceptancePolicy {
    pub fn new(min_words: usize) -> Self {
        Self { min_words }
    }

    pub fn evaluate(&self, kind: SourceKind, text: &str) -> Result<AnswerCandidate, Rejection> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Rejection::Blank);
        }

        let lower = text.to_lowercase();
        if let Some(marker) = REJECT_MARKERS.iter().find(|m| lower.contains(*m)) {
            return Err(Rejection::Flagged(marker.to_string()));
        }

        let words = text.split_whitespace().count();
        if words < self.min_words {
            return Err(Rejection::TooShort {
                words,
                min: self.min_words,
            });
        }

        Ok(AnswerCandidate {
            text: text.to_string(),
            kind,
            word_count: words,
        })
    }
}
