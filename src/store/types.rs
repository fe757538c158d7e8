use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::question::{AnswerCandidate, Category, Question};

/// One question/answer row. Columns missing from the backing store
/// deserialize as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Row {
    /// `scraped-<unix seconds>` for harvested rows.
    pub id: String,
    pub question: String,
    pub answer: String,
    pub industry: String,
    pub experience: String,
    pub tags: String,
    pub source: String,
    /// `YYYY-MM-DD`
    pub date_added: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Row {
    pub fn is_answered(&self) -> bool {
        !self.answer.trim().is_empty()
    }

    /// A freshly harvested row. `answer` is blank when nothing was accepted.
    pub fn harvested(question: &Question, answer: Option<&AnswerCandidate>, now: DateTime<Utc>) -> Self {
        let category = question.category();
        Self {
            id: format!("scraped-{}", now.timestamp()),
            question: question.text().to_string(),
            answer: answer.map(|a| a.text.clone()).unwrap_or_default(),
            industry: category.industry.clone(),
            experience: category.experience.clone(),
            tags: category.tags.clone(),
            source: "scraped".to_string(),
            date_added: now.format("%Y-%m-%d").to_string(),
            link: question.link().map(str::to_string),
        }
    }

    pub fn to_question(&self) -> Question {
        Question::new(
            self.question.clone(),
            self.link.clone(),
            Category {
                industry: self.industry.clone(),
                experience: self.experience.clone(),
                tags: self.tags.clone(),
            },
        )
    }
}
