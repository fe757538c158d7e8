use async_trait::async_trait;

use super::{Attempt, Resolver};
use crate::llm::{LlmClient, Message, SYSTEM_PROMPT};
use crate::question::{Question, SourceKind};

/// Generative completion. Lowest trust, always last.
pub struct CompletionResolver {
    llm: LlmClient,
}

impl CompletionResolver {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    fn prompt(question: &Question) -> Vec<Message> {
        vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(format!("Q: {}\nA:", question.text())),
        ]
    }
}

#[async_trait]
impl Resolver for CompletionResolver {
    fn kind(&self) -> SourceKind {
        SourceKind::LanguageModel
    }

    async fn attempt(&self, question: &Question) -> Attempt {
        // No credential: skip without touching the network.
        if !self.llm.is_configured() {
            return Attempt::Empty;
        }
        match self.llm.chat(&Self::prompt(question)).await {
            Ok(text) => Attempt::from_text(Some(text)),
            Err(e) => e.into(),
        }
    }
}
