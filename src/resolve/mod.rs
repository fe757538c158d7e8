//! The answer resolution chain: resolvers tried in fixed priority order, the
//! first accepted candidate wins.

pub mod completion;
pub mod page;
pub mod search;

use std::sync::Arc;

use async_trait::async_trait;

use crate::acceptance::AcceptancePolicy;
use crate::fetch::FetchError;
use crate::question::{AnswerCandidate, Question, SourceKind};
use crate::report::Reporter;

/// Outcome of one resolver attempt. Only `Found` is put to the acceptance
/// policy; everything else falls through to the next resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Found(String),
    Empty,
    Transient(String),
    Fatal(String),
}

impl Attempt {
    pub fn from_text(text: Option<String>) -> Self {
        match text.map(|t| t.trim().to_string()) {
            Some(t) if !t.is_empty() => Attempt::Found(t),
            _ => Attempt::Empty,
        }
    }
}

impl From<FetchError> for Attempt {
    fn from(e: FetchError) -> Self {
        if e.is_retryable() {
            Attempt::Transient(e.to_string())
        } else {
            Attempt::Fatal(e.to_string())
        }
    }
}

#[async_trait]
pub trait Resolver: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Whether this resolver has anything to work with for the question.
    fn applies_to(&self, _question: &Question) -> bool {
        true
    }

    /// Never panics and never propagates errors; failures become `Attempt` tags.
    async fn attempt(&self, question: &Question) -> Attempt;
}

pub struct AnswerChain {
    resolvers: Vec<Box<dyn Resolver>>,
    policy: AcceptancePolicy,
    reporter: Arc<dyn Reporter>,
}

impl AnswerChain {
    /// `resolvers` must already be in priority order.
    pub fn new(
        resolvers: Vec<Box<dyn Resolver>>,
        policy: AcceptancePolicy,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            resolvers,
            policy,
            reporter,
        }
    }

    pub fn kinds(&self) -> Vec<SourceKind> {
        self.resolvers.iter().map(|r| r.kind()).collect()
    }

    pub async fn resolve(&self, question: &Question) -> Option<AnswerCandidate> {
        for resolver in &self.resolvers {
            if !resolver.applies_to(question) {
                continue;
            }
            let kind = resolver.kind();
            self.reporter.attempting(kind, question);

            match resolver.attempt(question).await {
                Attempt::Found(text) => match self.policy.evaluate(kind, &text) {
                    Ok(candidate) => {
                        self.reporter.accepted(&candidate);
                        return Some(candidate);
                    }
                    Err(rejection) => self.reporter.rejected(kind, &rejection),
                },
                other => self.reporter.fell_through(kind, &other),
            }
        }

        self.reporter.exhausted(question);
        None
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{count, Canned};
    use super::*;
    use crate::question::Category;
    use crate::report::testing::RecordingReporter;

    const HASH_TABLE: &str = "A hash table maps keys to values using a hash function for O(1) average lookup and insertion.";

    fn words(n: usize) -> String {
        vec!["answer"; n].join(" ")
    }

    fn linked(text: &str) -> Question {
        Question::new(text, Some("https://example.com/q".into()), Category::default())
    }

    fn chain(resolvers: Vec<Box<dyn Resolver>>, reporter: Arc<RecordingReporter>) -> AnswerChain {
        AnswerChain::new(resolvers, AcceptancePolicy::default(), reporter)
    }

    #[tokio::test]
    async fn test_page_scrape_short_circuits() {
        let page = Canned::new(SourceKind::PageScrape, Attempt::Found(words(20)));
        let snippet = Canned::new(SourceKind::SearchSnippet, Attempt::Found(words(20)));
        let api = Canned::new(SourceKind::SearchApi, Attempt::Found(words(20)));
        let llm = Canned::new(SourceKind::LanguageModel, Attempt::Found(words(20)));
        let counters = [page.counter(), snippet.counter(), api.counter(), llm.counter()];

        let reporter = Arc::new(RecordingReporter::default());
        let chain = chain(
            vec![Box::new(page), Box::new(snippet), Box::new(api), Box::new(llm)],
            reporter.clone(),
        );

        let result = chain.resolve(&linked("What is a trait?")).await.unwrap();
        assert_eq!(result.kind, SourceKind::PageScrape);
        assert_eq!(counters.iter().map(count).collect::<Vec<_>>(), vec![1, 0, 0, 0]);
        assert_eq!(reporter.events(), vec!["attempt page-scrape", "accept page-scrape"]);
    }

    #[tokio::test]
    async fn test_rejected_candidate_falls_through() {
        let page = Canned::new(SourceKind::PageScrape, Attempt::Found(words(10)));
        let snippet = Canned::new(SourceKind::SearchSnippet, Attempt::Found(words(16)));
        let llm = Canned::new(SourceKind::LanguageModel, Attempt::Found(words(30)));
        let (s, l) = (snippet.counter(), llm.counter());

        let reporter = Arc::new(RecordingReporter::default());
        let chain = chain(vec![Box::new(page), Box::new(snippet), Box::new(llm)], reporter.clone());

        let result = chain.resolve(&linked("What is a trait?")).await.unwrap();
        assert_eq!(result.kind, SourceKind::SearchSnippet);
        assert_eq!(result.word_count, 16);
        assert_eq!((count(&s), count(&l)), (1, 0));
        assert_eq!(
            reporter.events(),
            vec![
                "attempt page-scrape",
                "reject page-scrape",
                "attempt search-snippet",
                "accept search-snippet"
            ]
        );
    }

    #[tokio::test]
    async fn test_failures_fall_through_in_order() {
        let page = Canned::new(SourceKind::PageScrape, Attempt::Transient("timeout".into()));
        let snippet = Canned::new(SourceKind::SearchSnippet, Attempt::Fatal("HTTP 403".into()));
        let api = Canned::new(SourceKind::SearchApi, Attempt::Empty);
        let llm = Canned::new(SourceKind::LanguageModel, Attempt::Found(words(15)));

        let reporter = Arc::new(RecordingReporter::default());
        let chain = chain(
            vec![Box::new(page), Box::new(snippet), Box::new(api), Box::new(llm)],
            reporter.clone(),
        );

        let result = chain.resolve(&linked("What is a trait?")).await.unwrap();
        assert_eq!(result.kind, SourceKind::LanguageModel);
        assert_eq!(
            reporter.events(),
            vec![
                "attempt page-scrape",
                "empty page-scrape",
                "attempt search-snippet",
                "empty search-snippet",
                "attempt search-api",
                "empty search-api",
                "attempt language-model",
                "accept language-model"
            ]
        );
    }

    #[tokio::test]
    async fn test_hash_table_scenario() {
        let page = Canned::new(SourceKind::PageScrape, Attempt::Found(words(30)));
        let snippet = Canned::new(SourceKind::SearchSnippet, Attempt::Found(HASH_TABLE.into()));
        let llm = Canned::new(SourceKind::LanguageModel, Attempt::Found(words(30)));
        let (p, l) = (page.counter(), llm.counter());

        let reporter = Arc::new(RecordingReporter::default());
        let chain = chain(vec![Box::new(page), Box::new(snippet), Box::new(llm)], reporter);

        let question = Question::new("What is a hash table?", None, Category::default());
        let result = chain.resolve(&question).await.unwrap();
        assert_eq!(result.text, HASH_TABLE);
        assert_eq!(result.kind, SourceKind::SearchSnippet);
        assert_eq!(result.word_count, 17);
        assert_eq!((count(&p), count(&l)), (0, 0));
    }

    #[tokio::test]
    async fn test_total_exhaustion() {
        let reporter = Arc::new(RecordingReporter::default());
        let chain = chain(
            vec![
                Box::new(Canned::new(SourceKind::PageScrape, Attempt::Empty)),
                Box::new(Canned::new(SourceKind::SearchSnippet, Attempt::Empty)),
                Box::new(Canned::new(SourceKind::SearchApi, Attempt::Empty)),
                Box::new(Canned::new(SourceKind::LanguageModel, Attempt::Empty)),
            ],
            reporter.clone(),
        );

        assert_eq!(chain.resolve(&linked("What is a trait?")).await, None);
        assert_eq!(reporter.events().last().unwrap(), "exhausted");
    }

    #[test]
    fn test_fetch_error_tagging() {
        assert!(matches!(Attempt::from(FetchError::Timeout), Attempt::Transient(_)));
        assert!(matches!(
            Attempt::from(FetchError::Status { status: 404 }),
            Attempt::Fatal(_)
        ));
        assert_eq!(Attempt::from_text(Some("  ".into())), Attempt::Empty);
        assert_eq!(Attempt::from_text(Some(" x ".into())), Attempt::Found("x".into()));
    }
}
