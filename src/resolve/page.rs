use std::sync::Arc;

use async_trait::async_trait;

use super::{Attempt, Resolver};
use crate::extract::PageExtractor;
use crate::fetch::{Fetch, FetchRequest};
use crate::question::{Question, SourceKind};

/// Scrapes the question's own source page. Highest trust.
pub struct PageResolver {
    fetcher: Arc<dyn Fetch>,
    extractor: PageExtractor,
}

impl PageResolver {
    pub fn new(fetcher: Arc<dyn Fetch>, extractor: PageExtractor) -> Self {
        Self { fetcher, extractor }
    }
}

#[async_trait]
impl Resolver for PageResolver {
    fn kind(&self) -> SourceKind {
        SourceKind::PageScrape
    }

    fn applies_to(&self, question: &Question) -> bool {
        question.link().is_some()
    }

    async fn attempt(&self, question: &Question) -> Attempt {
        let Some(link) = question.link() else {
            return Attempt::Empty;
        };
        match self.fetcher.fetch(&FetchRequest::get(link)).await {
            Ok(html) => Attempt::from_text(self.extractor.extract(&html, Some(link))),
            Err(e) => e.into(),
        }
    }
}
