use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use scraper::{ElementRef, Html, Selector};
use tracing::{error, info, warn};
use url::Url;

use crate::fetch::{Fetch, FetchRequest};
use crate::question::{Category, Question};
use crate::rules::{parse_selector, Join, Rule, RuleSpec, TextFilter};

/// List items must be at least this long to count as questions.
const LIST_ITEM_MIN_CHARS: usize = 15;

/// A listing page and the heading selectors its questions live under.
#[derive(Debug, Clone, Copy)]
pub struct SourceSpec {
    pub url: &'static str,
    pub headings: &'static [&'static str],
    pub industry: &'static str,
    pub experience: &'static str,
    pub tags: &'static str,
}

impl SourceSpec {
    pub fn category(&self) -> Category {
        Category {
            industry: self.industry.to_string(),
            experience: self.experience.to_string(),
            tags: self.tags.to_string(),
        }
    }
}

pub const DEFAULT_SOURCES: &[SourceSpec] = &[
    SourceSpec {
        url: "https://www.interviewbit.com/data-science-interview-questions/",
        headings: &[".question-title", "h3"],
        industry: "Tech",
        experience: "all",
        tags: "auto-generated",
    },
    SourceSpec {
        url: "https://www.geeksforgeeks.org/python-interview-questions/",
        headings: &["article h2", "article h3"],
        industry: "Tech",
        experience: "all",
        tags: "auto-generated",
    },
];

fn heading_rule(selector: &'static str) -> RuleSpec {
    RuleSpec::filtered(selector, Join::Inline, TextFilter::QuestionLike { min_chars: 0 })
}

const LIST_ITEM_RULE: RuleSpec = RuleSpec::filtered(
    "li",
    Join::Inline,
    TextFilter::QuestionLike {
        min_chars: LIST_ITEM_MIN_CHARS,
    },
);

/// Pulls (question, link) pairs off one listing page: the first heading
/// selector with any question-like match wins, list items are the fallback.
pub fn discover(html: &str, source: &SourceSpec) -> Result<Vec<(String, Option<String>)>> {
    let doc = Html::parse_document(html);
    let base = Url::parse(source.url)?;
    let anchor = parse_selector("a[href]")?;

    let mut rules = source
        .headings
        .iter()
        .copied()
        .map(|s| Rule::compile(heading_rule(s)))
        .collect::<Result<Vec<_>>>()?;
    rules.push(Rule::compile(LIST_ITEM_RULE)?);

    for rule in &rules {
        let found = rule.matches(&doc);
        if found.is_empty() {
            continue;
        }
        return Ok(found
            .into_iter()
            .map(|(el, text)| (text, link_of(el, &anchor, &base)))
            .collect());
    }
    Ok(Vec::new())
}

/// Absolute link for a matched element: its own href, a nested anchor, or an
/// enclosing anchor. In-page anchors back into the listing itself are dropped,
/// since fetching them returns the whole listing.
fn link_of(el: ElementRef<'_>, anchor: &Selector, base: &Url) -> Option<String> {
    let href = if el.value().name() == "a" {
        el.value().attr("href")
    } else if let Some(a) = el.select(anchor).next() {
        a.value().attr("href")
    } else {
        el.ancestors()
            .filter_map(ElementRef::wrap)
            .find(|a| a.value().name() == "a")
            .and_then(|a| a.value().attr("href"))
    }?;

    let url = base.join(href.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || same_page(&url, base) {
        return None;
    }
    Some(url.to_string())
}

fn same_page(url: &Url, base: &Url) -> bool {
    let mut a = url.clone();
    let mut b = base.clone();
    a.set_fragment(None);
    b.set_fragment(None);
    a == b
}

pub struct Ingestor {
    fetcher: Arc<dyn Fetch>,
}

impl Ingestor {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self { fetcher }
    }

    /// Questions from every source, deduplicated by digest. A source that
    /// cannot be fetched or parsed is skipped.
    pub async fn ingest(&self, sources: &[SourceSpec]) -> Vec<Question> {
        let mut seen = HashSet::new();
        let mut questions = Vec::new();

        for source in sources {
            let html = match self.fetcher.fetch(&FetchRequest::get(source.url)).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(url = source.url, error = %e, "Skipping source");
                    continue;
                }
            };

            let found = match discover(&html, source) {
                Ok(found) => found,
                Err(e) => {
                    error!(url = source.url, error = %e, "Bad source configuration");
                    continue;
                }
            };

            let before = questions.len();
            for (text, link) in found {
                let question = Question::new(text, link, source.category());
                if seen.insert(question.digest()) {
                    questions.push(question);
                }
            }
            info!(
                url = source.url,
                count = questions.len() - before,
                "Questions discovered"
            );
        }

        questions
    }
}
