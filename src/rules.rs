//! Declarative structural extraction rules shared by the page extractor and
//! question ingestion. A rule is a CSS selector, a way of joining the text of
//! a matched element, and a filter the joined text must pass.

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};

/// Width used when rendering HTML blocks to plain text.
const RENDER_WIDTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Join {
    /// Every text node trimmed, joined by newlines.
    Lines,
    /// Blocks matched by the inner selector, joined by blank lines.
    Blocks(&'static str),
    /// The element rendered to plain text.
    Rendered,
    /// All text concatenated and trimmed (headings, list items).
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFilter {
    Any,
    /// Contains a `?` and is longer than `min_chars`.
    QuestionLike { min_chars: usize },
}

impl TextFilter {
    pub fn accepts(&self, text: &str) -> bool {
        match self {
            TextFilter::Any => true,
            TextFilter::QuestionLike { min_chars } => {
                text.contains('?') && text.chars().count() > *min_chars
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSpec {
    pub selector: &'static str,
    pub join: Join,
    pub filter: TextFilter,
}

impl RuleSpec {
    pub const fn new(selector: &'static str, join: Join) -> Self {
        Self {
            selector,
            join,
            filter: TextFilter::Any,
        }
    }

    pub const fn filtered(selector: &'static str, join: Join, filter: TextFilter) -> Self {
        Self {
            selector,
            join,
            filter,
        }
    }
}

pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("invalid selector {:?}: {:?}", selector, e))
}

/// A compiled [`RuleSpec`].
#[derive(Debug, Clone)]
pub struct Rule {
    spec: RuleSpec,
    selector: Selector,
    inner: Option<Selector>,
}

impl Rule {
    pub fn compile(spec: RuleSpec) -> Result<Self> {
        let inner = match spec.join {
            Join::Blocks(inner) => Some(parse_selector(inner)?),
            _ => None,
        };
        Ok(Self {
            spec,
            selector: parse_selector(spec.selector)?,
            inner,
        })
    }

    pub fn compile_all(specs: &[RuleSpec]) -> Result<Vec<Self>> {
        specs.iter().copied().map(Self::compile).collect()
    }

    fn text_of(&self, el: ElementRef<'_>) -> String {
        match (self.spec.join, &self.inner) {
            (Join::Blocks(_), Some(inner)) => el
                .select(inner)
                .map(|block| block.text().collect::<String>().trim().to_string())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n\n"),
            (Join::Rendered, _) => html2text::from_read(el.html().as_bytes(), RENDER_WIDTH)
                .unwrap_or_else(|_| el.text().collect::<String>())
                .trim()
                .to_string(),
            (Join::Inline, _) => el
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" "),
            _ => el
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    fn keep(&self, text: &str) -> bool {
        !text.trim().is_empty() && self.spec.filter.accepts(text)
    }

    /// Text of the first matching element that survives the filter.
    pub fn first_text(&self, doc: &Html) -> Option<String> {
        doc.select(&self.selector)
            .map(|el| self.text_of(el))
            .find(|t| self.keep(t))
    }

    /// Every matching element whose text survives the filter.
    pub fn matches<'a>(&self, doc: &'a Html) -> Vec<(ElementRef<'a>, String)> {
        doc.select(&self.selector)
            .map(|el| (el, self.text_of(el)))
            .filter(|(_, t)| self.keep(t))
            .collect()
    }
}

/// First rule (in order) with a non-empty result wins.
pub fn first_match(rules: &[Rule], doc: &Html) -> Option<String> {
    rules.iter().find_map(|rule| rule.first_text(doc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_join() {
        let doc = Html::parse_document("<div class='a'> one <b>two</b>\n <i> </i>three </div>");
        let rule = Rule::compile(RuleSpec::new("div.a", Join::Lines)).unwrap();
        assert_eq!(rule.first_text(&doc).unwrap(), "one\ntwo\nthree");
    }

    #[test]
    fn test_blocks_join() {
        let doc = Html::parse_document(
            "<div class='content'><p>First para.</p><span>skip</span><p> </p><pre>let x = 1;</pre></div>",
        );
        let rule = Rule::compile(RuleSpec::new("div.content", Join::Blocks("p, pre"))).unwrap();
        assert_eq!(rule.first_text(&doc).unwrap(), "First para.\n\nlet x = 1;");
    }

    #[test]
    fn test_question_filter() {
        let doc = Html::parse_document(
            "<ul><li>Home</li><li>Why?</li><li>What is a closure in Rust?</li></ul>",
        );
        let rule = Rule::compile(RuleSpec::filtered(
            "li",
            Join::Inline,
            TextFilter::QuestionLike { min_chars: 15 },
        ))
        .unwrap();
        let found: Vec<String> = rule.matches(&doc).into_iter().map(|(_, t)| t).collect();
        assert_eq!(found, vec!["What is a closure in Rust?".to_string()]);
    }

    #[test]
    fn test_empty_match_falls_to_next_rule() {
        let doc = Html::parse_document("<div class='a'>  </div><article><p>Body text</p></article>");
        let rules = Rule::compile_all(&[
            RuleSpec::new("div.a", Join::Lines),
            RuleSpec::new("article", Join::Lines),
        ])
        .unwrap();
        assert_eq!(first_match(&rules, &doc).unwrap(), "Body text");
    }

    #[test]
    fn test_invalid_selector_rejected() {
        assert!(Rule::compile(RuleSpec::new("div[", Join::Lines)).is_err());
    }
}
