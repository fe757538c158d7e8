use anyhow::Result;
use scraper::Html;
use tracing::debug;

use crate::rules::{first_match, Join, Rule, RuleSpec};

/// Rule table for one known site, selected by host.
pub struct SourceLayout {
    pub host: &'static str,
    pub rules: &'static [RuleSpec],
}

/// Site-specific layouts, tried before the generic rules.
pub const SITE_LAYOUTS: &[SourceLayout] = &[
    SourceLayout {
        host: "interviewbit.com",
        rules: &[
            RuleSpec::new("div.answer-text", Join::Lines),
            RuleSpec::new("section.ibpage-article-content", Join::Blocks("p, pre, li")),
        ],
    },
    SourceLayout {
        host: "geeksforgeeks.org",
        rules: &[
            RuleSpec::new("div.article--viewer_content div.text", Join::Blocks("p, pre")),
            RuleSpec::new("div.text", Join::Blocks("p, pre")),
        ],
    },
];

/// Generic rules, in priority order.
pub const GENERIC_RULES: &[RuleSpec] = &[
    RuleSpec::new("div.answer-text", Join::Lines),
    RuleSpec::new("div.content", Join::Blocks("p, pre")),
    RuleSpec::new("article", Join::Rendered),
];

struct CompiledLayout {
    host: &'static str,
    rules: Vec<Rule>,
}

/// Turns one fetched page into at most one answer text.
pub struct PageExtractor {
    layouts: Vec<CompiledLayout>,
    generic: Vec<Rule>,
}

impl PageExtractor {
    pub fn new(layouts: &[SourceLayout], generic: &[RuleSpec]) -> Result<Self> {
        let layouts = layouts
            .iter()
            .map(|l| {
                Ok(CompiledLayout {
                    host: l.host,
                    rules: Rule::compile_all(l.rules)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            layouts,
            generic: Rule::compile_all(generic)?,
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(SITE_LAYOUTS, GENERIC_RULES)
    }

    fn layout_for(&self, source_hint: Option<&str>) -> Option<&CompiledLayout> {
        let host = source_hint
            .and_then(|hint| url::Url::parse(hint).ok())
            .and_then(|u| u.host_str().map(str::to_lowercase))?;
        self.layouts
            .iter()
            .find(|l| host == l.host || host.ends_with(&format!(".{}", l.host)))
    }

    /// First non-empty rule output, site layout first. `None` means fall through.
    pub fn extract(&self, html: &str, source_hint: Option<&str>) -> Option<String> {
        let doc = Html::parse_document(html);

        if let Some(layout) = self.layout_for(source_hint) {
            if let Some(text) = first_match(&layout.rules, &doc) {
                debug!(host = layout.host, "Matched site layout");
                return Some(text);
            }
        }

        first_match(&self.generic, &doc)
    }
}
