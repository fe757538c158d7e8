//! Search result parsing: scraped result pages and structured search APIs.

use std::collections::HashSet;

use anyhow::Result;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;

use crate::rules::parse_selector;

/// Result page markup drifts, so several snippet selectors are tried in order.
pub const SNIPPET_SELECTORS: &[&str] = &[
    "div.VwiC3b",
    "span.aCOpRe",
    "div.IsZvec",
    "div[data-sncf='1']",
    "div.BNeawe.s3v9rd.AP7Wnd",
    "span.st",
    ".result__snippet",
];

/// Containers whose snippets are not organic results.
pub const PANEL_SELECTORS: &[&str] = &[
    "#tads",
    "#tadsb",
    "#bottomads",
    "div.kp-wholepage",
    "div.kp-blk",
    "div.knowledge-panel",
    "div.related-question-pair",
    "div[jsname='Cpkphb']",
    "div.commercial-unit-desktop-top",
];

pub const EXCLUSION_MARKERS: &[&str] = &["Ad ", "Sponsored"];

/// Compiled selector table for one search results layout.
pub struct SearchLayout {
    snippets: Vec<Selector>,
    panels: Vec<Selector>,
    exclusions: Vec<&'static str>,
}

impl SearchLayout {
    pub fn new(snippets: &[&str], panels: &[&str], exclusions: &[&'static str]) -> Result<Self> {
        Ok(Self {
            snippets: snippets.iter().map(|s| parse_selector(s)).collect::<Result<_>>()?,
            panels: panels.iter().map(|s| parse_selector(s)).collect::<Result<_>>()?,
            exclusions: exclusions.to_vec(),
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(SNIPPET_SELECTORS, PANEL_SELECTORS, EXCLUSION_MARKERS)
    }

    fn excluded(&self, text: &str) -> bool {
        self.exclusions.iter().any(|m| text.contains(m))
    }

    /// First organic snippet on the page, if any.
    pub fn first_snippet(&self, html: &str) -> Option<String> {
        let doc = Html::parse_document(html);

        let panel_nodes: HashSet<_> = self
            .panels
            .iter()
            .flat_map(|sel| doc.select(sel))
            .map(|el| el.id())
            .collect();
        let in_panel = |el: &ElementRef<'_>| {
            panel_nodes.contains(&el.id()) || el.ancestors().any(|a| panel_nodes.contains(&a.id()))
        };

        for selector in &self.snippets {
            for el in doc.select(selector) {
                let text = el
                    .text()
                    .collect::<String>()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ");
                if text.is_empty() || self.excluded(&text) || in_panel(&el) {
                    continue;
                }
                return Some(text);
            }
        }
        None
    }
}

/// Plain-text preview of a page, for diagnosing selector misses.
pub fn preview(html: &str, max_chars: usize) -> String {
    let text = html2text::from_read(html.as_bytes(), 120).unwrap_or_else(|_| html.to_string());
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    flat.chars().take(max_chars).collect()
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    items: Vec<GoogleItem>,
}

#[derive(Debug, Deserialize)]
struct GoogleItem {
    #[serde(default)]
    snippet: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BingResponse {
    #[serde(rename = "webPages", default)]
    web_pages: Option<BingWebPages>,
}

#[derive(Debug, Deserialize)]
struct BingWebPages {
    #[serde(default)]
    value: Vec<BingResult>,
}

#[derive(Debug, Deserialize)]
struct BingResult {
    #[serde(default)]
    snippet: Option<String>,
}

/// Structured search providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchApi {
    GoogleCustomSearch,
    Bing,
}

impl SearchApi {
    pub fn name(&self) -> &'static str {
        match self {
            SearchApi::GoogleCustomSearch => "google-cse",
            SearchApi::Bing => "bing",
        }
    }

    /// Snippet of the first organic result. `Err` when the payload is not the
    /// provider's JSON shape; `Ok(None)` when it has no usable result.
    pub fn first_snippet(&self, body: &str) -> serde_json::Result<Option<String>> {
        let snippet = match self {
            SearchApi::GoogleCustomSearch => {
                let resp: GoogleResponse = serde_json::from_str(body)?;
                resp.items.into_iter().next().and_then(|i| i.snippet)
            }
            SearchApi::Bing => {
                let resp: BingResponse = serde_json::from_str(body)?;
                resp.web_pages
                    .and_then(|w| w.value.into_iter().next())
                    .and_then(|r| r.snippet)
            }
        };
        Ok(snippet
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()))
    }
}
