use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{Attempt, Resolver};
use crate::fetch::{Fetch, FetchRequest};
use crate::question::{Question, SourceKind};
use crate::search::{preview, SearchApi, SearchLayout};

pub const DEFAULT_SEARCH_URL: &str = "https://www.google.com/search";
const GOOGLE_CSE_URL: &str = "https://www.googleapis.com/customsearch/v1";
const BING_SEARCH_URL: &str = "https://api.bing.microsoft.com/v7.0/search";
const PREVIEW_CHARS: usize = 500;
const API_TIMEOUT: Duration = Duration::from_secs(10);

/// Scrapes the first organic snippet off a search results page.
pub struct SnippetResolver {
    fetcher: Arc<dyn Fetch>,
    search_url: String,
    layout: SearchLayout,
}

impl SnippetResolver {
    pub fn new(fetcher: Arc<dyn Fetch>, search_url: impl Into<String>, layout: SearchLayout) -> Self {
        Self {
            fetcher,
            search_url: search_url.into(),
            layout,
        }
    }
}

#[async_trait]
impl Resolver for SnippetResolver {
    fn kind(&self) -> SourceKind {
        SourceKind::SearchSnippet
    }

    async fn attempt(&self, question: &Question) -> Attempt {
        let req = FetchRequest::get(&self.search_url)
            .query("q", question.text())
            .query("hl", "en");

        let html = match self.fetcher.fetch(&req).await {
            Ok(html) => html,
            Err(e) => return e.into(),
        };

        let snippet = self.layout.first_snippet(&html);
        if snippet.is_none() {
            debug!(
                preview = %preview(&html, PREVIEW_CHARS),
                "No snippet selector matched"
            );
        }
        Attempt::from_text(snippet)
    }
}

enum Credentials {
    Google { api_key: String, cx: String },
    Bing { api_key: String },
}

/// Structured search API: first organic result's snippet field.
pub struct ApiResolver {
    fetcher: Arc<dyn Fetch>,
    credentials: Credentials,
}

impl ApiResolver {
    pub fn google(fetcher: Arc<dyn Fetch>, api_key: String, cx: String) -> Self {
        Self {
            fetcher,
            credentials: Credentials::Google { api_key, cx },
        }
    }

    pub fn bing(fetcher: Arc<dyn Fetch>, api_key: String) -> Self {
        Self {
            fetcher,
            credentials: Credentials::Bing { api_key },
        }
    }

    pub fn api(&self) -> SearchApi {
        match self.credentials {
            Credentials::Google { .. } => SearchApi::GoogleCustomSearch,
            Credentials::Bing { .. } => SearchApi::Bing,
        }
    }

    fn request(&self, query: &str) -> FetchRequest {
        let req = match &self.credentials {
            Credentials::Google { api_key, cx } => FetchRequest::get(GOOGLE_CSE_URL)
                .query("key", api_key.as_str())
                .query("cx", cx.as_str())
                .query("q", query)
                .query("num", "1"),
            Credentials::Bing { api_key } => FetchRequest::get(BING_SEARCH_URL)
                .header("Ocp-Apim-Subscription-Key", api_key.as_str())
                .query("q", query)
                .query("count", "1"),
        };
        req.timeout(API_TIMEOUT)
    }
}

#[async_trait]
impl Resolver for ApiResolver {
    fn kind(&self) -> SourceKind {
        SourceKind::SearchApi
    }

    async fn attempt(&self, question: &Question) -> Attempt {
        let api = self.api();
        let body = match self.fetcher.fetch(&self.request(question.text())).await {
            Ok(body) => body,
            Err(e) => return e.into(),
        };

        match api.first_snippet(&body) {
            Ok(snippet) => Attempt::from_text(snippet),
            Err(e) => Attempt::Fatal(format!("{} returned malformed JSON: {}", api.name(), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticFetcher;
    use crate::fetch::FetchError;
    use crate::question::Category;

    fn question() -> Question {
        Question::new("What is a hash table?", None, Category::default())
    }

    #[tokio::test]
    async fn test_snippet_query_and_extraction() {
        let fetcher = Arc::new(StaticFetcher::default().page(
            DEFAULT_SEARCH_URL,
            r#"<div class="g"><div class="VwiC3b">A hash table maps keys to values.</div></div>"#,
        ));
        let r = SnippetResolver::new(fetcher.clone(), DEFAULT_SEARCH_URL, SearchLayout::with_defaults().unwrap());

        assert_eq!(
            r.attempt(&question()).await,
            Attempt::Found("A hash table maps keys to values.".into())
        );
        let reqs = fetcher.requests();
        assert_eq!(reqs.len(), 1);
        assert!(reqs[0]
            .query
            .contains(&("q".to_string(), "What is a hash table?".to_string())));
    }

    #[tokio::test]
    async fn test_snippet_miss_is_empty() {
        let fetcher = Arc::new(StaticFetcher::default().page(DEFAULT_SEARCH_URL, "<p>unusual traffic</p>"));
        let r = SnippetResolver::new(fetcher, DEFAULT_SEARCH_URL, SearchLayout::with_defaults().unwrap());
        assert_eq!(r.attempt(&question()).await, Attempt::Empty);
    }

    #[tokio::test]
    async fn test_rate_limited_search_is_transient() {
        let fetcher = Arc::new(
            StaticFetcher::default().failing(DEFAULT_SEARCH_URL, FetchError::Status { status: 429 }),
        );
        let r = SnippetResolver::new(fetcher, DEFAULT_SEARCH_URL, SearchLayout::with_defaults().unwrap());
        assert!(matches!(r.attempt(&question()).await, Attempt::Transient(_)));
    }

    #[tokio::test]
    async fn test_google_api_request_and_snippet() {
        let fetcher = Arc::new(StaticFetcher::default().page(
            GOOGLE_CSE_URL,
            r#"{"items":[{"snippet":"Hash tables offer constant time lookup."}]}"#,
        ));
        let r = ApiResolver::google(fetcher.clone(), "key".into(), "cx-id".into());

        assert_eq!(
            r.attempt(&question()).await,
            Attempt::Found("Hash tables offer constant time lookup.".into())
        );
        let reqs = fetcher.requests();
        let req = &reqs[0];
        assert!(req.query.contains(&("cx".to_string(), "cx-id".to_string())));
        assert!(req.query.contains(&("num".to_string(), "1".to_string())));
    }

    #[tokio::test]
    async fn test_bing_api_sends_key_header() {
        let fetcher = Arc::new(StaticFetcher::default().page(
            BING_SEARCH_URL,
            r#"{"webPages":{"value":[{"snippet":"From Bing."}]}}"#,
        ));
        let r = ApiResolver::bing(fetcher.clone(), "bing-key".into());

        assert_eq!(r.attempt(&question()).await, Attempt::Found("From Bing.".into()));
        assert!(fetcher.requests()[0]
            .headers
            .contains(&("Ocp-Apim-Subscription-Key".to_string(), "bing-key".to_string())));
    }

    #[tokio::test]
    async fn test_malformed_api_payload_is_fatal() {
        let fetcher = Arc::new(StaticFetcher::default().page(BING_SEARCH_URL, "<html>error</html>"));
        let r = ApiResolver::bing(fetcher, "bing-key".into());
        assert!(matches!(r.attempt(&question()).await, Attempt::Fatal(_)));
    }
}
