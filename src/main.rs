mod acceptance;
mod config;
mod extract;
mod fetch;
mod ingest;
mod llm;
mod pipeline;
mod question;
mod report;
mod resolve;
mod rules;
mod search;
mod store;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use acceptance::AcceptancePolicy;
use config::Config;
use extract::PageExtractor;
use fetch::{Fetch, HttpFetcher, RetryPolicy};
use ingest::{Ingestor, DEFAULT_SOURCES};
use llm::LlmClient;
use pipeline::Pipeline;
use report::TracingReporter;
use resolve::completion::CompletionResolver;
use resolve::page::PageResolver;
use resolve::search::{ApiResolver, SnippetResolver};
use resolve::{AnswerChain, Resolver};
use search::SearchLayout;
use store::jsonl::JsonlSheet;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load env
    let _ = dotenv::dotenv();
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let fetcher: Arc<dyn Fetch> =
        Arc::new(HttpFetcher::new(RetryPolicy::default(), config.request_pause)?);

    // Fixed priority: source page, search snippet, search APIs, language model.
    let mut resolvers: Vec<Box<dyn Resolver>> = vec![
        Box::new(PageResolver::new(fetcher.clone(), PageExtractor::with_defaults()?)),
        Box::new(SnippetResolver::new(
            fetcher.clone(),
            config.search_url.clone(),
            SearchLayout::with_defaults()?,
        )),
    ];
    if let Some(google) = config.google.clone() {
        resolvers.push(Box::new(ApiResolver::google(fetcher.clone(), google.api_key, google.cx)));
    }
    if let Some(key) = config.bing_api_key.clone() {
        resolvers.push(Box::new(ApiResolver::bing(fetcher.clone(), key)));
    }
    let llm = LlmClient::new(fetcher.clone(), config.llm.clone());
    if !llm.is_configured() {
        info!("No language model key configured, completions disabled");
    }
    resolvers.push(Box::new(CompletionResolver::new(llm)));

    let chain = AnswerChain::new(
        resolvers,
        AcceptancePolicy::new(config.min_answer_words),
        Arc::new(TracingReporter),
    );
    info!(resolvers = ?chain.kinds(), "Answer chain ready");

    let sheet = JsonlSheet::open(&config.store_path)
        .await
        .with_context(|| format!("Failed to open store at {}", config.store_path.display()))?;
    info!(path = %config.store_path.display(), "Store opened");

    let pipeline = Pipeline::new(
        chain,
        Ingestor::new(fetcher),
        Arc::new(sheet),
        DEFAULT_SOURCES.to_vec(),
        config.write_pause,
    );
    pipeline.run().await.context("Store unavailable")?;

    Ok(())
}
