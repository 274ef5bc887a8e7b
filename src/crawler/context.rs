//! Crawl context shared by every worker
//!
//! Built once at startup and never mutated afterwards. Cancellation is the
//! only signal that flows through it, and that goes through the token.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::fetcher::build_http_client;
use crate::index::Tokenizer;
use crate::storage::SharedStorage;
use crate::SpiderError;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

pub struct CrawlContext {
    pub crawler: CrawlerConfig,
    pub client: Client,
    pub storage: SharedStorage,
    pub tokenizer: Tokenizer,
    pub cancel: CancellationToken,
}

impl CrawlContext {
    /// Builds the context from configuration, including the HTTP client
    pub fn new(
        config: &Config,
        storage: SharedStorage,
        cancel: CancellationToken,
    ) -> Result<Self, SpiderError> {
        let client = build_http_client(&config.user_agent, &config.crawler)?;
        Ok(Self::with_client(config.crawler.clone(), client, storage, cancel))
    }

    /// Builds the context around an existing client
    pub fn with_client(
        crawler: CrawlerConfig,
        client: Client,
        storage: SharedStorage,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            tokenizer: Tokenizer::new(crawler.fold_case),
            crawler,
            client,
            storage,
            cancel,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
