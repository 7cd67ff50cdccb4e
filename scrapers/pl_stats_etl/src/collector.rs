use std::time::Duration;
use tracing::{debug, info};

use crate::{
    config::{ScrapingConfig, SourceConfig},
    datasets::DatasetRule,
    error::{EtlError, Result},
    types::Dataset,
};

pub struct Collector {
    client: reqwest::Client,
    sources: SourceConfig,
}

impl Collector {
    pub fn new(scraping: &ScrapingConfig, sources: SourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&scraping.user_agent)
            .timeout(Duration::from_secs(scraping.request_timeout_secs))
            .build()
            .map_err(|e| EtlError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, sources })
    }

    pub async fn fetch(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        let fetch_error = |source: reqwest::Error| EtlError::Fetch {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(fetch_error)?
            .error_for_status()
            .map_err(fetch_error)?;

        response.text().await.map_err(fetch_error)
    }

    /// Fetches every page of the rule, then parses them into one dataset.
    pub async fn collect(&self, rule: &DatasetRule) -> Result<Dataset> {
        let urls = rule.urls(&self.sources);
        let mut pages = Vec::with_capacity(urls.len());
        for url in &urls {
            pages.push(self.fetch(url).await?);
        }

        let dataset = rule.parse_pages(&pages)?;
        info!(
            "Collected {} ({} rows from {} page(s))",
            dataset.name,
            dataset.len(),
            urls.len()
        );
        Ok(dataset)
    }

    pub async fn collect_all(&self, rules: &[DatasetRule]) -> Result<Vec<Dataset>> {
        let mut datasets = Vec::with_capacity(rules.len());
        for rule in rules {
            datasets.push(self.collect(rule).await?);
        }
        Ok(datasets)
    }
}
