// Resource fetcher over HTTP(S) and the local filesystem
use crate::application::resource_fetcher::ResourceFetcher;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

/// Where a dashboard document lives.
#[derive(Debug, PartialEq)]
enum Location {
    Remote(String),
    Local(PathBuf),
}

impl Location {
    fn parse(url: &str) -> Self {
        if url.starts_with("http://") || url.starts_with("https://") {
            Location::Remote(url.to_string())
        } else {
            Location::Local(PathBuf::from(url.strip_prefix("file://").unwrap_or(url)))
        }
    }
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn read_text(&self, url: &str) -> Result<String> {
        match Location::parse(url) {
            Location::Remote(url) => {
                let response = self
                    .client
                    .get(&url)
                    .header("Accept", "application/json")
                    .send()
                    .await
                    .with_context(|| format!("Failed to send request to {}", url))?;

                if !response.status().is_success() {
                    anyhow::bail!("Request to {} failed with status {}", url, response.status());
                }

                response
                    .text()
                    .await
                    .with_context(|| format!("Failed to read response body from {}", url))
            }
            Location::Local(path) => tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display())),
        }
    }
}
