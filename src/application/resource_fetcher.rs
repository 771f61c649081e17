// Resource fetching for dashboard documents
use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Read the resource at `url` as UTF-8 text
    async fn read_text(&self, url: &str) -> anyhow::Result<String>;

    /// Read the resource at `url` as a JSON document. Parse failures keep the
    /// `serde_json::Error` as their source.
    async fn read_json(&self, url: &str) -> anyhow::Result<Value> {
        let text = self.read_text(url).await?;
        serde_json::from_str(&text).with_context(|| format!("{} is not JSON", url))
    }
}
