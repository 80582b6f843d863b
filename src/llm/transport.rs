use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::config::BackendConfig;
use crate::models::RetrievedPassage;

/// Generation body as it arrives off the wire.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// The two remote calls a turn makes. Single attempt each, no retry.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch up to `limit` passages for `query`, in the order the endpoint
    /// ranked them.
    async fn retrieve(
        &self,
        query: &str,
        api_key: &str,
        limit: u8,
    ) -> Result<Vec<RetrievedPassage>>;

    /// Start generation. Fails only if the endpoint rejects the request
    /// before streaming; the returned body can still fail mid-read.
    async fn generate(&self, prompt: &str, api_key: &str) -> Result<ByteStream>;
}

// ─── HTTP implementation ─────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    api_key: &'a str,
    matches: u8,
}

/// Row shape fixed by the retrieval endpoint.
#[derive(Deserialize)]
struct PassageRow {
    content: String,
    #[serde(default)]
    essay_title: String,
    #[serde(default)]
    essay_date: String,
    #[serde(default)]
    essay_url: String,
}

impl From<PassageRow> for RetrievedPassage {
    fn from(row: PassageRow) -> Self {
        Self {
            content: row.content,
            title: row.essay_title,
            url: row.essay_url,
            date: row.essay_date,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnswerRequest<'a> {
    prompt: &'a str,
    api_key: &'a str,
}

/// Talks to the backend's `/api/search` and `/api/answer` routes.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, config: &BackendConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn retrieve(
        &self,
        query: &str,
        api_key: &str,
        limit: u8,
    ) -> Result<Vec<RetrievedPassage>> {
        let url = format!("{}/api/search", self.base_url);

        let req = SearchRequest {
            query,
            api_key,
            matches: limit,
        };

        let resp = self
            .client
            .post(&url)
            .json(&req)
            .send()
            .await
            .context("Failed to call search API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Search API returned {status}: {body}");
        }

        let rows: Vec<PassageRow> = resp
            .json()
            .await
            .context("Failed to parse search response")?;

        Ok(rows.into_iter().map(RetrievedPassage::from).collect())
    }

    async fn generate(&self, prompt: &str, api_key: &str) -> Result<ByteStream> {
        let url = format!("{}/api/answer", self.base_url);

        let resp = self
            .client
            .post(&url)
            .json(&AnswerRequest { prompt, api_key })
            .send()
            .await
            .context("Failed to call answer API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Answer API returned {status}: {body}");
        }

        let stream = resp
            .bytes_stream()
            .map(|chunk| chunk.context("Answer stream read error"));

        Ok(Box::pin(stream))
    }
}
