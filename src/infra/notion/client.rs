use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::SyncConfig;
use crate::fetch::auth::ApiKey;
use crate::fetch::{BasicClient, HttpClient, json_request, send_json};
use crate::services::database_api::DatabaseApi;

const PAGE_SIZE: u32 = 100;
const NOTION_VERSION_HEADER: &str = "notion-version";

#[derive(Serialize)]
struct QueryRequest<'a> {
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_cursor: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    results: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Serialize)]
struct CreatePageRequest<'a> {
    parent: Parent<'a>,
    properties: Value,
}

#[derive(Serialize)]
struct Parent<'a> {
    database_id: &'a str,
}

/// [`DatabaseApi`] backed by the Notion REST API.
pub struct NotionClient<C> {
    http: C,
    base_url: String,
    notion_version: HeaderValue,
}

impl NotionClient<ApiKey<BasicClient>> {
    /// Client authenticated with the integration token from `config`.
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let http = ApiKey::bearer(BasicClient::new()?, &config.api_key)?;
        Self::new(http, &config.base_url, &config.notion_version)
    }
}

impl<C: HttpClient> NotionClient<C> {
    pub fn new(http: C, base_url: &str, notion_version: &str) -> Result<Self> {
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            notion_version: HeaderValue::from_str(notion_version)
                .with_context(|| format!("Invalid Notion version '{notion_version}'"))?,
        })
    }

    async fn post<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = json_request(Method::POST, &url, body)?;
        req.headers_mut()
            .insert(HeaderName::from_static(NOTION_VERSION_HEADER), self.notion_version.clone());
        send_json(&self.http, req).await
    }
}

#[async_trait]
impl<C: HttpClient> DatabaseApi for NotionClient<C> {
    async fn query(&self, database_id: &str) -> Result<Vec<Value>> {
        let path = format!("/v1/databases/{database_id}/query");
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let request = QueryRequest {
                page_size: PAGE_SIZE,
                start_cursor: cursor.as_deref(),
            };
            let page: QueryResponse = self
                .post(&path, &request)
                .await
                .context("Failed to query Notion database")?;

            debug!(results = page.results.len(), has_more = page.has_more, "Query page received");
            records.extend(page.results);

            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        Ok(records)
    }

    async fn create(&self, database_id: &str, properties: Value) -> Result<()> {
        let request = CreatePageRequest {
            parent: Parent { database_id },
            properties,
        };
        let _: Value = self
            .post("/v1/pages", &request)
            .await
            .context("Failed to create Notion page")?;
        Ok(())
    }
}
