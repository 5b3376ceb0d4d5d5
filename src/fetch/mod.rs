mod client;
mod basic;
pub mod auth;

pub use client::HttpClient;
pub use basic::BasicClient;

use anyhow::{Context, Result};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Builds a request carrying `body` as JSON.
pub fn json_request<B: Serialize>(method: Method, url: &str, body: &B) -> Result<Request> {
    let mut req = Request::new(
        method,
        url.parse().with_context(|| format!("Invalid URL '{url}'"))?,
    );
    req.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    *req.body_mut() = Some(serde_json::to_vec(body)?.into());
    Ok(req)
}

/// Sends `req` and decodes a successful JSON response.
///
/// # Errors
///
/// Non-2xx responses become an error carrying the status and response body.
pub async fn send_json<C: HttpClient + ?Sized, T: DeserializeOwned>(
    client: &C,
    req: Request,
) -> Result<T> {
    let url = req.url().clone();
    let resp = client
        .execute(req)
        .await
        .with_context(|| format!("Failed to send request to {url}"))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(anyhow::anyhow!("API returned status {}: {}", status, body));
    }

    resp.json()
        .await
        .with_context(|| format!("Failed to parse response from {url}"))
}
