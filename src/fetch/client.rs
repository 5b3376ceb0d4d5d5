use async_trait::async_trait;
use reqwest::{Request, Response};

/// Sends a prepared request. Implementations may decorate the request on the way out.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
