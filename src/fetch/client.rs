use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Request, Response};

/// Executes a prepared HTTP request. Lets tests stand in for the real client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

/// `reqwest` client used to download trip files.
///
/// TLC monthly files run to hundreds of megabytes, so only the connect phase
/// is bounded.
pub struct TripFileClient(Client);

impl TripFileClient {
    const USER_AGENT: &'static str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(Self::USER_AGENT)
            .connect_timeout(Self::CONNECT_TIMEOUT)
            .build()?;
        Ok(Self(client))
    }
}

#[async_trait]
impl HttpClient for TripFileClient {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        self.0.execute(req).await
    }
}
