use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument};

use crate::error::{MaintainerError, Result};
use crate::models::{Candidate, RequireResponse};

/// Default timeout for a single inventory call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Upper bound on how much of an error body ends up in a log line
const MAX_LOGGED_BODY: usize = 512;

/// Operations the maintainer consumes from the inventory
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Pull a batch of up to `num` mixed-provider candidates
    async fn require(&self, num: usize) -> Result<Vec<Candidate>>;

    /// Tell the inventory a candidate failed validation
    async fn report(&self, candidate: &Candidate) -> Result<()>;
}

/// HTTP client for the pxier inventory API
///
/// One instance is shared by every cycle and report so inventory calls reuse
/// pooled connections.
#[derive(Clone)]
pub struct PxierClient {
    client: reqwest::Client,
    base_url: String,
}

impl PxierClient {
    pub fn new(base_url: &str, max_concurrency: usize, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(max_concurrency.saturating_mul(2))
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl InventoryClient for PxierClient {
    #[instrument(skip(self))]
    async fn require(&self, num: usize) -> Result<Vec<Candidate>> {
        let response = self
            .client
            .get(self.endpoint("require"))
            .query(&[("num", num.to_string()), ("provider", "mix".to_string())])
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if status != StatusCode::OK {
            return Err(MaintainerError::UnexpectedStatus {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let candidates = serde_json::from_slice::<RequireResponse>(&body)?.into_candidates();
        debug!(count = candidates.len(), "Fetched candidates");

        Ok(candidates)
    }

    #[instrument(skip(self, candidate), fields(id = candidate.id, provider = %candidate.provider))]
    async fn report(&self, candidate: &Candidate) -> Result<()> {
        let response = self
            .client
            .get(self.endpoint("report"))
            .query(&[
                ("id", candidate.id.to_string()),
                ("provider", candidate.provider.clone()),
            ])
            .send()
            .await?;

        // The report endpoint's answer carries nothing we act on
        debug!(status = response.status().as_u16(), "Report delivered");
        Ok(())
    }
}

fn truncate_body(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(MAX_LOGGED_BODY)
        .collect()
}
