use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{PlanRequest, PlannerClient};
use crate::core::error::{OpsError, OpsResult};

/// Client for the external planning service. The planner call can block for
/// tens of seconds while the model works, so the read timeout is generous but
/// bounded; a timeout surfaces as `UpstreamUnavailable` instead of hanging.
pub struct HttpPlannerClient {
    base_url: String,
    client: Client,
}

impl HttpPlannerClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl PlannerClient for HttpPlannerClient {
    async fn create_plan(&self, payload: &PlanRequest) -> OpsResult<Value> {
        let url = format!("{}/plan", self.base_url);
        debug!("Requesting plan from {} for request {}", url, payload.request_id);

        let res = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| OpsError::UpstreamUnavailable(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(200).collect();
            return Err(OpsError::UpstreamUnavailable(format!(
                "planner returned {status}: {excerpt}"
            )));
        }

        res.json::<Value>()
            .await
            .map_err(|e| OpsError::UpstreamInvalid(format!("planner response was not JSON: {e}")))
    }
}
