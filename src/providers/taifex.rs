use crate::core::config::ProviderConfig;
use crate::core::rate::{RateSource, SourceError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Daily foreign exchange feed published by TAIFEX.
pub struct TaifexSource {
    url: String,
    client: reqwest::Client,
}

impl TaifexSource {
    pub fn new(url: &str, client: reqwest::Client) -> Self {
        TaifexSource {
            url: url.to_string(),
            client,
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent("usdtwd/1.0")
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::with_source("Failed to build HTTP client", e))?;
        Ok(Self::new(&config.url, client))
    }
}

#[async_trait]
impl RateSource for TaifexSource {
    #[instrument(name = "TaifexFetch", skip(self), fields(url = %self.url))]
    async fn fetch_raw(&self) -> Result<String, SourceError> {
        debug!("Requesting daily rates from {}", self.url);

        let response = self.client.get(&self.url).send().await.map_err(|e| {
            SourceError::with_source(format!("Failed to send request to {}", self.url), e)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::new(format!(
                "Rate provider returned HTTP {status} for {}",
                self.url
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::with_source("Failed to read rate provider response", e))?;
        debug!("Received {} bytes from rate provider", body.len());
        Ok(body)
    }
}
