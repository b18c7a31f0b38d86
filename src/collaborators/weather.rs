//! HTTP weather source

use async_trait::async_trait;

use super::{WeatherReport, WeatherSource};
use crate::{Error, Result};

/// Fetches `{ "weather": "..." }` from a configured endpoint
pub struct HttpWeatherSource {
    client: reqwest::Client,
    url: Option<String>,
}

impl HttpWeatherSource {
    #[must_use]
    pub fn new(url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl WeatherSource for HttpWeatherSource {
    async fn current(&self) -> Result<WeatherReport> {
        let Some(url) = &self.url else {
            return Err(Error::Collaborator("no weather source configured".to_string()));
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Collaborator(format!("weather source unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = %status, "failed to fetch weather");
            return Err(Error::Collaborator(format!("weather source error {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Collaborator(format!("malformed weather report: {e}")))
    }
}
