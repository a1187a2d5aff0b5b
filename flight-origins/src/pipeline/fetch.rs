//! Outbound calls to the flight schedule provider

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::airport::AirportCode;
use crate::config::FlightApiConfig;
use crate::error::{Error, Result};

/// Anything that can produce a raw arrivals schedule for an airport
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Fetch the provider's payload for `code` as an untyped JSON value
    async fn fetch_arrivals(&self, code: &AirportCode) -> Result<Value>;
}

#[async_trait]
impl<S: ScheduleSource + ?Sized> ScheduleSource for Arc<S> {
    async fn fetch_arrivals(&self, code: &AirportCode) -> Result<Value> {
        (**self).fetch_arrivals(code).await
    }
}

/// HTTP client for the `compschedule` endpoint.
///
/// Every attempt runs under its own timeout. Only failures to establish a
/// connection are retried; a response with a non-success status is returned
/// as [`Error::Upstream`] straight away.
#[derive(Clone)]
pub struct FlightApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
    max_attempts: u32,
}

impl FlightApiClient {
    /// Build a client from configuration
    pub fn new(config: &FlightApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Unexpected(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: config.timeout(),
            max_attempts: config.max_attempts.max(1),
        })
    }

    /// Per-attempt timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Upper bound on attempts per fetch
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn endpoint(&self) -> String {
        format!("{}/compschedule/{}", self.base_url, self.api_key)
    }

    fn redacted_endpoint(&self) -> String {
        format!("{}/compschedule/<redacted>", self.base_url)
    }

    async fn attempt(&self, code: &AirportCode) -> reqwest::Result<reqwest::Response> {
        let iata = code.query_value();
        self.http
            .get(self.endpoint())
            .query(&[("mode", "arrivals"), ("day", "1"), ("iata", iata.as_str())])
            .send()
            .await
    }

    /// Send the request, retrying connection failures.
    ///
    /// Returns how many attempts were made alongside the final outcome.
    async fn send(&self, code: &AirportCode) -> (u32, reqwest::Result<reqwest::Response>) {
        let mut attempt = 0;

        loop {
            attempt += 1;
            tracing::debug!(
                airport = %code,
                attempt,
                url = %self.redacted_endpoint(),
                "Requesting arrivals schedule"
            );

            match self.attempt(code).await {
                Err(e) if e.is_connect() && attempt < self.max_attempts => {
                    tracing::warn!(
                        airport = %code,
                        attempt,
                        max_attempts = self.max_attempts,
                        "Connection to schedule provider failed: {}. Retrying...",
                        e.without_url()
                    );
                }
                outcome => return (attempt, outcome),
            }
        }
    }

    fn classify(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            // reqwest embeds the URL, which carries the API key
            Error::Unexpected(err.without_url().to_string())
        }
    }
}

#[async_trait]
impl ScheduleSource for FlightApiClient {
    async fn fetch_arrivals(&self, code: &AirportCode) -> Result<Value> {
        let (attempts, outcome) = self.send(code).await;
        let response = outcome.map_err(|e| {
            tracing::debug!(airport = %code, attempts, "Schedule request failed");
            self.classify(e)
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;

        // Error bodies are kept as sent, whatever charset the provider declares
        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        let payload = serde_json::from_slice(&bytes)?;

        tracing::debug!(airport = %code, bytes = bytes.len(), "Received arrivals schedule");
        Ok(payload)
    }
}
