// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::constants::DEFAULT_REQUEST_TIMEOUT;
use crate::error::TransportError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Delivers a serialized batch to a collector.
///
/// Implementations report only whether the batch was delivered; the dispatcher
/// never retries and never inspects the response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, endpoint: &str, body: Vec<u8>) -> Result<(), TransportError>;
}

/// Sends batches as JSON POST requests.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    headers: HeaderMap,
}

impl HttpTransport {
    pub fn new(timeout: Duration, https_proxy: Option<&str>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder().timeout(timeout).referer(false);
        if let Some(proxy) = https_proxy {
            let proxy = reqwest::Proxy::https(proxy)
                .map_err(|e| TransportError::Client(format!("invalid proxy '{proxy}': {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            client,
            headers: default_headers(),
        })
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT, None).unwrap_or_else(|e| {
            warn!("Unable to build HTTP client: {e}, falling back to defaults");
            Self {
                client: reqwest::Client::new(),
                headers: default_headers(),
            }
        })
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, endpoint: &str, body: Vec<u8>) -> Result<(), TransportError> {
        let time = Instant::now();
        let response = self
            .client
            .post(endpoint)
            .headers(self.headers.clone())
            .body(body)
            .send()
            .await;
        let elapsed = time.elapsed();

        match response {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    debug!(
                        "Delivered batch to {endpoint} in {} ms",
                        elapsed.as_millis()
                    );
                } else {
                    // Delivered; the collector's verdict is not our concern
                    warn!("Collector at {endpoint} answered {status}");
                }
                Ok(())
            }
            Err(e) => Err(TransportError::Network(format!(
                "POST {endpoint} failed after {} ms: {e}",
                elapsed.as_millis()
            ))),
        }
    }
}
