use std::{io::Write, time::Duration};

use {async_trait::async_trait, serde_json::Value, tracing::debug};

use crate::error::{Error, Result};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers an encoded span batch somewhere.
#[async_trait]
pub trait SpanSink: Send + Sync {
    async fn deliver(&self, payload: &Value) -> Result<()>;
}

/// Prints a payload to stdout, one line per array element.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

#[async_trait]
impl SpanSink for ConsoleSink {
    async fn deliver(&self, payload: &Value) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        match payload {
            Value::Array(items) => {
                for item in items {
                    writeln!(stdout, "{item}")?;
                }
            },
            other => writeln!(stdout, "{other}")?,
        }
        Ok(())
    }
}

/// POSTs payloads as JSON to a collector endpoint.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSink {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(Error::Client)?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SpanSink for HttpSink {
    async fn deliver(&self, payload: &Value) -> Result<()> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        debug!(endpoint = %self.endpoint, status = status.as_u16(), "span batch delivered");
        Ok(())
    }
}
