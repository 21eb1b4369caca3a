//! [`HttpSource`]: the OpenF1-style JSON HTTP record source.

use std::time::Duration;

use pitwall_core::{SourceError, record::Record, source::RecordSource};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Connection settings for the upstream provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
  pub base_url:     String,
  pub timeout_secs: u64,
}

impl Default for SourceConfig {
  fn default() -> Self {
    Self {
      base_url:     "https://api.openf1.org/v1".to_owned(),
      timeout_secs: 30,
    }
  }
}

/// Fetches `GET {base_url}/{resource}?{filters}` and expects a JSON array of
/// flat objects.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpSource {
  client:   Client,
  base_url: String,
}

impl HttpSource {
  pub fn new(config: &SourceConfig) -> Result<Self, Error> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, base_url: config.base_url.clone() })
  }

  fn url(&self, resource: &str) -> String {
    format!("{}/{}", self.base_url.trim_end_matches('/'), resource)
  }
}

impl RecordSource for HttpSource {
  async fn fetch<'a>(
    &'a self,
    resource: &'a str,
    filters: &'a [(String, String)],
  ) -> Result<Vec<Record>, SourceError> {
    let resp = self
      .client
      .get(self.url(resource))
      .query(filters)
      .send()
      .await
      .map_err(|e| SourceError::Unavailable(format!("GET /{resource}: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
      return Err(SourceError::Unavailable(format!("GET /{resource} → {status}")));
    }

    let body = resp
      .bytes()
      .await
      .map_err(|e| SourceError::Unavailable(format!("GET /{resource}: {e}")))?;
    parse_records(&body)
  }
}

/// Decode a response body into records. Nested arrays and objects inside a
/// record are dropped.
pub fn parse_records(body: &[u8]) -> Result<Vec<Record>, SourceError> {
  let value: Value = serde_json::from_slice(body)
    .map_err(|e| SourceError::MalformedPayload(e.to_string()))?;
  let Value::Array(items) = value else {
    return Err(SourceError::MalformedPayload("expected a JSON array".into()));
  };
  items
    .into_iter()
    .enumerate()
    .map(|(i, item)| {
      Record::from_json(item).ok_or_else(|| {
        SourceError::MalformedPayload(format!("element {i} is not an object"))
      })
    })
    .collect()
}
