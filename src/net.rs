//! Network access for asset retrieval.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::StatusCode;
use url::Url;

/// A fully read network response for one asset.
#[derive(Debug, Clone)]
pub struct FetchedAsset {
  /// Final URL after redirects; may differ from the requested path
  pub final_url: String,
  pub status: StatusCode,
  /// MIME type from the response; empty when the origin sent none
  pub content_type: String,
  pub body: Vec<u8>,
}

impl FetchedAsset {
  pub fn is_success(&self) -> bool {
    self.status.is_success()
  }
}

/// Trait for network backends.
///
/// `Err` means the attempt produced no response at all (no connectivity,
/// DNS, timeout). A response with an error status is a normal `Ok` — it is
/// a valid answer from the origin.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
  /// Fetch `url`, resolved against the gateway's origin.
  async fn fetch(&self, url: &str) -> Result<FetchedAsset>;

  /// Fetch bypassing intermediate HTTP caches, for install-time seeding.
  async fn fetch_fresh(&self, url: &str) -> Result<FetchedAsset>;
}

/// HTTP fetcher backed by reqwest.
#[derive(Clone)]
pub struct HttpFetcher {
  client: reqwest::Client,
  origin: Url,
}

impl HttpFetcher {
  pub fn new(origin: Url) -> Result<Self> {
    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, origin })
  }

  async fn request(&self, url: &str, bypass_cache: bool) -> Result<FetchedAsset> {
    let target = Url::options()
      .base_url(Some(&self.origin))
      .parse(url)
      .map_err(|e| eyre!("Invalid request URL {}: {}", url, e))?;

    let mut request = self.client.get(target);
    if bypass_cache {
      request = request.header(CACHE_CONTROL, "no-cache");
    }

    let response = request
      .send()
      .await
      .map_err(|e| eyre!("Request failed for {}: {}", url, e))?;

    let final_url = response.url().to_string();
    let status = response.status();
    let content_type = response
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .unwrap_or("")
      .to_string();

    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read body for {}: {}", url, e))?
      .to_vec();

    Ok(FetchedAsset {
      final_url,
      status,
      content_type,
      body,
    })
  }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
  async fn fetch(&self, url: &str) -> Result<FetchedAsset> {
    self.request(url, false).await
  }

  async fn fetch_fresh(&self, url: &str) -> Result<FetchedAsset> {
    self.request(url, true).await
  }
}
