//! The interception layer: durable store, network access, and the
//! store-first decision policy behind one surface the host wires its
//! lifecycle triggers and request hook to.

mod lifecycle;
mod policy;
mod seeder;
mod types;

pub use lifecycle::{ControlMessage, DetachedHost, Lifecycle, LifecycleState, SessionHost};
pub use policy::InterceptionPolicy;
pub use seeder::{AssetManifest, Seeder};
pub use types::{AssetRequest, AssetResponse, RequestMode};

use color_eyre::{eyre::eyre, Result};
use std::sync::{Arc, Mutex};
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::net::{HttpFetcher, RemoteFetcher};
use crate::store::{AssetStorage, SqliteStorage};

/// The assembled interception layer.
///
/// Seeder, policy, and lifecycle share one storage and one fetcher; the
/// host drives the install/activate triggers and routes intercepted
/// requests through [`Gateway::handle`].
pub struct Gateway<S, N> {
  policy: InterceptionPolicy<S, N>,
  seeder: Seeder<S, N>,
  lifecycle: Mutex<Lifecycle>,
}

impl Gateway<SqliteStorage, HttpFetcher> {
  /// Wire up the production gateway: SQLite store, HTTP network.
  pub fn from_config(config: &Config) -> Result<Self> {
    let origin = config.origin_url()?;

    let storage = match &config.store_path {
      Some(path) => SqliteStorage::at(path.clone())?,
      None => SqliteStorage::open()?,
    };

    let fetcher = HttpFetcher::new(origin.clone())?;

    Ok(Self::new(storage, fetcher, origin, &config.offline_path))
  }
}

impl<S, N> Gateway<S, N>
where
  S: AssetStorage + 'static,
  N: RemoteFetcher,
{
  pub fn new(storage: S, fetcher: N, origin: Url, offline_path: &str) -> Self {
    let storage = Arc::new(storage);
    let fetcher = Arc::new(fetcher);

    Self {
      policy: InterceptionPolicy::new(
        Arc::clone(&storage),
        Arc::clone(&fetcher),
        origin.clone(),
        offline_path,
      ),
      seeder: Seeder::new(storage, fetcher, origin),
      lifecycle: Mutex::new(Lifecycle::new()),
    }
  }

  /// Install trigger: seed the store, then stand by for promotion without
  /// waiting for older instances to drain. Returns how many manifest
  /// entries were stored.
  pub async fn install(&self, manifest: &AssetManifest) -> Result<usize> {
    let stored = self.seeder.seed(manifest).await;

    self
      .lifecycle
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?
      .installed();

    Ok(stored)
  }

  /// Activate trigger: take over every currently-open session.
  pub fn activate<H: SessionHost>(&self, host: &H) -> Result<()> {
    self
      .lifecycle
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?
      .activate(host);

    Ok(())
  }

  /// Host-delivered control message, as raw JSON. Messages the gateway
  /// does not understand are ignored.
  pub fn on_control(&self, raw: &str) -> Result<()> {
    let message: ControlMessage = match serde_json::from_str(raw) {
      Ok(message) => message,
      Err(_) => {
        debug!(raw, "ignoring unknown control message");
        return Ok(());
      }
    };

    self
      .lifecycle
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?
      .on_control(message);

    Ok(())
  }

  pub fn state(&self) -> Result<LifecycleState> {
    Ok(
      self
        .lifecycle
        .lock()
        .map_err(|e| eyre!("Lock poisoned: {}", e))?
        .state(),
    )
  }

  /// Intercepted-request hook. Exactly one response per handled request;
  /// `None` hands the request back to the host's default network path.
  pub async fn handle(&self, request: &AssetRequest) -> Option<AssetResponse> {
    self.policy.handle(request).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use async_trait::async_trait;
  use reqwest::StatusCode;

  use crate::net::FetchedAsset;
  use crate::store::MemoryStorage;

  /// A network that serves everything until told to go dark.
  #[derive(Clone)]
  struct FlakyNetwork {
    dark: Arc<std::sync::atomic::AtomicBool>,
  }

  impl FlakyNetwork {
    fn new() -> Self {
      Self {
        dark: Arc::new(std::sync::atomic::AtomicBool::new(false)),
      }
    }

    fn go_dark(&self) {
      self.dark.store(true, std::sync::atomic::Ordering::SeqCst);
    }
  }

  #[async_trait]
  impl RemoteFetcher for FlakyNetwork {
    async fn fetch(&self, url: &str) -> Result<FetchedAsset> {
      if self.dark.load(std::sync::atomic::Ordering::SeqCst) {
        return Err(eyre!("network unreachable"));
      }
      Ok(FetchedAsset {
        final_url: format!("https://app.example.com{}", url),
        status: StatusCode::OK,
        content_type: "text/html".to_string(),
        body: format!("body of {}", url).into_bytes(),
      })
    }

    async fn fetch_fresh(&self, url: &str) -> Result<FetchedAsset> {
      self.fetch(url).await
    }
  }

  fn gateway() -> (FlakyNetwork, Gateway<MemoryStorage, FlakyNetwork>) {
    let network = FlakyNetwork::new();
    let gateway = Gateway::new(
      MemoryStorage::new(),
      network.clone(),
      Url::parse("https://app.example.com").unwrap(),
      "/offline.html",
    );
    (network, gateway)
  }

  #[tokio::test]
  async fn test_install_then_serve_while_dark() {
    let (network, gateway) = gateway();

    let manifest = AssetManifest::from(vec![
      "/index.html".to_string(),
      "/offline.html".to_string(),
    ]);

    assert_eq!(gateway.install(&manifest).await.unwrap(), 2);
    assert_eq!(gateway.state().unwrap(), LifecycleState::Standby);

    gateway.activate(&DetachedHost).unwrap();
    assert_eq!(gateway.state().unwrap(), LifecycleState::Active);

    network.go_dark();

    // Seeded asset served from the store
    let response = gateway
      .handle(&AssetRequest::navigate("/index.html"))
      .await
      .unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, b"body of /index.html");

    // Unseeded navigation degrades to the offline substitute
    let response = gateway
      .handle(&AssetRequest::navigate("/somewhere-else"))
      .await
      .unwrap();
    assert_eq!(response.body, b"body of /offline.html");
  }

  #[tokio::test]
  async fn test_skip_waiting_control_message() {
    let (_network, gateway) = gateway();

    gateway.on_control(r#"{ "type": "SKIP_WAITING" }"#).unwrap();
    gateway.on_control(r#"{ "type": "SOMETHING_ELSE" }"#).unwrap();
    gateway.on_control("not even json").unwrap();
  }
}
