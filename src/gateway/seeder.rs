//! Install-time store population from the asset manifest.

use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use crate::net::RemoteFetcher;
use crate::store::{canonical_key, AssetStorage};

/// The fixed, externally supplied list of resource paths to pre-populate.
#[derive(Debug, Clone, Default)]
pub struct AssetManifest {
  pub paths: Vec<String>,
}

impl From<Vec<String>> for AssetManifest {
  fn from(paths: Vec<String>) -> Self {
    Self { paths }
  }
}

/// Populates the store from the manifest at install time.
pub struct Seeder<S, N> {
  storage: Arc<S>,
  fetcher: Arc<N>,
  origin: Url,
}

impl<S, N> Seeder<S, N>
where
  S: AssetStorage,
  N: RemoteFetcher,
{
  pub fn new(storage: Arc<S>, fetcher: Arc<N>, origin: Url) -> Self {
    Self {
      storage,
      fetcher,
      origin,
    }
  }

  /// Fetch every manifest entry and store what succeeds.
  ///
  /// Entries run concurrently and independently; one unavailable asset never
  /// blocks the rest, and the step completes once every entry has resolved
  /// either way. Returns how many assets made it into the store.
  pub async fn seed(&self, manifest: &AssetManifest) -> usize {
    let results =
      futures::future::join_all(manifest.paths.iter().map(|path| self.seed_one(path))).await;

    let stored = results.into_iter().filter(|stored| *stored).count();
    info!(total = manifest.paths.len(), stored, "seeding complete");

    stored
  }

  /// Whether the entry made it into the store.
  async fn seed_one(&self, path: &str) -> bool {
    // Bypass intermediate caches so install picks up a fresh copy
    match self.fetcher.fetch_fresh(path).await {
      Ok(fetched) if fetched.is_success() => {
        // Key by the resolved URL; a redirect may have moved the asset
        let key = canonical_key(&fetched.final_url, &self.origin);
        match self.storage.put(&key, &fetched.body, &fetched.content_type) {
          Ok(()) => true,
          Err(err) => {
            warn!(path, "failed to store seeded asset: {err:#}");
            false
          }
        }
      }
      Ok(fetched) => {
        warn!(path, status = %fetched.status, "seed fetch returned error status");
        false
      }
      Err(err) => {
        warn!(path, "seed fetch failed: {err:#}");
        false
      }
    }
  }
}
