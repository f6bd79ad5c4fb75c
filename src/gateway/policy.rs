//! Per-request decision engine: store first, then network, then fallbacks.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::net::{FetchedAsset, RemoteFetcher};
use crate::store::{canonical_key, AssetStorage};

use super::types::{AssetRequest, AssetResponse, RequestMode};

/// Served for a cache hit recorded without a content type.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Assumed for the offline substitute when none was recorded.
const OFFLINE_CONTENT_TYPE: &str = "text/html";

/// The decision engine behind the host's interception hook.
///
/// Only same-origin GETs are observed; everything else passes through.
/// For observed requests the order is fixed: answer from the store, else
/// from the network (refreshing the store off the response path), else the
/// offline substitute for navigations, else a synthetic 503. Every internal
/// failure falls through to the next step; nothing is raised to the host.
pub struct InterceptionPolicy<S, N> {
  storage: Arc<S>,
  fetcher: Arc<N>,
  origin: Url,
  offline_key: String,
}

impl<S, N> InterceptionPolicy<S, N>
where
  S: AssetStorage + 'static,
  N: RemoteFetcher,
{
  pub fn new(storage: Arc<S>, fetcher: Arc<N>, origin: Url, offline_path: &str) -> Self {
    let offline_key = canonical_key(offline_path, &origin);
    Self {
      storage,
      fetcher,
      origin,
      offline_key,
    }
  }

  /// Whether this request is ours to answer at all.
  ///
  /// Side-effecting verbs and foreign origins are not observed; a request
  /// URL that does not even parse is left to the host's default handling.
  fn intercepts(&self, request: &AssetRequest) -> bool {
    if request.method != Method::GET {
      return false;
    }

    match Url::options().base_url(Some(&self.origin)).parse(&request.url) {
      Ok(url) => url.origin() == self.origin.origin(),
      Err(_) => false,
    }
  }

  /// Answer an intercepted request, or `None` to pass it through untouched.
  pub async fn handle(&self, request: &AssetRequest) -> Option<AssetResponse> {
    if !self.intercepts(request) {
      return None;
    }

    let key = canonical_key(&request.url, &self.origin);

    // Store first. A read error is a miss, not a failure.
    match self.storage.get(&key) {
      Ok(Some(asset)) => {
        debug!(%key, "store hit");
        return Some(AssetResponse::new(
          StatusCode::OK,
          content_type_or(&asset.content_type, FALLBACK_CONTENT_TYPE),
          asset.payload,
        ));
      }
      Ok(None) => {}
      Err(err) => warn!(%key, "store read failed: {err:#}"),
    }

    // Network next. Any produced response is the answer, success or not;
    // only an attempt that produced nothing falls through.
    match self.fetcher.fetch(&request.url).await {
      Ok(fetched) => {
        if fetched.is_success() {
          self.persist_in_background(key, fetched.clone());
        }
        return Some(AssetResponse::new(
          fetched.status,
          fetched.content_type,
          fetched.body,
        ));
      }
      Err(err) => warn!(url = %request.url, "network fetch failed: {err:#}"),
    }

    // Offline substitute, for navigations only
    if request.mode == RequestMode::Navigate {
      match self.storage.get(&self.offline_key) {
        Ok(Some(offline)) => {
          return Some(AssetResponse::new(
            StatusCode::OK,
            content_type_or(&offline.content_type, OFFLINE_CONTENT_TYPE),
            offline.payload,
          ));
        }
        Ok(None) => {}
        Err(err) => warn!("offline substitute unavailable: {err:#}"),
      }
    }

    Some(AssetResponse::unavailable())
  }

  /// Refresh the store off the response path.
  ///
  /// The caller already has its answer; this task holds its own copy of the
  /// body, so it survives the foreground response being torn down, and its
  /// failure is visible only in the log.
  fn persist_in_background(&self, key: String, fetched: FetchedAsset) {
    let storage = Arc::clone(&self.storage);
    tokio::spawn(async move {
      if let Err(err) = storage.put(&key, &fetched.body, &fetched.content_type) {
        warn!(%key, "background persist failed: {err:#}");
      }
    });
  }
}

fn content_type_or(recorded: &str, fallback: &str) -> String {
  if recorded.is_empty() {
    fallback.to_string()
  } else {
    recorded.to_string()
  }
}
