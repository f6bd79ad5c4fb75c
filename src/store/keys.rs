//! Canonical storage keys for cached assets.

use url::Url;

/// Derive the canonical storage key for a request URL.
///
/// The URL is resolved against the gateway's own origin and reduced to its
/// path plus query string, so install-time keys and intercept-time keys for
/// the same resource line up regardless of how the URL was spelled.
///
/// Input that fails to parse is returned unchanged: a malformed URL only
/// costs cache-hit precision, never the request.
pub fn canonical_key(raw_url: &str, origin: &Url) -> String {
  match Url::options().base_url(Some(origin)).parse(raw_url) {
    Ok(url) => match url.query() {
      Some(query) if !query.is_empty() => format!("{}?{}", url.path(), query),
      _ => url.path().to_string(),
    },
    Err(_) => raw_url.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn origin() -> Url {
    Url::parse("https://app.example.com").unwrap()
  }

  #[test]
  fn test_strips_origin() {
    assert_eq!(
      canonical_key("https://app.example.com/assets/index.js", &origin()),
      "/assets/index.js"
    );
  }

  #[test]
  fn test_resolves_relative_paths() {
    assert_eq!(canonical_key("/index.html", &origin()), "/index.html");
    assert_eq!(canonical_key("manifest.json", &origin()), "/manifest.json");
  }

  #[test]
  fn test_keeps_query() {
    assert_eq!(
      canonical_key("/search?q=rust&page=2", &origin()),
      "/search?q=rust&page=2"
    );
  }

  #[test]
  fn test_empty_query_matches_no_query() {
    // "/page?" and "/page" address the same resource
    assert_eq!(canonical_key("/page?", &origin()), canonical_key("/page", &origin()));
  }

  #[test]
  fn test_idempotent_on_normalized_keys() {
    for key in ["/", "/index.html", "/assets/app.css", "/search?q=x"] {
      assert_eq!(canonical_key(key, &origin()), key);
    }
  }

  #[test]
  fn test_unparseable_input_is_returned_unchanged() {
    // base-relative parsing leaves very little unparseable; a bad scheme does it
    let raw = "http://[not-a-host/";
    assert_eq!(canonical_key(raw, &origin()), raw);
  }

  #[test]
  fn test_drops_fragment() {
    assert_eq!(canonical_key("/docs#section", &origin()), "/docs");
  }
}
