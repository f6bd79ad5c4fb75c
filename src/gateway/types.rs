//! Request and response types exchanged with the host's interception hook.

use reqwest::{Method, StatusCode};

/// How the intercepted request was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
  /// A full-page navigation
  Navigate,
  /// A subordinate resource (script, image, stylesheet, ...)
  Subresource,
}

/// An intercepted outbound request, as handed over by the host.
#[derive(Debug, Clone)]
pub struct AssetRequest {
  pub method: Method,
  pub url: String,
  pub mode: RequestMode,
}

impl AssetRequest {
  /// A GET for a subordinate resource.
  pub fn get(url: impl Into<String>) -> Self {
    Self {
      method: Method::GET,
      url: url.into(),
      mode: RequestMode::Subresource,
    }
  }

  /// A GET for a full-page navigation.
  pub fn navigate(url: impl Into<String>) -> Self {
    Self {
      method: Method::GET,
      url: url.into(),
      mode: RequestMode::Navigate,
    }
  }
}

/// The single response returned to the host for a handled request.
#[derive(Debug, Clone)]
pub struct AssetResponse {
  pub status: StatusCode,
  pub content_type: String,
  pub body: Vec<u8>,
}

impl AssetResponse {
  pub fn new(status: StatusCode, content_type: String, body: Vec<u8>) -> Self {
    Self {
      status,
      content_type,
      body,
    }
  }

  /// The terminal fallback when neither store nor network can answer.
  pub fn unavailable() -> Self {
    Self {
      status: StatusCode::SERVICE_UNAVAILABLE,
      content_type: String::new(),
      body: Vec::new(),
    }
  }
}
