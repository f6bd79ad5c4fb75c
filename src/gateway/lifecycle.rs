//! Install, standby, and activation lifecycle for the interception layer.

use color_eyre::Result;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Where the interception layer is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
  /// Seeding the store; not yet serving
  Installing,
  /// Seeded and eligible to take over request handling
  Standby,
  /// Owning interception for all sessions
  Active,
}

/// Control messages a host may deliver to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
  /// Skip any draining period and promote immediately
  #[serde(rename = "SKIP_WAITING")]
  SkipWaiting,
}

/// Sessions already attached to an older interception layer.
///
/// Session bookkeeping belongs to the host; the gateway only asks it to
/// re-point every currently-open session at this instance.
pub trait SessionHost: Send + Sync {
  /// Re-attach all open sessions. Returns how many were claimed.
  fn claim_sessions(&self) -> Result<usize>;
}

/// A host with no session bookkeeping, e.g. a one-shot CLI invocation.
pub struct DetachedHost;

impl SessionHost for DetachedHost {
  fn claim_sessions(&self) -> Result<usize> {
    Ok(0)
  }
}

/// State machine driving the lifecycle transitions.
///
/// Seeding and activation may overlap; activation is never rejected for
/// arriving early.
#[derive(Debug)]
pub struct Lifecycle {
  state: LifecycleState,
  skip_waiting: bool,
}

impl Default for Lifecycle {
  fn default() -> Self {
    Self::new()
  }
}

impl Lifecycle {
  pub fn new() -> Self {
    Self {
      state: LifecycleState::Installing,
      skip_waiting: false,
    }
  }

  pub fn state(&self) -> LifecycleState {
    self.state
  }

  /// Whether promotion should happen without waiting for old instances
  /// to drain.
  pub fn wants_immediate_promotion(&self) -> bool {
    self.skip_waiting
  }

  /// Seeding has settled, fully or partially. The layer moves to standby
  /// and asks for promotion now rather than after old sessions finish.
  pub fn installed(&mut self) {
    if self.state == LifecycleState::Installing {
      self.state = LifecycleState::Standby;
    }
    self.skip_waiting = true;
  }

  /// Take over interception, claiming every currently-open session.
  ///
  /// A failed claim is logged and nothing more: sessions loaded from here
  /// on are governed by this instance regardless.
  pub fn activate<H: SessionHost>(&mut self, host: &H) {
    self.state = LifecycleState::Active;

    match host.claim_sessions() {
      Ok(sessions) => info!(sessions, "interception active"),
      Err(err) => warn!("session claim failed, governing future sessions only: {err:#}"),
    }
  }

  pub fn on_control(&mut self, message: ControlMessage) {
    match message {
      ControlMessage::SkipWaiting => {
        debug!("skip-waiting requested");
        self.skip_waiting = true;
      }
    }
  }
}
