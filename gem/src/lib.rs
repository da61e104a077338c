//! # GENERIC MODEL FOR COMMUNICATIONS AND CONTROL OF MANUFACTURING EQUIPMENT (GEM)
//! **Based on:**
//! - **[SEMI E30]-1107**
//!
//! [GEM] is an Application Protocol layered on [SECS-II] ([SEMI E5]) message
//! content, carried in this workspace over [HSMS] ([SEMI E37]). This crate
//! implements the two state machines the standard specifies plus the
//! equipment-side and host-side message handling they drive:
//!
//! - [common] — the Communication State Machine ([SEMI E30]§5.2.3): the
//!   S1F13/S1F14 handshake that brings a connection from "selected" to
//!   "communicating", independent of which side (host or equipment) is
//!   running it.
//! - [equipment] — the Control State Machine ([SEMI E30]§5.3) plus the
//!   equipment-side dictionaries (status variables, equipment constants,
//!   collection events, alarms, remote commands) and the stream/function
//!   handlers that answer a host's requests against them.
//! - [host] — convenience issuers a host application uses to drive an
//!   equipment connection: report subscription, remote commands, alarm
//!   control, online/offline requests.
//!
//! As with [hsms], logging is an injected sink: [EventSink] receives
//! structured [Event]s rather than the crate depending on a logging
//! facade directly.
//!
//! [SEMI E5]:  https://store-us.semi.org/products/e00500-semi-e5-specification-for-semi-equipment-communications-standard-2-message-content-secs-ii
//! [SEMI E30]: https://store-us.semi.org/products/e03000-semi-e30-specification-for-the-generic-model-for-communications-and-control-of-manufacturing-equipment-gem
//! [SEMI E37]: https://store-us.semi.org/products/e03700-semi-e37-high-speed-secs-message-services-hsms-generic-services
//! [GEM]:      crate
//! [SECS-II]:  secs2
//! [HSMS]:     hsms

use std::sync::atomic::{AtomicU32, Ordering::Relaxed};
use std::sync::Arc;

pub mod common;
pub mod equipment;
pub mod host;

/// ## ERROR
///
/// Unifies the lower layers' error types for the GEM surface. Codec and
/// transport errors are wrapped rather than flattened, per the ambient
/// error-propagation convention this workspace uses throughout.
#[derive(Debug)]
pub enum Error {
  /// The underlying HSMS data/select/linktest procedure failed.
  Hsms(std::io::Error),
  /// A message failed to convert to/from its typed [secs2] representation.
  Codec(secs2::Error),
  /// A reply was not received within the relevant timeout (T3 or T6).
  Timeout,
  /// The operation requires `COMMUNICATING` state, which is not current.
  NotCommunicating,
  /// The requested event, equipment constant, status variable, alarm, or
  /// remote command is not registered.
  UnknownID,
  /// A state machine event had no transition defined for the current state.
  InvalidTransition,
}
impl std::fmt::Display for Error {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{self:?}")
  }
}
impl std::error::Error for Error {}
impl From<std::io::Error> for Error {
  fn from(value: std::io::Error) -> Self {
    Error::Hsms(value)
  }
}
impl From<secs2::Error> for Error {
  fn from(value: secs2::Error) -> Self {
    Error::Codec(value)
  }
}
impl<S: std::fmt::Debug, E: std::fmt::Debug> From<fsm::IllegalTransition<S, E>> for Error {
  fn from(_value: fsm::IllegalTransition<S, E>) -> Self {
    Error::InvalidTransition
  }
}

/// ## EVENT
///
/// A notable occurrence reported to [EventSink], spanning both the
/// communication-state handshake and the equipment/host message handling
/// built on top of it.
#[derive(Clone, Debug)]
pub enum Event {
  /// The HSMS connection reached `SELECTED`.
  HsmsSelected,
  /// The HSMS connection dropped.
  HsmsDisconnected,
  /// The communication-state machine reached `COMMUNICATING`.
  HandlerCommunicating,
  /// The communication-state machine left `COMMUNICATING`.
  CommunicationFail,
  /// An `S6F11` event report was received (host side) or sent (equipment
  /// side, echoed for observability).
  CollectionEventReceived { ceid_display: String },
  /// An `S5F1` alarm report was received (host side) or sent (equipment
  /// side, echoed for observability).
  AlarmReceived { alid_display: String, set: bool },
  /// An `S10F*`-style operator terminal message was received. Reserved:
  /// no `S10` messages are implemented in this subset (see `DESIGN.md`);
  /// this variant exists for an embedder that extends the dispatch table.
  TerminalReceived { text: String },
}

/// ## EVENT SINK
///
/// All methods default to a no-op, so an embedder overrides only what it
/// cares to observe. Matches the no-logging-facade-dependency convention
/// `hsms::generic::Delegate` sets.
pub trait EventSink: Send + Sync {
  fn event(&self, _event: Event) {}
}

/// ## NULL SINK
///
/// An [EventSink] that discards everything, for callers that have no use
/// for observability.
pub struct NullSink;
impl EventSink for NullSink {}

/// ## SYSTEM COUNTER
/// **Based on SEMI E37-1109§8.2.6, and the spec's system-ID invariant**
///
/// A monotonically increasing `system` counter used to correlate
/// request/response, incremented before each outbound message and
/// wrapping at `2^31 - 1` so the value never sets the high bit some
/// equipment firmwares treat as reserved. One HSMS session has exactly
/// one of these: [common::CommClient], [equipment::Handler], and
/// [host::Host] all take a clone of the same counter so that the
/// communication-state handshake and ordinary traffic never collide on
/// a `system` value.
#[derive(Clone)]
pub struct SystemCounter(Arc<AtomicU32>);
impl SystemCounter {
  pub fn new() -> Self {
    SystemCounter(Arc::new(AtomicU32::new(0)))
  }

  pub fn next(&self) -> u32 {
    let mut new = 0;
    self
      .0
      .fetch_update(Relaxed, Relaxed, |current| {
        new = if current >= 0x7FFF_FFFF { 0 } else { current + 1 };
        Some(new)
      })
      .unwrap();
    new
  }
}
impl Default for SystemCounter {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn system_counter_wraps() {
    let counter = SystemCounter::new();
    assert_eq!(counter.next(), 1);
    counter.0.store(0x7FFF_FFFF, Relaxed);
    assert_eq!(counter.next(), 0);
  }
}
