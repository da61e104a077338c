//! ## COMMUNICATION STATE MACHINE (C7)
//! **Based on SEMI E30-1107§5.2.3**
//!
//! Brings a [hsms::generic::Client] connection from `SELECTED` to
//! `COMMUNICATING` through the S1F13/S1F14 establish-communications
//! handshake, and keeps retrying on a delay once `COMMUNICATING` is lost.
//! This is the only place in the workspace that originates or answers
//! S1F13/S1F14 — [Handler] and [Host] never register for stream 1,
//! function 13 or 14, so there is exactly one path by which those two
//! functions are handled, not two competing ones.
//!
//! The T3 reply wait for our own S1F13 is the one [hsms::generic::Client::data]
//! already performs; this module adds only the establish-comm-timeout
//! delay and retry on top of that, per [SEMI E30]§5.2.3's `WAIT_CRA` /
//! `WAIT_DELAY` pair.
//!
//! [SEMI E30]: https://store-us.semi.org/products/e03000-semi-e30-specification-for-the-generic-model-for-communications-and-control-of-manufacturing-equipment-gem

use crate::{Error, Event, EventSink, SystemCounter};
use fsm::{IllegalTransition, Machine, Transition};
use hsms::generic::{Client as HsmsClient, MessageID};
use secs2::items::{CommAck, ModelName, SoftwareRevision};
use secs2::messages::s1::{EquipmentCR, EquipmentCRA, HostCR, HostCRA};
use secs2::Message as SecsMessage;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// ## ROLE
///
/// Which side of the S1F13/S1F14 exchange this entity plays. The host
/// form carries no identification; the equipment form carries [ModelName]
/// and [SoftwareRevision] in both directions the role participates in.
#[derive(Clone, Debug)]
pub enum Role {
  Host,
  Equipment { model: ModelName, revision: SoftwareRevision },
}

/// ## SETTINGS
/// **Based on SEMI E30-1107§5.2.3, built-in equipment constant `EstablishCommunicationsTimeout`**
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CommSettings {
  pub establish_comm_timeout: Duration,
}
impl Default for CommSettings {
  fn default() -> Self {
    CommSettings { establish_comm_timeout: Duration::from_secs(10) }
  }
}

/// ## STATE
///
/// Collapses [SEMI E30]'s `DISABLED`/`ENABLED` pair and the momentary
/// `EQUIPMENT_INITIATED_CONNECT` state into the transition from
/// `NotCommunicating`/`Enabled` straight to `WaitCra`: the HSMS `SELECTED`
/// state already stands in for "the connect procedure completed", so
/// this machine only needs to model what happens after that point.
///
/// [SEMI E30]: https://store-us.semi.org/products/e03000-semi-e30-specification-for-the-generic-model-for-communications-and-control-of-manufacturing-equipment-gem
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommState {
  Disabled,
  Enabled,
  NotCommunicating,
  WaitCra,
  WaitDelay,
  Communicating,
}

/// ## EVENT
#[derive(Debug)]
pub enum CommEvent {
  Enable,
  Disable,
  /// The underlying HSMS connection reached `SELECTED`.
  Selected,
  /// The peer sent S1F13; carries its `MessageID` so the reply can be
  /// correlated back.
  S1F13Received(MessageID),
  /// Our own S1F13 was acknowledged with S1F14.
  S1F14Received(CommAck),
  /// Our own S1F13 went unanswered inside T3.
  T3Timeout,
  /// The `WaitDelay` establish-comm-timeout elapsed; time to retry.
  DelayTimeout,
  /// The HSMS connection dropped while communicating.
  CommunicationFail,
}

/// ## OUTPUT
#[derive(Debug, PartialEq, Eq)]
pub enum CommOutput {
  None,
  SendS1F13,
  SendS1F14Ack(MessageID, CommAck),
}

struct CommTransition;
impl Transition for CommTransition {
  type State = CommState;
  type Event = CommEvent;
  type Output = CommOutput;

  fn apply(&self, state: &CommState, event: CommEvent) -> Result<(CommState, CommOutput), IllegalTransition<CommState, CommEvent>> {
    use CommEvent::*;
    use CommState::*;
    let state = *state;
    Ok(match (state, event) {
      (Disabled, Enable) => (Enabled, CommOutput::None),
      (s, Disable) if s != Disabled => (Disabled, CommOutput::None),
      (Enabled, Selected) | (NotCommunicating, Selected) => (WaitCra, CommOutput::SendS1F13),
      (WaitCra, T3Timeout) => (WaitDelay, CommOutput::None),
      (WaitDelay, DelayTimeout) => (WaitCra, CommOutput::SendS1F13),
      (WaitCra, S1F14Received(_)) => (Communicating, CommOutput::None),
      (Enabled, S1F13Received(id)) | (NotCommunicating, S1F13Received(id)) | (WaitCra, S1F13Received(id)) | (WaitDelay, S1F13Received(id)) => {
        (Communicating, CommOutput::SendS1F14Ack(id, CommAck::Accepted))
      }
      (Communicating, CommunicationFail) => (NotCommunicating, CommOutput::None),
      (state, event) => return Err(IllegalTransition { state, event }),
    })
  }
}

/// ## COMM CLIENT
///
/// Owns the communication-state machine and drives it from a
/// [hsms::generic::Client]: it spawns the thread that reads the
/// per-connection data-message channel, intercepts S1F13/S1F14, and
/// forwards every other primary message to whatever consumes
/// [CommClient::start]'s returned channel ([equipment::Handler] or
/// [host::Host], in this workspace).
///
/// [equipment::Handler]: crate::equipment::Handler
/// [host::Host]: crate::host::Host
pub struct CommClient {
  role: Role,
  hsms: Arc<HsmsClient>,
  session: u16,
  system: SystemCounter,
  machine: Mutex<Machine<CommTransition>>,
  settings: Mutex<CommSettings>,
  sink: Arc<dyn EventSink>,
  generation: AtomicU64,
}
impl CommClient {
  pub fn new(role: Role, hsms: Arc<HsmsClient>, session: u16, system: SystemCounter, settings: CommSettings, sink: Arc<dyn EventSink>) -> Arc<Self> {
    Arc::new(CommClient {
      role,
      hsms,
      session,
      system,
      machine: Mutex::new(Machine::new(CommTransition, CommState::Disabled)),
      settings: Mutex::new(settings),
      sink,
      generation: AtomicU64::new(0),
    })
  }

  pub fn state(&self) -> CommState {
    *self.machine.lock().unwrap().state()
  }

  pub fn establish_comm_timeout(&self) -> Duration {
    self.settings.lock().unwrap().establish_comm_timeout
  }

  /// Built-in equipment constant EC1 (`EstablishCommunicationsTimeout`)
  /// lands here when the host sets it via S2F15.
  pub fn set_establish_comm_timeout(&self, timeout: Duration) {
    self.settings.lock().unwrap().establish_comm_timeout = timeout;
  }

  /// Enables the machine and begins the handshake over an already-selected
  /// HSMS connection. `rx` is the channel [hsms::generic::Client::connect]
  /// returned; the channel this returns carries every primary message
  /// that is not S1F13, for the caller's own dispatch table.
  pub fn start(self: &Arc<Self>, rx: Receiver<(MessageID, SecsMessage)>) -> Receiver<(MessageID, SecsMessage)> {
    self.fire_and_act(CommEvent::Enable);
    let (forward_tx, forward_rx) = channel();
    let clone = self.clone();
    thread::spawn(move || clone.dispatch(rx, forward_tx));
    self.fire_and_act(CommEvent::Selected);
    forward_rx
  }

  pub fn disable(self: &Arc<Self>) -> Result<(), Error> {
    self.fire_and_act(CommEvent::Disable);
    self.hsms.disconnect()?;
    Ok(())
  }

  fn fire_and_act(self: &Arc<Self>, event: CommEvent) {
    let (old, new, output) = {
      let mut machine = self.machine.lock().unwrap();
      let old = *machine.state();
      match machine.fire(event) {
        Ok(output) => (old, *machine.state(), output),
        Err(_) => return,
      }
    };
    match output {
      CommOutput::None => {}
      CommOutput::SendS1F13 => self.spawn_establish_roundtrip(),
      CommOutput::SendS1F14Ack(id, ack) => self.send_s1f14_ack(id, ack),
    }
    if old != CommState::Communicating && new == CommState::Communicating {
      self.sink.event(Event::HandlerCommunicating);
    }
    if old == CommState::Communicating && new != CommState::Communicating {
      self.sink.event(Event::CommunicationFail);
    }
    if new == CommState::WaitDelay {
      self.arm_delay();
    }
  }

  /// Runs in its own thread: performs the blocking S1F13 send/T3-wait via
  /// [hsms::generic::Client::data] and feeds the result back into the
  /// machine as [CommEvent::S1F14Received] or [CommEvent::T3Timeout].
  fn spawn_establish_roundtrip(self: &Arc<Self>) {
    let clone = self.clone();
    thread::spawn(move || {
      let id = MessageID { session: clone.session, system: clone.system.next() };
      let message: SecsMessage = match &clone.role {
        Role::Host => HostCR.into(),
        Role::Equipment { model, revision } => EquipmentCR((model.clone(), revision.clone())).into(),
      };
      let outcome = clone.hsms.data(id, message).join();
      match outcome {
        Ok(Ok(Some(reply))) => match extract_comm_ack(&clone.role, reply) {
          Ok(ack) => clone.fire_and_act(CommEvent::S1F14Received(ack)),
          Err(_) => clone.fire_and_act(CommEvent::T3Timeout),
        },
        _ => clone.fire_and_act(CommEvent::T3Timeout),
      }
    });
  }

  fn send_s1f14_ack(self: &Arc<Self>, id: MessageID, ack: CommAck) {
    let message: SecsMessage = match &self.role {
      Role::Host => HostCRA((ack, ())).into(),
      Role::Equipment { model, revision } => EquipmentCRA((ack, (model.clone(), revision.clone()))).into(),
    };
    let _ = self.hsms.data(id, message);
  }

  /// Sleeps for the establish-comm-timeout, then fires [CommEvent::DelayTimeout]
  /// unless a later transition has already moved the generation counter
  /// on. Stale fires are harmless regardless, since the machine rejects
  /// a `DelayTimeout` event in any state but `WaitDelay`.
  fn arm_delay(self: &Arc<Self>) {
    let generation = self.generation.fetch_add(1, Relaxed) + 1;
    let delay = self.establish_comm_timeout();
    let clone = self.clone();
    thread::spawn(move || {
      thread::sleep(delay);
      if clone.generation.load(Relaxed) == generation {
        clone.fire_and_act(CommEvent::DelayTimeout);
      }
    });
  }

  /// The dispatcher thread started by [CommClient::start]. S1F13 drives
  /// the machine directly; everything else is handed to `forward`.
  fn dispatch(self: Arc<Self>, rx: Receiver<(MessageID, SecsMessage)>, forward: Sender<(MessageID, SecsMessage)>) {
    for (id, message) in rx {
      if message.stream == 1 && message.function == 13 {
        self.fire_and_act(CommEvent::S1F13Received(id));
        continue;
      }
      if forward.send((id, message)).is_err() {
        break;
      }
    }
    self.fire_and_act(CommEvent::CommunicationFail);
  }
}

/// The S1F14 we receive in reply to our own S1F13 carries the *peer's*
/// role-specific shape: if we are the host, the equipment's S1F14 carries
/// [ModelName]/[SoftwareRevision]; if we are the equipment, the host's
/// S1F14 carries none.
fn extract_comm_ack(role: &Role, reply: SecsMessage) -> Result<CommAck, secs2::Error> {
  match role {
    Role::Host => EquipmentCRA::try_from(reply).map(|EquipmentCRA((ack, _))| ack),
    Role::Equipment { .. } => HostCRA::try_from(reply).map(|HostCRA((ack, _))| ack),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn enable_then_select_arms_wait_cra() {
    let mut machine = Machine::new(CommTransition, CommState::Disabled);
    let output = machine.fire(CommEvent::Enable).unwrap();
    assert_eq!(output, CommOutput::None);
    assert_eq!(*machine.state(), CommState::Enabled);
    let output = machine.fire(CommEvent::Selected).unwrap();
    assert_eq!(output, CommOutput::SendS1F13);
    assert_eq!(*machine.state(), CommState::WaitCra);
  }

  #[test]
  fn t3_timeout_then_delay_then_retry() {
    let mut machine = Machine::new(CommTransition, CommState::WaitCra);
    machine.fire(CommEvent::T3Timeout).unwrap();
    assert_eq!(*machine.state(), CommState::WaitDelay);
    let output = machine.fire(CommEvent::DelayTimeout).unwrap();
    assert_eq!(output, CommOutput::SendS1F13);
    assert_eq!(*machine.state(), CommState::WaitCra);
  }

  #[test]
  fn s1f14_in_wait_cra_enters_communicating() {
    let mut machine = Machine::new(CommTransition, CommState::WaitCra);
    machine.fire(CommEvent::S1F14Received(CommAck::Accepted)).unwrap();
    assert_eq!(*machine.state(), CommState::Communicating);
  }

  #[test]
  fn incoming_s1f13_in_any_non_communicating_state_enters_communicating() {
    let id = MessageID { session: 0, system: 7 };
    for start in [CommState::Enabled, CommState::NotCommunicating, CommState::WaitCra, CommState::WaitDelay] {
      let mut machine = Machine::new(CommTransition, start);
      let output = machine.fire(CommEvent::S1F13Received(id)).unwrap();
      assert_eq!(output, CommOutput::SendS1F14Ack(id, CommAck::Accepted));
      assert_eq!(*machine.state(), CommState::Communicating);
    }
  }

  #[test]
  fn communication_fail_returns_to_not_communicating() {
    let mut machine = Machine::new(CommTransition, CommState::Communicating);
    machine.fire(CommEvent::CommunicationFail).unwrap();
    assert_eq!(*machine.state(), CommState::NotCommunicating);
  }

  #[test]
  fn disable_from_any_state_goes_to_disabled() {
    let mut machine = Machine::new(CommTransition, CommState::Communicating);
    machine.fire(CommEvent::Disable).unwrap();
    assert_eq!(*machine.state(), CommState::Disabled);
  }

  #[test]
  fn unhandled_event_is_illegal_transition() {
    let mut machine = Machine::new(CommTransition, CommState::Disabled);
    let err = machine.fire(CommEvent::Selected).unwrap_err();
    assert_eq!(err.state, CommState::Disabled);
  }
}
