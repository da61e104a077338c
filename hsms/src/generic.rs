//! # GENERIC SERVICES
//! **Based on SEMI E37-1109§7**
//!
//! The Select/Deselect/Linktest/Reject/Separate control procedures layered
//! over [primitive] framing, plus correlated data-message exchange. A
//! [Client] runs one dispatcher thread per connection; callers drive it
//! through [Client::data], [Client::select], [Client::deselect],
//! [Client::separate], and [Client::linktest], each of which blocks the
//! calling thread on a correlated reply (or T6 timeout).
//!
//! Primary data messages (odd function, any w) the remote entity sends are
//! delivered through the channel [Client::connect] returns, rather than
//! through a registered handler table — routing by stream/function is left
//! to the caller (the `gem` crate, in this workspace).
//!
//! Logging is an injected sink: every event worth observing — a control
//! procedure completing, a reject being sent or received, the connection
//! dropping — is reported through the [Delegate] trait rather than a
//! logging crate dependency, so the embedding application decides how (or
//! whether) to record it.
//!
//! [primitive]: crate::primitive

pub use crate::primitive::ConnectionMode;

use crate::primitive;
use secs2::{Error as SecsError, Item, Message as SecsMessage};
use std::collections::HashMap;
use std::io::{Error, ErrorKind};
use std::net::SocketAddr;
use std::ops::DerefMut;
use std::sync::atomic::{AtomicU16, Ordering::Relaxed};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

/// ## DELEGATE
///
/// The logging/decision sink a [Client] reports to and consults. All
/// methods have a default no-op or permissive body, so an embedder only
/// overrides what it cares about.
pub trait Delegate: Send + Sync {
  /// An observable event occurred; the default implementation discards it.
  fn event(&self, _event: Event) {}

  /// Decide how to respond to an incoming Select.req. Default: accept
  /// unconditionally.
  fn on_select(&self, _session: u16, _selection_count: u16) -> SelectStatus {
    SelectStatus::Ok
  }

  /// Decide how to respond to an incoming Deselect.req. Default: accept
  /// unconditionally.
  fn on_deselect(&self, _session: u16, _selection_count: u16) -> DeselectStatus {
    DeselectStatus::Ok
  }

  /// React to an incoming Separate.req. The connection is torn down
  /// regardless of this return value; it exists for the embedder to log or
  /// veto further reconnection attempts of its own accord.
  fn on_separate(&self, _session: u16) {}
}

/// ## EVENT
///
/// A notable occurrence, reported to [Delegate::event].
#[derive(Clone, Debug)]
pub enum Event {
  Connected(SocketAddr),
  Disconnected,
  Selected { session: u16 },
  Deselected { session: u16 },
  Separated { session: u16 },
  LinktestOk,
  Rejected { reason: RejectReason },
  MalformedMessage,
}

/// ## PARAMETER SETTINGS
/// **Based on SEMI E37-1109§10.2**
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParameterSettings {
  pub connect_mode: ConnectionMode,
  /// Reply timeout for a data message.
  pub t3: Duration,
  /// Connect-procedure timeout.
  pub t5: Duration,
  /// Control-transaction timeout.
  pub t6: Duration,
  /// Network intercharacter timeout.
  pub t7: Duration,
  /// Network inter-character timeout applied to the TCP stream itself.
  pub t8: Duration,
}
impl Default for ParameterSettings {
  fn default() -> Self {
    ParameterSettings {
      connect_mode: ConnectionMode::default(),
      t3: Duration::from_secs(45),
      t5: Duration::from_secs(10),
      t6: Duration::from_secs(5),
      t7: Duration::from_secs(10),
      t8: Duration::from_secs(5),
    }
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum SelectionState {
  #[default]
  NotSelected,
  Selected,
}

/// ## MESSAGE ID
///
/// A session/system pair correlating a reply to its request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageID {
  pub session: u16,
  pub system: u32,
}

/// ## MESSAGE CONTENTS
#[derive(Clone, Debug)]
pub enum MessageContents {
  DataMessage(SecsMessage),
  SelectRequest,
  SelectResponse(u8),
  DeselectRequest,
  DeselectResponse(u8),
  LinktestRequest,
  LinktestResponse,
  RejectRequest(u8, u8),
  SeparateRequest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
enum SessionType {
  DataMessage = 0,
  SelectRequest = 1,
  SelectResponse = 2,
  DeselectRequest = 3,
  DeselectResponse = 4,
  LinktestRequest = 5,
  LinktestResponse = 6,
  RejectRequest = 7,
  SeparateRequest = 9,
}

#[derive(Clone, Debug)]
struct Message {
  id: MessageID,
  contents: MessageContents,
}
impl From<Message> for primitive::Message {
  fn from(message: Message) -> Self {
    let (session_id, byte_2, byte_3, session_type) = match &message.contents {
      MessageContents::DataMessage(m) => (message.id.session, ((m.w as u8) << 7) | m.stream, m.function, SessionType::DataMessage),
      MessageContents::SelectRequest => (message.id.session, 0, 0, SessionType::SelectRequest),
      MessageContents::SelectResponse(status) => (message.id.session, 0, *status, SessionType::SelectResponse),
      MessageContents::DeselectRequest => (message.id.session, 0, 0, SessionType::DeselectRequest),
      MessageContents::DeselectResponse(status) => (message.id.session, 0, *status, SessionType::DeselectResponse),
      MessageContents::LinktestRequest => (0xFFFF, 0, 0, SessionType::LinktestRequest),
      MessageContents::LinktestResponse => (0xFFFF, 0, 0, SessionType::LinktestResponse),
      MessageContents::RejectRequest(msg_type, reason) => (message.id.session, *msg_type, *reason, SessionType::RejectRequest),
      MessageContents::SeparateRequest => (message.id.session, 0, 0, SessionType::SeparateRequest),
    };
    let text = match &message.contents {
      MessageContents::DataMessage(m) => match &m.text {
        Some(item) => item.clone().encode().unwrap_or_default(),
        None => vec![],
      },
      _ => vec![],
    };
    primitive::Message {
      header: primitive::MessageHeader { session_id, byte_2, byte_3, presentation_type: 0, session_type: session_type as u8, system: message.id.system },
      text,
    }
  }
}
impl TryFrom<primitive::Message> for Message {
  type Error = RejectReason;

  fn try_from(message: primitive::Message) -> Result<Self, Self::Error> {
    if message.header.presentation_type != 0 {
      return Err(RejectReason::UnsupportedPresentationType);
    }
    let id = MessageID { session: message.header.session_id, system: message.header.system };
    let contents = match message.header.session_type {
      0 => MessageContents::DataMessage(SecsMessage {
        stream: message.header.byte_2 & 0b0111_1111,
        function: message.header.byte_3,
        w: message.header.byte_2 & 0b1000_0000 > 0,
        text: match Item::try_from(message.text) {
          Ok(text) => Some(text),
          Err(SecsError::EmptyText) => None,
          Err(_) => return Err(RejectReason::MalformedData),
        },
      }),
      1 => MessageContents::SelectRequest,
      2 => MessageContents::SelectResponse(message.header.byte_3),
      3 => MessageContents::DeselectRequest,
      4 => MessageContents::DeselectResponse(message.header.byte_3),
      5 => MessageContents::LinktestRequest,
      6 => MessageContents::LinktestResponse,
      7 => MessageContents::RejectRequest(message.header.byte_2, message.header.byte_3),
      9 => MessageContents::SeparateRequest,
      _ => return Err(RejectReason::UnsupportedSessionType),
    };
    Ok(Message { id, contents })
  }
}

/// ## SELECT STATUS
/// **Based on SEMI E37-1109§8.3.4.2**
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SelectStatus {
  Ok = 0,
  AlreadyActive = 1,
  NotReady = 2,
  Exhausted = 3,
  NoSuchEntity = 4,
}

/// ## DESELECT STATUS
/// **Based on SEMI E37-1109§8.3.5.2**
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DeselectStatus {
  Ok = 0,
  NotEstablished = 1,
  Busy = 2,
}

/// ## REJECT REASON
/// **Based on SEMI E37-1109§8.3.7**
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RejectReason {
  MalformedData = 0,
  UnsupportedSessionType = 1,
  UnsupportedPresentationType = 2,
  TransactionNotOpen = 3,
  EntityNotSelected = 4,
}

/// ## CLIENT
pub struct Client {
  parameter_settings: ParameterSettings,
  delegate: Arc<dyn Delegate>,
  primitive_client: Arc<primitive::Client>,
  selection_mutex: Mutex<()>,
  selection_count: AtomicU16,
  selection_state: Mutex<SelectionState>,
  outbox: Mutex<HashMap<MessageID, oneshot::Sender<Option<Message>>>>,
}
impl Client {
  pub fn new(parameter_settings: ParameterSettings, delegate: Arc<dyn Delegate>) -> Arc<Self> {
    Arc::new(Client {
      parameter_settings,
      delegate,
      primitive_client: primitive::Client::new(),
      selection_mutex: Mutex::new(()),
      selection_count: AtomicU16::new(0),
      selection_state: Mutex::new(SelectionState::NotSelected),
      outbox: Mutex::new(HashMap::new()),
    })
  }

  /// ### CONNECT PROCEDURE
  /// **Based on SEMI E37-1109§6.3.4-6.3.7**
  pub fn connect(self: &Arc<Self>, entity: &str) -> Result<(SocketAddr, Receiver<(MessageID, SecsMessage)>), Error> {
    let (socket, rx_receiver) = self.primitive_client.connect(entity, self.parameter_settings.connect_mode, self.parameter_settings.t5, self.parameter_settings.t8)?;
    self.delegate.event(Event::Connected(socket));

    let (data_sender, data_receiver) = channel();
    let clone = self.clone();
    thread::spawn(move || clone.receive(rx_receiver, data_sender));

    Ok((socket, data_receiver))
  }

  /// ### DISCONNECT PROCEDURE
  /// **Based on SEMI E37-1109§6.4-6.5**
  pub fn disconnect(self: &Arc<Self>) -> Result<(), Error> {
    let result = self.primitive_client.disconnect();
    let _guard = self.selection_mutex.lock().unwrap();
    *self.selection_state.lock().unwrap() = SelectionState::NotSelected;
    self.selection_count.store(0, Relaxed);
    self.delegate.event(Event::Disconnected);
    result
  }

  fn transmit(self: &Arc<Self>, message: Message, reply_expected: bool, timeout: Duration) -> Result<Option<Message>, Error> {
    if !reply_expected {
      return self.primitive_client.transmit(message.into()).map(|_| None);
    }
    let (tx, rx) = oneshot::channel();
    self.outbox.lock().unwrap().insert(message.id, tx);
    if let Err(error) = self.primitive_client.transmit(message.clone().into()) {
      self.outbox.lock().unwrap().remove(&message.id);
      return Err(error);
    }
    match rx.recv_timeout(timeout) {
      Ok(reply) => Ok(reply),
      Err(_) => {
        self.outbox.lock().unwrap().remove(&message.id);
        Ok(None)
      }
    }
  }

  /// ### DATA PROCEDURE
  /// **Based on SEMI E37-1109§7**
  ///
  /// A T3 reply timeout surfaces as `Ok(None)` rather than tearing down the
  /// connection: T3 bounds one transaction, not the session, and a caller
  /// (e.g. `gem::common`'s establish-communications retry) may have its
  /// own recovery behavior for an absent reply.
  pub fn data(self: &Arc<Self>, id: MessageID, message: SecsMessage) -> JoinHandle<Result<Option<SecsMessage>, Error>> {
    let clone = self.clone();
    let reply_expected = message.function % 2 == 1 && message.w;
    thread::spawn(move || {
      if *clone.selection_state.lock().unwrap() == SelectionState::NotSelected {
        return Err(Error::new(ErrorKind::NotConnected, "hsms::generic::Client::data"));
      }
      match clone.transmit(Message { id, contents: MessageContents::DataMessage(message) }, reply_expected, clone.parameter_settings.t3)? {
        None => Ok(None),
        Some(Message { contents: MessageContents::DataMessage(data), .. }) => Ok(Some(data)),
        Some(_) => Err(Error::new(ErrorKind::InvalidData, "hsms::generic::Client::data")),
      }
    })
  }

  /// ### SELECT PROCEDURE
  /// **Based on SEMI E37-1109§7.3-7.4**
  pub fn select(self: &Arc<Self>, id: MessageID) -> JoinHandle<Result<(), Error>> {
    let clone = self.clone();
    thread::spawn(move || {
      let _guard = clone.selection_mutex.lock().unwrap();
      match clone.transmit(Message { id, contents: MessageContents::SelectRequest }, true, clone.parameter_settings.t6)? {
        None => {
          clone.disconnect()?;
          Err(Error::new(ErrorKind::ConnectionAborted, "hsms::generic::Client::select"))
        }
        Some(Message { contents: MessageContents::SelectResponse(status), .. }) => {
          if status == SelectStatus::Ok as u8 {
            clone.selection_count.fetch_add(1, Relaxed);
            *clone.selection_state.lock().unwrap() = SelectionState::Selected;
            clone.delegate.event(Event::Selected { session: id.session });
            Ok(())
          } else {
            Err(Error::new(ErrorKind::PermissionDenied, "hsms::generic::Client::select"))
          }
        }
        Some(_) => Err(Error::new(ErrorKind::InvalidData, "hsms::generic::Client::select")),
      }
    })
  }

  /// ### DESELECT PROCEDURE
  /// **Based on SEMI E37-1109§7.7**
  pub fn deselect(self: &Arc<Self>, id: MessageID) -> JoinHandle<Result<(), Error>> {
    let clone = self.clone();
    thread::spawn(move || {
      let _guard = clone.selection_mutex.lock().unwrap();
      match clone.transmit(Message { id, contents: MessageContents::DeselectRequest }, true, clone.parameter_settings.t6)? {
        None => {
          clone.disconnect()?;
          Err(Error::new(ErrorKind::ConnectionAborted, "hsms::generic::Client::deselect"))
        }
        Some(Message { contents: MessageContents::DeselectResponse(status), .. }) => {
          if status == DeselectStatus::Ok as u8 {
            let remaining = clone.selection_count.load(Relaxed).saturating_sub(1);
            clone.selection_count.store(remaining, Relaxed);
            if remaining == 0 {
              *clone.selection_state.lock().unwrap() = SelectionState::NotSelected;
            }
            clone.delegate.event(Event::Deselected { session: id.session });
            Ok(())
          } else {
            Err(Error::new(ErrorKind::PermissionDenied, "hsms::generic::Client::deselect"))
          }
        }
        Some(_) => Err(Error::new(ErrorKind::InvalidData, "hsms::generic::Client::deselect")),
      }
    })
  }

  /// ### SEPARATE PROCEDURE
  /// **Based on SEMI E37-1109§7.6**
  pub fn separate(self: &Arc<Self>, id: MessageID) -> JoinHandle<Result<(), Error>> {
    let clone = self.clone();
    thread::spawn(move || {
      clone.primitive_client.transmit(Message { id, contents: MessageContents::SeparateRequest }.into())?;
      clone.disconnect()
    })
  }

  /// ### LINKTEST PROCEDURE
  /// **Based on SEMI E37-1109§7.5**
  ///
  /// A T6 timeout here is advisory only and does not tear down the
  /// connection — linktest exists to detect a dead peer, and a caller
  /// that wants the connection dropped after repeated failures decides
  /// that policy itself from the returned [TimedOut] error.
  /// [TimedOut]: ErrorKind::TimedOut
  pub fn linktest(self: &Arc<Self>, system: u32) -> JoinHandle<Result<(), Error>> {
    let clone = self.clone();
    thread::spawn(move || {
      let id = MessageID { session: 0xFFFF, system };
      match clone.transmit(Message { id, contents: MessageContents::LinktestRequest }, true, clone.parameter_settings.t6)? {
        Some(Message { contents: MessageContents::LinktestResponse, .. }) => {
          clone.delegate.event(Event::LinktestOk);
          Ok(())
        }
        None => Err(Error::new(ErrorKind::TimedOut, "hsms::generic::Client::linktest")),
        Some(_) => Err(Error::new(ErrorKind::InvalidData, "hsms::generic::Client::linktest")),
      }
    })
  }

  fn reject(self: &Arc<Self>, id: MessageID, message_type: u8, reason: RejectReason) -> Result<(), Error> {
    self.delegate.event(Event::Rejected { reason });
    self.primitive_client.transmit(Message { id, contents: MessageContents::RejectRequest(message_type, reason as u8) }.into())
  }

  /// The dispatcher thread started by [Client::connect]. Handles control
  /// procedures automatically (consulting [Delegate] for Select/Deselect/
  /// Separate) and correlates responses against [Client::transmit]'s
  /// outbox; primary data messages are forwarded to `data_sender`.
  fn receive(self: &Arc<Self>, rx_receiver: Receiver<primitive::Message>, data_sender: Sender<(MessageID, SecsMessage)>) {
    for primitive_message in rx_receiver {
      let header = primitive_message.header;
      let message = match Message::try_from(primitive_message) {
        Err(reason) => {
          self.delegate.event(Event::MalformedMessage);
          let message_type = match reason {
            RejectReason::UnsupportedPresentationType => header.presentation_type,
            _ => header.session_type,
          };
          if self.reject(MessageID { session: header.session_id, system: header.system }, message_type, reason).is_err() {
            break;
          }
          continue;
        }
        Ok(message) => message,
      };

      match message.contents {
        MessageContents::DataMessage(data) => {
          if *self.selection_state.lock().unwrap() == SelectionState::NotSelected {
            if self.reject(message.id, 0, RejectReason::EntityNotSelected).is_err() {
              break;
            }
            continue;
          }
          if data.function % 2 == 1 {
            if data_sender.send((message.id, data)).is_err() {
              break;
            }
          } else if let Some(sender) = self.outbox.lock().unwrap().deref_mut().remove(&message.id) {
            let _ = sender.send(Some(Message { id: message.id, contents: MessageContents::DataMessage(data) }));
          } else if self.reject(message.id, 0, RejectReason::TransactionNotOpen).is_err() {
            break;
          }
        }
        MessageContents::SelectRequest => {
          if let Ok(_guard) = self.selection_mutex.try_lock() {
            let count = self.selection_count.load(Relaxed);
            let status = self.delegate.on_select(message.id.session, count);
            if status == SelectStatus::Ok {
              self.selection_count.store(count + 1, Relaxed);
              *self.selection_state.lock().unwrap() = SelectionState::Selected;
              self.delegate.event(Event::Selected { session: message.id.session });
            }
            if self.primitive_client.transmit(Message { id: message.id, contents: MessageContents::SelectResponse(status as u8) }.into()).is_err() {
              break;
            }
          }
        }
        MessageContents::DeselectRequest => {
          if let Ok(_guard) = self.selection_mutex.try_lock() {
            let count = self.selection_count.load(Relaxed);
            let status = if count > 0 { self.delegate.on_deselect(message.id.session, count) } else { DeselectStatus::NotEstablished };
            if status == DeselectStatus::Ok {
              let remaining = count.saturating_sub(1);
              self.selection_count.store(remaining, Relaxed);
              if remaining == 0 {
                *self.selection_state.lock().unwrap() = SelectionState::NotSelected;
              }
              self.delegate.event(Event::Deselected { session: message.id.session });
            }
            if self.primitive_client.transmit(Message { id: message.id, contents: MessageContents::DeselectResponse(status as u8) }.into()).is_err() {
              break;
            }
          }
        }
        MessageContents::SeparateRequest => {
          self.delegate.on_separate(message.id.session);
          self.delegate.event(Event::Separated { session: message.id.session });
          break;
        }
        MessageContents::LinktestRequest => {
          if self.primitive_client.transmit(Message { id: message.id, contents: MessageContents::LinktestResponse }.into()).is_err() {
            break;
          }
        }
        MessageContents::SelectResponse(status) => {
          if let Some(sender) = self.outbox.lock().unwrap().deref_mut().remove(&message.id) {
            let _ = sender.send(Some(Message { id: message.id, contents: MessageContents::SelectResponse(status) }));
          }
        }
        MessageContents::DeselectResponse(status) => {
          if let Some(sender) = self.outbox.lock().unwrap().deref_mut().remove(&message.id) {
            let _ = sender.send(Some(Message { id: message.id, contents: MessageContents::DeselectResponse(status) }));
          }
        }
        MessageContents::LinktestResponse => {
          if let Some(sender) = self.outbox.lock().unwrap().deref_mut().remove(&message.id) {
            let _ = sender.send(Some(Message { id: message.id, contents: MessageContents::LinktestResponse }));
          }
        }
        MessageContents::RejectRequest(_type, reason) => {
          if let Some(sender) = self.outbox.lock().unwrap().deref_mut().remove(&message.id) {
            let _ = sender.send(None);
          }
          self.delegate.event(Event::Rejected { reason: reject_reason_from(reason) });
        }
      }
    }
  }
}

fn reject_reason_from(code: u8) -> RejectReason {
  match code {
    1 => RejectReason::UnsupportedSessionType,
    2 => RejectReason::UnsupportedPresentationType,
    3 => RejectReason::TransactionNotOpen,
    4 => RejectReason::EntityNotSelected,
    _ => RejectReason::MalformedData,
  }
}
