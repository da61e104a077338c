//! ## CONTROL STATE MACHINE (C8) AND EQUIPMENT-SIDE DICTIONARIES
//! **Based on SEMI E30-1107§5.3 and §6 (status variables, equipment
//! constants, collection events, alarms, remote commands)**
//!
//! [Handler] plays the equipment role against one [hsms::generic::Client]
//! connection: it owns the control-state machine, the five equipment-side
//! dictionaries, and the stream/function handlers that answer whatever a
//! host sends once [common::CommClient] has forwarded it past the
//! communication-state handshake.
//!
//! [common::CommClient]: crate::common::CommClient

use crate::common::CommClient;
use crate::{Event, EventSink, SystemCounter};
use fsm::{IllegalTransition, Machine, Transition};
use hsms::generic::{Client as HsmsClient, MessageID};
use secs2::items::*;
use secs2::messages::s1::*;
use secs2::messages::s2::*;
use secs2::messages::s5::*;
use secs2::messages::s6::*;
use secs2::messages::s7::*;
use secs2::messages::s9::*;
use secs2::Message as SecsMessage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering::Relaxed};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Built-in equipment constant `EstablishCommunicationsTimeout`
/// (SEMI E30§5.2.3, range 10-120s, default 10s).
pub const ECID_ESTABLISH_COMM_TIMEOUT: i64 = 1;
/// Built-in equipment constant `TimeFormat` (0-2, default 1), controlling
/// which of the three [SVID_CLOCK] representations is returned.
pub const ECID_TIME_FORMAT: i64 = 2;

/// Built-in status variable `Clock`: wall-clock time formatted per
/// [ECID_TIME_FORMAT].
pub const SVID_CLOCK: i64 = 1001;
/// Built-in status variable `ControlState`: the current [ControlState],
/// encoded as 1=`EQUIPMENT_OFFLINE`, 2=`ATTEMPT_ONLINE`, 3=`HOST_OFFLINE`,
/// 4=`ONLINE_LOCAL`, 5=`ONLINE_REMOTE`.
pub const SVID_CONTROL_STATE: i64 = 1002;
/// Built-in status variable `EventsEnabled`: count of currently-enabled
/// collection events.
pub const SVID_EVENTS_ENABLED: i64 = 1003;
/// Built-in status variable `AlarmsEnabled`: count of currently-enabled
/// alarms.
pub const SVID_ALARMS_ENABLED: i64 = 1004;
/// Built-in status variable `AlarmsSet`: count of alarms currently set.
pub const SVID_ALARMS_SET: i64 = 1005;

/// Vendor-assigned built-in collection event fired when the control state
/// leaves `HOST_OFFLINE`/`EQUIPMENT_OFFLINE` back to `ON_LINE`, and its
/// offline counterpart, mirroring the always-present CEIDs real GEM
/// equipment ships alongside whatever a host configures.
pub const CEID_EQUIPMENT_OFFLINE: i64 = 1;
pub const CEID_CONTROL_STATE_LOCAL: i64 = 2;
pub const CEID_CONTROL_STATE_REMOTE: i64 = 3;

/// ## CANONICAL DICTIONARY KEY
///
/// [StatusVariableID], [EquipmentConstantID], [CollectionEventID],
/// [ReportID], and [AlarmID] all carry the same "ASCII or any integer
/// width" wire shape, but none of them derive `Hash`/`Eq` (their values
/// round-trip through [secs2::Item] vectors, which don't either). Rather
/// than widen those item types for map-key convenience, dictionaries here
/// key on this narrower type instead: an ECID sent as `U2(1)` and one
/// sent as `U4(1)` both resolve to `Id::Num(1)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Id {
  Ascii(String),
  Num(i64),
}

/// Bridges a wire ID type into [Id] without requiring it to implement
/// `Hash`/`Eq` itself.
pub trait IdKey {
  fn id_key(&self) -> Id;
}
macro_rules! id_key_numeric {
  ($ty:ident) => {
    impl IdKey for $ty {
      fn id_key(&self) -> Id {
        match self {
          $ty::Ascii(s) => Id::Ascii(s.clone()),
          $ty::I1(v) => Id::Num(*v as i64),
          $ty::I2(v) => Id::Num(*v as i64),
          $ty::I4(v) => Id::Num(*v as i64),
          $ty::I8(v) => Id::Num(*v),
          $ty::U1(v) => Id::Num(*v as i64),
          $ty::U2(v) => Id::Num(*v as i64),
          $ty::U4(v) => Id::Num(*v as i64),
          $ty::U8(v) => Id::Num(*v as i64),
        }
      }
    }
  };
}
id_key_numeric! {StatusVariableID}
id_key_numeric! {EquipmentConstantID}
id_key_numeric! {CollectionEventID}
id_key_numeric! {ReportID}
impl IdKey for AlarmID {
  fn id_key(&self) -> Id {
    match self {
      AlarmID::I1(v) => Id::Num(*v as i64),
      AlarmID::I2(v) => Id::Num(*v as i64),
      AlarmID::I4(v) => Id::Num(*v as i64),
      AlarmID::I8(v) => Id::Num(*v),
      AlarmID::U1(v) => Id::Num(*v as i64),
      AlarmID::U2(v) => Id::Num(*v as i64),
      AlarmID::U4(v) => Id::Num(*v as i64),
      AlarmID::U8(v) => Id::Num(*v as i64),
    }
  }
}
impl IdKey for RemoteCommand {
  fn id_key(&self) -> Id {
    match self {
      RemoteCommand::Ascii(s) => Id::Ascii(s.clone()),
      RemoteCommand::I1(v) => Id::Num(*v as i64),
      RemoteCommand::I2(v) => Id::Num(*v as i64),
      RemoteCommand::I4(v) => Id::Num(*v as i64),
      RemoteCommand::I8(v) => Id::Num(*v),
      RemoteCommand::U1(v) => Id::Num(*v as i64),
      RemoteCommand::U2(v) => Id::Num(*v as i64),
      RemoteCommand::U4(v) => Id::Num(*v as i64),
      RemoteCommand::U8(v) => Id::Num(*v as i64),
    }
  }
}

/// ## EQUIPMENT CONSTANT
/// **Based on SEMI E30§6.4**
#[derive(Clone, Debug)]
pub struct EquipmentConstant {
  pub name: String,
  pub min: StatusVariableValue,
  pub max: StatusVariableValue,
  pub default: StatusVariableValue,
  pub value: StatusVariableValue,
}
impl EquipmentConstant {
  pub fn new(name: impl Into<String>, min: StatusVariableValue, max: StatusVariableValue, default: StatusVariableValue) -> Self {
    EquipmentConstant { name: name.into(), min, max, value: default.clone(), default }
  }

  /// Range-checks a candidate value against `min`/`max` when both sides
  /// resolve to a comparable scalar number; a non-numeric or unbounded
  /// constant (empty-list `min`/`max`) always passes.
  pub fn within_range(&self, candidate: &StatusVariableValue) -> bool {
    let (Some(lo), Some(hi), Some(val)) = (scalar_f64(&self.min), scalar_f64(&self.max), scalar_f64(candidate)) else {
      return true;
    };
    val >= lo && val <= hi
  }
}

/// Extracts a single numeric scalar out of whichever [StatusVariableValue]
/// variant carries one, for range-checking and arithmetic comparisons.
/// Multi-element vectors and non-numeric formats have no scalar reading.
pub fn scalar_f64(value: &StatusVariableValue) -> Option<f64> {
  use StatusVariableValue::*;
  Some(match value {
    I1(v) if v.len() == 1 => v[0] as f64,
    I2(v) if v.len() == 1 => v[0] as f64,
    I4(v) if v.len() == 1 => v[0] as f64,
    I8(v) if v.len() == 1 => v[0] as f64,
    U1(v) if v.len() == 1 => v[0] as f64,
    U2(v) if v.len() == 1 => v[0] as f64,
    U4(v) if v.len() == 1 => v[0] as f64,
    U8(v) if v.len() == 1 => v[0] as f64,
    F4(v) if v.len() == 1 => v[0] as f64,
    F8(v) if v.len() == 1 => v[0],
    _ => return None,
  })
}

/// ## COLLECTION EVENT
/// **Based on SEMI E30§6.5**
#[derive(Clone, Debug, Default)]
pub struct CollectionEvent {
  pub linked_reports: Vec<ReportID>,
  pub enabled: bool,
}

/// ## REPORT DEFINITION
/// **Based on SEMI E30§6.5, defined via S2F33**
#[derive(Clone, Debug)]
pub struct ReportDefinition {
  pub variables: Vec<StatusVariableID>,
}

/// ## ALARM ENTRY
/// **Based on SEMI E30§6.6**
#[derive(Clone, Debug)]
pub struct AlarmEntry {
  pub text: String,
  pub enabled: bool,
  pub set: bool,
}

/// A registered remote command: the accepted parameter names, the closure
/// that performs the work once S2F42's immediate acknowledge has already
/// gone out, and the collection event (if any) fired on completion.
pub struct RemoteCommandEntry {
  pub params: Vec<String>,
  pub handler: Box<dyn Fn(Vec<(ParameterName, ParameterValue)>) + Send + Sync>,
  pub completion_ceid: Option<CollectionEventID>,
}
impl std::fmt::Debug for RemoteCommandEntry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RemoteCommandEntry").field("params", &self.params).finish()
  }
}

/// ## STATE
/// **Based on SEMI E30-1107§5.3, Figure 6**
///
/// `AttemptOnline` models both `HOST_OFFLINE`'s and `EQUIPMENT_OFFLINE`'s
/// shared S1F17 validation step: the request is acknowledged immediately,
/// but the transition to `OnLineLocal` only completes once the equipment
/// has confirmed the host is actually reachable (an S1F1/S1F2 roundtrip),
/// matching how real equipment avoids announcing itself on-line to a host
/// that has already walked away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlState {
  EquipmentOffline,
  HostOffline,
  AttemptOnline,
  OnLineLocal,
  OnLineRemote,
}

#[derive(Debug)]
pub enum ControlEvent {
  /// The host sent S1F15 (carries the reply's `MessageID`).
  RemoteOfflineRequested(MessageID),
  /// The host sent S1F17 (carries the reply's `MessageID`).
  RemoteOnlineRequested(MessageID),
  /// An operator-initiated equivalent of S1F15/S1F17, for a local HMI.
  OperatorOffline,
  OperatorOnline,
  /// The S1F1/S1F2 validation roundtrip following a remote online request
  /// confirmed the host is present.
  ValidationSucceeded,
  ValidationFailed,
  /// An operator switched between local and remote control while on-line.
  SwitchToLocal,
  SwitchToRemote,
}

/// Side effects a control-state transition can request. More than one
/// field may be set at once (e.g. an accepted S1F17 both sends the ack
/// and starts the validation roundtrip), so this is a struct rather than
/// a single-variant enum like [crate::common::CommOutput].
#[derive(Debug, Default)]
pub struct ControlOutput {
  pub online_ack: Option<(MessageID, OnLineAcknowledge)>,
  pub offline_ack: Option<(MessageID, OffLineAcknowledge)>,
  pub start_validation: bool,
  pub fire_ceid: Option<i64>,
}

struct ControlTransition;
impl Transition for ControlTransition {
  type State = ControlState;
  type Event = ControlEvent;
  type Output = ControlOutput;

  fn apply(&self, state: &ControlState, event: ControlEvent) -> Result<(ControlState, ControlOutput), IllegalTransition<ControlState, ControlEvent>> {
    use ControlEvent::*;
    use ControlState::*;
    let state = *state;
    Ok(match (state, event) {
      (OnLineLocal, RemoteOfflineRequested(id)) | (OnLineRemote, RemoteOfflineRequested(id)) => (
        HostOffline,
        ControlOutput { offline_ack: Some((id, OffLineAcknowledge::Acknowledge)), fire_ceid: Some(CEID_EQUIPMENT_OFFLINE), ..Default::default() },
      ),
      (other, RemoteOfflineRequested(id)) if other != OnLineLocal && other != OnLineRemote => {
        (other, ControlOutput { offline_ack: Some((id, OffLineAcknowledge::Acknowledge)), ..Default::default() })
      }
      (HostOffline, RemoteOnlineRequested(id)) => (
        AttemptOnline,
        ControlOutput { online_ack: Some((id, OnLineAcknowledge::Accepted)), start_validation: true, ..Default::default() },
      ),
      (EquipmentOffline, RemoteOnlineRequested(id)) => {
        (EquipmentOffline, ControlOutput { online_ack: Some((id, OnLineAcknowledge::NotAllowed)), ..Default::default() })
      }
      (OnLineLocal, RemoteOnlineRequested(id)) | (OnLineRemote, RemoteOnlineRequested(id)) => {
        (state, ControlOutput { online_ack: Some((id, OnLineAcknowledge::AlreadyOnLine)), ..Default::default() })
      }
      (HostOffline, OperatorOffline) => (EquipmentOffline, ControlOutput::default()),
      (OnLineLocal, OperatorOffline) | (OnLineRemote, OperatorOffline) => {
        (EquipmentOffline, ControlOutput { fire_ceid: Some(CEID_EQUIPMENT_OFFLINE), ..Default::default() })
      }
      (EquipmentOffline, OperatorOnline) => (HostOffline, ControlOutput::default()),
      (AttemptOnline, ValidationSucceeded) => (OnLineRemote, ControlOutput { fire_ceid: Some(CEID_CONTROL_STATE_REMOTE), ..Default::default() }),
      (AttemptOnline, ValidationFailed) => (HostOffline, ControlOutput::default()),
      (OnLineRemote, SwitchToLocal) => (OnLineLocal, ControlOutput { fire_ceid: Some(CEID_CONTROL_STATE_LOCAL), ..Default::default() }),
      (OnLineLocal, SwitchToRemote) => (OnLineRemote, ControlOutput { fire_ceid: Some(CEID_CONTROL_STATE_REMOTE), ..Default::default() }),
      (state, event) => return Err(IllegalTransition { state, event }),
    })
  }
}

/// ## HANDLER
///
/// Owns the control-state machine plus every equipment-side dictionary,
/// and answers the stream/function traffic [common::CommClient::start]
/// forwards once the connection is `COMMUNICATING`.
///
/// [common::CommClient::start]: crate::common::CommClient::start
pub struct Handler {
  model: ModelName,
  revision: SoftwareRevision,
  hsms: Arc<HsmsClient>,
  session: u16,
  system: SystemCounter,
  comm: Arc<CommClient>,
  sink: Arc<dyn EventSink>,
  machine: Mutex<Machine<ControlTransition>>,
  status_variables: Mutex<HashMap<Id, (StatusVariableID, StatusVariableName, StatusVariableValue)>>,
  equipment_constants: Mutex<HashMap<Id, (EquipmentConstantID, EquipmentConstant)>>,
  collection_events: Mutex<HashMap<Id, (CollectionEventID, CollectionEvent)>>,
  reports: Mutex<HashMap<Id, (ReportID, ReportDefinition)>>,
  alarms: Mutex<HashMap<Id, (AlarmID, AlarmEntry)>>,
  remote_commands: Mutex<HashMap<Id, RemoteCommandEntry>>,
  time_format: AtomicU32,
  next_data_id: AtomicU32,
}
impl Handler {
  pub fn new(model: ModelName, revision: SoftwareRevision, hsms: Arc<HsmsClient>, session: u16, system: SystemCounter, comm: Arc<CommClient>, sink: Arc<dyn EventSink>) -> Arc<Self> {
    let mut equipment_constants = HashMap::new();
    equipment_constants.insert(
      Id::Num(ECID_ESTABLISH_COMM_TIMEOUT),
      (
        EquipmentConstantID::U4(ECID_ESTABLISH_COMM_TIMEOUT as u32),
        EquipmentConstant::new(
          "EstablishCommunicationsTimeout",
          StatusVariableValue::U4(vec![10]),
          StatusVariableValue::U4(vec![120]),
          StatusVariableValue::U4(vec![10]),
        ),
      ),
    );
    equipment_constants.insert(
      Id::Num(ECID_TIME_FORMAT),
      (
        EquipmentConstantID::U4(ECID_TIME_FORMAT as u32),
        EquipmentConstant::new("TimeFormat", StatusVariableValue::U4(vec![0]), StatusVariableValue::U4(vec![2]), StatusVariableValue::U4(vec![1])),
      ),
    );
    Arc::new(Handler {
      model,
      revision,
      hsms,
      session,
      system,
      comm,
      sink,
      machine: Mutex::new(Machine::new(ControlTransition, ControlState::EquipmentOffline)),
      status_variables: Mutex::new(HashMap::new()),
      equipment_constants: Mutex::new(equipment_constants),
      collection_events: Mutex::new(HashMap::new()),
      reports: Mutex::new(HashMap::new()),
      alarms: Mutex::new(HashMap::new()),
      remote_commands: Mutex::new(HashMap::new()),
      time_format: AtomicU32::new(1),
      next_data_id: AtomicU32::new(1),
    })
  }

  pub fn state(&self) -> ControlState {
    *self.machine.lock().unwrap().state()
  }

  /// Registers (or overwrites) a status variable's current name/value.
  /// Built-in SVIDs 1001-1005 are reserved and served internally; this
  /// has no effect if called with one of those numbers.
  pub fn set_status_variable(&self, id: StatusVariableID, name: impl Into<String>, value: StatusVariableValue) {
    let key = id.id_key();
    if is_builtin_svid(&key) {
      return;
    }
    self.status_variables.lock().unwrap().insert(key, (id, StatusVariableName(name.into()), value));
  }

  pub fn set_equipment_constant(&self, id: EquipmentConstantID, name: impl Into<String>, min: StatusVariableValue, max: StatusVariableValue, default: StatusVariableValue) {
    let key = id.id_key();
    self.equipment_constants.lock().unwrap().insert(key, (id, EquipmentConstant::new(name, min, max, default)));
  }

  pub fn register_alarm(&self, id: AlarmID, text: impl Into<String>) {
    self.alarms.lock().unwrap().insert(id.id_key(), (id, AlarmEntry { text: text.into(), enabled: true, set: false }));
  }

  pub fn register_remote_command(&self, rcmd: RemoteCommand, params: Vec<String>, completion_ceid: Option<CollectionEventID>, handler: impl Fn(Vec<(ParameterName, ParameterValue)>) + Send + Sync + 'static) {
    self.remote_commands.lock().unwrap().insert(rcmd.id_key(), RemoteCommandEntry { params, handler: Box::new(handler), completion_ceid });
  }

  /// Spawns the dispatcher: every forwarded inbound message is handled on
  /// its own worker thread so one slow handler cannot stall the others,
  /// matching the concurrency shape `hsms::generic::Client`'s own
  /// `receive` loop uses for outbox delivery.
  pub fn start(self: &Arc<Self>, rx: Receiver<(MessageID, SecsMessage)>) {
    let handler = self.clone();
    thread::spawn(move || {
      for (id, message) in rx {
        let handler = handler.clone();
        thread::spawn(move || handler.handle_message(id, message));
      }
    });
  }

  pub fn set_alarm(self: &Arc<Self>, id: &AlarmID) {
    self.update_alarm(id, true);
  }

  pub fn clear_alarm(self: &Arc<Self>, id: &AlarmID) {
    self.update_alarm(id, false);
  }

  fn update_alarm(self: &Arc<Self>, id: &AlarmID, set: bool) {
    let key = id.id_key();
    let (should_send, text) = {
      let mut alarms = self.alarms.lock().unwrap();
      let Some((_, entry)) = alarms.get_mut(&key) else { return };
      entry.set = set;
      (entry.enabled, entry.text.clone())
    };
    if should_send {
      let code = AlarmCode(if set { 0b1000_0000 } else { 0 });
      let message: SecsMessage = AlarmReportSend(code, id.clone(), AlarmText(text)).into();
      let msg_id = MessageID { session: self.session, system: self.system.next() };
      let _ = self.hsms.data(msg_id, message);
      self.sink.event(Event::AlarmReceived { alid_display: format!("{id:?}"), set });
    }
  }

  /// Fires S6F11 for every enabled, report-bearing CEID in `ceids`. Each
  /// report's values come from whichever dictionary (status variable or
  /// equipment constant) the report's VID resolves against.
  pub fn trigger_collection_events(self: &Arc<Self>, ceids: Vec<CollectionEventID>) {
    for ceid in ceids {
      let key = ceid.id_key();
      let rptids = {
        let events = self.collection_events.lock().unwrap();
        match events.get(&key) {
          Some((_, event)) if event.enabled => event.linked_reports.clone(),
          _ => continue,
        }
      };
      let mut reports = Vec::with_capacity(rptids.len());
      for rptid in rptids {
        let vids = {
          let defs = self.reports.lock().unwrap();
          match defs.get(&rptid.id_key()) {
            Some((_, def)) => def.variables.clone(),
            None => continue,
          }
        };
        let values = vids.into_iter().map(|vid| self.read_variable(&vid)).collect();
        reports.push((rptid, values));
      }
      let data_id = DataID::U4(self.next_data_id.fetch_add(1, Relaxed));
      let message: SecsMessage = EventReportSend(data_id, ceid, reports).into();
      let msg_id = MessageID { session: self.session, system: self.system.next() };
      let _ = self.hsms.data(msg_id, message).join();
    }
  }

  /// Reads a status variable or equipment constant by VID, checking the
  /// built-in SVIDs first, then both dictionaries. An unknown VID reads
  /// back as an empty list, per SEMI E5§10.5's convention for S1F4.
  fn read_variable(&self, vid: &StatusVariableID) -> StatusVariableValue {
    let key = vid.id_key();
    if let Id::Num(n) = &key {
      if let Some(builtin) = self.read_builtin_svid(*n) {
        return builtin;
      }
    }
    if let Some((_, _, value)) = self.status_variables.lock().unwrap().get(&key) {
      return value.clone();
    }
    if let Some((_, ec)) = self.equipment_constants.lock().unwrap().get(&key) {
      return ec.value.clone();
    }
    StatusVariableValue::List(vec![])
  }

  fn read_builtin_svid(&self, n: i64) -> Option<StatusVariableValue> {
    Some(match n {
      SVID_CLOCK => StatusVariableValue::Ascii(self.format_clock()),
      SVID_CONTROL_STATE => StatusVariableValue::U4(vec![control_state_code(self.state())]),
      SVID_EVENTS_ENABLED => StatusVariableValue::U4(vec![self.collection_events.lock().unwrap().values().filter(|(_, e)| e.enabled).count() as u32]),
      SVID_ALARMS_ENABLED => StatusVariableValue::U4(vec![self.alarms.lock().unwrap().values().filter(|(_, a)| a.enabled).count() as u32]),
      SVID_ALARMS_SET => StatusVariableValue::U4(vec![self.alarms.lock().unwrap().values().filter(|(_, a)| a.set).count() as u32]),
      _ => return None,
    })
  }

  fn format_clock(&self) -> String {
    let now = chrono::Local::now();
    match self.time_format.load(Relaxed) {
      0 => now.format("%y%m%d%H%M%S").to_string(),
      2 => now.to_rfc3339(),
      _ => format!("{}{:02}", now.format("%Y%m%d%H%M%S"), now.timestamp_subsec_millis() / 10),
    }
  }

  fn all_svids(&self) -> Vec<StatusVariableID> {
    let mut out: Vec<StatusVariableID> = self.status_variables.lock().unwrap().values().map(|(id, _, _)| id.clone()).collect();
    out.extend([SVID_CLOCK, SVID_CONTROL_STATE, SVID_EVENTS_ENABLED, SVID_ALARMS_ENABLED, SVID_ALARMS_SET].map(|n| StatusVariableID::U4(n as u32)));
    out
  }

  fn control_fire_and_act(self: &Arc<Self>, event: ControlEvent) {
    let output = {
      let mut machine = self.machine.lock().unwrap();
      match machine.fire(event) {
        Ok(output) => output,
        Err(_) => return,
      }
    };
    if let Some((id, ack)) = output.online_ack {
      let message: SecsMessage = OnLineAck(ack).into();
      let _ = self.hsms.data(id, message);
    }
    if let Some((id, ack)) = output.offline_ack {
      let message: SecsMessage = OffLineAck(ack).into();
      let _ = self.hsms.data(id, message);
    }
    if output.start_validation {
      self.spawn_validation_roundtrip();
    }
    if let Some(ceid_num) = output.fire_ceid {
      self.trigger_collection_events(vec![CollectionEventID::U4(ceid_num as u32)]);
    }
  }

  /// Confirms the host is still reachable after a remote online request
  /// by sending it an S1F1 and waiting for S1F2, same pattern as
  /// [crate::common::CommClient::spawn_establish_roundtrip].
  fn spawn_validation_roundtrip(self: &Arc<Self>) {
    let clone = self.clone();
    thread::spawn(move || {
      let id = MessageID { session: clone.session, system: clone.system.next() };
      let outcome = clone.hsms.data(id, AreYouThere.into()).join();
      match outcome {
        Ok(Ok(Some(reply))) if OnLineDataHost::try_from(reply.clone()).is_ok() => clone.control_fire_and_act(ControlEvent::ValidationSucceeded),
        _ => clone.control_fire_and_act(ControlEvent::ValidationFailed),
      }
    });
  }

  fn handle_message(self: Arc<Self>, id: MessageID, message: SecsMessage) {
    let stream = message.stream;
    let function = message.function;
    let w = message.w;
    let result = match (stream, function) {
      (1, 1) => self.reply(id, AreYouThere::try_from(message).map(|_| OnLineDataEquipment((self.model.clone(), self.revision.clone())).into())),
      (1, 3) => self.handle_status_request(id, message),
      (1, 11) => self.handle_namelist_request(id, message),
      (1, 15) => {
        self.control_fire_and_act(ControlEvent::RemoteOfflineRequested(id));
        Ok(())
      }
      (1, 17) => {
        self.control_fire_and_act(ControlEvent::RemoteOnlineRequested(id));
        Ok(())
      }
      (2, 13) => self.handle_ec_request(id, message),
      (2, 15) => self.handle_ec_send(id, message),
      (2, 29) => self.handle_ec_namelist_request(id, message),
      (2, 33) => self.handle_define_report(id, message),
      (2, 35) => self.handle_link_event_report(id, message),
      (2, 37) => self.handle_enable_disable_event_report(id, message),
      (2, 41) => self.handle_host_command(id, message),
      (5, 3) => self.handle_enable_disable_alarm(id, message),
      (5, 5) => self.handle_list_alarms(id, message),
      (5, 7) => self.handle_list_enabled_alarms(id, message),
      (7, 17) => self.handle_delete_process_programs(id, message),
      (7, 19) => self.handle_current_eppd_request(id, message),
      _ => {
        if w {
          self.reply_exception(id, stream, function);
        }
        Ok(())
      }
    };
    if result.is_err() && w {
      self.reply_exception_illegal_data(id, stream, function);
    }
  }

  fn reply(self: &Arc<Self>, id: MessageID, built: Result<SecsMessage, secs2::Error>) -> Result<(), secs2::Error> {
    let message = built?;
    let _ = self.hsms.data(id, message);
    Ok(())
  }

  fn handle_status_request(self: &Arc<Self>, id: MessageID, message: SecsMessage) -> Result<(), secs2::Error> {
    let SelectedEquipmentStatusRequest(ids) = SelectedEquipmentStatusRequest::try_from(message)?;
    let ids = if ids.is_empty() { self.all_svids() } else { ids };
    let values = ids.iter().map(|vid| self.read_variable(vid)).collect();
    let _ = self.hsms.data(id, SelectedEquipmentStatusData(values).into());
    Ok(())
  }

  fn handle_namelist_request(self: &Arc<Self>, id: MessageID, message: SecsMessage) -> Result<(), secs2::Error> {
    let StatusVariableNamelistRequest(ids) = StatusVariableNamelistRequest::try_from(message)?;
    let ids = if ids.is_empty() { self.all_svids() } else { ids };
    let out = ids
      .into_iter()
      .map(|vid| {
        let name = self.svid_name(&vid);
        (vid, StatusVariableName(name))
      })
      .collect();
    let _ = self.hsms.data(id, StatusVariableNamelistReply(out).into());
    Ok(())
  }

  fn svid_name(&self, vid: &StatusVariableID) -> String {
    match vid.id_key() {
      Id::Num(SVID_CLOCK) => "Clock".to_string(),
      Id::Num(SVID_CONTROL_STATE) => "ControlState".to_string(),
      Id::Num(SVID_EVENTS_ENABLED) => "EventsEnabled".to_string(),
      Id::Num(SVID_ALARMS_ENABLED) => "AlarmsEnabled".to_string(),
      Id::Num(SVID_ALARMS_SET) => "AlarmsSet".to_string(),
      key => self.status_variables.lock().unwrap().get(&key).map(|(_, name, _)| name.0.clone()).unwrap_or_default(),
    }
  }

  fn handle_ec_request(self: &Arc<Self>, id: MessageID, message: SecsMessage) -> Result<(), secs2::Error> {
    let EquipmentConstantRequest(ids) = EquipmentConstantRequest::try_from(message)?;
    let constants = self.equipment_constants.lock().unwrap();
    let values = ids.iter().map(|ecid| constants.get(&ecid.id_key()).map(|(_, ec)| ec.value.clone()).unwrap_or(StatusVariableValue::List(vec![]))).collect();
    drop(constants);
    let _ = self.hsms.data(id, EquipmentConstantData(values).into());
    Ok(())
  }

  fn handle_ec_send(self: &Arc<Self>, id: MessageID, message: SecsMessage) -> Result<(), secs2::Error> {
    let NewEquipmentConstantSend(entries) = NewEquipmentConstantSend::try_from(message)?;
    let mut constants = self.equipment_constants.lock().unwrap();
    let mut denied = false;
    for (ecid, value) in &entries {
      match constants.get(&ecid.id_key()) {
        Some((_, ec)) if ec.within_range(value) => {}
        _ => {
          denied = true;
          break;
        }
      }
    }
    if denied {
      drop(constants);
      let _ = self.hsms.data(id, NewEquipmentConstantAcknowledge(EquipmentConstantAcknowledge::DeniedOutOfRange).into());
      return Ok(());
    }
    for (ecid, value) in entries {
      if let Some((_, ec)) = constants.get_mut(&ecid.id_key()) {
        ec.value = value.clone();
        match ecid.id_key() {
          Id::Num(ECID_TIME_FORMAT) => {
            if let Some(n) = scalar_f64(&value) {
              self.time_format.store(n as u32, Relaxed);
            }
          }
          Id::Num(ECID_ESTABLISH_COMM_TIMEOUT) => {
            if let Some(seconds) = scalar_f64(&value) {
              self.comm.set_establish_comm_timeout(Duration::from_secs_f64(seconds));
            }
          }
          _ => {}
        }
      }
    }
    drop(constants);
    let _ = self.hsms.data(id, NewEquipmentConstantAcknowledge(EquipmentConstantAcknowledge::Accepted).into());
    Ok(())
  }

  fn handle_ec_namelist_request(self: &Arc<Self>, id: MessageID, message: SecsMessage) -> Result<(), secs2::Error> {
    let EquipmentConstantNamelistRequest(ids) = EquipmentConstantNamelistRequest::try_from(message)?;
    let constants = self.equipment_constants.lock().unwrap();
    let empty = StatusVariableValue::List(vec![]);
    let out = ids
      .into_iter()
      .map(|ecid| match constants.get(&ecid.id_key()) {
        Some((_, ec)) => (ecid, EquipmentConstantName(ec.name.clone()), ec.min.clone(), ec.max.clone(), ec.default.clone()),
        None => (ecid, EquipmentConstantName(String::new()), empty.clone(), empty.clone(), empty.clone()),
      })
      .collect();
    drop(constants);
    let _ = self.hsms.data(id, EquipmentConstantNamelistReply(out).into());
    Ok(())
  }

  fn handle_define_report(self: &Arc<Self>, id: MessageID, message: SecsMessage) -> Result<(), secs2::Error> {
    let DefineReport(_, defs) = DefineReport::try_from(message)?;
    let mut reports = self.reports.lock().unwrap();
    if defs.is_empty() {
      reports.clear();
    } else {
      for (rptid, vids) in defs {
        if vids.is_empty() {
          reports.remove(&rptid.id_key());
        } else {
          reports.insert(rptid.id_key(), (rptid, ReportDefinition { variables: vids }));
        }
      }
    }
    drop(reports);
    let _ = self.hsms.data(id, DefineReportAck(DefineReportAcknowledge::Accepted).into());
    Ok(())
  }

  fn handle_link_event_report(self: &Arc<Self>, id: MessageID, message: SecsMessage) -> Result<(), secs2::Error> {
    let LinkEventReport(_, links) = LinkEventReport::try_from(message)?;
    let reports = self.reports.lock().unwrap();
    for (_, rptids) in &links {
      for rptid in rptids {
        if !reports.contains_key(&rptid.id_key()) {
          drop(reports);
          let _ = self.hsms.data(id, LinkEventReportAck(LinkReportAcknowledge::DeniedInvalidReportID).into());
          return Ok(());
        }
      }
    }
    drop(reports);
    let mut events = self.collection_events.lock().unwrap();
    for (ceid, rptids) in links {
      let entry = events.entry(ceid.id_key()).or_insert_with(|| (ceid.clone(), CollectionEvent::default()));
      if rptids.is_empty() {
        entry.1.linked_reports.clear();
      } else {
        entry.1.linked_reports = rptids;
      }
    }
    drop(events);
    let _ = self.hsms.data(id, LinkEventReportAck(LinkReportAcknowledge::Accepted).into());
    Ok(())
  }

  fn handle_enable_disable_event_report(self: &Arc<Self>, id: MessageID, message: SecsMessage) -> Result<(), secs2::Error> {
    let EnableDisableEventReport(CollectionEventEnableDisable(enable), ceids) = EnableDisableEventReport::try_from(message)?;
    let mut events = self.collection_events.lock().unwrap();
    if ceids.is_empty() {
      for (_, event) in events.values_mut() {
        event.enabled = enable;
      }
    } else {
      for ceid in &ceids {
        if !events.contains_key(&ceid.id_key()) {
          drop(events);
          let _ = self.hsms.data(id, EnableDisableEventReportAck(EnableDisableEventReportAcknowledge::DeniedInvalidEventID).into());
          return Ok(());
        }
      }
      for ceid in ceids {
        events.get_mut(&ceid.id_key()).unwrap().1.enabled = enable;
      }
    }
    drop(events);
    let _ = self.hsms.data(id, EnableDisableEventReportAck(EnableDisableEventReportAcknowledge::Accepted).into());
    Ok(())
  }

  /// S2F41 replies immediately with `InitiatedForAsynchronousCompletion`
  /// once validated, then executes the registered handler on its own
  /// thread and fires the command's completion CEID (if any) afterward,
  /// per the async-ack pattern real remote-command implementations use
  /// to avoid holding the host's T3 window open for however long the
  /// underlying action takes.
  fn handle_host_command(self: &Arc<Self>, id: MessageID, message: SecsMessage) -> Result<(), secs2::Error> {
    let HostCommandSend(rcmd, params) = HostCommandSend::try_from(message)?;
    let commands = self.remote_commands.lock().unwrap();
    let Some(entry_params) = commands.get(&rcmd.id_key()).map(|e| e.params.clone()) else {
      drop(commands);
      let _ = self.hsms.data(id, HostCommandAck(HostCommandAcknowledge::InvalidCommand, vec![]).into());
      return Ok(());
    };
    drop(commands);
    let mut bad = Vec::new();
    for (name, _) in &params {
      if !entry_params.contains(&name.0) {
        bad.push((ParameterName(name.0.clone()), ParameterAcknowledge::ParameterNameUnknown));
      }
    }
    if !bad.is_empty() {
      let _ = self.hsms.data(id, HostCommandAck(HostCommandAcknowledge::ParameterError, bad).into());
      return Ok(());
    }
    let _ = self.hsms.data(id, HostCommandAck(HostCommandAcknowledge::InitiatedForAsynchronousCompletion, vec![]).into());
    let clone = self.clone();
    let key = rcmd.id_key();
    thread::spawn(move || {
      let completion_ceid = {
        let commands = clone.remote_commands.lock().unwrap();
        let Some(entry) = commands.get(&key) else { return };
        (entry.handler)(params);
        entry.completion_ceid.clone()
      };
      if let Some(ceid) = completion_ceid {
        clone.trigger_collection_events(vec![ceid]);
      }
    });
    Ok(())
  }

  fn handle_enable_disable_alarm(self: &Arc<Self>, id: MessageID, message: SecsMessage) -> Result<(), secs2::Error> {
    let EnableDisableAlarm(aled, alid) = EnableDisableAlarm::try_from(message)?;
    let mut alarms = self.alarms.lock().unwrap();
    let ack = match alarms.get_mut(&alid.id_key()) {
      Some((_, entry)) => {
        entry.enabled = matches!(aled, AlarmEnableDisable::Enable);
        AlarmAcknowledge::Accepted
      }
      None => AlarmAcknowledge::Error,
    };
    drop(alarms);
    let _ = self.hsms.data(id, EnableDisableAlarmAck(ack).into());
    Ok(())
  }

  fn handle_list_alarms(self: &Arc<Self>, id: MessageID, message: SecsMessage) -> Result<(), secs2::Error> {
    let ListAlarmsRequest(ids) = ListAlarmsRequest::try_from(message)?;
    let alarms = self.alarms.lock().unwrap();
    let out = if ids.is_empty() {
      alarms.values().map(|(alid, entry)| (alarm_code(entry), alid.clone(), AlarmText(entry.text.clone()))).collect()
    } else {
      ids
        .into_iter()
        .filter_map(|alid| alarms.get(&alid.id_key()).map(|(stored, entry)| (alarm_code(entry), stored.clone(), AlarmText(entry.text.clone()))))
        .collect()
    };
    drop(alarms);
    let _ = self.hsms.data(id, ListAlarmsData(out).into());
    Ok(())
  }

  fn handle_list_enabled_alarms(self: &Arc<Self>, id: MessageID, message: SecsMessage) -> Result<(), secs2::Error> {
    ListEnabledAlarmsRequest::try_from(message)?;
    let alarms = self.alarms.lock().unwrap();
    let out = alarms.values().filter(|(_, entry)| entry.enabled).map(|(alid, entry)| (alarm_code(entry), alid.clone(), AlarmText(entry.text.clone()))).collect();
    drop(alarms);
    let _ = self.hsms.data(id, ListEnabledAlarmsData(out).into());
    Ok(())
  }

  /// No process-program store is modeled; every PPID is reported absent.
  fn handle_delete_process_programs(self: &Arc<Self>, id: MessageID, message: SecsMessage) -> Result<(), secs2::Error> {
    let DeleteProcessProgramSend(ids) = DeleteProcessProgramSend::try_from(message)?;
    let ack = if ids.is_empty() { ProcessProgramAcknowledge::Accepted } else { ProcessProgramAcknowledge::PPIDNotFound };
    let _ = self.hsms.data(id, DeleteProcessProgramAck(ack).into());
    Ok(())
  }

  fn handle_current_eppd_request(self: &Arc<Self>, id: MessageID, message: SecsMessage) -> Result<(), secs2::Error> {
    CurrentEPPDRequest::try_from(message)?;
    let _ = self.hsms.data(id, CurrentEPPDData(vec![]).into());
    Ok(())
  }

  fn reply_exception(self: &Arc<Self>, id: MessageID, stream: u8, function: u8) {
    let header = raw_header(id, stream, function, true);
    let message: SecsMessage = match stream {
      1 | 2 | 5 | 6 | 7 | 9 => UnrecognizedFunction(header).into(),
      _ => UnrecognizedStream(header).into(),
    };
    let _ = self.hsms.data(id, message);
  }

  fn reply_exception_illegal_data(self: &Arc<Self>, id: MessageID, stream: u8, function: u8) {
    let header = raw_header(id, stream, function, true);
    let _ = self.hsms.data(id, IllegalData(header).into());
  }
}

fn is_builtin_svid(key: &Id) -> bool {
  matches!(key, Id::Num(n) if [SVID_CLOCK, SVID_CONTROL_STATE, SVID_EVENTS_ENABLED, SVID_ALARMS_ENABLED, SVID_ALARMS_SET].contains(n))
}

fn control_state_code(state: ControlState) -> u32 {
  match state {
    ControlState::EquipmentOffline => 1,
    ControlState::AttemptOnline => 2,
    ControlState::HostOffline => 3,
    ControlState::OnLineLocal => 4,
    ControlState::OnLineRemote => 5,
  }
}

fn alarm_code(entry: &AlarmEntry) -> AlarmCode {
  AlarmCode(if entry.set { 0b1000_0000 } else { 0 })
}

/// Rebuilds the 10-byte SECS-II/HSMS header for a message, for the S9Fx
/// exception reports that carry one verbatim. Mirrors the byte layout
/// `hsms::generic`'s own wire conversion uses: session id, `w`-bit packed
/// into the high bit of the stream byte, function, then a zeroed
/// presentation/session-type pair (always a data message here), then the
/// system id.
fn raw_header(id: MessageID, stream: u8, function: u8, w: bool) -> MessageHeader {
  let mut header = [0u8; 10];
  header[0..2].copy_from_slice(&id.session.to_be_bytes());
  header[2] = ((w as u8) << 7) | stream;
  header[3] = function;
  header[6..10].copy_from_slice(&id.system.to_be_bytes());
  MessageHeader(header)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn id_key_collapses_numeric_width() {
    assert_eq!(StatusVariableID::U2(1).id_key(), StatusVariableID::U4(1).id_key());
    assert_eq!(EquipmentConstantID::Ascii("X".into()).id_key(), Id::Ascii("X".into()));
  }

  #[test]
  fn within_range_rejects_out_of_bounds() {
    let ec = EquipmentConstant::new("T", StatusVariableValue::U4(vec![10]), StatusVariableValue::U4(vec![120]), StatusVariableValue::U4(vec![10]));
    assert!(ec.within_range(&StatusVariableValue::U4(vec![60])));
    assert!(!ec.within_range(&StatusVariableValue::U4(vec![200])));
  }

  #[test]
  fn host_offline_request_while_already_offline_does_not_fire_ceid() {
    let mut machine = Machine::new(ControlTransition, ControlState::EquipmentOffline);
    let id = MessageID { session: 0, system: 1 };
    let output = machine.fire(ControlEvent::RemoteOfflineRequested(id)).unwrap();
    assert_eq!(output.offline_ack, Some((id, OffLineAcknowledge::Acknowledge)));
    assert!(output.fire_ceid.is_none());
    assert_eq!(*machine.state(), ControlState::EquipmentOffline);
  }

  #[test]
  fn online_request_from_host_offline_starts_validation() {
    let mut machine = Machine::new(ControlTransition, ControlState::HostOffline);
    let id = MessageID { session: 0, system: 2 };
    let output = machine.fire(ControlEvent::RemoteOnlineRequested(id)).unwrap();
    assert_eq!(output.online_ack, Some((id, OnLineAcknowledge::Accepted)));
    assert!(output.start_validation);
    assert_eq!(*machine.state(), ControlState::AttemptOnline);
  }

  #[test]
  fn online_request_while_equipment_offline_is_not_allowed() {
    let mut machine = Machine::new(ControlTransition, ControlState::EquipmentOffline);
    let id = MessageID { session: 0, system: 3 };
    let output = machine.fire(ControlEvent::RemoteOnlineRequested(id)).unwrap();
    assert_eq!(output.online_ack, Some((id, OnLineAcknowledge::NotAllowed)));
    assert_eq!(*machine.state(), ControlState::EquipmentOffline);
  }

  #[test]
  fn validation_failure_returns_to_host_offline() {
    let mut machine = Machine::new(ControlTransition, ControlState::AttemptOnline);
    machine.fire(ControlEvent::ValidationFailed).unwrap();
    assert_eq!(*machine.state(), ControlState::HostOffline);
  }

  #[test]
  fn online_request_while_already_online_is_acknowledged_as_such() {
    let mut machine = Machine::new(ControlTransition, ControlState::OnLineRemote);
    let id = MessageID { session: 0, system: 4 };
    let output = machine.fire(ControlEvent::RemoteOnlineRequested(id)).unwrap();
    assert_eq!(output.online_ack, Some((id, OnLineAcknowledge::AlreadyOnLine)));
  }

  #[test]
  fn local_remote_switch_fires_ceid() {
    let mut machine = Machine::new(ControlTransition, ControlState::OnLineRemote);
    let output = machine.fire(ControlEvent::SwitchToLocal).unwrap();
    assert_eq!(output.fire_ceid, Some(CEID_CONTROL_STATE_LOCAL));
    assert_eq!(*machine.state(), ControlState::OnLineLocal);
  }
}
