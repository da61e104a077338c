//! ## HOST CONVENIENCE ISSUERS (C9)
//! **Based on SEMI E30-1107§7 and the stream-2/5/7 host-initiated
//! procedures**
//!
//! [Host] is the mirror image of [equipment::Handler]: rather than
//! answering requests against dictionaries, it issues the handful of
//! request/reply round-trips a host application drives against an
//! equipment connection, and listens for the event/alarm reports the
//! equipment sends unsolicited.
//!
//! [equipment::Handler]: crate::equipment::Handler

use crate::{Error, Event, EventSink, SystemCounter};
use hsms::generic::{Client as HsmsClient, MessageID};
use secs2::items::*;
use secs2::messages::s1::*;
use secs2::messages::s2::*;
use secs2::messages::s5::*;
use secs2::messages::s6::*;
use secs2::messages::s7::*;
use secs2::Message as SecsMessage;
use std::sync::atomic::{AtomicU32, Ordering::Relaxed};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread;

/// ## HOST
///
/// Issues requests over an already-`COMMUNICATING` [hsms::generic::Client]
/// connection and answers the unsolicited reports an equipment sends
/// ([S6F11] event reports, [S5F1] alarm reports).
///
/// [S6F11]: secs2::messages::s6::EventReportSend
/// [S5F1]: secs2::messages::s5::AlarmReportSend
pub struct Host {
  hsms: Arc<HsmsClient>,
  session: u16,
  system: SystemCounter,
  sink: Arc<dyn EventSink>,
  next_data_id: AtomicU32,
}
impl Host {
  pub fn new(hsms: Arc<HsmsClient>, session: u16, system: SystemCounter, sink: Arc<dyn EventSink>) -> Arc<Self> {
    Arc::new(Host { hsms, session, system, sink, next_data_id: AtomicU32::new(1) })
  }

  fn next_id(&self) -> MessageID {
    MessageID { session: self.session, system: self.system.next() }
  }

  fn next_data_id(&self) -> DataID {
    DataID::U4(self.next_data_id.fetch_add(1, Relaxed))
  }

  fn roundtrip(&self, message: SecsMessage) -> Result<SecsMessage, Error> {
    match self.hsms.data(self.next_id(), message).join() {
      Ok(Ok(Some(reply))) => Ok(reply),
      Ok(Ok(None)) => Err(Error::Timeout),
      Ok(Err(err)) => Err(Error::from(err)),
      Err(_) => Err(Error::Timeout),
    }
  }

  /// Spawns the listener that answers unsolicited `S6F11`/`S5F1` traffic
  /// forwarded by [crate::common::CommClient::start]. Every other stream
  /// is dropped with no reply, since a host never owes the equipment an
  /// acknowledge outside those two.
  pub fn start(self: &Arc<Self>, rx: Receiver<(MessageID, SecsMessage)>) {
    let host = self.clone();
    thread::spawn(move || {
      for (id, message) in rx {
        match (message.stream, message.function) {
          (6, 11) => host.handle_event_report(id, message),
          (5, 1) => host.handle_alarm_report(id, message),
          _ => {}
        }
      }
    });
  }

  fn handle_event_report(self: &Arc<Self>, id: MessageID, message: SecsMessage) {
    if let Ok(EventReportSend(_, ceid, _)) = EventReportSend::try_from(message) {
      self.sink.event(Event::CollectionEventReceived { ceid_display: format!("{ceid:?}") });
      let _ = self.hsms.data(id, EventReportAck(EventReportAcknowledge::Accepted).into());
    }
  }

  fn handle_alarm_report(self: &Arc<Self>, id: MessageID, message: SecsMessage) {
    if let Ok(AlarmReportSend(code, alid, _)) = AlarmReportSend::try_from(message) {
      self.sink.event(Event::AlarmReceived { alid_display: format!("{alid:?}"), set: code.is_set() });
      let _ = self.hsms.data(id, AlarmReportAck(AlarmAcknowledge::Accepted).into());
    }
  }

  /// Drops every defined report (`S2F33` with an empty report list) then
  /// disables every collection event (`S2F37` with an empty CEID list),
  /// the two-step reset a host runs before re-subscribing from scratch.
  pub fn clear_collection_events(&self) -> Result<(), Error> {
    let DefineReportAck(drack) = DefineReportAck::try_from(self.roundtrip(DefineReport(self.next_data_id(), vec![]).into())?)?;
    if drack != DefineReportAcknowledge::Accepted {
      return Err(Error::UnknownID);
    }
    let EnableDisableEventReportAck(erack) = EnableDisableEventReportAck::try_from(self.roundtrip(EnableDisableEventReport(CollectionEventEnableDisable(false), vec![]).into())?)?;
    if erack != EnableDisableEventReportAcknowledge::Accepted {
      return Err(Error::UnknownID);
    }
    Ok(())
  }

  /// Defines a report carrying `vids`, links it to `ceid`, and enables
  /// the event: the `S2F33`/`S2F35`/`S2F37` sequence a host runs once per
  /// collection event it wants delivered.
  pub fn subscribe_collection_event(&self, ceid: CollectionEventID, report_id: ReportID, vids: Vec<StatusVariableID>) -> Result<(), Error> {
    let DefineReportAck(drack) = DefineReportAck::try_from(self.roundtrip(DefineReport(self.next_data_id(), vec![(report_id.clone(), vids)]).into())?)?;
    if drack != DefineReportAcknowledge::Accepted {
      return Err(Error::UnknownID);
    }
    let LinkEventReportAck(lrack) = LinkEventReportAck::try_from(self.roundtrip(LinkEventReport(self.next_data_id(), vec![(ceid.clone(), vec![report_id])]).into())?)?;
    if lrack != LinkReportAcknowledge::Accepted {
      return Err(Error::UnknownID);
    }
    let EnableDisableEventReportAck(erack) = EnableDisableEventReportAck::try_from(self.roundtrip(EnableDisableEventReport(CollectionEventEnableDisable(true), vec![ceid]).into())?)?;
    if erack != EnableDisableEventReportAcknowledge::Accepted {
      return Err(Error::UnknownID);
    }
    Ok(())
  }

  /// Sends `S2F41` and returns the equipment's immediate acknowledge plus
  /// any per-parameter rejections. `InitiatedForAsynchronousCompletion`
  /// means the command is still running; the caller observes completion
  /// through whatever collection event the equipment fires, if any.
  pub fn send_remote_command(&self, rcmd: RemoteCommand, params: Vec<(ParameterName, ParameterValue)>) -> Result<(HostCommandAcknowledge, Vec<(ParameterName, ParameterAcknowledge)>), Error> {
    let HostCommandAck(hcack, cpacks) = HostCommandAck::try_from(self.roundtrip(HostCommandSend(rcmd, params).into())?)?;
    Ok((hcack, cpacks))
  }

  /// `S7F17`/`S7F18`. An empty `ids` deletes every stored process
  /// program.
  pub fn delete_process_programs(&self, ids: Vec<ProcessProgramID>) -> Result<ProcessProgramAcknowledge, Error> {
    let DeleteProcessProgramAck(ack) = DeleteProcessProgramAck::try_from(self.roundtrip(DeleteProcessProgramSend(ids).into())?)?;
    Ok(ack)
  }

  /// `S7F19`/`S7F20`.
  pub fn get_process_program_list(&self) -> Result<Vec<ProcessProgramID>, Error> {
    let CurrentEPPDData(ids) = CurrentEPPDData::try_from(self.roundtrip(CurrentEPPDRequest.into())?)?;
    Ok(ids)
  }

  /// `S1F17`/`S1F18`.
  pub fn go_online(&self) -> Result<OnLineAcknowledge, Error> {
    let OnLineAck(ack) = OnLineAck::try_from(self.roundtrip(OnLineRequest.into())?)?;
    Ok(ack)
  }

  /// `S1F15`/`S1F16`.
  pub fn go_offline(&self) -> Result<OffLineAcknowledge, Error> {
    let OffLineAck(ack) = OffLineAck::try_from(self.roundtrip(OffLineRequest.into())?)?;
    Ok(ack)
  }

  /// `S5F3`/`S5F4`.
  pub fn enable_alarm(&self, id: AlarmID) -> Result<AlarmAcknowledge, Error> {
    let EnableDisableAlarmAck(ack) = EnableDisableAlarmAck::try_from(self.roundtrip(EnableDisableAlarm(AlarmEnableDisable::Enable, id).into())?)?;
    Ok(ack)
  }

  pub fn disable_alarm(&self, id: AlarmID) -> Result<AlarmAcknowledge, Error> {
    let EnableDisableAlarmAck(ack) = EnableDisableAlarmAck::try_from(self.roundtrip(EnableDisableAlarm(AlarmEnableDisable::Disable, id).into())?)?;
    Ok(ack)
  }

  /// `S5F5`/`S5F6`. An empty `ids` requests every alarm the equipment
  /// knows about.
  pub fn list_alarms(&self, ids: Vec<AlarmID>) -> Result<Vec<(AlarmCode, AlarmID, AlarmText)>, Error> {
    let ListAlarmsData(entries) = ListAlarmsData::try_from(self.roundtrip(ListAlarmsRequest(ids).into())?)?;
    Ok(entries)
  }

  /// `S5F7`/`S5F8`.
  pub fn list_enabled_alarms(&self) -> Result<Vec<(AlarmCode, AlarmID, AlarmText)>, Error> {
    let ListEnabledAlarmsData(entries) = ListEnabledAlarmsData::try_from(self.roundtrip(ListEnabledAlarmsRequest.into())?)?;
    Ok(entries)
  }

  /// `S1F3`/`S1F4`. An empty `ids` requests every status variable the
  /// equipment has configured.
  pub fn read_status_variables(&self, ids: Vec<StatusVariableID>) -> Result<Vec<StatusVariableValue>, Error> {
    let SelectedEquipmentStatusData(values) = SelectedEquipmentStatusData::try_from(self.roundtrip(SelectedEquipmentStatusRequest(ids).into())?)?;
    Ok(values)
  }

  /// `S2F13`/`S2F14`.
  pub fn read_equipment_constants(&self, ids: Vec<EquipmentConstantID>) -> Result<Vec<EquipmentConstantValue>, Error> {
    let EquipmentConstantData(values) = EquipmentConstantData::try_from(self.roundtrip(EquipmentConstantRequest(ids).into())?)?;
    Ok(values)
  }

  /// `S2F15`/`S2F16`.
  pub fn set_equipment_constants(&self, entries: Vec<(EquipmentConstantID, EquipmentConstantValue)>) -> Result<EquipmentConstantAcknowledge, Error> {
    let NewEquipmentConstantAcknowledge(ack) = NewEquipmentConstantAcknowledge::try_from(self.roundtrip(NewEquipmentConstantSend(entries).into())?)?;
    Ok(ack)
  }
}
