//! Runnable equipment-side demonstration: listens passively for a host,
//! brings the connection up through the communication-state handshake,
//! and answers status/constant/event/alarm/remote-command traffic
//! against a small hand-registered dictionary.

use gem::common::{CommClient, CommSettings, Role};
use gem::equipment::Handler;
use gem::{Event as GemEvent, EventSink, SystemCounter};
use hsms::generic::{Client as HsmsClient, ConnectionMode, Delegate, Event as HsmsEvent, ParameterSettings};
use secs2::items::{AlarmID, CollectionEventID, EquipmentConstantID, ModelName, SoftwareRevision, StatusVariableID, StatusVariableValue};
use std::sync::mpsc::{channel, Sender};
use std::sync::Arc;

struct PrintSink;
impl EventSink for PrintSink {
  fn event(&self, event: GemEvent) {
    println!("[gem] {event:?}");
  }
}

struct PrintDelegate {
  selected: Sender<()>,
}
impl Delegate for PrintDelegate {
  fn event(&self, event: HsmsEvent) {
    println!("[hsms] {event:?}");
    if let HsmsEvent::Selected { .. } = event {
      let _ = self.selected.send(());
    }
  }
}

fn main() {
  let (selected_tx, selected_rx) = channel();
  let delegate = Arc::new(PrintDelegate { selected: selected_tx });
  let hsms = HsmsClient::new(ParameterSettings { connect_mode: ConnectionMode::Passive, ..Default::default() }, delegate);

  let entity = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1:5000".to_string());
  let (_socket, rx) = hsms.connect(&entity).expect("listen/accept failed");
  selected_rx.recv().expect("host never selected");

  let session = 0u16;
  let system = SystemCounter::new();
  let sink: Arc<dyn EventSink> = Arc::new(PrintSink);
  let role = Role::Equipment { model: ModelName("DEMO-TOOL".into()), revision: SoftwareRevision("1.0".into()) };
  let comm = CommClient::new(role, hsms.clone(), session, system.clone(), CommSettings::default(), sink.clone());
  let forward_rx = comm.start(rx);

  let handler = Handler::new(ModelName("DEMO-TOOL".into()), SoftwareRevision("1.0".into()), hsms.clone(), session, system.clone(), comm.clone(), sink.clone());
  handler.set_status_variable(StatusVariableID::U4(1), "LotCount", StatusVariableValue::U4(vec![0]));
  handler.set_equipment_constant(EquipmentConstantID::U4(100), "RecipeTimeout", StatusVariableValue::U4(vec![5]), StatusVariableValue::U4(vec![300]), StatusVariableValue::U4(vec![60]));
  handler.register_alarm(AlarmID::U4(1), "Door Interlock Open");
  handler.register_remote_command(
    secs2::items::RemoteCommand::Ascii("START".into()),
    vec!["RECIPE".into()],
    Some(CollectionEventID::U4(100)),
    |params| println!("[equipment] START executed with params {params:?}"),
  );
  handler.start(forward_rx);

  println!("equipment demo listening on {entity}, press enter to exit");
  let mut line = String::new();
  let _ = std::io::stdin().read_line(&mut line);
  let _ = comm.disable();
}
