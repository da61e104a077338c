//! Runnable host-side demonstration: actively connects to an equipment,
//! drives the HSMS select procedure, waits out the communication-state
//! handshake, then issues a handful of representative requests.

use gem::common::{CommClient, CommSettings, Role};
use gem::host::Host;
use gem::{Event as GemEvent, EventSink, SystemCounter};
use hsms::generic::{Client as HsmsClient, ConnectionMode, Delegate, Event as HsmsEvent, MessageID, ParameterSettings};
use secs2::items::StatusVariableID;
use std::sync::Arc;

struct PrintSink;
impl EventSink for PrintSink {
  fn event(&self, event: GemEvent) {
    println!("[gem] {event:?}");
  }
}

struct PrintDelegate;
impl Delegate for PrintDelegate {
  fn event(&self, event: HsmsEvent) {
    println!("[hsms] {event:?}");
  }
}

fn main() {
  let hsms = HsmsClient::new(ParameterSettings { connect_mode: ConnectionMode::Active, ..Default::default() }, Arc::new(PrintDelegate));

  let entity = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1:5000".to_string());
  let (_socket, rx) = hsms.connect(&entity).expect("connect failed");

  let session = 0u16;
  let system = SystemCounter::new();
  hsms.select(MessageID { session, system: system.next() }).join().expect("select thread panicked").expect("select procedure failed");

  let sink: Arc<dyn EventSink> = Arc::new(PrintSink);
  let comm = CommClient::new(Role::Host, hsms.clone(), session, system.clone(), CommSettings::default(), sink.clone());
  let forward_rx = comm.start(rx);

  let host = Host::new(hsms.clone(), session, system.clone(), sink.clone());
  host.start(forward_rx);

  match host.read_status_variables(vec![StatusVariableID::U4(1)]) {
    Ok(values) => println!("status variables: {values:?}"),
    Err(err) => println!("read_status_variables failed: {err:?}"),
  }

  match host.go_online() {
    Ok(ack) => println!("go_online: {ack:?}"),
    Err(err) => println!("go_online failed: {err:?}"),
  }

  println!("host demo connected to {entity}, press enter to exit");
  let mut line = String::new();
  let _ = std::io::stdin().read_line(&mut line);
  let _ = comm.disable();
}
