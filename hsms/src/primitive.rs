//! # PRIMITIVE SERVICES
//! **Based on SEMI E37-1109§8.2**
//!
//! The most protocol-agnostic form in which data is exchanged over an HSMS
//! connection: establishing and breaking a TCP/IP connection, and reading
//! or writing length-prefixed frames. Nothing here interprets a frame's
//! header fields beyond byte layout.
//!
//! To use the [Primitive Services]:
//! - Create a [Client] with [Client::new].
//! - Manage the connection with [Client::connect] and [Client::disconnect].
//! - Receive [Message]s through the channel [Client::connect] returns.
//! - Transmit [Message]s with [Client::transmit].
//!
//! [Primitive Services]: crate::primitive

use std::io::{Error, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::ops::{Deref, DerefMut};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

/// ## CONNECTION MODE
/// **Based on SEMI E37-1109§6.3.2**
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionMode {
  /// Waits for the Remote Entity to initiate the TCP connection.
  #[default]
  Passive,
  /// Initiates the TCP connection to the Remote Entity.
  Active,
}

/// ## CONNECTION STATE
/// **Based on SEMI E37-1109§5.4-5.5**
#[derive(Debug, Default)]
pub enum ConnectionState {
  #[default]
  NotConnected,
  Connected(TcpStream),
}

/// ## MESSAGE HEADER
/// **Based on SEMI E37-1109§8.2.5-8.2.6**
///
/// The fixed 10-byte header preceding every frame's body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageHeader {
  pub session_id: u16,
  pub byte_2: u8,
  pub byte_3: u8,
  pub presentation_type: u8,
  pub session_type: u8,
  pub system: u32,
}
impl From<MessageHeader> for [u8; 10] {
  fn from(header: MessageHeader) -> Self {
    let mut bytes = [0u8; 10];
    bytes[0..2].copy_from_slice(&header.session_id.to_be_bytes());
    bytes[2] = header.byte_2;
    bytes[3] = header.byte_3;
    bytes[4] = header.presentation_type;
    bytes[5] = header.session_type;
    bytes[6..10].copy_from_slice(&header.system.to_be_bytes());
    bytes
  }
}
impl From<[u8; 10]> for MessageHeader {
  fn from(bytes: [u8; 10]) -> Self {
    MessageHeader {
      session_id: u16::from_be_bytes(bytes[0..2].try_into().unwrap()),
      byte_2: bytes[2],
      byte_3: bytes[3],
      presentation_type: bytes[4],
      session_type: bytes[5],
      system: u32::from_be_bytes(bytes[6..10].try_into().unwrap()),
    }
  }
}

/// ## PRIMITIVE MESSAGE
///
/// A frame's header and raw body, before any interpretation of what the
/// session type or body bytes mean.
#[derive(Clone, Debug)]
pub struct Message {
  pub header: MessageHeader,
  pub text: Vec<u8>,
}

/// ## CLIENT
///
/// Manages one TCP/IP connection and its length-prefixed frame stream.
pub struct Client {
  connection_state: RwLock<ConnectionState>,
}
impl Client {
  /// Creates a [Client] in the [NOT CONNECTED] state.
  /// [NOT CONNECTED]: ConnectionState::NotConnected
  pub fn new() -> Arc<Self> {
    Arc::new(Client { connection_state: RwLock::new(ConnectionState::NotConnected) })
  }

  /// ### CONNECT PROCEDURE
  /// **Based on SEMI E37-1109§6.3.4-6.3.7**
  ///
  /// In [Active] mode, `entity` is the Remote Entity's address and the
  /// connection attempt is bounded by `t5`; in [Passive] mode, `entity` is
  /// the Local Entity's bind address. `t8` becomes the stream's read/write
  /// timeout once connected. [Active]: ConnectionMode::Active [Passive]:
  /// ConnectionMode::Passive
  pub fn connect(self: &Arc<Self>, entity: &str, connection_mode: ConnectionMode, t5: Duration, t8: Duration) -> Result<(SocketAddr, Receiver<Message>), Error> {
    let (stream, socket) = match self.connection_state.read().unwrap().deref() {
      ConnectionState::Connected(_) => return Err(Error::new(ErrorKind::AlreadyExists, "hsms::primitive::Client::connect")),
      ConnectionState::NotConnected => match connection_mode {
        ConnectionMode::Passive => {
          let listener = TcpListener::bind(entity)?;
          listener.accept()?
        }
        ConnectionMode::Active => {
          let socket = entity.to_socket_addrs()?.next().ok_or_else(|| Error::new(ErrorKind::AddrNotAvailable, "hsms::primitive::Client::connect"))?;
          let stream = TcpStream::connect_timeout(&socket, t5)?;
          (stream, socket)
        }
      },
    };

    stream.set_read_timeout(Some(t8))?;
    stream.set_write_timeout(Some(t8))?;

    *self.connection_state.write().unwrap().deref_mut() = ConnectionState::Connected(stream);

    let (rx_sender, rx_receiver) = channel::<Message>();
    let clone = self.clone();
    thread::spawn(move || clone.receive(rx_sender));

    Ok((socket, rx_receiver))
  }

  /// ### DISCONNECT PROCEDURE
  /// **Based on SEMI E37-1109§6.4-6.5**
  pub fn disconnect(self: &Arc<Self>) -> Result<(), Error> {
    match self.connection_state.read().unwrap().deref() {
      ConnectionState::NotConnected => return Err(Error::new(ErrorKind::NotConnected, "hsms::primitive::Client::disconnect")),
      ConnectionState::Connected(stream) => {
        let _ = stream.shutdown(Shutdown::Both);
      }
    }
    *self.connection_state.write().unwrap().deref_mut() = ConnectionState::NotConnected;
    Ok(())
  }

  /// ### RECEIVE PROCEDURE
  ///
  /// Runs on its own thread for the lifetime of the connection, decoding
  /// length-prefixed frames and forwarding each to `rx_sender`. Exits
  /// silently once the connection drops or the receiver hangs up.
  fn receive(self: Arc<Self>, rx_sender: Sender<Message>) {
    while let ConnectionState::Connected(stream_immutable) = self.connection_state.read().unwrap().deref() {
      let res: Result<Option<Message>, Error> = 'rx: {
        let mut stream: &TcpStream = stream_immutable;

        let mut length_buffer = [0u8; 4];
        let length_bytes = match stream.read(&mut length_buffer) {
          Ok(n) => n,
          Err(error) => match error.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => break 'rx Ok(None),
            _ => break 'rx Err(error),
          },
        };
        if length_bytes == 0 {
          break 'rx Err(Error::from(ErrorKind::ConnectionAborted));
        }
        if length_bytes != 4 {
          break 'rx Err(Error::from(ErrorKind::TimedOut));
        }
        let length = u32::from_be_bytes(length_buffer);
        if length < 10 {
          break 'rx Err(Error::from(ErrorKind::InvalidData));
        }

        let mut header_buffer = [0u8; 10];
        match stream.read(&mut header_buffer) {
          Ok(10) => {}
          Ok(_) => break 'rx Err(Error::from(ErrorKind::TimedOut)),
          Err(error) => break 'rx Err(error),
        }

        let data_length = (length - 10) as usize;
        let mut data_buffer = vec![0u8; data_length];
        if data_length > 0 {
          match stream.read(&mut data_buffer) {
            Ok(n) if n == data_length => {}
            Ok(_) => break 'rx Err(Error::from(ErrorKind::TimedOut)),
            Err(error) => break 'rx Err(error),
          }
        }

        Ok(Some(Message { header: MessageHeader::from(header_buffer), text: data_buffer }))
      };
      match res {
        Ok(Some(message)) => {
          if rx_sender.send(message).is_err() {
            break;
          }
        }
        Ok(None) => {}
        Err(_) => {
          let _ = stream_immutable.shutdown(Shutdown::Both);
          break;
        }
      }
    }
  }

  /// ### TRANSMIT PROCEDURE
  /// **Based on SEMI E37-1109§7.2**
  pub fn transmit(self: &Arc<Self>, message: Message) -> Result<(), Error> {
    match self.connection_state.read().unwrap().deref() {
      ConnectionState::NotConnected => return Err(Error::new(ErrorKind::NotConnected, "hsms::primitive::Client::transmit")),
      ConnectionState::Connected(stream_immutable) => 'disconnect: {
        let mut stream: &TcpStream = stream_immutable;

        let length = (message.text.len() + 10) as u32;
        let length_buffer = length.to_be_bytes();
        let header_buffer: [u8; 10] = message.header.into();

        if stream.write_all(&length_buffer).is_err() {
          break 'disconnect;
        }
        if stream.write_all(&header_buffer).is_err() {
          break 'disconnect;
        }
        if stream.write_all(&message.text).is_err() {
          break 'disconnect;
        }
        return Ok(());
      }
    }
    self.disconnect()?;
    Err(Error::new(ErrorKind::ConnectionAborted, "hsms::primitive::Client::transmit"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::net::TcpListener;

  #[test]
  fn header_roundtrips_through_bytes() {
    let header = MessageHeader { session_id: 0x1234, byte_2: 0x81, byte_3: 0x02, presentation_type: 0, session_type: 0, system: 0xDEADBEEF };
    let bytes: [u8; 10] = header.into();
    assert_eq!(MessageHeader::from(bytes), header);
  }

  #[test]
  fn connect_transmit_and_receive_a_frame() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = Client::new();
    let server_clone = server.clone();
    let accepted = thread::spawn(move || server_clone.connect(&addr.to_string(), ConnectionMode::Passive, Duration::from_secs(1), Duration::from_millis(200)));

    let client = Client::new();
    let (_socket, client_rx) = client.connect(&addr.to_string(), ConnectionMode::Active, Duration::from_secs(1), Duration::from_millis(200)).unwrap();
    let (_server_socket, server_rx) = accepted.join().unwrap().unwrap();

    let header = MessageHeader { session_id: 0, byte_2: 0, byte_3: 0, presentation_type: 0, session_type: 5, system: 1 };
    client.transmit(Message { header, text: vec![] }).unwrap();

    let received = server_rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(received.header, header);
    assert!(received.text.is_empty());
    drop(client_rx);
  }
}
