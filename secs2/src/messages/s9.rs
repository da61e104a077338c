//! # STREAM 9: SYSTEM ERRORS
//! **Based on SEMI E5§10.12**
//!
//! Exception reports a session issues about a primary message it could
//! not route or act on. Every function here is header-only, no reply
//! requested, and carries the 10-byte header of the offending message.

use crate::items::MessageHeader;

macro_rules! exception_report {
  ($name:ident, $function:expr) => {
    #[derive(Clone, Debug)]
    pub struct $name(pub MessageHeader);
    super::message_data! {$name, false, 9, $function}
  };
}

/// ## S9F1
///
/// **Unrecognized Device ID (UDN)**
exception_report! {UnrecognizedDeviceID, 1}

/// ## S9F3
///
/// **Unrecognized Stream Type (USN)**
exception_report! {UnrecognizedStream, 3}

/// ## S9F5
///
/// **Unrecognized Function Type (UFN)**
exception_report! {UnrecognizedFunction, 5}

/// ## S9F7
///
/// **Illegal Data (IDN)**
exception_report! {IllegalData, 7}

/// ## S9F9
///
/// **Transaction Timer Timeout (TTN)**
exception_report! {TransactionTimeout, 9}
