//! ## DATA ITEMS
//! **Based on SEMI E5§10 and the GEM ([SEMI E30]) data items it cites**
//!
//! Each item here is a thin, named wrapper around one or more [Item] wire
//! shapes, built with the same small family of macros the variable codec
//! itself is implemented with. Only the subset actually referenced by the
//! [messages] built for the equipment/host surface is ported; the full
//! SEMI E5 dictionary runs past a thousand items and most streams are out
//! of scope here.
//!
//! [Item]: crate::Item
//! [messages]: crate::messages

use crate::Error::*;
use crate::{Error, Item};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// ## DATA ITEM MACRO: SINGLE ACCEPTED FORMAT, SCALAR
macro_rules! singleformat {
  ($name:ident, $format:ident) => {
    impl From<$name> for Item {
      fn from(value: $name) -> Item {
        Item::$format(vec![value.0])
      }
    }
    impl TryFrom<Item> for $name {
      type Error = Error;
      fn try_from(value: Item) -> Result<Self, Self::Error> {
        match value {
          Item::$format(vec) if vec.len() == 1 => Ok(Self(vec[0])),
          _ => Err(WrongFormat),
        }
      }
    }
  };
}

/// ## DATA ITEM MACRO: SINGLE ACCEPTED FORMAT, ANY VECTOR LENGTH
macro_rules! singleformat_vec {
  ($name:ident, $format:ident $(, $range:expr)?) => {
    impl From<$name> for Item {
      fn from(value: $name) -> Item {
        Item::$format(value.0)
      }
    }
    impl TryFrom<Item> for $name {
      type Error = Error;
      fn try_from(value: Item) -> Result<Self, Self::Error> {
        match value {
          Item::$format(vec) => {
            $(if !$range.contains(&vec.len()) {
              return Err(WrongFormat);
            })?
            Ok(Self(vec))
          }
          _ => Err(WrongFormat),
        }
      }
    }
  };
}

/// ## DATA ITEM MACRO: SINGLE ACCEPTED FORMAT, ENUMERATED VALUE
macro_rules! singleformat_enum {
  ($name:ident, $format:ident) => {
    impl From<$name> for Item {
      fn from(value: $name) -> Item {
        Item::$format(vec![value.into()])
      }
    }
    impl TryFrom<Item> for $name {
      type Error = Error;
      fn try_from(value: Item) -> Result<Self, <Self as TryFrom<Item>>::Error> {
        match value {
          Item::$format(vec) if vec.len() == 1 => {
            $name::try_from(vec[0]).map_err(|_| WrongFormat)
          }
          _ => Err(WrongFormat),
        }
      }
    }
  };
}

/// ## DATA ITEM MACRO: MULTIPLE ACCEPTED FORMATS, VECTOR LENGTH 1
macro_rules! multiformat {
  ($name:ident, $format:ident $(, $formats:ident)* $(,)?) => {
    impl From<$name> for Item {
      fn from(value: $name) -> Item {
        match value {
          $name::$format(val) => Item::$format(vec![val]),
          $($name::$formats(val) => Item::$formats(vec![val]),)*
        }
      }
    }
    impl TryFrom<Item> for $name {
      type Error = Error;
      fn try_from(value: Item) -> Result<Self, Self::Error> {
        match value {
          Item::$format(vec) if vec.len() == 1 => Ok(Self::$format(vec[0])),
          $(Item::$formats(vec) if vec.len() == 1 => Ok(Self::$formats(vec[0])),)*
          _ => Err(WrongFormat),
        }
      }
    }
  };
}

/// ## DATA ITEM MACRO: MULTIPLE ACCEPTED FORMATS PLUS ASCII, VECTOR LENGTH 1
macro_rules! multiformat_ascii {
  ($name:ident, $format:ident $(, $formats:ident)* $(,)?) => {
    impl From<$name> for Item {
      fn from(value: $name) -> Item {
        match value {
          $name::Ascii(s) => Item::Ascii(s),
          $name::$format(val) => Item::$format(vec![val]),
          $($name::$formats(val) => Item::$formats(vec![val]),)*
        }
      }
    }
    impl TryFrom<Item> for $name {
      type Error = Error;
      fn try_from(value: Item) -> Result<Self, Self::Error> {
        match value {
          Item::Ascii(s) => Ok(Self::Ascii(s)),
          Item::$format(vec) if vec.len() == 1 => Ok(Self::$format(vec[0])),
          $(Item::$formats(vec) if vec.len() == 1 => Ok(Self::$formats(vec[0])),)*
          _ => Err(WrongFormat),
        }
      }
    }
  };
}

/// ## DATA ITEM MACRO: MULTIPLE ACCEPTED FORMATS, ANY VECTOR LENGTH
macro_rules! multiformat_vec {
  ($name:ident, $format:ident $(, $formats:ident)* $(,)?) => {
    impl From<$name> for Item {
      fn from(value: $name) -> Item {
        match value {
          $name::$format(vec) => Item::$format(vec),
          $($name::$formats(vec) => Item::$formats(vec),)*
        }
      }
    }
    impl TryFrom<Item> for $name {
      type Error = Error;
      fn try_from(value: Item) -> Result<Self, Self::Error> {
        match value {
          Item::$format(vec) => Ok(Self::$format(vec)),
          $(Item::$formats(vec) => Ok(Self::$formats(vec)),)*
          _ => Err(WrongFormat),
        }
      }
    }
  };
}

/// ## MDLN — Equipment Model Type, 20 characters max.
/// Used by S1F2, S1F13, S1F14.
#[derive(Clone, Debug)]
pub struct ModelName(pub String);
impl From<ModelName> for Item {
  fn from(value: ModelName) -> Item {
    Item::Ascii(value.0)
  }
}
impl TryFrom<Item> for ModelName {
  type Error = Error;
  fn try_from(value: Item) -> Result<Self, Self::Error> {
    match value {
      Item::Ascii(s) if s.len() <= 20 => Ok(Self(s)),
      Item::Ascii(_) => Err(ValueOutOfRange),
      _ => Err(WrongFormat),
    }
  }
}

/// ## SOFTREV — Software Revision Code, 20 characters max.
/// Used by S1F2, S1F13, S1F14.
#[derive(Clone, Debug)]
pub struct SoftwareRevision(pub String);
impl From<SoftwareRevision> for Item {
  fn from(value: SoftwareRevision) -> Item {
    Item::Ascii(value.0)
  }
}
impl TryFrom<Item> for SoftwareRevision {
  type Error = Error;
  fn try_from(value: Item) -> Result<Self, Self::Error> {
    match value {
      Item::Ascii(s) if s.len() <= 20 => Ok(Self(s)),
      Item::Ascii(_) => Err(ValueOutOfRange),
      _ => Err(WrongFormat),
    }
  }
}

/// ## COMMACK — Establish Communications Acknowledge Code.
/// Used by S1F14.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum CommAck {
  Accepted = 0,
  Denied = 1,
}
singleformat_enum! {CommAck, Bin}

/// ## ONLACK — Acknowledge code for ON-LINE request.
/// Used by S1F18.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OnLineAcknowledge {
  Accepted = 0,
  NotAllowed = 1,
  AlreadyOnLine = 2,
}
singleformat_enum! {OnLineAcknowledge, Bin}

/// ## OFLACK — Acknowledge code for OFF-LINE request.
/// Used by S1F16.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OffLineAcknowledge {
  Acknowledge = 0,
}
singleformat_enum! {OffLineAcknowledge, Bin}

/// ## SVID — Status variable ID.
/// Used by S1F3, S1F11, S1F12, S2F23.
#[derive(Clone, Debug)]
pub enum StatusVariableID {
  Ascii(String),
  I1(i8),
  I2(i16),
  I4(i32),
  I8(i64),
  U1(u8),
  U2(u16),
  U4(u32),
  U8(u64),
}
multiformat_ascii! {StatusVariableID, I1, I2, I4, I8, U1, U2, U4, U8}

/// ## SVNAME — Status variable name.
/// Used by S1F12.
#[derive(Clone, Debug)]
pub struct StatusVariableName(pub String);
impl From<StatusVariableName> for Item {
  fn from(value: StatusVariableName) -> Item {
    Item::Ascii(value.0)
  }
}
impl TryFrom<Item> for StatusVariableName {
  type Error = Error;
  fn try_from(value: Item) -> Result<Self, Self::Error> {
    match value {
      Item::Ascii(s) => Ok(Self(s)),
      _ => Err(WrongFormat),
    }
  }
}

/// ## SV — Status variable value.
/// Used by S1F4, S6F1.
#[derive(Clone, Debug)]
pub enum StatusVariableValue {
  List(Vec<Item>),
  Bin(Vec<u8>),
  Bool(Vec<bool>),
  Ascii(String),
  I1(Vec<i8>),
  I2(Vec<i16>),
  I4(Vec<i32>),
  I8(Vec<i64>),
  U1(Vec<u8>),
  U2(Vec<u16>),
  U4(Vec<u32>),
  U8(Vec<u64>),
  F4(Vec<f32>),
  F8(Vec<f64>),
}
impl From<StatusVariableValue> for Item {
  fn from(value: StatusVariableValue) -> Item {
    match value {
      StatusVariableValue::List(v) => Item::List(v),
      StatusVariableValue::Bin(v) => Item::Bin(v),
      StatusVariableValue::Bool(v) => Item::Bool(v),
      StatusVariableValue::Ascii(v) => Item::Ascii(v),
      StatusVariableValue::I1(v) => Item::I1(v),
      StatusVariableValue::I2(v) => Item::I2(v),
      StatusVariableValue::I4(v) => Item::I4(v),
      StatusVariableValue::I8(v) => Item::I8(v),
      StatusVariableValue::U1(v) => Item::U1(v),
      StatusVariableValue::U2(v) => Item::U2(v),
      StatusVariableValue::U4(v) => Item::U4(v),
      StatusVariableValue::U8(v) => Item::U8(v),
      StatusVariableValue::F4(v) => Item::F4(v),
      StatusVariableValue::F8(v) => Item::F8(v),
    }
  }
}
impl TryFrom<Item> for StatusVariableValue {
  type Error = Error;
  fn try_from(value: Item) -> Result<Self, Self::Error> {
    Ok(match value {
      Item::List(v) => StatusVariableValue::List(v),
      Item::Bin(v) => StatusVariableValue::Bin(v),
      Item::Bool(v) => StatusVariableValue::Bool(v),
      Item::Ascii(v) => StatusVariableValue::Ascii(v),
      Item::I1(v) => StatusVariableValue::I1(v),
      Item::I2(v) => StatusVariableValue::I2(v),
      Item::I4(v) => StatusVariableValue::I4(v),
      Item::I8(v) => StatusVariableValue::I8(v),
      Item::U1(v) => StatusVariableValue::U1(v),
      Item::U2(v) => StatusVariableValue::U2(v),
      Item::U4(v) => StatusVariableValue::U4(v),
      Item::U8(v) => StatusVariableValue::U8(v),
      Item::F4(v) => StatusVariableValue::F4(v),
      Item::F8(v) => StatusVariableValue::F8(v),
      Item::Jis8(_) => return Err(WrongFormat),
    })
  }
}

/// ## ECID — Equipment constant ID. Same shape as [StatusVariableID].
/// Used by S2F13, S2F15, S2F29.
#[derive(Clone, Debug)]
pub enum EquipmentConstantID {
  Ascii(String),
  I1(i8),
  I2(i16),
  I4(i32),
  I8(i64),
  U1(u8),
  U2(u16),
  U4(u32),
  U8(u64),
}
multiformat_ascii! {EquipmentConstantID, I1, I2, I4, I8, U1, U2, U4, U8}

/// ## ECV — Equipment constant value. Any scalar or vector format.
/// Used by S2F14, S2F15.
pub type EquipmentConstantValue = StatusVariableValue;

/// ## ECNAME — Equipment constant name.
#[derive(Clone, Debug)]
pub struct EquipmentConstantName(pub String);
impl From<EquipmentConstantName> for Item {
  fn from(value: EquipmentConstantName) -> Item {
    Item::Ascii(value.0)
  }
}
impl TryFrom<Item> for EquipmentConstantName {
  type Error = Error;
  fn try_from(value: Item) -> Result<Self, Self::Error> {
    match value {
      Item::Ascii(s) => Ok(Self(s)),
      _ => Err(WrongFormat),
    }
  }
}

/// ## EAC — Equipment constant acknowledge code.
/// Used by S2F16.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum EquipmentConstantAcknowledge {
  Accepted = 0,
  DeniedOneOrMoreInvalid = 1,
  DeniedBusy = 2,
  DeniedOutOfRange = 3,
}
singleformat_enum! {EquipmentConstantAcknowledge, Bin}

/// ## CEID — Collection event ID. Same shape as [StatusVariableID].
#[derive(Clone, Debug)]
pub enum CollectionEventID {
  Ascii(String),
  I1(i8),
  I2(i16),
  I4(i32),
  I8(i64),
  U1(u8),
  U2(u16),
  U4(u32),
  U8(u64),
}
multiformat_ascii! {CollectionEventID, I1, I2, I4, I8, U1, U2, U4, U8}

/// ## CENAME — Collection event name.
#[derive(Clone, Debug)]
pub struct CollectionEventName(pub String);
impl From<CollectionEventName> for Item {
  fn from(value: CollectionEventName) -> Item {
    Item::Ascii(value.0)
  }
}
impl TryFrom<Item> for CollectionEventName {
  type Error = Error;
  fn try_from(value: Item) -> Result<Self, Self::Error> {
    match value {
      Item::Ascii(s) => Ok(Self(s)),
      _ => Err(WrongFormat),
    }
  }
}

/// ## CEED — Collection event or trace enable/disable code.
/// Used by S2F37.
#[derive(Clone, Debug)]
pub struct CollectionEventEnableDisable(pub bool);
singleformat! {CollectionEventEnableDisable, Bool}

/// ## RPTID — Report ID. Same shape as [StatusVariableID].
#[derive(Clone, Debug)]
pub enum ReportID {
  Ascii(String),
  I1(i8),
  I2(i16),
  I4(i32),
  I8(i64),
  U1(u8),
  U2(u16),
  U4(u32),
  U8(u64),
}
multiformat_ascii! {ReportID, I1, I2, I4, I8, U1, U2, U4, U8}

/// ## VID — Variable (status variable or equipment constant) ID, used
/// inside a report-definition list. Same shape as [StatusVariableID].
pub type VariableID = StatusVariableID;

/// ## DATAID — Data message ID.
#[derive(Clone, Debug)]
pub enum DataID {
  I1(i8),
  I2(i16),
  I4(i32),
  I8(i64),
  U1(u8),
  U2(u16),
  U4(u32),
  U8(u64),
}
multiformat! {DataID, I1, I2, I4, I8, U1, U2, U4, U8}

/// ## DRACK — Define report acknowledge code.
/// Used by S2F34.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum DefineReportAcknowledge {
  Accepted = 0,
  DeniedInsufficientSpace = 1,
  DeniedInvalidFormat = 2,
  DeniedVariableAlreadyDefined = 3,
  DeniedInvalidVariableID = 4,
}
singleformat_enum! {DefineReportAcknowledge, Bin}

/// ## LRACK — Link report acknowledge code.
/// Used by S2F36.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum LinkReportAcknowledge {
  Accepted = 0,
  DeniedInsufficientSpace = 1,
  DeniedInvalidFormat = 2,
  DeniedInvalidReportID = 3,
  DeniedInvalidEventID = 4,
}
singleformat_enum! {LinkReportAcknowledge, Bin}

/// ## ERACK — Enable/disable event report acknowledge code.
/// Used by S2F38.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum EnableDisableEventReportAcknowledge {
  Accepted = 0,
  DeniedInvalidEventID = 1,
}
singleformat_enum! {EnableDisableEventReportAcknowledge, Bin}

/// ## ALID — Alarm ID. Same shape as [StatusVariableID].
#[derive(Clone, Debug)]
pub enum AlarmID {
  I1(i8),
  I2(i16),
  I4(i32),
  I8(i64),
  U1(u8),
  U2(u16),
  U4(u32),
  U8(u64),
}
multiformat! {AlarmID, I1, I2, I4, I8, U1, U2, U4, U8}

/// ## ALCD — Alarm code, 1 byte; high bit set means the alarm is set, not
/// cleared.
/// Used by S5F1.
#[derive(Clone, Copy, Debug)]
pub struct AlarmCode(pub u8);
singleformat! {AlarmCode, Bin}
impl AlarmCode {
  pub fn is_set(self) -> bool {
    self.0 & 0b1000_0000 != 0
  }
}

/// ## ALTX — Alarm text, 120 characters max.
/// Used by S5F1.
#[derive(Clone, Debug)]
pub struct AlarmText(pub String);
impl From<AlarmText> for Item {
  fn from(value: AlarmText) -> Item {
    Item::Ascii(value.0)
  }
}
impl TryFrom<Item> for AlarmText {
  type Error = Error;
  fn try_from(value: Item) -> Result<Self, Self::Error> {
    match value {
      Item::Ascii(s) if s.len() <= 120 => Ok(Self(s)),
      Item::Ascii(_) => Err(ValueOutOfRange),
      _ => Err(WrongFormat),
    }
  }
}

/// ## ALED — Alarm enable/disable code.
/// Used by S5F3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum AlarmEnableDisable {
  Disable = 0,
  Enable = 128,
}
singleformat_enum! {AlarmEnableDisable, Bin}

/// ## ACKC5 — Acknowledge code for S5F1/S5F3/S5F5.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum AlarmAcknowledge {
  Accepted = 0,
  Error = 1,
}
singleformat_enum! {AlarmAcknowledge, Bin}

/// ## RCMD — Remote command code or name.
/// Used by S2F41.
#[derive(Clone, Debug)]
pub enum RemoteCommand {
  Ascii(String),
  I1(i8),
  I2(i16),
  I4(i32),
  I8(i64),
  U1(u8),
  U2(u16),
  U4(u32),
  U8(u64),
}
impl From<RemoteCommand> for Item {
  fn from(value: RemoteCommand) -> Item {
    match value {
      RemoteCommand::Ascii(s) => Item::Ascii(s),
      RemoteCommand::I1(v) => Item::I1(vec![v]),
      RemoteCommand::I2(v) => Item::I2(vec![v]),
      RemoteCommand::I4(v) => Item::I4(vec![v]),
      RemoteCommand::I8(v) => Item::I8(vec![v]),
      RemoteCommand::U1(v) => Item::U1(vec![v]),
      RemoteCommand::U2(v) => Item::U2(vec![v]),
      RemoteCommand::U4(v) => Item::U4(vec![v]),
      RemoteCommand::U8(v) => Item::U8(vec![v]),
    }
  }
}
impl TryFrom<Item> for RemoteCommand {
  type Error = Error;
  fn try_from(value: Item) -> Result<Self, Self::Error> {
    match value {
      Item::Ascii(s) => Ok(RemoteCommand::Ascii(s)),
      Item::I1(v) if v.len() == 1 => Ok(RemoteCommand::I1(v[0])),
      Item::I2(v) if v.len() == 1 => Ok(RemoteCommand::I2(v[0])),
      Item::I4(v) if v.len() == 1 => Ok(RemoteCommand::I4(v[0])),
      Item::I8(v) if v.len() == 1 => Ok(RemoteCommand::I8(v[0])),
      Item::U1(v) if v.len() == 1 => Ok(RemoteCommand::U1(v[0])),
      Item::U2(v) if v.len() == 1 => Ok(RemoteCommand::U2(v[0])),
      Item::U4(v) if v.len() == 1 => Ok(RemoteCommand::U4(v[0])),
      Item::U8(v) if v.len() == 1 => Ok(RemoteCommand::U8(v[0])),
      _ => Err(WrongFormat),
    }
  }
}

/// ## CPNAME — Command parameter name.
#[derive(Clone, Debug)]
pub struct ParameterName(pub String);
impl From<ParameterName> for Item {
  fn from(value: ParameterName) -> Item {
    Item::Ascii(value.0)
  }
}
impl TryFrom<Item> for ParameterName {
  type Error = Error;
  fn try_from(value: Item) -> Result<Self, Self::Error> {
    match value {
      Item::Ascii(s) => Ok(Self(s)),
      _ => Err(WrongFormat),
    }
  }
}

/// ## CPVAL — Command parameter value. Any scalar or vector format.
pub type ParameterValue = StatusVariableValue;

/// ## CPACK — Command parameter acknowledge code, used inside the CPACK
/// list of an [HCACK]-accompanied reply. [HCACK]: HostCommandAcknowledge
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ParameterAcknowledge {
  ParameterNameUnknown = 1,
  IllegalValue = 2,
  IllegalFormat = 3,
}
singleformat_enum! {ParameterAcknowledge, Bin}

/// ## HCACK — Host command parameter acknowledge code.
/// Used by S2F42.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum HostCommandAcknowledge {
  Accepted = 0,
  InvalidCommand = 1,
  CannotPerformNow = 2,
  ParameterError = 3,
  InitiatedForAsynchronousCompletion = 4,
  RejectedAlreadyActive = 5,
  NoSuchObject = 6,
}
singleformat_enum! {HostCommandAcknowledge, Bin}

/// ## ACKC6 — Acknowledge code for S6F11 event reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum EventReportAcknowledge {
  Accepted = 0,
  Error = 1,
}
singleformat_enum! {EventReportAcknowledge, Bin}

/// ## PPID — Process program ID.
#[derive(Clone, Debug)]
pub enum ProcessProgramID {
  Ascii(String),
  Bin(Vec<u8>),
}
multiformat_vec! {ProcessProgramID, Ascii, Bin}

/// ## ACKC7 — Acknowledge code for process-program transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ProcessProgramAcknowledge {
  Accepted = 0,
  PermissionNotGranted = 1,
  LengthError = 2,
  ModeUnsupported = 3,
  PPIDNotFound = 4,
  TransmitFailure = 5,
}
singleformat_enum! {ProcessProgramAcknowledge, Bin}

/// ## MHEAD / SHEAD — raw 10-byte message header, used by control
/// messages that carry one verbatim (S9Fx exception reports).
#[derive(Clone, Debug)]
pub struct MessageHeader(pub [u8; 10]);
impl From<MessageHeader> for Item {
  fn from(value: MessageHeader) -> Item {
    Item::Bin(value.0.to_vec())
  }
}
impl TryFrom<Item> for MessageHeader {
  type Error = Error;
  fn try_from(value: Item) -> Result<Self, Self::Error> {
    match value {
      Item::Bin(v) if v.len() == 10 => {
        let mut header = [0u8; 10];
        header.copy_from_slice(&v);
        Ok(Self(header))
      }
      Item::Bin(_) => Err(ValueOutOfRange),
      _ => Err(WrongFormat),
    }
  }
}
