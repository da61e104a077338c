//! # STREAM 1: EQUIPMENT STATUS
//! **Based on SEMI E5§10.5**
//!
//! Messages dealing with the equipment's current communications and
//! control state, and the basic status-variable query surface.

use super::{message_data, message_headeronly};
use crate::items::*;
use crate::{Item, Message};

/// ## S1F0
///
/// **Abort Transaction (header-only, no reply)**
#[derive(Clone, Debug)]
pub struct Abort;
message_headeronly! {Abort, false, 1, 0}

/// ## S1F1
///
/// **Are You There Request (R)**
#[derive(Clone, Debug)]
pub struct AreYouThere;
message_headeronly! {AreYouThere, true, 1, 1}

/// ## S1F2
///
/// **On Line Data (D)**
///
/// Sent by the host with an empty body; sent by the equipment carrying
/// [ModelName] and [SoftwareRevision].
#[derive(Clone, Debug)]
pub struct OnLineDataHost;
message_headeronly! {OnLineDataHost, false, 1, 2}

#[derive(Clone, Debug)]
pub struct OnLineDataEquipment(pub (ModelName, SoftwareRevision));
message_data! {OnLineDataEquipment, false, 1, 2}

/// ## S1F3
///
/// **Selected Equipment Status Request (SSR, W)**
#[derive(Clone, Debug)]
pub struct SelectedEquipmentStatusRequest(pub Vec<StatusVariableID>);
impl From<SelectedEquipmentStatusRequest> for Message {
  fn from(value: SelectedEquipmentStatusRequest) -> Self {
    Message { stream: 1, function: 3, w: true, text: Some(Item::List(value.0.into_iter().map(Item::from).collect())) }
  }
}
impl TryFrom<Message> for SelectedEquipmentStatusRequest {
  type Error = crate::Error;
  fn try_from(message: Message) -> Result<Self, Self::Error> {
    if message.stream != 1 {
      return Err(crate::Error::WrongStream);
    }
    if message.function != 3 {
      return Err(crate::Error::WrongFunction);
    }
    if !message.w {
      return Err(crate::Error::WrongReply);
    }
    match message.text {
      Some(Item::List(items)) => Ok(Self(items.into_iter().map(StatusVariableID::try_from).collect::<Result<_, _>>()?)),
      _ => Err(crate::Error::WrongFormat),
    }
  }
}

/// ## S1F4
///
/// **Selected Equipment Status Data (SSD)**
///
/// One [StatusVariableValue] per requested SVID, in request order.
#[derive(Clone, Debug)]
pub struct SelectedEquipmentStatusData(pub Vec<StatusVariableValue>);
impl From<SelectedEquipmentStatusData> for Message {
  fn from(value: SelectedEquipmentStatusData) -> Self {
    Message { stream: 1, function: 4, w: false, text: Some(Item::List(value.0.into_iter().map(Item::from).collect())) }
  }
}
impl TryFrom<Message> for SelectedEquipmentStatusData {
  type Error = crate::Error;
  fn try_from(message: Message) -> Result<Self, Self::Error> {
    if message.stream != 1 {
      return Err(crate::Error::WrongStream);
    }
    if message.function != 4 {
      return Err(crate::Error::WrongFunction);
    }
    if message.w {
      return Err(crate::Error::WrongReply);
    }
    match message.text {
      Some(Item::List(items)) => Ok(Self(items.into_iter().map(StatusVariableValue::try_from).collect::<Result<_, _>>()?)),
      _ => Err(crate::Error::WrongFormat),
    }
  }
}

/// ## S1F11
///
/// **Status Variable Namelist Request (SVNR, W)**
#[derive(Clone, Debug)]
pub struct StatusVariableNamelistRequest(pub Vec<StatusVariableID>);
impl From<StatusVariableNamelistRequest> for Message {
  fn from(value: StatusVariableNamelistRequest) -> Self {
    Message { stream: 1, function: 11, w: true, text: Some(Item::List(value.0.into_iter().map(Item::from).collect())) }
  }
}
impl TryFrom<Message> for StatusVariableNamelistRequest {
  type Error = crate::Error;
  fn try_from(message: Message) -> Result<Self, Self::Error> {
    if message.stream != 1 {
      return Err(crate::Error::WrongStream);
    }
    if message.function != 11 {
      return Err(crate::Error::WrongFunction);
    }
    if !message.w {
      return Err(crate::Error::WrongReply);
    }
    match message.text {
      Some(Item::List(items)) => Ok(Self(items.into_iter().map(StatusVariableID::try_from).collect::<Result<_, _>>()?)),
      _ => Err(crate::Error::WrongFormat),
    }
  }
}

/// ## S1F12
///
/// **Status Variable Namelist Reply (SVNRR)**
///
/// A name is empty when the requested SVID is unknown, per SEMI E5§10.5.
#[derive(Clone, Debug)]
pub struct StatusVariableNamelistReply(pub Vec<(StatusVariableID, StatusVariableName)>);
impl From<StatusVariableNamelistReply> for Message {
  fn from(value: StatusVariableNamelistReply) -> Self {
    let items = value.0.into_iter().map(|(id, name)| Item::List(vec![id.into(), name.into()])).collect();
    Message { stream: 1, function: 12, w: false, text: Some(Item::List(items)) }
  }
}
impl TryFrom<Message> for StatusVariableNamelistReply {
  type Error = crate::Error;
  fn try_from(message: Message) -> Result<Self, Self::Error> {
    if message.stream != 1 {
      return Err(crate::Error::WrongStream);
    }
    if message.function != 12 {
      return Err(crate::Error::WrongFunction);
    }
    if message.w {
      return Err(crate::Error::WrongReply);
    }
    let Some(Item::List(entries)) = message.text else {
      return Err(crate::Error::WrongFormat);
    };
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
      let Item::List(mut pair) = entry else {
        return Err(crate::Error::WrongFormat);
      };
      if pair.len() != 2 {
        return Err(crate::Error::WrongFormat);
      }
      let name = StatusVariableName::try_from(pair.pop().unwrap())?;
      let id = StatusVariableID::try_from(pair.pop().unwrap())?;
      out.push((id, name));
    }
    Ok(Self(out))
  }
}

/// ## S1F13
///
/// **Host CR (HCR) / Equipment CR (ECR), W**
///
/// Establish Communications Request. The equipment-originated form
/// carries [ModelName]/[SoftwareRevision]; the host-originated form is
/// empty.
#[derive(Clone, Debug)]
pub struct HostCR;
message_headeronly! {HostCR, true, 1, 13}

#[derive(Clone, Debug)]
pub struct EquipmentCR(pub (ModelName, SoftwareRevision));
message_data! {EquipmentCR, true, 1, 13}

/// ## S1F14
///
/// **Host CRA (HCRA) / Equipment CRA (ECRA)**
///
/// Establish Communications Request Acknowledge, carrying [CommAck] and,
/// on the equipment->host leg, [ModelName]/[SoftwareRevision].
#[derive(Clone, Debug)]
pub struct HostCRA(pub (CommAck, ()));
message_data! {HostCRA, false, 1, 14}

#[derive(Clone, Debug)]
pub struct EquipmentCRA(pub (CommAck, (ModelName, SoftwareRevision)));
message_data! {EquipmentCRA, false, 1, 14}

/// ## S1F15
///
/// **Request OFF-LINE (R)**
#[derive(Clone, Debug)]
pub struct OffLineRequest;
message_headeronly! {OffLineRequest, true, 1, 15}

/// ## S1F16
///
/// **OFF-LINE Acknowledge**
#[derive(Clone, Debug)]
pub struct OffLineAck(pub OffLineAcknowledge);
message_data! {OffLineAck, false, 1, 16}

/// ## S1F17
///
/// **Request ON-LINE (R)**
#[derive(Clone, Debug)]
pub struct OnLineRequest;
message_headeronly! {OnLineRequest, true, 1, 17}

/// ## S1F18
///
/// **ON-LINE Acknowledge**
#[derive(Clone, Debug)]
pub struct OnLineAck(pub OnLineAcknowledge);
message_data! {OnLineAck, false, 1, 18}
