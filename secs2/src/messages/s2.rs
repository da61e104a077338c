//! # STREAM 2: EQUIPMENT CONTROL AND DIAGNOSTICS
//! **Based on SEMI E5§10.6**
//!
//! Equipment constants, event reporting configuration, and the generic
//! remote-command channel.

use super::message_data;
use crate::items::*;
use crate::{Item, Message};

macro_rules! list_message {
  ($name:ident, $inner:ty, $w:expr, $stream:expr, $function:expr) => {
    #[derive(Clone, Debug)]
    pub struct $name(pub Vec<$inner>);
    impl From<$name> for Message {
      fn from(value: $name) -> Self {
        Message { stream: $stream, function: $function, w: $w, text: Some(Item::List(value.0.into_iter().map(Item::from).collect())) }
      }
    }
    impl TryFrom<Message> for $name {
      type Error = crate::Error;
      fn try_from(message: Message) -> Result<Self, Self::Error> {
        if message.stream != $stream {
          return Err(crate::Error::WrongStream);
        }
        if message.function != $function {
          return Err(crate::Error::WrongFunction);
        }
        if message.w != $w {
          return Err(crate::Error::WrongReply);
        }
        match message.text {
          Some(Item::List(items)) => Ok(Self(items.into_iter().map(<$inner>::try_from).collect::<Result<_, _>>()?)),
          _ => Err(crate::Error::WrongFormat),
        }
      }
    }
  };
}

/// ## S2F13
///
/// **Equipment Constant Request (ECR, W)**
list_message! {EquipmentConstantRequest, EquipmentConstantID, true, 2, 13}

/// ## S2F14
///
/// **Equipment Constant Data (ECD)**
///
/// One [EquipmentConstantValue] per requested ECID, in request order.
list_message! {EquipmentConstantData, EquipmentConstantValue, false, 2, 14}

/// ## S2F15
///
/// **New Equipment Constant Send (ECS, W)**
#[derive(Clone, Debug)]
pub struct NewEquipmentConstantSend(pub Vec<(EquipmentConstantID, EquipmentConstantValue)>);
impl From<NewEquipmentConstantSend> for Message {
  fn from(value: NewEquipmentConstantSend) -> Self {
    let items = value.0.into_iter().map(|(id, val)| Item::List(vec![id.into(), val.into()])).collect();
    Message { stream: 2, function: 15, w: true, text: Some(Item::List(items)) }
  }
}
impl TryFrom<Message> for NewEquipmentConstantSend {
  type Error = crate::Error;
  fn try_from(message: Message) -> Result<Self, Self::Error> {
    if message.stream != 2 {
      return Err(crate::Error::WrongStream);
    }
    if message.function != 15 {
      return Err(crate::Error::WrongFunction);
    }
    if !message.w {
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
      let val = EquipmentConstantValue::try_from(pair.pop().unwrap())?;
      let id = EquipmentConstantID::try_from(pair.pop().unwrap())?;
      out.push((id, val));
    }
    Ok(Self(out))
  }
}

/// ## S2F16
///
/// **New Equipment Constant Acknowledge (ECA)**
#[derive(Clone, Debug)]
pub struct NewEquipmentConstantAcknowledge(pub EquipmentConstantAcknowledge);
message_data! {NewEquipmentConstantAcknowledge, false, 2, 16}

/// ## S2F29
///
/// **Equipment Constant Namelist Request (ECNR, W)**
list_message! {EquipmentConstantNamelistRequest, EquipmentConstantID, true, 2, 29}

/// ## S2F30
///
/// **Equipment Constant Namelist Reply (ECNRR)**
///
/// `min`/`max` are empty-list items when the constant has no declared
/// range.
#[derive(Clone, Debug)]
pub struct EquipmentConstantNamelistReply(pub Vec<(EquipmentConstantID, EquipmentConstantName, EquipmentConstantValue, EquipmentConstantValue, EquipmentConstantValue)>);
impl From<EquipmentConstantNamelistReply> for Message {
  fn from(value: EquipmentConstantNamelistReply) -> Self {
    let items = value
      .0
      .into_iter()
      .map(|(id, name, min, max, default)| Item::List(vec![id.into(), name.into(), min.into(), max.into(), default.into()]))
      .collect();
    Message { stream: 2, function: 30, w: false, text: Some(Item::List(items)) }
  }
}
impl TryFrom<Message> for EquipmentConstantNamelistReply {
  type Error = crate::Error;
  fn try_from(message: Message) -> Result<Self, Self::Error> {
    if message.stream != 2 {
      return Err(crate::Error::WrongStream);
    }
    if message.function != 30 {
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
      let Item::List(mut fields) = entry else {
        return Err(crate::Error::WrongFormat);
      };
      if fields.len() != 5 {
        return Err(crate::Error::WrongFormat);
      }
      let default = EquipmentConstantValue::try_from(fields.pop().unwrap())?;
      let max = EquipmentConstantValue::try_from(fields.pop().unwrap())?;
      let min = EquipmentConstantValue::try_from(fields.pop().unwrap())?;
      let name = EquipmentConstantName::try_from(fields.pop().unwrap())?;
      let id = EquipmentConstantID::try_from(fields.pop().unwrap())?;
      out.push((id, name, min, max, default));
    }
    Ok(Self(out))
  }
}

/// ## S2F33
///
/// **Define Report (DR), W**
///
/// Each report is `(RPTID, list of VID)`.
#[derive(Clone, Debug)]
pub struct DefineReport(pub DataID, pub Vec<(ReportID, Vec<VariableID>)>);
impl From<DefineReport> for Message {
  fn from(value: DefineReport) -> Self {
    let reports = value.1.into_iter().map(|(rptid, vids)| Item::List(vec![rptid.into(), Item::List(vids.into_iter().map(Item::from).collect())])).collect();
    Message { stream: 2, function: 33, w: true, text: Some(Item::List(vec![value.0.into(), Item::List(reports)])) }
  }
}
impl TryFrom<Message> for DefineReport {
  type Error = crate::Error;
  fn try_from(message: Message) -> Result<Self, Self::Error> {
    if message.stream != 2 {
      return Err(crate::Error::WrongStream);
    }
    if message.function != 33 {
      return Err(crate::Error::WrongFunction);
    }
    if !message.w {
      return Err(crate::Error::WrongReply);
    }
    let Some(Item::List(mut top)) = message.text else {
      return Err(crate::Error::WrongFormat);
    };
    if top.len() != 2 {
      return Err(crate::Error::WrongFormat);
    }
    let Item::List(reports) = top.pop().unwrap() else {
      return Err(crate::Error::WrongFormat);
    };
    let dataid = DataID::try_from(top.pop().unwrap())?;
    let mut out = Vec::with_capacity(reports.len());
    for report in reports {
      let Item::List(mut pair) = report else {
        return Err(crate::Error::WrongFormat);
      };
      if pair.len() != 2 {
        return Err(crate::Error::WrongFormat);
      }
      let Item::List(vids) = pair.pop().unwrap() else {
        return Err(crate::Error::WrongFormat);
      };
      let rptid = ReportID::try_from(pair.pop().unwrap())?;
      let vids = vids.into_iter().map(VariableID::try_from).collect::<Result<_, _>>()?;
      out.push((rptid, vids));
    }
    Ok(Self(dataid, out))
  }
}

/// ## S2F34
///
/// **Define Report Acknowledge (DRA)**
#[derive(Clone, Debug)]
pub struct DefineReportAck(pub DefineReportAcknowledge);
message_data! {DefineReportAck, false, 2, 34}

/// ## S2F35
///
/// **Link Event Report (LER), W**
///
/// Each link is `(CEID, list of RPTID)`.
#[derive(Clone, Debug)]
pub struct LinkEventReport(pub DataID, pub Vec<(CollectionEventID, Vec<ReportID>)>);
impl From<LinkEventReport> for Message {
  fn from(value: LinkEventReport) -> Self {
    let links = value.1.into_iter().map(|(ceid, rptids)| Item::List(vec![ceid.into(), Item::List(rptids.into_iter().map(Item::from).collect())])).collect();
    Message { stream: 2, function: 35, w: true, text: Some(Item::List(vec![value.0.into(), Item::List(links)])) }
  }
}
impl TryFrom<Message> for LinkEventReport {
  type Error = crate::Error;
  fn try_from(message: Message) -> Result<Self, Self::Error> {
    if message.stream != 2 {
      return Err(crate::Error::WrongStream);
    }
    if message.function != 35 {
      return Err(crate::Error::WrongFunction);
    }
    if !message.w {
      return Err(crate::Error::WrongReply);
    }
    let Some(Item::List(mut top)) = message.text else {
      return Err(crate::Error::WrongFormat);
    };
    if top.len() != 2 {
      return Err(crate::Error::WrongFormat);
    }
    let Item::List(links) = top.pop().unwrap() else {
      return Err(crate::Error::WrongFormat);
    };
    let dataid = DataID::try_from(top.pop().unwrap())?;
    let mut out = Vec::with_capacity(links.len());
    for link in links {
      let Item::List(mut pair) = link else {
        return Err(crate::Error::WrongFormat);
      };
      if pair.len() != 2 {
        return Err(crate::Error::WrongFormat);
      }
      let Item::List(rptids) = pair.pop().unwrap() else {
        return Err(crate::Error::WrongFormat);
      };
      let ceid = CollectionEventID::try_from(pair.pop().unwrap())?;
      let rptids = rptids.into_iter().map(ReportID::try_from).collect::<Result<_, _>>()?;
      out.push((ceid, rptids));
    }
    Ok(Self(dataid, out))
  }
}

/// ## S2F36
///
/// **Link Event Report Acknowledge (LRA)**
#[derive(Clone, Debug)]
pub struct LinkEventReportAck(pub LinkReportAcknowledge);
message_data! {LinkEventReportAck, false, 2, 36}

/// ## S2F37
///
/// **Enable/Disable Event Report (EDE), W**
#[derive(Clone, Debug)]
pub struct EnableDisableEventReport(pub CollectionEventEnableDisable, pub Vec<CollectionEventID>);
impl From<EnableDisableEventReport> for Message {
  fn from(value: EnableDisableEventReport) -> Self {
    Message { stream: 2, function: 37, w: true, text: Some(Item::List(vec![value.0.into(), Item::List(value.1.into_iter().map(Item::from).collect())])) }
  }
}
impl TryFrom<Message> for EnableDisableEventReport {
  type Error = crate::Error;
  fn try_from(message: Message) -> Result<Self, Self::Error> {
    if message.stream != 2 {
      return Err(crate::Error::WrongStream);
    }
    if message.function != 37 {
      return Err(crate::Error::WrongFunction);
    }
    if !message.w {
      return Err(crate::Error::WrongReply);
    }
    let Some(Item::List(mut top)) = message.text else {
      return Err(crate::Error::WrongFormat);
    };
    if top.len() != 2 {
      return Err(crate::Error::WrongFormat);
    }
    let Item::List(ceids) = top.pop().unwrap() else {
      return Err(crate::Error::WrongFormat);
    };
    let ceed = CollectionEventEnableDisable::try_from(top.pop().unwrap())?;
    let ceids = ceids.into_iter().map(CollectionEventID::try_from).collect::<Result<_, _>>()?;
    Ok(Self(ceed, ceids))
  }
}

/// ## S2F38
///
/// **Enable/Disable Event Report Acknowledge (EDEA)**
#[derive(Clone, Debug)]
pub struct EnableDisableEventReportAck(pub EnableDisableEventReportAcknowledge);
message_data! {EnableDisableEventReportAck, false, 2, 38}

/// ## S2F41
///
/// **Host Command Send (RCMD), W**
#[derive(Clone, Debug)]
pub struct HostCommandSend(pub RemoteCommand, pub Vec<(ParameterName, ParameterValue)>);
impl From<HostCommandSend> for Message {
  fn from(value: HostCommandSend) -> Self {
    let params = value.1.into_iter().map(|(name, val)| Item::List(vec![name.into(), val.into()])).collect();
    Message { stream: 2, function: 41, w: true, text: Some(Item::List(vec![value.0.into(), Item::List(params)])) }
  }
}
impl TryFrom<Message> for HostCommandSend {
  type Error = crate::Error;
  fn try_from(message: Message) -> Result<Self, Self::Error> {
    if message.stream != 2 {
      return Err(crate::Error::WrongStream);
    }
    if message.function != 41 {
      return Err(crate::Error::WrongFunction);
    }
    if !message.w {
      return Err(crate::Error::WrongReply);
    }
    let Some(Item::List(mut top)) = message.text else {
      return Err(crate::Error::WrongFormat);
    };
    if top.len() != 2 {
      return Err(crate::Error::WrongFormat);
    }
    let Item::List(params) = top.pop().unwrap() else {
      return Err(crate::Error::WrongFormat);
    };
    let rcmd = RemoteCommand::try_from(top.pop().unwrap())?;
    let mut out = Vec::with_capacity(params.len());
    for param in params {
      let Item::List(mut pair) = param else {
        return Err(crate::Error::WrongFormat);
      };
      if pair.len() != 2 {
        return Err(crate::Error::WrongFormat);
      }
      let val = ParameterValue::try_from(pair.pop().unwrap())?;
      let name = ParameterName::try_from(pair.pop().unwrap())?;
      out.push((name, val));
    }
    Ok(Self(rcmd, out))
  }
}

/// ## S2F42
///
/// **Host Command Acknowledge (HCA)**
///
/// `params` is the per-parameter [ParameterAcknowledge] list, empty when
/// `hcack` already conveys overall rejection.
#[derive(Clone, Debug)]
pub struct HostCommandAck(pub HostCommandAcknowledge, pub Vec<(ParameterName, ParameterAcknowledge)>);
impl From<HostCommandAck> for Message {
  fn from(value: HostCommandAck) -> Self {
    let params = value.1.into_iter().map(|(name, cpack)| Item::List(vec![name.into(), cpack.into()])).collect();
    Message { stream: 2, function: 42, w: false, text: Some(Item::List(vec![value.0.into(), Item::List(params)])) }
  }
}
impl TryFrom<Message> for HostCommandAck {
  type Error = crate::Error;
  fn try_from(message: Message) -> Result<Self, Self::Error> {
    if message.stream != 2 {
      return Err(crate::Error::WrongStream);
    }
    if message.function != 42 {
      return Err(crate::Error::WrongFunction);
    }
    if message.w {
      return Err(crate::Error::WrongReply);
    }
    let Some(Item::List(mut top)) = message.text else {
      return Err(crate::Error::WrongFormat);
    };
    if top.len() != 2 {
      return Err(crate::Error::WrongFormat);
    }
    let Item::List(params) = top.pop().unwrap() else {
      return Err(crate::Error::WrongFormat);
    };
    let hcack = HostCommandAcknowledge::try_from(top.pop().unwrap())?;
    let mut out = Vec::with_capacity(params.len());
    for param in params {
      let Item::List(mut pair) = param else {
        return Err(crate::Error::WrongFormat);
      };
      if pair.len() != 2 {
        return Err(crate::Error::WrongFormat);
      }
      let cpack = ParameterAcknowledge::try_from(pair.pop().unwrap())?;
      let name = ParameterName::try_from(pair.pop().unwrap())?;
      out.push((name, cpack));
    }
    Ok(Self(hcack, out))
  }
}
