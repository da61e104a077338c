//! # STREAM 5: EXCEPTION HANDLING
//! **Based on SEMI E5§10.8**
//!
//! Alarm reporting and the host's alarm-enablement and alarm-listing
//! queries.

use crate::items::*;
use crate::{Item, Message};

/// ## S5F1
///
/// **Alarm Report Send (ARS), W**
#[derive(Clone, Debug)]
pub struct AlarmReportSend(pub AlarmCode, pub AlarmID, pub AlarmText);
impl From<AlarmReportSend> for Message {
  fn from(value: AlarmReportSend) -> Self {
    Message { stream: 5, function: 1, w: true, text: Some(Item::List(vec![value.0.into(), value.1.into(), value.2.into()])) }
  }
}
impl TryFrom<Message> for AlarmReportSend {
  type Error = crate::Error;
  fn try_from(message: Message) -> Result<Self, Self::Error> {
    if message.stream != 5 {
      return Err(crate::Error::WrongStream);
    }
    if message.function != 1 {
      return Err(crate::Error::WrongFunction);
    }
    if !message.w {
      return Err(crate::Error::WrongReply);
    }
    let Some(Item::List(mut fields)) = message.text else {
      return Err(crate::Error::WrongFormat);
    };
    if fields.len() != 3 {
      return Err(crate::Error::WrongFormat);
    }
    let text = AlarmText::try_from(fields.pop().unwrap())?;
    let id = AlarmID::try_from(fields.pop().unwrap())?;
    let code = AlarmCode::try_from(fields.pop().unwrap())?;
    Ok(Self(code, id, text))
  }
}

/// ## S5F2
///
/// **Alarm Report Acknowledge (ACKC5)**
#[derive(Clone, Debug)]
pub struct AlarmReportAck(pub AlarmAcknowledge);
super::message_data! {AlarmReportAck, false, 5, 2}

/// ## S5F3
///
/// **Enable/Disable Alarm Send (EDA), W**
#[derive(Clone, Debug)]
pub struct EnableDisableAlarm(pub AlarmEnableDisable, pub AlarmID);
impl From<EnableDisableAlarm> for Message {
  fn from(value: EnableDisableAlarm) -> Self {
    Message { stream: 5, function: 3, w: true, text: Some(Item::List(vec![value.0.into(), value.1.into()])) }
  }
}
impl TryFrom<Message> for EnableDisableAlarm {
  type Error = crate::Error;
  fn try_from(message: Message) -> Result<Self, Self::Error> {
    if message.stream != 5 {
      return Err(crate::Error::WrongStream);
    }
    if message.function != 3 {
      return Err(crate::Error::WrongFunction);
    }
    if !message.w {
      return Err(crate::Error::WrongReply);
    }
    let Some(Item::List(mut fields)) = message.text else {
      return Err(crate::Error::WrongFormat);
    };
    if fields.len() != 2 {
      return Err(crate::Error::WrongFormat);
    }
    let id = AlarmID::try_from(fields.pop().unwrap())?;
    let aled = AlarmEnableDisable::try_from(fields.pop().unwrap())?;
    Ok(Self(aled, id))
  }
}

/// ## S5F4
///
/// **Enable/Disable Alarm Acknowledge (ACKC5)**
#[derive(Clone, Debug)]
pub struct EnableDisableAlarmAck(pub AlarmAcknowledge);
super::message_data! {EnableDisableAlarmAck, false, 5, 4}

/// ## S5F5
///
/// **List Alarms Request (W)**
///
/// An empty list requests every alarm known to the equipment.
#[derive(Clone, Debug)]
pub struct ListAlarmsRequest(pub Vec<AlarmID>);
impl From<ListAlarmsRequest> for Message {
  fn from(value: ListAlarmsRequest) -> Self {
    Message { stream: 5, function: 5, w: true, text: Some(Item::List(value.0.into_iter().map(Item::from).collect())) }
  }
}
impl TryFrom<Message> for ListAlarmsRequest {
  type Error = crate::Error;
  fn try_from(message: Message) -> Result<Self, Self::Error> {
    if message.stream != 5 {
      return Err(crate::Error::WrongStream);
    }
    if message.function != 5 {
      return Err(crate::Error::WrongFunction);
    }
    if !message.w {
      return Err(crate::Error::WrongReply);
    }
    match message.text {
      Some(Item::List(items)) => Ok(Self(items.into_iter().map(AlarmID::try_from).collect::<Result<_, _>>()?)),
      _ => Err(crate::Error::WrongFormat),
    }
  }
}

/// ## S5F6
///
/// **List Alarms Data (LAD)**
#[derive(Clone, Debug)]
pub struct ListAlarmsData(pub Vec<(AlarmCode, AlarmID, AlarmText)>);
impl From<ListAlarmsData> for Message {
  fn from(value: ListAlarmsData) -> Self {
    let items = value.0.into_iter().map(|(code, id, text)| Item::List(vec![code.into(), id.into(), text.into()])).collect();
    Message { stream: 5, function: 6, w: false, text: Some(Item::List(items)) }
  }
}
impl TryFrom<Message> for ListAlarmsData {
  type Error = crate::Error;
  fn try_from(message: Message) -> Result<Self, Self::Error> {
    if message.stream != 5 {
      return Err(crate::Error::WrongStream);
    }
    if message.function != 6 {
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
      if fields.len() != 3 {
        return Err(crate::Error::WrongFormat);
      }
      let text = AlarmText::try_from(fields.pop().unwrap())?;
      let id = AlarmID::try_from(fields.pop().unwrap())?;
      let code = AlarmCode::try_from(fields.pop().unwrap())?;
      out.push((code, id, text));
    }
    Ok(Self(out))
  }
}

/// ## S5F7
///
/// **List Enabled Alarms Request (R)**
#[derive(Clone, Debug)]
pub struct ListEnabledAlarmsRequest;
super::message_headeronly! {ListEnabledAlarmsRequest, true, 5, 7}

/// ## S5F8
///
/// **List Enabled Alarms Data (LEAD)**
#[derive(Clone, Debug)]
pub struct ListEnabledAlarmsData(pub Vec<(AlarmCode, AlarmID, AlarmText)>);
impl From<ListEnabledAlarmsData> for Message {
  fn from(value: ListEnabledAlarmsData) -> Self {
    let items = value.0.into_iter().map(|(code, id, text)| Item::List(vec![code.into(), id.into(), text.into()])).collect();
    Message { stream: 5, function: 8, w: false, text: Some(Item::List(items)) }
  }
}
impl TryFrom<Message> for ListEnabledAlarmsData {
  type Error = crate::Error;
  fn try_from(message: Message) -> Result<Self, Self::Error> {
    if message.stream != 5 {
      return Err(crate::Error::WrongStream);
    }
    if message.function != 8 {
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
      if fields.len() != 3 {
        return Err(crate::Error::WrongFormat);
      }
      let text = AlarmText::try_from(fields.pop().unwrap())?;
      let id = AlarmID::try_from(fields.pop().unwrap())?;
      let code = AlarmCode::try_from(fields.pop().unwrap())?;
      out.push((code, id, text));
    }
    Ok(Self(out))
  }
}
