//! # STREAM 6: DATA COLLECTION
//! **Based on SEMI E5§10.9**
//!
//! Delivery of the event reports a host has defined and linked via
//! Stream 2.

use crate::items::*;
use crate::{Item, Message};

/// ## S6F11
///
/// **Event Report Send (ERS), W**
///
/// Each report is `(RPTID, list of V)`, `V` being the raw [StatusVariableValue]
/// shape the variable happened to encode as.
#[derive(Clone, Debug)]
pub struct EventReportSend(pub DataID, pub CollectionEventID, pub Vec<(ReportID, Vec<StatusVariableValue>)>);
impl From<EventReportSend> for Message {
  fn from(value: EventReportSend) -> Self {
    let reports = value.2.into_iter().map(|(rptid, values)| Item::List(vec![rptid.into(), Item::List(values.into_iter().map(Item::from).collect())])).collect();
    Message { stream: 6, function: 11, w: true, text: Some(Item::List(vec![value.0.into(), value.1.into(), Item::List(reports)])) }
  }
}
impl TryFrom<Message> for EventReportSend {
  type Error = crate::Error;
  fn try_from(message: Message) -> Result<Self, Self::Error> {
    if message.stream != 6 {
      return Err(crate::Error::WrongStream);
    }
    if message.function != 11 {
      return Err(crate::Error::WrongFunction);
    }
    if !message.w {
      return Err(crate::Error::WrongReply);
    }
    let Some(Item::List(mut top)) = message.text else {
      return Err(crate::Error::WrongFormat);
    };
    if top.len() != 3 {
      return Err(crate::Error::WrongFormat);
    }
    let Item::List(reports) = top.pop().unwrap() else {
      return Err(crate::Error::WrongFormat);
    };
    let ceid = CollectionEventID::try_from(top.pop().unwrap())?;
    let dataid = DataID::try_from(top.pop().unwrap())?;
    let mut out = Vec::with_capacity(reports.len());
    for report in reports {
      let Item::List(mut pair) = report else {
        return Err(crate::Error::WrongFormat);
      };
      if pair.len() != 2 {
        return Err(crate::Error::WrongFormat);
      }
      let Item::List(values) = pair.pop().unwrap() else {
        return Err(crate::Error::WrongFormat);
      };
      let rptid = ReportID::try_from(pair.pop().unwrap())?;
      let values = values.into_iter().map(StatusVariableValue::try_from).collect::<Result<_, _>>()?;
      out.push((rptid, values));
    }
    Ok(Self(dataid, ceid, out))
  }
}

/// ## S6F12
///
/// **Event Report Acknowledge (ACKC6)**
#[derive(Clone, Debug)]
pub struct EventReportAck(pub EventReportAcknowledge);
super::message_data! {EventReportAck, false, 6, 12}
