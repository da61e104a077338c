//! # STREAM 7: PROCESS PROGRAM MANAGEMENT
//! **Based on SEMI E5§10.10**
//!
//! A minimal process-program directory/deletion surface. Process-program
//! content transfer itself is out of scope; these messages cover the
//! naming and deletion operations the GEM host convenience layer issues.

use crate::items::*;
use crate::{Item, Message};

/// ## S7F17
///
/// **Delete Process Program Send (PPD), W**
///
/// An empty list requests deletion of every stored process program.
#[derive(Clone, Debug)]
pub struct DeleteProcessProgramSend(pub Vec<ProcessProgramID>);
impl From<DeleteProcessProgramSend> for Message {
  fn from(value: DeleteProcessProgramSend) -> Self {
    Message { stream: 7, function: 17, w: true, text: Some(Item::List(value.0.into_iter().map(Item::from).collect())) }
  }
}
impl TryFrom<Message> for DeleteProcessProgramSend {
  type Error = crate::Error;
  fn try_from(message: Message) -> Result<Self, Self::Error> {
    if message.stream != 7 {
      return Err(crate::Error::WrongStream);
    }
    if message.function != 17 {
      return Err(crate::Error::WrongFunction);
    }
    if !message.w {
      return Err(crate::Error::WrongReply);
    }
    match message.text {
      Some(Item::List(items)) => Ok(Self(items.into_iter().map(ProcessProgramID::try_from).collect::<Result<_, _>>()?)),
      _ => Err(crate::Error::WrongFormat),
    }
  }
}

/// ## S7F18
///
/// **Delete Process Program Acknowledge (ACKC7)**
#[derive(Clone, Debug)]
pub struct DeleteProcessProgramAck(pub ProcessProgramAcknowledge);
super::message_data! {DeleteProcessProgramAck, false, 7, 18}

/// ## S7F19
///
/// **Current Equipment Process Program Directory Request (R)**
#[derive(Clone, Debug)]
pub struct CurrentEPPDRequest;
super::message_headeronly! {CurrentEPPDRequest, true, 7, 19}

/// ## S7F20
///
/// **Current Equipment Process Program Directory Data (PPDD)**
#[derive(Clone, Debug)]
pub struct CurrentEPPDData(pub Vec<ProcessProgramID>);
impl From<CurrentEPPDData> for Message {
  fn from(value: CurrentEPPDData) -> Self {
    Message { stream: 7, function: 20, w: false, text: Some(Item::List(value.0.into_iter().map(Item::from).collect())) }
  }
}
impl TryFrom<Message> for CurrentEPPDData {
  type Error = crate::Error;
  fn try_from(message: Message) -> Result<Self, Self::Error> {
    if message.stream != 7 {
      return Err(crate::Error::WrongStream);
    }
    if message.function != 20 {
      return Err(crate::Error::WrongFunction);
    }
    if message.w {
      return Err(crate::Error::WrongReply);
    }
    match message.text {
      Some(Item::List(items)) => Ok(Self(items.into_iter().map(ProcessProgramID::try_from).collect::<Result<_, _>>()?)),
      _ => Err(crate::Error::WrongFormat),
    }
  }
}
