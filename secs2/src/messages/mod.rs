//! ## STREAM-FUNCTION MESSAGES
//! **Based on SEMI E5§10**
//!
//! Each message here is a thin, named wrapper that fixes one (stream,
//! function, reply-bit) triple and the shape of its body, built with the
//! same small macro family the teacher demonstrated. Only the subset
//! actually exercised by the `gem` crate's equipment/host surface is
//! defined — see `SPEC_FULL.md` §6 for the concrete list.

/// ## MESSAGE MACRO: HEADER ONLY
///
/// For messages with no body (`text: None`).
macro_rules! message_headeronly {
  ($name:ident, $w:expr, $stream:expr, $function:expr) => {
    impl From<$name> for $crate::Message {
      fn from(_value: $name) -> Self {
        $crate::Message { stream: $stream, function: $function, w: $w, text: None }
      }
    }
    impl TryFrom<$crate::Message> for $name {
      type Error = $crate::Error;
      fn try_from(message: $crate::Message) -> Result<Self, Self::Error> {
        if message.stream != $stream {
          return Err($crate::Error::WrongStream);
        }
        if message.function != $function {
          return Err($crate::Error::WrongFunction);
        }
        if message.w != $w {
          return Err($crate::Error::WrongReply);
        }
        match message.text {
          None => Ok($name),
          Some(_) => Err($crate::Error::WrongFormat),
        }
      }
    }
  };
}

/// ## MESSAGE MACRO: STRUCTURED BODY
///
/// For messages whose body is a tuple/struct convertible to and from
/// [Item]. [Item]: Item
macro_rules! message_data {
  ($name:ident, $w:expr, $stream:expr, $function:expr) => {
    impl From<$name> for $crate::Message {
      fn from(value: $name) -> Self {
        $crate::Message { stream: $stream, function: $function, w: $w, text: Some(value.0.into()) }
      }
    }
    impl TryFrom<$crate::Message> for $name {
      type Error = $crate::Error;
      fn try_from(message: $crate::Message) -> Result<Self, Self::Error> {
        if message.stream != $stream {
          return Err($crate::Error::WrongStream);
        }
        if message.function != $function {
          return Err($crate::Error::WrongFunction);
        }
        if message.w != $w {
          return Err($crate::Error::WrongReply);
        }
        match message.text {
          Some(item) => Ok(Self(item.try_into()?)),
          None => Err($crate::Error::WrongFormat),
        }
      }
    }
  };
}

/// ## MESSAGE MACRO: RAW ITEM BODY
///
/// For messages whose body is exactly one [Item], with no further typed
/// wrapper. [Item]: Item
macro_rules! message_item {
  ($name:ident, $w:expr, $stream:expr, $function:expr) => {
    impl From<$name> for $crate::Message {
      fn from(value: $name) -> Self {
        $crate::Message { stream: $stream, function: $function, w: $w, text: Some(value.0) }
      }
    }
    impl TryFrom<$crate::Message> for $name {
      type Error = $crate::Error;
      fn try_from(message: $crate::Message) -> Result<Self, Self::Error> {
        if message.stream != $stream {
          return Err($crate::Error::WrongStream);
        }
        if message.function != $function {
          return Err($crate::Error::WrongFunction);
        }
        if message.w != $w {
          return Err($crate::Error::WrongReply);
        }
        match message.text {
          Some(item) => Ok(Self(item)),
          None => Err($crate::Error::WrongFormat),
        }
      }
    }
  };
}

pub(crate) use message_data;
pub(crate) use message_headeronly;
pub(crate) use message_item;

pub mod s1;
pub mod s2;
pub mod s5;
pub mod s6;
pub mod s7;
pub mod s9;
