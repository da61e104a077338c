//! # SEMI EQUIPMENT COMMUNICATIONS STANDARD 2 (SECS-II) MESSAGE CONTENT
//! **Based on:**
//! - **[SEMI E5]-0712**
//!
//! This third-party codebase will be updated to reflect more up-to-date SEMI
//! standards if/when they can be acquired for this purpose.
//!
//! ---------------------------------------------------------------------------
//!
//! [SECS-II] is a Presentation Protocol designed to facilitate a common
//! communications language between semiconductor equipment, particularly as
//! understood by the GEM ([SEMI E30]) Application Protocol
//! (together known as SECS/GEM). Common Session Protocols for transporting
//! [SECS-II] messages include SECS-I ([SEMI E4]) and HSMS ([SEMI E37]).
//!
//! ---------------------------------------------------------------------------
//!
//! ## REFERENCED STANDARDS
//!
//! - SEMI E4        - SEMI Equipment Communications Standard 1 (SECS-I) Message Transfer
//! - SEMI E30       - Generic Model for Communications and Control of Manufacturing Equipment (GEM)
//! - SEMI E37       - High-Speed SECS Message Services (HSMS) Generic Services
//! - ANSI X3.4-1977 - Code for Information Interchange (ASCII)
//! - IEEE 754       - Standards for Binary Floating Point Arithmetic
//! - JIS-6226       - JIS 8-bit Coded Character Set for Information Exchange
//!
//! [SEMI E4]:  https://store-us.semi.org/products/e00400-semi-e4-specification-for-semi-equipment-communications-standard-1-message-transfer-secs-i
//! [SEMI E5]:  https://store-us.semi.org/products/e00500-semi-e5-specification-for-semi-equipment-communications-standard-2-message-content-secs-ii
//! [SEMI E30]: https://store-us.semi.org/products/e03000-semi-e30-specification-for-the-generic-model-for-communications-and-control-of-manufacturing-equipment-gem
//! [SEMI E37]: https://store-us.semi.org/products/e03700-semi-e37-high-speed-secs-message-services-hsms-generic-services
//!
//! [SECS-II]:  crate

#![allow(clippy::unusual_byte_groupings)]

use encoding::{all::ISO_2022_JP, Encoding};

pub mod items;
pub mod messages;

/// ## GENERIC MESSAGE
/// **Based on SEMI E5§6**
#[derive(Clone, Debug)]
pub struct Message {
  /// ### STREAM
  /// **Based on SEMI E5§6.4.2**
  ///
  /// The [Stream] of the [Message] (0 to 127, 7 bits), which together with
  /// the [Function] uniquely defines a [Message].
  ///
  /// [Message]:  Message
  /// [Stream]:   Message::stream
  /// [Function]: Message::function
  pub stream: u8,

  /// ### FUNCTION
  /// **Based on SEMI E5§6.4.2**
  pub function: u8,

  /// ### REPLY REQUESTED
  /// **Based on SEMI E5§6.4.3**
  pub w: bool,

  /// ### MESSAGE TEXT
  ///
  /// - [None] - Indicates a header-only message.
  /// - [Some] - Indicates a message with contents after the header.
  pub text: Option<Item>,
}

/// ## DATA CONVERSION ERROR
///
/// Unified error type for the variable codec (C1) and the data-item/
/// stream-function registry (C2). Lower layers (HSMS, GEM) wrap this with
/// `From` into their own error enums rather than flattening it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
  /// Binary data was empty where an [Item] was required. [Item]: Item
  EmptyText,
  /// Binary data did not parse into a well-formed [Item]. [Item]: Item
  InvalidText,
  /// Payload byte-length exceeds `2^24 - 1`, or is otherwise out of the
  /// range the 1/2/3-byte length field can express.
  EncodingRange,
  /// A numeric value did not fit the variant's fixed-width range.
  ValueOutOfRange,
  /// A list or array was assigned more values than it declares room for.
  ValueCount,
  /// A field was assigned a value whose variant is not assignment-compatible
  /// with the field's declared variant.
  TypeMismatch,
  /// The wire format code did not match the format the decoder expected.
  FormatMismatch,
  /// A [Dynamic] item was decoded or assigned a format code outside its
  /// allowed-types set. [Dynamic]: Dynamic
  FormatNotAllowed,
  /// A value could not be assigned to any variant a [Dynamic] allows.
  /// [Dynamic]: Dynamic
  ValueNotSupported,
  /// Text could not be encoded under the variant's declared charset.
  EncodingError,
  /// A [Generic Message] was attempted to be converted into a specific
  /// [Message] despite containing the wrong [Stream].
  WrongStream,
  /// As [WrongStream], but for [Function]. [WrongStream]: Error::WrongStream [Function]: Message::function
  WrongFunction,
  /// A [Generic Message] was attempted to be converted into a specific
  /// [Message] despite containing an unacceptable [Reply Bit] value.
  /// [Reply Bit]: Message::w
  WrongReply,
  /// A [Generic Message] was attempted to be converted into a specific
  /// [Message] despite containing an improperly formatted [Message Body].
  /// [Message Body]: Message::text
  WrongFormat,
}
impl std::fmt::Display for Error {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{self:?}")
  }
}
impl std::error::Error for Error {}

/// ## ITEM FORMAT
/// **Based on SEMI E5§9.2.2**
pub mod format {
  /// **Format Code 0o00** List
  pub const LIST: u8 = 0b000000_00;
  /// **Format Code 0o10** Binary
  pub const BIN: u8 = 0b001000_00;
  /// **Format Code 0o11** Boolean
  pub const BOOL: u8 = 0b001001_00;
  /// **Format Code 0o20** ASCII
  pub const ASCII: u8 = 0b010000_00;
  /// **Format Code 0o21** JIS-8
  pub const JIS8: u8 = 0b010001_00;
  /// **Format Code 0o30** 8-byte signed integer
  pub const I8: u8 = 0b011000_00;
  /// **Format Code 0o31** 1-byte signed integer
  pub const I1: u8 = 0b011001_00;
  /// **Format Code 0o32** 2-byte signed integer
  pub const I2: u8 = 0b011010_00;
  /// **Format Code 0o34** 4-byte signed integer
  pub const I4: u8 = 0b011100_00;
  /// **Format Code 0o40** 8-byte float
  pub const F8: u8 = 0b100000_00;
  /// **Format Code 0o44** 4-byte float
  pub const F4: u8 = 0b100100_00;
  /// **Format Code 0o50** 8-byte unsigned integer
  pub const U8: u8 = 0b101000_00;
  /// **Format Code 0o51** 1-byte unsigned integer
  pub const U1: u8 = 0b101001_00;
  /// **Format Code 0o52** 2-byte unsigned integer
  pub const U2: u8 = 0b101010_00;
  /// **Format Code 0o54** 4-byte unsigned integer
  pub const U4: u8 = 0b101100_00;

  /// The high 6 bits of the item header's first byte.
  pub fn code_of(first_byte: u8) -> u8 {
    first_byte & 0b111111_00
  }

  /// The low 2 bits of the item header's first byte: how many length bytes
  /// follow (1, 2, or 3; 0 is invalid).
  pub fn length_bytes_of(first_byte: u8) -> u8 {
    first_byte & 0b000000_11
  }
}

/// ## GENERIC ITEM (SECS VARIABLE)
/// **Based on SEMI E5§9**
///
/// A tagged value. Every concrete variant knows its own format code; the
/// wire header additionally carries a length whose width (1, 2, or 3 bytes)
/// is chosen as the smallest that fits the payload's byte-length.
///
/// `List` doubles as both a named "List-structure" and a homogeneous
/// "Array" at the wire level — the distinction is a schema-level one made
/// by [items] and [messages], not an `Item` variant. [items]: items
/// [messages]: messages
#[derive(Clone, Debug, PartialEq)]
pub enum Item {
  /// **Based on SEMI E5§9.3** An ordered sequence of child [Item]s.
  /// [Item]: Item
  List(Vec<Item>),
  /// ASCII (Latin-1 byte) string.
  Ascii(String),
  /// JIS-8 string, encoded via ISO-2022-JP.
  Jis8(String),
  /// Arbitrary byte sequence.
  Bin(Vec<u8>),
  /// Sequence of booleans, one byte each (0x00 / non-zero).
  Bool(Vec<bool>),
  /// 1-byte two's-complement integers.
  I1(Vec<i8>),
  /// 2-byte two's-complement integers.
  I2(Vec<i16>),
  /// 4-byte two's-complement integers.
  I4(Vec<i32>),
  /// 8-byte two's-complement integers.
  I8(Vec<i64>),
  /// 1-byte unsigned integers.
  U1(Vec<u8>),
  /// 2-byte unsigned integers.
  U2(Vec<u16>),
  /// 4-byte unsigned integers.
  U4(Vec<u32>),
  /// 8-byte unsigned integers.
  U8(Vec<u64>),
  /// 4-byte IEEE-754 floats.
  F4(Vec<f32>),
  /// 8-byte IEEE-754 floats.
  F8(Vec<f64>),
}

/// Encode a format byte + 1/2/3 big-endian length bytes for `len` payload
/// bytes/elements, choosing the smallest length-byte-count that fits.
/// **Based on SEMI E5§9.2.2**, invariant: `length ceiling = 2^24 - 1`.
fn encode_header(code: u8, len: usize, out: &mut Vec<u8>) -> Result<(), Error> {
  if len > 0xFF_FFFF {
    return Err(Error::EncodingRange);
  }
  if len < 256 {
    out.push(code | 1);
    out.push(len as u8);
  } else if len < 65536 {
    out.push(code | 2);
    out.extend_from_slice(&(len as u16).to_be_bytes());
  } else {
    out.push(code | 3);
    out.extend_from_slice(&(len as u32).to_be_bytes()[1..4]);
  }
  Ok(())
}

impl Item {
  /// The 6-bit format code of this variant.
  pub fn format_code(&self) -> u8 {
    match self {
      Item::List(_) => format::LIST,
      Item::Ascii(_) => format::ASCII,
      Item::Jis8(_) => format::JIS8,
      Item::Bin(_) => format::BIN,
      Item::Bool(_) => format::BOOL,
      Item::I1(_) => format::I1,
      Item::I2(_) => format::I2,
      Item::I4(_) => format::I4,
      Item::I8(_) => format::I8,
      Item::U1(_) => format::U1,
      Item::U2(_) => format::U2,
      Item::U4(_) => format::U4,
      Item::U8(_) => format::U8,
      Item::F4(_) => format::F4,
      Item::F8(_) => format::F8,
    }
  }

  /// Encode into a fresh byte buffer.
  pub fn encode(&self) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    self.encode_into(&mut out)?;
    Ok(out)
  }

  fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), Error> {
    match self {
      Item::List(items) => {
        encode_header(format::LIST, items.len(), out)?;
        for item in items {
          item.encode_into(out)?;
        }
      }
      Item::Ascii(s) => {
        if !s.bytes().all(|b| b < 0x80) {
          return Err(Error::EncodingError);
        }
        encode_header(format::ASCII, s.len(), out)?;
        out.extend_from_slice(s.as_bytes());
      }
      Item::Jis8(s) => {
        let encoded = ISO_2022_JP
          .encode(s, encoding::EncoderTrap::Strict)
          .map_err(|_| Error::EncodingError)?;
        encode_header(format::JIS8, encoded.len(), out)?;
        out.extend_from_slice(&encoded);
      }
      Item::Bin(v) => {
        encode_header(format::BIN, v.len(), out)?;
        out.extend_from_slice(v);
      }
      Item::Bool(v) => {
        encode_header(format::BOOL, v.len(), out)?;
        out.extend(v.iter().map(|b| *b as u8));
      }
      Item::I1(v) => {
        encode_header(format::I1, v.len(), out)?;
        out.extend(v.iter().map(|n| *n as u8));
      }
      Item::I2(v) => {
        encode_header(format::I2, v.len() * 2, out)?;
        for n in v {
          out.extend_from_slice(&n.to_be_bytes());
        }
      }
      Item::I4(v) => {
        encode_header(format::I4, v.len() * 4, out)?;
        for n in v {
          out.extend_from_slice(&n.to_be_bytes());
        }
      }
      Item::I8(v) => {
        encode_header(format::I8, v.len() * 8, out)?;
        for n in v {
          out.extend_from_slice(&n.to_be_bytes());
        }
      }
      Item::U1(v) => {
        encode_header(format::U1, v.len(), out)?;
        out.extend_from_slice(v);
      }
      Item::U2(v) => {
        encode_header(format::U2, v.len() * 2, out)?;
        for n in v {
          out.extend_from_slice(&n.to_be_bytes());
        }
      }
      Item::U4(v) => {
        encode_header(format::U4, v.len() * 4, out)?;
        for n in v {
          out.extend_from_slice(&n.to_be_bytes());
        }
      }
      Item::U8(v) => {
        encode_header(format::U8, v.len() * 8, out)?;
        for n in v {
          out.extend_from_slice(&n.to_be_bytes());
        }
      }
      Item::F4(v) => {
        encode_header(format::F4, v.len() * 4, out)?;
        for n in v {
          out.extend_from_slice(&n.to_be_bytes());
        }
      }
      Item::F8(v) => {
        encode_header(format::F8, v.len() * 8, out)?;
        for n in v {
          out.extend_from_slice(&n.to_be_bytes());
        }
      }
    }
    Ok(())
  }

  /// Decode a complete `Item` from the front of `data`, returning the
  /// unconsumed remainder. Used directly by [Dynamic] decode, and by
  /// [TryFrom]`<Vec<u8>>` below for a whole-buffer decode.
  /// [Dynamic]: Dynamic
  pub fn decode_prefix(data: &[u8]) -> Result<(Item, &[u8]), Error> {
    let (first, rest) = data.split_first().ok_or(Error::InvalidText)?;
    let code = format::code_of(*first);
    let nlen = format::length_bytes_of(*first);
    if nlen == 0 || rest.len() < nlen as usize {
      return Err(Error::InvalidText);
    }
    let (len_bytes, mut rest) = rest.split_at(nlen as usize);
    let mut buf = [0u8; 4];
    buf[4 - nlen as usize..].copy_from_slice(len_bytes);
    let len = u32::from_be_bytes(buf) as usize;

    macro_rules! take_fixed {
      ($width:expr) => {{
        if len % $width != 0 {
          return Err(Error::InvalidText);
        }
        if rest.len() < len {
          return Err(Error::InvalidText);
        }
        let (chunk, remainder) = rest.split_at(len);
        rest = remainder;
        chunk
      }};
    }

    let item = match code {
      format::LIST => {
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
          let (item, remainder) = Item::decode_prefix(rest)?;
          items.push(item);
          rest = remainder;
        }
        Item::List(items)
      }
      format::ASCII => {
        let chunk = take_fixed!(1);
        if !chunk.iter().all(|b| *b < 0x80) {
          return Err(Error::InvalidText);
        }
        Item::Ascii(String::from_utf8_lossy(chunk).into_owned())
      }
      format::JIS8 => {
        let chunk = take_fixed!(1);
        let decoded = ISO_2022_JP
          .decode(chunk, encoding::DecoderTrap::Strict)
          .map_err(|_| Error::InvalidText)?;
        Item::Jis8(decoded)
      }
      format::BIN => Item::Bin(take_fixed!(1).to_vec()),
      format::BOOL => Item::Bool(take_fixed!(1).iter().map(|b| *b != 0).collect()),
      format::I1 => Item::I1(take_fixed!(1).iter().map(|b| *b as i8).collect()),
      format::I2 => Item::I2(
        take_fixed!(2)
          .chunks_exact(2)
          .map(|c| i16::from_be_bytes(c.try_into().unwrap()))
          .collect(),
      ),
      format::I4 => Item::I4(
        take_fixed!(4)
          .chunks_exact(4)
          .map(|c| i32::from_be_bytes(c.try_into().unwrap()))
          .collect(),
      ),
      format::I8 => Item::I8(
        take_fixed!(8)
          .chunks_exact(8)
          .map(|c| i64::from_be_bytes(c.try_into().unwrap()))
          .collect(),
      ),
      format::U1 => Item::U1(take_fixed!(1).to_vec()),
      format::U2 => Item::U2(
        take_fixed!(2)
          .chunks_exact(2)
          .map(|c| u16::from_be_bytes(c.try_into().unwrap()))
          .collect(),
      ),
      format::U4 => Item::U4(
        take_fixed!(4)
          .chunks_exact(4)
          .map(|c| u32::from_be_bytes(c.try_into().unwrap()))
          .collect(),
      ),
      format::U8 => Item::U8(
        take_fixed!(8)
          .chunks_exact(8)
          .map(|c| u64::from_be_bytes(c.try_into().unwrap()))
          .collect(),
      ),
      format::F4 => Item::F4(
        take_fixed!(4)
          .chunks_exact(4)
          .map(|c| f32::from_be_bytes(c.try_into().unwrap()))
          .collect(),
      ),
      format::F8 => Item::F8(
        take_fixed!(8)
          .chunks_exact(8)
          .map(|c| f64::from_be_bytes(c.try_into().unwrap()))
          .collect(),
      ),
      _ => return Err(Error::InvalidText),
    };
    Ok((item, rest))
  }

  /// Single-element convenience constructors, for the common case of a
  /// scalar wrapped in a length-1 item.
  pub fn bin(value: u8) -> Self {
    Self::Bin(vec![value])
  }
  pub fn bool(value: bool) -> Self {
    Self::Bool(vec![value])
  }
  pub fn i1(value: i8) -> Self {
    Self::I1(vec![value])
  }
  pub fn i2(value: i16) -> Self {
    Self::I2(vec![value])
  }
  pub fn i4(value: i32) -> Self {
    Self::I4(vec![value])
  }
  pub fn i8(value: i64) -> Self {
    Self::I8(vec![value])
  }
  pub fn u1(value: u8) -> Self {
    Self::U1(vec![value])
  }
  pub fn u2(value: u16) -> Self {
    Self::U2(vec![value])
  }
  pub fn u4(value: u32) -> Self {
    Self::U4(vec![value])
  }
  pub fn u8(value: u64) -> Self {
    Self::U8(vec![value])
  }
  pub fn f4(value: f32) -> Self {
    Self::F4(vec![value])
  }
  pub fn f8(value: f64) -> Self {
    Self::F8(vec![value])
  }
  pub fn ascii(value: impl Into<String>) -> Self {
    Self::Ascii(value.into())
  }
}
impl From<Item> for Vec<u8> {
  fn from(item: Item) -> Self {
    // Size has already been validated by construction in nearly all call
    // sites; this conversion is used where a caller has chosen not to
    // distinguish encode failure (see `Item::encode`).
    item.encode().unwrap_or_default()
  }
}
impl TryFrom<Vec<u8>> for Item {
  type Error = Error;

  fn try_from(text: Vec<u8>) -> Result<Self, Self::Error> {
    if text.is_empty() {
      return Err(Error::EmptyText);
    }
    let (item, rest) = Item::decode_prefix(&text)?;
    if !rest.is_empty() {
      return Err(Error::InvalidText);
    }
    Ok(item)
  }
}

/// `()` converts to/from an empty [List], for messages whose body is
/// structurally present but semantically empty (e.g. the host-originated
/// leg of S1F2). [List]: Item::List
impl From<()> for Item {
  fn from(_: ()) -> Item {
    Item::List(vec![])
  }
}
impl TryFrom<Item> for () {
  type Error = Error;
  fn try_from(value: Item) -> Result<Self, Self::Error> {
    match value {
      Item::List(v) if v.is_empty() => Ok(()),
      _ => Err(Error::WrongFormat),
    }
  }
}

/// Tuples of 2 or 3 convert to/from a fixed-length [List], one element
/// per field in declaration order — the standard shape of a SECS-II
/// "structure". [List]: Item::List
impl<A: Into<Item>, B: Into<Item>> From<(A, B)> for Item {
  fn from(value: (A, B)) -> Item {
    Item::List(vec![value.0.into(), value.1.into()])
  }
}
impl<A, B> TryFrom<Item> for (A, B)
where
  A: TryFrom<Item, Error = Error>,
  B: TryFrom<Item, Error = Error>,
{
  type Error = Error;
  fn try_from(value: Item) -> Result<Self, Self::Error> {
    match value {
      Item::List(v) if v.len() == 2 => {
        let mut it = v.into_iter();
        Ok((A::try_from(it.next().unwrap())?, B::try_from(it.next().unwrap())?))
      }
      _ => Err(Error::WrongFormat),
    }
  }
}
impl<A: Into<Item>, B: Into<Item>, C: Into<Item>> From<(A, B, C)> for Item {
  fn from(value: (A, B, C)) -> Item {
    Item::List(vec![value.0.into(), value.1.into(), value.2.into()])
  }
}
impl<A, B, C> TryFrom<Item> for (A, B, C)
where
  A: TryFrom<Item, Error = Error>,
  B: TryFrom<Item, Error = Error>,
  C: TryFrom<Item, Error = Error>,
{
  type Error = Error;
  fn try_from(value: Item) -> Result<Self, Self::Error> {
    match value {
      Item::List(v) if v.len() == 3 => {
        let mut it = v.into_iter();
        Ok((A::try_from(it.next().unwrap())?, B::try_from(it.next().unwrap())?, C::try_from(it.next().unwrap())?))
      }
      _ => Err(Error::WrongFormat),
    }
  }
}

/// A [Vec] of items sharing one convertible type converts to/from a
/// variable-length [List]. [List]: Item::List
impl<A: Into<Item>> From<Vec<A>> for Item {
  fn from(value: Vec<A>) -> Item {
    Item::List(value.into_iter().map(Into::into).collect())
  }
}

/// ## VARIANT TAG
///
/// A format-code-only discriminant, used by [Dynamic] to describe an
/// allowed-types set without constructing a value. [Dynamic]: Dynamic
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariantTag {
  List,
  Ascii,
  Jis8,
  Bin,
  Bool,
  I1,
  I2,
  I4,
  I8,
  U1,
  U2,
  U4,
  U8,
  F4,
  F8,
}
impl VariantTag {
  fn format_code(self) -> u8 {
    match self {
      VariantTag::List => format::LIST,
      VariantTag::Ascii => format::ASCII,
      VariantTag::Jis8 => format::JIS8,
      VariantTag::Bin => format::BIN,
      VariantTag::Bool => format::BOOL,
      VariantTag::I1 => format::I1,
      VariantTag::I2 => format::I2,
      VariantTag::I4 => format::I4,
      VariantTag::I8 => format::I8,
      VariantTag::U1 => format::U1,
      VariantTag::U2 => format::U2,
      VariantTag::U4 => format::U4,
      VariantTag::U8 => format::U8,
      VariantTag::F4 => format::F4,
      VariantTag::F8 => format::F8,
    }
  }

  fn matches(self, item: &Item) -> bool {
    self.format_code() == item.format_code()
  }
}

/// ## ALLOWED-TYPES SET
/// **Based on SEMI E5§9, Dynamic item resolution**
///
/// `Any` is an explicit sentinel (rather than an empty `Vec`) for "every
/// variant allowed", per the resolution of the Dynamic-allowed-set open
/// question: see `DESIGN.md`.
#[derive(Clone, Copy, Debug)]
pub enum Allowed {
  Any,
  Only(&'static [VariantTag]),
}
impl Allowed {
  fn permits(self, item: &Item) -> bool {
    match self {
      Allowed::Any => true,
      Allowed::Only(tags) => tags.iter().any(|t| t.matches(item)),
    }
  }
}

/// ## DYNAMIC ITEM
/// **Based on SEMI E5§9.2.2 and §4.1 of the variable-codec design**
///
/// A container that is polymorphic over an [Allowed]-types set. It never
/// encodes itself — it always delegates to its resolved inner [Item]. At
/// decode time it resolves to exactly one variant by reading the incoming
/// format code. [Allowed]: Allowed [Item]: Item
#[derive(Clone, Debug)]
pub struct Dynamic {
  allowed: Allowed,
  inner: Option<Item>,
}
impl Dynamic {
  pub fn new(allowed: Allowed) -> Self {
    Dynamic { allowed, inner: None }
  }

  pub fn any() -> Self {
    Dynamic::new(Allowed::Any)
  }

  pub fn get(&self) -> Option<&Item> {
    self.inner.as_ref()
  }

  /// Assign an already-built [Item], case 1 of the Dynamic `set` algorithm:
  /// require its variant be in the allowed set (or the set be `Any`).
  /// [Item]: Item
  pub fn set_item(&mut self, item: Item) -> Result<(), Error> {
    if !self.allowed.permits(&item) {
      return Err(Error::ValueNotSupported);
    }
    self.inner = Some(item);
    Ok(())
  }

  /// Decode: read the format code from the header; if it names a variant
  /// not in the allowed set, fail with `FormatNotAllowed`; else delegate to
  /// `Item::decode_prefix`.
  pub fn decode_prefix<'d>(&mut self, data: &'d [u8]) -> Result<&'d [u8], Error> {
    let first = *data.first().ok_or(Error::InvalidText)?;
    let code = format::code_of(first);
    if let Allowed::Only(tags) = self.allowed {
      if !tags.iter().any(|t| t.format_code() == code) {
        return Err(Error::FormatNotAllowed);
      }
    }
    let (item, rest) = Item::decode_prefix(data)?;
    self.inner = Some(item);
    Ok(rest)
  }

  pub fn encode(&self) -> Result<Vec<u8>, Error> {
    match &self.inner {
      Some(item) => item.encode(),
      None => Err(Error::EmptyText),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn roundtrip(item: Item) {
    let bytes = item.encode().unwrap();
    let decoded: Item = bytes.clone().try_into().unwrap();
    assert_eq!(item, decoded);
  }

  #[test]
  fn roundtrips_every_variant() {
    roundtrip(Item::List(vec![Item::u1(1), Item::ascii("hi")]));
    roundtrip(Item::ascii("secsgem"));
    roundtrip(Item::Bin(vec![0, 1, 2, 3]));
    roundtrip(Item::Bool(vec![true, false, true]));
    roundtrip(Item::I1(vec![i8::MIN, i8::MAX]));
    roundtrip(Item::I2(vec![i16::MIN, i16::MAX]));
    roundtrip(Item::I4(vec![i32::MIN, i32::MAX]));
    roundtrip(Item::I8(vec![i64::MIN, i64::MAX]));
    roundtrip(Item::U1(vec![0, 255]));
    roundtrip(Item::U2(vec![0, u16::MAX]));
    roundtrip(Item::U4(vec![0, u32::MAX]));
    roundtrip(Item::U8(vec![0, u64::MAX]));
    roundtrip(Item::F4(vec![f32::MIN, f32::MAX, 0.0]));
    roundtrip(Item::F8(vec![f64::MIN, f64::MAX, 0.0]));
  }

  #[test]
  fn header_length_byte_count_boundaries() {
    // 255 -> 1 byte, 256 -> 2 bytes, 65535 -> 2 bytes, 65536 -> 3 bytes,
    // 16777215 (2^24-1) -> 3 bytes.
    for (len, expect_nlen) in [(255usize, 1u8), (256, 2), (65535, 2), (65536, 3), (0xFF_FFFF, 3)] {
      let item = Item::Bin(vec![0u8; len]);
      let bytes = item.encode().unwrap();
      assert_eq!(format::length_bytes_of(bytes[0]), expect_nlen, "len={len}");
    }
  }

  #[test]
  fn payload_over_ceiling_fails() {
    let item = Item::Bin(vec![0u8; 0x100_0000]);
    assert_eq!(item.encode(), Err(Error::EncodingRange));
  }

  #[test]
  fn empty_and_malformed_decode() {
    assert_eq!(Item::try_from(Vec::<u8>::new()), Err(Error::EmptyText));
    // Length-byte-count of 0 is invalid.
    assert_eq!(Item::try_from(vec![format::BIN]), Err(Error::InvalidText));
  }

  #[test]
  fn dynamic_rejects_disallowed_format() {
    let mut dyn_item = Dynamic::new(Allowed::Only(&[VariantTag::U1, VariantTag::U2]));
    assert!(dyn_item.set_item(Item::u1(5)).is_ok());
    assert_eq!(dyn_item.set_item(Item::ascii("x")), Err(Error::ValueNotSupported));
  }

  #[test]
  fn dynamic_any_allows_everything_including_list() {
    let mut dyn_item = Dynamic::any();
    assert!(dyn_item.set_item(Item::List(vec![Item::u1(1)])).is_ok());
  }

  #[test]
  fn dynamic_decode_honors_allowed_set() {
    let wire = Item::ascii("hi").encode().unwrap();
    let mut dyn_item = Dynamic::new(Allowed::Only(&[VariantTag::U1]));
    assert_eq!(dyn_item.decode_prefix(&wire), Err(Error::FormatNotAllowed));
    let mut dyn_item = Dynamic::new(Allowed::Only(&[VariantTag::Ascii]));
    assert!(dyn_item.decode_prefix(&wire).is_ok());
  }
}
