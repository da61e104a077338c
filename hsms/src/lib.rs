//! # HIGH-SPEED SECS MESSAGE SERVICES (HSMS)
//! **Based on:**
//! - **[SEMI E37]-1109 (HSMS Generic Services)**
//!
//! [HSMS] is a Session Protocol for transporting [SECS-II] ([SEMI E5])
//! messages over TCP/IP, as an alternative to SECS-I. This crate implements
//! the [Generic Services] subset: TCP connection management, the
//! length-prefixed wire framing, and the Select/Deselect/Linktest/Reject/
//! Separate control procedures layered over a data-message exchange.
//!
//! Two layers are exposed, mirroring the standard's own split:
//! - [primitive] — TCP connect/disconnect/transmit/receive of raw,
//!   length-prefixed frames, agnostic of what the payload means.
//! - [generic] — the Select/Deselect/Linktest/Reject/Separate control
//!   procedures, correlated request/reply matching, and data-message
//!   exchange against a [secs2::Message].
//!
//! [SEMI E5]:  https://store-us.semi.org/products/e00500-semi-e5-specification-for-semi-equipment-communications-standard-2-message-content-secs-ii
//! [SEMI E37]: https://store-us.semi.org/products/e03700-semi-e37-high-speed-secs-message-services-hsms-generic-services
//! [HSMS]:     crate
//! [SECS-II]:  secs2

pub mod generic;
pub mod primitive;
