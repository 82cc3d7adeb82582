//! Invocation and stream message records plus the wire codec.
//!
//! Messages are immutable after enqueue: the mailbox hands out owned
//! [`Envelope`] values and nothing mutates a message in place.

pub mod codec;
pub mod invocation;

pub use codec::{decode_request, decode_response, encode_request, encode_response, CodecError};
pub use invocation::{Envelope, InvocationMessage, ReplySlot, StreamMessage};
