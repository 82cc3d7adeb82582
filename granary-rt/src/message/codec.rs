//! Length-delimited binary framing for method calls.
//!
//! Frames are Protobuf-compatible tag-length-value: each field carries a
//! varint tag (`field_number << 3 | wire_type`) followed by a varint byte
//! length and the raw bytes. A request frame holds the method name (field 1)
//! and the request payload (field 2); a response frame is a single
//! length-delimited message, and void methods produce an empty byte
//! sequence. Unknown length-delimited or varint fields are skipped so
//! generated schemas can evolve without breaking older silos.

// Layer 1: Standard library imports
use std::str;

// Layer 2: Third-party crate imports
use bytes::{Buf, BufMut, Bytes, BytesMut};

// Layer 3: Internal module imports
// (none)

const METHOD_FIELD: u64 = 1;
const PAYLOAD_FIELD: u64 = 2;

const WIRE_VARINT: u64 = 0;
const WIRE_LEN_DELIMITED: u64 = 2;

/// Errors raised while decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Frame ended inside a varint or a declared field body
    #[error("Frame truncated")]
    Truncated,

    /// Varint ran past 10 bytes
    #[error("Varint overflow")]
    VarintOverflow,

    /// Method name was not valid UTF-8
    #[error("Method name is not valid UTF-8")]
    InvalidMethodName,

    /// Field used a wire type this codec cannot skip
    #[error("Unsupported wire type {wire_type} for field {field}")]
    UnsupportedWireType { field: u64, wire_type: u64 },

    /// Request frame carried no method name
    #[error("Request frame is missing the method name")]
    MissingMethod,
}

/// Append a varint-encoded unsigned integer.
pub fn put_varint(buf: &mut BytesMut, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.put_u8(byte);
            return;
        }
        buf.put_u8(byte | 0x80);
    }
}

/// Read a varint-encoded unsigned integer.
pub fn get_varint(buf: &mut impl Buf) -> Result<u64, CodecError> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        if !buf.has_remaining() {
            return Err(CodecError::Truncated);
        }
        if shift >= 70 {
            return Err(CodecError::VarintOverflow);
        }
        let byte = buf.get_u8();
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

fn put_len_delimited(buf: &mut BytesMut, field: u64, bytes: &[u8]) {
    put_varint(buf, field << 3 | WIRE_LEN_DELIMITED);
    put_varint(buf, bytes.len() as u64);
    buf.put_slice(bytes);
}

fn get_len_delimited(buf: &mut Bytes) -> Result<Bytes, CodecError> {
    let len = get_varint(buf)? as usize;
    if buf.remaining() < len {
        return Err(CodecError::Truncated);
    }
    Ok(buf.split_to(len))
}

/// Encode a request frame: method name (field 1) + payload (field 2).
///
/// An empty payload omits field 2 entirely, matching proto3 default-field
/// elision.
///
/// # Example
/// ```rust
/// use granary_rt::message::{decode_request, encode_request};
///
/// let frame = encode_request("Transfer", b"amount");
/// let (method, payload) = decode_request(frame).unwrap();
/// assert_eq!(method, "Transfer");
/// assert_eq!(&payload[..], b"amount");
/// ```
pub fn encode_request(method: &str, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(method.len() + payload.len() + 8);
    put_len_delimited(&mut buf, METHOD_FIELD, method.as_bytes());
    if !payload.is_empty() {
        put_len_delimited(&mut buf, PAYLOAD_FIELD, payload);
    }
    buf.freeze()
}

/// Decode a request frame into `(method, payload)`.
pub fn decode_request(mut frame: Bytes) -> Result<(String, Bytes), CodecError> {
    let mut method = None;
    let mut payload = Bytes::new();
    while frame.has_remaining() {
        let tag = get_varint(&mut frame)?;
        let field = tag >> 3;
        let wire_type = tag & 0x7;
        match (field, wire_type) {
            (METHOD_FIELD, WIRE_LEN_DELIMITED) => {
                let bytes = get_len_delimited(&mut frame)?;
                let name = str::from_utf8(&bytes).map_err(|_| CodecError::InvalidMethodName)?;
                method = Some(name.to_owned());
            }
            (PAYLOAD_FIELD, WIRE_LEN_DELIMITED) => {
                payload = get_len_delimited(&mut frame)?;
            }
            (_, WIRE_LEN_DELIMITED) => {
                get_len_delimited(&mut frame)?;
            }
            (_, WIRE_VARINT) => {
                get_varint(&mut frame)?;
            }
            (field, wire_type) => {
                return Err(CodecError::UnsupportedWireType { field, wire_type });
            }
        }
    }
    let method = method.ok_or(CodecError::MissingMethod)?;
    Ok((method, payload))
}

/// Encode a response frame: one length-delimited message.
///
/// Void results encode to an empty byte sequence, not a zero-length
/// delimited message.
pub fn encode_response(payload: &[u8]) -> Bytes {
    if payload.is_empty() {
        return Bytes::new();
    }
    let mut buf = BytesMut::with_capacity(payload.len() + 4);
    put_varint(&mut buf, payload.len() as u64);
    buf.put_slice(payload);
    buf.freeze()
}

/// Decode a response frame. An empty frame is a void result.
pub fn decode_response(mut frame: Bytes) -> Result<Bytes, CodecError> {
    if !frame.has_remaining() {
        return Ok(Bytes::new());
    }
    let len = get_varint(&mut frame)? as usize;
    if frame.remaining() < len {
        return Err(CodecError::Truncated);
    }
    Ok(frame.split_to(len))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;

    #[test]
    fn test_varint_single_byte() {
        let mut buf = BytesMut::new();
        put_varint(&mut buf, 5);
        assert_eq!(&buf[..], &[5]);
        assert_eq!(get_varint(&mut buf.freeze()).unwrap(), 5);
    }

    #[test]
    fn test_varint_multi_byte() {
        let mut buf = BytesMut::new();
        put_varint(&mut buf, 300);
        assert_eq!(&buf[..], &[0xac, 0x02]);
        assert_eq!(get_varint(&mut buf.freeze()).unwrap(), 300);
    }

    #[test]
    fn test_varint_max() {
        let mut buf = BytesMut::new();
        put_varint(&mut buf, u64::MAX);
        assert_eq!(get_varint(&mut buf.freeze()).unwrap(), u64::MAX);
    }

    #[test]
    fn test_varint_truncated() {
        let mut frame = Bytes::from_static(&[0x80]);
        assert_eq!(get_varint(&mut frame).unwrap_err(), CodecError::Truncated);
    }

    #[test]
    fn test_request_round_trip() {
        let frame = encode_request("TestMethod", b"hello");
        let (method, payload) = decode_request(frame).unwrap();
        assert_eq!(method, "TestMethod");
        assert_eq!(&payload[..], b"hello");
    }

    #[test]
    fn test_request_empty_payload() {
        let frame = encode_request("TestMethod", b"");
        let (method, payload) = decode_request(frame).unwrap();
        assert_eq!(method, "TestMethod");
        assert!(payload.is_empty());
    }

    #[test]
    fn test_request_missing_method() {
        // A frame carrying only field 2
        let mut buf = BytesMut::new();
        put_varint(&mut buf, PAYLOAD_FIELD << 3 | WIRE_LEN_DELIMITED);
        put_varint(&mut buf, 1);
        buf.put_u8(b'x');
        assert_eq!(
            decode_request(buf.freeze()).unwrap_err(),
            CodecError::MissingMethod
        );
    }

    #[test]
    fn test_request_skips_unknown_fields() {
        let mut buf = BytesMut::new();
        // Unknown field 9, length-delimited
        put_varint(&mut buf, 9 << 3 | WIRE_LEN_DELIMITED);
        put_varint(&mut buf, 3);
        buf.put_slice(b"???");
        // Unknown field 10, varint
        put_varint(&mut buf, 10 << 3 | WIRE_VARINT);
        put_varint(&mut buf, 42);
        buf.extend_from_slice(&encode_request("M", b"p"));
        let (method, payload) = decode_request(buf.freeze()).unwrap();
        assert_eq!(method, "M");
        assert_eq!(&payload[..], b"p");
    }

    #[test]
    fn test_request_rejects_bad_utf8_method() {
        let mut buf = BytesMut::new();
        put_varint(&mut buf, METHOD_FIELD << 3 | WIRE_LEN_DELIMITED);
        put_varint(&mut buf, 2);
        buf.put_slice(&[0xff, 0xfe]);
        assert_eq!(
            decode_request(buf.freeze()).unwrap_err(),
            CodecError::InvalidMethodName
        );
    }

    #[test]
    fn test_request_truncated_body() {
        let frame = encode_request("Method", b"payload");
        let cut = frame.slice(0..frame.len() - 2);
        assert_eq!(decode_request(cut).unwrap_err(), CodecError::Truncated);
    }

    #[test]
    fn test_void_response_is_empty() {
        let frame = encode_response(b"");
        assert!(frame.is_empty());
        assert!(decode_response(frame).unwrap().is_empty());
    }

    #[test]
    fn test_response_round_trip() {
        let frame = encode_response(b"result");
        let payload = decode_response(frame).unwrap();
        assert_eq!(&payload[..], b"result");
    }
}
