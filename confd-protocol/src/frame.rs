//! Binary message framing.
//!
//! Every packet begins with a fixed 8-byte packed header, little-endian,
//! followed immediately by the payload:
//!
//! ```text
//! +---------+--------+----------+-----+-------+----------+
//! | version | length | endpoint | tag | flags | reserved |
//! | 2 bytes |2 bytes | 1 byte   |1 B  | 1 B   | 1 byte   |
//! +---------+--------+----------+-----+-------+----------+
//! | payload (length - 8 bytes)                           |
//! +------------------------------------------------------+
//! ```
//!
//! `length` counts the header itself. The same header is used for requests
//! and replies; a reply echoes the request's endpoint and tag and sets the
//! reply flag.

use crate::error::ProtocolError;
use crate::{MAX_PAYLOAD_SIZE, PROTOCOL_VERSION};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of the fixed header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Message endpoints. The set is closed; the delete operation is
/// intentionally unallocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Endpoint {
    /// Read a property from the configuration store.
    Query = 0x01,
    /// Insert or update a property.
    Update = 0x02,
}

impl TryFrom<u8> for Endpoint {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, u8> {
        match raw {
            0x01 => Ok(Endpoint::Query),
            0x02 => Ok(Endpoint::Update),
            other => Err(other),
        }
    }
}

/// Header flags bitfield.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFlags(u8);

impl FrameFlags {
    /// This message is a reply to a request.
    pub const REPLY: u8 = 1 << 0;
    /// Reserved for unsolicited broadcasts.
    pub const BROADCAST: u8 = 1 << 1;

    pub fn new() -> Self {
        Self(0)
    }

    pub fn with_reply(mut self) -> Self {
        self.0 |= Self::REPLY;
        self
    }

    pub fn is_reply(&self) -> bool {
        self.0 & Self::REPLY != 0
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 & Self::BROADCAST != 0
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Builds flags from a raw byte; undefined bits are ignored.
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & (Self::REPLY | Self::BROADCAST))
    }
}

/// A parsed message frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw endpoint byte. Kept raw so unknown endpoints can still be echoed
    /// in a status reply.
    pub endpoint: u8,
    /// Correlation tag, opaque to the server and echoed unchanged.
    pub tag: u8,
    /// Header flags.
    pub flags: FrameFlags,
    /// Message payload.
    pub payload: Bytes,
}

impl Frame {
    /// Creates a request frame.
    pub fn request(endpoint: Endpoint, tag: u8, payload: Bytes) -> Self {
        Self {
            endpoint: endpoint as u8,
            tag,
            flags: FrameFlags::new(),
            payload,
        }
    }

    /// Creates the reply frame for this request: same endpoint and tag, with
    /// the reply flag set.
    pub fn reply_to(&self, payload: Bytes) -> Self {
        Self {
            endpoint: self.endpoint,
            tag: self.tag,
            flags: FrameFlags::new().with_reply(),
            payload,
        }
    }

    /// Encodes the frame into bytes.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::Oversized(self.payload.len()));
        }

        let total = HEADER_SIZE + self.payload.len();
        let mut buf = BytesMut::with_capacity(total);
        buf.put_u16_le(PROTOCOL_VERSION);
        buf.put_u16_le(total as u16);
        buf.put_u8(self.endpoint);
        buf.put_u8(self.tag);
        buf.put_u8(self.flags.bits());
        buf.put_u8(0); // reserved
        buf.put_slice(&self.payload);
        Ok(buf)
    }

    /// Decodes a frame from the front of `buf`.
    ///
    /// Returns `Ok(Some(frame))` when a complete frame was consumed,
    /// `Ok(None)` when more data is needed, or `Err` on a framing violation
    /// (which requires closing the connection).
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        if buf.len() < HEADER_SIZE {
            return Ok(None);
        }

        // Peek at the header without consuming.
        let version = u16::from_le_bytes([buf[0], buf[1]]);
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }

        let length = u16::from_le_bytes([buf[2], buf[3]]);
        if (length as usize) < HEADER_SIZE {
            return Err(ProtocolError::InvalidLength(length));
        }

        if buf.len() < length as usize {
            return Ok(None);
        }

        let endpoint = buf[4];
        let tag = buf[5];
        let flags = FrameFlags::from_bits(buf[6]);
        // buf[7] is reserved; the receiver ignores it.

        buf.advance(HEADER_SIZE);
        let payload = buf.split_to(length as usize - HEADER_SIZE).freeze();

        Ok(Some(Self {
            endpoint,
            tag,
            flags,
            payload,
        }))
    }
}
