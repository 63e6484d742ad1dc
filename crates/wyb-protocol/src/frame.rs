//! Frame encoding/decoding utilities.
//!
//! Dictionaries have no framing of their own, so when they travel over a
//! byte stream (the TCP bridge between the watch side and the phone side)
//! each one is wrapped in a frame: a direction marker followed by a 2-byte
//! length (little-endian) and the dictionary bytes.
//!
//! ```text
//! +--------+--------+--------+-------------------+
//! | marker | len_lo | len_hi | data[0..len]      |
//! +--------+--------+--------+-------------------+
//! ```
//!
//! Frames sent by the phone start with `'>'`, frames sent by the watch with
//! `'<'`.

use bytes::{Buf, BufMut, BytesMut};

use crate::commands::Request;
use crate::error::ProtocolError;
use crate::responses::{decode_inbound, DeviceMessage};
use crate::types::Dictionary;

/// Maximum frame size supported.
pub const MAX_FRAMED_SIZE: usize = 1024;

/// Marker of frames sent by the phone.
pub const PHONE_MARKER: u8 = b'>';
/// Marker of frames sent by the watch.
pub const WATCH_MARKER: u8 = b'<';

/// A codec for reading and writing framed messages.
#[derive(Debug)]
pub struct FrameCodec {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
    /// Marker expected on incoming frames.
    inbound: u8,
    /// Marker written on outgoing frames.
    outbound: u8,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::for_watch()
    }
}

impl FrameCodec {
    /// Codec for the watch side: reads phone frames, writes watch frames.
    pub fn for_watch() -> Self {
        FrameCodec {
            buffer: BytesMut::with_capacity(MAX_FRAMED_SIZE),
            inbound: PHONE_MARKER,
            outbound: WATCH_MARKER,
        }
    }

    /// Codec for the phone side: reads watch frames, writes phone frames.
    pub fn for_phone() -> Self {
        FrameCodec {
            buffer: BytesMut::with_capacity(MAX_FRAMED_SIZE),
            inbound: WATCH_MARKER,
            outbound: PHONE_MARKER,
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode a complete frame from the buffer.
    ///
    /// Returns `Ok(Some(frame_data))` if a complete frame is available,
    /// `Ok(None)` if more data is needed, or `Err` if the announced length
    /// exceeds [`MAX_FRAMED_SIZE`] (the oversized frame is skipped).
    pub fn decode(&mut self) -> Result<Option<Vec<u8>>, ProtocolError> {
        // Scan for the header byte, discarding any preceding garbage
        while !self.buffer.is_empty() && self.buffer[0] != self.inbound {
            self.buffer.advance(1);
        }

        // Need at least 3 bytes: header + 2 bytes length
        if self.buffer.len() < 3 {
            return Ok(None);
        }

        let len = u16::from_le_bytes([self.buffer[1], self.buffer[2]]) as usize;
        if len > MAX_FRAMED_SIZE {
            // Drop the header so the scan resynchronises on the next marker
            self.buffer.advance(1);
            return Err(ProtocolError::FrameTooLong {
                max: MAX_FRAMED_SIZE,
                actual: len,
            });
        }

        if self.buffer.len() < 3 + len {
            return Ok(None);
        }

        self.buffer.advance(3);
        let frame = self.buffer.split_to(len).to_vec();

        Ok(Some(frame))
    }

    /// Encode a frame with this side's marker and a length prefix.
    pub fn encode(&self, data: &[u8]) -> Vec<u8> {
        let len = data.len() as u16;
        let mut buf = Vec::with_capacity(3 + data.len());
        buf.push(self.outbound);
        buf.put_u16_le(len);
        buf.extend_from_slice(data);
        buf
    }
}

/// Watch-side framing session: frames requests and unframes phone messages.
///
/// This can be used with any byte stream (TCP socket, serial bridge, etc.).
#[derive(Debug, Default)]
pub struct ProtocolSession {
    codec: FrameCodec,
}

impl ProtocolSession {
    /// Create a new protocol session.
    pub fn new() -> Self {
        ProtocolSession {
            codec: FrameCodec::for_watch(),
        }
    }

    /// Wrap an already encoded request dictionary in a frame.
    pub fn frame(&self, dictionary: &[u8]) -> Vec<u8> {
        self.codec.encode(dictionary)
    }

    /// Encode and frame a request.
    pub fn encode_request(&self, request: &Request) -> Result<Vec<u8>, ProtocolError> {
        Ok(self.codec.encode(&request.encode()?))
    }

    /// Feed received data into the decoder.
    pub fn feed(&mut self, data: &[u8]) {
        self.codec.push(data);
    }

    /// Try to decode the next message.
    ///
    /// Returns `Ok(Some(message))` if a complete message was decoded,
    /// `Ok(None)` if more data is needed, or `Err` if decoding failed.
    pub fn try_decode(&mut self) -> Result<Option<DeviceMessage>, ProtocolError> {
        match self.try_decode_dictionary()? {
            Some(dict) => Ok(Some(DeviceMessage::from_dictionary(&dict)?)),
            None => Ok(None),
        }
    }

    /// Try to decode the next dictionary without classifying it, for
    /// receivers that know which keys they are waiting for.
    pub fn try_decode_dictionary(&mut self) -> Result<Option<Dictionary>, ProtocolError> {
        match self.codec.decode()? {
            Some(frame) => Ok(Some(decode_inbound(&frame)?)),
            None => Ok(None),
        }
    }
}
