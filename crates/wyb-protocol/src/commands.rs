//! Requests the watch sends to the companion phone.

use crate::constants::*;
use crate::error::ProtocolError;
use crate::types::*;

/// Requests that can be sent to the companion phone.
///
/// Every request is a single integer tuple: the key is the command and the
/// value is its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Ask for the number of barcodes. First request of every catalog read.
    ListLength {
        /// Watch app version number.
        version: u16,
    },

    /// Ask for the name and format at an index.
    Name {
        /// Catalog index.
        index: u16,
    },

    /// Ask for a barcode image.
    Image {
        /// Catalog index, or [`IMAGE_CURRENTLY_PENDING`].
        index: u16,
    },

    /// Ask for the row after the one just processed.
    NextChunk {
        /// Row index just processed (or the announced first row).
        row: u16,
    },
}

impl Request {
    /// Build a request from its command key and payload.
    pub fn from_parts(command: u32, payload: u16) -> Result<Self, ProtocolError> {
        match command {
            KEY_LIST_LENGTH => Ok(Request::ListLength { version: payload }),
            KEY_SEND_NAME => Ok(Request::Name { index: payload }),
            KEY_SEND_IMAGE => Ok(Request::Image { index: payload }),
            KEY_NEXT_CHUNK => Ok(Request::NextChunk { row: payload }),
            other => Err(ProtocolError::UnknownRequest(other)),
        }
    }

    /// Command key of this request.
    pub fn command(&self) -> u32 {
        match self {
            Request::ListLength { .. } => KEY_LIST_LENGTH,
            Request::Name { .. } => KEY_SEND_NAME,
            Request::Image { .. } => KEY_SEND_IMAGE,
            Request::NextChunk { .. } => KEY_NEXT_CHUNK,
        }
    }

    /// Integer payload of this request.
    pub fn payload(&self) -> u16 {
        match self {
            Request::ListLength { version } => *version,
            Request::Name { index } => *index,
            Request::Image { index } => *index,
            Request::NextChunk { row } => *row,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Request::ListLength { .. } => "ListLength",
            Request::Name { .. } => "Name",
            Request::Image { .. } => "Image",
            Request::NextChunk { .. } => "NextChunk",
        }
    }

    /// Build the request dictionary.
    pub fn to_dictionary(&self) -> Dictionary {
        Dictionary::new().with(self.command(), TupleValue::Uint16(self.payload()))
    }

    /// Encode the request for transmission.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        self.to_dictionary().encode_limited(MAX_OUTBOUND_SIZE)
    }

    /// Recover a request from a dictionary (phone side).
    pub fn from_dictionary(dict: &Dictionary) -> Result<Self, ProtocolError> {
        let tuple = dict
            .iter()
            .next()
            .ok_or_else(|| ProtocolError::InvalidData("empty request".to_string()))?;
        let payload = tuple.value.as_u16().ok_or_else(|| {
            ProtocolError::InvalidData(format!("request 0x{:02X} has no integer payload", tuple.key))
        })?;
        Request::from_parts(tuple.key, payload)
    }

    /// Decode a request (phone side).
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() > MAX_OUTBOUND_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                max: MAX_OUTBOUND_SIZE,
                actual: data.len(),
            });
        }
        Request::from_dictionary(&Dictionary::decode(data)?)
    }
}
