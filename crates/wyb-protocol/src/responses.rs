//! Messages from the companion phone.

use crate::constants::*;
use crate::error::*;
use crate::types::*;

/// One row chunk of an image transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRow {
    /// Row index.
    pub row: u16,
    /// Row stride reported by the phone.
    pub bytes_per_row: u8,
    /// Pixel bytes for the row.
    pub data: Vec<u8>,
}

impl ImageRow {
    /// Encode as the `KEY_IMAGE_ROW` byte array: row low, row high, stride, bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ROW_HEADER_SIZE + self.data.len());
        buf.extend_from_slice(&self.row.to_le_bytes());
        buf.push(self.bytes_per_row);
        buf.extend_from_slice(&self.data);
        buf
    }

    /// Decode the `KEY_IMAGE_ROW` byte array.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, ProtocolError> {
        if raw.len() < ROW_HEADER_SIZE {
            return Err(ProtocolError::FrameTooShort {
                expected: ROW_HEADER_SIZE,
                actual: raw.len(),
            });
        }
        Ok(ImageRow {
            row: u16::from_le_bytes([raw[0], raw[1]]),
            bytes_per_row: raw[2],
            data: raw[ROW_HEADER_SIZE..].to_vec(),
        })
    }
}

/// Keys that classify a dictionary when the receiver has no preference,
/// in priority order. `KEY_ERROR` always comes first.
pub const CLASSIFY_ORDER: [u32; 8] = [
    KEY_ERROR,
    KEY_COMMAND,
    KEY_DISPLAY_BARCODE,
    KEY_LIST_LENGTH,
    KEY_NAME,
    KEY_IMAGE_SIZE,
    KEY_IMAGE_ROW,
    KEY_IMAGE_DONE,
];

/// Decode a dictionary received by the watch, enforcing the inbound size
/// limit.
pub fn decode_inbound(data: &[u8]) -> Result<Dictionary, ProtocolError> {
    if data.len() > MAX_INBOUND_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            max: MAX_INBOUND_SIZE,
            actual: data.len(),
        });
    }
    Dictionary::decode(data)
}

/// Messages received from the companion phone.
///
/// A dictionary is classified by the first of its keys found in
/// [`CLASSIFY_ORDER`], unless the receiver names the keys it is waiting for
/// (see [`DeviceMessage::classify`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceMessage {
    /// Error text. Aborts whatever conversation is in progress.
    Error {
        /// Text supplied by the phone.
        message: String,
    },

    /// Out-of-band command code (see `CMD_*`).
    Command(u8),

    /// Unsolicited request to display a barcode.
    DisplayBarcode {
        /// Catalog index.
        index: u8,
    },

    /// Catalog length: 0 (empty), 255 (display now) or a count.
    ListLength(u8),

    /// A name and its format.
    Name {
        /// Barcode name.
        name: String,
        /// Barcode format; empty if the phone omitted it.
        format: String,
    },

    /// Image transfer announcement.
    ImageSize(u16),

    /// One image row.
    ImageRow(ImageRow),

    /// End of the image transfer.
    ImageDone,

    /// A dictionary carrying none of the keys above.
    Unrecognized {
        /// Keys that were present.
        keys: Vec<u32>,
    },
}

impl DeviceMessage {
    /// Classify a decoded dictionary by [`CLASSIFY_ORDER`].
    pub fn from_dictionary(dict: &Dictionary) -> Result<Self, ProtocolError> {
        Self::classify(dict, &[])
    }

    /// Classify a decoded dictionary, preferring the `expected` keys.
    ///
    /// An error tuple wins over everything. Then the first of `expected`
    /// present in the dictionary decides, and only without one of those does
    /// [`CLASSIFY_ORDER`] apply.
    pub fn classify(dict: &Dictionary, expected: &[u32]) -> Result<Self, ProtocolError> {
        let preferred = std::iter::once(&KEY_ERROR).chain(expected).chain(CLASSIFY_ORDER.iter());
        for &key in preferred {
            if let Some(message) = Self::from_key(dict, key) {
                return message;
            }
        }
        Ok(DeviceMessage::Unrecognized { keys: dict.keys() })
    }

    /// Read the message keyed by `key`, if the dictionary has it.
    fn from_key(dict: &Dictionary, key: u32) -> Option<Result<Self, ProtocolError>> {
        let value = dict.find(key)?;
        let invalid = |what: &str| ProtocolError::InvalidData(format!("{} tuple has the wrong type", what));

        let message = match key {
            KEY_ERROR => value
                .as_str()
                .map(|message| DeviceMessage::Error {
                    message: message.to_string(),
                })
                .ok_or_else(|| invalid("error")),
            KEY_COMMAND => value.as_u8().map(DeviceMessage::Command).ok_or_else(|| invalid("command")),
            KEY_DISPLAY_BARCODE => value
                .as_u8()
                .map(|index| DeviceMessage::DisplayBarcode { index })
                .ok_or_else(|| invalid("display")),
            KEY_LIST_LENGTH => value
                .as_u8()
                .map(DeviceMessage::ListLength)
                .ok_or_else(|| invalid("list length")),
            KEY_NAME => match value.as_str() {
                Some(name) => {
                    let format = match dict.find(KEY_FORMAT) {
                        Some(format) => format.as_str().unwrap_or_default().to_string(),
                        None => {
                            log::debug!("name '{}' arrived without a format", name);
                            String::new()
                        }
                    };
                    Ok(DeviceMessage::Name {
                        name: name.to_string(),
                        format,
                    })
                }
                None => Err(invalid("name")),
            },
            KEY_IMAGE_SIZE => value
                .as_u16()
                .map(DeviceMessage::ImageSize)
                .ok_or_else(|| invalid("image size")),
            KEY_IMAGE_ROW => match value.as_bytes() {
                Some(raw) => ImageRow::from_bytes(raw).map(DeviceMessage::ImageRow),
                None => Err(invalid("image row")),
            },
            KEY_IMAGE_DONE => Ok(DeviceMessage::ImageDone),
            _ => return None,
        };
        Some(message)
    }

    /// Decode a message received by the watch.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        DeviceMessage::from_dictionary(&decode_inbound(data)?)
    }

    /// Build the dictionary the phone sends for this message.
    pub fn to_dictionary(&self) -> Dictionary {
        match self {
            DeviceMessage::Error { message } => {
                Dictionary::new().with(KEY_ERROR, TupleValue::CString(message.clone()))
            }
            DeviceMessage::Command(code) => Dictionary::new().with(KEY_COMMAND, TupleValue::Uint8(*code)),
            DeviceMessage::DisplayBarcode { index } => {
                Dictionary::new().with(KEY_DISPLAY_BARCODE, TupleValue::Uint8(*index))
            }
            DeviceMessage::ListLength(len) => Dictionary::new().with(KEY_LIST_LENGTH, TupleValue::Uint8(*len)),
            DeviceMessage::Name { name, format } => Dictionary::new()
                .with(KEY_NAME, TupleValue::CString(name.clone()))
                .with(KEY_FORMAT, TupleValue::CString(format.clone())),
            DeviceMessage::ImageSize(first_row) => {
                Dictionary::new().with(KEY_IMAGE_SIZE, TupleValue::Uint16(*first_row))
            }
            DeviceMessage::ImageRow(row) => Dictionary::new().with(KEY_IMAGE_ROW, TupleValue::Bytes(row.to_bytes())),
            DeviceMessage::ImageDone => Dictionary::new().with(KEY_IMAGE_DONE, TupleValue::Uint8(1)),
            DeviceMessage::Unrecognized { keys } => keys
                .iter()
                .fold(Dictionary::new(), |dict, key| dict.with(*key, TupleValue::Uint8(0))),
        }
    }

    /// Encode for transmission to the watch, enforcing the inbound size limit.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        self.to_dictionary().encode_limited(MAX_INBOUND_SIZE)
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            DeviceMessage::Error { .. } => "Error",
            DeviceMessage::Command(_) => "Command",
            DeviceMessage::DisplayBarcode { .. } => "DisplayBarcode",
            DeviceMessage::ListLength(_) => "ListLength",
            DeviceMessage::Name { .. } => "Name",
            DeviceMessage::ImageSize(_) => "ImageSize",
            DeviceMessage::ImageRow(_) => "ImageRow",
            DeviceMessage::ImageDone => "ImageDone",
            DeviceMessage::Unrecognized { .. } => "Unrecognized",
        }
    }
}
