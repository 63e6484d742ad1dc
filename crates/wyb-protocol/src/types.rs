//! Dictionary and tuple types.
//!
//! A message on the wire is a dictionary: one count byte followed by that
//! many tuples.
//!
//! ```text
//! +-------+------------------+------+----------------+---------------+
//! | count | key (u32 LE)     | type | length (u16 LE)| value[length] | ...
//! +-------+------------------+------+----------------+---------------+
//! ```

use crate::constants::*;
use crate::error::ProtocolError;

/// The value carried by a tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TupleValue {
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Text, NUL-terminated on the wire.
    CString(String),
    /// 8-bit unsigned integer.
    Uint8(u8),
    /// 16-bit unsigned integer.
    Uint16(u16),
    /// 32-bit unsigned integer.
    Uint32(u32),
    /// 8-bit signed integer.
    Int8(i8),
    /// 16-bit signed integer.
    Int16(i16),
    /// 32-bit signed integer.
    Int32(i32),
}

impl TupleValue {
    /// Type byte written on the wire.
    pub fn type_code(&self) -> u8 {
        match self {
            TupleValue::Bytes(_) => TUPLE_BYTE_ARRAY,
            TupleValue::CString(_) => TUPLE_CSTRING,
            TupleValue::Uint8(_) | TupleValue::Uint16(_) | TupleValue::Uint32(_) => TUPLE_UINT,
            TupleValue::Int8(_) | TupleValue::Int16(_) | TupleValue::Int32(_) => TUPLE_INT,
        }
    }

    /// Value bytes as written on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            TupleValue::Bytes(data) => data.clone(),
            TupleValue::CString(text) => {
                let mut buf = Vec::with_capacity(text.len() + 1);
                buf.extend_from_slice(text.as_bytes());
                buf.push(0);
                buf
            }
            TupleValue::Uint8(v) => vec![*v],
            TupleValue::Uint16(v) => v.to_le_bytes().to_vec(),
            TupleValue::Uint32(v) => v.to_le_bytes().to_vec(),
            TupleValue::Int8(v) => v.to_le_bytes().to_vec(),
            TupleValue::Int16(v) => v.to_le_bytes().to_vec(),
            TupleValue::Int32(v) => v.to_le_bytes().to_vec(),
        }
    }

    /// Read the value as an unsigned byte.
    ///
    /// Integers are truncated to their low byte and byte arrays yield their
    /// first byte, which is how the watch reads `uint8` out of any tuple.
    pub fn as_u8(&self) -> Option<u8> {
        match self {
            TupleValue::Uint8(v) => Some(*v),
            TupleValue::Uint16(v) => Some(*v as u8),
            TupleValue::Uint32(v) => Some(*v as u8),
            TupleValue::Int8(v) => Some(*v as u8),
            TupleValue::Int16(v) => Some(*v as u8),
            TupleValue::Int32(v) => Some(*v as u8),
            TupleValue::Bytes(data) => data.first().copied(),
            TupleValue::CString(_) => None,
        }
    }

    /// Read the value as an unsigned 16-bit integer (low bytes of wider values).
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            TupleValue::Uint8(v) => Some(u16::from(*v)),
            TupleValue::Uint16(v) => Some(*v),
            TupleValue::Uint32(v) => Some(*v as u16),
            TupleValue::Int8(v) => Some(*v as u8 as u16),
            TupleValue::Int16(v) => Some(*v as u16),
            TupleValue::Int32(v) => Some(*v as u16),
            TupleValue::Bytes(data) => match data.as_slice() {
                [lo, hi, ..] => Some(u16::from_le_bytes([*lo, *hi])),
                [lo] => Some(u16::from(*lo)),
                [] => None,
            },
            TupleValue::CString(_) => None,
        }
    }

    /// Borrow the text of a string tuple.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TupleValue::CString(text) => Some(text),
            _ => None,
        }
    }

    /// Borrow the bytes of a byte array tuple.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            TupleValue::Bytes(data) => Some(data),
            _ => None,
        }
    }
}

/// A single `(key, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    /// Dictionary key.
    pub key: u32,
    /// Value.
    pub value: TupleValue,
}

impl Tuple {
    /// Create a tuple.
    pub fn new(key: u32, value: TupleValue) -> Self {
        Tuple { key, value }
    }

    /// Bytes this tuple takes on the wire.
    pub fn encoded_len(&self) -> usize {
        TUPLE_HEADER_SIZE + self.value.to_bytes().len()
    }
}

/// An ordered collection of tuples making up one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    tuples: Vec<Tuple>,
}

impl Dictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Dictionary { tuples: Vec::new() }
    }

    /// Add a tuple, replacing any previous tuple with the same key.
    pub fn insert(&mut self, key: u32, value: TupleValue) {
        if let Some(existing) = self.tuples.iter_mut().find(|t| t.key == key) {
            existing.value = value;
        } else {
            self.tuples.push(Tuple::new(key, value));
        }
    }

    /// Builder form of [`Dictionary::insert`].
    pub fn with(mut self, key: u32, value: TupleValue) -> Self {
        self.insert(key, value);
        self
    }

    /// Find the tuple stored under `key`.
    pub fn find(&self, key: u32) -> Option<&TupleValue> {
        self.tuples.iter().find(|t| t.key == key).map(|t| &t.value)
    }

    /// Check whether a key is present.
    pub fn contains(&self, key: u32) -> bool {
        self.find(key).is_some()
    }

    /// Keys in wire order.
    pub fn keys(&self) -> Vec<u32> {
        self.tuples.iter().map(|t| t.key).collect()
    }

    /// Number of tuples.
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    /// Check whether the dictionary has no tuples.
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Iterate over the tuples.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter()
    }

    /// Bytes this dictionary takes on the wire.
    pub fn encoded_len(&self) -> usize {
        DICT_HEADER_SIZE + self.tuples.iter().map(Tuple::encoded_len).sum::<usize>()
    }

    /// Encode the dictionary.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.push(self.tuples.len() as u8);
        for tuple in &self.tuples {
            let value = tuple.value.to_bytes();
            buf.extend_from_slice(&tuple.key.to_le_bytes());
            buf.push(tuple.value.type_code());
            buf.extend_from_slice(&(value.len() as u16).to_le_bytes());
            buf.extend_from_slice(&value);
        }
        buf
    }

    /// Encode the dictionary, failing if it exceeds `max` bytes.
    pub fn encode_limited(&self, max: usize) -> Result<Vec<u8>, ProtocolError> {
        let actual = self.encoded_len();
        if actual > max {
            return Err(ProtocolError::MessageTooLarge { max, actual });
        }
        Ok(self.encode())
    }

    /// Decode a dictionary.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.is_empty() {
            return Err(ProtocolError::FrameTooShort {
                expected: DICT_HEADER_SIZE,
                actual: 0,
            });
        }

        let count = data[0] as usize;
        let mut tuples = Vec::with_capacity(count);
        let mut i = DICT_HEADER_SIZE;

        for _ in 0..count {
            if data.len() < i + TUPLE_HEADER_SIZE {
                return Err(ProtocolError::FrameTooShort {
                    expected: i + TUPLE_HEADER_SIZE,
                    actual: data.len(),
                });
            }

            let key = u32::from_le_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]);
            let type_code = data[i + 4];
            let len = u16::from_le_bytes([data[i + 5], data[i + 6]]) as usize;
            i += TUPLE_HEADER_SIZE;

            if data.len() < i + len {
                return Err(ProtocolError::FrameTooShort {
                    expected: i + len,
                    actual: data.len(),
                });
            }

            let value = decode_value(type_code, &data[i..i + len])?;
            i += len;
            tuples.push(Tuple::new(key, value));
        }

        if i != data.len() {
            log::debug!("dictionary has {} trailing bytes", data.len() - i);
        }

        Ok(Dictionary { tuples })
    }
}

fn decode_value(type_code: u8, raw: &[u8]) -> Result<TupleValue, ProtocolError> {
    match type_code {
        TUPLE_BYTE_ARRAY => Ok(TupleValue::Bytes(raw.to_vec())),

        TUPLE_CSTRING => {
            let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
            let text = std::str::from_utf8(&raw[..end]).map_err(|_| ProtocolError::InvalidUtf8)?;
            Ok(TupleValue::CString(text.to_string()))
        }

        TUPLE_UINT => match raw {
            [a] => Ok(TupleValue::Uint8(*a)),
            [a, b] => Ok(TupleValue::Uint16(u16::from_le_bytes([*a, *b]))),
            [a, b, c, d] => Ok(TupleValue::Uint32(u32::from_le_bytes([*a, *b, *c, *d]))),
            _ => Err(ProtocolError::InvalidData(format!(
                "unsigned integer of {} bytes",
                raw.len()
            ))),
        },

        TUPLE_INT => match raw {
            [a] => Ok(TupleValue::Int8(*a as i8)),
            [a, b] => Ok(TupleValue::Int16(i16::from_le_bytes([*a, *b]))),
            [a, b, c, d] => Ok(TupleValue::Int32(i32::from_le_bytes([*a, *b, *c, *d]))),
            _ => Err(ProtocolError::InvalidData(format!(
                "signed integer of {} bytes",
                raw.len()
            ))),
        },

        other => Err(ProtocolError::UnknownTupleType(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_single_integer_tuple() {
        let dict = Dictionary::new().with(KEY_SEND_NAME, TupleValue::Uint16(3));
        let encoded = dict.encode();

        assert_eq!(encoded, vec![1, 0x13, 0, 0, 0, TUPLE_UINT, 2, 0, 3, 0]);
        assert_eq!(encoded.len(), dict.encoded_len());
    }

    #[test]
    fn test_decode_name_and_format() {
        let dict = Dictionary::new()
            .with(KEY_NAME, TupleValue::CString("Library".to_string()))
            .with(KEY_FORMAT, TupleValue::CString("CODE_128".to_string()));

        let decoded = Dictionary::decode(&dict.encode()).expect("should decode");
        assert_eq!(decoded.find(KEY_NAME).and_then(|v| v.as_str()), Some("Library"));
        assert_eq!(decoded.find(KEY_FORMAT).and_then(|v| v.as_str()), Some("CODE_128"));
        assert_eq!(decoded.keys(), vec![KEY_NAME, KEY_FORMAT]);
    }

    #[test]
    fn test_decode_truncated_tuple() {
        let encoded = Dictionary::new()
            .with(KEY_ERROR, TupleValue::CString("disk full".to_string()))
            .encode();

        let result = Dictionary::decode(&encoded[..encoded.len() - 3]);
        assert!(matches!(result, Err(ProtocolError::FrameTooShort { .. })));
    }

    #[test]
    fn test_decode_unknown_type() {
        let raw = [1, 0x10, 0, 0, 0, 9, 1, 0, 5];
        assert_eq!(Dictionary::decode(&raw), Err(ProtocolError::UnknownTupleType(9)));
    }

    #[test]
    fn test_integer_reads_take_low_bytes() {
        assert_eq!(TupleValue::Uint32(0x0102_0304).as_u8(), Some(0x04));
        assert_eq!(TupleValue::Uint32(0x0102_0304).as_u16(), Some(0x0304));
        assert_eq!(TupleValue::Bytes(vec![7, 1]).as_u16(), Some(0x0107));
        assert_eq!(TupleValue::CString("x".into()).as_u8(), None);
    }

    #[test]
    fn test_insert_replaces_existing_key() {
        let mut dict = Dictionary::new();
        dict.insert(KEY_COMMAND, TupleValue::Uint8(1));
        dict.insert(KEY_COMMAND, TupleValue::Uint8(CMD_REREAD_LIST));

        assert_eq!(dict.len(), 1);
        assert_eq!(dict.find(KEY_COMMAND).and_then(|v| v.as_u8()), Some(CMD_REREAD_LIST));
    }

    #[test]
    fn test_encode_limited() {
        let dict = Dictionary::new().with(KEY_IMAGE_ROW, TupleValue::Bytes(vec![0xAA; 200]));
        let result = dict.encode_limited(MAX_INBOUND_SIZE);
        assert_eq!(
            result,
            Err(ProtocolError::MessageTooLarge {
                max: MAX_INBOUND_SIZE,
                actual: 1 + 7 + 200,
            })
        );
        assert!(dict.encode_limited(MAX_OUTBOUND_SIZE).is_ok());
    }
}
