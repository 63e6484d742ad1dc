//! Protocol constants
//!
//! Dictionary keys, command codes, sentinels and size limits used by the
//! watch app and the companion phone.

// ============================================================================
// Dictionary Keys
// ============================================================================

/// Out-of-band command from the phone (payload: command code).
pub const KEY_COMMAND: u32 = 0x00;
/// List length request (watch → phone) and reply (phone → watch).
pub const KEY_LIST_LENGTH: u32 = 0x10;
/// Bulk name request. Reserved, never sent by the watch.
pub const KEY_SEND_NAMES: u32 = 0x11;
/// Barcode name reply (C string).
pub const KEY_NAME: u32 = 0x12;
/// Request the name and format at an index.
pub const KEY_SEND_NAME: u32 = 0x13;
/// Request the image at an index.
pub const KEY_SEND_IMAGE: u32 = 0x14;
/// Image transfer announcement (payload: first row).
pub const KEY_IMAGE_SIZE: u32 = 0x15;
/// One image row: row low, row high, bytes per row, then the row bytes.
pub const KEY_IMAGE_ROW: u32 = 0x16;
/// End of an image transfer.
pub const KEY_IMAGE_DONE: u32 = 0x17;
/// Ask for the row after the one just processed.
pub const KEY_NEXT_CHUNK: u32 = 0x18;
/// Barcode format reply (C string), sent together with the name.
pub const KEY_FORMAT: u32 = 0x19;
/// Unsolicited push: display the barcode at an index now.
pub const KEY_DISPLAY_BARCODE: u32 = 0x22;
/// Error text from the phone. Aborts the current conversation.
pub const KEY_ERROR: u32 = 0xFF;

// ============================================================================
// Command Codes (payload of KEY_COMMAND)
// ============================================================================

/// Reread the barcode list.
pub const CMD_REREAD_LIST: u8 = 0x21;

// ============================================================================
// Sentinels
// ============================================================================

/// List length reply meaning the phone holds no barcodes.
pub const LIST_LENGTH_EMPTY: u8 = 0;
/// List length reply meaning "display the pending barcode now" (phone → watch).
pub const LIST_LENGTH_DISPLAY_NOW: u8 = 255;
/// Image request index meaning "the barcode the phone has pending" (watch → phone).
pub const IMAGE_CURRENTLY_PENDING: u16 = 255;

/// Version number the watch reports in its list length request.
pub const WATCHAPP_VERSION: u16 = 30;

// ============================================================================
// Size Limits
// ============================================================================

/// Largest dictionary the watch accepts.
pub const MAX_INBOUND_SIZE: usize = 124;
/// Largest dictionary the watch sends.
pub const MAX_OUTBOUND_SIZE: usize = 256;

/// Number of name/format pairs the watch keeps at once.
pub const NAME_CACHE_CAPACITY: usize = 10;

/// Bytes in one row of the 1-bit image.
pub const BYTES_PER_ROW: usize = 16;
/// Rows in the image (screen height).
pub const IMAGE_ROWS: usize = 168;
/// Image width in pixels.
pub const IMAGE_WIDTH: usize = BYTES_PER_ROW * 8;
/// Size of the image buffer.
pub const IMAGE_BUFFER_SIZE: usize = BYTES_PER_ROW * IMAGE_ROWS;
/// Header in front of the row bytes of a `KEY_IMAGE_ROW` tuple.
pub const ROW_HEADER_SIZE: usize = 3;

// ============================================================================
// Tuple Types
// ============================================================================

/// Raw byte array.
pub const TUPLE_BYTE_ARRAY: u8 = 0;
/// NUL-terminated string.
pub const TUPLE_CSTRING: u8 = 1;
/// Unsigned little-endian integer (1, 2 or 4 bytes).
pub const TUPLE_UINT: u8 = 2;
/// Signed little-endian integer (1, 2 or 4 bytes).
pub const TUPLE_INT: u8 = 3;

/// Dictionary header: tuple count.
pub const DICT_HEADER_SIZE: usize = 1;
/// Tuple header: key (4) + type (1) + length (2).
pub const TUPLE_HEADER_SIZE: usize = 7;
