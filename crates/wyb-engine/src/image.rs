//! Row-chunked image reassembly.

use std::ops::Range;

use thiserror::Error;
use wyb_protocol::{BYTES_PER_ROW, IMAGE_BUFFER_SIZE, IMAGE_ROWS, IMAGE_WIDTH};

/// Value of a blank byte: all pixels white.
pub const BLANK: u8 = 0xFF;

/// A row write that would run past the end of the image buffer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("row {row} at offset {offset} with {len} bytes exceeds the {capacity}-byte image")]
pub struct BoundsViolation {
    /// Row number from the phone.
    pub row: u16,
    /// Computed byte offset.
    pub offset: usize,
    /// Payload length.
    pub len: usize,
    /// Buffer size.
    pub capacity: usize,
}

/// Borrowed view of an image buffer, readable at any point of a transfer.
#[derive(Debug, Clone, Copy)]
pub struct ImageSnapshot<'a> {
    /// The 1-bit bitmap, 16 bytes per row, least significant bit leftmost.
    pub buffer: &'a [u8],
    /// All rows arrived.
    pub complete: bool,
    /// The transfer was cut short by an error or a new conversation.
    pub aborted: bool,
}

impl<'a> ImageSnapshot<'a> {
    /// Whether the pixel at `(x, y)` is black.
    pub fn is_black(&self, x: usize, y: usize) -> bool {
        if x >= IMAGE_WIDTH || y >= IMAGE_ROWS {
            return false;
        }
        let byte = self.buffer[y * BYTES_PER_ROW + x / 8];
        byte & (1 << (x % 8)) == 0
    }

    /// Iterate over the rows of the bitmap.
    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> {
        self.buffer.chunks(BYTES_PER_ROW)
    }
}

/// Image transfer session: the fixed buffer plus transfer progress.
///
/// Owned by the image screen; dropped when the screen closes.
#[derive(Debug, Clone)]
pub struct ImageReassembler {
    buffer: Box<[u8]>,
    bytes_per_row: usize,
    complete: bool,
    aborted: bool,
    rows_written: u32,
    rows_dropped: u32,
}

impl Default for ImageReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageReassembler {
    /// Create a blank image.
    pub fn new() -> Self {
        ImageReassembler {
            buffer: vec![BLANK; IMAGE_BUFFER_SIZE].into_boxed_slice(),
            bytes_per_row: BYTES_PER_ROW,
            complete: false,
            aborted: false,
            rows_written: 0,
            rows_dropped: 0,
        }
    }

    /// Start a transfer: blank the buffer and clear the completion flags.
    pub fn begin(&mut self, bytes_per_row: usize) {
        self.buffer.fill(BLANK);
        self.bytes_per_row = bytes_per_row;
        self.complete = false;
        self.aborted = false;
        self.rows_written = 0;
        self.rows_dropped = 0;
    }

    /// Update the row stride (the phone repeats it in every row header).
    pub fn set_bytes_per_row(&mut self, bytes_per_row: usize) {
        self.bytes_per_row = bytes_per_row;
    }

    /// Copy a row into the buffer at `row * bytes_per_row`.
    ///
    /// Writes that would not fit entirely are dropped and leave the buffer
    /// untouched.
    pub fn write_row(&mut self, row: u16, payload: &[u8]) -> Result<Range<usize>, BoundsViolation> {
        let offset = usize::from(row).saturating_mul(self.bytes_per_row);
        let end = offset.saturating_add(payload.len());

        if end > self.buffer.len() {
            self.rows_dropped += 1;
            return Err(BoundsViolation {
                row,
                offset,
                len: payload.len(),
                capacity: self.buffer.len(),
            });
        }

        self.buffer[offset..end].copy_from_slice(payload);
        self.rows_written += 1;
        Ok(offset..end)
    }

    /// Mark the transfer complete.
    pub fn finish(&mut self) {
        self.complete = true;
    }

    /// Mark the transfer abandoned. The partial image stays readable.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    /// Rows accepted since the transfer began.
    pub fn rows_written(&self) -> u32 {
        self.rows_written
    }

    /// Rows dropped for being out of bounds since the transfer began.
    pub fn rows_dropped(&self) -> u32 {
        self.rows_dropped
    }

    /// Borrow the buffer and its flags.
    pub fn snapshot(&self) -> ImageSnapshot<'_> {
        ImageSnapshot {
            buffer: &self.buffer,
            complete: self.complete,
            aborted: self.aborted,
        }
    }
}
