//! Simulated companion phone.
//!
//! Answers watch requests from a [`CatalogConfig`]. Images are synthesised
//! from each entry's bar pattern, so every run serves the same bitmaps.

use std::collections::VecDeque;

use tracing::{debug, trace};
use wyb_protocol::{
    DeviceMessage, ImageRow, Request, BYTES_PER_ROW, CMD_REREAD_LIST, IMAGE_BUFFER_SIZE,
    IMAGE_CURRENTLY_PENDING, IMAGE_ROWS, IMAGE_WIDTH, LIST_LENGTH_DISPLAY_NOW, WATCHAPP_VERSION,
};

use crate::config::{CatalogConfig, Push};

/// First and last image rows that carry bars; the rest is quiet zone.
const BAR_ROWS: std::ops::Range<usize> = 24..144;

/// Render a bar pattern into a 1-bit image (cleared bits are black).
pub fn synthesize_image(pattern: &str) -> Vec<u8> {
    let mut image = vec![0xFF; IMAGE_BUFFER_SIZE];
    let modules: Vec<bool> = pattern.chars().map(|c| c == '1' || c == '#').collect();
    if modules.is_empty() {
        return image;
    }

    let module_width = (IMAGE_WIDTH / modules.len()).max(1);
    let margin = IMAGE_WIDTH.saturating_sub(module_width * modules.len()) / 2;

    for y in BAR_ROWS {
        for x in margin..IMAGE_WIDTH {
            let module = (x - margin) / module_width;
            if modules.get(module).copied().unwrap_or(false) {
                image[y * BYTES_PER_ROW + x / 8] &= !(1 << (x % 8));
            }
        }
    }
    image
}

/// Image transfer in progress on the phone side.
#[derive(Debug)]
struct Transfer {
    index: usize,
    image: Vec<u8>,
    started: bool,
}

/// A phone serving a barcode catalog.
#[derive(Debug)]
pub struct CompanionPhone {
    catalog: CatalogConfig,
    display_now: Option<u8>,
    pushes: VecDeque<Push>,
    transfer: Option<Transfer>,
}

impl CompanionPhone {
    /// Create a phone serving `catalog`.
    pub fn new(catalog: CatalogConfig) -> Self {
        let display_now = catalog.display_now;
        let pushes = catalog.pushes.iter().copied().collect();
        CompanionPhone {
            catalog,
            display_now,
            pushes,
            transfer: None,
        }
    }

    /// The catalog being served.
    pub fn catalog(&self) -> &CatalogConfig {
        &self.catalog
    }

    /// Whether unsolicited messages are still queued.
    pub fn has_pushes(&self) -> bool {
        !self.pushes.is_empty()
    }

    /// Take the next unsolicited message. Callers send it once the watch has
    /// stopped asking for anything.
    pub fn next_push(&mut self) -> Option<DeviceMessage> {
        let push = self.pushes.pop_front()?;
        debug!("Phone: pushing {:?}", push);
        Some(match push {
            Push::Display { index } => DeviceMessage::DisplayBarcode { index },
            Push::Reread => DeviceMessage::Command(CMD_REREAD_LIST),
        })
    }

    /// Answer one request.
    pub fn handle(&mut self, request: Request) -> Vec<DeviceMessage> {
        trace!("Phone: {} {}", request.name(), request.payload());

        let reply = match request {
            Request::ListLength { version } => {
                if version != WATCHAPP_VERSION {
                    debug!("Phone: watch app version {} (expected {})", version, WATCHAPP_VERSION);
                }
                self.transfer = None;
                if self.display_now.is_some() {
                    DeviceMessage::ListLength(LIST_LENGTH_DISPLAY_NOW)
                } else {
                    // Validated catalogs hold at most 254 entries
                    DeviceMessage::ListLength(self.catalog.len() as u8)
                }
            }
            Request::Name { index } => match self.catalog.barcodes.get(usize::from(index)) {
                Some(entry) => DeviceMessage::Name {
                    name: entry.name.clone(),
                    format: entry.format.clone(),
                },
                None => Self::error("no such barcode"),
            },
            Request::Image { index } => self.start_image(index),
            Request::NextChunk { row } => self.next_row(row),
        };

        vec![reply]
    }

    fn start_image(&mut self, index: u16) -> DeviceMessage {
        let index = if index == IMAGE_CURRENTLY_PENDING {
            match self.display_now.take() {
                Some(pending) => usize::from(pending),
                None => return Self::error("no barcode pending"),
            }
        } else {
            usize::from(index)
        };

        let Some(entry) = self.catalog.barcodes.get(index) else {
            return Self::error("no such barcode");
        };

        debug!("Phone: sending image {} ('{}')", index, entry.name);
        self.transfer = Some(Transfer {
            index,
            image: synthesize_image(&entry.pattern),
            started: false,
        });
        DeviceMessage::ImageSize(0)
    }

    fn next_row(&mut self, row: u16) -> DeviceMessage {
        let Some(transfer) = self.transfer.as_mut() else {
            return Self::error("no image in progress");
        };

        // The first request echoes the announced row; later ones echo the row just received
        let next = if transfer.started {
            usize::from(row) + 1
        } else {
            transfer.started = true;
            usize::from(row)
        };

        if next >= IMAGE_ROWS {
            debug!("Phone: image {} sent", transfer.index);
            self.transfer = None;
            return DeviceMessage::ImageDone;
        }

        let start = next * BYTES_PER_ROW;
        DeviceMessage::ImageRow(ImageRow {
            row: next as u16,
            bytes_per_row: BYTES_PER_ROW as u8,
            data: transfer.image[start..start + BYTES_PER_ROW].to_vec(),
        })
    }

    fn error(text: &str) -> DeviceMessage {
        debug!("Phone: replying with error '{}'", text);
        DeviceMessage::Error {
            message: text.to_string(),
        }
    }
}
