//! Wear Your Barcode message protocol
//!
//! This crate provides types and utilities for the messages exchanged between
//! the barcode watch app and its companion phone. Every message is a small
//! dictionary of `(key, value)` tuples, in the shape of a Pebble AppMessage.
//! The key of the first meaningful tuple tells the receiver what the message
//! is.
//!
//! # Protocol Overview
//!
//! The watch drives every conversation with single-tuple integer requests:
//!
//! - **Requests** (watch → phone): one integer tuple keyed by a request code
//!   (`KEY_LIST_LENGTH`, `KEY_SEND_NAME`, `KEY_SEND_IMAGE`, `KEY_NEXT_CHUNK`)
//! - **Replies** (phone → watch): list length, name + format pairs, image
//!   announcements, image rows and the end-of-image marker
//! - **Pushes** (phone → watch): reread command, display-barcode, error text
//!
//! Inbound dictionaries are limited to 124 bytes and outbound ones to 256
//! bytes, which bounds names and image rows.
//!
//! # Example
//!
//! ```rust,ignore
//! use wyb_protocol::{DeviceMessage, Request};
//!
//! // Build a request
//! let bytes = Request::Name { index: 3 }.encode()?;
//!
//! // Parse a reply
//! let message = DeviceMessage::decode(&received_data)?;
//! ```

mod commands;
mod constants;
mod error;
mod frame;
mod responses;
mod types;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use frame::*;
pub use responses::*;
pub use types::*;
