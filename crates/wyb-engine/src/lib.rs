//! Barcode conversation engine.
//!
//! This crate implements the watch side of the barcode protocol: a state
//! machine that reads the phone's catalog a page at a time into a small
//! ring of names, and reassembles barcode images row by row into a fixed
//! 1-bit buffer.
//!
//! The engine never owns the conversation data. Every call receives the
//! [`Session`] explicitly:
//!
//! ```rust,ignore
//! use wyb_engine::{ConversationEngine, Session, Trigger};
//!
//! let mut session = Session::new();
//! let mut engine = ConversationEngine::new(channel, ui);
//!
//! engine.on_trigger(&mut session, Trigger::Refresh);
//! engine.on_message(&mut session, message);
//! ```

mod channel;
mod engine;
mod image;
pub mod metrics;
mod name_cache;
mod state;
mod ui;

pub use channel::*;
pub use engine::*;
pub use image::*;
pub use name_cache::*;
pub use state::*;
pub use ui::*;
