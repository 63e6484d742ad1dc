//! Runner for the barcode watch protocol.
//!
//! Provides the watch side (engine + console UI) over a TCP link or an
//! in-process loopback, and a simulated companion phone serving a YAML
//! catalog.

pub mod app;
pub mod config;
pub mod console;
pub mod error;
pub mod link;
pub mod loopback;
pub mod phone;

pub use app::{WatchApp, WatchReport};
pub use config::{BarcodeEntry, CatalogConfig, Push, WatchConfig};
pub use error::{Result, RunnerError};
pub use phone::CompanionPhone;
