//! YAML configuration for the watch side and the phone catalog.

use std::path::Path;

use serde::{Deserialize, Serialize};
use wyb_protocol::{DeviceMessage, LIST_LENGTH_DISPLAY_NOW, WATCHAPP_VERSION};

use crate::error::{Result, RunnerError};

// ============================================================================
// Watch
// ============================================================================

/// Settings for the watch side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Address of the phone simulator.
    pub connect: String,
    /// Version number sent with list length requests.
    pub protocol_version: u16,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Print finished images as ASCII art.
    pub render: bool,
    /// Keep asking for names until the whole catalog has been seen.
    pub browse: bool,
    /// Menu row to open once the catalog has loaded.
    pub select: Option<u8>,
    /// Close the image screen as soon as an image completes.
    pub close_images: bool,
    /// Stop once the selected image (or, without one, the catalog) is done.
    pub once: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig {
            connect: "127.0.0.1:9450".to_string(),
            protocol_version: WATCHAPP_VERSION,
            log_level: "info".to_string(),
            render: true,
            browse: true,
            select: None,
            close_images: true,
            once: false,
        }
    }
}

impl WatchConfig {
    /// Parse from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }
}

// ============================================================================
// Catalog
// ============================================================================

fn default_format() -> String {
    "QR_CODE".to_string()
}

/// One barcode held by the phone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarcodeEntry {
    /// Name shown in the watch menu.
    pub name: String,
    /// Barcode format name.
    #[serde(default = "default_format")]
    pub format: String,
    /// Bar pattern: `1` or `#` for a black module, anything else for white.
    pub pattern: String,
}

/// Message the phone sends without being asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "push", rename_all = "snake_case")]
pub enum Push {
    /// Ask the watch to show a barcode.
    Display {
        /// Catalog index.
        index: u8,
    },
    /// Ask the watch to reread the catalog.
    Reread,
}

/// The phone's barcode catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Barcodes in menu order.
    #[serde(default)]
    pub barcodes: Vec<BarcodeEntry>,
    /// Index the phone wants displayed as soon as the watch connects.
    #[serde(default)]
    pub display_now: Option<u8>,
    /// Pushes sent in order, each once the conversation has gone quiet.
    #[serde(default)]
    pub pushes: Vec<Push>,
}

impl CatalogConfig {
    /// Parse from YAML and validate.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let catalog: CatalogConfig = serde_yaml::from_str(yaml)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load from a YAML file and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Number of barcodes.
    pub fn len(&self) -> usize {
        self.barcodes.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.barcodes.is_empty()
    }

    /// Check that every entry can be sent to the watch.
    pub fn validate(&self) -> Result<()> {
        // 255 is the display-now sentinel, never a count
        if self.barcodes.len() >= usize::from(LIST_LENGTH_DISPLAY_NOW) {
            return Err(RunnerError::Catalog(format!(
                "{} barcodes, at most {} fit",
                self.barcodes.len(),
                LIST_LENGTH_DISPLAY_NOW - 1
            )));
        }

        for (index, entry) in self.barcodes.iter().enumerate() {
            if entry.pattern.is_empty() {
                return Err(RunnerError::Catalog(format!("barcode {} has an empty pattern", index)));
            }
            let reply = DeviceMessage::Name {
                name: entry.name.clone(),
                format: entry.format.clone(),
            };
            reply
                .encode()
                .map_err(|e| RunnerError::Catalog(format!("barcode {} ('{}'): {}", index, entry.name, e)))?;
        }

        if let Some(index) = self.display_now {
            if usize::from(index) >= self.barcodes.len() {
                return Err(RunnerError::Catalog(format!(
                    "display_now {} is outside the catalog",
                    index
                )));
            }
        }

        for push in &self.pushes {
            if let Push::Display { index } = push {
                if usize::from(*index) >= self.barcodes.len() {
                    return Err(RunnerError::Catalog(format!("pushed display {} is outside the catalog", index)));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r###"
barcodes:
  - name: Library card
    format: CODE_128
    pattern: "1101001100"
  - name: Gym
    pattern: "##  ##  #"
display_now: 1
pushes:
  - push: display
    index: 0
  - push: reread
"###;

    #[test]
    fn test_parse_catalog() {
        let catalog = CatalogConfig::from_yaml(CATALOG).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.barcodes[0].format, "CODE_128");
        assert_eq!(catalog.barcodes[1].format, "QR_CODE");
        assert_eq!(catalog.barcodes[1].pattern, "##  ##  #");
        assert_eq!(catalog.display_now, Some(1));
        assert_eq!(catalog.pushes, vec![Push::Display { index: 0 }, Push::Reread]);
    }

    #[test]
    fn test_pushed_display_out_of_range() {
        let yaml = "barcodes:\n  - name: a\n    pattern: '1'\npushes:\n  - push: display\n    index: 1\n";
        assert!(matches!(CatalogConfig::from_yaml(yaml), Err(RunnerError::Catalog(_))));
    }

    #[test]
    fn test_display_now_out_of_range() {
        let yaml = "barcodes:\n  - name: a\n    pattern: '1'\ndisplay_now: 3\n";
        assert!(matches!(CatalogConfig::from_yaml(yaml), Err(RunnerError::Catalog(_))));
    }

    #[test]
    fn test_name_too_long_for_watch() {
        let catalog = CatalogConfig {
            barcodes: vec![BarcodeEntry {
                name: "x".repeat(120),
                format: default_format(),
                pattern: "1".to_string(),
            }],
            ..Default::default()
        };
        assert!(matches!(catalog.validate(), Err(RunnerError::Catalog(_))));
    }

    #[test]
    fn test_too_many_barcodes() {
        let entry = BarcodeEntry {
            name: "n".to_string(),
            format: default_format(),
            pattern: "1".to_string(),
        };
        let catalog = CatalogConfig {
            barcodes: vec![entry; 255],
            ..Default::default()
        };
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_watch_defaults() {
        let config = WatchConfig::from_yaml("select: 2\n").unwrap();
        assert_eq!(config.select, Some(2));
        assert_eq!(config.protocol_version, 30);
        assert!(config.browse);
        assert!(!config.once);
    }
}
