//! Conversation state and the session that carries it.

use serde::Serialize;
use wyb_protocol::{
    KEY_COMMAND, KEY_DISPLAY_BARCODE, KEY_IMAGE_DONE, KEY_IMAGE_ROW, KEY_IMAGE_SIZE, KEY_LIST_LENGTH, KEY_NAME,
};

use crate::image::{ImageReassembler, ImageSnapshot};
use crate::name_cache::{NameCache, NameCacheEntry};

// ============================================================================
// Protocol State
// ============================================================================

/// Error text received from the phone, alive only while the state is
/// [`ProtocolState::Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Message shown to the user, prefixed with `ERROR: `.
    pub message: String,
}

impl ErrorContext {
    /// Build the context for a phone-supplied error payload.
    pub fn from_device(payload: &str) -> Self {
        ErrorContext {
            message: format!("ERROR: {}", payload),
        }
    }
}

/// State of the conversation with the phone.
///
/// Each variant carries only the data that is meaningful while in it.
#[derive(Debug, Clone, Default)]
pub enum ProtocolState {
    /// No conversation in progress.
    #[default]
    Idle,
    /// Waiting for the catalog length.
    AwaitingListLength,
    /// Fetching the first page of names.
    AwaitingInitialNames,
    /// Fetching names lazily as the menu scrolls.
    AwaitingMoreNames {
        /// Index of the name request still unanswered, if any.
        requested: Option<u16>,
    },
    /// Receiving a barcode image.
    ReceivingImage(ImageReassembler),
    /// The phone reported an error.
    Error(ErrorContext),
}

impl ProtocolState {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolState::Idle => "Idle",
            ProtocolState::AwaitingListLength => "AwaitingListLength",
            ProtocolState::AwaitingInitialNames => "AwaitingInitialNames",
            ProtocolState::AwaitingMoreNames { .. } => "AwaitingMoreNames",
            ProtocolState::ReceivingImage(_) => "ReceivingImage",
            ProtocolState::Error(_) => "Error",
        }
    }

    /// Check if no conversation is in progress.
    pub fn is_idle(&self) -> bool {
        matches!(self, ProtocolState::Idle)
    }

    /// Keys this state reacts to, used to classify a dictionary that carries
    /// more than one.
    pub fn expected_keys(&self) -> &'static [u32] {
        match self {
            ProtocolState::Idle => &[KEY_COMMAND, KEY_DISPLAY_BARCODE],
            ProtocolState::AwaitingListLength => &[KEY_LIST_LENGTH],
            ProtocolState::AwaitingInitialNames | ProtocolState::AwaitingMoreNames { .. } => &[KEY_NAME],
            ProtocolState::ReceivingImage(_) => &[KEY_IMAGE_SIZE, KEY_IMAGE_ROW, KEY_IMAGE_DONE],
            ProtocolState::Error(_) => &[],
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Progress of the catalog read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSession {
    /// Number of barcodes the phone reported.
    pub total_count: u16,
    /// Names received so far.
    pub fetched_count: u16,
}

impl CatalogSession {
    /// Forget the previous catalog.
    pub fn reset(&mut self) {
        self.total_count = 0;
        self.fetched_count = 0;
    }

    /// Check whether every name has been fetched.
    pub fn is_exhausted(&self) -> bool {
        self.fetched_count >= self.total_count
    }
}

// ============================================================================
// UI Triggers
// ============================================================================

/// Events raised by the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Reread the catalog (long press, or app start).
    Refresh,
    /// Open the barcode at a menu row.
    Select(u8),
    /// The image screen was closed.
    CloseImageScreen,
}

// ============================================================================
// Session
// ============================================================================

/// The image screen and the image it keeps after a transfer ends.
#[derive(Debug, Clone, Default)]
pub(crate) struct ImageScreen {
    /// Finished or abandoned transfer still on display.
    pub(crate) shown: Option<ImageReassembler>,
}

/// Everything the engine knows about the conversation.
///
/// Passed explicitly to every engine call; the engine itself holds no
/// conversation data.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub(crate) state: ProtocolState,
    pub(crate) catalog: CatalogSession,
    pub(crate) names: NameCache,
    pub(crate) screen: Option<ImageScreen>,
    pub(crate) auto_display: bool,
    pub(crate) selected: Option<u8>,
    pub(crate) last_error: Option<String>,
}

impl Session {
    /// Create an idle session with an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current protocol state.
    pub fn state(&self) -> &ProtocolState {
        &self.state
    }

    /// Catalog progress.
    pub fn catalog(&self) -> CatalogSession {
        self.catalog
    }

    /// Number of barcodes on the phone.
    pub fn catalog_size(&self) -> u16 {
        self.catalog.total_count
    }

    /// Names received so far.
    pub fn fetched_count(&self) -> u16 {
        self.catalog.fetched_count
    }

    /// Name and format resident in the slot of `index`.
    ///
    /// Only indices in `[fetched - 10, fetched)` are guaranteed to be the
    /// ones asked for; older indices return whatever overwrote them.
    pub fn name_at(&self, index: u16) -> Option<&NameCacheEntry> {
        self.names.get(usize::from(index))
    }

    /// The name ring.
    pub fn names(&self) -> &NameCache {
        &self.names
    }

    /// Whether the image screen is open.
    pub fn is_image_screen_open(&self) -> bool {
        self.screen.is_some()
    }

    /// The image being received or on display.
    pub fn current_image_snapshot(&self) -> Option<ImageSnapshot<'_>> {
        if let ProtocolState::ReceivingImage(transfer) = &self.state {
            return Some(transfer.snapshot());
        }
        self.screen
            .as_ref()
            .and_then(|screen| screen.shown.as_ref())
            .map(ImageReassembler::snapshot)
    }

    /// Error text surfaced by the most recent message, if it was an error.
    pub fn error_message(&self) -> Option<&str> {
        if let ProtocolState::Error(context) = &self.state {
            return Some(&context.message);
        }
        self.last_error.as_deref()
    }

    /// Whether the open image screen was opened by the phone.
    pub fn auto_display(&self) -> bool {
        self.auto_display
    }

    /// Menu row the user (or the phone) last opened.
    pub fn selected(&self) -> Option<u8> {
        self.selected
    }

    /// Serializable summary for status output.
    pub fn summary(&self) -> SessionSummary {
        let fetched = usize::from(self.catalog.fetched_count);
        let first = fetched.saturating_sub(self.names.capacity());
        SessionSummary {
            state: self.state.name(),
            catalog: self.catalog,
            names: (first..fetched)
                .filter_map(|i| self.names.get(i).cloned())
                .collect(),
            image_screen_open: self.is_image_screen_open(),
            selected: self.selected,
            image_complete: self.current_image_snapshot().map(|s| s.complete),
            error: self.error_message().map(str::to_string),
        }
    }
}

/// Snapshot of a session, for logs and status output.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    /// State name.
    pub state: &'static str,
    /// Catalog progress.
    pub catalog: CatalogSession,
    /// Names resident for the last fetched page, in catalog order.
    pub names: Vec<NameCacheEntry>,
    /// Whether the image screen is open.
    pub image_screen_open: bool,
    /// Menu row last opened since the catalog was read.
    pub selected: Option<u8>,
    /// Completion of the displayed image, if any.
    pub image_complete: Option<bool>,
    /// Error text, if any.
    pub error: Option<String>,
}
