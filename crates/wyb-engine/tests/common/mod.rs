//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use wyb_engine::{ChannelError, ConversationEngine, Haptic, MessageChannel, Session, UiHooks};
use wyb_protocol::{DeviceMessage, ImageRow, Request, BYTES_PER_ROW};

// ============================================================================
// Recording Channel
// ============================================================================

/// Channel that decodes and keeps every request it is handed.
#[derive(Debug)]
pub struct RecordingChannel {
    pub requests: Vec<Request>,
    pub available: bool,
}

impl Default for RecordingChannel {
    fn default() -> Self {
        RecordingChannel {
            requests: Vec::new(),
            available: true,
        }
    }
}

impl RecordingChannel {
    /// Take the requests recorded so far.
    pub fn drain(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.requests)
    }
}

impl MessageChannel for RecordingChannel {
    fn send(&mut self, dictionary: Vec<u8>) -> Result<(), ChannelError> {
        if !self.available {
            return Err(ChannelError::Unavailable);
        }
        self.requests.push(Request::decode(&dictionary)?);
        Ok(())
    }
}

// ============================================================================
// Recording UI
// ============================================================================

/// What the engine told the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    CatalogChanged { total: u16, fetched: u16 },
    OpenImageScreen(u16),
    ImageUpdated { complete: Option<bool> },
    ShowError(String),
    Haptic(Haptic),
}

#[derive(Debug, Default)]
pub struct RecordingUi {
    pub events: Vec<UiEvent>,
}

impl RecordingUi {
    pub fn drain(&mut self) -> Vec<UiEvent> {
        std::mem::take(&mut self.events)
    }
}

impl UiHooks for RecordingUi {
    fn catalog_changed(&mut self, session: &Session) {
        self.events.push(UiEvent::CatalogChanged {
            total: session.catalog_size(),
            fetched: session.fetched_count(),
        });
    }

    fn open_image_screen(&mut self, index: u16) {
        self.events.push(UiEvent::OpenImageScreen(index));
    }

    fn image_updated(&mut self, session: &Session) {
        self.events.push(UiEvent::ImageUpdated {
            complete: session.current_image_snapshot().map(|s| s.complete),
        });
    }

    fn show_error(&mut self, message: &str) {
        self.events.push(UiEvent::ShowError(message.to_string()));
    }

    fn haptic(&mut self, pattern: Haptic) {
        self.events.push(UiEvent::Haptic(pattern));
    }
}

// ============================================================================
// Harness
// ============================================================================

pub type TestEngine = ConversationEngine<RecordingChannel, RecordingUi>;

pub fn engine() -> TestEngine {
    ConversationEngine::new(RecordingChannel::default(), RecordingUi::default())
}

pub fn name_reply(index: u16) -> DeviceMessage {
    DeviceMessage::Name {
        name: format!("card{}", index),
        format: "CODE_128".to_string(),
    }
}

pub fn row_reply(row: u16, fill: u8) -> DeviceMessage {
    DeviceMessage::ImageRow(ImageRow {
        row,
        bytes_per_row: BYTES_PER_ROW as u8,
        data: vec![fill; BYTES_PER_ROW],
    })
}

/// Refresh and answer the first page of names for a catalog of `length`.
pub fn load_catalog(engine: &mut TestEngine, session: &mut Session, length: u8) {
    engine.on_trigger(session, wyb_engine::Trigger::Refresh);
    engine.on_message(session, DeviceMessage::ListLength(length));
    while matches!(session.state(), wyb_engine::ProtocolState::AwaitingInitialNames) {
        let index = session.fetched_count();
        engine.on_message(session, name_reply(index));
    }
    engine.channel_mut().drain();
    engine.ui_mut().drain();
}
