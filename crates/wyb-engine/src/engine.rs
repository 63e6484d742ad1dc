//! The conversation state machine.
//!
//! The engine reacts to two kinds of input: messages from the phone
//! ([`ConversationEngine::on_message`]) and UI events
//! ([`ConversationEngine::on_trigger`]). Each call runs to completion,
//! possibly issuing one request, and returns. The next step happens when the
//! next message arrives.

use tracing::{debug, trace, warn};
use wyb_protocol::{
    DeviceMessage, Dictionary, ImageRow, ProtocolError, Request, BYTES_PER_ROW, CMD_REREAD_LIST, IMAGE_CURRENTLY_PENDING,
    LIST_LENGTH_DISPLAY_NOW, LIST_LENGTH_EMPTY, NAME_CACHE_CAPACITY, WATCHAPP_VERSION,
};

use crate::channel::{MessageChannel, RequestEncoder};
use crate::image::ImageReassembler;
use crate::metrics::metric_defs;
use crate::state::{ErrorContext, ImageScreen, ProtocolState, Session, Trigger};
use crate::ui::{Haptic, UiHooks};

/// UI notification raised by a transition, delivered once the session holds
/// the new state.
#[derive(Debug)]
enum Notice {
    CatalogChanged,
    OpenImageScreen(u16),
    ImageUpdated,
    ShowError(String),
    Haptic(Haptic),
}

/// Drives the conversation with the phone.
///
/// Owns only its collaborators; all conversation data lives in the
/// [`Session`] handed to each call.
pub struct ConversationEngine<C, U> {
    channel: C,
    ui: U,
    encoder: RequestEncoder,
    protocol_version: u16,
}

impl<C: MessageChannel, U: UiHooks> ConversationEngine<C, U> {
    /// Create an engine sending requests on `channel` and notifying `ui`.
    pub fn new(channel: C, ui: U) -> Self {
        ConversationEngine {
            channel,
            ui,
            encoder: RequestEncoder::new(),
            protocol_version: WATCHAPP_VERSION,
        }
    }

    /// Override the version number sent with list length requests.
    pub fn with_protocol_version(mut self, version: u16) -> Self {
        self.protocol_version = version;
        self
    }

    /// The outbound channel.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// The outbound channel, mutably.
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// The UI hooks.
    pub fn ui(&self) -> &U {
        &self.ui
    }

    /// The UI hooks, mutably.
    pub fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }

    // ========================================================================
    // Entry Points
    // ========================================================================

    /// Handle one message from the phone.
    pub fn on_message(&mut self, session: &mut Session, message: DeviceMessage) {
        session.last_error = None;
        trace!("Engine[{}]: received {}", session.state.name(), message.name());

        // Errors preempt whatever conversation is in progress
        if let DeviceMessage::Error { message: text } = &message {
            metrics::counter!(metric_defs::DEVICE_ERRORS.name).increment(1);
            Self::park_transfer(session);
            session.state = ProtocolState::Error(ErrorContext::from_device(text));
        }

        let mut notices = Vec::new();
        let previous = std::mem::take(&mut session.state);
        let from = previous.name();

        let next = match previous {
            ProtocolState::Idle => self.handle_idle(session, message, &mut notices),
            ProtocolState::AwaitingListLength => self.handle_list_length(session, message, &mut notices),
            ProtocolState::AwaitingInitialNames => self.handle_initial_names(session, message, &mut notices),
            ProtocolState::AwaitingMoreNames { requested } => {
                self.handle_more_names(session, requested, message, &mut notices)
            }
            ProtocolState::ReceivingImage(transfer) => self.handle_image(session, transfer, message, &mut notices),
            ProtocolState::Error(context) => Self::resolve_error(session, context, &mut notices),
        };

        self.transition(session, from, next, notices);
    }

    /// Classify a dictionary by the keys the current state is waiting for,
    /// then handle it as [`on_message`](Self::on_message) does.
    ///
    /// A malformed tuple leaves the session untouched.
    pub fn on_dictionary(&mut self, session: &mut Session, dict: &Dictionary) -> Result<(), ProtocolError> {
        let message = DeviceMessage::classify(dict, session.state.expected_keys())?;
        self.on_message(session, message);
        Ok(())
    }

        /// Handle one UI event.
    pub fn on_trigger(&mut self, session: &mut Session, trigger: Trigger) {
        let mut notices = Vec::new();
        let from = session.state.name();
        trace!("Engine[{}]: trigger {:?}", from, trigger);

        let next = match trigger {
            Trigger::Refresh => {
                Self::park_transfer(session);
                self.refresh(session)
            }
            Trigger::Select(index) => {
                // Nothing to pick yet: leave any conversation in progress alone
                if session.catalog.fetched_count == 0 || u16::from(index) >= session.catalog.total_count {
                    debug!(
                        "Engine: ignoring select of {} with {}/{} names",
                        index, session.catalog.fetched_count, session.catalog.total_count
                    );
                    return;
                }
                Self::park_transfer(session);
                session.selected = Some(index);
                self.open_image(session, u16::from(index), &mut notices)
            }
            Trigger::CloseImageScreen => {
                session.screen = None;
                let mut next = match std::mem::take(&mut session.state) {
                    ProtocolState::ReceivingImage(_) => {
                        debug!("Engine: image screen closed mid-transfer");
                        ProtocolState::Idle
                    }
                    other => other,
                };
                if session.auto_display {
                    session.auto_display = false;
                    next = self.refresh(session);
                }
                next
            }
        };

        self.transition(session, from, next, notices);
    }

    /// Ask for the next name if the UI is about to show an index that has not
    /// been fetched yet.
    ///
    /// Only one lazy request is outstanding at a time, and none is made while
    /// another conversation is in progress. Returns whether a request went
    /// out.
    pub fn request_more_names_if_needed(&mut self, session: &mut Session, index: u16) -> bool {
        let fetched = session.catalog.fetched_count;
        if index < fetched || index >= session.catalog.total_count {
            return false;
        }

        match session.state {
            ProtocolState::Idle | ProtocolState::AwaitingMoreNames { requested: None } => {}
            _ => {
                trace!(
                    "Engine[{}]: not fetching name {} while busy",
                    session.state.name(),
                    fetched
                );
                return false;
            }
        }

        if !self.send(Request::Name { index: fetched }) {
            return false;
        }

        let from = session.state.name();
        let next = ProtocolState::AwaitingMoreNames {
            requested: Some(fetched),
        };
        self.transition(session, from, next, Vec::new());
        true
    }

    // ========================================================================
    // State Handlers
    // ========================================================================

    fn handle_idle(&mut self, session: &mut Session, message: DeviceMessage, notices: &mut Vec<Notice>) -> ProtocolState {
        match message {
            DeviceMessage::Command(CMD_REREAD_LIST) => {
                debug!("Engine: phone asked for a reread");
                self.refresh(session)
            }
            DeviceMessage::DisplayBarcode { index } if u16::from(index) < session.catalog.total_count => {
                debug!("Engine: phone asked to display barcode {}", index);
                session.selected = Some(index);
                self.open_image(session, u16::from(index), notices)
            }
            other => Self::ignore(ProtocolState::Idle, other),
        }
    }

    fn handle_list_length(
        &mut self,
        session: &mut Session,
        message: DeviceMessage,
        notices: &mut Vec<Notice>,
    ) -> ProtocolState {
        match message {
            DeviceMessage::ListLength(LIST_LENGTH_EMPTY) => {
                debug!("Engine: catalog is empty");
                session.catalog.reset();
                notices.push(Notice::CatalogChanged);
                ProtocolState::Idle
            }
            DeviceMessage::ListLength(LIST_LENGTH_DISPLAY_NOW) => {
                debug!("Engine: phone has a barcode to display now");
                session.auto_display = true;
                self.open_image(session, IMAGE_CURRENTLY_PENDING, notices)
            }
            DeviceMessage::ListLength(length) => {
                debug!("Engine: catalog has {} barcodes", length);
                session.catalog.total_count = u16::from(length);
                session.catalog.fetched_count = 0;
                self.send(Request::Name { index: 0 });
                ProtocolState::AwaitingInitialNames
            }
            other => Self::ignore(ProtocolState::AwaitingListLength, other),
        }
    }

    fn handle_initial_names(
        &mut self,
        session: &mut Session,
        message: DeviceMessage,
        notices: &mut Vec<Notice>,
    ) -> ProtocolState {
        match message {
            DeviceMessage::Name { name, format } => {
                Self::store_name(session, name, format);
                let fetched = session.catalog.fetched_count;

                if session.catalog.is_exhausted() || usize::from(fetched) == NAME_CACHE_CAPACITY {
                    debug!(
                        "Engine: first page loaded ({}/{})",
                        fetched, session.catalog.total_count
                    );
                    notices.push(Notice::CatalogChanged);
                    ProtocolState::Idle
                } else {
                    self.send(Request::Name { index: fetched });
                    ProtocolState::AwaitingInitialNames
                }
            }
            other => Self::ignore(ProtocolState::AwaitingInitialNames, other),
        }
    }

    fn handle_more_names(
        &mut self,
        session: &mut Session,
        requested: Option<u16>,
        message: DeviceMessage,
        notices: &mut Vec<Notice>,
    ) -> ProtocolState {
        match message {
            DeviceMessage::Name { name, format } => {
                if let Some(index) = requested.filter(|&i| i != session.catalog.fetched_count) {
                    // Replies are not correlated; store at the cursor regardless
                    trace!(
                        "Engine: name for {} arrived with cursor at {}",
                        index,
                        session.catalog.fetched_count
                    );
                }
                Self::store_name(session, name, format);
                notices.push(Notice::CatalogChanged);

                if session.catalog.is_exhausted() {
                    ProtocolState::Idle
                } else {
                    ProtocolState::AwaitingMoreNames { requested: None }
                }
            }
            other => {
                debug!("Engine: {} while fetching names, rereading catalog", other.name());
                self.refresh(session)
            }
        }
    }

    fn handle_image(
        &mut self,
        session: &mut Session,
        mut transfer: ImageReassembler,
        message: DeviceMessage,
        notices: &mut Vec<Notice>,
    ) -> ProtocolState {
        match message {
            DeviceMessage::ImageSize(first_row) => {
                trace!("Engine: image announced, first row {}", first_row);
                transfer.begin(BYTES_PER_ROW);
                self.send(Request::NextChunk { row: first_row });
                notices.push(Notice::ImageUpdated);
                ProtocolState::ReceivingImage(transfer)
            }
            DeviceMessage::ImageRow(row) => {
                self.write_row(&mut transfer, &row, notices);
                self.send(Request::NextChunk { row: row.row });
                ProtocolState::ReceivingImage(transfer)
            }
            DeviceMessage::ImageDone => {
                debug!(
                    "Engine: image complete, {} rows written, {} dropped",
                    transfer.rows_written(),
                    transfer.rows_dropped()
                );
                metrics::histogram!(metric_defs::IMAGE_ROWS_PER_TRANSFER.name)
                    .record(f64::from(transfer.rows_written()));
                transfer.finish();
                session.screen.get_or_insert_with(ImageScreen::default).shown = Some(transfer);
                notices.push(Notice::ImageUpdated);
                notices.push(Notice::Haptic(Haptic::Completed));
                ProtocolState::Idle
            }
            other => Self::ignore(ProtocolState::ReceivingImage(transfer), other),
        }
    }

    fn resolve_error(session: &mut Session, context: ErrorContext, notices: &mut Vec<Notice>) -> ProtocolState {
        warn!("Engine: {}", context.message);
        notices.push(Notice::ShowError(context.message.clone()));
        notices.push(Notice::Haptic(Haptic::Error));
        session.last_error = Some(context.message);
        ProtocolState::Idle
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Start a catalog read.
    fn refresh(&mut self, session: &mut Session) -> ProtocolState {
        metrics::counter!(metric_defs::CATALOG_REFRESHES.name).increment(1);
        session.selected = None;
        session.names.reset_cursor();
        session.catalog.reset();
        self.send(Request::ListLength {
            version: self.protocol_version,
        });
        ProtocolState::AwaitingListLength
    }

    /// Open the image screen on a fresh buffer and ask for the image.
    fn open_image(&mut self, session: &mut Session, index: u16, notices: &mut Vec<Notice>) -> ProtocolState {
        session.screen = Some(ImageScreen::default());
        notices.push(Notice::OpenImageScreen(index));
        self.send(Request::Image { index });
        ProtocolState::ReceivingImage(ImageReassembler::new())
    }

    fn write_row(&mut self, transfer: &mut ImageReassembler, row: &ImageRow, notices: &mut Vec<Notice>) {
        transfer.set_bytes_per_row(usize::from(row.bytes_per_row));
        match transfer.write_row(row.row, &row.data) {
            Ok(range) => {
                trace!("Engine: row {} -> {:?}", row.row, range);
                metrics::counter!(metric_defs::IMAGE_ROWS_WRITTEN.name).increment(1);
                notices.push(Notice::ImageUpdated);
            }
            Err(violation) => {
                warn!("Engine: dropping image row: {}", violation);
                metrics::counter!(metric_defs::IMAGE_ROWS_DROPPED.name).increment(1);
            }
        }
    }

    fn store_name(session: &mut Session, name: String, format: String) {
        trace!("Engine: name {} = '{}' ({})", session.names.cursor(), name, format);
        session.names.push(name, format);
        session.catalog.fetched_count += 1;
    }

    /// Abandon an in-flight image transfer, keeping the partial image on the
    /// open screen.
    fn park_transfer(session: &mut Session) {
        if !matches!(session.state, ProtocolState::ReceivingImage(_)) {
            return;
        }
        if let ProtocolState::ReceivingImage(mut transfer) = std::mem::take(&mut session.state) {
            debug!("Engine: abandoning image transfer after {} rows", transfer.rows_written());
            transfer.abort();
            if let Some(screen) = session.screen.as_mut() {
                screen.shown = Some(transfer);
            }
        }
    }

    fn ignore(state: ProtocolState, message: DeviceMessage) -> ProtocolState {
        trace!("Engine[{}]: ignoring {:?}", state.name(), message);
        metrics::counter!(
            metric_defs::MESSAGES_IGNORED.name,
            "state" => state.name(),
            "message" => message.name()
        )
        .increment(1);
        state
    }

    fn send(&mut self, request: Request) -> bool {
        self.encoder.request(&mut self.channel, request)
    }

    /// Install the next state, then deliver the notices raised on the way.
    fn transition(&mut self, session: &mut Session, from: &'static str, next: ProtocolState, notices: Vec<Notice>) {
        if from != next.name() {
            debug!("Engine: {} -> {}", from, next.name());
        }
        session.state = next;

        for notice in notices {
            match notice {
                Notice::CatalogChanged => self.ui.catalog_changed(session),
                Notice::OpenImageScreen(index) => self.ui.open_image_screen(index),
                Notice::ImageUpdated => self.ui.image_updated(session),
                Notice::ShowError(message) => self.ui.show_error(&message),
                Notice::Haptic(pattern) => self.ui.haptic(pattern),
            }
        }
    }
}
