//! The watch app: engine, session and the console UI, plus the menu
//! behaviour that drives lazy fetching and selection.

use serde::Serialize;
use tracing::{debug, info, warn};
use wyb_engine::{ConversationEngine, MessageChannel, Session, SessionSummary, Trigger};
use wyb_protocol::Dictionary;

use crate::config::WatchConfig;
use crate::console::ConsoleUi;

/// Summary of a run, printed as JSON at exit.
#[derive(Debug, Clone, Serialize)]
pub struct WatchReport {
    /// Final session state.
    pub session: SessionSummary,
    /// Dictionaries received from the phone.
    pub messages: usize,
    /// Images that completed.
    pub images_completed: u32,
    /// Errors the phone reported.
    pub errors: Vec<String>,
}

/// Watch side of the conversation.
pub struct WatchApp<C: MessageChannel> {
    engine: ConversationEngine<C, ConsoleUi>,
    session: Session,
    config: WatchConfig,
    select_pending: Option<u8>,
    selected_done: bool,
    messages: usize,
}

impl<C: MessageChannel> WatchApp<C> {
    /// Create the app sending requests on `channel`.
    pub fn new(channel: C, config: WatchConfig) -> Self {
        let engine = ConversationEngine::new(channel, ConsoleUi::new(config.render))
            .with_protocol_version(config.protocol_version);
        WatchApp {
            engine,
            session: Session::new(),
            select_pending: config.select,
            selected_done: false,
            config,
            messages: 0,
        }
    }

    /// Read the catalog, as the watch does when its menu first loads.
    pub fn start(&mut self) {
        info!("Watch: starting, protocol version {}", self.config.protocol_version);
        self.engine.on_trigger(&mut self.session, Trigger::Refresh);
    }

    /// Feed one dictionary from the phone. Malformed ones are logged and
    /// dropped.
    pub fn handle_dictionary(&mut self, dict: &Dictionary) {
        self.messages += 1;
        if let Err(e) = self.engine.on_dictionary(&mut self.session, dict) {
            warn!("Watch: dropping malformed message: {}", e);
            return;
        }
        self.drive();
    }

    /// React to the new session state the way the menu and image screens
    /// would.
    fn drive(&mut self) {
        if self.engine.ui_mut().take_image_done() {
            if self.select_pending.is_none() && self.session.selected().is_some() {
                self.selected_done = true;
            }
            if self.config.close_images {
                debug!("Watch: closing image screen");
                self.engine.on_trigger(&mut self.session, Trigger::CloseImageScreen);
            }
        }

        let fetched = self.session.fetched_count();
        let total = self.session.catalog_size();

        // Scrolling onto the next unfetched row
        if self.config.browse && fetched < total {
            self.engine.request_more_names_if_needed(&mut self.session, fetched);
        }

        let loaded = fetched > 0 && (fetched == total || !self.config.browse);
        if loaded && self.session.state().is_idle() && !self.session.is_image_screen_open() {
            if let Some(index) = self.select_pending.take() {
                info!("Watch: selecting row {}", index);
                self.engine.on_trigger(&mut self.session, Trigger::Select(index));
            }
        }
    }

    /// Whether a `once` run has nothing left to do.
    pub fn is_finished(&self) -> bool {
        if !self.config.once || !self.session.state().is_idle() {
            return false;
        }
        let failed = !self.engine.ui().errors().is_empty();
        if self.session.is_image_screen_open() && !failed {
            return false;
        }

        if self.config.select.is_some() {
            return self.select_pending.is_none()
                && (self.selected_done || failed || self.session.selected().is_none());
        }
        let fetched = self.session.fetched_count();
        fetched == self.session.catalog_size() || (!self.config.browse && fetched > 0) || failed
    }

    /// The engine, mutably.
    pub fn engine_mut(&mut self) -> &mut ConversationEngine<C, ConsoleUi> {
        &mut self.engine
    }

    /// Summarise the run.
    pub fn report(&self) -> WatchReport {
        let ui = self.engine.ui();
        WatchReport {
            session: self.session.summary(),
            messages: self.messages,
            images_completed: ui.images_completed(),
            errors: ui.errors().to_vec(),
        }
    }
}
