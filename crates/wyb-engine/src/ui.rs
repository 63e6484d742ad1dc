//! Notifications from the engine to the UI layer.

use crate::state::Session;

/// Vibration patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Haptic {
    /// Short pulse: an image finished.
    Completed,
    /// Long pulse: the phone reported an error.
    Error,
}

/// Callbacks the engine makes into the UI.
///
/// All methods default to doing nothing. The session passed in is already
/// updated when a hook runs.
pub trait UiHooks {
    /// The catalog length or the visible names changed.
    fn catalog_changed(&mut self, _session: &Session) {}

    /// Open the image screen for `index` (or the pending-image sentinel).
    fn open_image_screen(&mut self, _index: u16) {}

    /// The image buffer changed or completed.
    fn image_updated(&mut self, _session: &Session) {}

    /// Show an error message.
    fn show_error(&mut self, _message: &str) {}

    /// Vibrate.
    fn haptic(&mut self, _pattern: Haptic) {}
}

impl<U: UiHooks + ?Sized> UiHooks for &mut U {
    fn catalog_changed(&mut self, session: &Session) {
        (**self).catalog_changed(session)
    }

    fn open_image_screen(&mut self, index: u16) {
        (**self).open_image_screen(index)
    }

    fn image_updated(&mut self, session: &Session) {
        (**self).image_updated(session)
    }

    fn show_error(&mut self, message: &str) {
        (**self).show_error(message)
    }

    fn haptic(&mut self, pattern: Haptic) {
        (**self).haptic(pattern)
    }
}

/// A UI that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullUi;

impl UiHooks for NullUi {}
