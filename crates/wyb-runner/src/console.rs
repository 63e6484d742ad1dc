//! Console stand-in for the watch UI.

use tracing::{debug, info, warn};
use wyb_engine::{Haptic, ImageSnapshot, Session, UiHooks};
use wyb_protocol::{IMAGE_CURRENTLY_PENDING, IMAGE_ROWS, IMAGE_WIDTH};

/// Render an image as ASCII art, one character per `x_step` by `y_step`
/// pixel cell. A cell is black if its top-left pixel is.
pub fn render_ascii(snapshot: &ImageSnapshot<'_>, x_step: usize, y_step: usize) -> String {
    let x_step = x_step.max(1);
    let y_step = y_step.max(1);
    let mut out = String::with_capacity((IMAGE_WIDTH / x_step + 1) * (IMAGE_ROWS / y_step));

    for y in (0..IMAGE_ROWS).step_by(y_step) {
        for x in (0..IMAGE_WIDTH).step_by(x_step) {
            out.push(if snapshot.is_black(x, y) { '#' } else { ' ' });
        }
        out.push('\n');
    }
    out
}

/// Logs what a watch screen would show.
#[derive(Debug, Default)]
pub struct ConsoleUi {
    render: bool,
    listed: u16,
    images_completed: u32,
    image_done: bool,
    errors: Vec<String>,
}

impl ConsoleUi {
    /// Create a console UI; `render` prints finished images.
    pub fn new(render: bool) -> Self {
        ConsoleUi {
            render,
            ..Default::default()
        }
    }

    /// Number of images that completed.
    pub fn images_completed(&self) -> u32 {
        self.images_completed
    }

    /// Errors shown so far.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Returns true once after each completed image.
    pub fn take_image_done(&mut self) -> bool {
        std::mem::take(&mut self.image_done)
    }
}

impl UiHooks for ConsoleUi {
    fn catalog_changed(&mut self, session: &Session) {
        let fetched = session.fetched_count();
        if fetched < self.listed {
            self.listed = 0;
        }

        // Only the last page is still resident
        let first = self.listed.max(fetched.saturating_sub(session.names().capacity() as u16));
        for index in first..fetched {
            if let Some(entry) = session.name_at(index) {
                info!("Watch: [{}] {} ({})", index, entry.name, entry.format);
            }
        }
        self.listed = fetched;

        if session.catalog_size() == 0 {
            info!("Watch: no barcodes on the phone");
        } else {
            debug!("Watch: {}/{} names fetched", fetched, session.catalog_size());
        }
    }

    fn open_image_screen(&mut self, index: u16) {
        if index == IMAGE_CURRENTLY_PENDING {
            info!("Watch: opening the barcode the phone has pending");
        } else {
            info!("Watch: opening barcode {}", index);
        }
    }

    fn image_updated(&mut self, session: &Session) {
        let Some(snapshot) = session.current_image_snapshot() else {
            return;
        };
        if !snapshot.complete {
            return;
        }

        self.images_completed += 1;
        self.image_done = true;
        info!("Watch: image complete");
        if self.render {
            println!("{}", render_ascii(&snapshot, 2, 4));
        }
    }

    fn show_error(&mut self, message: &str) {
        warn!("Watch: {}", message);
        self.errors.push(message.to_string());
    }

    fn haptic(&mut self, pattern: Haptic) {
        debug!("Watch: vibrate {:?}", pattern);
    }
}
