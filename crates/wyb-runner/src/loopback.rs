//! In-process run: the watch app talks to a simulated phone through the real
//! dictionary codec, with no sockets involved.

use std::collections::VecDeque;

use tracing::{debug, trace, warn};
use wyb_engine::{ChannelError, MessageChannel};
use wyb_protocol::{decode_inbound, DeviceMessage, Request};

use crate::app::{WatchApp, WatchReport};
use crate::config::{CatalogConfig, WatchConfig};
use crate::error::{Result, RunnerError};
use crate::phone::CompanionPhone;

/// Outbound queue depth, matching the TCP link.
pub const OUTBOX_CAPACITY: usize = 8;

/// Upper bound on request/reply steps before a run is declared runaway.
pub const MAX_STEPS: usize = 100_000;

/// Bounded in-memory outbox.
#[derive(Debug)]
pub struct QueueChannel {
    queue: VecDeque<Vec<u8>>,
    capacity: usize,
}

impl QueueChannel {
    /// Create a queue holding at most `capacity` dictionaries.
    pub fn new(capacity: usize) -> Self {
        QueueChannel {
            queue: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Take the oldest queued dictionary.
    pub fn pop(&mut self) -> Option<Vec<u8>> {
        self.queue.pop_front()
    }
}

impl MessageChannel for QueueChannel {
    fn send(&mut self, dictionary: Vec<u8>) -> std::result::Result<(), ChannelError> {
        if self.queue.len() >= self.capacity {
            return Err(ChannelError::Unavailable);
        }
        self.queue.push_back(dictionary);
        Ok(())
    }
}

/// Run the watch app against a simulated phone until the conversation goes
/// quiet and the phone has nothing left to push.
pub fn run_demo(catalog: CatalogConfig, config: WatchConfig) -> Result<WatchReport> {
    let mut phone = CompanionPhone::new(catalog);
    let mut app = WatchApp::new(QueueChannel::new(OUTBOX_CAPACITY), config);
    app.start();

    let mut steps = 0;
    loop {
        steps += 1;
        if steps > MAX_STEPS {
            return Err(RunnerError::Runaway(MAX_STEPS));
        }

        let replies = match app.engine_mut().channel_mut().pop() {
            Some(dictionary) => phone.handle(Request::decode(&dictionary)?),
            // The watch is waiting on nothing: the phone may speak first
            None => match phone.next_push() {
                Some(push) => vec![push],
                None => break,
            },
        };

        for reply in replies {
            deliver(&mut app, &reply)?;
        }

        if app.is_finished() && !phone.has_pushes() {
            break;
        }
    }

    debug!("Demo: settled after {} steps", steps);
    Ok(app.report())
}

/// Hand a phone message to the watch through the wire format, so size
/// limits apply.
fn deliver(app: &mut WatchApp<QueueChannel>, reply: &DeviceMessage) -> Result<()> {
    let bytes = reply.encode()?;
    trace!("Demo: phone -> watch {}", hex::encode(&bytes));
    match decode_inbound(&bytes) {
        Ok(dict) => app.handle_dictionary(&dict),
        Err(e) => warn!("Demo: dropping reply: {}", e),
    }
    Ok(())
}
