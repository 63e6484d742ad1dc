//! Outbound side of the conversation: the channel seam and the request
//! encoder that feeds it.

use thiserror::Error;
use tracing::{trace, warn};
use wyb_protocol::{ProtocolError, Request};

use crate::metrics::metric_defs;

/// Errors raised when handing a request to the channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The channel cannot take another message right now.
    #[error("message channel unavailable")]
    Unavailable,

    /// The request could not be encoded.
    #[error("failed to encode request: {0}")]
    Encode(#[from] ProtocolError),
}

/// Asynchronous, fire-and-forget link to the phone.
///
/// `send` receives one encoded request dictionary. Replies come back as
/// separate inbound messages; nothing is acknowledged.
pub trait MessageChannel {
    /// Queue an encoded dictionary for transmission.
    fn send(&mut self, dictionary: Vec<u8>) -> Result<(), ChannelError>;
}

impl<C: MessageChannel + ?Sized> MessageChannel for &mut C {
    fn send(&mut self, dictionary: Vec<u8>) -> Result<(), ChannelError> {
        (**self).send(dictionary)
    }
}

impl<C: MessageChannel + ?Sized> MessageChannel for Box<C> {
    fn send(&mut self, dictionary: Vec<u8>) -> Result<(), ChannelError> {
        (**self).send(dictionary)
    }
}

/// Builds single-tuple requests and submits them.
///
/// Stateless: nothing waits for a reply, and nothing is retried. A request
/// the channel refuses is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestEncoder;

impl RequestEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        RequestEncoder
    }

    /// Encode `request` and hand it to `channel`.
    ///
    /// Returns whether the channel accepted it. Failures are logged and
    /// counted here; callers only need the flag for their own bookkeeping.
    pub fn request<C: MessageChannel>(&self, channel: &mut C, request: Request) -> bool {
        let result = request
            .encode()
            .map_err(ChannelError::from)
            .and_then(|bytes| channel.send(bytes));

        match result {
            Ok(()) => {
                trace!("Encoder: sent {} {}", request.name(), request.payload());
                metrics::counter!(metric_defs::REQUESTS_SENT.name, "request" => request.name()).increment(1);
                true
            }
            Err(e) => {
                warn!("Encoder: dropped {} {}: {}", request.name(), request.payload(), e);
                metrics::counter!(metric_defs::REQUESTS_DROPPED.name, "request" => request.name()).increment(1);
                false
            }
        }
    }
}
