//! Metric declarations for the conversation engine.
//!
//! Every metric is a [`Metric`] constant so names are never typed twice:
//!
//! ```rust,ignore
//! use wyb_engine::metrics::{describe_metrics, metric_defs};
//!
//! describe_metrics();
//! metrics::counter!(metric_defs::REQUESTS_SENT.name, "request" => "Name").increment(1);
//! ```

use metrics::{describe_counter, describe_histogram, Unit};

/// The kind of metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A histogram for recording distributions.
    Histogram,
}

/// A metric declaration with its metadata.
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g. "wyb.requests.sent").
    pub name: &'static str,
    /// Counter or histogram.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// Unit of measurement, if any.
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    /// Declare a counter.
    pub const fn counter(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Counter,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Declare a histogram.
    pub const fn histogram(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Histogram,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Set the description.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Set the unit.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Set the expected label keys.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Register this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => describe_counter!(self.name, unit, self.description),
            (MetricKind::Counter, None) => describe_counter!(self.name, self.description),
            (MetricKind::Histogram, Some(unit)) => describe_histogram!(self.name, unit, self.description),
            (MetricKind::Histogram, None) => describe_histogram!(self.name, self.description),
        }
    }
}

/// All metric definitions of the engine.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Requests
    // ========================================================================

    /// Requests accepted by the channel.
    ///
    /// Labels: request
    pub const REQUESTS_SENT: Metric = Metric::counter("wyb.requests.sent")
        .with_description("Requests accepted by the message channel")
        .with_unit(Unit::Count)
        .with_labels(&["request"]);

    /// Requests the channel refused.
    ///
    /// Labels: request
    pub const REQUESTS_DROPPED: Metric = Metric::counter("wyb.requests.dropped")
        .with_description("Requests dropped because the channel was unavailable")
        .with_unit(Unit::Count)
        .with_labels(&["request"]);

    // ========================================================================
    // Inbound
    // ========================================================================

    /// Messages that did not match the current state.
    ///
    /// Labels: state, message
    pub const MESSAGES_IGNORED: Metric = Metric::counter("wyb.messages.ignored")
        .with_description("Inbound messages ignored in the current state")
        .with_unit(Unit::Count)
        .with_labels(&["state", "message"]);

    /// Error messages pushed by the phone.
    pub const DEVICE_ERRORS: Metric = Metric::counter("wyb.device.errors")
        .with_description("Error messages received from the phone")
        .with_unit(Unit::Count);

    // ========================================================================
    // Image
    // ========================================================================

    /// Image rows written to the buffer.
    pub const IMAGE_ROWS_WRITTEN: Metric = Metric::counter("wyb.image.rows_written")
        .with_description("Image rows written into the buffer")
        .with_unit(Unit::Count);

    /// Image rows dropped for falling outside the buffer.
    pub const IMAGE_ROWS_DROPPED: Metric = Metric::counter("wyb.image.rows_dropped")
        .with_description("Image rows dropped for being out of bounds")
        .with_unit(Unit::Count);

    /// Rows per completed transfer.
    pub const IMAGE_ROWS_PER_TRANSFER: Metric = Metric::histogram("wyb.image.rows_per_transfer")
        .with_description("Rows written per completed image transfer")
        .with_unit(Unit::Count);

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Catalog reads started.
    pub const CATALOG_REFRESHES: Metric = Metric::counter("wyb.catalog.refreshes")
        .with_description("Catalog reads started")
        .with_unit(Unit::Count);

    /// Every metric above.
    pub const ALL: &[Metric] = &[
        REQUESTS_SENT,
        REQUESTS_DROPPED,
        MESSAGES_IGNORED,
        DEVICE_ERRORS,
        IMAGE_ROWS_WRITTEN,
        IMAGE_ROWS_DROPPED,
        IMAGE_ROWS_PER_TRANSFER,
        CATALOG_REFRESHES,
    ];
}

/// Describe all engine metrics. Call once after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
