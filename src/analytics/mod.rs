//! Visit analytics
//!
//! Every resolved redirect produces one [`AnalyticsEvent`] that is posted to
//! an ingestion endpoint from a detached task. Delivery is best-effort: the
//! redirect never waits for it and failures are only logged.

pub mod models;
pub mod reporter;
pub mod sink;

pub use models::{AnalyticsEvent, EventValidationError};
pub use reporter::AnalyticsReporter;
pub use sink::{EventSink, HttpEventSink, SinkError};
