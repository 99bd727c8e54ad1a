use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::models::AnalyticsEvent;
use super::sink::EventSink;
use crate::models::LinkRecord;
use crate::visitor::VisitorContext;

/// Fire-and-forget analytics dispatch
///
/// `report` spawns a detached task and returns at once. The task validates,
/// sends once under a deadline and logs whatever goes wrong; nothing is
/// retried and nothing reaches the caller.
#[derive(Clone)]
pub struct AnalyticsReporter {
    sink: Option<Arc<dyn EventSink>>,
    send_timeout: Duration,
    anonymize_ip: bool,
}

impl AnalyticsReporter {
    pub fn new(sink: Arc<dyn EventSink>, send_timeout: Duration, anonymize_ip: bool) -> Self {
        Self {
            sink: Some(sink),
            send_timeout,
            anonymize_ip,
        }
    }

    /// A reporter that drops every event
    pub fn disabled() -> Self {
        Self {
            sink: None,
            send_timeout: Duration::ZERO,
            anonymize_ip: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Build the event for a resolved visit and report it.
    pub fn report_visit(&self, link: &LinkRecord, ctx: &VisitorContext) {
        if !self.is_enabled() {
            return;
        }
        self.report(AnalyticsEvent::from_visit(link, ctx, self.anonymize_ip));
    }

    pub fn report(&self, event: AnalyticsEvent) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        let send_timeout = self.send_timeout;

        tokio::spawn(async move {
            if let Err(err) = event.validate() {
                warn!(link_id = %event.link_id, error = %err, "dropping invalid analytics event");
                return;
            }

            match tokio::time::timeout(send_timeout, sink.send(&event)).await {
                Ok(Ok(())) => debug!(link_id = %event.link_id, "analytics event delivered"),
                Ok(Err(err)) => {
                    warn!(link_id = %event.link_id, error = %err, "failed to deliver analytics event")
                }
                Err(_) => warn!(
                    link_id = %event.link_id,
                    timeout_ms = send_timeout.as_millis() as u64,
                    "analytics delivery timed out"
                ),
            }
        });
    }
}
