// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Delivery of domain events to the notification collaborator.
//!
//! Events are delivered after the transition they describe has committed.
//! A delivery failure is logged and otherwise ignored.

use consult_sched::{AssignmentNotice, DomainEvent};
use tracing::{info, warn};

/// A failed notification delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyError {
    /// What went wrong.
    pub message: String,
}

impl NotifyError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Notification failed: {}", self.message)
    }
}

impl std::error::Error for NotifyError {}

/// Receives domain events for delivery to hospitals and doctors.
pub trait Notifier: Send + Sync {
    /// Delivers one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event could not be delivered.
    fn notify(&self, event: &DomainEvent) -> Result<(), NotifyError>;
}

/// A notifier that records each event as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, event: &DomainEvent) -> Result<(), NotifyError> {
        let notice: &AssignmentNotice = event.notice();
        info!(
            event = event.kind(),
            assignment_id = notice.assignment_id,
            hospital_id = notice.hospital_id,
            doctor_id = notice.doctor_id,
            priority = %notice.priority,
            status = %notice.status,
            "Domain event"
        );
        Ok(())
    }
}

/// Hands an event to the notifier, logging instead of failing.
pub(crate) fn deliver(notifier: &dyn Notifier, event: &DomainEvent) {
    if let Err(e) = notifier.notify(event) {
        warn!(
            event = event.kind(),
            assignment_id = event.notice().assignment_id,
            error = %e,
            "Notification delivery failed"
        );
    }
}
