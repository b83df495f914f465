//! New-submission notification dispatch.
//!
//! A notification tells reviewers *that* feedback arrived, never *what* it
//! says. The payload is the row id plus a flag for whether contact details
//! were included; content and contact values stay encrypted in the store
//! until an authenticated read.
//!
//! Dispatch is fire-and-forget: the gateway spawns the notification after
//! the row is committed and a sink failure is logged, never surfaced to the
//! submitter.

/// Receives notification of a newly stored submission.
///
/// Implementations must tolerate being called concurrently and should treat
/// delivery as best-effort.
pub trait NotificationSink: Send + Sync + 'static {
    fn notify_new_feedback(
        &self,
        feedback_id: i64,
        has_contact_info: bool,
    ) -> impl std::future::Future<Output = Result<(), NotifyError>> + Send;
}

/// Sink that records each notification in the structured log.
///
/// The default for deployments without an outbound channel, and the sink
/// used in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    async fn notify_new_feedback(
        &self,
        feedback_id: i64,
        has_contact_info: bool,
    ) -> Result<(), NotifyError> {
        tracing::info!(feedback_id, has_contact_info, "new feedback received");
        Ok(())
    }
}

/// Notification delivery errors.
#[derive(Debug, Clone)]
pub struct NotifyError(pub String);

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "notification delivery failed: {}", self.0)
    }
}

impl std::error::Error for NotifyError {}
