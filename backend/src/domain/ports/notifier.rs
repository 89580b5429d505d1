//! Port for outbound notifications such as login token mail.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by notification adapters.
    pub enum NotifyError {
        /// The message could not be handed off.
        Delivery { message: String } =>
            ServiceUnavailable: "notification delivery failed: {message}",
    }
}

/// Fire-and-forget message dispatch.
///
/// Callers log failures and carry on; delivery is never confirmed back to
/// the domain.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `body` to `address` under `subject`.
    async fn notify(&self, address: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}
