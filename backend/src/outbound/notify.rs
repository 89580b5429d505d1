//! Log-only notifier.

use async_trait::async_trait;
use tracing::info;

use crate::domain::ports::{Notifier, NotifyError};

/// Notifier that records each message in the log instead of sending it.
///
/// Only the address and subject are logged; bodies can carry login tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, address: &str, subject: &str, _body: &str) -> Result<(), NotifyError> {
        info!(address, subject, "notification queued");
        Ok(())
    }
}
