//! Port for rendering signed waivers into stored documents.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Entity, Member};

use super::define_port_error;

define_port_error! {
    /// Errors raised by waiver renderers.
    pub enum WaiverError {
        /// The document could not be produced or stored.
        Render { message: String } =>
            ServiceUnavailable: "waiver rendering failed: {message}",
    }
}

/// Produces a document for a finalised waiver and returns its link.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WaiverRenderer: Send + Sync {
    /// Render the waiver `member` signed at `signed_at`.
    async fn render(
        &self,
        member: &Entity<Member>,
        signed_at: DateTime<Utc>,
    ) -> Result<String, WaiverError>;
}
