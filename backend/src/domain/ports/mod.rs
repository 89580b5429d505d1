//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod notifier;
mod spreadsheet;
mod storage;
mod transport;
mod waiver_renderer;

#[cfg(test)]
pub use notifier::MockNotifier;
pub use notifier::{Notifier, NotifyError};
#[cfg(test)]
pub use spreadsheet::MockSpreadsheet;
pub use spreadsheet::{SheetRow, Spreadsheet, SpreadsheetError};
pub use storage::{
    ListParams, OccurrenceAttendees, Predicate, StorageError, StorageManager, StorageResult,
};
#[cfg(test)]
pub use transport::MockJsonTransport;
pub use transport::{HttpMethod, JsonRequest, JsonTransport, TransportError};
#[cfg(test)]
pub use waiver_renderer::MockWaiverRenderer;
pub use waiver_renderer::{WaiverError, WaiverRenderer};
