//! Test utilities for the membership crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is compiled for tests and under the
//! `test-support` feature.

mod clock;
mod doubles;
mod transport;

pub use clock::MutableClock;
pub use doubles::{FixedTokenSource, RecordingNotifier, SentMessage, StaticWaiverRenderer};
pub use transport::RecordingTransport;
