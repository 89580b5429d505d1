//! Uniform result envelope returned by stores and services.
//!
//! A failed [`Response`] always carries a non-empty message and an
//! [`ErrorCode`]; the message and the code serialize under distinct keys so
//! neither can shadow the other on the wire.

use pagination::Page;
use serde::Serialize;

use crate::domain::error::{Error, ErrorCode};

/// `{success, data, message, error, page}` envelope.
///
/// ## Invariants
/// - `success == false` implies `error.is_some()` and a non-blank message.
/// - `data` on failure is always `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response<T> {
    success: bool,
    data: Option<T>,
    message: String,
    error: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<Page>,
}

impl<T> Response<T> {
    /// Successful response carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: String::new(),
            error: None,
            page: None,
        }
    }

    /// Successful response carrying one page of results.
    pub fn ok_page(data: T, page: Page) -> Self {
        Self {
            page: Some(page),
            ..Self::ok(data)
        }
    }

    /// Failed response built from a domain error.
    pub fn failure(error: &Error) -> Self {
        Self {
            success: false,
            data: None,
            message: error.message().to_owned(),
            error: Some(error.code()),
            page: None,
        }
    }

    /// Failed response converted from any error with a domain mapping.
    pub fn from_error(error: impl Into<Error>) -> Self {
        Self::failure(&error.into())
    }

    /// `not_found` failure.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::failure(&Error::not_found(message))
    }

    /// Replace the message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        if self.success || !message.trim().is_empty() {
            self.message = message;
        }
        self
    }

    /// Whether the operation succeeded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Borrow the payload.
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Take the payload.
    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Human-readable outcome.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Failure category, when the operation failed.
    pub fn error(&self) -> Option<ErrorCode> {
        self.error
    }

    /// Pagination state for list results.
    pub fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    /// Whether this is a `not_found` failure.
    pub fn is_not_found(&self) -> bool {
        self.error == Some(ErrorCode::NotFound)
    }

    /// Transform the payload, keeping status, message and page.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        Response {
            success: self.success,
            data: self.data.map(f),
            message: self.message,
            error: self.error,
            page: self.page,
        }
    }

    /// Convert into a `Result`, rebuilding the domain error on failure.
    ///
    /// # Errors
    ///
    /// Returns the recorded failure, or an internal error when a successful
    /// response carries no data.
    pub fn into_result(self) -> Result<T, Error> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(Error::internal("successful response carried no data")),
            (false, _) => Err(Error::new(
                self.error.unwrap_or(ErrorCode::InternalError),
                self.message,
            )),
        }
    }
}

impl<T> From<Error> for Response<T> {
    fn from(error: Error) -> Self {
        Self::failure(&error)
    }
}
