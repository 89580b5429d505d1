//! Caller-side page requests.

use crate::{PageMarker, PageMarkerError};

/// Which page a caller wants, expressed in backend-neutral terms.
///
/// A request without a marker asks for the first page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    marker: Option<PageMarker>,
    size: Option<u32>,
}

impl PageRequest {
    /// Request for the first page with the backend's default size.
    #[must_use]
    pub fn first() -> Self {
        Self::default()
    }

    /// Request the page identified by `marker`.
    #[must_use]
    pub fn at(marker: PageMarker) -> Self {
        Self {
            marker: Some(marker),
            size: None,
        }
    }

    /// Override the page size.
    #[must_use]
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// The requested marker, if any.
    #[must_use]
    pub fn marker(&self) -> Option<&PageMarker> {
        self.marker.as_ref()
    }

    /// Requested page size, falling back to `default`.
    #[must_use]
    pub fn size_or(&self, default: u32) -> u32 {
        self.size.unwrap_or(default)
    }

    /// The current marker as seen by the backend; absent means first page.
    #[must_use]
    pub fn current_marker(&self) -> PageMarker {
        self.marker.clone().unwrap_or_else(PageMarker::first)
    }

    /// Interpret the request for a numbered backend.
    ///
    /// # Errors
    ///
    /// Returns [`PageMarkerError::NotNumeric`] when the marker is a
    /// continuation token rather than a page number.
    pub fn page_number(&self) -> Result<u32, PageMarkerError> {
        self.marker.as_ref().map_or(Ok(1), PageMarker::page_number)
    }

    /// Interpret the request for a continuation-token backend.
    ///
    /// The token is passed back verbatim; the first-page marker means no
    /// token at all.
    #[must_use]
    pub fn continuation_token(&self) -> Option<&str> {
        self.marker
            .as_ref()
            .filter(|marker| !marker.is_first() && !marker.as_str().is_empty())
            .map(PageMarker::as_str)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[test]
    fn first_request_maps_to_page_one_and_no_token() {
        let request = PageRequest::first();
        assert_eq!(request.page_number(), Ok(1));
        assert!(request.continuation_token().is_none());
        assert!(request.current_marker().is_first());
    }

    #[rstest]
    #[case("1", None)]
    #[case("", None)]
    #[case("CkAKNjBx", Some("CkAKNjBx"))]
    #[case("42", Some("42"))]
    fn continuation_tokens_are_verbatim(#[case] raw: &str, #[case] expected: Option<&str>) {
        let request = PageRequest::at(PageMarker::new(raw));
        assert_eq!(request.continuation_token(), expected);
    }

    #[test]
    fn tokens_are_not_page_numbers() {
        let request = PageRequest::at(PageMarker::new("CkAKNjBx"));
        assert!(request.page_number().is_err());
    }

    #[test]
    fn size_falls_back_to_default() {
        assert_eq!(PageRequest::first().size_or(200), 200);
        assert_eq!(PageRequest::first().with_size(5).size_or(200), 5);
    }
}
