//! Opaque page markers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Marker conventionally used for the very first page of any listing.
const FIRST_PAGE: &str = "1";

/// Errors raised when a marker is interpreted as a page number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageMarkerError {
    /// The marker is not a positive integer.
    #[error("page marker `{marker}` is not a page number")]
    NotNumeric {
        /// Offending marker text.
        marker: String,
    },
}

/// Opaque position within a paged listing.
///
/// Markers are passed back to the backend verbatim. Only numbered backends
/// interpret them, through [`PageMarker::page_number`].
///
/// # Examples
/// ```
/// use pagination::PageMarker;
///
/// let marker = PageMarker::new("CiAKGjBpNDd2Nmp2");
/// assert_eq!(marker.as_str(), "CiAKGjBpNDd2Nmp2");
/// assert!(PageMarker::first().is_first());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageMarker(String);

impl PageMarker {
    /// Wrap raw marker text.
    #[must_use]
    pub fn new(marker: impl Into<String>) -> Self {
        Self(marker.into())
    }

    /// Marker for the first page.
    #[must_use]
    pub fn first() -> Self {
        Self(FIRST_PAGE.to_owned())
    }

    /// Marker for a numbered page.
    #[must_use]
    pub fn from_number(page: u32) -> Self {
        Self(page.to_string())
    }

    /// Whether this marker denotes the first page.
    #[must_use]
    pub fn is_first(&self) -> bool {
        self.0 == FIRST_PAGE
    }

    /// Borrow the raw marker text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Interpret the marker as a 1-based page number.
    ///
    /// # Errors
    ///
    /// Returns [`PageMarkerError::NotNumeric`] when the marker is not a
    /// positive integer.
    pub fn page_number(&self) -> Result<u32, PageMarkerError> {
        match self.0.trim().parse::<u32>() {
            Ok(page) if page >= 1 => Ok(page),
            _ => Err(PageMarkerError::NotNumeric {
                marker: self.0.clone(),
            }),
        }
    }
}

impl fmt::Display for PageMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageMarker {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PageMarker {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1", Ok(1))]
    #[case("17", Ok(17))]
    #[case(" 3 ", Ok(3))]
    fn numeric_markers_parse(#[case] raw: &str, #[case] expected: Result<u32, ()>) {
        let parsed = PageMarker::new(raw).page_number().map_err(|_| ());
        assert_eq!(parsed, expected);
    }

    #[rstest]
    #[case("0")]
    #[case("-2")]
    #[case("CiAKGjBpNDd2")]
    #[case("")]
    fn non_numeric_markers_are_rejected(#[case] raw: &str) {
        let err = PageMarker::new(raw)
            .page_number()
            .expect_err("marker must not parse");
        assert_eq!(
            err,
            PageMarkerError::NotNumeric {
                marker: raw.to_owned()
            }
        );
    }

    #[test]
    fn first_marker_is_one() {
        assert_eq!(PageMarker::first().as_str(), "1");
        assert!(PageMarker::from_number(1).is_first());
        assert!(!PageMarker::from_number(2).is_first());
    }
}
