//! The normalised page descriptor.

use serde::Serialize;

use crate::PageMarker;

/// Backend-specific paging state. Never exposed to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Strategy {
    /// Everything fits on one page.
    Single,
    /// Numeric `page`/`per_page` paging with an explicit more-pages flag.
    Numbered { page: u32, has_more: bool },
    /// Opaque continuation tokens, forward only.
    Continuation { next_token: Option<String> },
}

/// Normalised pagination descriptor.
///
/// Every backend produces the same observable contract:
/// [`current_page_marker`](Self::current_page_marker),
/// [`next_page_marker`](Self::next_page_marker),
/// [`previous_page_marker`](Self::previous_page_marker),
/// [`has_more`](Self::has_more) and [`page_size`](Self::page_size).
///
/// ## Invariants
/// - `next_page_marker` is present exactly when `has_more` is true.
/// - Continuation pages never offer a previous page.
///
/// # Examples
/// ```
/// use pagination::Page;
///
/// let page = Page::numbered(2, 25, true);
/// assert!(page.has_more());
/// assert_eq!(page.next_page_marker().map(|m| m.to_string()), Some("3".into()));
/// assert_eq!(page.previous_page_marker().map(|m| m.to_string()), Some("1".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "PageView")]
pub struct Page {
    current: PageMarker,
    size: u32,
    strategy: Strategy,
}

impl Page {
    /// Page holding a whole, unpaged result set of `size` items.
    #[must_use]
    pub fn single(size: u32) -> Self {
        Self {
            current: PageMarker::first(),
            size,
            strategy: Strategy::Single,
        }
    }

    /// Numbered page as reported by an offset-paginated API.
    ///
    /// `page` is 1-based; zero is treated as the first page.
    #[must_use]
    pub fn numbered(page: u32, per_page: u32, has_more: bool) -> Self {
        let page = page.max(1);
        Self {
            current: PageMarker::from_number(page),
            size: per_page,
            strategy: Strategy::Numbered { page, has_more },
        }
    }

    /// Continuation page as reported by a cursor-paginated API.
    ///
    /// `current` is the marker the page was requested with (the first page
    /// is [`PageMarker::first`]); `next_token` is the raw token returned by
    /// the backend, if any.
    #[must_use]
    pub fn continuation(current: PageMarker, size: u32, next_token: Option<String>) -> Self {
        Self {
            current,
            size,
            strategy: Strategy::Continuation { next_token },
        }
    }

    /// Marker identifying this page.
    #[must_use]
    pub fn current_page_marker(&self) -> &PageMarker {
        &self.current
    }

    /// Marker to request the following page, when one exists.
    #[must_use]
    pub fn next_page_marker(&self) -> Option<PageMarker> {
        match &self.strategy {
            Strategy::Single => None,
            Strategy::Numbered { page, has_more } => has_more
                .then(|| page.checked_add(1).map(PageMarker::from_number))
                .flatten(),
            Strategy::Continuation { next_token } => next_token
                .as_deref()
                .filter(|token| !token.is_empty())
                .map(PageMarker::new),
        }
    }

    /// Marker to request the preceding page, when the backend supports it.
    #[must_use]
    pub fn previous_page_marker(&self) -> Option<PageMarker> {
        match &self.strategy {
            Strategy::Numbered { page, .. } if *page > 1 => {
                Some(PageMarker::from_number(page - 1))
            }
            _ => None,
        }
    }

    /// Whether more results follow this page.
    #[must_use]
    pub fn has_more(&self) -> bool {
        match &self.strategy {
            Strategy::Single => false,
            Strategy::Numbered { has_more, .. } => *has_more,
            Strategy::Continuation { next_token } => {
                next_token.as_deref().is_some_and(|token| !token.is_empty())
            }
        }
    }

    /// Number of items requested per page, or held by a single page.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.size
    }
}

/// Wire shape of a [`Page`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PageView {
    current_page_marker: PageMarker,
    next_page_marker: Option<PageMarker>,
    previous_page_marker: Option<PageMarker>,
    page_size: u32,
    has_more: bool,
}

impl From<Page> for PageView {
    fn from(page: Page) -> Self {
        Self {
            next_page_marker: page.next_page_marker(),
            previous_page_marker: page.previous_page_marker(),
            page_size: page.page_size(),
            has_more: page.has_more(),
            current_page_marker: page.current,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn numbered_has_more_follows_backend_flag(#[case] flag: bool) {
        let page = Page::numbered(4, 50, flag);
        assert_eq!(page.has_more(), flag);
        assert_eq!(page.next_page_marker().is_some(), flag);
    }

    #[test]
    fn numbered_first_page_has_no_previous() {
        let page = Page::numbered(1, 10, true);
        assert!(page.previous_page_marker().is_none());
        assert_eq!(page.next_page_marker(), Some(PageMarker::new("2")));
    }

    #[test]
    fn numbered_zero_is_treated_as_first_page() {
        let page = Page::numbered(0, 10, false);
        assert!(page.current_page_marker().is_first());
    }

    #[rstest]
    #[case(Some("CkAKNjBxa".to_owned()), true)]
    #[case(Some(String::new()), false)]
    #[case(None, false)]
    fn continuation_has_more_follows_token(#[case] token: Option<String>, #[case] expected: bool) {
        let page = Page::continuation(PageMarker::first(), 20, token.clone());
        assert_eq!(page.has_more(), expected);
        assert!(page.previous_page_marker().is_none());
        if expected {
            assert_eq!(
                page.next_page_marker().map(|marker| marker.to_string()),
                token
            );
        } else {
            assert!(page.next_page_marker().is_none());
        }
    }

    #[test]
    fn continuation_keeps_current_marker_verbatim() {
        let page = Page::continuation(PageMarker::new("tok-2"), 20, Some("tok-3".to_owned()));
        assert_eq!(page.current_page_marker().as_str(), "tok-2");
        assert_eq!(page.next_page_marker(), Some(PageMarker::new("tok-3")));
    }

    #[test]
    fn single_page_never_has_more() {
        let page = Page::single(12);
        assert!(!page.has_more());
        assert!(page.next_page_marker().is_none());
        assert!(page.previous_page_marker().is_none());
        assert_eq!(page.page_size(), 12);
    }

    #[test]
    fn page_serialises_observable_contract_only() {
        let value = serde_json::to_value(Page::numbered(2, 25, false)).expect("serialise page");
        assert_eq!(
            value,
            json!({
                "currentPageMarker": "2",
                "nextPageMarker": null,
                "previousPageMarker": "1",
                "pageSize": 25,
                "hasMore": false
            })
        );
    }
}
