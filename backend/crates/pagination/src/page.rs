//! Page envelope with previous/next links.

use serde::Serialize;
use url::Url;

use crate::params::{LIMIT_PARAM, OFFSET_PARAM, PageParams};

/// One window of a list resource.
///
/// Serialises as `{previous, next, offset, limit, total, items}`. Absent links
/// serialise as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    previous: Option<String>,
    next: Option<String>,
    offset: u64,
    limit: u32,
    total: u64,
    items: Vec<T>,
}

impl<T> Page<T> {
    /// Build the envelope for `items` fetched at `params` out of `total`.
    ///
    /// `previous` is present iff the offset is positive and points at
    /// `max(0, offset - limit)`. `next` is present iff
    /// `offset + items.len() < total` and points at `offset + limit`. Both
    /// links keep every other query parameter of `request_url`.
    ///
    /// # Examples
    /// ```
    /// use pagination::{Page, PageParams};
    /// use url::Url;
    ///
    /// let request = Url::parse("https://example.test/posts?offset=20&limit=10&tag=rust")
    ///     .expect("valid url");
    /// let params = PageParams::new(20, 10).expect("valid params");
    /// let page = Page::encode(params, 25, vec!["a"; 5], &request);
    ///
    /// assert_eq!(
    ///     page.previous(),
    ///     Some("https://example.test/posts?tag=rust&offset=10&limit=10")
    /// );
    /// assert!(page.next().is_none());
    /// ```
    #[must_use]
    pub fn encode(params: PageParams, total: u64, items: Vec<T>, request_url: &Url) -> Self {
        let offset = params.offset();
        let limit = params.limit();
        let returned = u64::try_from(items.len()).unwrap_or(u64::MAX);

        let previous = (offset > 0).then(|| {
            link_for(
                request_url,
                offset.saturating_sub(u64::from(limit)),
                limit,
            )
        });
        let next = (offset.saturating_add(returned) < total).then(|| {
            link_for(
                request_url,
                offset.saturating_add(u64::from(limit)),
                limit,
            )
        });

        Self {
            previous,
            next,
            offset,
            limit,
            total,
            items,
        }
    }

    /// Link to the preceding window, if any.
    #[must_use]
    pub fn previous(&self) -> Option<&str> {
        self.previous.as_deref()
    }

    /// Link to the following window, if any.
    #[must_use]
    pub fn next(&self) -> Option<&str> {
        self.next.as_deref()
    }

    /// Offset of the first item in this window.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Page size requested by the client.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Total number of items across all windows.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Items materialised for this window.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Convert each item while keeping links and counters.
    #[must_use]
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            previous: self.previous,
            next: self.next,
            offset: self.offset,
            limit: self.limit,
            total: self.total,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

fn link_for(request_url: &Url, offset: u64, limit: u32) -> String {
    let retained: Vec<(String, String)> = request_url
        .query_pairs()
        .filter(|(key, _)| key != OFFSET_PARAM && key != LIMIT_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut link = request_url.clone();
    link.set_fragment(None);
    link.query_pairs_mut()
        .clear()
        .extend_pairs(retained.iter())
        .append_pair(OFFSET_PARAM, &offset.to_string())
        .append_pair(LIMIT_PARAM, &limit.to_string());
    link.into()
}

#[cfg(test)]
mod tests {
    //! Link derivation coverage for the page envelope.

    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::{Value, json};

    #[fixture]
    fn request_url() -> Url {
        Url::parse("https://api.example.test/api/v1/users?offset=0&limit=10&sort=username")
            .expect("fixture url should parse")
    }

    fn query_value(link: &str, name: &str) -> Option<String> {
        let parsed = Url::parse(link).expect("link should be absolute");
        parsed
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    #[rstest]
    fn first_page_has_next_only(request_url: Url) {
        let params = PageParams::new(0, 10).expect("valid params");
        let page = Page::encode(params, 25, vec![0_u8; 10], &request_url);

        assert!(page.previous().is_none());
        let next = page.next().expect("next link present");
        assert_eq!(query_value(next, OFFSET_PARAM).as_deref(), Some("10"));
        assert_eq!(query_value(next, LIMIT_PARAM).as_deref(), Some("10"));
    }

    #[rstest]
    fn last_partial_page_has_previous_only(request_url: Url) {
        let params = PageParams::new(20, 10).expect("valid params");
        let page = Page::encode(params, 25, vec![0_u8; 5], &request_url);

        let previous = page.previous().expect("previous link present");
        assert_eq!(query_value(previous, OFFSET_PARAM).as_deref(), Some("10"));
        assert!(page.next().is_none());
    }

    #[rstest]
    fn previous_offset_never_goes_negative(request_url: Url) {
        let params = PageParams::new(3, 10).expect("valid params");
        let page = Page::encode(params, 25, vec![0_u8; 10], &request_url);

        let previous = page.previous().expect("previous link present");
        assert_eq!(query_value(previous, OFFSET_PARAM).as_deref(), Some("0"));
    }

    #[rstest]
    fn links_keep_unrelated_query_parameters(request_url: Url) {
        let params = PageParams::new(10, 10).expect("valid params");
        let page = Page::encode(params, 25, vec![0_u8; 10], &request_url);

        for link in [page.previous(), page.next()] {
            let link = link.expect("both links present");
            assert_eq!(query_value(link, "sort").as_deref(), Some("username"));
            assert!(link.starts_with("https://api.example.test/api/v1/users?"));
        }
    }

    #[rstest]
    fn empty_collection_has_no_links(request_url: Url) {
        let page = Page::<u8>::encode(PageParams::default(), 0, Vec::new(), &request_url);

        assert!(page.previous().is_none());
        assert!(page.next().is_none());
        assert_eq!(page.total(), 0);
    }

    #[rstest]
    fn serialises_to_envelope_shape(request_url: Url) {
        let params = PageParams::new(0, 10).expect("valid params");
        let page = Page::encode(params, 1, vec!["ada"], &request_url);

        let value = serde_json::to_value(&page).expect("page should serialise");
        assert_eq!(
            value,
            json!({
                "previous": Value::Null,
                "next": Value::Null,
                "offset": 0,
                "limit": 10,
                "total": 1,
                "items": ["ada"],
            })
        );
    }

    #[rstest]
    fn map_preserves_links(request_url: Url) {
        let params = PageParams::new(0, 2).expect("valid params");
        let page = Page::encode(params, 5, vec![1_u32, 2], &request_url).map(|n| n * 10);

        assert_eq!(page.items(), &[10, 20]);
        assert!(page.next().is_some());
        assert_eq!(page.limit(), 2);
    }
}
