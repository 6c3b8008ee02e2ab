//! Offset and limit pagination shared by backend list endpoints.
//!
//! Requests carry `offset` and `limit` query parameters. [`PageParams`]
//! validates them without clamping, and [`Page`] wraps one window of results
//! together with `previous` and `next` links derived from the request URL.
//!
//! ```
//! use pagination::{Page, PageParams};
//! use url::Url;
//!
//! let request = Url::parse("https://example.test/api/v1/users?offset=0&limit=10")
//!     .expect("valid url");
//! let params = PageParams::from_query(request.query().unwrap_or_default())
//!     .expect("valid params");
//! let page = Page::encode(params, 25, vec![0_u8; 10], &request);
//!
//! assert!(page.previous().is_none());
//! assert_eq!(
//!     page.next(),
//!     Some("https://example.test/api/v1/users?offset=10&limit=10")
//! );
//! ```

mod page;
mod params;

pub use page::Page;
pub use params::{DEFAULT_LIMIT, InvalidPageParameter, LIMIT_PARAM, MAX_LIMIT, OFFSET_PARAM, PageParams};
