//! Validated offset and limit inputs.

use thiserror::Error;

/// Query parameter carrying the zero-based item offset.
pub const OFFSET_PARAM: &str = "offset";
/// Query parameter carrying the page size.
pub const LIMIT_PARAM: &str = "limit";
/// Page size applied when the request omits `limit`.
pub const DEFAULT_LIMIT: u32 = 20;
/// Largest page size a client may request.
pub const MAX_LIMIT: u32 = 50;

/// Rejection raised for out-of-range or unparsable page parameters.
///
/// Values are never clamped into range; the caller surfaces the error to the
/// client verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidPageParameter {
    /// The offset was below zero.
    #[error("offset must be zero or greater, got {value}")]
    NegativeOffset {
        /// Offset supplied by the client.
        value: i64,
    },
    /// The limit fell outside `1..=MAX_LIMIT`.
    #[error("limit must be between 1 and {max}, got {value}")]
    LimitOutOfRange {
        /// Limit supplied by the client.
        value: i64,
        /// Upper bound in force.
        max: u32,
    },
    /// A parameter was present but not an integer.
    #[error("{name} must be an integer, got '{value}'")]
    NotAnInteger {
        /// Name of the offending query parameter.
        name: &'static str,
        /// Raw value supplied by the client.
        value: String,
    },
}

impl InvalidPageParameter {
    /// Name of the query parameter that failed validation.
    #[must_use]
    pub const fn parameter(&self) -> &'static str {
        match self {
            Self::NegativeOffset { .. } => OFFSET_PARAM,
            Self::LimitOutOfRange { .. } => LIMIT_PARAM,
            Self::NotAnInteger { name, .. } => *name,
        }
    }
}

/// Validated offset and limit for one page window.
///
/// ## Invariants
/// - `offset >= 0`
/// - `1 <= limit <= MAX_LIMIT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    offset: u64,
    limit: u32,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageParams {
    /// Validate raw signed values.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPageParameter`] when `offset` is negative or `limit`
    /// lies outside `1..=MAX_LIMIT`.
    ///
    /// # Examples
    /// ```
    /// use pagination::{InvalidPageParameter, PageParams};
    ///
    /// assert!(PageParams::new(0, 50).is_ok());
    /// assert!(matches!(
    ///     PageParams::new(0, 51),
    ///     Err(InvalidPageParameter::LimitOutOfRange { value: 51, .. })
    /// ));
    /// ```
    pub fn new(offset: i64, limit: i64) -> Result<Self, InvalidPageParameter> {
        let valid_offset = u64::try_from(offset)
            .map_err(|_| InvalidPageParameter::NegativeOffset { value: offset })?;
        let valid_limit = u32::try_from(limit)
            .ok()
            .filter(|value| (1..=MAX_LIMIT).contains(value))
            .ok_or(InvalidPageParameter::LimitOutOfRange {
                value: limit,
                max: MAX_LIMIT,
            })?;
        Ok(Self {
            offset: valid_offset,
            limit: valid_limit,
        })
    }

    /// Decode `offset` and `limit` from a raw URL query string.
    ///
    /// Missing parameters fall back to offset `0` and [`DEFAULT_LIMIT`].
    /// Other parameters are ignored. When a parameter repeats, the last
    /// occurrence wins.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPageParameter`] when a value is not an integer or is
    /// out of range.
    pub fn from_query(query: &str) -> Result<Self, InvalidPageParameter> {
        let mut offset = None;
        let mut limit = None;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if key == OFFSET_PARAM {
                offset = Some(parse_integer(OFFSET_PARAM, &value)?);
            } else if key == LIMIT_PARAM {
                limit = Some(parse_integer(LIMIT_PARAM, &value)?);
            }
        }
        Self::new(offset.unwrap_or(0), limit.unwrap_or(i64::from(DEFAULT_LIMIT)))
    }

    /// Zero-based index of the first item in the window.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Maximum number of items in the window.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }
}

fn parse_integer(name: &'static str, raw: &str) -> Result<i64, InvalidPageParameter> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| InvalidPageParameter::NotAnInteger {
            name,
            value: raw.to_owned(),
        })
}
