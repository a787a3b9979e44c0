//! HTTP Range negotiation module
//!
//! Turns an optional `Range` request header into the byte range to relay and
//! the status the response will carry, compliant with RFC 7233 for the single
//! range case.

use hyper::StatusCode;
use thiserror::Error;

/// Inclusive byte range within an object, `start <= end < size`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered by the range
    #[inline]
    pub const fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Why a `Range` header was rejected. Every variant results in `416`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("malformed Range header {0:?}")]
    Malformed(String),

    #[error("multiple byte ranges are not supported")]
    MultipleRanges,

    #[error("range start {start} is beyond the last byte")]
    StartOutOfBounds { start: u64 },

    #[error("range end {end} precedes start {start}")]
    EndBeforeStart { start: u64, end: u64 },

    #[error("empty suffix range")]
    EmptySuffix,
}

/// Outcome of range negotiation for an object of known size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Negotiated {
    /// No `Range` header, the entire object is sent with `200 OK`
    Full { size: u64 },
    /// The requested slice is sent with `206 Partial Content`
    Partial { range: ByteRange, size: u64 },
}

impl Negotiated {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Full { .. } => StatusCode::OK,
            Self::Partial { .. } => StatusCode::PARTIAL_CONTENT,
        }
    }

    /// Bytes to relay. `None` only for a full response of an empty object.
    pub const fn range(&self) -> Option<ByteRange> {
        match *self {
            Self::Full { size: 0 } => None,
            Self::Full { size } => Some(ByteRange {
                start: 0,
                end: size - 1,
            }),
            Self::Partial { range, .. } => Some(range),
        }
    }

    pub const fn content_length(&self) -> u64 {
        match self.range() {
            Some(range) => range.content_length(),
            None => 0,
        }
    }

    /// Value of the `Content-Range` header, only present for partial responses
    pub fn content_range(&self) -> Option<String> {
        match self {
            Self::Full { .. } => None,
            Self::Partial { range, size } => {
                Some(format!("bytes {}-{}/{size}", range.start, range.end))
            }
        }
    }
}

/// Negotiate the response range for an object of `size` bytes.
///
/// Supported formats:
/// - no header - entire object
/// - `bytes=start-end` - specific range, end clamped to the last byte
/// - `bytes=start-` - from start to the end of the object
/// - `bytes=-suffix` - last suffix bytes
///
/// Anything else, including multiple ranges, is rejected.
///
/// # Examples
/// ```
/// use range_stream_proxy::http::range::{negotiate, ByteRange, Negotiated};
///
/// let negotiated = negotiate(Some("bytes=0-99"), 1000).unwrap();
/// assert_eq!(
///     negotiated,
///     Negotiated::Partial { range: ByteRange { start: 0, end: 99 }, size: 1000 }
/// );
///
/// assert_eq!(negotiate(None, 1000).unwrap(), Negotiated::Full { size: 1000 });
/// assert!(negotiate(Some("bytes=abc-def"), 1000).is_err());
/// ```
pub fn negotiate(range_header: Option<&str>, size: u64) -> Result<Negotiated, RangeError> {
    let Some(header) = range_header else {
        return Ok(Negotiated::Full { size });
    };

    let range = parse_byte_range(header, size)?;
    Ok(Negotiated::Partial { range, size })
}

fn parse_byte_range(header: &str, size: u64) -> Result<ByteRange, RangeError> {
    let malformed = || RangeError::Malformed(header.to_owned());

    let spec = header.trim().strip_prefix("bytes=").ok_or_else(malformed)?;
    if spec.contains(',') {
        return Err(RangeError::MultipleRanges);
    }

    let (start, end) = spec.split_once('-').ok_or_else(malformed)?;
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        let suffix = parse_bound(end).ok_or_else(malformed)?;
        return suffix_range(suffix, size);
    }

    let start = parse_bound(start).ok_or_else(malformed)?;
    if start >= size {
        return Err(RangeError::StartOutOfBounds { start });
    }

    let end = if end.is_empty() {
        size - 1
    } else {
        let end = parse_bound(end).ok_or_else(malformed)?;
        if end < start {
            return Err(RangeError::EndBeforeStart { start, end });
        }
        end.min(size - 1)
    };

    Ok(ByteRange { start, end })
}

/// Suffix range (e.g. "-500"), a suffix larger than the object selects all of it
fn suffix_range(suffix: u64, size: u64) -> Result<ByteRange, RangeError> {
    if suffix == 0 {
        return Err(RangeError::EmptySuffix);
    }
    if size == 0 {
        return Err(RangeError::StartOutOfBounds { start: 0 });
    }
    Ok(ByteRange {
        start: size.saturating_sub(suffix),
        end: size - 1,
    })
}

/// Parse a non-negative decimal bound. `u64::from_str` alone would accept a
/// leading `+`.
fn parse_bound(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partial(header: &str, size: u64) -> ByteRange {
        match negotiate(Some(header), size) {
            Ok(Negotiated::Partial { range, size: s }) => {
                assert_eq!(s, size);
                range
            }
            other => panic!("Expected partial range for {header:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_no_range() {
        let negotiated = negotiate(None, 100).unwrap();
        assert_eq!(negotiated, Negotiated::Full { size: 100 });
        assert_eq!(negotiated.status(), StatusCode::OK);
        assert_eq!(negotiated.range(), Some(ByteRange { start: 0, end: 99 }));
        assert_eq!(negotiated.content_length(), 100);
        assert_eq!(negotiated.content_range(), None);
    }

    #[test]
    fn test_empty_object() {
        let negotiated = negotiate(None, 0).unwrap();
        assert_eq!(negotiated.range(), None);
        assert_eq!(negotiated.content_length(), 0);

        assert_eq!(
            negotiate(Some("bytes=0-"), 0),
            Err(RangeError::StartOutOfBounds { start: 0 })
        );
        assert_eq!(
            negotiate(Some("bytes=-5"), 0),
            Err(RangeError::StartOutOfBounds { start: 0 })
        );
    }

    #[test]
    fn test_standard_range() {
        let negotiated = negotiate(Some("bytes=0-9"), 100).unwrap();
        assert_eq!(negotiated.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(negotiated.content_length(), 10);
        assert_eq!(negotiated.content_range().as_deref(), Some("bytes 0-9/100"));
    }

    #[test]
    fn test_open_range() {
        assert_eq!(partial("bytes=50-", 100), ByteRange { start: 50, end: 99 });
    }

    #[test]
    fn test_suffix_range() {
        assert_eq!(partial("bytes=-20", 100), ByteRange { start: 80, end: 99 });
        assert_eq!(partial("bytes=-500", 100), ByteRange { start: 0, end: 99 });
        assert_eq!(negotiate(Some("bytes=-0"), 100), Err(RangeError::EmptySuffix));
    }

    #[test]
    fn test_end_clamped_to_object() {
        assert_eq!(partial("bytes=90-500", 100), ByteRange { start: 90, end: 99 });
    }

    #[test]
    fn test_every_valid_range_is_returned_verbatim() {
        for size in 1..=12u64 {
            for start in 0..size {
                for end in start..size {
                    let header = format!("bytes={start}-{end}");
                    let negotiated = negotiate(Some(&header), size).unwrap();
                    assert_eq!(negotiated.status(), StatusCode::PARTIAL_CONTENT);
                    assert_eq!(negotiated.range(), Some(ByteRange { start, end }));
                    assert_eq!(negotiated.content_length(), end - start + 1);
                }
            }
        }
    }

    #[test]
    fn test_single_byte_boundaries() {
        let range = partial("bytes=7-7", 100);
        assert_eq!(range.content_length(), 1);

        let negotiated = negotiate(Some("bytes=99-99"), 100).unwrap();
        assert_eq!(negotiated.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(negotiated.content_range().as_deref(), Some("bytes 99-99/100"));
        assert_eq!(negotiated.content_length(), 1);
    }

    #[test]
    fn test_not_satisfiable() {
        assert_eq!(
            negotiate(Some("bytes=200-"), 100),
            Err(RangeError::StartOutOfBounds { start: 200 })
        );
        assert_eq!(
            negotiate(Some("bytes=100-100"), 100),
            Err(RangeError::StartOutOfBounds { start: 100 })
        );
        assert_eq!(
            negotiate(Some("bytes=500-100"), 1000),
            Err(RangeError::EndBeforeStart {
                start: 500,
                end: 100
            })
        );
    }

    #[test]
    fn test_invalid_format() {
        for header in [
            "bytes=abc-def",
            "bytes=a-b",
            "bytes=",
            "bytes=-",
            "bytes=5",
            "bytes=+5-10",
            "bytes=5--10",
            "bytes=1-2-3",
            "items=0-9",
            "0-9",
            "",
            "bytes=99999999999999999999999-",
        ] {
            assert!(
                matches!(negotiate(Some(header), 100), Err(RangeError::Malformed(_))),
                "Expected {header:?} to be malformed"
            );
        }
    }

    #[test]
    fn test_multiple_ranges() {
        assert_eq!(
            negotiate(Some("bytes=0-10,20-30"), 100),
            Err(RangeError::MultipleRanges)
        );
    }

    #[test]
    fn test_whitespace_tolerated() {
        assert_eq!(partial(" bytes= 10 - 20 ", 100), ByteRange { start: 10, end: 20 });
    }

    #[test]
    fn test_large_object_scenario() {
        let negotiated = negotiate(Some("bytes=2000000-2999999"), 10_000_000).unwrap();
        assert_eq!(
            negotiated.content_range().as_deref(),
            Some("bytes 2000000-2999999/10000000")
        );
        assert_eq!(negotiated.content_length(), 1_000_000);
    }
}
