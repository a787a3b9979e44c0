//! `Content-Disposition` header construction
//!
//! The same object can be requested for download or for in-browser playback,
//! the only difference being the disposition type.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// RFC 5987 `attr-char` set: everything outside of it gets percent-encoded
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// What the client intends to do with the object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Save to disk (`attachment`)
    Download,
    /// Play or display in place (`inline`)
    Watch,
}

impl Intent {
    /// Route segment that selects this intent
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "download" => Some(Self::Download),
            "watch" => Some(Self::Watch),
            _ => None,
        }
    }

    pub const fn disposition_type(self) -> &'static str {
        match self {
            Self::Download => "attachment",
            Self::Watch => "inline",
        }
    }
}

/// Build the header value for `name`.
///
/// The plain `filename` parameter carries an ASCII-only fallback, the
/// `filename*` parameter carries the exact name percent-encoded as UTF-8.
///
/// # Examples
/// ```
/// use range_stream_proxy::http::disposition::{content_disposition, Intent};
///
/// assert_eq!(
///     content_disposition(Intent::Watch, "clip.mp4"),
///     "inline; filename=\"clip.mp4\"; filename*=UTF-8''clip.mp4"
/// );
/// ```
pub fn content_disposition(intent: Intent, name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let encoded = utf8_percent_encode(name, ATTR_CHAR);

    format!(
        "{}; filename=\"{fallback}\"; filename*=UTF-8''{encoded}",
        intent.disposition_type()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_from_segment() {
        assert_eq!(Intent::from_segment("download"), Some(Intent::Download));
        assert_eq!(Intent::from_segment("watch"), Some(Intent::Watch));
        assert_eq!(Intent::from_segment("stream"), None);
    }

    #[test]
    fn test_download_is_attachment() {
        assert_eq!(
            content_disposition(Intent::Download, "report.pdf"),
            "attachment; filename=\"report.pdf\"; filename*=UTF-8''report.pdf"
        );
    }

    #[test]
    fn test_spaces_and_quotes() {
        let value = content_disposition(Intent::Watch, "my \"best\" clip.mp4");
        assert_eq!(
            value,
            "inline; filename=\"my _best_ clip.mp4\"; filename*=UTF-8''my%20%22best%22%20clip.mp4"
        );
    }

    #[test]
    fn test_non_ascii_name() {
        let value = content_disposition(Intent::Download, "චිත්‍රපටය.mkv");
        assert!(value.starts_with("attachment; filename=\""));
        assert!(value.is_ascii());
        assert!(value.contains("filename*=UTF-8''%E0%B6%A0%E0%B7%92"));
        assert!(value.ends_with(".mkv"));
    }
}
