//! MIME type detection module
//!
//! Guesses the `Content-Type` of a stored object from its file name when the
//! source has no better information.

use std::path::Path;

/// Fallback for names without a recognized extension
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Get MIME Content-Type based on the extension of `name`
///
/// # Examples
/// ```
/// use range_stream_proxy::http::mime::content_type_for;
/// assert_eq!(content_type_for("movie.MP4"), "video/mp4");
/// assert_eq!(content_type_for("song.flac"), "audio/flac");
/// assert_eq!(content_type_for("README"), "application/octet-stream");
/// ```
pub fn content_type_for(name: &str) -> &'static str {
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        // Video
        Some("mp4" | "m4v") => "video/mp4",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("ogv") => "video/ogg",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("ts") => "video/mp2t",
        Some("3gp") => "video/3gpp",

        // Audio
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("ogg" | "oga" | "opus") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",

        // Images
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",

        // Documents and archives
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        Some("zip") => "application/zip",
        Some("rar") => "application/vnd.rar",
        Some("7z") => "application/x-7z-compressed",
        Some("gz") => "application/gzip",
        Some("tar") => "application/x-tar",
        Some("apk") => "application/vnd.android.package-archive",

        _ => OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_types() {
        assert_eq!(content_type_for("a.mp4"), "video/mp4");
        assert_eq!(content_type_for("a.mkv"), "video/x-matroska");
        assert_eq!(content_type_for("a.WEBM"), "video/webm");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(content_type_for("archive.xyz"), OCTET_STREAM);
        assert_eq!(content_type_for("no_extension"), OCTET_STREAM);
        assert_eq!(content_type_for(".hidden"), OCTET_STREAM);
    }
}
