//! Failure classification for yt-dlp diagnostics

use super::traits::FailureReason;

const MAX_DETAIL_CHARS: usize = 300;

// Checked in order; the first table with a matching needle wins.
const FORMAT_PROBLEMS: &[&str] = &["requested format is not available", "no video formats"];

const UNSUPPORTED: &[&str] = &[
    "unsupported url",
    "is not a valid url",
    "no suitable extractor",
    "invalid url",
];

const RESTRICTED: &[&str] = &[
    "private",
    "http error 401",
    "http error 403",
    "forbidden",
    "login required",
    "log in",
    "sign in",
    "cookies",
    "age-restricted",
    "age restricted",
    "not available in your country",
    "geo restriction",
    "geo-restricted",
];

const NOT_FOUND: &[&str] = &[
    "http error 404",
    "http error 410",
    "video unavailable",
    "not available",
    "has been removed",
    "does not exist",
    "status code 10204",
    "couldn't find",
];

const NETWORK: &[&str] = &[
    "timed out",
    "timeout",
    "http error 429",
    "too many requests",
    "http error 5",
    "connection",
    "network is unreachable",
    "name resolution",
    "getaddrinfo",
    "ssl",
    "unable to download webpage",
];

/// Map yt-dlp stderr onto the closed set of report reasons
pub fn classify_failure(stderr: &str) -> FailureReason {
    let lower = stderr.to_lowercase();
    let matches = |needles: &[&str]| needles.iter().any(|needle| lower.contains(needle));

    if matches(FORMAT_PROBLEMS) {
        FailureReason::Unknown
    } else if matches(UNSUPPORTED) {
        FailureReason::UnsupportedUrl
    } else if matches(RESTRICTED) {
        FailureReason::Restricted
    } else if matches(NOT_FOUND) {
        FailureReason::NotFound
    } else if matches(NETWORK) {
        FailureReason::NetworkError
    } else {
        FailureReason::Unknown
    }
}

/// Pick the most useful line of tool output for the report.
///
/// Prefers the last `ERROR:` line, falls back to the last non-empty line,
/// and caps the result length.
pub fn summarize_failure(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let line = lines
        .iter()
        .rev()
        .find_map(|line| line.strip_prefix("ERROR:"))
        .or_else(|| lines.last().copied())
        .unwrap_or("no diagnostic output")
        .trim();

    if line.chars().count() > MAX_DETAIL_CHARS {
        let truncated: String = line.chars().take(MAX_DETAIL_CHARS).collect();
        format!("{truncated}...")
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_not_found() {
        assert_eq!(
            classify_failure("ERROR: [TikTok] 7301: Video unavailable"),
            FailureReason::NotFound
        );
        assert_eq!(
            classify_failure("ERROR: Unable to download webpage: HTTP Error 404: Not Found"),
            FailureReason::NotFound
        );
    }

    #[test]
    fn test_classify_restricted() {
        assert_eq!(
            classify_failure("ERROR: This video is private"),
            FailureReason::Restricted
        );
        assert_eq!(
            classify_failure("ERROR: Log in for access. Use --cookies-from-browser"),
            FailureReason::Restricted
        );
        assert_eq!(
            classify_failure("HTTP Error 403: Forbidden"),
            FailureReason::Restricted
        );
    }

    #[test]
    fn test_classify_network() {
        assert_eq!(
            classify_failure("ERROR: Read timed out."),
            FailureReason::NetworkError
        );
        assert_eq!(
            classify_failure("<urlopen error [Errno -3] Temporary failure in name resolution>"),
            FailureReason::NetworkError
        );
        assert_eq!(
            classify_failure("ERROR: HTTP Error 429: Too Many Requests"),
            FailureReason::NetworkError
        );
    }

    #[test]
    fn test_classify_unsupported() {
        assert_eq!(
            classify_failure("ERROR: Unsupported URL: https://example.com/"),
            FailureReason::UnsupportedUrl
        );
        assert_eq!(
            classify_failure("ERROR: 'foo' is not a valid URL"),
            FailureReason::UnsupportedUrl
        );
    }

    #[test]
    fn test_format_problem_is_not_a_missing_video() {
        assert_eq!(
            classify_failure("ERROR: Requested format is not available"),
            FailureReason::Unknown
        );
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(classify_failure(""), FailureReason::Unknown);
        assert_eq!(
            classify_failure("Traceback (most recent call last): KeyError"),
            FailureReason::Unknown
        );
    }

    #[test]
    fn test_summarize_prefers_error_line() {
        let stderr = "WARNING: something minor\nERROR: [TikTok] 1: Video unavailable\n\n";
        assert_eq!(summarize_failure(stderr), "[TikTok] 1: Video unavailable");
    }

    #[test]
    fn test_summarize_falls_back_to_last_line() {
        assert_eq!(summarize_failure("first\nsecond\n"), "second");
        assert_eq!(summarize_failure("  \n"), "no diagnostic output");
    }

    #[test]
    fn test_summarize_truncates() {
        let long = format!("ERROR: {}", "x".repeat(1000));
        let summary = summarize_failure(&long);
        assert_eq!(summary.chars().count(), MAX_DETAIL_CHARS + 3);
        assert!(summary.ends_with("..."));
    }
}
