//! Header extraction from the raw handshake buffer.
//!
//! # Responsibilities
//! - Find a `Name: value\r\n` line anywhere in the first client read
//! - Return the value, or an empty string when absent or unterminated
//!
//! # Design Decisions
//! - Single substring search, no request-line or header-block parsing
//! - First occurrence wins; header names are case-sensitive
//! - A match inside payload bytes is accepted as a header

/// Routing target header (`host` or `host:port`).
pub const X_REAL_HOST: &str = "X-Real-Host";

/// Shared-secret header compared against the configured password.
pub const X_PASS: &str = "X-Pass";

/// Presence marker for a handshake split across two reads.
pub const X_SPLIT: &str = "X-Split";

/// Extract the value of `name` from `head`.
///
/// Returns an empty string when the header is missing or when its value is
/// not followed by CRLF.
pub fn find_header(head: &[u8], name: &str) -> String {
    let needle = format!("{}: ", name);
    let Some(start) = find(head, needle.as_bytes()) else {
        return String::new();
    };

    // The separator is the first ':' at or after the match, which is always
    // the one that ends `name` because header names never contain ':'.
    let colon = match head[start..].iter().position(|&b| b == b':') {
        Some(offset) => start + offset,
        None => return String::new(),
    };
    let value = &head[(colon + 2).min(head.len())..];

    match find(value, b"\r\n") {
        Some(end) => String::from_utf8_lossy(&value[..end]).into_owned(),
        None => String::new(),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_value_up_to_crlf() {
        let head = b"GET / HTTP/1.1\r\nHost: cdn.example\r\nX-Real-Host: 127.0.0.1:22\r\n\r\n";
        assert_eq!(find_header(head, X_REAL_HOST), "127.0.0.1:22");
        assert_eq!(find_header(head, "Host"), "cdn.example");
    }

    #[test]
    fn missing_header_is_empty() {
        let head = b"GET / HTTP/1.1\r\nHost: cdn.example\r\n\r\n";
        assert_eq!(find_header(head, X_PASS), "");
    }

    #[test]
    fn unterminated_value_is_empty() {
        let head = b"GET / HTTP/1.1\r\nX-Real-Host: 127.0.0.1:22";
        assert_eq!(find_header(head, X_REAL_HOST), "");
    }

    #[test]
    fn names_are_case_sensitive() {
        let head = b"x-real-host: 127.0.0.1:22\r\n\r\n";
        assert_eq!(find_header(head, X_REAL_HOST), "");
    }

    #[test]
    fn first_occurrence_wins() {
        let head = b"X-Pass: one\r\nX-Pass: two\r\n\r\n";
        assert_eq!(find_header(head, X_PASS), "one");
    }

    #[test]
    fn empty_value_before_crlf() {
        let head = b"X-Split: \r\n\r\n";
        assert_eq!(find_header(head, X_SPLIT), "");
    }

    #[test]
    fn matches_inside_payload() {
        // Accepted false positive: the name is found mid-line.
        let head = b"\x00\x01junkX-Real-Host: localhost:8080\r\n";
        assert_eq!(find_header(head, X_REAL_HOST), "localhost:8080");
    }

    #[test]
    fn non_utf8_value_is_lossy() {
        let head = b"X-Pass: a\xffb\r\n";
        assert_eq!(find_header(head, X_PASS), "a\u{fffd}b");
    }
}
