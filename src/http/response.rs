//! Fixed responses written to the client.
//!
//! Clients match these byte-for-byte, so they are kept as literals rather than
//! built from status codes.

/// Sent after the target dial succeeds; the client then switches to raw mode.
pub const SWITCHING_PROTOCOLS: &[u8] =
    b"HTTP/1.1 101 Switching Protocol\r\nContent-Length: 1048576000000\r\n\r\n";

/// `X-Pass` did not match the configured password.
pub const WRONG_PASS: &[u8] = b"HTTP/1.1 400 WrongPass!\r\n\r\n";

/// Target is not loopback and no password is configured.
pub const FORBIDDEN: &[u8] = b"HTTP/1.1 403 Forbidden!\r\n\r\n";

/// No target could be determined.
pub const NO_REAL_HOST: &[u8] = b"HTTP/1.1 400 NoXRealHost!\r\n\r\n";
