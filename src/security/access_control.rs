//! Tunnel access control.
//! Decides whether a handshake may dial its target.

use crate::http::response;

/// Target prefixes reachable without a password.
const LOOPBACK_PREFIXES: [&str; 2] = ["127.0.0.1", "localhost"];

/// Outcome of the access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Dial the target.
    Allow,
    /// No target host could be determined.
    NoRealHost,
    /// Password configured, `X-Pass` mismatched.
    WrongPass,
    /// No password configured and the target is not loopback.
    Forbidden,
}

impl Decision {
    /// The literal written to the client, if any.
    pub fn response(&self) -> Option<&'static [u8]> {
        match self {
            Decision::Allow => None,
            Decision::NoRealHost => Some(response::NO_REAL_HOST),
            Decision::WrongPass => Some(response::WRONG_PASS),
            Decision::Forbidden => Some(response::FORBIDDEN),
        }
    }

    /// Short label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::NoRealHost => "no_real_host",
            Decision::WrongPass => "wrong_pass",
            Decision::Forbidden => "forbidden",
        }
    }
}

/// Immutable access policy shared by every connection.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    password: Option<String>,
}

impl AccessPolicy {
    /// Build a policy; an empty password disables password checks.
    pub fn new(password: impl Into<String>) -> Self {
        let password = password.into();
        Self {
            password: (!password.is_empty()).then_some(password),
        }
    }

    /// Evaluate the policy for a resolved target and the client's `X-Pass`.
    pub fn check(&self, target: &str, pass: &str) -> Decision {
        if target.is_empty() {
            return Decision::NoRealHost;
        }

        match &self.password {
            Some(expected) if expected == pass => Decision::Allow,
            Some(_) => Decision::WrongPass,
            None if is_loopback(target) => Decision::Allow,
            None => Decision::Forbidden,
        }
    }
}

/// Prefix match only: `localhost.evil.com` and `127.0.0.10` both pass.
fn is_loopback(target: &str) -> bool {
    LOOPBACK_PREFIXES
        .iter()
        .any(|prefix| target.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_target_is_no_real_host() {
        assert_eq!(AccessPolicy::new("").check("", ""), Decision::NoRealHost);
        assert_eq!(AccessPolicy::new("secret").check("", "secret"), Decision::NoRealHost);
    }

    #[test]
    fn correct_password_allows_any_host() {
        let policy = AccessPolicy::new("secret");
        assert_eq!(policy.check("example.com:9999", "secret"), Decision::Allow);
        assert_eq!(policy.check("127.0.0.1:22", "secret"), Decision::Allow);
    }

    #[test]
    fn wrong_password_rejects_even_loopback() {
        let policy = AccessPolicy::new("secret");
        assert_eq!(policy.check("127.0.0.1:22", "wrong"), Decision::WrongPass);
        assert_eq!(policy.check("127.0.0.1:22", ""), Decision::WrongPass);
        assert_eq!(policy.check("localhost", "Secret"), Decision::WrongPass);
    }

    #[test]
    fn open_relay_only_to_loopback() {
        let policy = AccessPolicy::new("");
        assert_eq!(policy.check("127.0.0.1:22", ""), Decision::Allow);
        assert_eq!(policy.check("localhost", "anything"), Decision::Allow);
        assert_eq!(policy.check("localhost:8080", ""), Decision::Allow);
        assert_eq!(policy.check("example.com:9999", ""), Decision::Forbidden);
        assert_eq!(policy.check("10.0.0.1:22", ""), Decision::Forbidden);
    }

    #[test]
    fn responses_match_decisions() {
        assert_eq!(Decision::Allow.response(), None);
        assert_eq!(Decision::WrongPass.response(), Some(response::WRONG_PASS));
        assert_eq!(Decision::Forbidden.response(), Some(response::FORBIDDEN));
        assert_eq!(Decision::NoRealHost.response(), Some(response::NO_REAL_HOST));
    }
}
