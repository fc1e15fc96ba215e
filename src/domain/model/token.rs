use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

/// Tokens expiring within this window are treated as already expired, so a
/// caller always gets a token it can actually use for at least one request.
pub const EXPIRY_LEEWAY: Duration = Duration::from_secs(10);

/// A technically valid token with less remaining life than this is suspect:
/// the vault has been seen reporting "now" as the expiry instant.
pub const SUSPICIOUS_REMAINING: Duration = Duration::from_secs(60);

/// Bearer access token extracted from the vault's session storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    pub expiry: SystemTime,
}

impl AuthToken {
    pub fn new(access_token: impl Into<String>, expiry: SystemTime) -> Self {
        Self {
            access_token: access_token.into(),
            expiry,
        }
    }

    /// A token is valid when it is non-empty and does not expire within the
    /// leeway window.
    pub fn valid(&self) -> bool {
        self.valid_at(SystemTime::now())
    }

    pub(crate) fn valid_at(&self, now: SystemTime) -> bool {
        !self.access_token.is_empty() && self.expiry > now + EXPIRY_LEEWAY
    }

    /// Remaining lifetime, zero if already expired.
    pub fn remaining(&self) -> Duration {
        self.remaining_at(SystemTime::now())
    }

    pub(crate) fn remaining_at(&self, now: SystemTime) -> Duration {
        self.expiry.duration_since(now).unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    #[test]
    fn valid_with_future_expiry() {
        let token = AuthToken::new("tok", now() + Duration::from_secs(3600));
        assert!(token.valid_at(now()));
    }

    #[test]
    fn invalid_when_empty() {
        let token = AuthToken::new("", now() + Duration::from_secs(3600));
        assert!(!token.valid_at(now()));
    }

    #[test]
    fn invalid_when_expired_or_within_leeway() {
        let expired = AuthToken::new("tok", now() - Duration::from_secs(1));
        assert!(!expired.valid_at(now()));

        let within_leeway = AuthToken::new("tok", now() + EXPIRY_LEEWAY);
        assert!(!within_leeway.valid_at(now()));

        let just_past_leeway = AuthToken::new("tok", now() + EXPIRY_LEEWAY + Duration::from_secs(1));
        assert!(just_past_leeway.valid_at(now()));
    }

    #[test]
    fn remaining_is_zero_after_expiry() {
        let token = AuthToken::new("tok", now() - Duration::from_secs(10));
        assert_eq!(token.remaining_at(now()), Duration::ZERO);
    }
}
