use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::error::LoginError;
use crate::domain::model::{Credentials, LoginResult};

/// A way to obtain a vault token and session cookies.
///
/// Invoked once per token refresh by the REST collaborator. Implementations
/// must not retry internally: submitting credentials twice can trigger an
/// account lockout or an extra OTP prompt, so retrying is a caller decision.
#[async_trait]
pub trait LoginMethod: Send + Sync {
    async fn login(
        &self,
        cancel: &CancellationToken,
        credentials: &Credentials,
    ) -> Result<LoginResult, LoginError>;
}

/// Login method that returns a preset result without touching a browser.
/// Useful for wiring tests and for callers that already hold a session.
#[derive(Debug, Clone)]
pub struct StaticLoginMethod {
    pub result: LoginResult,
}

#[async_trait]
impl LoginMethod for StaticLoginMethod {
    async fn login(
        &self,
        _cancel: &CancellationToken,
        _credentials: &Credentials,
    ) -> Result<LoginResult, LoginError> {
        Ok(self.result.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{AuthToken, Cookie};
    use std::time::{Duration, SystemTime};

    #[tokio::test]
    async fn static_method_returns_its_preset_result() {
        let method = StaticLoginMethod {
            result: LoginResult {
                token: AuthToken::new("tok", SystemTime::now() + Duration::from_secs(3600)),
                cookies: vec![Cookie::new("session_id", "abc", "secure.coffre.app")],
            },
        };

        let result = method
            .login(&CancellationToken::new(), &Credentials::new("u", "p"))
            .await
            .unwrap();

        assert_eq!(result.token.access_token, "tok");
        assert_eq!(result.cookies.len(), 1);
    }
}
