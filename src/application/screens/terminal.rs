use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::Screen;
use crate::application::resolver::Completion;
use crate::domain::error::LoginError;
use crate::domain::model::{AuthToken, LoginResult, SUSPICIOUS_REMAINING};
use crate::domain::time::unix_str_to_system_time;
use crate::infrastructure::browser::PageDriver;

/// Path of the post-login landing page.
pub(crate) const HOME_PATH: &str = "/home";

const TOKEN_KEY: &str = "access_token";
const EXPIRY_KEY: &str = "app_expires_at";

/// The vault publishes both values into session storage shortly after the
/// landing page renders; give it a bounded window to do so.
const EXTRACT_TIMEOUT: Duration = Duration::from_secs(10);

/// The landing page after authentication. Its action extracts the access
/// token and expiry from session storage, validates them, converts the
/// browser's cookies and writes the shared result, which is the success
/// terminal state of the whole resolution.
pub(crate) struct TerminalScreen {
    completion: Arc<Completion>,
}

impl TerminalScreen {
    pub fn new(completion: Arc<Completion>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl Screen for TerminalScreen {
    fn name(&self) -> &'static str {
        "final"
    }

    async fn matches(&self, page: &dyn PageDriver) -> bool {
        let location = match page.location().await {
            Ok(location) => location,
            Err(err) => {
                tracing::debug!(screen = self.name(), "match evaluation failed: {err}");
                return false;
            }
        };

        match Url::parse(&location) {
            Ok(url) => url.path() == HOME_PATH,
            Err(err) => {
                tracing::debug!(screen = self.name(), %location, "parse location: {err}");
                false
            }
        }
    }

    async fn act(&self, page: &dyn PageDriver) -> Result<(), LoginError> {
        tracing::info!("fetching token from browser");

        let access_token = page.poll_session_value(TOKEN_KEY, EXTRACT_TIMEOUT).await?;
        let expiry_str = page.poll_session_value(EXPIRY_KEY, EXTRACT_TIMEOUT).await?;

        let expiry = unix_str_to_system_time(&expiry_str).map_err(|_| LoginError::InvalidExpiry {
            value: expiry_str.clone(),
        })?;

        let token = AuthToken::new(access_token, expiry);
        if !token.valid() {
            return Err(LoginError::InvalidToken { token });
        }

        // The site has been seen reporting the current time as the expiry;
        // such a token passes validation but is worth flagging.
        let remaining = token.remaining();
        if remaining < SUSPICIOUS_REMAINING {
            tracing::warn!(
                "token expires in {}, expiry may be wrong upstream",
                humantime::format_duration(Duration::from_secs(remaining.as_secs()))
            );
        }

        tracing::info!("fetching cookies from browser");
        let cookies = page.cookies().await?;
        tracing::info!(count = cookies.len(), "cookies fetched");

        self.completion.succeed(LoginResult { token, cookies });
        Ok(())
    }
}
