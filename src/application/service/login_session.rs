use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use ulid::Ulid;

use crate::application::resolver::{Completion, CompletionState, ScreenResolver};
use crate::application::screens::{screen_list, InitialScreen, Screen};
use crate::domain::error::{byte_count_si, LoginError};
use crate::domain::login::LoginMethod;
use crate::domain::model::{Credentials, LoginResult};
use crate::infrastructure::browser::{ChromiumDriver, PageDriver};
use crate::infrastructure::config::{LoginConfig, LoginOption};

/// Grace period for the browser process to exit cleanly before it is
/// killed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Bound on waiting for the resolver task to acknowledge cancellation
/// before diagnostics are captured anyway.
const RESOLVER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Orchestrates one login attempt end to end: owns the configuration,
/// the browser lifecycle and the synchronization contract between the
/// screen resolver and the caller.
///
/// Failures are never retried internally; see [`LoginMethod`].
pub struct LoginSession {
    config: LoginConfig,
}

impl LoginSession {
    /// Validate `options` and freeze the session configuration.
    pub fn new(options: impl IntoIterator<Item = LoginOption>) -> Result<Self, LoginError> {
        Ok(Self {
            config: LoginConfig::from_options(options)?,
        })
    }

    pub fn config(&self) -> &LoginConfig {
        &self.config
    }

    /// Run one login attempt against a freshly launched browser.
    ///
    /// Returns the extracted token and cookies, or an error carrying the
    /// failing screen's name plus best-effort diagnostics (page location
    /// and, if configured, a screenshot). The browser process is terminated
    /// on every path, killed if it outlives the shutdown grace period.
    pub async fn login(
        &self,
        cancel: &CancellationToken,
        credentials: &Credentials,
    ) -> Result<LoginResult, LoginError> {
        if cancel.is_cancelled() {
            return Err(LoginError::Cancelled);
        }

        let page: Arc<dyn PageDriver> =
            Arc::new(ChromiumDriver::new(self.config.browser_binary.clone()));
        self.login_with_driver(cancel, credentials, page).await
    }

    pub(crate) async fn login_with_driver(
        &self,
        cancel: &CancellationToken,
        credentials: &Credentials,
        page: Arc<dyn PageDriver>,
    ) -> Result<LoginResult, LoginError> {
        if cancel.is_cancelled() {
            return Err(LoginError::Cancelled);
        }

        let attempt = Ulid::new();
        let span = tracing::info_span!("login", attempt = %attempt);
        self.login_inner(cancel, credentials, page).instrument(span).await
    }

    async fn login_inner(
        &self,
        cancel: &CancellationToken,
        credentials: &Credentials,
        page: Arc<dyn PageDriver>,
    ) -> Result<LoginResult, LoginError> {
        page.start().await?;

        // The browser's cancellation is linked to the caller's but not
        // identical with it: after the caller gives up, the tab stays
        // alive long enough to capture diagnostics.
        let browser_cancel = CancellationToken::new();
        let watcher = tokio::spawn({
            let caller = cancel.clone();
            let browser = browser_cancel.clone();
            async move {
                tokio::select! {
                    _ = caller.cancelled() => browser.cancel(),
                    _ = browser.cancelled() => {}
                }
            }
        });

        let outcome = self
            .run_flow(cancel, credentials, page.clone(), &browser_cancel)
            .await;

        let outcome = match outcome {
            Ok(result) => {
                tracing::info!(
                    cookies = result.cookies.len(),
                    "login succeeded, token expires in {}",
                    humantime::format_duration(Duration::from_secs(
                        result.token.remaining().as_secs()
                    ))
                );
                Ok(result)
            }
            Err(err) => Err(self.attach_diagnostics(page.as_ref(), err).await),
        };

        browser_cancel.cancel();
        watcher.abort();

        if let Err(err) = page.stop(SHUTDOWN_GRACE).await {
            tracing::warn!("stop browser: {err}");
        }

        outcome
    }

    async fn run_flow(
        &self,
        cancel: &CancellationToken,
        credentials: &Credentials,
        page: Arc<dyn PageDriver>,
        browser_cancel: &CancellationToken,
    ) -> Result<LoginResult, LoginError> {
        if !self.config.cookies.is_empty() {
            page.set_cookies(&self.config.cookies).await?;
        }

        let initial = InitialScreen::new(self.config.url.clone());
        if initial.matches(page.as_ref()).await {
            initial
                .act(page.as_ref())
                .await
                .map_err(|err| LoginError::for_screen(initial.name(), err))?;
        }
        tracing::info!(url = %self.config.url, "page loaded");

        let completion = Arc::new(Completion::new());
        let screens = screen_list(&self.config, credentials, completion.clone());
        let resolver = ScreenResolver::new(screens, self.config.refresh_frequency);

        let resolver_cancel = browser_cancel.child_token();
        let resolver_task = tokio::spawn(resolver.run(
            page.clone(),
            resolver_cancel.clone(),
            completion.clone(),
        ));

        let outcome = self.poll_completion(cancel, &completion).await;

        // The resolver must stop driving the tab before anything else
        // touches it (diagnostics, teardown).
        resolver_cancel.cancel();
        if tokio::time::timeout(RESOLVER_JOIN_TIMEOUT, resolver_task)
            .await
            .is_err()
        {
            tracing::warn!("screen resolver did not stop promptly");
        }

        outcome
    }

    /// Observe the completion flag at the configured cadence until the
    /// resolver settles it, the caller cancels, or the overall timeout
    /// expires.
    async fn poll_completion(
        &self,
        cancel: &CancellationToken,
        completion: &Completion,
    ) -> Result<LoginResult, LoginError> {
        let mut ticker = tokio::time::interval(self.config.refresh_frequency);
        let deadline = self.config.timeout.map(|timeout| Instant::now() + timeout);

        let timeout_expired = async {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(timeout_expired);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(LoginError::Cancelled),
                _ = &mut timeout_expired => {
                    return Err(LoginError::Timeout(
                        self.config.timeout.unwrap_or(Duration::ZERO),
                    ));
                }
                _ = ticker.tick() => {}
            }

            match completion.state() {
                CompletionState::Succeeded => {
                    if let Some(result) = completion.result() {
                        return Ok(result);
                    }
                }
                CompletionState::Failed => {
                    // The error slot is written before the flag flips.
                    if let Some(err) = completion.take_error() {
                        return Err(err);
                    }
                    return Err(LoginError::Cancelled);
                }
                CompletionState::NotDone => {}
            }
        }
    }

    /// Best-effort enrichment: current location always, screenshot when
    /// configured. A capture failure is logged and never masks `err`.
    async fn attach_diagnostics(&self, page: &dyn PageDriver, err: LoginError) -> LoginError {
        let location = match page.location().await {
            Ok(location) => Some(location),
            Err(capture_err) => {
                tracing::error!("failed to get current location: {capture_err}");
                None
            }
        };

        let screenshot = if self.config.screenshot_on_error {
            match page.screenshot().await {
                Ok(bytes) => {
                    tracing::info!("screenshot taken ({})", byte_count_si(bytes.len()));
                    Some(bytes)
                }
                Err(capture_err) => {
                    tracing::error!("failed to take screenshot: {capture_err}");
                    None
                }
            }
        } else {
            None
        };

        err.with_diagnostics(location, screenshot)
    }
}

#[async_trait]
impl LoginMethod for LoginSession {
    async fn login(
        &self,
        cancel: &CancellationToken,
        credentials: &Credentials,
    ) -> Result<LoginResult, LoginError> {
        LoginSession::login(self, cancel, credentials).await
    }
}
