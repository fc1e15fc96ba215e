//! Login SDK for the Coffre document vault.
//!
//! The vault exposes no programmatic login endpoint: credentials go through
//! an interactive web flow whose sequence of screens (privacy banner,
//! credentials form, one-time code, trusted-device prompt, final redirect)
//! varies per account and per session. This crate drives a headless browser
//! through that flow, extracts the bearer token and session cookies once
//! authentication completes, and reports precise, debuggable failures.
//!
//! ```no_run
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use coffre_login::{Credentials, LoginOption, LoginSession};
//!
//! # async fn example() -> Result<(), coffre_login::LoginError> {
//! let session = LoginSession::new([
//!     LoginOption::RefreshFrequency(Duration::from_millis(500)),
//!     LoginOption::Timeout(Duration::from_secs(180)),
//!     LoginOption::ScreenshotOnError(true),
//! ])?;
//!
//! let credentials = Credentials::new("user@example.com", "secret");
//! let result = session.login(&CancellationToken::new(), &credentials).await?;
//! println!("token expires in {:?}", result.token.remaining());
//! # Ok(())
//! # }
//! ```
//!
//! On failure, the returned [`LoginError`] can be unwrapped to recover the
//! page location at failure time and, when [`LoginOption::ScreenshotOnError`]
//! is set, the raw bytes of a full-page screenshot; see
//! [`LoginError::location`] and [`LoginError::screenshot`].

mod application;
mod domain;
mod infrastructure;

pub use application::service::LoginSession;
pub use application::token_source::{
    CombinedTokenSources, LoginTokenSource, TokenListener, TokenSource, TokenSourceError,
};
pub use domain::error::{LoginError, SessionError};
pub use domain::login::{LoginMethod, StaticLoginMethod};
pub use domain::model::{AuthToken, Cookie, Credentials, LoginResult, SameSite};
pub use domain::totp::TotpError;
pub use infrastructure::browser::{ChromiumDriver, PageDriver};
pub use infrastructure::config::{
    LoginConfig, LoginOption, OptionKind, DEFAULT_LOGIN_URL, DEFAULT_REFRESH_FREQUENCY,
};
pub use infrastructure::logging;
