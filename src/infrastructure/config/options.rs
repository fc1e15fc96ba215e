use std::path::PathBuf;
use std::time::Duration;

use crate::domain::error::LoginError;
use crate::domain::model::Cookie;

/// Landing page of the vault's interactive login flow.
pub const DEFAULT_LOGIN_URL: &str = "https://secure.coffre.app/login";

/// Default cadence at which the resolver and the caller-side poll loop
/// re-examine the page.
pub const DEFAULT_REFRESH_FREQUENCY: Duration = Duration::from_millis(1500);

/// Identity of a configuration option, compared by value in errors and
/// tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Url,
    RefreshFrequency,
    Timeout,
    Cookies,
    ScreenshotOnError,
    AcceptCookies,
    BrowserBinary,
}

impl OptionKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::RefreshFrequency => "refresh_frequency",
            Self::Timeout => "timeout",
            Self::Cookies => "cookies",
            Self::ScreenshotOnError => "screenshot_on_error",
            Self::AcceptCookies => "accept_cookies",
            Self::BrowserBinary => "browser_binary",
        }
    }
}

/// A single login-session setting. Each option validates independently
/// before being applied, so a bad value is reported against its own name.
#[derive(Debug, Clone)]
pub enum LoginOption {
    /// Target URL of the login flow.
    Url(String),
    /// Poll cadence; must be positive.
    RefreshFrequency(Duration),
    /// Overall login timeout; omit for an unbounded attempt.
    Timeout(Duration),
    /// Cookies seeded into the browser before the first navigation.
    Cookies(Vec<Cookie>),
    /// Capture a full-page screenshot when the login fails.
    ScreenshotOnError(bool),
    /// Accept (rather than refuse) the privacy banner.
    AcceptCookies(bool),
    /// Path to a resolved browser executable.
    BrowserBinary(PathBuf),
}

impl LoginOption {
    pub fn kind(&self) -> OptionKind {
        match self {
            Self::Url(_) => OptionKind::Url,
            Self::RefreshFrequency(_) => OptionKind::RefreshFrequency,
            Self::Timeout(_) => OptionKind::Timeout,
            Self::Cookies(_) => OptionKind::Cookies,
            Self::ScreenshotOnError(_) => OptionKind::ScreenshotOnError,
            Self::AcceptCookies(_) => OptionKind::AcceptCookies,
            Self::BrowserBinary(_) => OptionKind::BrowserBinary,
        }
    }

    /// Check this option in isolation.
    pub fn validate(&self) -> Result<(), LoginError> {
        let reason = match self {
            Self::Url(url) if url.is_empty() => Some("url is empty"),
            Self::RefreshFrequency(frequency) if frequency.is_zero() => {
                Some("frequency must be positive")
            }
            Self::Timeout(timeout) if timeout.is_zero() => Some("timeout must be positive"),
            Self::BrowserBinary(path) if path.as_os_str().is_empty() => {
                Some("binary path is empty")
            }
            _ => None,
        };

        match reason {
            Some(reason) => Err(LoginError::InvalidOption {
                option: self.kind().name(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

/// Immutable login-session configuration, frozen before any browser is
/// launched.
#[derive(Debug, Clone)]
pub struct LoginConfig {
    pub url: String,
    pub refresh_frequency: Duration,
    pub timeout: Option<Duration>,
    pub cookies: Vec<Cookie>,
    pub screenshot_on_error: bool,
    pub accept_cookies: bool,
    pub browser_binary: Option<PathBuf>,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_LOGIN_URL.to_string(),
            refresh_frequency: DEFAULT_REFRESH_FREQUENCY,
            timeout: None,
            cookies: Vec::new(),
            screenshot_on_error: false,
            accept_cookies: false,
            browser_binary: None,
        }
    }
}

impl LoginConfig {
    /// Validate every option, then apply them in order over the defaults.
    pub fn from_options(
        options: impl IntoIterator<Item = LoginOption>,
    ) -> Result<Self, LoginError> {
        let mut config = Self::default();

        for option in options {
            option.validate()?;
            config.apply(option);
        }

        Ok(config)
    }

    fn apply(&mut self, option: LoginOption) {
        match option {
            LoginOption::Url(url) => self.url = url,
            LoginOption::RefreshFrequency(frequency) => self.refresh_frequency = frequency,
            LoginOption::Timeout(timeout) => self.timeout = Some(timeout),
            LoginOption::Cookies(cookies) => self.cookies = cookies,
            LoginOption::ScreenshotOnError(enabled) => self.screenshot_on_error = enabled,
            LoginOption::AcceptCookies(accept) => self.accept_cookies = accept,
            LoginOption::BrowserBinary(path) => self.browser_binary = Some(path),
        }
    }
}
