use std::time::Duration;

use thiserror::Error;

use crate::domain::model::AuthToken;
use crate::domain::totp::TotpError;

/// Failure of a single page-session operation, wrapping the underlying
/// transport/protocol error.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("browser not started")]
    NotStarted,

    #[error("launch browser: {0}")]
    Launch(String),

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("{operation}: {source}")]
    Protocol {
        operation: &'static str,
        #[source]
        source: chromiumoxide::error::CdpError,
    },

    #[error("{operation}: unexpected value {value:?}")]
    UnexpectedValue {
        operation: &'static str,
        value: String,
    },
}

impl SessionError {
    pub(crate) fn protocol(
        operation: &'static str,
        source: chromiumoxide::error::CdpError,
    ) -> Self {
        Self::Protocol { operation, source }
    }
}

/// Login failure, precise enough for a caller to distinguish configuration
/// mistakes, timeouts, screen-action failures and token validation failures
/// without parsing strings.
#[derive(Debug, Error)]
pub enum LoginError {
    /// An option failed validation before any browser was launched.
    #[error("invalid option {option:?}: {reason}")]
    InvalidOption {
        option: &'static str,
        reason: &'static str,
    },

    /// The caller's cancellation token fired before a result was produced.
    #[error("login cancelled by caller")]
    Cancelled,

    /// No result within the configured overall timeout.
    #[error("login timed out after {0:?}")]
    Timeout(Duration),

    /// A page-session operation failed outside any screen's action.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A screen's action failed; carries the screen name for diagnostics.
    #[error("screen {screen:?}: {source}")]
    ScreenAction {
        screen: &'static str,
        source: Box<LoginError>,
    },

    /// The one-time-code screen appeared but no shared secret is configured.
    /// This is a hard failure: skipping the screen would hang the flow.
    #[error("one-time-code field present but no OTP secret is configured")]
    MissingOtpSecret,

    #[error("compute one-time code: {0}")]
    Otp(#[from] TotpError),

    /// The expiry value read from session storage is not a unix timestamp.
    #[error("parse token expiry {value:?}")]
    InvalidExpiry { value: String },

    /// A token was extracted but is empty or already expired.
    #[error("invalid token: {token:?}")]
    InvalidToken { token: AuthToken },

    /// Any of the above, enriched with the page location and an optional
    /// full-page screenshot captured at failure time.
    #[error("{source} at {}", .location.as_deref().unwrap_or("unknown location"))]
    Diagnosed {
        source: Box<LoginError>,
        location: Option<String>,
        screenshot: Option<Vec<u8>>,
    },
}

impl LoginError {
    /// Attach best-effort diagnostics. Returns `self` unchanged when nothing
    /// was captured, so a failed capture never masks the original error.
    pub(crate) fn with_diagnostics(
        self,
        location: Option<String>,
        screenshot: Option<Vec<u8>>,
    ) -> Self {
        if location.is_none() && screenshot.is_none() {
            return self;
        }

        Self::Diagnosed {
            source: Box::new(self),
            location,
            screenshot,
        }
    }

    /// Page location at failure time, if it was captured.
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Diagnosed {
                location, source, ..
            } => location.as_deref().or_else(|| source.location()),
            Self::ScreenAction { source, .. } => source.location(),
            _ => None,
        }
    }

    /// Raw screenshot bytes captured at failure time, if any.
    pub fn screenshot(&self) -> Option<&[u8]> {
        match self {
            Self::Diagnosed {
                screenshot, source, ..
            } => screenshot.as_deref().or_else(|| source.screenshot()),
            Self::ScreenAction { source, .. } => source.screenshot(),
            _ => None,
        }
    }

    /// Name of the screen whose action failed, if the failure happened
    /// inside one.
    pub fn screen(&self) -> Option<&'static str> {
        match self {
            Self::ScreenAction { screen, .. } => Some(screen),
            Self::Diagnosed { source, .. } => source.screen(),
            _ => None,
        }
    }

    pub(crate) fn for_screen(screen: &'static str, source: LoginError) -> Self {
        Self::ScreenAction {
            screen,
            source: Box::new(source),
        }
    }
}

/// Human-readable SI byte count, for logging screenshot sizes.
pub(crate) fn byte_count_si(bytes: usize) -> String {
    const UNIT: usize = 1000;

    if bytes < UNIT {
        return format!("{bytes} B");
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        n /= UNIT;
        exp += 1;
    }

    format!(
        "{:.1} {}B",
        bytes as f64 / div as f64,
        ['k', 'M', 'G', 'T', 'P', 'E'][exp]
    )
}
