//! The recognizable states of the vault's login flow.
//!
//! Each screen pairs a side-effect-free match predicate with the single
//! action that advances past it. The flow is fixed by the remote site, so
//! the set of screens is closed: consent banner, credentials form,
//! one-time-code entry, trusted-device prompt and the terminal extraction
//! screen, preceded by the initial page load.

pub(crate) mod consent;
pub(crate) mod credentials;
pub(crate) mod initial;
pub(crate) mod otp;
pub(crate) mod terminal;
pub(crate) mod trusted_device;

use std::sync::Arc;

use async_trait::async_trait;

pub(crate) use consent::ConsentScreen;
pub(crate) use credentials::CredentialsScreen;
pub(crate) use initial::InitialScreen;
pub(crate) use otp::OtpScreen;
pub(crate) use terminal::TerminalScreen;
pub(crate) use trusted_device::TrustedDeviceScreen;

use crate::application::resolver::Completion;
use crate::domain::error::LoginError;
use crate::domain::model::Credentials;
use crate::infrastructure::browser::PageDriver;
use crate::infrastructure::config::LoginConfig;

/// One recognizable state of the login flow.
#[async_trait]
pub(crate) trait Screen: Send + Sync {
    /// Display name, used only for diagnostics.
    fn name(&self) -> &'static str;

    /// Whether the current page is this screen. Must be side-effect free.
    /// Transient evaluation failures degrade to "no match this tick".
    async fn matches(&self, page: &dyn PageDriver) -> bool;

    /// Advance past this screen. Invoked at most once per match.
    async fn act(&self, page: &dyn PageDriver) -> Result<(), LoginError>;

    /// Whether the resolver must let an in-flight navigation settle before
    /// re-evaluating any predicate, preventing a double submit.
    fn waits_for_navigation(&self) -> bool {
        false
    }
}

/// The ordered candidate list for one login attempt. Order is evaluation
/// priority: the first matching screen wins.
pub(crate) fn screen_list(
    config: &LoginConfig,
    credentials: &Credentials,
    completion: Arc<Completion>,
) -> Vec<Box<dyn Screen>> {
    vec![
        Box::new(ConsentScreen::new(config.accept_cookies)),
        Box::new(CredentialsScreen::new(
            &credentials.username,
            &credentials.password,
        )),
        Box::new(OtpScreen::new(credentials.otp_secret.clone())),
        Box::new(TrustedDeviceScreen),
        Box::new(TerminalScreen::new(completion)),
    ]
}

/// Shared predicate body: an element lookup whose failure is logged and
/// treated as "not this screen".
pub(crate) async fn element_match(
    page: &dyn PageDriver,
    screen: &'static str,
    selector: &'static str,
) -> bool {
    match page.element_exists(selector).await {
        Ok(found) => found,
        Err(err) => {
            tracing::debug!(screen, "match evaluation failed: {err}");
            false
        }
    }
}
