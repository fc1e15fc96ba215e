//! Polling state machine that drives the browser tab through the login
//! screens.
//!
//! The resolver runs as its own task and is the tab's only driver. It never
//! reports failures by return value: outcomes travel through the shared
//! [`Completion`] slot, which the controller polls at the configured
//! cadence.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, OnceLock};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::application::screens::Screen;
use crate::domain::error::LoginError;
use crate::domain::model::LoginResult;
use crate::infrastructure::browser::PageDriver;

/// Bound on how long a page may take to settle after an action that
/// triggers a navigation. Exceeding it fails the resolution rather than
/// re-submitting: a duplicate submit can lock the account.
const NAVIGATION_SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

const NOT_DONE: u8 = 0;
const SUCCEEDED: u8 = 1;
const FAILED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompletionState {
    NotDone,
    Succeeded,
    Failed,
}

/// Tri-state completion signal shared between the resolver task and the
/// controller's poll loop, plus the once-settable result and error slots.
///
/// The result is written before the flag flips to `Succeeded`, so any
/// observer of that state reads a fully populated result.
#[derive(Default)]
pub(crate) struct Completion {
    state: AtomicU8,
    result: OnceLock<LoginResult>,
    error: Mutex<Option<LoginError>>,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CompletionState {
        match self.state.load(Ordering::Acquire) {
            SUCCEEDED => CompletionState::Succeeded,
            FAILED => CompletionState::Failed,
            _ => CompletionState::NotDone,
        }
    }

    /// Record the login result. Returns false if the attempt was already
    /// settled; the slot is written at most once either way.
    pub fn succeed(&self, result: LoginResult) -> bool {
        if self.result.set(result).is_err() {
            return false;
        }

        self.state
            .compare_exchange(NOT_DONE, SUCCEEDED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Record a failure. Returns false if the attempt was already settled.
    pub fn fail(&self, error: LoginError) -> bool {
        {
            let mut slot = self.error.lock().unwrap();
            if slot.is_some() {
                return false;
            }
            *slot = Some(error);
        }

        self.state
            .compare_exchange(NOT_DONE, FAILED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn result(&self) -> Option<LoginResult> {
        self.result.get().cloned()
    }

    pub fn take_error(&self) -> Option<LoginError> {
        self.error.lock().unwrap().take()
    }
}

/// Drives the page through an ordered candidate list of screens by polling.
pub(crate) struct ScreenResolver {
    screens: Vec<Box<dyn Screen>>,
    refresh_frequency: Duration,
}

impl ScreenResolver {
    pub fn new(screens: Vec<Box<dyn Screen>>, refresh_frequency: Duration) -> Self {
        Self {
            screens,
            refresh_frequency,
        }
    }

    /// Poll until the terminal screen settles the completion, a screen
    /// action fails, or `cancel` fires.
    pub async fn run(
        self,
        page: Arc<dyn PageDriver>,
        cancel: CancellationToken,
        completion: Arc<Completion>,
    ) {
        let mut ticker = tokio::time::interval(self.refresh_frequency);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("screen resolver cancelled");
                    return;
                }
                _ = ticker.tick() => {}
            }

            if completion.state() != CompletionState::NotDone {
                return;
            }

            // First match wins: list order is evaluation priority, and
            // later predicates are not evaluated this tick.
            let Some(screen) = self.matching_screen(page.as_ref()).await else {
                tracing::trace!("no screen matched");
                continue;
            };

            tracing::debug!(screen = screen.name(), "screen matched");

            if let Err(err) = screen.act(page.as_ref()).await {
                let err = LoginError::for_screen(screen.name(), err);
                tracing::warn!("screen action failed: {err}");
                completion.fail(err);
                return;
            }

            if completion.state() == CompletionState::Succeeded {
                tracing::debug!("login flow resolved");
                return;
            }

            if screen.waits_for_navigation() {
                if let Err(err) = page.wait_for_navigation(NAVIGATION_SETTLE_TIMEOUT).await {
                    let err = LoginError::for_screen(screen.name(), err.into());
                    tracing::warn!("page did not settle after action: {err}");
                    completion.fail(err);
                    return;
                }
            }
        }
    }

    async fn matching_screen(&self, page: &dyn PageDriver) -> Option<&dyn Screen> {
        for screen in &self.screens {
            if screen.matches(page).await {
                return Some(screen.as_ref());
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::screens::screen_list;
    use crate::domain::model::{AuthToken, Credentials};
    use crate::infrastructure::browser::fake::{FakePage, PageState};
    use crate::infrastructure::config::LoginConfig;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::SystemTime;

    const TICK: Duration = Duration::from_millis(10);

    struct CountingScreen {
        name: &'static str,
        matched: bool,
        acted: Arc<AtomicUsize>,
        outcome: fn() -> Result<(), LoginError>,
    }

    impl CountingScreen {
        fn new(name: &'static str, matched: bool, acted: Arc<AtomicUsize>) -> Self {
            Self {
                name,
                matched,
                acted,
                outcome: || Ok(()),
            }
        }
    }

    #[async_trait]
    impl Screen for CountingScreen {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn matches(&self, _page: &dyn PageDriver) -> bool {
            self.matched
        }

        async fn act(&self, _page: &dyn PageDriver) -> Result<(), LoginError> {
            self.acted.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    /// Screen that settles the completion, standing in for the terminal
    /// extraction.
    struct SettlingScreen {
        completion: Arc<Completion>,
    }

    #[async_trait]
    impl Screen for SettlingScreen {
        fn name(&self) -> &'static str {
            "settling"
        }

        async fn matches(&self, _page: &dyn PageDriver) -> bool {
            true
        }

        async fn act(&self, _page: &dyn PageDriver) -> Result<(), LoginError> {
            self.completion.succeed(LoginResult {
                token: AuthToken::new("tok", SystemTime::now() + Duration::from_secs(3600)),
                cookies: Vec::new(),
            });
            Ok(())
        }
    }

    fn blank_page() -> Arc<FakePage> {
        Arc::new(FakePage::new(Vec::new()))
    }

    #[tokio::test]
    async fn first_match_wins_and_later_screens_are_not_consulted() {
        let second_acts = Arc::new(AtomicUsize::new(0));
        let completion = Arc::new(Completion::new());
        let cancel = CancellationToken::new();

        let screens: Vec<Box<dyn Screen>> = vec![
            Box::new(SettlingScreen {
                completion: completion.clone(),
            }),
            Box::new(CountingScreen::new("second", true, second_acts.clone())),
        ];

        ScreenResolver::new(screens, TICK)
            .run(blank_page(), cancel, completion.clone())
            .await;

        assert_eq!(completion.state(), CompletionState::Succeeded);
        assert_eq!(second_acts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn action_failure_settles_the_completion_with_the_screen_name() {
        let acted = Arc::new(AtomicUsize::new(0));
        let completion = Arc::new(Completion::new());
        let cancel = CancellationToken::new();

        let mut screen = CountingScreen::new("broken", true, acted.clone());
        screen.outcome = || Err(LoginError::MissingOtpSecret);
        let screens: Vec<Box<dyn Screen>> = vec![Box::new(screen)];

        ScreenResolver::new(screens, TICK)
            .run(blank_page(), cancel, completion.clone())
            .await;

        assert_eq!(completion.state(), CompletionState::Failed);
        assert_eq!(acted.load(Ordering::SeqCst), 1);

        let err = completion.take_error().unwrap();
        assert_eq!(err.screen(), Some("broken"));
    }

    #[tokio::test]
    async fn no_match_keeps_polling_until_cancelled() {
        let acted = Arc::new(AtomicUsize::new(0));
        let completion = Arc::new(Completion::new());
        let cancel = CancellationToken::new();

        let screens: Vec<Box<dyn Screen>> =
            vec![Box::new(CountingScreen::new("never", false, acted.clone()))];
        let resolver = ScreenResolver::new(screens, TICK);

        let task = tokio::spawn(resolver.run(blank_page(), cancel.clone(), completion.clone()));
        tokio::time::sleep(TICK * 5).await;

        assert_eq!(completion.state(), CompletionState::NotDone);
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("resolver stops on cancel")
            .unwrap();

        assert_eq!(acted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unsettled_navigation_after_action_fails_instead_of_resubmitting() {
        let acted = Arc::new(AtomicUsize::new(0));
        let completion = Arc::new(Completion::new());
        let cancel = CancellationToken::new();

        struct WaitingScreen {
            acted: Arc<AtomicUsize>,
        }

        #[async_trait]
        impl Screen for WaitingScreen {
            fn name(&self) -> &'static str {
                "submitting"
            }

            async fn matches(&self, _page: &dyn PageDriver) -> bool {
                true
            }

            async fn act(&self, _page: &dyn PageDriver) -> Result<(), LoginError> {
                self.acted.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }

            fn waits_for_navigation(&self) -> bool {
                true
            }
        }

        let page = Arc::new(FakePage::new(Vec::new()).failing_navigation_settle());
        let screens: Vec<Box<dyn Screen>> = vec![Box::new(WaitingScreen {
            acted: acted.clone(),
        })];

        ScreenResolver::new(screens, TICK)
            .run(page, cancel, completion.clone())
            .await;

        assert_eq!(completion.state(), CompletionState::Failed);
        assert_eq!(acted.load(Ordering::SeqCst), 1, "no double submit");
        assert_eq!(completion.take_error().unwrap().screen(), Some("submitting"));
    }

    #[tokio::test]
    async fn completion_settles_exactly_once() {
        let completion = Completion::new();
        let result = LoginResult {
            token: AuthToken::new("tok", SystemTime::now() + Duration::from_secs(3600)),
            cookies: Vec::new(),
        };

        assert!(completion.succeed(result.clone()));
        assert!(!completion.succeed(result));
        assert!(!completion.fail(LoginError::Cancelled));
        assert_eq!(completion.state(), CompletionState::Succeeded);
        assert!(completion.result().is_some());
    }

    #[tokio::test]
    async fn failure_blocks_a_later_success() {
        let completion = Completion::new();
        assert!(completion.fail(LoginError::Cancelled));

        let result = LoginResult {
            token: AuthToken::new("tok", SystemTime::now() + Duration::from_secs(3600)),
            cookies: Vec::new(),
        };
        assert!(!completion.succeed(result));
        assert_eq!(completion.state(), CompletionState::Failed);
    }

    /// The fixed screens must never match the same page simultaneously;
    /// list order would break the tie, but a tie is a logic error.
    #[tokio::test]
    async fn canonical_page_states_match_exactly_one_screen() {
        use crate::application::screens::{consent, credentials as creds_screen, otp, trusted_device};

        let completion = Arc::new(Completion::new());
        let credentials = Credentials::new("user@example.com", "hunter2")
            .with_otp_secret("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ");
        let screens = screen_list(&LoginConfig::default(), &credentials, completion);

        let pages = [
            PageState::at("https://secure.coffre.app/login").with_elements(&[
                consent::BANNER,
                consent::ACCEPT_BUTTON,
                consent::REFUSE_BUTTON,
            ]),
            PageState::at("https://secure.coffre.app/login").with_elements(&[
                creds_screen::USERNAME_INPUT,
                creds_screen::PASSWORD_INPUT,
                creds_screen::SUBMIT_BUTTON,
            ]),
            PageState::at("https://secure.coffre.app/login/otp")
                .with_elements(&[otp::CODE_INPUT, otp::SUBMIT_BUTTON]),
            PageState::at("https://secure.coffre.app/login/device")
                .with_elements(&[trusted_device::PROMPT, trusted_device::LATER_BUTTON]),
            PageState::at("https://secure.coffre.app/home"),
        ];

        for (index, state) in pages.into_iter().enumerate() {
            let page = FakePage::new(vec![state]);
            page.navigate("ignored").await.unwrap();

            let mut matched = 0;
            for screen in &screens {
                if screen.matches(&page).await {
                    matched += 1;
                }
            }
            assert_eq!(matched, 1, "page state {index} must match exactly one screen");
        }
    }
}
