//! Scripted in-memory page driver for exercising screens, the resolver and
//! the login controller without a browser process.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::driver::PageDriver;
use crate::domain::error::SessionError;
use crate::domain::model::Cookie;

/// One recognizable state of the fake site: a location, the selectors that
/// resolve on it, and its session storage contents.
#[derive(Clone, Default)]
pub(crate) struct PageState {
    pub location: String,
    pub elements: Vec<&'static str>,
    pub session: HashMap<String, String>,
}

impl PageState {
    pub fn at(location: &str) -> Self {
        Self {
            location: location.to_string(),
            ..Self::default()
        }
    }

    pub fn with_elements(mut self, elements: &[&'static str]) -> Self {
        self.elements = elements.to_vec();
        self
    }

    pub fn with_session(mut self, key: &str, value: &str) -> Self {
        self.session.insert(key.to_string(), value.to_string());
        self
    }
}

#[derive(Default)]
struct FakeState {
    current: PageState,
    pending: VecDeque<PageState>,
    clicks: Vec<String>,
    typed: Vec<(String, String)>,
    cookies: Vec<Cookie>,
    seeded: Vec<Cookie>,
    screenshot: Option<Vec<u8>>,
    fail_location: bool,
    fail_navigation_settle: bool,
    started: bool,
    stopped: bool,
}

/// Fake `PageDriver`. Starts at `about:blank`; `navigate` lands on the first
/// scripted state and every subsequent click advances to the next one, which
/// is how the real site transitions between login screens.
#[derive(Default)]
pub(crate) struct FakePage {
    state: Mutex<FakeState>,
}

impl FakePage {
    pub fn new(states: Vec<PageState>) -> Self {
        let fake = Self::default();
        {
            let mut state = fake.state.lock().unwrap();
            state.current = PageState::at("about:blank");
            state.pending = states.into();
        }
        fake
    }

    pub fn with_cookies(self, cookies: Vec<Cookie>) -> Self {
        self.state.lock().unwrap().cookies = cookies;
        self
    }

    pub fn with_screenshot(self, bytes: Vec<u8>) -> Self {
        self.state.lock().unwrap().screenshot = Some(bytes);
        self
    }

    pub fn failing_location(self) -> Self {
        self.state.lock().unwrap().fail_location = true;
        self
    }

    pub fn failing_navigation_settle(self) -> Self {
        self.state.lock().unwrap().fail_navigation_settle = true;
        self
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().typed.clone()
    }

    pub fn seeded_cookies(&self) -> Vec<Cookie> {
        self.state.lock().unwrap().seeded.clone()
    }

    pub fn started(&self) -> bool {
        self.state.lock().unwrap().started
    }

    pub fn stopped(&self) -> bool {
        self.state.lock().unwrap().stopped
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn start(&self) -> Result<(), SessionError> {
        self.state.lock().unwrap().started = true;
        Ok(())
    }

    async fn stop(&self, _grace: Duration) -> Result<(), SessionError> {
        self.state.lock().unwrap().stopped = true;
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        match state.pending.pop_front() {
            Some(next) => state.current = next,
            None => state.current = PageState::at(url),
        }
        Ok(())
    }

    async fn location(&self) -> Result<String, SessionError> {
        let state = self.state.lock().unwrap();
        if state.fail_location {
            return Err(SessionError::Timeout {
                operation: "get location",
                timeout: Duration::ZERO,
            });
        }
        Ok(state.current.location.clone())
    }

    async fn element_exists(&self, selector: &str) -> Result<bool, SessionError> {
        let state = self.state.lock().unwrap();
        Ok(state.current.elements.contains(&selector))
    }

    async fn click(&self, selector: &str) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        if !state.current.elements.contains(&selector) {
            return Err(SessionError::UnexpectedValue {
                operation: "find element",
                value: selector.to_string(),
            });
        }

        state.clicks.push(selector.to_string());
        if let Some(next) = state.pending.pop_front() {
            state.current = next;
        }
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        if !state.current.elements.contains(&selector) {
            return Err(SessionError::UnexpectedValue {
                operation: "find element",
                value: selector.to_string(),
            });
        }

        state.typed.push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn poll_session_value(
        &self,
        key: &str,
        timeout: Duration,
    ) -> Result<String, SessionError> {
        let state = self.state.lock().unwrap();
        match state.current.session.get(key) {
            Some(value) if !value.is_empty() => Ok(value.clone()),
            _ => Err(SessionError::Timeout {
                operation: "poll session storage",
                timeout,
            }),
        }
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), SessionError> {
        let state = self.state.lock().unwrap();
        if state.fail_navigation_settle {
            return Err(SessionError::Timeout {
                operation: "wait for navigation",
                timeout,
            });
        }
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<Cookie>, SessionError> {
        Ok(self.state.lock().unwrap().cookies.clone())
    }

    async fn set_cookies(&self, cookies: &[Cookie]) -> Result<(), SessionError> {
        self.state.lock().unwrap().seeded.extend_from_slice(cookies);
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, SessionError> {
        let state = self.state.lock().unwrap();
        state
            .screenshot
            .clone()
            .ok_or(SessionError::Timeout {
                operation: "capture screenshot",
                timeout: Duration::ZERO,
            })
    }
}
