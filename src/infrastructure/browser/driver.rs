use std::time::Duration;

use async_trait::async_trait;

use crate::domain::error::SessionError;
use crate::domain::model::Cookie;

/// Browser-tab abstraction the login screens operate against.
///
/// One driver owns one tab; the screen resolver is its only caller during a
/// login attempt, so operations are never issued concurrently. Every
/// operation is bounded by its own internal timeout; cancellation between
/// operations is cooperative and handled by the resolver.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Launch the browser and open the tab.
    async fn start(&self) -> Result<(), SessionError>;

    /// Terminate the browser, waiting up to `grace` for a clean exit before
    /// killing the process.
    async fn stop(&self, grace: Duration) -> Result<(), SessionError>;

    /// Navigate the tab and wait for the load to finish.
    async fn navigate(&self, url: &str) -> Result<(), SessionError>;

    /// Current page URL. Short-bounded; never blocks indefinitely.
    async fn location(&self) -> Result<String, SessionError>;

    /// Whether an element matching `selector` is present.
    async fn element_exists(&self, selector: &str) -> Result<bool, SessionError>;

    /// Click the element matching `selector`.
    async fn click(&self, selector: &str) -> Result<(), SessionError>;

    /// Focus the element matching `selector` and type `text` into it.
    async fn type_text(&self, selector: &str, text: &str) -> Result<(), SessionError>;

    /// Poll the page's session storage for `key` until it is non-empty or
    /// `timeout` elapses.
    async fn poll_session_value(&self, key: &str, timeout: Duration)
        -> Result<String, SessionError>;

    /// Wait for an in-flight navigation to settle.
    async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), SessionError>;

    /// Cookies currently known to the browser's network stack.
    async fn cookies(&self) -> Result<Vec<Cookie>, SessionError>;

    /// Seed cookies before the first navigation.
    async fn set_cookies(&self, cookies: &[Cookie]) -> Result<(), SessionError>;

    /// Capture a full-page still image (JPEG bytes).
    async fn screenshot(&self) -> Result<Vec<u8>, SessionError>;
}
