use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, CookieSameSite, TimeSinceEpoch};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio::time::Instant;
use ulid::Ulid;

use super::driver::PageDriver;
use crate::domain::error::SessionError;
use crate::domain::model::{Cookie, SameSite};
use crate::domain::time::{system_time_to_unix_float, unix_float_to_system_time};

const VIEWPORT_WIDTH: u32 = 1280;
const VIEWPORT_HEIGHT: u32 = 800;

const NAVIGATE_TIMEOUT: Duration = Duration::from_secs(30);
const LOCATION_TIMEOUT: Duration = Duration::from_secs(3);
const OPERATION_TIMEOUT: Duration = Duration::from_secs(10);
const SESSION_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Chromium-backed page driver using chromiumoxide.
///
/// Each instance launches its own browser process with a throwaway profile
/// directory, so concurrent login attempts never contend on Chrome's
/// profile singleton lock.
pub struct ChromiumDriver {
    binary: Option<PathBuf>,
    user_data_dir: PathBuf,
    browser: RwLock<Option<Browser>>,
    page: RwLock<Option<Page>>,
    handler_handle: RwLock<Option<tokio::task::JoinHandle<()>>>,
}

impl ChromiumDriver {
    pub fn new(binary: Option<PathBuf>) -> Self {
        let user_data_dir = std::env::temp_dir().join(format!("coffre-login-{}", Ulid::new()));

        Self {
            binary,
            user_data_dir,
            browser: RwLock::new(None),
            page: RwLock::new(None),
            handler_handle: RwLock::new(None),
        }
    }

    async fn page(&self) -> Result<Page, SessionError> {
        self.page
            .read()
            .await
            .clone()
            .ok_or(SessionError::NotStarted)
    }

    async fn bounded<F, T>(
        &self,
        operation: &'static str,
        timeout: Duration,
        fut: F,
    ) -> Result<T, SessionError>
    where
        F: std::future::Future<Output = Result<T, chromiumoxide::error::CdpError>>,
    {
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result.map_err(|source| SessionError::protocol(operation, source)),
            Err(_) => Err(SessionError::Timeout { operation, timeout }),
        }
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn start(&self) -> Result<(), SessionError> {
        if let Err(err) = std::fs::create_dir_all(&self.user_data_dir) {
            return Err(SessionError::Launch(format!(
                "create profile dir {:?}: {err}",
                self.user_data_dir
            )));
        }

        let mut builder = BrowserConfig::builder()
            .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .viewport(chromiumoxide::handler::viewport::Viewport {
                width: VIEWPORT_WIDTH,
                height: VIEWPORT_HEIGHT,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: false,
                has_touch: false,
            })
            .user_data_dir(&self.user_data_dir)
            .arg("--headless=new")
            .arg("--disable-infobars")
            .arg("--mute-audio")
            .arg("--hide-scrollbars");

        if let Some(binary) = &self.binary {
            builder = builder.chrome_executable(binary);
        }

        let config = builder.build().map_err(SessionError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|source| SessionError::protocol("launch browser", source))?;

        let handler_handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    tracing::trace!("browser handler: {err}");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|source| SessionError::protocol("open tab", source))?;

        *self.browser.write().await = Some(browser);
        *self.page.write().await = Some(page);
        *self.handler_handle.write().await = Some(handler_handle);

        tracing::info!(profile = ?self.user_data_dir, "browser started");
        Ok(())
    }

    async fn stop(&self, grace: Duration) -> Result<(), SessionError> {
        *self.page.write().await = None;

        if let Some(mut browser) = self.browser.write().await.take() {
            let graceful = tokio::time::timeout(grace, browser.close()).await;

            match graceful {
                Ok(Ok(_)) => {
                    if tokio::time::timeout(grace, browser.wait()).await.is_err() {
                        tracing::warn!("browser did not exit within {grace:?}, killing");
                        if let Some(Err(err)) = browser.kill().await {
                            tracing::warn!("kill browser: {err}");
                        }
                    }
                }
                Ok(Err(err)) => {
                    tracing::warn!("close browser: {err}, killing");
                    if let Some(Err(err)) = browser.kill().await {
                        tracing::warn!("kill browser: {err}");
                    }
                }
                Err(_) => {
                    tracing::warn!("browser close timed out after {grace:?}, killing");
                    if let Some(Err(err)) = browser.kill().await {
                        tracing::warn!("kill browser: {err}");
                    }
                }
            }
        }

        if let Some(handle) = self.handler_handle.write().await.take() {
            handle.abort();
        }

        if let Err(err) = std::fs::remove_dir_all(&self.user_data_dir) {
            tracing::debug!(profile = ?self.user_data_dir, "remove profile dir: {err}");
        }

        tracing::info!("browser stopped");
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        let page = self.page().await?;
        self.bounded("navigate", NAVIGATE_TIMEOUT, async {
            page.goto(url).await.map(|_| ())
        })
        .await?;

        tracing::debug!(url, "navigated");
        Ok(())
    }

    async fn location(&self) -> Result<String, SessionError> {
        let page = self.page().await?;
        let url = self
            .bounded("get location", LOCATION_TIMEOUT, page.url())
            .await?;

        Ok(url.unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn element_exists(&self, selector: &str) -> Result<bool, SessionError> {
        let page = self.page().await?;
        let script = format!(
            "document.querySelector({}) !== null",
            serde_json::Value::String(selector.to_string())
        );

        let result = self
            .bounded("query selector", OPERATION_TIMEOUT, page.evaluate(script))
            .await?;

        result
            .into_value::<bool>()
            .map_err(|err| SessionError::UnexpectedValue {
                operation: "query selector",
                value: err.to_string(),
            })
    }

    async fn click(&self, selector: &str) -> Result<(), SessionError> {
        let page = self.page().await?;
        let element = self
            .bounded("find element", OPERATION_TIMEOUT, page.find_element(selector))
            .await?;
        self.bounded("click", OPERATION_TIMEOUT, async {
            element.click().await.map(|_| ())
        })
        .await?;

        tracing::debug!(selector, "clicked");
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), SessionError> {
        let page = self.page().await?;
        let element = self
            .bounded("find element", OPERATION_TIMEOUT, page.find_element(selector))
            .await?;
        self.bounded("focus element", OPERATION_TIMEOUT, async {
            element.click().await.map(|_| ())
        })
        .await?;
        self.bounded("type text", OPERATION_TIMEOUT, async {
            element.type_str(text).await.map(|_| ())
        })
        .await?;

        tracing::debug!(selector, "typed text");
        Ok(())
    }

    async fn poll_session_value(
        &self,
        key: &str,
        timeout: Duration,
    ) -> Result<String, SessionError> {
        let page = self.page().await?;
        let script = format!(
            "sessionStorage.getItem({})",
            serde_json::Value::String(key.to_string())
        );
        let deadline = Instant::now() + timeout;

        loop {
            let result = self
                .bounded(
                    "read session storage",
                    OPERATION_TIMEOUT,
                    page.evaluate(script.clone()),
                )
                .await?;

            let value: Option<String> = match result.value() {
                Some(raw) => serde_json::from_value(raw.clone()).map_err(|err| {
                    SessionError::UnexpectedValue {
                        operation: "read session storage",
                        value: err.to_string(),
                    }
                })?,
                None => None,
            };

            if let Some(value) = value {
                if !value.is_empty() {
                    return Ok(value);
                }
            }

            if Instant::now() >= deadline {
                return Err(SessionError::Timeout {
                    operation: "poll session storage",
                    timeout,
                });
            }

            tokio::time::sleep(SESSION_POLL_INTERVAL).await;
        }
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), SessionError> {
        let page = self.page().await?;
        self.bounded("wait for navigation", timeout, async {
            page.wait_for_navigation().await.map(|_| ())
        })
        .await
    }

    async fn cookies(&self) -> Result<Vec<Cookie>, SessionError> {
        let page = self.page().await?;
        let cookies = self
            .bounded("get cookies", OPERATION_TIMEOUT, page.get_cookies())
            .await?;

        Ok(cookies.into_iter().map(convert_cookie).collect())
    }

    async fn set_cookies(&self, cookies: &[Cookie]) -> Result<(), SessionError> {
        let page = self.page().await?;
        let params = cookies
            .iter()
            .map(cookie_param)
            .collect::<Result<Vec<_>, _>>()?;

        self.bounded("set cookies", OPERATION_TIMEOUT, async {
            page.set_cookies(params).await.map(|_| ())
        })
        .await?;

        tracing::debug!(count = cookies.len(), "cookies seeded");
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, SessionError> {
        let page = self.page().await?;
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Jpeg)
            .quality(80)
            .capture_beyond_viewport(true)
            .build();

        self.bounded("capture screenshot", OPERATION_TIMEOUT, page.screenshot(params))
            .await
    }
}

fn convert_cookie(cookie: chromiumoxide::cdp::browser_protocol::network::Cookie) -> Cookie {
    Cookie {
        name: cookie.name,
        value: cookie.value,
        domain: cookie.domain,
        path: cookie.path,
        expires: expires_from_cdp(cookie.expires),
        secure: cookie.secure,
        http_only: cookie.http_only,
        same_site: same_site_from_cdp(cookie.same_site),
    }
}

fn cookie_param(cookie: &Cookie) -> Result<CookieParam, SessionError> {
    let mut builder = CookieParam::builder()
        .name(&cookie.name)
        .value(&cookie.value)
        .domain(&cookie.domain)
        .path(&cookie.path)
        .secure(cookie.secure)
        .http_only(cookie.http_only);

    if let Some(same_site) = same_site_to_cdp(cookie.same_site) {
        builder = builder.same_site(same_site);
    }

    if let Some(expires) = cookie.expires {
        builder = builder.expires(TimeSinceEpoch::new(system_time_to_unix_float(expires)));
    }

    builder.build().map_err(|err| SessionError::UnexpectedValue {
        operation: "build cookie",
        value: err,
    })
}

/// The browser reports expiry as fractional unix seconds, `-1` for session
/// cookies.
fn expires_from_cdp(expires: f64) -> Option<std::time::SystemTime> {
    if expires <= 0.0 {
        return None;
    }

    Some(unix_float_to_system_time(expires))
}

fn same_site_from_cdp(same_site: Option<CookieSameSite>) -> SameSite {
    match same_site {
        Some(CookieSameSite::Lax) => SameSite::Lax,
        Some(CookieSameSite::Strict) => SameSite::Strict,
        Some(CookieSameSite::None) => SameSite::None,
        None => SameSite::Default,
    }
}

fn same_site_to_cdp(same_site: SameSite) -> Option<CookieSameSite> {
    match same_site {
        SameSite::Lax => Some(CookieSameSite::Lax),
        SameSite::Strict => Some(CookieSameSite::Strict),
        SameSite::None => Some(CookieSameSite::None),
        SameSite::Default => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration as StdDuration, UNIX_EPOCH};

    #[test]
    fn session_cookies_have_no_expiry() {
        assert_eq!(expires_from_cdp(-1.0), None);
        assert_eq!(expires_from_cdp(0.0), None);
    }

    #[test]
    fn expiry_keeps_fractional_seconds() {
        let expires = expires_from_cdp(1_700_000_000.5).unwrap();
        let elapsed = expires.duration_since(UNIX_EPOCH).unwrap();
        assert_eq!(elapsed.as_secs(), 1_700_000_000);
        assert_eq!(elapsed.subsec_nanos(), 500_000_000);
    }

    #[test]
    fn known_same_site_values_convert_faithfully() {
        assert_eq!(same_site_from_cdp(Some(CookieSameSite::Lax)), SameSite::Lax);
        assert_eq!(
            same_site_from_cdp(Some(CookieSameSite::Strict)),
            SameSite::Strict
        );
        assert_eq!(
            same_site_from_cdp(Some(CookieSameSite::None)),
            SameSite::None
        );
    }

    #[test]
    fn missing_same_site_degrades_to_default() {
        assert_eq!(same_site_from_cdp(None), SameSite::Default);
        assert_eq!(same_site_to_cdp(SameSite::Default), None);
    }

    #[test]
    fn cookie_param_round_trips_attributes() {
        let cookie = Cookie {
            name: "session_id".to_string(),
            value: "abc".to_string(),
            domain: "secure.coffre.app".to_string(),
            path: "/".to_string(),
            expires: Some(UNIX_EPOCH + StdDuration::from_secs(1_800_000_000)),
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
        };

        let param = cookie_param(&cookie).unwrap();
        assert_eq!(param.name, "session_id");
        assert_eq!(param.domain.as_deref(), Some("secure.coffre.app"));
        assert_eq!(param.secure, Some(true));
    }
}
