use async_trait::async_trait;

use super::{element_match, Screen};
use crate::domain::error::LoginError;
use crate::domain::totp;
use crate::infrastructure::browser::PageDriver;

pub(crate) const CODE_INPUT: &str = "#otp-code";
pub(crate) const SUBMIT_BUTTON: &str = "#otp-form button[type=\"submit\"]";

/// One-time-code entry, shown for accounts with a second factor.
///
/// Reaching this screen without a configured shared secret is a hard
/// failure: the flow cannot advance and skipping would hang the resolver
/// until the timeout with no usable diagnostic.
pub(crate) struct OtpScreen {
    secret: Option<String>,
}

impl OtpScreen {
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }
}

#[async_trait]
impl Screen for OtpScreen {
    fn name(&self) -> &'static str {
        "one-time-code"
    }

    async fn matches(&self, page: &dyn PageDriver) -> bool {
        element_match(page, self.name(), CODE_INPUT).await
    }

    async fn act(&self, page: &dyn PageDriver) -> Result<(), LoginError> {
        let secret = self.secret.as_deref().ok_or(LoginError::MissingOtpSecret)?;
        let code = totp::code(secret)?;

        page.type_text(CODE_INPUT, &code).await?;
        page.click(SUBMIT_BUTTON).await?;

        tracing::info!("one-time code submitted");
        Ok(())
    }

    fn waits_for_navigation(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::browser::fake::{FakePage, PageState};

    const SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    fn otp_page() -> PageState {
        PageState::at("https://secure.coffre.app/login/otp")
            .with_elements(&[CODE_INPUT, SUBMIT_BUTTON])
    }

    #[tokio::test]
    async fn submits_a_six_digit_code() {
        let page = FakePage::new(vec![otp_page()]);
        page.navigate("https://secure.coffre.app/login/otp").await.unwrap();

        let screen = OtpScreen::new(Some(SECRET.to_string()));
        assert!(screen.matches(&page).await);
        screen.act(&page).await.unwrap();

        let typed = page.typed();
        assert_eq!(typed.len(), 1);
        assert_eq!(typed[0].0, CODE_INPUT);
        assert_eq!(typed[0].1.len(), 6);
        assert!(typed[0].1.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(page.clicks(), vec![SUBMIT_BUTTON.to_string()]);
    }

    #[tokio::test]
    async fn missing_secret_is_a_hard_failure() {
        let page = FakePage::new(vec![otp_page()]);
        page.navigate("https://secure.coffre.app/login/otp").await.unwrap();

        let screen = OtpScreen::new(None);
        let err = screen.act(&page).await.unwrap_err();
        assert!(matches!(err, LoginError::MissingOtpSecret));
        assert!(page.typed().is_empty());
    }

    #[tokio::test]
    async fn invalid_secret_is_reported() {
        let page = FakePage::new(vec![otp_page()]);
        page.navigate("https://secure.coffre.app/login/otp").await.unwrap();

        let screen = OtpScreen::new(Some("not!base32".to_string()));
        let err = screen.act(&page).await.unwrap_err();
        assert!(matches!(err, LoginError::Otp(_)));
    }
}
