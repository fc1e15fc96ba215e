use async_trait::async_trait;

use super::{element_match, Screen};
use crate::domain::error::LoginError;
use crate::infrastructure::browser::PageDriver;

pub(crate) const BANNER: &str = "#privacy-consent";
pub(crate) const ACCEPT_BUTTON: &str = "#privacy-consent button[data-choice=\"accept\"]";
pub(crate) const REFUSE_BUTTON: &str = "#privacy-consent button[data-choice=\"refuse\"]";

/// Cookie/privacy banner shown on first contact with the site.
pub(crate) struct ConsentScreen {
    accept: bool,
}

impl ConsentScreen {
    pub fn new(accept: bool) -> Self {
        Self { accept }
    }
}

#[async_trait]
impl Screen for ConsentScreen {
    fn name(&self) -> &'static str {
        "privacy consent"
    }

    async fn matches(&self, page: &dyn PageDriver) -> bool {
        element_match(page, self.name(), BANNER).await
    }

    async fn act(&self, page: &dyn PageDriver) -> Result<(), LoginError> {
        let button = if self.accept {
            ACCEPT_BUTTON
        } else {
            REFUSE_BUTTON
        };

        page.click(button).await?;

        tracing::info!(accepted = self.accept, "privacy banner answered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::browser::fake::{FakePage, PageState};

    fn consent_page() -> PageState {
        PageState::at("https://secure.coffre.app/login")
            .with_elements(&[BANNER, ACCEPT_BUTTON, REFUSE_BUTTON])
    }

    #[tokio::test]
    async fn refuses_by_default() {
        let page = FakePage::new(vec![consent_page()]);
        page.navigate("https://secure.coffre.app/login").await.unwrap();

        let screen = ConsentScreen::new(false);
        assert!(screen.matches(&page).await);
        screen.act(&page).await.unwrap();

        assert_eq!(page.clicks(), vec![REFUSE_BUTTON.to_string()]);
    }

    #[tokio::test]
    async fn accepts_when_configured() {
        let page = FakePage::new(vec![consent_page()]);
        page.navigate("https://secure.coffre.app/login").await.unwrap();

        let screen = ConsentScreen::new(true);
        screen.act(&page).await.unwrap();

        assert_eq!(page.clicks(), vec![ACCEPT_BUTTON.to_string()]);
    }

    #[tokio::test]
    async fn does_not_match_without_the_banner() {
        let page = FakePage::new(vec![PageState::at("https://secure.coffre.app/login")]);
        page.navigate("https://secure.coffre.app/login").await.unwrap();

        assert!(!ConsentScreen::new(false).matches(&page).await);
    }
}
