use async_trait::async_trait;

use super::{element_match, Screen};
use crate::domain::error::LoginError;
use crate::infrastructure::browser::PageDriver;

pub(crate) const USERNAME_INPUT: &str = "#username";
pub(crate) const PASSWORD_INPUT: &str = "#password";
pub(crate) const SUBMIT_BUTTON: &str = "#login-form button[type=\"submit\"]";

/// The username/password form. Submitting navigates, so the resolver must
/// wait for the response before re-polling: a second submit while the first
/// is in flight can lock the account.
pub(crate) struct CredentialsScreen {
    username: String,
    password: String,
}

impl CredentialsScreen {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

#[async_trait]
impl Screen for CredentialsScreen {
    fn name(&self) -> &'static str {
        "credentials"
    }

    async fn matches(&self, page: &dyn PageDriver) -> bool {
        element_match(page, self.name(), USERNAME_INPUT).await
    }

    async fn act(&self, page: &dyn PageDriver) -> Result<(), LoginError> {
        page.type_text(USERNAME_INPUT, &self.username).await?;
        page.type_text(PASSWORD_INPUT, &self.password).await?;
        page.click(SUBMIT_BUTTON).await?;

        tracing::info!(username = %self.username, "credentials submitted");
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

    fn login_form() -> PageState {
        PageState::at("https://secure.coffre.app/login").with_elements(&[
            USERNAME_INPUT,
            PASSWORD_INPUT,
            SUBMIT_BUTTON,
        ])
    }

    #[tokio::test]
    async fn fills_the_form_and_submits() {
        let page = FakePage::new(vec![login_form()]);
        page.navigate("https://secure.coffre.app/login").await.unwrap();

        let screen = CredentialsScreen::new("user@example.com", "hunter2");
        assert!(screen.matches(&page).await);
        assert!(screen.waits_for_navigation());

        screen.act(&page).await.unwrap();

        assert_eq!(
            page.typed(),
            vec![
                (USERNAME_INPUT.to_string(), "user@example.com".to_string()),
                (PASSWORD_INPUT.to_string(), "hunter2".to_string()),
            ]
        );
        assert_eq!(page.clicks(), vec![SUBMIT_BUTTON.to_string()]);
    }

    #[tokio::test]
    async fn missing_field_fails_the_action() {
        let page = FakePage::new(vec![
            PageState::at("https://secure.coffre.app/login").with_elements(&[USERNAME_INPUT])
        ]);
        page.navigate("https://secure.coffre.app/login").await.unwrap();

        let screen = CredentialsScreen::new("user@example.com", "hunter2");
        let err = screen.act(&page).await.unwrap_err();
        assert!(matches!(err, LoginError::Session(_)));
    }
}
