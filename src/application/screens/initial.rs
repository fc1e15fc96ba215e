use async_trait::async_trait;

use super::Screen;
use crate::domain::error::LoginError;
use crate::infrastructure::browser::PageDriver;

/// The blank tab before the login page has been opened. Its action performs
/// the first navigation; `navigate` itself waits for the load to finish.
pub(crate) struct InitialScreen {
    url: String,
}

impl InitialScreen {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Screen for InitialScreen {
    fn name(&self) -> &'static str {
        "initial load"
    }

    async fn matches(&self, page: &dyn PageDriver) -> bool {
        match page.location().await {
            Ok(location) => location.is_empty() || location == "about:blank",
            Err(err) => {
                tracing::debug!(screen = self.name(), "match evaluation failed: {err}");
                false
            }
        }
    }

    async fn act(&self, page: &dyn PageDriver) -> Result<(), LoginError> {
        page.navigate(&self.url).await?;
        Ok(())
    }
}
