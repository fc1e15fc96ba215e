use async_trait::async_trait;

use super::{element_match, Screen};
use crate::domain::error::LoginError;
use crate::infrastructure::browser::PageDriver;

pub(crate) const PROMPT: &str = "#trusted-device";
pub(crate) const LATER_BUTTON: &str = "#trusted-device button[data-choice=\"later\"]";

/// "Trust this device?" interstitial. Optional: some accounts never see it,
/// which is not an error.
pub(crate) struct TrustedDeviceScreen;

#[async_trait]
impl Screen for TrustedDeviceScreen {
    fn name(&self) -> &'static str {
        "trusted device"
    }

    async fn matches(&self, page: &dyn PageDriver) -> bool {
        element_match(page, self.name(), PROMPT).await
    }

    async fn act(&self, page: &dyn PageDriver) -> Result<(), LoginError> {
        page.click(LATER_BUTTON).await?;

        tracing::info!("trusted-device prompt dismissed");
        Ok(())
    }

    fn waits_for_navigation(&self) -> bool {
        true
    }
}
