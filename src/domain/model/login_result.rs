use serde::{Deserialize, Serialize};

use super::{AuthToken, Cookie};

/// Token and cookie set produced by a successful login.
///
/// Written exactly once per attempt, by the terminal screen, and owned by
/// the caller after the browser session is torn down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResult {
    pub token: AuthToken,
    pub cookies: Vec<Cookie>,
}
