mod cookie;
mod credentials;
mod login_result;
mod token;

pub use cookie::{Cookie, SameSite};
pub use credentials::Credentials;
pub use login_result::LoginResult;
pub use token::{AuthToken, EXPIRY_LEEWAY, SUSPICIOUS_REMAINING};
