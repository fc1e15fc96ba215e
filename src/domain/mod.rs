pub mod error;
pub mod login;
pub mod model;
pub mod time;
pub mod totp;
