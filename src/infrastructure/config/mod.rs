mod options;

pub use options::{
    LoginConfig, LoginOption, OptionKind, DEFAULT_LOGIN_URL, DEFAULT_REFRESH_FREQUENCY,
};
