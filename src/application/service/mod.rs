mod login_session;

pub use login_session::LoginSession;
