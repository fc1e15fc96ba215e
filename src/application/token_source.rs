//! Token-source adapter feeding the resolved token into a standard
//! token-refresh pipeline.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::error::LoginError;
use crate::domain::login::LoginMethod;
use crate::domain::model::{AuthToken, Cookie, Credentials};

/// Callback invoked with the fresh token and cookies after each login.
pub type TokenListener = Box<dyn Fn(&AuthToken, &[Cookie]) + Send + Sync>;

#[derive(Debug, Error)]
pub enum TokenSourceError {
    #[error("no token sources")]
    NoSources,

    #[error("login: {0}")]
    Login(#[from] LoginError),

    #[error("source {index}: {source}")]
    Source {
        index: usize,
        #[source]
        source: Box<TokenSourceError>,
    },

    #[error("no token source produced a valid token")]
    Exhausted(Vec<TokenSourceError>),
}

/// Something that can produce a valid bearer token on demand.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<AuthToken, TokenSourceError>;
}

/// Token source that performs a full login on every `token` call.
///
/// Wrap it in a caching layer to avoid logging in more often than the token
/// actually expires.
pub struct LoginTokenSource<M> {
    method: M,
    credentials: Credentials,
    listener: Option<TokenListener>,
}

impl<M: LoginMethod> LoginTokenSource<M> {
    pub fn new(method: M, credentials: Credentials) -> Self {
        Self {
            method,
            credentials,
            listener: None,
        }
    }

    /// Register a callback for the cookies that accompany each new token;
    /// the REST collaborator needs them alongside the bearer token.
    pub fn with_listener(
        mut self,
        listener: impl Fn(&AuthToken, &[Cookie]) + Send + Sync + 'static,
    ) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }
}

#[async_trait]
impl<M: LoginMethod> TokenSource for LoginTokenSource<M> {
    async fn token(&self) -> Result<AuthToken, TokenSourceError> {
        let result = self
            .method
            .login(&CancellationToken::new(), &self.credentials)
            .await?;

        if let Some(listener) = &self.listener {
            listener(&result.token, &result.cookies);
        }

        Ok(result.token)
    }
}

/// Tries each source in order and returns the first valid token.
///
/// Sources that error are recorded with their position; sources that return
/// an invalid token are skipped.
pub struct CombinedTokenSources {
    sources: Vec<Box<dyn TokenSource>>,
}

impl CombinedTokenSources {
    pub fn new(sources: Vec<Box<dyn TokenSource>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl TokenSource for CombinedTokenSources {
    async fn token(&self) -> Result<AuthToken, TokenSourceError> {
        if self.sources.is_empty() {
            return Err(TokenSourceError::NoSources);
        }

        let mut errors = Vec::new();

        for (index, source) in self.sources.iter().enumerate() {
            match source.token().await {
                Ok(token) if token.valid() => return Ok(token),
                Ok(_) => continue,
                Err(err) => errors.push(TokenSourceError::Source {
                    index: index + 1,
                    source: Box::new(err),
                }),
            }
        }

        Err(TokenSourceError::Exhausted(errors))
    }
}
