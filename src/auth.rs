mod credentials;
mod guardian;
pub mod oauth;
mod pkce;
mod session;

pub use self::{
    credentials::{Credentials, Token},
    guardian::TokenGuardian,
    pkce::{Pkce, generate_state},
    session::Session,
};
use crate::{api, prelude::*};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum AuthError {
    /// The provider refused the credentials.
    #[display("the provider rejected the credentials, log in again")]
    Rejected(api::Error),

    #[display("the access token expired and there is no refresh token, log in again")]
    NoRefreshToken,

    #[display("failed to validate the credentials")]
    Request(api::Error),

    #[display("{_0:#}")]
    Other(#[error(not(source))] Error),
}

impl AuthError {
    /// Whether the user has to go through the login again.
    #[must_use]
    pub const fn requires_reauth(&self) -> bool {
        matches!(self, Self::Rejected(_) | Self::NoRefreshToken)
    }
}

impl From<api::Error> for AuthError {
    fn from(error: api::Error) -> Self {
        if error.is_rejection() { Self::Rejected(error) } else { Self::Request(error) }
    }
}
