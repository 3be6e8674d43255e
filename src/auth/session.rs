use chrono::Utc;

use crate::{
    auth::{
        AuthError,
        credentials::{Credentials, Token},
        oauth,
    },
    prelude::*,
};

/// Stored `OAuth2` token with expiry-driven refresh.
pub struct Session {
    credentials: Credentials,
    token: Token,
    oauth: oauth::Client,
}

impl Session {
    pub fn load(credentials: Credentials, oauth: oauth::Client) -> Result<Self> {
        let token = credentials.load()?;
        Ok(Self { credentials, token, oauth })
    }

    pub const fn token(&self) -> &Token {
        &self.token
    }

    /// Refresh the token if it is about to expire.
    ///
    /// Blocking.
    #[instrument(skip_all)]
    pub fn ensure_token_valid(&mut self) -> Result<(), AuthError> {
        if self.token.is_valid_at(Utc::now()) {
            return Ok(());
        }
        let refresh_token =
            self.token.refresh_token.as_deref().ok_or(AuthError::NoRefreshToken)?;
        let token = self.oauth.refresh(refresh_token)?;
        self.credentials.save(&token).map_err(AuthError::Other)?;
        info!(expires_at = %token.expires_at, "refreshed");
        self.token = token;
        Ok(())
    }
}
