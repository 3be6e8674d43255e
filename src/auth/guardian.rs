use std::sync::{Arc, Mutex};

use reqwest::Url;
use tokio::{sync::Notify, task};

use crate::{
    api::{RetryPolicy, budget_thuis},
    auth::{AuthError, Session},
    prelude::*,
};

/// Keeps the session token fresh and confirms that the provider still accepts it.
#[must_use]
#[derive(Clone)]
pub struct TokenGuardian {
    session: Arc<Mutex<Session>>,
    accounts_url: Url,
    retry: RetryPolicy,
    reauth: Arc<Notify>,
}

impl TokenGuardian {
    pub fn new(session: Session, accounts_url: Url, retry: RetryPolicy) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            accounts_url,
            retry,
            reauth: Arc::new(Notify::new()),
        }
    }

    pub fn access_token(&self) -> Result<String> {
        let session = self.session.lock().map_err(|_| anyhow!("the session lock is poisoned"))?;
        Ok(session.token().access_token.clone())
    }

    /// Refresh the token if needed, and validate it with the live user info call.
    ///
    /// On rejection, the re-authentication is requested via [`TokenGuardian::reauth_required`].
    #[instrument(skip_all)]
    pub async fn check_and_refresh_token(&self) -> Result<String, AuthError> {
        let this = self.clone();
        let result = task::spawn_blocking(move || this.check_and_refresh_token_blocking())
            .await
            .unwrap_or_else(|error| Err(AuthError::Other(error.into())));
        if let Err(error) = &result
            && error.requires_reauth()
        {
            warn!("re-authentication is required: {error:#}");
            self.reauth.notify_one();
        }
        result
    }

    fn check_and_refresh_token_blocking(&self) -> Result<String, AuthError> {
        let access_token = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| AuthError::Other(anyhow!("the session lock is poisoned")))?;
            session.ensure_token_valid()?;
            session.token().access_token.clone()
        };
        let user_info =
            budget_thuis::Api::new(self.accounts_url.clone(), &access_token, self.retry)
                .get_user_info()?;
        debug!(subject = user_info.subject(), "the token is accepted");
        Ok(access_token)
    }

    /// Wait until the provider rejects the credentials.
    pub async fn reauth_required(&self) {
        self.reauth.notified().await;
    }
}
