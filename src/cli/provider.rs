use std::path::PathBuf;

use clap::Parser;
use reqwest::Url;

use crate::{
    api::{RetryPolicy, budget_thuis, nutsservices},
    auth::{Credentials, Session, TokenGuardian, oauth},
    prelude::*,
};

#[derive(Parser)]
pub struct ProviderArgs {
    /// Where the login stores the `OAuth2` token.
    #[clap(long = "credentials-path", env = "BUDGETTHUIS_CREDENTIALS_PATH", default_value = "budgetthuis.toml")]
    credentials_path: PathBuf,

    /// Number of retries of failed connections.
    #[clap(long = "retry-total", env = "BUDGETTHUIS_RETRY_TOTAL", default_value = "5")]
    retry_total: u32,

    #[clap(
        long = "accounts-url",
        env = "BUDGETTHUIS_ACCOUNTS_URL",
        default_value = budget_thuis::BASE_URL,
        hide = true,
    )]
    pub accounts_url: Url,

    #[clap(
        long = "nutsservices-url",
        env = "BUDGETTHUIS_NUTSSERVICES_URL",
        default_value = nutsservices::BASE_URL,
        hide = true,
    )]
    pub nutsservices_url: Url,
}

impl ProviderArgs {
    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy::builder().total(self.retry_total).build()
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.credentials_path)
    }

    pub fn oauth_client(&self) -> oauth::Client {
        oauth::Client::new(self.accounts_url.clone(), self.retry())
    }

    /// Load the stored credentials.
    pub fn guardian(&self) -> Result<TokenGuardian> {
        let session = Session::load(self.credentials(), self.oauth_client())?;
        Ok(TokenGuardian::new(session, self.accounts_url.clone(), self.retry()))
    }
}
