use std::io::{self, BufRead};

use clap::Parser;
use tokio::task;

use crate::{
    api::budget_thuis,
    auth::{Pkce, generate_state, oauth},
    cli::provider::ProviderArgs,
    prelude::*,
};

#[derive(Parser)]
pub struct LoginArgs {
    #[clap(flatten)]
    provider: ProviderArgs,
}

impl LoginArgs {
    #[instrument(skip_all)]
    pub async fn run(self) -> Result {
        let oauth = self.provider.oauth_client();
        let pkce = Pkce::generate();
        let state = generate_state();
        let authorize_url = oauth.authorize_url(&pkce, &state)?;

        println!("Open the link and log in:\n\n{authorize_url}\n");
        println!(
            "The browser then fails to open `{}…`. Copy that address from the developer tools and paste it here:",
            oauth::REDIRECT_URI,
        );
        let redirect_url = task::spawn_blocking(|| {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line).map(|_| line)
        })
        .await??;
        let code = oauth::parse_redirect(redirect_url.trim(), &state)?;

        let token = task::spawn_blocking(move || oauth.exchange_code(&code, &pkce))
            .await?
            .context("failed to exchange the authorization code")?;
        let credentials = self.provider.credentials();
        credentials.save(&token)?;

        let api = budget_thuis::Api::new(
            self.provider.accounts_url.clone(),
            &token.access_token,
            self.provider.retry(),
        );
        let user_info = task::spawn_blocking(move || api.get_user_info()).await??;
        if let Some(error) = user_info.error() {
            bail!("the provider reported an error: {error}");
        }
        info!(
            email = user_info.email(),
            path = %credentials.path().display(),
            "logged in",
        );
        Ok(())
    }
}
