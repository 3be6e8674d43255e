use std::sync::Arc;

use clap::Parser;
use reqwest::Url;
use tokio::{signal, time::sleep};

use crate::{
    api::home_assistant,
    cli::provider::ProviderArgs,
    entry::{ConfigEntry, Setup, SetupError},
    prelude::*,
    sensor::{LogStore, StateStore},
};

#[derive(Parser)]
pub struct WatchArgs {
    #[clap(flatten)]
    provider: ProviderArgs,

    #[clap(flatten)]
    home_assistant: HomeAssistantConnectionArgs,

    /// Tariff polling interval.
    #[clap(long, env = "REFRESH_INTERVAL", default_value = "90s")]
    refresh_interval: humantime::Duration,

    /// Delay before setting up again when the provider is unreachable.
    #[clap(long, env = "SETUP_RETRY_INTERVAL", default_value = "1min")]
    setup_retry_interval: humantime::Duration,
}

impl WatchArgs {
    pub async fn run(self) -> Result {
        let guardian = self.provider.guardian()?;
        let setup = Setup::builder()
            .guardian(guardian.clone())
            .accounts_url(self.provider.accounts_url.clone())
            .nutsservices_url(self.provider.nutsservices_url.clone())
            .store(self.home_assistant.store()?)
            .retry(self.provider.retry())
            .refresh_period(self.refresh_interval.into())
            .build();

        let entry = tokio::select! {
            entry = self.set_up(&setup) => entry?,
            result = signal::ctrl_c() => {
                result?;
                info!("interrupted");
                return Ok(());
            }
        };

        let result = tokio::select! {
            result = signal::ctrl_c() => {
                info!("interrupted");
                result.map_err(Error::from)
            }
            () = guardian.reauth_required() => {
                Err(anyhow!("the provider rejected the credentials, run `login` again"))
            }
        };
        entry.unload();
        result
    }

    /// Set up the entry, retrying while the provider is not ready.
    async fn set_up(&self, setup: &Setup) -> Result<ConfigEntry> {
        loop {
            match setup.setup().await {
                Ok(entry) => break Ok(entry),
                Err(SetupError::NotReady(error)) => {
                    warn!(
                        retry_in = %self.setup_retry_interval,
                        "the provider is not ready: {error:#}",
                    );
                    sleep(self.setup_retry_interval.into()).await;
                }
                Err(error @ SetupError::Reauth(_)) => {
                    break Err(Error::from(error).context("run `login` again"));
                }
                Err(error) => break Err(error.into()),
            }
        }
    }
}

#[derive(Parser)]
pub struct HomeAssistantConnectionArgs {
    /// Home Assistant API access token. Without it, the readings are only logged.
    #[clap(
        long = "home-assistant-access-token",
        env = "HOME_ASSISTANT_ACCESS_TOKEN",
        requires = "base_url"
    )]
    access_token: Option<String>,

    /// Home Assistant API base URL. For example: `http://localhost:8123/api`.
    #[clap(
        long = "home-assistant-api-base-url",
        env = "HOME_ASSISTANT_API_BASE_URL",
        requires = "access_token"
    )]
    base_url: Option<Url>,
}

impl HomeAssistantConnectionArgs {
    fn store(&self) -> Result<Arc<dyn StateStore>> {
        match (&self.access_token, &self.base_url) {
            (Some(access_token), Some(base_url)) => {
                Ok(Arc::new(home_assistant::Api::try_new(access_token, base_url.clone())?))
            }
            _ => {
                info!("no Home Assistant connection, the readings will only be logged");
                Ok(Arc::new(LogStore))
            }
        }
    }
}
