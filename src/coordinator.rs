//! Periodic poll-and-replace of the tariff snapshot.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bon::Builder;
use chrono::{DateTime, Utc};
use reqwest::Url;
use tokio::{
    sync::watch,
    task::{self, JoinError},
    time::{MissedTickBehavior, interval},
};

use crate::{
    api::{self, RetryPolicy, nutsservices},
    auth::{AuthError, TokenGuardian},
    core::{Contract, Entry, HourlyTariff, Snapshot},
    prelude::*,
};

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(90);

/// What the sensors see.
#[must_use]
#[derive(Clone, Debug, Default)]
pub struct Status {
    /// Last fully successful snapshot, empty until the first success.
    pub snapshot: Arc<Snapshot>,

    pub last_update_success: bool,
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Validated access token.
    async fn check_and_refresh_token(&self) -> Result<String, AuthError>;
}

#[async_trait]
impl TokenSource for TokenGuardian {
    async fn check_and_refresh_token(&self) -> Result<String, AuthError> {
        Self::check_and_refresh_token(self).await
    }
}

/// Blocking contract and tariff calls.
pub trait TariffApi: Send + Sync + 'static {
    fn all_contracts(&self) -> Result<Vec<Contract>, api::Error>;

    fn hourly_tariff(&self, contract_id: u64) -> Result<Vec<HourlyTariff>, api::Error>;
}

impl TariffApi for nutsservices::Api {
    fn all_contracts(&self) -> Result<Vec<Contract>, api::Error> {
        Self::all_contracts(self)
    }

    fn hourly_tariff(&self, contract_id: u64) -> Result<Vec<HourlyTariff>, api::Error> {
        Self::hourly_tariff(self, contract_id)
    }
}

/// Builds a fresh client for every refresh cycle, so that a token never outlives the cycle.
pub trait Connector: Send + Sync {
    type Api: TariffApi;

    fn connect(&self, access_token: &str) -> Self::Api;
}

#[must_use]
pub struct NutsservicesConnector {
    pub base_url: Url,
    pub retry: RetryPolicy,
}

impl Connector for NutsservicesConnector {
    type Api = nutsservices::Api;

    fn connect(&self, access_token: &str) -> Self::Api {
        nutsservices::Api::new(self.base_url.clone(), access_token, self.retry)
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum RefreshError {
    #[display("failed to validate the token")]
    Auth(AuthError),

    #[display("failed to fetch the tariffs")]
    Request(api::Error),

    #[display("the blocking call panicked or got cancelled")]
    Join(JoinError),
}

impl RefreshError {
    #[must_use]
    pub const fn requires_reauth(&self) -> bool {
        matches!(self, Self::Auth(error) if error.requires_reauth())
    }
}

#[derive(Builder)]
pub struct Coordinator<S, C> {
    token_source: S,
    connector: C,

    #[builder(default = DEFAULT_PERIOD)]
    period: Duration,

    #[builder(default = Utc::now as fn() -> DateTime<Utc>)]
    clock: fn() -> DateTime<Utc>,

    #[builder(skip = watch::Sender::new(Status::default()))]
    sender: watch::Sender<Status>,
}

impl<S: TokenSource, C: Connector> Coordinator<S, C> {
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.sender.subscribe()
    }

    pub fn status(&self) -> Status {
        self.sender.borrow().clone()
    }

    /// Initial refresh, the caller decides whether a failure is fatal.
    #[instrument(skip_all)]
    pub async fn first_refresh(&mut self) -> Result<(), RefreshError> {
        self.refresh().await?;
        info!(n_contracts = self.sender.borrow().snapshot.len(), "first refresh done");
        Ok(())
    }

    /// Fetch the new snapshot and publish it.
    ///
    /// On failure, the previous snapshot stays published and only the success flag gets cleared.
    #[instrument(skip_all)]
    pub async fn refresh(&mut self) -> Result<(), RefreshError> {
        match self.fetch().await {
            Ok(snapshot) => {
                debug!(n_contracts = snapshot.len(), "refreshed");
                let snapshot = Arc::new(snapshot);
                self.sender.send_modify(|status| {
                    *status = Status { snapshot, last_update_success: true };
                });
                Ok(())
            }
            Err(error) => {
                self.sender.send_if_modified(|status| {
                    std::mem::replace(&mut status.last_update_success, false)
                });
                Err(error)
            }
        }
    }

    async fn fetch(&self) -> Result<Snapshot, RefreshError> {
        let access_token = self.token_source.check_and_refresh_token().await?;
        let api = Arc::new(self.connector.connect(&access_token));

        let contracts = {
            let api = api.clone();
            task::spawn_blocking(move || api.all_contracts()).await??
        };

        let mut snapshot = Vec::with_capacity(contracts.len());
        for contract in contracts {
            if !contract.is_dynamic() {
                debug!(
                    contract.id,
                    contract_type = %contract.contract_type,
                    "skipping the non-dynamic contract",
                );
                continue;
            }
            let tariffs = {
                let api = api.clone();
                task::spawn_blocking(move || api.hourly_tariff(contract.id)).await??
            };
            let now = (self.clock)();
            let entry = Entry::new(contract, tariffs, now);
            if entry.current_tariff.is_none() {
                warn!(contract.id = entry.contract.id, %now, "no tariff covers the current time");
            }
            snapshot.push(entry);
        }
        Ok(Snapshot(snapshot))
    }

    /// Refresh forever with the fixed period, starting one period after now.
    pub async fn run(mut self) {
        let mut interval = interval(self.period);
        interval.reset_after(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Err(error) = self.refresh().await {
                error!("refresh failed: {:#}", Error::from(error));
            }
        }
    }
}
