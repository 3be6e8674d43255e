//! Per-entry context: everything a running integration owns, from setup till unload.

use std::{sync::Arc, time::Duration};

use bon::Builder;
use chrono::Utc;
use itertools::Itertools;
use reqwest::Url;
use tokio::task;

use crate::{
    api::{RetryPolicy, budget_thuis},
    auth::{AuthError, TokenGuardian},
    coordinator::{Coordinator, DEFAULT_PERIOD, NutsservicesConnector, RefreshError},
    prelude::*,
    sensor::{self, Sensor, SensorKind, StateStore},
    task::Task,
};

/// Used when the provider does not report the subject.
const DEFAULT_UNIQUE_ID: &str = "budgetthuis";

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SetupError {
    /// Transient failure, setting up again later may succeed.
    #[display("not ready: {_0:#}")]
    NotReady(#[error(not(source))] Error),

    #[display("re-authentication is required")]
    Reauth(AuthError),

    #[display("{_0:#}")]
    Failed(#[error(not(source))] Error),
}

impl From<AuthError> for SetupError {
    fn from(error: AuthError) -> Self {
        if error.requires_reauth() { Self::Reauth(error) } else { Self::NotReady(error.into()) }
    }
}

impl From<RefreshError> for SetupError {
    fn from(error: RefreshError) -> Self {
        match error {
            RefreshError::Auth(error) => error.into(),
            RefreshError::Request(error) => Self::NotReady(error.into()),
            RefreshError::Join(error) => Self::Failed(error.into()),
        }
    }
}

#[derive(Builder)]
pub struct Setup {
    guardian: TokenGuardian,
    accounts_url: Url,
    nutsservices_url: Url,
    store: Arc<dyn StateStore>,

    #[builder(default)]
    retry: RetryPolicy,

    #[builder(default = DEFAULT_PERIOD)]
    refresh_period: Duration,
}

impl Setup {
    #[instrument(skip_all)]
    pub async fn setup(&self) -> Result<ConfigEntry, SetupError> {
        let access_token = self.guardian.check_and_refresh_token().await?;

        let user_info = {
            let api = budget_thuis::Api::new(self.accounts_url.clone(), &access_token, self.retry);
            task::spawn_blocking(move || api.get_user_info())
                .await
                .map_err(|error| SetupError::Failed(error.into()))?
                .map_err(|error| SetupError::NotReady(error.into()))?
        };
        if let Some(error) = user_info.error() {
            return Err(SetupError::NotReady(anyhow!("the provider reported an error: {error}")));
        }
        let unique_id = user_info.subject().unwrap_or(DEFAULT_UNIQUE_ID).to_string();
        info!(unique_id = %unique_id, email = user_info.email(), "logged in");

        let mut coordinator = Coordinator::builder()
            .token_source(self.guardian.clone())
            .connector(NutsservicesConnector {
                base_url: self.nutsservices_url.clone(),
                retry: self.retry,
            })
            .period(self.refresh_period)
            .build();
        coordinator.first_refresh().await?;

        let sensors = coordinator
            .status()
            .snapshot
            .iter()
            .cartesian_product(SensorKind::ALL)
            .map(|(entry, kind)| Sensor::new(&unique_id, &entry.contract, kind))
            .collect_vec();
        for sensor in &sensors {
            debug!(
                entity_id = %sensor.entity_id,
                unique_id = %sensor.unique_id,
                device.identifier = %sensor.device.identifier,
                device.name = %sensor.device.name,
                device.manufacturer = sensor.device.manufacturer,
                device.configuration_url = sensor.device.configuration_url,
                "sensor",
            );
        }
        info!(n_sensors = sensors.len(), "set up");

        let sensor_tasks = sensors
            .iter()
            .map(|sensor| {
                sensor::spawn(sensor.clone(), coordinator.subscribe(), self.store.clone(), Utc::now)
            })
            .collect();
        let coordinator_task = Task::spawn(coordinator.run());

        Ok(ConfigEntry { unique_id, sensors, sensor_tasks, coordinator_task })
    }
}

/// Loaded integration, its tasks run until it gets unloaded or dropped.
#[must_use]
pub struct ConfigEntry {
    pub unique_id: String,
    pub sensors: Vec<Sensor>,
    sensor_tasks: Vec<Task>,
    coordinator_task: Task,
}

impl ConfigEntry {
    #[instrument(skip_all, fields(unique_id = %self.unique_id))]
    pub fn unload(self) {
        let Self { sensors, sensor_tasks, coordinator_task, .. } = self;
        drop(coordinator_task);
        drop(sensor_tasks);
        info!(n_sensors = sensors.len(), "unloaded");
    }
}
