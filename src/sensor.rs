//! Tariff components as read-only sensors.

mod kind;
mod schedule;
mod store;

pub use self::{
    kind::SensorKind,
    schedule::spawn,
    store::{LogStore, StateStore},
};
use chrono::{DateTime, Utc};

use crate::{
    coordinator::Status,
    core::{AmountDetails, Contract},
};

/// Device grouping the sensors of a single contract.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Contract ID.
    pub identifier: String,

    pub name: String,

    pub manufacturer: &'static str,
    pub configuration_url: &'static str,
}

impl DeviceInfo {
    pub const MANUFACTURER: &str = "Budget Thuis";
    pub const CONFIGURATION_URL: &str = "https://www.budgetthuis.nl";
}

#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sensor {
    pub kind: SensorKind,
    pub contract_id: u64,
    pub unique_id: String,
    pub entity_id: String,
    pub device: DeviceInfo,
}

impl Sensor {
    pub const UNIT: &str = "€/kWh";
    pub const ICON: &str = "mdi:currency-eur";
    pub const ATTRIBUTION: &str = "Data provided by Budget Thuis";
    pub const STATE_CLASS: &str = "measurement";
    pub const PRECISION: usize = 2;

    pub fn new(entry_unique_id: &str, contract: &Contract, kind: SensorKind) -> Self {
        Self {
            kind,
            contract_id: contract.id,
            unique_id: format!("{entry_unique_id}.{}.{kind}", contract.id),
            entity_id: format!("sensor.budgetthuis_{}_{kind}", contract.id),
            device: DeviceInfo {
                identifier: contract.id.to_string(),
                name: format!("{} - {}", contract.id, contract.supply_address),
                manufacturer: DeviceInfo::MANUFACTURER,
                configuration_url: DeviceInfo::CONFIGURATION_URL,
            },
        }
    }

    #[must_use]
    pub fn friendly_name(&self) -> String {
        format!("{} {}", self.device.name, self.kind.name())
    }

    /// Reading at the moment, unavailable whenever the published status cannot back it.
    ///
    /// The tariff gets selected anew, so that the reading switches as soon as the hour starts.
    pub fn read(&self, status: &Status, now: DateTime<Utc>) -> Reading {
        if !status.last_update_success {
            return Reading::UNAVAILABLE;
        }
        status
            .snapshot
            .get(self.contract_id)
            .and_then(|entry| entry.tariff_at(now))
            .map(|tariff| *self.kind.amount(tariff))
            .filter(|amount| amount.gross.is_finite())
            .map_or(Reading::UNAVAILABLE, |amount| Reading {
                value: Some(amount.gross),
                attributes: Some(amount),
            })
    }
}

#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Reading {
    /// Gross amount.
    pub value: Option<f64>,

    pub attributes: Option<AmountDetails>,
}

impl Reading {
    pub const UNAVAILABLE: Self = Self { value: None, attributes: None };
}
