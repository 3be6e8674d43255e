use async_trait::async_trait;

use crate::{
    api::home_assistant::{self, SensorAttributes, SensorState},
    prelude::*,
    sensor::{Reading, Sensor},
};

/// Host state machine receiving the sensor readings.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn publish(&self, sensor: &Sensor, reading: &Reading) -> Result;
}

/// Store that only logs the readings.
pub struct LogStore;

#[async_trait]
impl StateStore for LogStore {
    async fn publish(&self, sensor: &Sensor, reading: &Reading) -> Result {
        match reading.value {
            Some(value) => info!(
                entity_id = sensor.entity_id.as_str(),
                "{}: {value:.precision$} {}",
                sensor.friendly_name(),
                Sensor::UNIT,
                precision = Sensor::PRECISION,
            ),
            None => info!(
                entity_id = sensor.entity_id.as_str(),
                "{}: unavailable",
                sensor.friendly_name(),
            ),
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for home_assistant::Api {
    async fn publish(&self, sensor: &Sensor, reading: &Reading) -> Result {
        let friendly_name = sensor.friendly_name();
        let state = SensorState {
            state: reading.value.map_or_else(
                || SensorState::UNAVAILABLE.to_string(),
                |value| format!("{value:.precision$}", precision = Sensor::PRECISION),
            ),
            attributes: SensorAttributes {
                net: reading.attributes.map(|amount| amount.net),
                vat: reading.attributes.map(|amount| amount.vat),
                gross: reading.attributes.map(|amount| amount.gross),
                unit_of_measurement: Sensor::UNIT,
                friendly_name: &friendly_name,
                icon: Sensor::ICON,
                attribution: Sensor::ATTRIBUTION,
                state_class: Sensor::STATE_CLASS,
            },
        };
        self.set_state(&sensor.entity_id, &state).await
    }
}
