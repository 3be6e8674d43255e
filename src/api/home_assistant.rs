//! Home Assistant REST API, used to surface the sensors.

use reqwest::{
    Client,
    ClientBuilder,
    Url,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use serde::Serialize;
use serde_with::skip_serializing_none;

use crate::prelude::*;

pub struct Api {
    client: Client,
    base_url: Url,
}

impl Api {
    /// Base URL points to the API root, for example, `http://homeassistant.local:8123/api`.
    pub fn try_new(access_token: &str, base_url: Url) -> Result<Self> {
        let headers = HeaderMap::from_iter([(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&format!("Bearer {access_token}"))?,
        )]);
        let client = ClientBuilder::new().default_headers(headers).build()?;
        Ok(Self { client, base_url })
    }

    /// Create or update the entity state.
    #[instrument(skip_all, fields(entity_id = entity_id))]
    pub async fn set_state(&self, entity_id: &str, state: &SensorState<'_>) -> Result {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("invalid base URL"))?
            .pop_if_empty()
            .push("states")
            .push(entity_id);
        self.client
            .post(url)
            .json(state)
            .send()
            .await
            .with_context(|| format!("failed to set `{entity_id}` state"))?
            .error_for_status()?;
        debug!(state = %state.state, "updated");
        Ok(())
    }
}

#[must_use]
#[derive(Serialize)]
pub struct SensorState<'a> {
    /// Formatted value, or `unavailable`.
    pub state: String,

    pub attributes: SensorAttributes<'a>,
}

impl SensorState<'_> {
    pub const UNAVAILABLE: &'static str = "unavailable";
}

#[must_use]
#[skip_serializing_none]
#[derive(Serialize)]
pub struct SensorAttributes<'a> {
    pub net: Option<f64>,
    pub vat: Option<f64>,
    pub gross: Option<f64>,
    pub unit_of_measurement: &'a str,
    pub friendly_name: &'a str,
    pub icon: &'a str,
    pub attribution: &'a str,
    pub state_class: &'a str,
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;

    #[tokio::test]
    async fn test_set_state_ok() -> Result {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/states/sensor.budgetthuis_1_electricity_total")
            .match_header("authorization", "Bearer token")
            // language=JSON
            .match_body(Matcher::JsonString(
                r#"{
                    "state": "0.30",
                    "attributes": {
                        "net": 0.25,
                        "vat": 0.05,
                        "gross": 0.3,
                        "unit_of_measurement": "€/kWh",
                        "friendly_name": "Current electricity total price",
                        "icon": "mdi:currency-eur",
                        "attribution": "Data provided by Budget Thuis",
                        "state_class": "measurement"
                    }
                }"#
                .to_string(),
            ))
            .with_status(200)
            .create_async()
            .await;
        let api = Api::try_new("token", format!("{}/api/", server.url()).parse()?)?;
        api.set_state(
            "sensor.budgetthuis_1_electricity_total",
            &SensorState {
                state: "0.30".to_string(),
                attributes: SensorAttributes {
                    net: Some(0.25),
                    vat: Some(0.05),
                    gross: Some(0.3),
                    unit_of_measurement: "€/kWh",
                    friendly_name: "Current electricity total price",
                    icon: "mdi:currency-eur",
                    attribution: "Data provided by Budget Thuis",
                    state_class: "measurement",
                },
            },
        )
        .await?;
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_set_state_unauthorized() -> Result {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", Matcher::Any).with_status(401).create_async().await;
        let api = Api::try_new("token", format!("{}/api", server.url()).parse()?)?;
        let result = api
            .set_state(
                "sensor.budgetthuis_1_electricity_tax",
                &SensorState {
                    state: SensorState::UNAVAILABLE.to_string(),
                    attributes: SensorAttributes {
                        net: None,
                        vat: None,
                        gross: None,
                        unit_of_measurement: "€/kWh",
                        friendly_name: "Current electricity tax price",
                        icon: "mdi:currency-eur",
                        attribution: "Data provided by Budget Thuis",
                        state_class: "measurement",
                    },
                },
            )
            .await;
        assert!(result.is_err());
        Ok(())
    }
}
