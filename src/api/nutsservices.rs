//! Nutsservices energy API, serving the Budget Thuis contracts and tariffs.

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Deserializer, Serialize, de::IgnoredAny};
use serde_with::serde_as;

use crate::{
    api::{Error, RetryPolicy, Transport},
    core::{Address, AmountDetails, Contract, HourlyTariff, Period},
    prelude::*,
};

pub const BASE_URL: &str = "https://app.api.nutsservices.nl";

pub struct Api(Transport);

impl Api {
    pub fn new(base_url: Url, access_token: &str, retry: RetryPolicy) -> Self {
        Self(Transport::new(base_url, retry).with_bearer_token(access_token))
    }

    /// Get all the customer's contracts, regardless of their type.
    #[instrument(skip_all)]
    pub fn all_contracts(&self) -> Result<Vec<Contract>, Error> {
        #[derive(Serialize)]
        struct ProductPickerRequest {
            #[serde(rename = "relationIds")]
            relation_ids: [u64; 0],
        }

        debug!("fetching…");
        let contracts = self
            .0
            .post::<_, ProductPickerResponse>(
                "/energy/v1/customer/productPicker",
                &ProductPickerRequest { relation_ids: [] },
            )?
            .contracts
            .into_iter()
            .map(Contract::from)
            .collect::<Vec<_>>();
        debug!(n_contracts = contracts.len(), "fetched");
        Ok(contracts)
    }

    /// Get the hourly tariffs of the dynamic contract.
    #[instrument(skip_all, fields(contract_id = contract_id))]
    pub fn hourly_tariff(&self, contract_id: u64) -> Result<Vec<HourlyTariff>, Error> {
        debug!("fetching…");
        let tariffs = self
            .0
            .get::<HourlyTariffResponse>(&format!(
                "/energy/v1/contract/{contract_id}/dashboard/hourlytariff"
            ))?
            .tariffs
            .into_iter()
            .filter_map(|tariff| {
                HourlyTariff::try_from(tariff)
                    .inspect_err(|error| warn!("skipping the tariff: {error:#}"))
                    .ok()
            })
            .collect::<Vec<_>>();
        debug!(n_tariffs = tariffs.len(), "fetched");
        Ok(tariffs)
    }
}

#[derive(Deserialize)]
struct ProductPickerResponse {
    #[serde(rename = "contractsInfo")]
    contracts: Vec<ContractInfo>,
}

#[derive(Deserialize)]
struct ContractInfo {
    #[serde(rename = "contractId")]
    id: u64,

    #[serde(rename = "relationId")]
    relation_id: u64,

    #[serde(rename = "propositionType")]
    proposition_type: String,

    #[serde(rename = "contractStatus")]
    contract_status: String,

    #[serde(rename = "contractType")]
    contract_type: String,

    #[serde(rename = "supplyAddress", default, deserialize_with = "SupplyAddress::deserialize_lenient")]
    supply_address: SupplyAddress,
}

impl From<ContractInfo> for Contract {
    fn from(info: ContractInfo) -> Self {
        Self {
            id: info.id,
            relation_id: info.relation_id,
            proposition_type: info.proposition_type,
            contract_status: info.contract_status,
            contract_type: info.contract_type,
            supply_address: info.supply_address.into(),
        }
    }
}

#[serde_as]
#[derive(Default, Deserialize)]
#[serde(default)]
struct SupplyAddress {
    #[serde(rename = "zipCode")]
    zip_code: String,

    #[serde(rename = "houseNumber")]
    house_number: u32,

    #[serde_as(as = "serde_with::NoneAsEmptyString")]
    #[serde(rename = "houseNumberExtension")]
    house_number_extension: Option<String>,

    city: String,

    street: String,
}

impl SupplyAddress {
    /// The API sends an empty string instead of an object when the address is unknown.
    fn deserialize_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Lenient {
            Object(SupplyAddress),
            Empty(IgnoredAny),
        }

        Ok(match Option::<Lenient>::deserialize(deserializer)? {
            Some(Lenient::Object(address)) => address,
            Some(Lenient::Empty(_)) | None => Self::default(),
        })
    }
}

impl From<SupplyAddress> for Address {
    fn from(address: SupplyAddress) -> Self {
        Self {
            zip_code: address.zip_code,
            house_number: address.house_number,
            house_number_extension: address.house_number_extension,
            city: address.city,
            street: address.street,
        }
    }
}

#[serde_as]
#[derive(Deserialize)]
struct HourlyTariffResponse {
    #[serde_as(as = "serde_with::VecSkipError<_>")]
    #[serde(rename = "electricityTariffs")]
    tariffs: Vec<ElectricityTariff>,
}

#[derive(Deserialize)]
struct ElectricityTariff {
    #[serde(rename = "totalTariff")]
    total: Amount,

    #[serde(rename = "energyTax")]
    tax: Amount,

    surcharge: Amount,

    commodity: Amount,

    #[serde(rename = "periodFrom")]
    period_from: DateTime<Utc>,

    #[serde(rename = "periodTo")]
    period_to: DateTime<Utc>,
}

impl TryFrom<ElectricityTariff> for HourlyTariff {
    type Error = crate::prelude::Error;

    fn try_from(tariff: ElectricityTariff) -> Result<Self> {
        Ok(Self {
            total: tariff.total.into(),
            tax: tariff.tax.into(),
            surcharge: tariff.surcharge.into(),
            commodity: tariff.commodity.into(),
            period: Period::try_new(tariff.period_from, tariff.period_to)?,
        })
    }
}

#[derive(Deserialize)]
struct Amount {
    #[serde(rename = "amountNet")]
    net: f64,

    #[serde(rename = "amountVat")]
    vat: f64,

    #[serde(rename = "amountGross")]
    gross: f64,
}

impl From<Amount> for AmountDetails {
    fn from(amount: Amount) -> Self {
        Self { net: amount.net, vat: amount.vat, gross: amount.gross }
    }
}
