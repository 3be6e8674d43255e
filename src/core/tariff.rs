use chrono::{DateTime, Utc};

use crate::core::period::Period;

/// Net, VAT, and gross decomposition of a price component, in euro per kilowatt-hour.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AmountDetails {
    pub net: f64,
    pub vat: f64,
    pub gross: f64,
}

/// Hourly price quote of a dynamic contract.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HourlyTariff {
    pub total: AmountDetails,
    pub tax: AmountDetails,
    pub surcharge: AmountDetails,
    pub commodity: AmountDetails,
    pub period: Period,
}

impl HourlyTariff {
    #[must_use]
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.period.contains(now)
    }
}

/// Select the first tariff whose window contains `now`.
///
/// The windows are expected to be disjoint. Should they overlap, the provider's order wins.
pub fn select_current<'a>(
    tariffs: impl IntoIterator<Item = &'a HourlyTariff>,
    now: DateTime<Utc>,
) -> Option<&'a HourlyTariff> {
    tariffs.into_iter().find(|tariff| tariff.is_current(now))
}
