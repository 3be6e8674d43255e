use crate::core::{AmountDetails, HourlyTariff};

/// Price component exposed as a sensor.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, derive_more::Display)]
pub enum SensorKind {
    #[display("electricity_total")]
    ElectricityTotal,

    #[display("electricity_tax")]
    ElectricityTax,

    #[display("electricity_surcharge")]
    ElectricitySurcharge,

    #[display("electricity_commodity")]
    ElectricityCommodity,
}

impl SensorKind {
    pub const ALL: [Self; 4] = [
        Self::ElectricityTotal,
        Self::ElectricityTax,
        Self::ElectricitySurcharge,
        Self::ElectricityCommodity,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ElectricityTotal => "Current electricity total price",
            Self::ElectricityTax => "Current electricity tax price",
            Self::ElectricitySurcharge => "Current electricity surcharge price",
            Self::ElectricityCommodity => "Current electricity commodity price",
        }
    }

    /// Pick the sensor's component from the tariff.
    pub const fn amount(self, tariff: &HourlyTariff) -> &AmountDetails {
        match self {
            Self::ElectricityTotal => &tariff.total,
            Self::ElectricityTax => &tariff.tax,
            Self::ElectricitySurcharge => &tariff.surcharge,
            Self::ElectricityCommodity => &tariff.commodity,
        }
    }
}
