use chrono::{DateTime, Utc};

use crate::core::{
    contract::Contract,
    tariff::{HourlyTariff, select_current},
};

/// Contract paired with its tariff at the refresh time.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub contract: Contract,

    /// Absent when no window contains the refresh instant, for example, when the provider has gaps.
    pub current_tariff: Option<HourlyTariff>,

    /// All the fetched tariffs, in the provider order.
    pub tariffs: Vec<HourlyTariff>,
}

impl Entry {
    pub fn new(contract: Contract, tariffs: Vec<HourlyTariff>, now: DateTime<Utc>) -> Self {
        let current_tariff = select_current(&tariffs, now).cloned();
        Self { contract, current_tariff, tariffs }
    }

    /// Tariff at the moment, which may be past the refresh when an hour has just started.
    #[must_use]
    pub fn tariff_at(&self, now: DateTime<Utc>) -> Option<&HourlyTariff> {
        select_current(&self.tariffs, now)
    }
}

/// Complete result of a single refresh cycle.
#[must_use]
#[derive(Clone, Debug, Default, PartialEq, derive_more::Deref, derive_more::IntoIterator)]
pub struct Snapshot(#[into_iterator(owned, ref)] pub Vec<Entry>);

impl Snapshot {
    #[must_use]
    pub fn get(&self, contract_id: u64) -> Option<&Entry> {
        self.0.iter().find(|entry| entry.contract.id == contract_id)
    }
}

impl FromIterator<Entry> for Snapshot {
    fn from_iter<T: IntoIterator<Item = Entry>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{contract::tests::contract, tariff::tests::tariff},
        prelude::*,
    };

    #[test]
    fn test_tariff_at_next_hour() -> Result {
        let entry = Entry::new(
            contract(1, "Dynamic"),
            vec![
                tariff("2024-01-01T10:00:00Z", "2024-01-01T10:59:59Z", 0.25),
                tariff("2024-01-01T11:00:00Z", "2024-01-01T11:59:59Z", 0.30),
            ],
            "2024-01-01T10:59:30Z".parse()?,
        );
        assert_eq!(entry.current_tariff.as_ref().context("no current tariff")?.total.gross, 0.25);
        let next = entry.tariff_at("2024-01-01T11:00:00Z".parse()?).context("no next tariff")?;
        assert_eq!(next.total.gross, 0.30);
        assert!(entry.tariff_at("2024-01-01T12:00:00Z".parse()?).is_none());
        Ok(())
    }
}
