pub mod contract;
pub mod period;
pub mod snapshot;
pub mod tariff;

pub use self::{
    contract::{Address, Contract},
    period::Period,
    snapshot::{Entry, Snapshot},
    tariff::{AmountDetails, HourlyTariff, select_current},
};
