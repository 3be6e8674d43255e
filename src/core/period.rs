use std::fmt::{Debug, Formatter};

use chrono::{DateTime, Utc};

use crate::prelude::*;

/// Tariff validity window, both ends inclusive.
#[must_use]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Period {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl Debug for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}..={:?}", self.from, self.to)
    }
}

impl Period {
    pub fn try_new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        ensure!(from <= to, "the period starts at {from} after it ends at {to}");
        Ok(Self { from, to })
    }

    #[must_use]
    pub fn contains(self, instant: DateTime<Utc>) -> bool {
        (self.from <= instant) && (instant <= self.to)
    }
}
