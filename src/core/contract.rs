use std::fmt::{Display, Formatter};

/// Supply address of a contract.
#[must_use]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Address {
    pub zip_code: String,
    pub house_number: u32,
    pub house_number_extension: Option<String>,
    pub city: String,
    pub street: String,
}

impl Display for Address {
    /// Street line, for example `Hoofdstraat 12 A`.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.street, self.house_number)?;
        if let Some(extension) = &self.house_number_extension {
            write!(f, " {extension}")?;
        }
        Ok(())
    }
}

#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contract {
    pub id: u64,
    pub relation_id: u64,
    pub proposition_type: String,
    pub contract_status: String,
    pub contract_type: String,
    pub supply_address: Address,
}

impl Contract {
    pub const DYNAMIC: &str = "Dynamic";

    /// Only dynamic contracts have hourly tariffs.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.contract_type == Self::DYNAMIC
    }
}
