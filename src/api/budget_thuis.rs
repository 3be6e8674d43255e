//! [Budget Thuis](https://www.budgetthuis.nl) identity provider.

use reqwest::Url;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    api::{Error, RetryPolicy, Transport},
    prelude::*,
};

pub const BASE_URL: &str = "https://accounts.budgetthuis.nl";

pub struct Api(Transport);

impl Api {
    pub fn new(base_url: Url, access_token: &str, retry: RetryPolicy) -> Self {
        Self(Transport::new(base_url, retry).with_bearer_token(access_token))
    }

    #[instrument(skip_all)]
    pub fn get_user_info(&self) -> Result<UserInfo, Error> {
        debug!("fetching…");
        self.0.get("/connect/userinfo")
    }
}

/// `OpenID` Connect claims of the logged-in user.
#[must_use]
#[derive(Clone, Debug, Deserialize, derive_more::Deref)]
pub struct UserInfo(pub Map<String, Value>);

impl UserInfo {
    /// Provider-reported error, the provider sometimes responds 200 OK with one.
    #[must_use]
    pub fn error(&self) -> Option<&Value> {
        self.0.get("error")
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.0.get("sub").and_then(Value::as_str)
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }
}
