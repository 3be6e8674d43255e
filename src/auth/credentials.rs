use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::prelude::*;

#[must_use]
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    pub expires_at: DateTime<Utc>,
}

impl Token {
    /// Tolerated clock difference with the provider.
    pub const CLOCK_SKEW: TimeDelta = TimeDelta::seconds(20);

    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now + Self::CLOCK_SKEW
    }
}

/// Token storage in a TOML file.
#[must_use]
#[derive(Clone, Debug)]
pub struct Credentials {
    path: PathBuf,
}

impl Credentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Token> {
        let contents = fs::read_to_string(&self.path).with_context(|| {
            format!("failed to read `{}`, log in first", self.path.display())
        })?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse `{}`", self.path.display()))
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn save(&self, token: &Token) -> Result {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create `{}`", parent.display()))?;
        }
        fs::write(&self.path, toml::to_string(token)?)
            .with_context(|| format!("failed to write `{}`", self.path.display()))?;
        debug!(expires_at = %token.expires_at, "saved");
        Ok(())
    }
}
