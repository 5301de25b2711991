//! Family configuration documents.
//!
//! A family document fixes everything about a parameter family except its
//! defaults: the model horizon, the rate series, wage-indexed routing, and
//! the removed/redefined registries.
//!
//! ```json
//! {
//!     "name": "policy",
//!     "start_year": 2013,
//!     "num_years": 15,
//!     "last_known_year": 2019,
//!     "wage_indexed": ["SS_Earnings_c"],
//!     "removed": {"old_credit": "was repealed in 2018"},
//!     "redefined": {},
//!     "inflation_rates": [0.0148, 0.0159, ...],
//!     "wage_growth_rates": [0.0276, 0.0419, ...]
//! }
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::indexing::RateSeries;

fn default_name() -> String {
    "policy".to_string()
}

/// Horizon, rates and registries of one parameter family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyConfig {
    /// Family name; also the top-level key selected from compound revision
    /// documents.
    #[serde(default = "default_name")]
    pub name: String,
    pub start_year: i32,
    pub num_years: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_known_year: Option<i32>,
    #[serde(default)]
    pub wage_indexed: Vec<String>,
    #[serde(default)]
    pub removed: IndexMap<String, String>,
    #[serde(default)]
    pub redefined: IndexMap<String, String>,
    #[serde(flatten)]
    pub rates: RateSeries,
}

impl FamilyConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: FamilyConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check that the horizon is usable and that a name is not both removed
    /// and redefined.
    pub fn validate(&self) -> Result<()> {
        if self.num_years == 0 {
            return Err(Error::InvalidConfig("num_years must be at least 1".into()));
        }
        if let Some(name) = self.removed.keys().find(|name| self.redefined.contains_key(*name)) {
            return Err(Error::InvalidConfig(format!(
                "{name} is listed as both removed and redefined"
            )));
        }
        Ok(())
    }
}
