//! Energy resources and their analysis API path names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Energy resource a run is scored for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    #[serde(rename = "Solar PV", alias = "solar")]
    Solar,
    #[serde(rename = "Wind", alias = "wind")]
    Wind,
    #[serde(rename = "Off-Shore Wind", alias = "offshore")]
    OffshoreWind,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Solar, Resource::Wind, Resource::OffshoreWind];

    /// Path segment used by the remote analysis endpoint.
    pub fn api_name(&self) -> &'static str {
        match self {
            Resource::Solar => "solar",
            Resource::Wind => "wind",
            Resource::OffshoreWind => "offshore",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Resource::Solar => "Solar PV",
            Resource::Wind => "Wind",
            Resource::OffshoreWind => "Off-Shore Wind",
        }
    }

    pub fn is_offshore(&self) -> bool {
        matches!(self, Resource::OffshoreWind)
    }

    /// True if `name` refers to this resource by label or API name.
    pub fn matches(&self, name: &str) -> bool {
        let name = name.trim();
        name.eq_ignore_ascii_case(self.api_name()) || name.eq_ignore_ascii_case(self.label())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.matches(s))
            .ok_or_else(|| format!("Unknown resource '{}'", s))
    }
}
