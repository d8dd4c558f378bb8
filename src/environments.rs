//! Carrier environments (production vs. the UPS customer integration sandbox).
//!
//! Each preset maps a set of accepted names onto a [`CarrierEnvironment`]. Base URLs
//! live in the carrier config so they can be pointed elsewhere.

use crate::config::CarrierConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PRODUCTION_BASE_URL: &str = "https://onlinetools.ups.com";
pub const TEST_BASE_URL: &str = "https://wwwcie.ups.com";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarrierEnvironment {
    #[default]
    Production,
    Test,
}

#[derive(Debug, Clone)]
pub struct EnvironmentPreset {
    pub environment: CarrierEnvironment,
    pub names: &'static [&'static str],
}

const PRESETS: &[EnvironmentPreset] = &[
    EnvironmentPreset {
        environment: CarrierEnvironment::Production,
        names: &["production", "prod", "live"],
    },
    EnvironmentPreset {
        environment: CarrierEnvironment::Test,
        names: &["test", "sandbox", "cie"],
    },
];

impl CarrierEnvironment {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        PRESETS
            .iter()
            .find(|p| p.names.contains(&name.as_str()))
            .map(|p| p.environment)
    }

    /// Pick the environment for a single call.
    ///
    /// The sandbox wins if either the request asks for `"test"` or the process default is
    /// the sandbox; any other request value leaves the default in place.
    #[must_use]
    pub fn resolve(requested: Option<&str>, default: Self) -> Self {
        let requested_test = requested.is_some_and(|r| r == "test");
        if requested_test || default == Self::Test {
            Self::Test
        } else {
            Self::Production
        }
    }

    pub fn base_url<'a>(&self, carrier: &'a CarrierConfig) -> &'a str {
        match self {
            Self::Production => &carrier.production_url,
            Self::Test => &carrier.test_url,
        }
    }

    #[must_use]
    pub fn all() -> &'static [EnvironmentPreset] {
        PRESETS
    }
}

impl fmt::Display for CarrierEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => f.write_str("production"),
            Self::Test => f.write_str("test"),
        }
    }
}
