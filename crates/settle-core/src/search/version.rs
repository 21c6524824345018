//! Web API versions and endpoint availability

use std::fmt;
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::ApiError;
use crate::error::Error;

/// Version reported by the daemon's web API
///
/// The daemon reports two or three components ("2.6", "2.1.1"); a missing
/// patch component is treated as 0.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion(Version);

/// First API version with search endpoints
pub const SEARCH_MIN_API_VERSION: ApiVersion = ApiVersion::new(2, 1, 1);

/// Last API version that still serves the categories endpoint
pub const CATEGORIES_MAX_API_VERSION: ApiVersion = ApiVersion::new(2, 6, 0);

impl ApiVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(Version::new(major, minor, patch))
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }

    /// Fail with `NotImplemented` unless this version is at least `min`
    pub fn require(&self, min: &ApiVersion, endpoint: &str) -> Result<(), ApiError> {
        if self < min {
            return Err(ApiError::not_implemented(endpoint, min, self));
        }
        Ok(())
    }
}

impl FromStr for ApiVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('v');
        let parts: Vec<&str> = trimmed.split('.').collect();

        let normalized = match parts.len() {
            2 => format!("{}.0", trimmed),
            3 => trimmed.to_string(),
            _ => return Err(Error::invalid_version(s)),
        };

        Version::parse(&normalized)
            .map(ApiVersion)
            .map_err(|_| Error::invalid_version(s))
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0.major, self.0.minor, self.0.patch)
    }
}

impl Serialize for ApiVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ApiVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Search endpoints and the API versions that serve them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchEndpoint {
    Plugins,
    EnablePlugin,
    InstallPlugin,
    UninstallPlugin,
    UpdatePlugins,
    Categories,
    Start,
    Status,
    Results,
    Stop,
    Delete,
}

impl SearchEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            SearchEndpoint::Plugins => "search/plugins",
            SearchEndpoint::EnablePlugin => "search/enablePlugin",
            SearchEndpoint::InstallPlugin => "search/installPlugin",
            SearchEndpoint::UninstallPlugin => "search/uninstallPlugin",
            SearchEndpoint::UpdatePlugins => "search/updatePlugins",
            SearchEndpoint::Categories => "search/categories",
            SearchEndpoint::Start => "search/start",
            SearchEndpoint::Status => "search/status",
            SearchEndpoint::Results => "search/results",
            SearchEndpoint::Stop => "search/stop",
            SearchEndpoint::Delete => "search/delete",
        }
    }

    /// Fail with `NotImplemented` when `version` does not serve this endpoint
    pub fn check_supported(&self, version: &ApiVersion) -> Result<(), ApiError> {
        version.require(&SEARCH_MIN_API_VERSION, self.path())?;

        if *self == SearchEndpoint::Categories && *version > CATEGORIES_MAX_API_VERSION {
            return Err(ApiError::removed(self.path(), &CATEGORIES_MAX_API_VERSION, version));
        }
        Ok(())
    }
}

impl fmt::Display for SearchEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
