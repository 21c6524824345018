//! Records exchanged with the search API
//!
//! Field names follow the JSON the daemon emits (camelCase).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// An installed search plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPlugin {
    pub name: String,
    pub full_name: String,
    pub enabled: bool,
    pub version: String,
    pub url: String,
    #[serde(default)]
    pub supported_categories: Vec<SearchCategory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCategory {
    pub id: String,
    pub name: String,
}

/// Handle returned when a search starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchJob {
    pub id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchJobState {
    Running,
    Stopped,
}

impl fmt::Display for SearchJobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchJobState::Running => f.write_str("Running"),
            SearchJobState::Stopped => f.write_str("Stopped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStatus {
    pub id: u64,
    pub status: SearchJobState,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub file_name: String,
    pub file_url: String,
    /// Size in bytes; -1 when the engine does not know it
    pub file_size: i64,
    pub nb_seeders: i64,
    pub nb_leechers: i64,
    pub site_url: String,
    pub descr_link: String,
}

/// One page of results for a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<SearchResult>,
    pub status: SearchJobState,
    pub total: u64,
}

impl SearchStatus {
    /// Parse the status list returned by `search/status`
    pub fn list_from_json(body: &str) -> Result<Vec<SearchStatus>> {
        Ok(serde_json::from_str(body)?)
    }
}

impl SearchResults {
    pub fn from_json(body: &str) -> Result<SearchResults> {
        Ok(serde_json::from_str(body)?)
    }
}

/// Which plugins a search runs against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSelection {
    All,
    Enabled,
    Named(Vec<String>),
}

impl PluginSelection {
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PluginSelection::Named(names.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for PluginSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginSelection::All => f.write_str("all"),
            PluginSelection::Enabled => f.write_str("enabled"),
            PluginSelection::Named(names) => f.write_str(&names.join("|")),
        }
    }
}

impl FromStr for PluginSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "all" => Ok(PluginSelection::All),
            "enabled" => Ok(PluginSelection::Enabled),
            "" => Err(Error::invalid_config("plugin selection must not be empty")),
            names => Ok(PluginSelection::named(
                names.split('|').map(str::trim).filter(|n| !n.is_empty()),
            )),
        }
    }
}

impl Serialize for PluginSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PluginSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
