//! Test fixtures

use std::time::Duration;

use settle_core::search::{SearchCategory, SearchPlugin, SearchResult};
use settle_core::types::{CheckPolicy, RetryPolicy};

pub const PLUGIN_NAME: &str = "legittorrents";
pub const LEGIT_TORRENTS_URL: &str =
    "https://raw.githubusercontent.com/qbittorrent/search-plugins/master/nova3/engines/legittorrents.py";

pub fn plugin(name: &str, enabled: bool) -> SearchPlugin {
    SearchPlugin {
        name: name.to_string(),
        full_name: format!("{} search engine", name),
        enabled,
        version: "1.0".to_string(),
        url: format!("https://{}.example.org", name),
        supported_categories: vec![SearchCategory {
            id: "all".to_string(),
            name: "All categories".to_string(),
        }],
    }
}

pub fn result(file_name: &str) -> SearchResult {
    SearchResult {
        file_name: file_name.to_string(),
        file_url: format!("https://example.org/download/{}", file_name),
        file_size: 4_700_000_000,
        nb_seeders: 120,
        nb_leechers: 4,
        site_url: "https://example.org".to_string(),
        descr_link: format!("https://example.org/torrent/{}", file_name),
    }
}

/// Check budget large enough for any lag the fake daemon is configured with
pub fn check_policy() -> CheckPolicy {
    CheckPolicy::new(10, Duration::from_millis(100))
}

pub fn retry_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::fixed(max_attempts, Duration::from_millis(50))
}
