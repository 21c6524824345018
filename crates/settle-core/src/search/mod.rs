//! Typed contract of a torrent daemon's search API
//!
//! The daemon owns the search engine and its job state machine; this module
//! only describes the calls a client makes and the records it gets back, so
//! callers can drive them through the condition checker and the retry
//! envelope. No transport is provided: implement [`SearchApi`] over whatever
//! client you use.
//!
//! Search endpoints exist from API version 2.1.1 onwards. Implementations
//! should answer older servers with [`ApiError::NotImplemented`], which
//! [`SearchEndpoint::check_supported`] produces.

mod error;
mod models;
mod version;
pub mod workflow;

pub use error::ApiError;
pub use models::{
    PluginSelection, SearchCategory, SearchJob, SearchJobState, SearchPlugin, SearchResult,
    SearchResults, SearchStatus,
};
pub use version::{ApiVersion, SearchEndpoint, CATEGORIES_MAX_API_VERSION, SEARCH_MIN_API_VERSION};

use async_trait::async_trait;

/// Result type for search API calls
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Search API of the remote daemon
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Version of the daemon's web API
    async fn api_version(&self) -> ApiResult<ApiVersion>;

    /// Installed search plugins
    async fn plugins(&self) -> ApiResult<Vec<SearchPlugin>>;

    /// Enable or disable the named plugins
    async fn enable_plugins(&self, names: &[String], enable: bool) -> ApiResult<()>;

    /// Install plugins from URLs or local paths
    async fn install_plugins(&self, sources: &[String]) -> ApiResult<()>;

    async fn uninstall_plugins(&self, names: &[String]) -> ApiResult<()>;

    /// Ask the daemon to update all plugins. Completion is only visible in its log.
    async fn update_plugins(&self) -> ApiResult<()>;

    /// Category names offered by one plugin, or by all of them
    async fn categories(&self, plugin: Option<&str>) -> ApiResult<Vec<String>>;

    /// Start a search job
    async fn start(
        &self,
        pattern: &str,
        plugins: &PluginSelection,
        category: &str,
    ) -> ApiResult<SearchJob>;

    /// Status of one job, or of every job when `id` is `None`
    async fn status(&self, id: Option<u64>) -> ApiResult<Vec<SearchStatus>>;

    /// A page of results. A negative `offset` counts from the end.
    async fn results(&self, id: u64, limit: Option<u64>, offset: Option<i64>)
        -> ApiResult<SearchResults>;

    async fn stop(&self, id: u64) -> ApiResult<()>;

    /// Delete a job; later calls for it fail with `NotFound`
    async fn delete(&self, id: u64) -> ApiResult<()>;
}
