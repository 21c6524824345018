//! In-memory search daemon
//!
//! Mutations are acknowledged immediately but only become visible after a
//! configurable number of reads, like a daemon that applies requests in the
//! background.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use settle_core::search::{
    ApiError, ApiResult, ApiVersion, PluginSelection, SearchApi, SearchEndpoint, SearchJob,
    SearchJobState, SearchPlugin, SearchResults, SearchStatus,
};

use super::fixtures::{plugin, result};

#[derive(Debug, Clone)]
enum Change {
    Install(SearchPlugin),
    Uninstall(String),
    Enable { names: Vec<String>, enable: bool },
    Stop(u64),
}

#[derive(Debug)]
struct PendingChange {
    reads_left: u32,
    change: Change,
}

#[derive(Debug)]
struct FakeJob {
    status: SearchJobState,
    /// Status reads answered with NotFound before the job shows up
    hidden_reads: u32,
    pattern: String,
}

#[derive(Debug, Default)]
struct DaemonState {
    plugins: Vec<SearchPlugin>,
    pending: Vec<PendingChange>,
    jobs: BTreeMap<u64, FakeJob>,
    next_job_id: u64,
    calls: HashMap<SearchEndpoint, u32>,
    failures: HashMap<SearchEndpoint, VecDeque<ApiError>>,
}

impl DaemonState {
    /// Count down pending changes and apply the ones that are due
    fn tick(&mut self) {
        let mut due = Vec::new();
        self.pending.retain_mut(|pending| {
            if pending.reads_left == 0 {
                due.push(pending.change.clone());
                false
            } else {
                pending.reads_left -= 1;
                true
            }
        });

        for change in due {
            match change {
                Change::Install(plugin) => {
                    self.plugins.retain(|p| p.name != plugin.name);
                    self.plugins.push(plugin);
                }
                Change::Uninstall(name) => self.plugins.retain(|p| p.name != name),
                Change::Enable { names, enable } => {
                    for plugin in self.plugins.iter_mut().filter(|p| names.contains(&p.name)) {
                        plugin.enabled = enable;
                    }
                }
                Change::Stop(id) => {
                    if let Some(job) = self.jobs.get_mut(&id) {
                        job.status = SearchJobState::Stopped;
                    }
                }
            }
        }
    }
}

pub struct FakeSearchDaemon {
    version: ApiVersion,
    /// Reads before a mutation becomes visible
    lag: u32,
    /// Status reads before a new job becomes visible
    job_visibility_lag: u32,
    state: Mutex<DaemonState>,
}

impl FakeSearchDaemon {
    pub fn new(version: ApiVersion) -> Self {
        Self {
            version,
            lag: 0,
            job_visibility_lag: 0,
            state: Mutex::new(DaemonState {
                next_job_id: 1,
                ..Default::default()
            }),
        }
    }

    pub fn with_lag(mut self, lag: u32) -> Self {
        self.lag = lag;
        self
    }

    pub fn with_job_visibility_lag(mut self, reads: u32) -> Self {
        self.job_visibility_lag = reads;
        self
    }

    pub fn with_plugins(self, plugins: Vec<SearchPlugin>) -> Self {
        self.state.lock().unwrap().plugins = plugins;
        self
    }

    /// Answer the next call to `endpoint` with `error`
    pub fn fail_next(&self, endpoint: SearchEndpoint, error: ApiError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(endpoint)
            .or_default()
            .push_back(error);
    }

    pub fn calls(&self, endpoint: SearchEndpoint) -> u32 {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(&endpoint)
            .copied()
            .unwrap_or(0)
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .plugins
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }

    /// Record the call, enforce the version and pop an injected failure
    fn enter(&self, endpoint: SearchEndpoint) -> ApiResult<std::sync::MutexGuard<'_, DaemonState>> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(endpoint).or_default() += 1;

        endpoint.check_supported(&self.version)?;

        if let Some(error) = state
            .failures
            .get_mut(&endpoint)
            .and_then(|queue| queue.pop_front())
        {
            return Err(error);
        }
        Ok(state)
    }

    fn queue(&self, state: &mut DaemonState, change: Change) {
        state.pending.push(PendingChange {
            reads_left: self.lag,
            change,
        });
    }
}

fn job_status(id: u64, job: &FakeJob) -> SearchStatus {
    SearchStatus {
        id,
        status: job.status,
        total: 1,
    }
}

fn name_from_source(source: &str) -> String {
    let file = source.rsplit('/').next().unwrap_or(source);
    file.trim_end_matches(".py").to_string()
}

#[async_trait]
impl SearchApi for FakeSearchDaemon {
    async fn api_version(&self) -> ApiResult<ApiVersion> {
        Ok(self.version.clone())
    }

    async fn plugins(&self) -> ApiResult<Vec<SearchPlugin>> {
        let mut state = self.enter(SearchEndpoint::Plugins)?;
        state.tick();
        Ok(state.plugins.clone())
    }

    async fn enable_plugins(&self, names: &[String], enable: bool) -> ApiResult<()> {
        let mut state = self.enter(SearchEndpoint::EnablePlugin)?;
        let change = Change::Enable {
            names: names.to_vec(),
            enable,
        };
        self.queue(&mut state, change);
        Ok(())
    }

    async fn install_plugins(&self, sources: &[String]) -> ApiResult<()> {
        let mut state = self.enter(SearchEndpoint::InstallPlugin)?;
        for source in sources {
            let installed = plugin(&name_from_source(source), true);
            self.queue(&mut state, Change::Install(installed));
        }
        Ok(())
    }

    async fn uninstall_plugins(&self, names: &[String]) -> ApiResult<()> {
        let mut state = self.enter(SearchEndpoint::UninstallPlugin)?;
        for name in names {
            self.queue(&mut state, Change::Uninstall(name.clone()));
        }
        Ok(())
    }

    async fn update_plugins(&self) -> ApiResult<()> {
        self.enter(SearchEndpoint::UpdatePlugins)?;
        Ok(())
    }

    async fn categories(&self, plugin_name: Option<&str>) -> ApiResult<Vec<String>> {
        let state = self.enter(SearchEndpoint::Categories)?;
        let mut names: Vec<String> = state
            .plugins
            .iter()
            .filter(|p| plugin_name.is_none_or(|name| p.name == name))
            .flat_map(|p| p.supported_categories.iter().map(|c| c.name.clone()))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn start(
        &self,
        pattern: &str,
        plugins: &PluginSelection,
        _category: &str,
    ) -> ApiResult<SearchJob> {
        let mut state = self.enter(SearchEndpoint::Start)?;
        if let PluginSelection::Named(names) = plugins {
            if let Some(missing) = names.iter().find(|n| !state.plugins.iter().any(|p| &p.name == *n)) {
                return Err(ApiError::remote(400, format!("unknown plugin '{}'", missing)));
            }
        }

        let id = state.next_job_id;
        state.next_job_id += 1;
        state.jobs.insert(
            id,
            FakeJob {
                status: SearchJobState::Running,
                hidden_reads: self.job_visibility_lag,
                pattern: pattern.to_string(),
            },
        );
        Ok(SearchJob { id })
    }

    async fn status(&self, id: Option<u64>) -> ApiResult<Vec<SearchStatus>> {
        let mut state = self.enter(SearchEndpoint::Status)?;
        state.tick();

        match id {
            None => Ok(state
                .jobs
                .iter()
                .filter(|(_, job)| job.hidden_reads == 0)
                .map(|(id, job)| job_status(*id, job))
                .collect()),
            Some(id) => {
                let job = state
                    .jobs
                    .get_mut(&id)
                    .ok_or_else(|| ApiError::not_found(format!("search job {}", id)))?;
                if job.hidden_reads > 0 {
                    job.hidden_reads -= 1;
                    return Err(ApiError::not_found(format!("search job {}", id)));
                }
                Ok(vec![job_status(id, job)])
            }
        }
    }

    async fn results(
        &self,
        id: u64,
        limit: Option<u64>,
        _offset: Option<i64>,
    ) -> ApiResult<SearchResults> {
        let state = self.enter(SearchEndpoint::Results)?;
        let job = state
            .jobs
            .get(&id)
            .ok_or_else(|| ApiError::not_found(format!("search job {}", id)))?;

        let all = vec![
            result(&format!("{}-desktop-amd64.iso", job.pattern.to_lowercase())),
            result(&format!("{}-server-amd64.iso", job.pattern.to_lowercase())),
        ];
        let total = all.len() as u64;
        let results = match limit {
            Some(limit) => all.into_iter().take(limit as usize).collect(),
            None => all,
        };

        Ok(SearchResults {
            results,
            status: job.status,
            total,
        })
    }

    async fn stop(&self, id: u64) -> ApiResult<()> {
        let mut state = self.enter(SearchEndpoint::Stop)?;
        if !state.jobs.contains_key(&id) {
            return Err(ApiError::not_found(format!("search job {}", id)));
        }
        self.queue(&mut state, Change::Stop(id));
        Ok(())
    }

    async fn delete(&self, id: u64) -> ApiResult<()> {
        let mut state = self.enter(SearchEndpoint::Delete)?;
        state
            .jobs
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found(format!("search job {}", id)))
    }
}
