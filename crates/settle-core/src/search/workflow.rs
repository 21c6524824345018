//! Waiting on search API state changes
//!
//! Every mutating search call returns before the daemon has applied it.
//! These helpers pair a call with a check on the state it should lead to,
//! and wrap the pair in the retry envelope where the daemon is known to
//! drop requests.

use crate::check::{CheckError, CheckOutcome, Checker};
use crate::retry::{RetryError, RetryExecutorBuilder, TracingObserver, TransientOnly};
use crate::types::{CheckPolicy, RetryPolicy};

use super::{ApiError, ApiVersion, PluginSelection, SearchApi, SearchEndpoint, SearchJob, SearchJobState};

/// Error of a wait step: the getter failed, or the state never settled
pub type WaitError<T> = CheckError<T, ApiError>;

/// Fail with `NotImplemented` if the daemon does not serve `endpoint`
pub async fn ensure_supported<A>(api: &A, endpoint: SearchEndpoint) -> Result<ApiVersion, ApiError>
where
    A: SearchApi + ?Sized,
{
    let version = api.api_version().await?;
    endpoint.check_supported(&version)?;
    Ok(version)
}

/// Wait until the job reports `state`
pub async fn wait_for_job_state<A>(
    api: &A,
    job: SearchJob,
    state: SearchJobState,
    policy: CheckPolicy,
) -> Result<CheckOutcome<SearchJobState>, WaitError<SearchJobState>>
where
    A: SearchApi + ?Sized,
{
    Checker::new(state)
        .policy(policy)
        .label(format!("search-job-{}", job.id))
        .try_run_async(move || async move {
            let statuses = api.status(Some(job.id)).await?;
            Ok::<_, ApiError>(statuses.into_iter().map(|s| s.status).collect::<Vec<_>>())
        })
        .await
}

/// Wait until a plugin named `name` is installed, or gone when `present` is false
pub async fn wait_for_plugin<A>(
    api: &A,
    name: &str,
    present: bool,
    policy: CheckPolicy,
) -> Result<CheckOutcome<String>, WaitError<String>>
where
    A: SearchApi + ?Sized,
{
    Checker::new(name.to_string())
        .reverse(true)
        .negate(!present)
        .policy(policy)
        .label("search-plugin")
        .try_run_async(move || async move {
            let plugins = api.plugins().await?;
            Ok::<_, ApiError>(plugins.into_iter().map(|p| p.name).collect::<Vec<_>>())
        })
        .await
}

/// Wait until every installed plugin has the given enabled flag
pub async fn wait_for_plugins_enabled<A>(
    api: &A,
    enabled: bool,
    policy: CheckPolicy,
) -> Result<CheckOutcome<bool>, WaitError<bool>>
where
    A: SearchApi + ?Sized,
{
    // No plugin may still carry the opposite flag
    Checker::new(!enabled)
        .reverse(true)
        .negate(true)
        .policy(policy)
        .label("search-plugins-enabled")
        .try_run_async(move || async move {
            let plugins = api.plugins().await?;
            Ok::<_, ApiError>(plugins.into_iter().map(|p| p.enabled).collect::<Vec<_>>())
        })
        .await
}

/// Install a plugin and wait for it to show up, retrying the pair on transient failures
pub async fn install_plugin<A>(
    api: &A,
    source: &str,
    name: &str,
    retry: &RetryPolicy,
    check: CheckPolicy,
) -> Result<(), RetryError<WaitError<String>>>
where
    A: SearchApi + ?Sized,
{
    RetryExecutorBuilder::new()
        .with_policy(retry.clone())
        .with_predicate(TransientOnly)
        .with_observer(TracingObserver::new("plugin-install"))
        .build()
        .execute(move || async move {
            if let Err(err) = api.install_plugins(&[source.to_string()]).await {
                return Err(CheckError::Getter(err));
            }
            wait_for_plugin(api, name, true, check).await.map(|_| ())
        })
        .await
}

/// Uninstall a plugin and wait for it to disappear, retrying the pair on transient failures
pub async fn uninstall_plugin<A>(
    api: &A,
    name: &str,
    retry: &RetryPolicy,
    check: CheckPolicy,
) -> Result<(), RetryError<WaitError<String>>>
where
    A: SearchApi + ?Sized,
{
    RetryExecutorBuilder::new()
        .with_policy(retry.clone())
        .with_predicate(TransientOnly)
        .with_observer(TracingObserver::new("plugin-uninstall"))
        .build()
        .execute(move || async move {
            if let Err(err) = api.uninstall_plugins(&[name.to_string()]).await {
                return Err(CheckError::Getter(err));
            }
            wait_for_plugin(api, name, false, check).await.map(|_| ())
        })
        .await
}

/// Enable or disable every installed plugin and wait for the flags to settle
pub async fn set_all_plugins_enabled<A>(
    api: &A,
    enable: bool,
    retry: &RetryPolicy,
    check: CheckPolicy,
) -> Result<(), RetryError<WaitError<bool>>>
where
    A: SearchApi + ?Sized,
{
    RetryExecutorBuilder::new()
        .with_policy(retry.clone())
        .with_predicate(TransientOnly)
        .with_observer(TracingObserver::new("plugin-enable"))
        .build()
        .execute(move || async move {
            let names: Vec<String> = match api.plugins().await {
                Ok(plugins) => plugins.into_iter().map(|p| p.name).collect(),
                Err(err) => return Err(CheckError::Getter(err)),
            };
            if let Err(err) = api.enable_plugins(&names, enable).await {
                return Err(CheckError::Getter(err));
            }
            wait_for_plugins_enabled(api, enable, check).await.map(|_| ())
        })
        .await
}

/// Start a search and wait until the daemon reports the job
pub async fn start_search<A>(
    api: &A,
    pattern: &str,
    plugins: &PluginSelection,
    category: &str,
    retry: &RetryPolicy,
) -> Result<SearchJob, RetryError<ApiError>>
where
    A: SearchApi + ?Sized,
{
    let job = api
        .start(pattern, plugins, category)
        .await
        .map_err(|err| RetryError::non_retryable(1, err))?;

    tracing::info!(job = job.id, pattern, plugins = %plugins, "search started");

    // A fresh job can briefly answer NotFound
    RetryExecutorBuilder::new()
        .with_policy(retry.clone())
        .with_predicate(TransientOnly)
        .with_observer(TracingObserver::new("search-job"))
        .build()
        .execute(move || async move { api.status(Some(job.id)).await })
        .await?;

    Ok(job)
}

/// Stop a job and wait until it reports `Stopped`
pub async fn stop_search<A>(
    api: &A,
    job: SearchJob,
    policy: CheckPolicy,
) -> Result<CheckOutcome<SearchJobState>, WaitError<SearchJobState>>
where
    A: SearchApi + ?Sized,
{
    if let Err(err) = api.stop(job.id).await {
        return Err(CheckError::Getter(err));
    }
    wait_for_job_state(api, job, SearchJobState::Stopped, policy).await
}
