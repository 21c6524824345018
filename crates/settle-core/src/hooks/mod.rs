//! Listener start hooks
//!
//! A start hook runs once before a listener handles a request. The
//! framework that dispatches requests is not part of this crate; these types
//! describe what a hook receives so a hook can be exercised on its own.

use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An incoming request as seen by a hook
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookRequest {
    /// Raw request body
    pub body: String,
    #[serde(default)]
    pub query: HashMap<String, Vec<String>>,
    /// Header names are lower-case; a header may repeat
    #[serde(default)]
    pub headers: HashMap<String, Vec<String>>,
    /// Values attached by earlier middleware
    #[serde(default)]
    pub context: HashMap<String, Value>,
}

impl HookRequest {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    /// First value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// A response produced before the hook ran, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookResponse {
    pub status: u16,
    pub body: String,
}

/// Runs before a listener
#[async_trait]
pub trait StartHook: Send + Sync {
    async fn handle(&self, request: &HookRequest, response: Option<&HookResponse>);
}

/// A start hook that calls a user-supplied async function
///
/// The function takes no arguments: it neither sees the request nor can
/// change the response. It is awaited to completion with no timeout.
pub struct CallbackStartHook<F> {
    name: String,
    callback: F,
}

impl<F, Fut> CallbackStartHook<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl<F, Fut> StartHook for CallbackStartHook<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    async fn handle(&self, request: &HookRequest, response: Option<&HookResponse>) {
        tracing::debug!(
            hook = %self.name,
            body_len = request.body.len(),
            has_response = response.is_some(),
            "running start hook"
        );
        (self.callback)().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;

    fn json_request() -> HookRequest {
        HookRequest::new("{}").with_header("Content-Type", "application/json")
    }

    #[tokio::test]
    async fn test_callback_runs() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();

        let hook = CallbackStartHook::new("mark-called", move || {
            let flag = flag.clone();
            async move {
                flag.store(true, Ordering::SeqCst);
            }
        });

        hook.handle(&json_request(), None).await;
        assert!(called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_callback_runs_once_per_handle() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let hook: Box<dyn StartHook> = Box::new(CallbackStartHook::new("count", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));

        let response = HookResponse {
            status: 200,
            body: String::new(),
        };
        hook.handle(&json_request(), None).await;
        hook.handle(&json_request(), Some(&response)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = json_request();
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(request.header("accept"), None);
    }

    #[test]
    fn test_request_from_json() {
        let request: HookRequest = serde_json::from_str(
            r#"{"body": "{}", "headers": {"content-type": ["application/json"]}}"#,
        )
        .unwrap();

        assert!(request.query.is_empty());
        assert!(request.context.is_empty());
        assert_eq!(request.header("content-type"), Some("application/json"));
    }
}
