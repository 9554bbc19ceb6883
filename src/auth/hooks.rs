//! Post-login bookkeeping hook.
//!
//! Runs detached from the request; failures are logged and never surfaced.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginEvent {
    pub username: String,
    pub provider: String,
    pub at: DateTime<Utc>,
}

impl LoginEvent {
    #[must_use]
    pub fn now(username: &str, provider: &str) -> Self {
        Self {
            username: username.to_string(),
            provider: provider.to_string(),
            at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait LoginHook: Send + Sync {
    async fn on_login(&self, event: &LoginEvent) -> anyhow::Result<()>;
}

/// Default hook: records the login in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogLoginHook;

#[async_trait]
impl LoginHook for LogLoginHook {
    async fn on_login(&self, event: &LoginEvent) -> anyhow::Result<()> {
        info!(
            username = %event.username,
            provider = %event.provider,
            at = %event.at.to_rfc3339(),
            "login recorded"
        );
        Ok(())
    }
}

pub fn spawn_login_hook(hook: Arc<dyn LoginHook>, event: LoginEvent) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(err) = hook.on_login(&event).await {
            warn!(username = %event.username, error = %err, "login hook failed");
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(AtomicUsize);

    #[async_trait]
    impl LoginHook for Counting {
        async fn on_login(&self, _event: &LoginEvent) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("bookkeeping store offline")
        }
    }

    #[tokio::test]
    async fn hook_failures_are_swallowed() {
        let hook = Arc::new(Counting(AtomicUsize::new(0)));
        spawn_login_hook(hook.clone(), LoginEvent::now("alice", "sso"))
            .await
            .unwrap();
        assert_eq!(hook.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn log_hook_succeeds() {
        assert!(LogLoginHook.on_login(&LoginEvent::now("alice", "password")).await.is_ok());
    }
}
