//! Startup hooks run by the host before the first navigation.

use futures_util::future::try_join_all;
use tracing::{error, info};

use super::guard::{BootstrapError, StartupHook};

/// Hooks the host must settle before the application becomes interactive.
///
/// All hooks start together; the first failure halts startup.
#[derive(Default, Clone)]
pub struct StartupHooks {
    hooks: Vec<(String, StartupHook)>,
}

impl StartupHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named hook.
    pub fn register(&mut self, name: impl Into<String>, hook: StartupHook) -> &mut Self {
        self.hooks.push((name.into(), hook));
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook and wait for all of them.
    pub async fn run(&self) -> Result<(), BootstrapError> {
        info!("🚀 Running {} startup hook(s)...", self.hooks.len());

        let pending = self.hooks.iter().map(|(name, hook)| {
            let run = hook();
            async move {
                run.await.map_err(|e| {
                    error!("❌ Startup hook '{}' failed: {}", name, e);
                    e
                })
            }
        });
        try_join_all(pending).await?;

        info!("✅ Startup complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use futures_util::future::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_hook(counter: Arc<AtomicUsize>, fail: bool) -> StartupHook {
        Arc::new(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if fail {
                    Err(BootstrapError::Provider(ProviderError::Request(
                        "unreachable".to_string(),
                    )))
                } else {
                    Ok(())
                }
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn test_runs_every_hook() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut hooks = StartupHooks::new();
        hooks
            .register("first", counting_hook(counter.clone(), false))
            .register("second", counting_hook(counter.clone(), false));
        assert_eq!(hooks.len(), 2);

        hooks.run().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_halts_startup() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut hooks = StartupHooks::new();
        hooks
            .register("ok", counting_hook(counter.clone(), false))
            .register("broken", counting_hook(counter.clone(), true));

        let err = hooks.run().await.unwrap_err();
        assert!(matches!(err, BootstrapError::Provider(_)));
    }

    #[tokio::test]
    async fn test_empty_hooks_succeed() {
        let hooks = StartupHooks::new();
        assert!(hooks.is_empty());
        hooks.run().await.unwrap();
    }
}
