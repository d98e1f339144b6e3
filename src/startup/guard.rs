//! One-shot initialization of the identity-provider session.
//!
//! `BootstrapGuard` owns the bootstrap phase. Every caller of `ensure` goes
//! through a single check-and-transition:
//!
//! ```text
//! Uninitialized --ensure--> Initializing --provider.init Ok--> Initialized
//!                                        \--provider.init Err-> Failed
//! ```
//!
//! Only the caller that performs the `Uninitialized -> Initializing`
//! transition talks to the provider. Callers arriving while that attempt is
//! in flight wait for its real outcome. `Initialized` and `Failed` are
//! terminal: a failed bootstrap is reported again, never retried.

use std::sync::{Arc, Mutex};

use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::InitConfig;
use crate::provider::{IdentityProvider, ProviderError};

/// Why the session could not be bootstrapped.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BootstrapError {
    /// The provider's init call failed.
    #[error("Identity provider initialization failed: {0}")]
    Provider(#[from] ProviderError),
    /// The in-flight attempt was dropped before it finished.
    #[error("Identity provider initialization was abandoned")]
    Abandoned,
}

/// Bootstrap phase. Moves forward only.
#[derive(Debug, Clone, Default)]
pub enum Phase {
    #[default]
    Uninitialized,
    Initializing,
    /// `authenticated` is the provider's answer to init.
    Initialized { authenticated: bool },
    Failed(BootstrapError),
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Initialized { .. } | Phase::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Initializing => "initializing",
            Phase::Initialized { .. } => "initialized",
            Phase::Failed(_) => "failed",
        }
    }
}

type Outcome = Result<bool, BootstrapError>;

struct GuardState {
    phase: Phase,
    /// Present while `phase` is `Initializing`.
    in_flight: Option<watch::Receiver<Option<Outcome>>>,
}

enum Role {
    Done(Outcome),
    Wait(watch::Receiver<Option<Outcome>>),
    Lead(watch::Sender<Option<Outcome>>),
}

/// A startup hook: resolves once the session is known.
pub type StartupHook =
    Arc<dyn Fn() -> BoxFuture<'static, Result<(), BootstrapError>> + Send + Sync>;

/// Guards the single provider initialization for a page.
pub struct BootstrapGuard {
    provider: Arc<dyn IdentityProvider>,
    options: InitConfig,
    state: Mutex<GuardState>,
}

impl BootstrapGuard {
    pub fn new(provider: Arc<dyn IdentityProvider>, options: InitConfig) -> Self {
        Self {
            provider,
            options,
            state: Mutex::new(GuardState {
                phase: Phase::Uninitialized,
                in_flight: None,
            }),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.lock().phase.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GuardState> {
        // The state is only mutated in short, panic-free sections.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Check the phase and claim the transition to `Initializing` if nobody has.
    fn claim(&self) -> Role {
        let mut state = self.lock();
        match &state.phase {
            Phase::Initialized { authenticated } => return Role::Done(Ok(*authenticated)),
            Phase::Failed(err) => return Role::Done(Err(err.clone())),
            Phase::Initializing => {
                return match &state.in_flight {
                    Some(rx) => Role::Wait(rx.clone()),
                    None => Role::Done(Err(BootstrapError::Abandoned)),
                }
            }
            Phase::Uninitialized => {}
        }

        let (tx, rx) = watch::channel(None);
        state.phase = Phase::Initializing;
        state.in_flight = Some(rx);
        Role::Lead(tx)
    }

    fn finish(&self, outcome: &Outcome) {
        let mut state = self.lock();
        state.phase = match outcome {
            Ok(authenticated) => Phase::Initialized {
                authenticated: *authenticated,
            },
            Err(err) => Phase::Failed(err.clone()),
        };
        state.in_flight = None;
    }

    /// Make sure the provider session is initialized.
    ///
    /// Resolves `Ok(authenticated)` once the session is known. The provider's
    /// init is called at most once for the lifetime of the guard.
    pub async fn ensure(&self) -> Result<bool, BootstrapError> {
        match self.claim() {
            Role::Done(outcome) => {
                debug!("Bootstrap already settled, skipping provider init");
                outcome
            }
            Role::Wait(mut rx) => {
                debug!("⏳ Bootstrap in flight, waiting for its outcome...");
                match rx.wait_for(Option::is_some).await {
                    Ok(outcome) => outcome.clone().unwrap_or(Err(BootstrapError::Abandoned)),
                    Err(_) => {
                        warn!("⚠️  Bootstrap attempt was abandoned before it finished");
                        Err(BootstrapError::Abandoned)
                    }
                }
            }
            Role::Lead(tx) => {
                info!("🔵 Starting identity provider init...");
                let outcome = self
                    .provider
                    .init(&self.options)
                    .await
                    .map_err(BootstrapError::from);

                match &outcome {
                    Ok(authenticated) => {
                        info!("✅ Identity provider init completed");
                        info!("   Authenticated: {}", authenticated);
                    }
                    Err(e) => error!("❌ Identity provider init failed: {}", e),
                }

                self.finish(&outcome);
                // Waiters may all be gone; that is fine.
                let _ = tx.send(Some(outcome.clone()));
                outcome
            }
        }
    }

    /// The guard as a startup hook, for `StartupHooks`.
    pub fn hook(self: &Arc<Self>) -> StartupHook {
        let guard = Arc::clone(self);
        Arc::new(move || {
            let guard = Arc::clone(&guard);
            async move { guard.ensure().await.map(|_| ()) }.boxed()
        })
    }
}
