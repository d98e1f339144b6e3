//! Page startup: the bootstrap guard and the hooks the host runs before the
//! first navigation.
//!
//! The host registers `BootstrapGuard::hook()` (possibly more than once, or
//! from several places); the guard makes sure the provider is initialized a
//! single time and every hook sees the same outcome.

mod guard;
mod hooks;

pub use guard::{BootstrapGuard, Phase};
pub use hooks::StartupHooks;
