//! Login callback state with PKCE parameters.
//!
//! The login redirect leaves the page, so the verifier and `state` needed to
//! finish the code exchange are kept in `callback-state.json` until the
//! provider sends the browser back.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info};

/// Callback state TTL in minutes
const STATE_TTL_MINUTES: u64 = 10;

const STATE_FILE: &str = "callback-state.json";

/// Pending login, stored between the redirect and the callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackState {
    pub state: String,
    pub code_verifier: Option<String>,
    pub code_challenge: Option<String>,
    pub nonce: Option<String>,
    pub redirect_uri: String,
    pub creation_time: u64,
}

/// File-backed store for the pending login.
#[derive(Debug, Clone)]
pub struct CallbackStore {
    state_path: PathBuf,
}

impl CallbackStore {
    /// Create a store under `cache_dir`, creating the directory if needed.
    pub fn new(cache_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)
            .with_context(|| format!("Failed to create cache directory: {:?}", cache_dir))?;

        Ok(Self {
            state_path: cache_dir.join(STATE_FILE),
        })
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Generate base64url encoded random bytes
    fn generate_random_base64url(length: usize) -> String {
        let mut bytes = vec![0u8; length];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    /// Get current time in milliseconds
    fn current_time_millis() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    /// S256 code challenge for a verifier.
    pub fn code_challenge(verifier: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    /// Create and persist a new pending login, replacing any previous one.
    pub fn create(&self, redirect_uri: &str, pkce: bool, nonce: bool) -> Result<CallbackState> {
        info!("Creating login callback state");

        let code_verifier = pkce.then(|| Self::generate_random_base64url(48));
        let code_challenge = code_verifier.as_deref().map(Self::code_challenge);

        let callback = CallbackState {
            state: Self::generate_random_base64url(16),
            code_verifier,
            code_challenge,
            nonce: nonce.then(|| Self::generate_random_base64url(16)),
            redirect_uri: redirect_uri.to_string(),
            creation_time: Self::current_time_millis(),
        };

        let content = serde_json::to_string_pretty(&callback)
            .context("Failed to serialize callback state")?;
        std::fs::write(&self.state_path, content)
            .with_context(|| format!("Failed to write callback state: {:?}", self.state_path))?;

        debug!("Callback state saved to {:?}", self.state_path);

        Ok(callback)
    }

    /// Read the pending login if it matches `state` and has not expired.
    ///
    /// The stored entry is removed whether or not it matches.
    pub fn take(&self, state: &str) -> Option<CallbackState> {
        let stored = self.read();
        self.remove();

        let stored = stored?;
        if stored.state != state {
            debug!("Callback state mismatch");
            return None;
        }

        let age_ms = Self::current_time_millis().saturating_sub(stored.creation_time);
        if age_ms < STATE_TTL_MINUTES * 60 * 1000 {
            Some(stored)
        } else {
            debug!("Callback state expired");
            None
        }
    }

    fn read(&self) -> Option<CallbackState> {
        if !self.state_path.exists() {
            return None;
        }

        let content = match std::fs::read_to_string(&self.state_path) {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to read callback state: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => Some(state),
            Err(e) => {
                error!("Failed to parse callback state: {}", e);
                None
            }
        }
    }

    fn remove(&self) {
        if self.state_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.state_path) {
                error!("Failed to remove callback state: {}", e);
            }
        }
    }
}
