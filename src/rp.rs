//! # Relying Party
//!
//! [`RelyingParty`] is the shared entry point for all ceremony calls. It owns
//! the relying-party configuration and handles to the stores; the ceremony
//! logic itself lives in [`crate::webauthn`].
//!
//! Cloning is cheap: the stores sit behind `Arc`, so one instance can be
//! shared across however many concurrent requests the embedding transport
//! serves.

use crate::config::RpConfig;
use crate::store::memory::MemoryStore;
use crate::store::{AuthenticatorRegistry, ChallengeStore, UserStore};
use std::sync::Arc;

/// Ceremony entry point bound to one relying-party identity.
///
/// The four ceremony operations (`begin_registration`, `finish_registration`,
/// `begin_authentication`, `finish_authentication`) are implemented in the
/// `webauthn::registration` and `webauthn::authentication` modules.
#[derive(Clone)]
pub struct RelyingParty {
    pub(crate) config: RpConfig,
    pub(crate) users: Arc<dyn UserStore>,
    pub(crate) challenges: Arc<dyn ChallengeStore>,
    pub(crate) registry: Arc<dyn AuthenticatorRegistry>,
}

impl RelyingParty {
    /// Build a relying party over separately provided stores.
    pub fn new(
        config: RpConfig,
        users: Arc<dyn UserStore>,
        challenges: Arc<dyn ChallengeStore>,
        registry: Arc<dyn AuthenticatorRegistry>,
    ) -> Self {
        RelyingParty {
            config,
            users,
            challenges,
            registry,
        }
    }

    /// Build a relying party over one store implementing all three traits.
    pub fn with_store<S>(config: RpConfig, store: Arc<S>) -> Self
    where
        S: UserStore + ChallengeStore + AuthenticatorRegistry + 'static,
    {
        RelyingParty {
            config,
            users: store.clone(),
            challenges: store.clone(),
            registry: store,
        }
    }

    /// Build a relying party backed by a fresh [`MemoryStore`], returning the
    /// store too so the caller can seed users and manage records.
    pub fn in_memory(config: RpConfig) -> (Self, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new(config.challenge_ttl));
        (Self::with_store(config, store.clone()), store)
    }

    /// The fixed relying-party configuration.
    pub fn config(&self) -> &RpConfig {
        &self.config
    }
}
