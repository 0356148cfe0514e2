//! In-memory store backing all three storage traits.
//!
//! A single mutex guards the whole table set, which makes every trait
//! operation atomic: `redeem` is a read-and-clear under the lock, and
//! `update_counter` compares before it swaps. Suitable for tests and
//! single-process deployments; anything bigger should implement the traits
//! over a real engine with equivalent per-key atomicity.

use crate::error::{Error, Result};
use crate::store::models::{Authenticator, StoredChallenge, User};
use crate::store::{AuthenticatorRegistry, ChallengeStore, UserStore};
use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    /// Pending challenge per user ID; at most one per user.
    challenges: HashMap<String, StoredChallenge>,
    /// Authenticators per user ID, in registration order.
    authenticators: HashMap<String, Vec<Authenticator>>,
    /// Global credential-ID index, for cross-user uniqueness.
    credential_owners: HashMap<Vec<u8>, String>,
}

/// In-memory implementation of [`UserStore`], [`ChallengeStore`], and
/// [`AuthenticatorRegistry`].
pub struct MemoryStore {
    tables: Mutex<Tables>,
    challenge_ttl: Duration,
}

impl MemoryStore {
    /// Create an empty store with the given challenge TTL.
    pub fn new(challenge_ttl: Duration) -> Self {
        MemoryStore {
            tables: Mutex::new(Tables::default()),
            challenge_ttl,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // A poisoned mutex means a panic mid-update; tables may be stale but
        // are never structurally broken, so continue.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a user record. Account management is outside the ceremonies;
    /// this exists so embedders and tests can seed the store.
    pub fn create_user(&self, id: &str, display_name: &str) {
        self.lock().users.insert(
            id.to_string(),
            User {
                id: id.to_string(),
                display_name: display_name.to_string(),
            },
        );
    }

    /// Remove one authenticator from a user. External account-management
    /// hook; the ceremonies never delete.
    pub fn remove_authenticator(&self, user_id: &str, credential_id: &[u8]) -> Result<()> {
        let mut tables = self.lock();
        let list = tables
            .authenticators
            .get_mut(user_id)
            .ok_or(Error::CredentialNotRecognized)?;
        let before = list.len();
        list.retain(|a| a.credential_id != credential_id);
        if list.len() == before {
            return Err(Error::CredentialNotRecognized);
        }
        tables.credential_owners.remove(credential_id);
        Ok(())
    }

    /// Drop every pending challenge past its TTL, returning how many were
    /// removed. Run this periodically the way a server runs a cleanup task;
    /// `redeem` also rejects expired challenges on its own.
    pub fn purge_expired(&self) -> usize {
        let ttl = self.challenge_ttl;
        let mut tables = self.lock();
        let before = tables.challenges.len();
        tables.challenges.retain(|_, c| !c.is_expired(ttl));
        before - tables.challenges.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, user_id: &str) -> Result<User> {
        self.lock()
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))
    }
}

#[async_trait]
impl ChallengeStore for MemoryStore {
    async fn issue(&self, user_id: &str) -> Result<StoredChallenge> {
        let mut tables = self.lock();
        if !tables.users.contains_key(user_id) {
            return Err(Error::UserNotFound(user_id.to_string()));
        }

        let challenge = StoredChallenge::generate();
        // One pending challenge per user: a new ceremony invalidates the old.
        tables
            .challenges
            .insert(user_id.to_string(), challenge.clone());
        Ok(challenge)
    }

    async fn redeem(&self, user_id: &str) -> Result<StoredChallenge> {
        // Remove first: the challenge is consumed whatever happens next.
        let challenge = self
            .lock()
            .challenges
            .remove(user_id)
            .ok_or(Error::NoActiveChallenge)?;

        if challenge.is_expired(self.challenge_ttl) {
            return Err(Error::ChallengeExpired);
        }
        Ok(challenge)
    }
}

#[async_trait]
impl AuthenticatorRegistry for MemoryStore {
    async fn add(&self, user_id: &str, authenticator: Authenticator) -> Result<()> {
        let mut tables = self.lock();
        if !tables.users.contains_key(user_id) {
            return Err(Error::UserNotFound(user_id.to_string()));
        }
        if tables
            .credential_owners
            .contains_key(&authenticator.credential_id)
        {
            return Err(Error::DuplicateCredential);
        }

        tables.credential_owners.insert(
            authenticator.credential_id.clone(),
            user_id.to_string(),
        );
        tables
            .authenticators
            .entry(user_id.to_string())
            .or_default()
            .push(authenticator);
        Ok(())
    }

    async fn list_for(&self, user_id: &str) -> Result<Vec<Authenticator>> {
        Ok(self
            .lock()
            .authenticators
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find(&self, user_id: &str, credential_id: &[u8]) -> Result<Authenticator> {
        self.lock()
            .authenticators
            .get(user_id)
            .and_then(|list| {
                list.iter()
                    .find(|a| a.credential_id == credential_id)
                    .cloned()
            })
            .ok_or(Error::CredentialNotRecognized)
    }

    async fn update_counter(
        &self,
        user_id: &str,
        credential_id: &[u8],
        new_count: u32,
    ) -> Result<()> {
        let mut tables = self.lock();
        let authenticator = tables
            .authenticators
            .get_mut(user_id)
            .and_then(|list| list.iter_mut().find(|a| a.credential_id == credential_id))
            .ok_or(Error::CredentialNotRecognized)?;

        // Compare-and-swap: never move the counter backwards. A stale write
        // from a slower concurrent ceremony is dropped silently; the clone
        // check against the snapshot already ran in the verifier.
        if new_count > authenticator.sign_count {
            authenticator.sign_count = new_count;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::DeviceType;

    fn store() -> MemoryStore {
        let store = MemoryStore::new(Duration::minutes(5));
        store.create_user("u1", "User One");
        store.create_user("u2", "User Two");
        store
    }

    fn authenticator(id: &[u8]) -> Authenticator {
        Authenticator {
            credential_id: id.to_vec(),
            public_key: vec![0xa5, 0x01, 0x02],
            sign_count: 0,
            transports: vec!["usb".to_string()],
            device_type: DeviceType::SingleDevice,
            backed_up: false,
        }
    }

    #[tokio::test]
    async fn issue_then_redeem_round_trips() {
        let store = store();
        let issued = store.issue("u1").await.unwrap();
        let redeemed = store.redeem("u1").await.unwrap();
        assert_eq!(issued.value, redeemed.value);
    }

    #[tokio::test]
    async fn redeem_is_single_use() {
        let store = store();
        store.issue("u1").await.unwrap();
        store.redeem("u1").await.unwrap();
        assert_eq!(store.redeem("u1").await, Err(Error::NoActiveChallenge));
    }

    #[tokio::test]
    async fn redeem_without_issue_fails() {
        let store = store();
        assert_eq!(store.redeem("u1").await, Err(Error::NoActiveChallenge));
    }

    #[tokio::test]
    async fn issue_overwrites_prior_challenge() {
        let store = store();
        let first = store.issue("u1").await.unwrap();
        let second = store.issue("u1").await.unwrap();
        let redeemed = store.redeem("u1").await.unwrap();
        assert_ne!(redeemed.value, first.value);
        assert_eq!(redeemed.value, second.value);
    }

    #[tokio::test]
    async fn issue_for_unknown_user_fails() {
        let store = store();
        assert_eq!(
            store.issue("ghost").await,
            Err(Error::UserNotFound("ghost".to_string()))
        );
    }

    #[tokio::test]
    async fn expired_challenge_is_consumed_and_rejected() {
        let store = MemoryStore::new(Duration::seconds(-1));
        store.create_user("u1", "User One");
        store.issue("u1").await.unwrap();
        assert_eq!(store.redeem("u1").await, Err(Error::ChallengeExpired));
        // Consumed: the follow-up failure is NoActiveChallenge, not Expired.
        assert_eq!(store.redeem("u1").await, Err(Error::NoActiveChallenge));
    }

    #[tokio::test]
    async fn purge_removes_only_expired_challenges() {
        let expired = MemoryStore::new(Duration::seconds(-1));
        expired.create_user("u1", "User One");
        expired.issue("u1").await.unwrap();
        assert_eq!(expired.purge_expired(), 1);

        let live = store();
        live.issue("u1").await.unwrap();
        assert_eq!(live.purge_expired(), 0);
        live.redeem("u1").await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_credential_rejected_across_users() {
        let store = store();
        store.add("u1", authenticator(b"cred-1")).await.unwrap();
        assert_eq!(
            store.add("u2", authenticator(b"cred-1")).await,
            Err(Error::DuplicateCredential)
        );
        // First registration remains intact.
        assert_eq!(store.list_for("u1").await.unwrap().len(), 1);
        assert!(store.list_for("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_is_scoped_to_the_user() {
        let store = store();
        store.add("u1", authenticator(b"cred-1")).await.unwrap();
        assert_eq!(
            store.find("u2", b"cred-1").await,
            Err(Error::CredentialNotRecognized)
        );
        assert!(store.find("u1", b"cred-1").await.is_ok());
    }

    #[tokio::test]
    async fn update_counter_never_moves_backwards() {
        let store = store();
        store.add("u1", authenticator(b"cred-1")).await.unwrap();
        store.update_counter("u1", b"cred-1", 7).await.unwrap();
        // Stale lower write is dropped.
        store.update_counter("u1", b"cred-1", 3).await.unwrap();
        assert_eq!(store.find("u1", b"cred-1").await.unwrap().sign_count, 7);
    }

    #[tokio::test]
    async fn update_counter_unknown_pair_fails() {
        let store = store();
        assert_eq!(
            store.update_counter("u1", b"cred-1", 1).await,
            Err(Error::CredentialNotRecognized)
        );
    }

    #[tokio::test]
    async fn remove_authenticator_frees_the_credential_id() {
        let store = store();
        store.add("u1", authenticator(b"cred-1")).await.unwrap();
        store.remove_authenticator("u1", b"cred-1").unwrap();
        assert!(store.list_for("u1").await.unwrap().is_empty());
        // ID is registrable again, by anyone.
        store.add("u2", authenticator(b"cred-1")).await.unwrap();
    }
}
