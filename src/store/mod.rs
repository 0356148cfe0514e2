//! # Storage Abstraction
//!
//! This module defines the storage interfaces the ceremonies run against:
//! - [`UserStore`]: user lookup
//! - [`ChallengeStore`]: one-time challenge issuance and redemption
//! - [`AuthenticatorRegistry`]: CRUD over registered authenticators
//!
//! The ceremonies only ever see these traits, so a deployment can back them
//! with any engine that provides atomic per-user operations. The crate ships
//! [`memory::MemoryStore`], an in-memory implementation suitable for tests
//! and single-process servers.
//!
//! ## Concurrency contract
//! - `issue`/`redeem` on the same user are mutually exclusive: `redeem` is an
//!   atomic read-and-clear, so two concurrent ceremonies cannot both redeem
//!   the same challenge.
//! - `update_counter` is compare-and-swap per (user, credential): a stale
//!   lower counter must never overwrite a higher stored one.

pub mod memory;
pub mod models;

use crate::error::Result;
use async_trait::async_trait;
use models::{Authenticator, StoredChallenge, User};

/// Read-only access to user records.
///
/// Account creation is out of scope for the ceremonies; they only need to
/// confirm a user exists and fetch its display name for ceremony options.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by ID. Fails with `UserNotFound` if absent.
    async fn find_user(&self, user_id: &str) -> Result<User>;
}

/// One-time challenge issuance and redemption, one pending challenge per
/// user.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Generate and store a fresh challenge for the user, overwriting any
    /// prior unredeemed one. Fails with `UserNotFound` if the user is
    /// unknown.
    async fn issue(&self, user_id: &str) -> Result<StoredChallenge>;

    /// Return and clear the user's pending challenge.
    ///
    /// This is a consuming read: a second call before a new `issue` fails
    /// with `NoActiveChallenge`. A challenge past its TTL is still cleared
    /// but fails with `ChallengeExpired`.
    async fn redeem(&self, user_id: &str) -> Result<StoredChallenge>;
}

/// CRUD over a user's registered authenticators, keyed by credential ID.
#[async_trait]
pub trait AuthenticatorRegistry: Send + Sync {
    /// Register a new authenticator for the user.
    ///
    /// Fails with `UserNotFound` if the user is unknown and with
    /// `DuplicateCredential` if the credential ID is already registered for
    /// *any* user. Never overwrites.
    async fn add(&self, user_id: &str, authenticator: Authenticator) -> Result<()>;

    /// All authenticators registered for the user; empty if none.
    async fn list_for(&self, user_id: &str) -> Result<Vec<Authenticator>>;

    /// The user's authenticator with this credential ID.
    ///
    /// Fails with `CredentialNotRecognized` if the user has no such
    /// credential, regardless of whether the ID exists under another user.
    async fn find(&self, user_id: &str, credential_id: &[u8]) -> Result<Authenticator>;

    /// Record a new signature counter after a successful authentication.
    ///
    /// Compare-and-swap semantics: the stored counter only moves forward, so
    /// a concurrently completed ceremony with a higher counter is never
    /// overwritten by a stale value. Fails with `CredentialNotRecognized` if
    /// the (user, credential) pair does not exist.
    async fn update_counter(
        &self,
        user_id: &str,
        credential_id: &[u8],
        new_count: u32,
    ) -> Result<()>;
}
