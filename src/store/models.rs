//! # Store Models
//!
//! Records the ceremonies read and mutate. Only public key material is ever
//! stored; private keys never leave the user's authenticator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of random bytes in a challenge. WebAuthn requires at least 16;
/// 32 matches what the major server libraries issue.
pub const CHALLENGE_LEN: usize = 32;

/// A user account, as far as the ceremonies care about it.
///
/// Account creation and deletion are external concerns; the ceremonies only
/// look users up. The user's pending challenge is deliberately *not* a field
/// here: it lives in the challenge store, so expiry and single-use semantics
/// are enforced in one place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque unique identifier.
    pub id: String,

    /// Human-readable display name, shown during passkey creation.
    pub display_name: String,
}

/// Whether a credential is bound to one device or syncable across devices.
///
/// Derived from the backup-eligible flag in the authenticator data: a
/// credential that can be backed up (e.g., iCloud Keychain, Google Password
/// Manager) is a multi-device credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    #[serde(rename = "single-device")]
    SingleDevice,
    #[serde(rename = "multi-device")]
    MultiDevice,
}

/// A registered authenticator (passkey) belonging to a user.
///
/// Created by the registration ceremony; only `sign_count` is mutated
/// afterwards, by successful authentications. Deletion is an external
/// account-management operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authenticator {
    /// Credential ID, the primary lookup key. Globally unique across users.
    pub credential_id: Vec<u8>,

    /// COSE-encoded public key, verbatim from the attested credential data.
    pub public_key: Vec<u8>,

    /// Signature counter from the most recent successful ceremony.
    ///
    /// Authenticators without counter support report 0 forever; any other
    /// value must strictly increase, or the authenticator is presumed cloned.
    pub sign_count: u32,

    /// Transport hints declared by the client at registration
    /// (e.g., "usb", "nfc", "ble", "internal"). May be empty.
    pub transports: Vec<String>,

    /// Single-device or multi-device (syncable) credential.
    pub device_type: DeviceType,

    /// Whether the credential was backed up at the time of the last ceremony.
    pub backed_up: bool,
}

/// A pending challenge, held by the challenge store until redeemed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredChallenge {
    /// The random challenge bytes the client must sign over.
    pub value: Vec<u8>,

    /// When the challenge was issued; redemption fails once
    /// `issued_at + ttl` has passed.
    pub issued_at: DateTime<Utc>,
}

impl StoredChallenge {
    /// Mint a fresh challenge from `CHALLENGE_LEN` bytes of OS randomness.
    pub fn generate() -> Self {
        use rand::RngCore;

        let mut value = vec![0u8; CHALLENGE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut value);

        StoredChallenge {
            value,
            issued_at: Utc::now(),
        }
    }

    /// Whether this challenge has outlived the given TTL.
    pub fn is_expired(&self, ttl: chrono::Duration) -> bool {
        Utc::now() - self.issued_at > ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_challenges_are_fresh_and_long_enough() {
        let a = StoredChallenge::generate();
        let b = StoredChallenge::generate();
        assert_eq!(a.value.len(), CHALLENGE_LEN);
        assert!(a.value.len() >= 16);
        assert_ne!(a.value, b.value);
    }

    #[test]
    fn expiry_respects_ttl() {
        let challenge = StoredChallenge::generate();
        assert!(!challenge.is_expired(chrono::Duration::minutes(5)));
        assert!(challenge.is_expired(chrono::Duration::seconds(-1)));
    }

    #[test]
    fn device_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&DeviceType::SingleDevice).unwrap(),
            "\"single-device\""
        );
        assert_eq!(
            serde_json::to_string(&DeviceType::MultiDevice).unwrap(),
            "\"multi-device\""
        );
    }
}
