//! # WebAuthn Ceremonies
//!
//! This module contains the ceremony logic for passwordless authentication.
//!
//! ## Submodules
//! - `types`: options bundles and client response shapes
//! - `registration`: creating a new passkey credential
//! - `authentication`: proving possession of an existing passkey
//! - `verify`: pure cryptographic verification shared by both ceremonies
//!
//! ## Ceremony Flow Overview
//!
//! Both ceremonies are two-phase state machines,
//! `Init → OptionsIssued → Verified | Rejected`:
//!
//! ### Registration (creating a passkey)
//! 1. Client requests registration → `RelyingParty::begin_registration`
//! 2. Server issues a challenge and returns creation options
//! 3. Client creates a credential with its authenticator
//! 4. Client posts the attestation → `RelyingParty::finish_registration`
//! 5. Server redeems the challenge, verifies the response, stores the
//!    public key
//!
//! ### Authentication (logging in)
//! 1. Client requests authentication → `RelyingParty::begin_authentication`
//! 2. Server issues a challenge and lists the user's credentials
//! 3. Client signs the challenge with its authenticator
//! 4. Client posts the assertion → `RelyingParty::finish_authentication`
//! 5. Server redeems the challenge, verifies the signature against the
//!    stored public key, and advances the signature counter
//!
//! The challenge is consumed the moment a `finish_*` call begins, whatever
//! the verification outcome, so a failed attempt can never be replayed.

pub mod authentication;
pub mod registration;
pub mod types;
pub mod verify;
