//! # Passkey Relying-Party Core
//!
//! A WebAuthn (FIDO2) relying-party ceremony core: the registration and
//! authentication state machines that bind a user account to public-key
//! authenticators and re-verify possession of the private key on every
//! login.
//!
//! ## Key Concepts
//! - **WebAuthn**: Web Authentication API for passwordless authentication
//! - **Ceremony**: a two-phase exchange — options issuance, then response
//!   verification
//! - **Challenge**: a one-time server-chosen random value the client signs
//!   over, preventing replay
//! - **Counter**: authenticator-maintained usage counter used to detect
//!   cloned authenticators
//!
//! ## Scope
//! HTTP transport, session management, and persistent storage engines are
//! the embedder's concern: the transport calls the four ceremony operations
//! on [`RelyingParty`], and storage plugs in behind the traits in
//! [`store`]. Attestation trust-chain validation against certificate roots
//! is deliberately not modeled.
//!
//! ## Example
//! ```
//! use passkey_rp::{RelyingParty, RpConfig};
//!
//! # async fn demo() -> passkey_rp::Result<()> {
//! let config = RpConfig::new("Demo", "localhost", "http://localhost:3000")?;
//! let (rp, store) = RelyingParty::in_memory(config);
//! store.create_user("u1", "User One");
//!
//! // Hand these options to navigator.credentials.create() on the client.
//! let options = rp.begin_registration("u1").await?;
//! assert!(options.exclude_credentials.is_empty());
//! # Ok(())
//! # }
//! ```

// Module declarations - organize code into logical components
pub mod config; // Relying-party identity and ceremony policy
pub mod error; // Error taxonomy shared by stores and ceremonies
pub mod rp; // RelyingParty: ceremony entry point
pub mod store; // Storage traits and the in-memory implementation
pub mod webauthn; // Ceremony logic, wire types, verification

pub use config::RpConfig;
pub use error::{Error, ErrorKind, Result, VerificationError};
pub use rp::RelyingParty;
pub use store::memory::MemoryStore;
pub use store::models::{Authenticator, DeviceType, User};
pub use webauthn::types::{
    AuthenticationResponse, CreationOptions, RegistrationResponse, RequestOptions,
    VerifiedAuthentication, VerifiedRegistration,
};
