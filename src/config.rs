//! # Relying-Party Configuration
//!
//! Identity of the relying party plus ceremony policy, fixed at process
//! start. Changing any of these values invalidates previously issued
//! challenges, so they are deliberately not per-request.
//!
//! ## Environment Variables
//! - `RP_ID`: WebAuthn Relying Party ID (usually your domain)
//! - `RP_ORIGIN`: WebAuthn Relying Party Origin (full URL)
//! - `RP_NAME`: Human-readable name for your service
//! - `CHALLENGE_TTL_SECS`: seconds before an unredeemed challenge expires

use crate::error::{Error, Result};
use chrono::Duration;
use std::env;
use url::Url;

/// Default challenge lifetime: short enough to bound the attack window,
/// long enough for a user to finish the authenticator interaction.
const DEFAULT_CHALLENGE_TTL_SECS: i64 = 300;

/// Relying-party identity and ceremony policy.
///
/// ## WebAuthn Terminology
/// - **RP (Relying Party)**: the service relying on authenticator-backed
///   credentials
/// - **RP ID**: your domain name (e.g., "example.com" or "localhost")
/// - **RP Origin**: full URL of your application (e.g., "https://example.com")
#[derive(Debug, Clone)]
pub struct RpConfig {
    /// Human-readable name shown to users during passkey creation.
    pub rp_name: String,

    /// Relying-party ID. Must match the domain the client sees; hashed into
    /// every authenticator response.
    pub rp_id: String,

    /// Expected origin (scheme + host + port). Every response's client data
    /// must carry exactly this origin.
    pub rp_origin: Url,

    /// How long an unredeemed challenge stays valid.
    pub challenge_ttl: Duration,
}

impl RpConfig {
    /// Build a configuration from explicit values, with the default
    /// challenge TTL.
    ///
    /// # Errors
    /// Returns `Internal` if `rp_origin` is not a parseable URL.
    pub fn new(rp_name: &str, rp_id: &str, rp_origin: &str) -> Result<Self> {
        let origin = Url::parse(rp_origin)
            .map_err(|e| Error::Internal(format!("invalid RP origin '{rp_origin}': {e}")))?;

        Ok(RpConfig {
            rp_name: rp_name.to_string(),
            rp_id: rp_id.to_string(),
            rp_origin: origin,
            challenge_ttl: Duration::seconds(DEFAULT_CHALLENGE_TTL_SECS),
        })
    }

    /// Override the challenge TTL.
    pub fn with_challenge_ttl(mut self, ttl: Duration) -> Self {
        self.challenge_ttl = ttl;
        self
    }

    /// Load configuration from environment variables, reading a `.env` file
    /// first if one is present.
    ///
    /// Defaults target local development: `localhost` RP ID, origin
    /// `http://localhost:3000`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let rp_name = env::var("RP_NAME").unwrap_or_else(|_| "Passkey RP".to_string());
        let rp_id = env::var("RP_ID").unwrap_or_else(|_| "localhost".to_string());
        let rp_origin =
            env::var("RP_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let ttl_secs = match env::var("CHALLENGE_TTL_SECS") {
            Ok(raw) => raw
                .parse::<i64>()
                .map_err(|_| Error::Internal(format!("invalid CHALLENGE_TTL_SECS '{raw}'")))?,
            Err(_) => DEFAULT_CHALLENGE_TTL_SECS,
        };

        Ok(Self::new(&rp_name, &rp_id, &rp_origin)?
            .with_challenge_ttl(Duration::seconds(ttl_secs)))
    }

    /// Challenge TTL in milliseconds, for the `timeout` field of ceremony
    /// options.
    pub(crate) fn timeout_ms(&self) -> u64 {
        self.challenge_ttl.num_milliseconds().max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_default_ttl() {
        let config = RpConfig::new("Demo", "localhost", "http://localhost:3000").unwrap();
        assert_eq!(config.rp_id, "localhost");
        assert_eq!(config.challenge_ttl, Duration::seconds(300));
        assert_eq!(config.timeout_ms(), 300_000);
    }

    #[test]
    fn rejects_unparseable_origin() {
        let err = RpConfig::new("Demo", "localhost", "not a url").unwrap_err();
        assert!(!err.is_rejection());
    }
}
