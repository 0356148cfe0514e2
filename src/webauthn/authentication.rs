//! # Authentication Ceremony
//!
//! Server side of passkey login: issue request options scoped to the user's
//! registered credentials, then verify the signed assertion and advance the
//! clone-detection counter.

use crate::error::{Error, Result, VerificationError};
use crate::rp::RelyingParty;
use crate::webauthn::types::{
    AuthenticationResponse, RequestOptions, VerifiedAuthentication,
};
use crate::webauthn::verify::{self, Expected};
use base64::prelude::*;

impl RelyingParty {
    /// Begin an authentication ceremony: `Init → OptionsIssued`.
    ///
    /// # Errors
    /// - `UserNotFound` if the user is unknown
    /// - `NoAuthenticators` if the user has no registered credentials
    pub async fn begin_authentication(&self, user_id: &str) -> Result<RequestOptions> {
        self.users.find_user(user_id).await?;

        let known = self.registry.list_for(user_id).await?;
        if known.is_empty() {
            return Err(Error::NoAuthenticators(user_id.to_string()));
        }
        let challenge = self.challenges.issue(user_id).await?;

        tracing::debug!(
            user = user_id,
            credentials = known.len(),
            "issued authentication options"
        );

        Ok(RequestOptions {
            challenge: BASE64_URL_SAFE_NO_PAD.encode(&challenge.value),
            timeout: self.config.timeout_ms(),
            rp_id: self.config.rp_id.clone(),
            allow_credentials: known.iter().map(Into::into).collect(),
            user_verification: "preferred".to_string(),
        })
    }

    /// Finish an authentication ceremony:
    /// `OptionsIssued → Verified | Rejected`.
    ///
    /// Redeems the pending challenge, looks up the authenticator named by
    /// the response within this user's credentials, verifies the assertion,
    /// and records the new signature counter.
    ///
    /// # Errors
    /// - `UserNotFound` if the user is unknown
    /// - `NoActiveChallenge` / `ChallengeExpired` from redemption
    /// - `CredentialNotRecognized` if this user has no such credential
    ///   (whether or not the ID exists under another user)
    /// - `Verification(PossibleCloneDetected)` if the counter failed to
    ///   advance; the stored counter is left untouched
    /// - `Verification(_)` for any other failed check
    pub async fn finish_authentication(
        &self,
        user_id: &str,
        response: &AuthenticationResponse,
    ) -> Result<VerifiedAuthentication> {
        self.users.find_user(user_id).await?;
        let challenge = self.challenges.redeem(user_id).await?;

        let credential_id = BASE64_URL_SAFE_NO_PAD
            .decode(response.raw_id.as_bytes())
            .map_err(|_| {
                Error::Verification(VerificationError::MalformedResponse(
                    "rawId is not valid base64url".to_string(),
                ))
            })?;
        let authenticator = self.registry.find(user_id, &credential_id).await?;

        let expected = Expected {
            challenge: &challenge.value,
            origin: &self.config.rp_origin,
            rp_id: &self.config.rp_id,
        };
        let new_counter = verify::verify_authentication(response, &expected, &authenticator)
            .map_err(|e| {
                if e == VerificationError::PossibleCloneDetected {
                    tracing::warn!(
                        user = user_id,
                        credential = %response.id,
                        stored_counter = authenticator.sign_count,
                        "signature counter did not advance; possible cloned authenticator"
                    );
                }
                e
            })?;

        self.registry
            .update_counter(user_id, &credential_id, new_counter)
            .await?;

        tracing::debug!(
            user = user_id,
            credential = %response.id,
            counter = new_counter,
            "authentication verified"
        );

        Ok(VerifiedAuthentication {
            verified: true,
            new_counter,
        })
    }
}
