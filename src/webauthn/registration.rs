//! # Registration Ceremony
//!
//! Server side of passkey creation: issue creation options with a fresh
//! challenge, then verify the attestation the client posts back and persist
//! the new authenticator record.
//!
//! ## Security Notes
//! - The exclusion list carries every credential the user already has, so
//!   the same authenticator cannot be registered twice.
//! - The challenge is redeemed (consumed) before verification starts; a
//!   failed attempt cannot be retried against the same challenge.
//! - A credential ID that already exists — for this user or any other — is a
//!   rejection even after cryptographic verification succeeded. Anything
//!   else would let one account capture another's credential.

use crate::error::Result;
use crate::rp::RelyingParty;
use crate::store::models::Authenticator;
use crate::webauthn::types::{
    AuthenticatorSelection, CreationOptions, PubKeyCredParam, RegistrationResponse, RpEntity,
    UserEntity, VerifiedRegistration,
};
use crate::webauthn::verify::{self, Expected, COSE_ALG_ES256};
use base64::prelude::*;

impl RelyingParty {
    /// Begin a registration ceremony: `Init → OptionsIssued`.
    ///
    /// Loads the user, lists existing authenticators into the exclusion
    /// list, issues a fresh challenge (overwriting any pending one), and
    /// returns the options bundle for `navigator.credentials.create()`.
    ///
    /// # Errors
    /// `UserNotFound` if the user is unknown.
    pub async fn begin_registration(&self, user_id: &str) -> Result<CreationOptions> {
        let user = self.users.find_user(user_id).await?;
        let existing = self.registry.list_for(user_id).await?;
        let challenge = self.challenges.issue(user_id).await?;

        tracing::debug!(
            user = user_id,
            excluded = existing.len(),
            "issued registration options"
        );

        Ok(CreationOptions {
            rp: RpEntity {
                name: self.config.rp_name.clone(),
                id: self.config.rp_id.clone(),
            },
            user: UserEntity {
                id: BASE64_URL_SAFE_NO_PAD.encode(user.id.as_bytes()),
                name: user.display_name.clone(),
                display_name: user.display_name,
            },
            challenge: BASE64_URL_SAFE_NO_PAD.encode(&challenge.value),
            pub_key_cred_params: vec![PubKeyCredParam {
                ty: "public-key".to_string(),
                alg: COSE_ALG_ES256,
            }],
            timeout: self.config.timeout_ms(),
            exclude_credentials: existing.iter().map(Into::into).collect(),
            authenticator_selection: AuthenticatorSelection {
                resident_key: "preferred".to_string(),
                user_verification: "preferred".to_string(),
            },
            attestation: "none".to_string(),
        })
    }

    /// Finish a registration ceremony: `OptionsIssued → Verified | Rejected`.
    ///
    /// Redeems the pending challenge, verifies the attestation response,
    /// and registers the extracted authenticator for the user.
    ///
    /// # Errors
    /// - `UserNotFound` if the user is unknown
    /// - `NoActiveChallenge` / `ChallengeExpired` from redemption
    /// - `Verification(_)` with the specific failed check
    /// - `DuplicateCredential` if the credential ID is already registered
    pub async fn finish_registration(
        &self,
        user_id: &str,
        response: &RegistrationResponse,
    ) -> Result<VerifiedRegistration> {
        self.users.find_user(user_id).await?;
        let challenge = self.challenges.redeem(user_id).await?;

        let expected = Expected {
            challenge: &challenge.value,
            origin: &self.config.rp_origin,
            rp_id: &self.config.rp_id,
        };
        let info = verify::verify_registration(response, &expected)?;

        let authenticator = Authenticator {
            credential_id: info.credential_id,
            public_key: info.public_key,
            sign_count: info.sign_count,
            // Transport hints are client-declared, not authenticated; they
            // only feed future allow-lists.
            transports: response.response.transports.clone().unwrap_or_default(),
            device_type: info.device_type,
            backed_up: info.backed_up,
        };
        self.registry.add(user_id, authenticator).await?;

        tracing::debug!(
            user = user_id,
            credential = %response.id,
            "registered new authenticator"
        );

        Ok(VerifiedRegistration {
            verified: true,
            credential_id: response.id.clone(),
        })
    }
}
