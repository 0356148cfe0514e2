//! # WebAuthn Wire Types
//!
//! JSON shapes exchanged with the client: the options bundles a ceremony
//! issues, and the response payloads the WebAuthn client API produces
//! (`navigator.credentials.create()` / `.get()`). All binary fields are
//! base64url without padding, matching the WebAuthn JSON serialization.

use crate::store::models::Authenticator;
use base64::prelude::*;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Ceremony options (server -> client)
// ---------------------------------------------------------------------------

/// Relying-party entity inside creation options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpEntity {
    pub name: String,
    pub id: String,
}

/// User entity inside creation options. `id` is base64url-encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    pub id: String,
    pub name: String,
    pub display_name: String,
}

/// One entry of `pubKeyCredParams`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKeyCredParam {
    #[serde(rename = "type")]
    pub ty: String,
    /// COSE algorithm identifier; -7 is ES256.
    pub alg: i32,
}

/// A credential reference in `excludeCredentials`/`allowCredentials`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDescriptor {
    #[serde(rename = "type")]
    pub ty: String,
    /// base64url credential ID.
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub transports: Vec<String>,
}

impl From<&Authenticator> for CredentialDescriptor {
    /// Reference a stored authenticator in an exclude/allow list.
    fn from(authenticator: &Authenticator) -> Self {
        CredentialDescriptor {
            ty: "public-key".to_string(),
            id: BASE64_URL_SAFE_NO_PAD.encode(&authenticator.credential_id),
            transports: authenticator.transports.clone(),
        }
    }
}

/// `authenticatorSelection` policy inside creation options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    pub resident_key: String,
    pub user_verification: String,
}

/// Options bundle for `navigator.credentials.create()`.
///
/// Mirrors `PublicKeyCredentialCreationOptionsJSON`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationOptions {
    pub rp: RpEntity,
    pub user: UserEntity,
    /// base64url challenge the authenticator must sign over.
    pub challenge: String,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    /// Milliseconds the client should allow for the ceremony.
    pub timeout: u64,
    /// Credentials the user already registered, so the same authenticator
    /// cannot be registered twice.
    pub exclude_credentials: Vec<CredentialDescriptor>,
    pub authenticator_selection: AuthenticatorSelection,
    pub attestation: String,
}

/// Options bundle for `navigator.credentials.get()`.
///
/// Mirrors `PublicKeyCredentialRequestOptionsJSON`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    /// base64url challenge the authenticator must sign over.
    pub challenge: String,
    pub timeout: u64,
    pub rp_id: String,
    /// The user's registered credentials; the client picks one.
    pub allow_credentials: Vec<CredentialDescriptor>,
    pub user_verification: String,
}

// ---------------------------------------------------------------------------
// Client responses (client -> server)
// ---------------------------------------------------------------------------

/// Attestation payload from `navigator.credentials.create()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationPayload {
    /// base64url-encoded JSON of the collected client data.
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    /// base64url CBOR attestation object (fmt, attStmt, authData).
    pub attestation_object: String,
    /// Transport hints the client observed; echoed into the stored record.
    #[serde(default)]
    pub transports: Option<Vec<String>>,
}

/// A registration response as posted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    /// base64url credential ID.
    pub id: String,
    /// Same bytes as `id`; kept separate to match the client API shape.
    pub raw_id: String,
    pub response: AttestationPayload,
}

/// Assertion payload from `navigator.credentials.get()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionPayload {
    /// base64url-encoded JSON of the collected client data.
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    /// base64url raw authenticator data (rpIdHash, flags, signCount).
    pub authenticator_data: String,
    /// base64url DER ECDSA signature over
    /// authenticatorData || SHA-256(clientDataJSON).
    pub signature: String,
    /// base64url user handle, when the authenticator stored one.
    #[serde(default)]
    pub user_handle: Option<String>,
}

/// An authentication response as posted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    /// base64url credential ID.
    pub id: String,
    pub raw_id: String,
    pub response: AssertionPayload,
}

/// The client data document both ceremonies verify.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CollectedClientData {
    /// "webauthn.create" for registration, "webauthn.get" for authentication.
    #[serde(rename = "type")]
    pub ty: String,
    /// base64url copy of the issued challenge.
    pub challenge: String,
    /// Origin the browser observed.
    pub origin: String,
}

// ---------------------------------------------------------------------------
// Ceremony results (server -> client)
// ---------------------------------------------------------------------------

/// Terminal `Verified` outcome of a registration ceremony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedRegistration {
    pub verified: bool,
    /// base64url ID of the newly registered credential.
    pub credential_id: String,
}

/// Terminal `Verified` outcome of an authentication ceremony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedAuthentication {
    pub verified: bool,
    /// Counter now stored for the credential.
    pub new_counter: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_response_parses_client_api_shape() {
        let raw = serde_json::json!({
            "id": "AQID",
            "rawId": "AQID",
            "response": {
                "clientDataJSON": "e30",
                "attestationObject": "oWNmbXRkbm9uZQ",
                "transports": ["internal", "hybrid"]
            }
        });
        let parsed: RegistrationResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.raw_id, "AQID");
        assert_eq!(
            parsed.response.transports.as_deref(),
            Some(&["internal".to_string(), "hybrid".to_string()][..])
        );
    }

    #[test]
    fn authentication_response_user_handle_is_optional() {
        let raw = serde_json::json!({
            "id": "AQID",
            "rawId": "AQID",
            "response": {
                "clientDataJSON": "e30",
                "authenticatorData": "AAAA",
                "signature": "AAAA"
            }
        });
        let parsed: AuthenticationResponse = serde_json::from_value(raw).unwrap();
        assert!(parsed.response.user_handle.is_none());
    }

    #[test]
    fn creation_options_serialize_camel_case() {
        let options = CreationOptions {
            rp: RpEntity {
                name: "Demo".into(),
                id: "localhost".into(),
            },
            user: UserEntity {
                id: "dTE".into(),
                name: "User One".into(),
                display_name: "User One".into(),
            },
            challenge: "AAAA".into(),
            pub_key_cred_params: vec![PubKeyCredParam {
                ty: "public-key".into(),
                alg: -7,
            }],
            timeout: 300_000,
            exclude_credentials: vec![],
            authenticator_selection: AuthenticatorSelection {
                resident_key: "preferred".into(),
                user_verification: "preferred".into(),
            },
            attestation: "none".into(),
        };
        let json = serde_json::to_value(&options).unwrap();
        assert!(json.get("pubKeyCredParams").is_some());
        assert!(json.get("excludeCredentials").is_some());
        assert_eq!(json["user"]["displayName"], "User One");
        assert_eq!(json["authenticatorSelection"]["residentKey"], "preferred");
    }
}
