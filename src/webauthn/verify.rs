//! # Response Verification
//!
//! Pure cryptographic verification for both ceremonies. Nothing here touches
//! a store: callers pass the expected values and the stored credential, and
//! every check reports its own [`VerificationError`] variant so rejections
//! are actionable without exposing key material.
//!
//! ## What gets verified
//! - Client data: type, exact challenge, exact origin
//! - Authenticator data: RP-ID hash, user-presence flag, structure
//! - Registration: attested credential data and an ES256 (P-256) COSE key;
//!   attestation formats `none` and self-attesting `packed` are accepted,
//!   certificate-chain validation is out of scope
//! - Authentication: DER ECDSA signature over
//!   `authenticatorData || SHA-256(clientDataJSON)` against the stored key,
//!   plus the signature-counter clone check

use crate::error::VerificationError;
use crate::store::models::{Authenticator, DeviceType};
use crate::webauthn::types::{AuthenticationResponse, CollectedClientData, RegistrationResponse};
use base64::prelude::*;
use ciborium::Value;
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use sha2::{Digest, Sha256};
use url::Url;

type VerifyResult<T> = Result<T, VerificationError>;

// Authenticator data flag bits.
const FLAG_USER_PRESENT: u8 = 0x01;
const FLAG_BACKUP_ELIGIBLE: u8 = 0x08;
const FLAG_BACKED_UP: u8 = 0x10;
const FLAG_ATTESTED_CREDENTIAL: u8 = 0x40;

/// COSE algorithm identifier for ECDSA P-256 with SHA-256.
pub const COSE_ALG_ES256: i32 = -7;

/// Values a response is verified against, fixed by the relying-party
/// configuration and the pending challenge.
#[derive(Debug, Clone, Copy)]
pub struct Expected<'a> {
    /// The raw challenge bytes issued for this ceremony.
    pub challenge: &'a [u8],
    /// The configured origin the client data must carry.
    pub origin: &'a Url,
    /// The configured relying-party ID.
    pub rp_id: &'a str,
}

/// Everything a successful registration verification extracts from the
/// response, ready to become an [`Authenticator`] record.
#[derive(Debug, Clone)]
pub struct RegistrationInfo {
    pub credential_id: Vec<u8>,
    /// COSE-encoded credential public key.
    pub public_key: Vec<u8>,
    pub sign_count: u32,
    pub device_type: DeviceType,
    pub backed_up: bool,
}

#[derive(Debug)]
struct AuthenticatorData {
    rp_id_hash: [u8; 32],
    flags: u8,
    sign_count: u32,
    attested: Option<AttestedCredential>,
}

#[derive(Debug)]
struct AttestedCredential {
    credential_id: Vec<u8>,
    /// COSE key re-encoded on its own, without trailing extension data.
    public_key: Vec<u8>,
}

/// Verify a registration response against the issued challenge and the
/// relying-party configuration.
///
/// On success returns the extracted credential; the caller persists it.
pub fn verify_registration(
    response: &RegistrationResponse,
    expected: &Expected<'_>,
) -> VerifyResult<RegistrationInfo> {
    let client_data = check_client_data(
        &response.response.client_data_json,
        "webauthn.create",
        expected,
    )?;

    let attestation = decode_field(&response.response.attestation_object, "attestationObject")?;
    let object: Value = ciborium::de::from_reader(attestation.as_slice())
        .map_err(|_| malformed("attestation object is not valid CBOR"))?;
    let object = object
        .as_map()
        .ok_or_else(|| malformed("attestation object is not a CBOR map"))?;

    let fmt = text_entry(object, "fmt").ok_or_else(|| malformed("missing attestation format"))?;
    let auth_data_bytes = bytes_entry(object, "authData")
        .ok_or_else(|| malformed("missing authenticator data"))?;
    let att_stmt = map_entry(object, "attStmt")
        .ok_or_else(|| malformed("missing attestation statement"))?;

    let auth_data = parse_authenticator_data(auth_data_bytes)?;
    check_rp_and_presence(&auth_data, expected)?;

    let attested = auth_data
        .attested
        .ok_or_else(|| malformed("missing attested credential data"))?;
    let key = parse_cose_es256(&attested.public_key)?;

    // The outer IDs must name the credential the authenticator attested.
    let raw_id = decode_field(&response.raw_id, "rawId")?;
    if raw_id != attested.credential_id {
        return Err(malformed("credential ID does not match attested data"));
    }

    match fmt {
        // "none" carries no proof; the statement must be empty.
        "none" => {
            if !att_stmt.is_empty() {
                return Err(malformed("attestation statement present for format 'none'"));
            }
        }
        // Self-attestation: the credential key itself signs over the
        // authenticator data and client data hash. Certificate chains (x5c)
        // would require trust-root policy, which this core does not model.
        "packed" => {
            if int_entry(att_stmt, "alg") != Some(COSE_ALG_ES256 as i128) {
                return Err(malformed("unsupported attestation algorithm"));
            }
            if map_key_present(att_stmt, "x5c") {
                return Err(malformed("attestation certificate chains are not supported"));
            }
            let sig = bytes_entry(att_stmt, "sig")
                .ok_or_else(|| malformed("missing attestation signature"))?;
            check_signature(&key, auth_data_bytes, &client_data, sig)?;
        }
        other => {
            return Err(malformed(&format!("unsupported attestation format '{other}'")));
        }
    }

    Ok(RegistrationInfo {
        credential_id: attested.credential_id,
        public_key: attested.public_key,
        sign_count: auth_data.sign_count,
        device_type: if auth_data.flags & FLAG_BACKUP_ELIGIBLE != 0 {
            DeviceType::MultiDevice
        } else {
            DeviceType::SingleDevice
        },
        backed_up: auth_data.flags & FLAG_BACKED_UP != 0,
    })
}

/// Verify an authentication response against the issued challenge, the
/// relying-party configuration, and the stored authenticator.
///
/// Enforces the counter invariant: unless both counters are the zero
/// sentinel (counter unsupported), the reported counter must strictly
/// exceed the stored one. On success returns the new counter for the caller
/// to persist.
pub fn verify_authentication(
    response: &AuthenticationResponse,
    expected: &Expected<'_>,
    authenticator: &Authenticator,
) -> VerifyResult<u32> {
    let client_data = check_client_data(
        &response.response.client_data_json,
        "webauthn.get",
        expected,
    )?;

    let auth_data_bytes = decode_field(&response.response.authenticator_data, "authenticatorData")?;
    let auth_data = parse_authenticator_data(&auth_data_bytes)?;
    check_rp_and_presence(&auth_data, expected)?;

    let key = parse_cose_es256(&authenticator.public_key)?;
    let sig = decode_field(&response.response.signature, "signature")?;
    check_signature(&key, &auth_data_bytes, &client_data, &sig)?;

    // Clone detection. Zero on both sides means the authenticator does not
    // implement a counter; anything else must strictly advance.
    let reported = auth_data.sign_count;
    let stored = authenticator.sign_count;
    if (reported > 0 || stored > 0) && reported <= stored {
        return Err(VerificationError::PossibleCloneDetected);
    }

    Ok(reported)
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// Decode and validate the collected client data, returning its raw bytes
/// for signature hashing.
fn check_client_data(
    client_data_b64: &str,
    expected_type: &str,
    expected: &Expected<'_>,
) -> VerifyResult<Vec<u8>> {
    let raw = decode_field(client_data_b64, "clientDataJSON")?;
    let data: CollectedClientData = serde_json::from_slice(&raw)
        .map_err(|_| malformed("client data is not valid JSON"))?;

    if data.ty != expected_type {
        return Err(malformed(&format!(
            "unexpected client data type '{}'",
            data.ty
        )));
    }

    // The client echoes the challenge base64url-encoded, exactly as issued.
    if data.challenge != BASE64_URL_SAFE_NO_PAD.encode(expected.challenge) {
        return Err(VerificationError::ChallengeMismatch);
    }

    // Compare origins as parsed URLs so "http://host:3000" and an
    // equivalent serialization agree; anything unparseable cannot match.
    match Url::parse(&data.origin) {
        Ok(origin) if origin == *expected.origin => {}
        _ => return Err(VerificationError::OriginMismatch),
    }

    Ok(raw)
}

fn check_rp_and_presence(
    auth_data: &AuthenticatorData,
    expected: &Expected<'_>,
) -> VerifyResult<()> {
    let rp_id_hash = Sha256::digest(expected.rp_id.as_bytes());
    if auth_data.rp_id_hash[..] != rp_id_hash[..] {
        return Err(VerificationError::RpIdMismatch);
    }
    if auth_data.flags & FLAG_USER_PRESENT == 0 {
        return Err(malformed("user presence flag not set"));
    }
    Ok(())
}

/// Verify a DER ECDSA-P256 signature over
/// `authenticatorData || SHA-256(clientDataJSON)`.
fn check_signature(
    key: &VerifyingKey,
    auth_data: &[u8],
    client_data: &[u8],
    signature_der: &[u8],
) -> VerifyResult<()> {
    let signature = Signature::from_der(signature_der)
        .map_err(|_| VerificationError::SignatureInvalid)?;

    let mut message = Vec::with_capacity(auth_data.len() + 32);
    message.extend_from_slice(auth_data);
    message.extend_from_slice(&Sha256::digest(client_data));

    key.verify(&message, &signature)
        .map_err(|_| VerificationError::SignatureInvalid)
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

/// Parse raw authenticator data:
/// `rpIdHash (32) || flags (1) || signCount (4, BE) || [attested credential]`.
fn parse_authenticator_data(bytes: &[u8]) -> VerifyResult<AuthenticatorData> {
    if bytes.len() < 37 {
        return Err(malformed("authenticator data truncated"));
    }

    let mut rp_id_hash = [0u8; 32];
    rp_id_hash.copy_from_slice(&bytes[..32]);
    let flags = bytes[32];
    let sign_count = u32::from_be_bytes([bytes[33], bytes[34], bytes[35], bytes[36]]);

    let attested = if flags & FLAG_ATTESTED_CREDENTIAL != 0 {
        // aaguid (16) || credentialIdLength (2, BE) || credentialId || COSE key
        let rest = &bytes[37..];
        if rest.len() < 18 {
            return Err(malformed("attested credential data truncated"));
        }
        let id_len = u16::from_be_bytes([rest[16], rest[17]]) as usize;
        if rest.len() < 18 + id_len {
            return Err(malformed("credential ID truncated"));
        }
        let credential_id = rest[18..18 + id_len].to_vec();

        // The COSE key is the next CBOR item; extension data may follow, so
        // decode one item and re-encode it stand-alone.
        let key: Value = ciborium::de::from_reader(&rest[18 + id_len..])
            .map_err(|_| malformed("credential public key is not valid CBOR"))?;
        let mut public_key = Vec::new();
        ciborium::ser::into_writer(&key, &mut public_key)
            .map_err(|_| malformed("credential public key is not valid CBOR"))?;

        Some(AttestedCredential {
            credential_id,
            public_key,
        })
    } else {
        None
    };

    Ok(AuthenticatorData {
        rp_id_hash,
        flags,
        sign_count,
        attested,
    })
}

/// Parse a COSE_Key map into a P-256 verifying key.
///
/// Only EC2 / P-256 / ES256 is accepted, matching the single entry this
/// crate advertises in `pubKeyCredParams`.
fn parse_cose_es256(cose: &[u8]) -> VerifyResult<VerifyingKey> {
    let key: Value = ciborium::de::from_reader(cose)
        .map_err(|_| malformed("credential public key is not valid CBOR"))?;
    let map = key
        .as_map()
        .ok_or_else(|| malformed("credential public key is not a COSE map"))?;

    // COSE_Key labels: 1 = kty, 3 = alg, -1 = crv, -2 = x, -3 = y.
    if label_int(map, 1) != Some(2) {
        return Err(malformed("unsupported COSE key type"));
    }
    if label_int(map, 3) != Some(COSE_ALG_ES256 as i128) {
        return Err(malformed("unsupported COSE algorithm"));
    }
    if label_int(map, -1) != Some(1) {
        return Err(malformed("unsupported COSE curve"));
    }

    let x = label_bytes(map, -2).ok_or_else(|| malformed("missing COSE x coordinate"))?;
    let y = label_bytes(map, -3).ok_or_else(|| malformed("missing COSE y coordinate"))?;
    if x.len() != 32 || y.len() != 32 {
        return Err(malformed("COSE coordinates must be 32 bytes"));
    }

    // Uncompressed SEC1 point: 0x04 || x || y.
    let mut sec1 = Vec::with_capacity(65);
    sec1.push(0x04);
    sec1.extend_from_slice(x);
    sec1.extend_from_slice(y);

    VerifyingKey::from_sec1_bytes(&sec1)
        .map_err(|_| malformed("COSE coordinates are not a valid P-256 point"))
}

// ---------------------------------------------------------------------------
// Small helpers
// ---------------------------------------------------------------------------

fn malformed(detail: &str) -> VerificationError {
    VerificationError::MalformedResponse(detail.to_string())
}

fn decode_field(value: &str, field: &str) -> VerifyResult<Vec<u8>> {
    BASE64_URL_SAFE_NO_PAD
        .decode(value.as_bytes())
        .map_err(|_| malformed(&format!("{field} is not valid base64url")))
}

fn entry<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| k.as_text() == Some(key))
        .map(|(_, v)| v)
}

fn text_entry<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a str> {
    entry(map, key).and_then(Value::as_text)
}

fn bytes_entry<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a [u8]> {
    entry(map, key).and_then(Value::as_bytes).map(Vec::as_slice)
}

fn map_entry<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a [(Value, Value)]> {
    entry(map, key).and_then(Value::as_map).map(Vec::as_slice)
}

fn int_entry(map: &[(Value, Value)], key: &str) -> Option<i128> {
    entry(map, key).and_then(Value::as_integer).map(i128::from)
}

fn map_key_present(map: &[(Value, Value)], key: &str) -> bool {
    entry(map, key).is_some()
}

fn label_int(map: &[(Value, Value)], label: i128) -> Option<i128> {
    map.iter()
        .find(|(k, _)| k.as_integer().map(i128::from) == Some(label))
        .and_then(|(_, v)| v.as_integer())
        .map(i128::from)
}

fn label_bytes<'a>(map: &'a [(Value, Value)], label: i128) -> Option<&'a [u8]> {
    map.iter()
        .find(|(k, _)| k.as_integer().map(i128::from) == Some(label))
        .and_then(|(_, v)| v.as_bytes())
        .map(Vec::as_slice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::SigningKey;
    use rand::rngs::OsRng;

    fn cose_key(key: &VerifyingKey, alg: i32) -> Vec<u8> {
        let point = key.to_encoded_point(false);
        let map = Value::Map(vec![
            (Value::Integer(1.into()), Value::Integer(2.into())),
            (Value::Integer(3.into()), Value::Integer(alg.into())),
            (Value::Integer((-1).into()), Value::Integer(1.into())),
            (
                Value::Integer((-2).into()),
                Value::Bytes(point.x().unwrap().to_vec()),
            ),
            (
                Value::Integer((-3).into()),
                Value::Bytes(point.y().unwrap().to_vec()),
            ),
        ]);
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&map, &mut buf).unwrap();
        buf
    }

    fn auth_data(rp_id: &str, flags: u8, count: u32, attested: Option<(&[u8], &[u8])>) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&Sha256::digest(rp_id.as_bytes()));
        out.push(flags);
        out.extend_from_slice(&count.to_be_bytes());
        if let Some((cred_id, cose)) = attested {
            out.extend_from_slice(&[0u8; 16]); // aaguid
            out.extend_from_slice(&(cred_id.len() as u16).to_be_bytes());
            out.extend_from_slice(cred_id);
            out.extend_from_slice(cose);
        }
        out
    }

    #[test]
    fn authenticator_data_parses_assertion_shape() {
        let bytes = auth_data("localhost", FLAG_USER_PRESENT, 9, None);
        let parsed = parse_authenticator_data(&bytes).unwrap();
        assert_eq!(parsed.sign_count, 9);
        assert_eq!(parsed.flags, FLAG_USER_PRESENT);
        assert!(parsed.attested.is_none());
        assert_eq!(parsed.rp_id_hash[..], Sha256::digest(b"localhost")[..]);
    }

    #[test]
    fn authenticator_data_parses_attested_credential() {
        let key = SigningKey::random(&mut OsRng);
        let cose = cose_key(key.verifying_key(), COSE_ALG_ES256);
        let bytes = auth_data(
            "localhost",
            FLAG_USER_PRESENT | FLAG_ATTESTED_CREDENTIAL,
            0,
            Some((b"cred-123", &cose)),
        );
        let parsed = parse_authenticator_data(&bytes).unwrap();
        let attested = parsed.attested.unwrap();
        assert_eq!(attested.credential_id, b"cred-123");
        assert_eq!(attested.public_key, cose);
        parse_cose_es256(&attested.public_key).unwrap();
    }

    #[test]
    fn truncated_authenticator_data_is_malformed() {
        let err = parse_authenticator_data(&[0u8; 20]).unwrap_err();
        assert!(matches!(err, VerificationError::MalformedResponse(_)));
    }

    #[test]
    fn cose_key_with_wrong_algorithm_is_rejected() {
        let key = SigningKey::random(&mut OsRng);
        // EdDSA label; the key material itself is irrelevant.
        let cose = cose_key(key.verifying_key(), -8);
        let err = parse_cose_es256(&cose).unwrap_err();
        assert!(matches!(err, VerificationError::MalformedResponse(_)));
    }

    #[test]
    fn client_data_challenge_mismatch_reported_before_origin() {
        let origin = Url::parse("http://localhost:3000").unwrap();
        let expected = Expected {
            challenge: b"expected-challenge-bytes",
            origin: &origin,
            rp_id: "localhost",
        };
        // Both challenge and origin are wrong; challenge wins.
        let doc = serde_json::json!({
            "type": "webauthn.get",
            "challenge": BASE64_URL_SAFE_NO_PAD.encode(b"other"),
            "origin": "http://evil.example",
        });
        let b64 = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(&doc).unwrap());
        assert_eq!(
            check_client_data(&b64, "webauthn.get", &expected).unwrap_err(),
            VerificationError::ChallengeMismatch
        );
    }

    #[test]
    fn client_data_origin_mismatch() {
        let origin = Url::parse("http://localhost:3000").unwrap();
        let expected = Expected {
            challenge: b"challenge",
            origin: &origin,
            rp_id: "localhost",
        };
        let doc = serde_json::json!({
            "type": "webauthn.get",
            "challenge": BASE64_URL_SAFE_NO_PAD.encode(b"challenge"),
            "origin": "https://localhost:3000",
        });
        let b64 = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(&doc).unwrap());
        assert_eq!(
            check_client_data(&b64, "webauthn.get", &expected).unwrap_err(),
            VerificationError::OriginMismatch
        );
    }

    #[test]
    fn client_data_wrong_ceremony_type_is_malformed() {
        let origin = Url::parse("http://localhost:3000").unwrap();
        let expected = Expected {
            challenge: b"challenge",
            origin: &origin,
            rp_id: "localhost",
        };
        let doc = serde_json::json!({
            "type": "webauthn.create",
            "challenge": BASE64_URL_SAFE_NO_PAD.encode(b"challenge"),
            "origin": "http://localhost:3000",
        });
        let b64 = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(&doc).unwrap());
        let err = check_client_data(&b64, "webauthn.get", &expected).unwrap_err();
        assert!(matches!(err, VerificationError::MalformedResponse(_)));
    }
}
