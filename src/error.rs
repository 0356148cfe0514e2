//! # Error Handling
//!
//! This module defines the error taxonomy for the ceremony core.
//!
//! Two families of failure exist and must never be conflated:
//! - **Rejections**: expected outcomes of a ceremony (missing challenge,
//!   duplicate credential, failed verification). The caller recovers by
//!   starting a new ceremony.
//! - **Internal errors**: storage or invariant failures that indicate
//!   something is wrong with the deployment, not with the client's response.
//!
//! Transports map [`ErrorKind`] to a response class (client error vs server
//! error); the mapping itself lives outside this crate.

use thiserror::Error;

/// Application-wide error type for ceremony and store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The user ID is not known to the store.
    #[error("user '{0}' not found")]
    UserNotFound(String),

    /// The user has no registered authenticators, so there is nothing to
    /// authenticate against.
    #[error("no authenticators registered for user '{0}'")]
    NoAuthenticators(String),

    /// No challenge is pending for this user (never issued, already redeemed,
    /// or overwritten by a newer ceremony).
    #[error("no active challenge for user")]
    NoActiveChallenge,

    /// The pending challenge was issued longer ago than the configured TTL.
    /// The challenge is still consumed; the client must start over.
    #[error("challenge expired")]
    ChallengeExpired,

    /// The credential ID is already registered. Credential IDs are globally
    /// unique across users; this is never a silent overwrite.
    #[error("credential is already registered")]
    DuplicateCredential,

    /// No authenticator with this credential ID belongs to this user.
    ///
    /// Deliberately does not say whether the ID exists under another user.
    #[error("credential not recognized")]
    CredentialNotRecognized,

    /// Cryptographic verification of a registration or authentication
    /// response failed. Carries the specific check that failed.
    #[error("verification failed: {0}")]
    Verification(#[from] VerificationError),

    /// Unexpected internal failure (storage, invariant violation). Not a
    /// ceremony outcome.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Specific reason a response failed cryptographic verification.
///
/// Each check in the verifier reports its own variant so the caller can
/// surface an actionable rejection without leaking key material.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// The challenge embedded in the signed client data does not match the
    /// challenge issued for this ceremony.
    #[error("challenge mismatch")]
    ChallengeMismatch,

    /// The origin in the client data does not match the configured origin.
    #[error("origin mismatch")]
    OriginMismatch,

    /// The relying-party ID hash in the authenticator data does not match
    /// the configured RP ID.
    #[error("relying party ID mismatch")]
    RpIdMismatch,

    /// The signature does not verify against the credential public key.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// The response is structurally invalid: bad encoding, truncated
    /// authenticator data, unsupported algorithm or attestation format.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The reported signature counter did not advance past the stored one.
    /// The authenticator may have been cloned; callers decide policy.
    #[error("signature counter did not advance; possible cloned authenticator")]
    PossibleCloneDetected,
}

/// Coarse classification of an [`Error`], for transports mapping errors to
/// response classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// User, authenticator, or challenge absent.
    NotFound,
    /// Duplicate credential ID.
    Conflict,
    /// Challenge TTL exceeded.
    Expired,
    /// A verification check failed.
    VerificationFailed,
    /// Storage or invariant failure.
    Internal,
}

impl Error {
    /// Classify this error for transport mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UserNotFound(_)
            | Error::NoAuthenticators(_)
            | Error::NoActiveChallenge
            | Error::CredentialNotRecognized => ErrorKind::NotFound,
            Error::DuplicateCredential => ErrorKind::Conflict,
            Error::ChallengeExpired => ErrorKind::Expired,
            Error::Verification(_) => ErrorKind::VerificationFailed,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True for expected ceremony outcomes the client recovers from by
    /// starting a new ceremony; false only for [`Error::Internal`].
    pub fn is_rejection(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Internal)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(Error::UserNotFound("u".into()).kind(), ErrorKind::NotFound);
        assert_eq!(Error::NoActiveChallenge.kind(), ErrorKind::NotFound);
        assert_eq!(Error::DuplicateCredential.kind(), ErrorKind::Conflict);
        assert_eq!(Error::ChallengeExpired.kind(), ErrorKind::Expired);
        assert_eq!(
            Error::Verification(VerificationError::SignatureInvalid).kind(),
            ErrorKind::VerificationFailed
        );
        assert_eq!(Error::Internal("boom".into()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn rejections_exclude_internal() {
        assert!(Error::NoActiveChallenge.is_rejection());
        assert!(Error::Verification(VerificationError::PossibleCloneDetected).is_rejection());
        assert!(!Error::Internal("boom".into()).is_rejection());
    }
}
