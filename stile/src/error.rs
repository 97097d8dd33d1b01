//! Common errors

use std::error::Error as StdError;

use thiserror::Error;

/// The shared signing key is unusable
///
/// Detected when the key is constructed, which is expected to happen once
/// at process startup. A process holding a rejected key must not serve
/// traffic.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The secret is shorter than the minimum required for HMAC-SHA-256
    #[error("signing key is {len} bytes; at least {min} bytes are required")]
    WeakKey {
        /// The length of the rejected secret in bytes
        len: usize,
        /// The minimum acceptable length in bytes
        min: usize,
    },

    /// The source of randomness failed while generating a secret
    #[error("unable to generate a signing key")]
    GenerationFailure,
}

/// An error occurring while producing a signed token
#[derive(Debug, Error)]
pub enum IssueError {
    /// The token header could not be serialized
    #[error("malformed token header")]
    MalformedHeader(#[source] Box<dyn StdError + Send + Sync + 'static>),

    /// The token payload could not be serialized
    #[error("malformed token payload")]
    MalformedPayload(#[source] Box<dyn StdError + Send + Sync + 'static>),
}

/// An error occurring while verifying a token
///
/// Verification short-circuits on the first failure, so exactly one of
/// these is produced per rejected token. At an HTTP boundary every variant
/// maps to the same `401` response; the distinctions exist for diagnostics
/// and tests, and must not be leaked to clients.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The token does not have a discernible header, payload, and signature
    #[error("malformed token")]
    Malformed,

    /// The token header section could not be decoded
    #[error("malformed token header")]
    MalformedHeader(#[source] Box<dyn StdError + Send + Sync + 'static>),

    /// The token payload section could not be decoded
    #[error("malformed token payload")]
    MalformedPayload(#[source] Box<dyn StdError + Send + Sync + 'static>),

    /// The token signature section could not be decoded
    #[error("malformed token signature")]
    MalformedSignature(#[source] Box<dyn StdError + Send + Sync + 'static>),

    /// The signature does not match the signed message under the pinned key
    #[error("signature mismatch")]
    SignatureMismatch,

    /// The `iss` claim does not name the expected issuer
    #[error("issuer mismatch")]
    IssuerMismatch,

    /// The `aud` claim does not name the expected audience
    #[error("audience mismatch")]
    AudienceMismatch,

    /// The token's expiry has passed
    #[error("token expired")]
    Expired,
}

impl VerifyError {
    /// Whether the token was rejected because its signature did not match
    #[must_use]
    pub fn is_signature_mismatch(&self) -> bool {
        matches!(self, Self::SignatureMismatch)
    }

    /// Whether the token was rejected because it had expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }

    /// Whether the token was rejected before its signature could be checked
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::Malformed
                | Self::MalformedHeader(_)
                | Self::MalformedPayload(_)
                | Self::MalformedSignature(_)
        )
    }
}

#[inline]
pub(crate) fn malformed_header(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> VerifyError {
    VerifyError::MalformedHeader(source.into())
}

#[inline]
pub(crate) fn malformed_payload(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> VerifyError {
    VerifyError::MalformedPayload(source.into())
}

#[inline]
pub(crate) fn malformed_signature(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> VerifyError {
    VerifyError::MalformedSignature(source.into())
}
