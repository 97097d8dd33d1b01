//! Compact signed tokens and the issuer/verifier pair that produces and
//! checks them
//!
//! A token is `base64url(header) "." base64url(payload) "." base64url(tag)`
//! where the tag is an HMAC-SHA-256 over the first two sections. The
//! algorithm is pinned: the only header this module ever writes, and the
//! only one it will honor, declares `HS256`.

use std::{fmt, time::Duration};

use aliri_braid::braid;
use base64::engine::{general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

use crate::{
    claims::{Audience, Issuer, PrivilegeSet, TokenClaims},
    clock::{Clock, System},
    error::{self, IssueError, VerifyError},
    hmac::SigningKey,
};

/// The declared signing algorithm of a token
///
/// Only [`HS256`][Self::HS256] is ever accepted. The other variants exist
/// so that a hostile header deserializes cleanly and is then rejected by
/// the verifier rather than being mistaken for a damaged token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    /// HMAC using SHA-256
    HS256,

    /// An unsecured token, never accepted
    #[serde(rename = "none")]
    None,

    /// Any algorithm outside the supported set
    #[serde(other)]
    Unknown,
}

/// The header section of a token
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct Header {
    alg: Algorithm,
}

impl Header {
    /// Constructs the one header this crate signs under
    #[inline]
    pub const fn new() -> Self {
        Self {
            alg: Algorithm::HS256,
        }
    }

    /// The declared signing algorithm
    #[must_use]
    pub const fn alg(self) -> Algorithm {
        self.alg
    }
}

impl Default for Header {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// A signed compact token
///
/// This type provides custom implementations of
/// [`Display`][TokenRef#impl-Display] and [`Debug`][TokenRef#impl-Debug]
/// to prevent unintentional disclosures of sensitive values. See the
/// documentation on those trait implementations on the [`TokenRef`] type
/// for more information.
#[braid(
    serde,
    debug = "owned",
    display = "owned",
    ord = "omit",
    ref_doc = "\
    A borrowed reference to a signed compact token ([`Token`])\n\
    \n\
    This type provides custom implementations of [`Display`][Self#impl-Display] and \
    [`Debug`][Self#impl-Debug] to prevent unintentional disclosures of sensitive values. \
    See the documentation on those trait implementations for more information.
    "
)]
#[must_use]
pub struct Token;

/// The base64url length of a 32-byte HMAC-SHA-256 tag
const ENCODED_TAG_LEN: usize = 43;

macro_rules! expect_two {
    ($iter:expr) => {{
        let mut i = $iter;
        match (i.next(), i.next(), i.next()) {
            (Some(first), Some(second), None) => Some((first, second)),
            _ => None,
        }
    }};
}

impl Token {
    /// Constructs a new token from a header and payload, signed by the
    /// given key
    ///
    /// Header and payload are serialized as JSON blobs.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization of either the header or the
    /// payload fails.
    pub fn try_from_signed_parts<H: Serialize, P: Serialize>(
        header: &H,
        payload: &P,
        key: &SigningKey,
    ) -> Result<Self, IssueError> {
        let h_raw = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(header).map_err(|e| IssueError::MalformedHeader(e.into()))?,
        );
        let p_raw = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(payload).map_err(|e| IssueError::MalformedPayload(e.into()))?,
        );

        let expected_len = h_raw.len() + p_raw.len() + ENCODED_TAG_LEN + 2;

        let mut message = String::with_capacity(expected_len);
        message.push_str(&h_raw);
        message.push('.');
        message.push_str(&p_raw);

        let tag = key.sign(message.as_bytes());

        message.push('.');
        message.push_str(&URL_SAFE_NO_PAD.encode(tag));

        debug_assert_eq!(message.len(), expected_len);

        Ok(Self::new(message))
    }
}

impl TokenRef {
    /// Splits the token into its three sections, decoding the header and
    /// signature
    ///
    /// The payload stays raw until the signature over it has been checked.
    pub(crate) fn decompose(&self) -> Result<Decomposed<'_>, VerifyError> {
        let (s_str, message) =
            expect_two!(self.as_str().rsplitn(2, '.')).ok_or(VerifyError::Malformed)?;
        let (payload, h_str) =
            expect_two!(message.rsplitn(2, '.')).ok_or(VerifyError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(s_str)
            .map_err(error::malformed_signature)?;
        let h_raw = URL_SAFE_NO_PAD
            .decode(h_str)
            .map_err(error::malformed_header)?;
        let header: Header =
            serde_json::from_slice(&h_raw).map_err(error::malformed_header)?;
        Ok(Decomposed {
            header,
            message,
            payload,
            signature,
        })
    }
}

/// A token split into its sections, with the payload still unchecked
pub(crate) struct Decomposed<'a> {
    header: Header,
    message: &'a str,
    payload: &'a str,
    signature: Vec<u8>,
}

impl Decomposed<'_> {
    /// Checks the signature under the given key, then deserializes the
    /// payload
    ///
    /// A header declaring anything other than `HS256`, including `none`,
    /// is reported as a signature mismatch. An unsecured token has no
    /// valid signature under the pinned key.
    pub(crate) fn verify(self, key: &SigningKey) -> Result<TokenClaims, VerifyError> {
        if self.header.alg() != Algorithm::HS256 {
            return Err(VerifyError::SignatureMismatch);
        }

        key.verify(self.message.as_bytes(), &self.signature)?;

        let p_raw = URL_SAFE_NO_PAD
            .decode(self.payload)
            .map_err(error::malformed_payload)?;
        let claims = serde_json::from_slice(&p_raw).map_err(error::malformed_payload)?;
        Ok(claims)
    }
}

/// By default, this type holds potentially sensitive information. To prevent
/// unintentional disclosure of this value, this type will not print out its
/// contents without explicitly specifying the alternate debug format,
/// i.e. `{:#?}`. When specified in this form, it will print out the entire
/// header and payload, but will omit the token's signature. To change the
/// number of characters in the signature that should be printed, specify the
/// amount as a width in the format string, i.e. `{:#25?}`.
///
/// If not specified, a placeholder value will be printed out instead to
/// indicate that it is hiding sensitive information.
///
/// If, for any reason, the token does not contain a `.` character, then the
/// limitations specified above will apply to the token as a whole.
impl fmt::Debug for TokenRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            f.write_str("\"")?;
            if let Some(last_period) = self.0.rfind('.') {
                f.write_str(&self.0[..=last_period])?;
                limited_reveal(&self.0[last_period + 1..], &mut *f, 0)?;
            } else {
                limited_reveal(&self.0, &mut *f, 0)?;
            }
            f.write_str("\"")
        } else {
            f.write_str("***TOKEN***")
        }
    }
}

/// By default, this type holds potentially sensitive information. To prevent
/// unintentional disclosure of this value, this type will not print out its
/// contents without explicitly specifying the alternate format, i.e. `{:#}`.
/// When specified in this form, it will print out the entire token by
/// default. However, if it is preferable to elide some of the characters in
/// the signature, then that can be modified by specifying the quantity as a
/// width in the format string, i.e. `{:#10}`.
///
/// If not specified, a placeholder value will be printed out instead to
/// indicate that it is hiding sensitive information.
impl fmt::Display for TokenRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            if let Some(last_period) = self.0.rfind('.') {
                f.write_str(&self.0[..=last_period])?;
                limited_reveal(&self.0[last_period + 1..], &mut *f, usize::MAX)
            } else {
                limited_reveal(&self.0, &mut *f, usize::MAX)
            }
        } else {
            f.write_str("***TOKEN***")
        }
    }
}

fn limited_reveal(unprotected: &str, f: &mut fmt::Formatter, default_len: usize) -> fmt::Result {
    let max_len = f.width().unwrap_or(default_len);
    if max_len <= 1 {
        f.write_str("…")
    } else if max_len > unprotected.len() {
        f.write_str(unprotected)
    } else {
        let mut end = max_len - 1;
        while !unprotected.is_char_boundary(end) {
            end -= 1;
        }
        f.write_str(&unprotected[..end])?;
        f.write_str("…")
    }
}

/// Produces signed tokens bound to one issuer, audience, and key
///
/// Construction is expected to happen once at startup from validated
/// configuration. The issuer holds no mutable state and can be shared
/// freely.
#[derive(Clone, Debug)]
#[must_use]
pub struct TokenIssuer {
    key: SigningKey,
    issuer: Issuer,
    audience: Audience,
    lifetime: Duration,
}

impl TokenIssuer {
    /// The lifetime granted to issued tokens unless overridden
    pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(30 * 60);

    /// Constructs an issuer with the default token lifetime
    pub fn new(key: SigningKey, issuer: Issuer, audience: Audience) -> Self {
        Self {
            key,
            issuer,
            audience,
            lifetime: Self::DEFAULT_LIFETIME,
        }
    }

    /// Overrides the lifetime granted to issued tokens
    pub fn with_lifetime(self, lifetime: Duration) -> Self {
        Self { lifetime, ..self }
    }

    /// Issues a signed token granting the given privileges
    ///
    /// The token expires one lifetime after the clock's current reading.
    /// Issuance is deterministic: the same grants and the same clock
    /// reading produce the same token bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the header or payload cannot be serialized.
    pub fn issue<C: Clock>(
        &self,
        grants: PrivilegeSet,
        clock: &C,
    ) -> Result<Token, IssueError> {
        let claims = TokenClaims::new(
            self.issuer.clone(),
            self.audience.clone(),
            clock.now() + self.lifetime,
        )
        .with_grants(grants);

        Token::try_from_signed_parts(&Header::new(), &claims, &self.key)
    }
}

/// Checks signed tokens against one issuer, audience, and key
///
/// Checks run in a fixed order and stop at the first failure: the token
/// must decompose, its signature must match under the pinned algorithm,
/// and only then are the issuer, audience, and expiry claims examined. A
/// caller therefore never learns anything about the claims of a token it
/// could not have produced.
#[derive(Clone, Debug)]
#[must_use]
pub struct TokenVerifier {
    key: SigningKey,
    issuer: Issuer,
    audience: Audience,
    leeway: Duration,
}

impl TokenVerifier {
    /// Constructs a verifier with no expiry grace period
    pub fn new(key: SigningKey, issuer: Issuer, audience: Audience) -> Self {
        Self {
            key,
            issuer,
            audience,
            leeway: Duration::default(),
        }
    }

    /// Allows a grace period past a token's expiry
    #[inline]
    pub fn with_leeway(self, leeway: Duration) -> Self {
        Self { leeway, ..self }
    }

    /// Allows a grace period (in seconds) past a token's expiry
    #[inline]
    pub fn with_leeway_secs(self, leeway: u64) -> Self {
        Self {
            leeway: Duration::from_secs(leeway),
            ..self
        }
    }

    /// Verifies a token against the system clock
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, carries a bad
    /// signature, or carries claims that do not satisfy this verifier.
    pub fn verify(&self, token: &TokenRef) -> Result<TokenClaims, VerifyError> {
        self.verify_at(token, &System)
    }

    /// Verifies a token against the given clock
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, carries a bad
    /// signature, or carries claims that do not satisfy this verifier.
    pub fn verify_at<C: Clock>(
        &self,
        token: &TokenRef,
        clock: &C,
    ) -> Result<TokenClaims, VerifyError> {
        let claims = token.decompose()?.verify(&self.key)?;

        if claims.issuer() != &self.issuer {
            tracing::debug!(issuer = %claims.issuer(), "token names an unexpected issuer");
            return Err(VerifyError::IssuerMismatch);
        }

        if claims.audience() != &self.audience {
            tracing::debug!(audience = %claims.audience(), "token names an unexpected audience");
            return Err(VerifyError::AudienceMismatch);
        }

        let now = clock.now();
        if claims.expiry().0 < now.0.saturating_sub(self.leeway.as_secs()) {
            tracing::debug!(exp = claims.expiry().0, now = now.0, "token has expired");
            return Err(VerifyError::Expired);
        }

        Ok(claims)
    }
}
