//! The shared HMAC signing key
//!
//! The signing algorithm is pinned to HMAC-SHA-256 for the lifetime of the
//! process. There is deliberately no algorithm negotiation: a token header
//! may claim whatever it likes, but signatures are always produced and
//! checked with this one algorithm and this one key.

use std::fmt;

use ring::rand::SecureRandom;

use crate::error::{KeyError, VerifyError};

/// The minimum acceptable secret length, in bytes
///
/// HMAC-SHA-256 requires at least a 256-bit secret to deliver its full
/// strength; shorter secrets are rejected outright rather than silently
/// padded.
pub const MIN_SECRET_LEN: usize = 256 / 8;

/// A shared symmetric signing key, pinned to HMAC-SHA-256
///
/// Initialized once at startup and then only read; the key is cheap to
/// clone and safe to share across request workers without synchronization.
#[derive(Clone, PartialEq, Eq)]
#[must_use]
pub struct SigningKey {
    secret: Vec<u8>,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("SigningKey { secret }")
    }
}

impl SigningKey {
    /// Constructs a signing key from the provided secret
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::WeakKey`] if the secret is shorter than
    /// [`MIN_SECRET_LEN`] bytes.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, KeyError> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_LEN {
            return Err(KeyError::WeakKey {
                len: secret.len(),
                min: MIN_SECRET_LEN,
            });
        }

        Ok(Self { secret })
    }

    /// Generates a new random signing key of the minimum acceptable length
    ///
    /// # Errors
    ///
    /// Returns an error if the system source of randomness fails.
    pub fn generate() -> Result<Self, KeyError> {
        Self::generate_with_rng(&ring::rand::SystemRandom::new())
    }

    /// Generates a new signing key using the provided source of randomness
    ///
    /// # Errors
    ///
    /// Returns an error if the provided source of randomness fails.
    pub fn generate_with_rng(rng: &dyn SecureRandom) -> Result<Self, KeyError> {
        let mut secret = vec![0; MIN_SECRET_LEN];

        rng.fill(&mut secret)
            .map_err(|_| KeyError::GenerationFailure)?;

        Ok(Self { secret })
    }

    /// Signs the data, producing an HMAC-SHA-256 tag
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        let key = ring::hmac::Key::new(ring::hmac::HMAC_SHA256, &self.secret);
        let digest = ring::hmac::sign(&key, data);
        digest.as_ref().to_owned()
    }

    /// Verifies the data against the signature
    ///
    /// The comparison is constant-time.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::SignatureMismatch`] if the signature does not
    /// match the data under this key.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<(), VerifyError> {
        let key = ring::hmac::Key::new(ring::hmac::HMAC_SHA256, &self.secret);
        ring::hmac::verify(&key, data, signature).map_err(|_| VerifyError::SignatureMismatch)
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;

    #[test]
    fn rejects_short_secret() {
        let err = SigningKey::new(&b"too short"[..]).unwrap_err();
        assert!(matches!(
            err,
            KeyError::WeakKey {
                len: 9,
                min: MIN_SECRET_LEN
            }
        ));
    }

    #[test]
    fn accepts_minimum_length_secret() -> Result<()> {
        let _ = SigningKey::new(vec![0xA5; MIN_SECRET_LEN])?;
        Ok(())
    }

    #[test]
    fn sign_then_verify_round_trips() -> Result<()> {
        let key = SigningKey::generate()?;
        let tag = key.sign(b"some message");
        key.verify(b"some message", &tag)?;
        Ok(())
    }

    #[test]
    fn verify_rejects_altered_data() -> Result<()> {
        let key = SigningKey::generate()?;
        let tag = key.sign(b"some message");
        let err = key.verify(b"some other message", &tag).unwrap_err();
        assert!(err.is_signature_mismatch());
        Ok(())
    }

    #[test]
    fn verify_rejects_foreign_key() -> Result<()> {
        let signer = SigningKey::generate()?;
        let verifier = SigningKey::generate()?;
        let tag = signer.sign(b"some message");
        let err = verifier.verify(b"some message", &tag).unwrap_err();
        assert!(err.is_signature_mismatch());
        Ok(())
    }

    #[test]
    fn debug_never_reveals_the_secret() -> Result<()> {
        let key = SigningKey::new(vec![0x42; MIN_SECRET_LEN])?;
        let rendered = format!("{:?}", key);
        assert_eq!(rendered, "SigningKey { secret }");
        Ok(())
    }
}
