//! Signed-token authentication primitives over a single shared HMAC key.
//!
//! This crate implements the pieces a resource API needs to hand out and
//! check bearer credentials:
//!
//! * a [`SigningKey`] pinned to HMAC-SHA-256,
//! * a compact, three-part signed [`Token`] encoding,
//! * a typed claim vocabulary ([`Privilege`], [`PrivilegeSet`]) carried in
//!   the token payload as `"<name>": "true"` flags,
//! * a [`TokenIssuer`] and [`TokenVerifier`] pair sharing that key, and
//! * a [`GrantPolicy`] for deciding whether a verified claim set may reach
//!   a protected resource.
//!
//! # Example
//!
//! ```
//! use stile::{
//!     clock::{Clock, TestClock, UnixTime},
//!     privileges, Audience, GrantPolicy, Issuer, Policy, Privilege,
//!     SigningKey, TokenIssuer, TokenVerifier,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let key = SigningKey::new(*b"an example shared secret 32Bytes")?;
//!
//! let issuer = TokenIssuer::new(
//!     key.clone(),
//!     Issuer::from_static("authority"),
//!     Audience::from_static("my_api"),
//! );
//!
//! let clock = TestClock::new(UnixTime(1_700_000_000));
//! let token = issuer.issue(privileges![CanView], &clock)?;
//!
//! let verifier = TokenVerifier::new(
//!     key,
//!     Issuer::from_static("authority"),
//!     Audience::from_static("my_api"),
//! );
//!
//! let claims = verifier.verify_at(&token, &clock)?;
//! assert!(claims.grants().contains(Privilege::CanView));
//!
//! let policy = GrantPolicy::require(Privilege::CanDelete);
//! assert!(policy.evaluate(claims.grants()).is_err());
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

pub mod claims;
pub mod clock;
pub mod error;
pub mod hmac;
pub mod policy;
pub mod token;

#[doc(inline)]
pub use claims::{Audience, Issuer, Privilege, PrivilegeSet, TokenClaims};
#[doc(inline)]
pub use hmac::SigningKey;
#[doc(inline)]
pub use policy::{GrantPolicy, InsufficientPrivilege, Policy};
#[doc(inline)]
pub use token::{Token, TokenIssuer, TokenRef, TokenVerifier};
