//! Axum and tower middleware for enforcing `stile` token policies
//!
//! Authentication and authorization are split across two layers, so each
//! failure surfaces with the right status code:
//!
//! * [`TokenAuthorizer`] produces a router-wide layer that extracts the
//!   bearer token, verifies it, and rejects the request with `401` when it
//!   is missing or invalid. Verified [`TokenClaims`][stile::TokenClaims]
//!   are stored in the request extensions.
//! * [`grant_guard!`] and [`grant_guards!`] define extractors that pull
//!   those claims back out inside a handler and evaluate a
//!   [`GrantPolicy`][stile::GrantPolicy] against them, rejecting with
//!   `403` when the holder lacks a required privilege.
//!
//! # Full Example
//!
//! ```no_run
//! use std::net::SocketAddr;
//!
//! use axum::{
//!     extract::Path,
//!     routing::{delete, get},
//!     Router,
//! };
//! use stile::{Audience, Issuer, SigningKey, TokenVerifier};
//! use stile_axum::TokenAuthorizer;
//!
//! mod guards {
//!     stile_axum::grant_guards! {
//!         pub guard Admin = "can_delete";
//!         pub guard Viewer = "can_view";
//!         pub guard Authenticated = *;
//!     }
//! }
//!
//! async fn list_items(_: guards::Viewer) -> &'static str {
//!     "[]"
//! }
//!
//! async fn delete_item(Path(id): Path<u64>, _: guards::Admin) -> String {
//!     format!("deleted {id}")
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let key = SigningKey::new(*b"an example shared secret 32Bytes")?;
//!     let verifier = TokenVerifier::new(
//!         key,
//!         Issuer::from_static("authority"),
//!         Audience::from_static("my_api"),
//!     );
//!
//!     let authorizer = TokenAuthorizer::new().with_terse_error_handler();
//!     // For verbose error handling, use `with_verbose_error_handler()`
//!     // or your own custom handler.
//!
//!     let router = Router::new()
//!         .route("/items", get(list_items))
//!         .route("/items/:id", delete(delete_item))
//!         .layer(authorizer.token_layer(verifier));
//!
//!     let listener = tokio::net::TcpListener::bind(&SocketAddr::new([0, 0, 0, 0].into(), 3000))
//!         .await?;
//!     axum::serve(listener, router).await?;
//!
//!     Ok(())
//! }
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

use std::{fmt, marker::PhantomData};

use axum_core::response::{IntoResponse, Response};
use http::StatusCode;
use stile::GrantPolicy;
use thiserror::Error;

mod authorizer;
mod macros;
pub mod util;
mod verify;

pub use authorizer::TokenAuthorizer;
pub use verify::OnTokenError;

/// Defines the grant policy enforced by an endpoint guard
pub trait EndpointGrantPolicy {
    /// The policy evaluated when this type is used as an endpoint guard
    fn grant_policy() -> &'static GrantPolicy;
}

/// An error indicating that the request could not be authorized
#[derive(Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AuthFailed {
    /// The server is missing the token claims expected to verify the request
    ///
    /// A guard was reached without the token layer having stored verified
    /// claims first, which is a routing mistake rather than a client error.
    #[error("token claims missing")]
    MissingClaims,

    /// The claims included in the token did not satisfy the grant policy
    #[error("insufficient privileges")]
    InsufficientGrants,
}

impl IntoResponse for AuthFailed {
    fn into_response(self) -> Response {
        match self {
            AuthFailed::MissingClaims => {
                (StatusCode::INTERNAL_SERVER_ERROR, "token claims missing").into_response()
            }
            AuthFailed::InsufficientGrants => {
                (StatusCode::FORBIDDEN, "insufficient privileges").into_response()
            }
        }
    }
}

/// Terse responders for token verification failures
///
/// Responses generated by this handler carry the relevant status code and
/// a `www-authenticate` header, but no description of what went wrong.
pub struct TerseErrorHandler<ResBody> {
    _ty: PhantomData<fn() -> ResBody>,
}

impl<ResBody> TerseErrorHandler<ResBody> {
    /// Instantiates a new instance over a given body type
    #[inline]
    pub fn new() -> Self {
        Self { _ty: PhantomData }
    }
}

/// Verbose responders for token verification failures
///
/// Responses generated by this handler describe the failure in the
/// `www-authenticate` header. Intended for development use; the
/// description tells a caller why its token was rejected.
pub struct VerboseErrorHandler<ResBody> {
    _ty: PhantomData<fn() -> ResBody>,
}

impl<ResBody> VerboseErrorHandler<ResBody> {
    /// Instantiates a new instance over a given body type
    #[inline]
    pub fn new() -> Self {
        Self { _ty: PhantomData }
    }
}

macro_rules! handler_impls {
    ($($ty:ident)*) => {
        $(
            impl<ResBody> fmt::Debug for $ty<ResBody> {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    f.write_str(stringify!($ty))
                }
            }

            impl<ResBody> Default for $ty<ResBody> {
                #[inline]
                fn default() -> Self {
                    Self { _ty: PhantomData }
                }
            }

            impl<ResBody> Clone for $ty<ResBody> {
                #[inline]
                fn clone(&self) -> Self {
                    Self { _ty: PhantomData }
                }
            }

            impl<ResBody> Copy for $ty<ResBody> {}
        )*
    }
}

handler_impls!(TerseErrorHandler VerboseErrorHandler);

#[doc(hidden)]
pub mod __private {
    use http::request::Parts;
    pub use once_cell::sync::OnceCell;
    use stile::Policy;
    pub use stile::{GrantPolicy, TokenClaims};

    use crate::AuthFailed;

    pub fn from_request(
        req: &mut Parts,
        policy: &'static GrantPolicy,
    ) -> Result<TokenClaims, AuthFailed> {
        // Claims stay in the extensions so several guards on one route can
        // each evaluate against the same set.
        let claims = req
            .extensions
            .get::<TokenClaims>()
            .cloned()
            .ok_or(AuthFailed::MissingClaims)?;

        policy
            .evaluate(claims.grants())
            .map_err(|_| AuthFailed::InsufficientGrants)?;

        Ok(claims)
    }
}
