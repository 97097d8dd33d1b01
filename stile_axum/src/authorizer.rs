use std::fmt;

use http_body::Body;
use stile::TokenVerifier;
use tower_http::validate_request::{ValidateRequest, ValidateRequestHeaderLayer};

use crate::{verify::VerifyToken, OnTokenError, TerseErrorHandler, VerboseErrorHandler};

/// Builder for generating layers that authenticate bearer tokens
///
/// The produced layer verifies the token on every request and stores the
/// verified [`TokenClaims`][stile::TokenClaims] in the request extensions,
/// where endpoint guards expect to find them.
pub struct TokenAuthorizer<OnError> {
    on_error: OnError,
}

impl<OnError> Clone for TokenAuthorizer<OnError>
where
    OnError: Clone,
{
    fn clone(&self) -> Self {
        Self {
            on_error: self.on_error.clone(),
        }
    }
}

impl<OnError> Copy for TokenAuthorizer<OnError> where OnError: Copy {}

impl<OnError> fmt::Debug for TokenAuthorizer<OnError>
where
    OnError: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TokenAuthorizer")
            .field("on_error", &self.on_error)
            .finish()
    }
}

impl TokenAuthorizer<()> {
    /// Constructs a new authorizer without an error handler
    #[inline]
    pub fn new() -> TokenAuthorizer<()> {
        Self { on_error: () }
    }

    /// Attaches a custom error handler to generate responses
    /// in the event of a verification failure
    #[inline]
    pub fn with_error_handler<OnError>(self, on_error: OnError) -> TokenAuthorizer<OnError> {
        TokenAuthorizer { on_error }
    }

    /// Attaches the default terse error handler: [`TerseErrorHandler`]
    ///
    /// This error handler generates responses containing the relevant
    /// status code with an empty body
    #[inline]
    pub fn with_terse_error_handler<ResBody: Body + Default>(
        self,
    ) -> TokenAuthorizer<TerseErrorHandler<ResBody>> {
        TokenAuthorizer {
            on_error: TerseErrorHandler::new(),
        }
    }

    /// Attaches the default verbose error handler: [`VerboseErrorHandler`]
    ///
    /// This error handler generates responses that name the verification
    /// failure in the `www-authenticate` header
    #[inline]
    pub fn with_verbose_error_handler<ResBody: Body + Default>(
        self,
    ) -> TokenAuthorizer<VerboseErrorHandler<ResBody>> {
        TokenAuthorizer {
            on_error: VerboseErrorHandler::new(),
        }
    }
}

impl<OnError> TokenAuthorizer<OnError>
where
    OnError: OnTokenError + Clone,
    OnError::Body: Body + Default,
{
    /// Authorizer layer that verifies the validity of a bearer token
    ///
    /// The token will be parsed from the request `Authorization` header
    /// and checked against the given [`TokenVerifier`].
    ///
    /// The claims in the token payload will be made available through
    /// [`Request::extensions`][http::Request::extensions].
    pub fn token_layer<ReqBody>(
        &self,
        verifier: TokenVerifier,
    ) -> ValidateRequestHeaderLayer<
        impl ValidateRequest<ReqBody, ResponseBody = OnError::Body> + Clone,
    > {
        ValidateRequestHeaderLayer::custom(VerifyToken::new(verifier, self.on_error.clone()))
    }
}

impl Default for TokenAuthorizer<()> {
    fn default() -> Self {
        Self::new()
    }
}
