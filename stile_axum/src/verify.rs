use std::fmt;

use http::{Request, Response};
use http_body::Body;
use stile::{error::VerifyError, Token, TokenVerifier};
use tower_http::validate_request::ValidateRequest;

use crate::{util::unauthorized, TerseErrorHandler, VerboseErrorHandler};

pub(crate) struct VerifyToken<OnError> {
    verifier: TokenVerifier,
    on_error: OnError,
}

impl<OnError> Clone for VerifyToken<OnError>
where
    OnError: Clone,
{
    #[inline]
    fn clone(&self) -> Self {
        Self {
            verifier: self.verifier.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<OnError> fmt::Debug for VerifyToken<OnError>
where
    OnError: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("VerifyToken")
            .field("verifier", &self.verifier)
            .field("on_error", &self.on_error)
            .finish()
    }
}

impl<OnError> VerifyToken<OnError> {
    #[inline]
    pub(crate) fn new(verifier: TokenVerifier, on_error: OnError) -> Self {
        Self { verifier, on_error }
    }
}

impl<OnError, ReqBody> ValidateRequest<ReqBody> for VerifyToken<OnError>
where
    OnError: OnTokenError,
    OnError::Body: Body + Default,
{
    type ResponseBody = OnError::Body;

    fn validate(
        &mut self,
        request: &mut Request<ReqBody>,
    ) -> Result<(), Response<Self::ResponseBody>> {
        let token = if let Some(token) = request.extensions().get::<Token>() {
            tracing::trace!("found cached token");
            token
        } else {
            tracing::trace!("extracting token from headers");
            let token = request
                .headers()
                .get(http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(extract_token)
                .ok_or_else(|| self.on_error.on_missing_or_malformed())?;

            let _ = request.extensions_mut().insert(token);
            request
                .extensions()
                .get::<Token>()
                .expect("token was just inserted")
        };

        let claims = self
            .verifier
            .verify(token)
            .map_err(|err| self.on_error.on_token_invalid(err))?;

        let _ = request.extensions_mut().insert(claims);

        tracing::trace!("token was valid");

        Ok(())
    }
}

/// Handler for responding to failures while verifying a token
pub trait OnTokenError {
    /// The body type returned on an error
    type Body;

    /// Response when the token was not found or was otherwise unreadable
    fn on_missing_or_malformed(&self) -> Response<Self::Body>;

    /// Response when the token was rejected by the verifier as invalid
    fn on_token_invalid(&self, error: VerifyError) -> Response<Self::Body>;
}

macro_rules! delegate_impls {
    ($($ty:ty)*) => {
        $(
            impl<T> OnTokenError for $ty
            where
                T: OnTokenError,
            {
                type Body = T::Body;

                fn on_missing_or_malformed(&self) -> Response<Self::Body> {
                    T::on_missing_or_malformed(self)
                }

                fn on_token_invalid(&self, error: VerifyError) -> Response<Self::Body> {
                    T::on_token_invalid(self, error)
                }
            }
        )*
    }
}

delegate_impls!(
    &'_ T
    Box<T>
    std::rc::Rc<T>
    std::sync::Arc<T>
);

impl<ResBody> OnTokenError for TerseErrorHandler<ResBody>
where
    ResBody: Default,
{
    type Body = ResBody;

    #[inline]
    fn on_missing_or_malformed(&self) -> Response<Self::Body> {
        tracing::debug!("token validation failed: authorization token is missing or malformed");
        unauthorized("")
    }

    #[inline]
    fn on_token_invalid(&self, _: VerifyError) -> Response<Self::Body> {
        tracing::debug!("token validation failed");
        unauthorized("")
    }
}

impl<ResBody> OnTokenError for VerboseErrorHandler<ResBody>
where
    ResBody: Default,
{
    type Body = ResBody;

    #[inline]
    fn on_missing_or_malformed(&self) -> Response<Self::Body> {
        let message = "authorization token is missing or malformed";
        tracing::debug!("token validation failed: {message}");
        unauthorized(message)
    }

    #[inline]
    fn on_token_invalid(&self, error: VerifyError) -> Response<Self::Body> {
        use std::fmt::Write;

        let mut description = String::new();
        let mut err: &dyn std::error::Error = &error;
        write!(&mut description, "{err}").expect("writes to strings never fail");
        while let Some(next) = err.source() {
            write!(&mut description, ": {next}").expect("writes to strings never fail");
            err = next;
        }
        tracing::debug!("token validation failed: {description}");
        unauthorized(&description)
    }
}

fn extract_token(auth: &str) -> Option<Token> {
    if auth.len() <= 7 || !auth[..7].eq_ignore_ascii_case("bearer ") {
        return None;
    }

    Some(Token::from(auth[7..].trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert!(extract_token("Bearer a.b.c").is_some());
        assert!(extract_token("bEaReR a.b.c").is_some());
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let token = extract_token("Bearer   a.b.c  ").unwrap();
        assert_eq!(token.as_str(), "a.b.c");
    }

    #[test]
    fn other_schemes_are_not_tokens() {
        assert!(extract_token("Basic dXNlcjpwYXNz").is_none());
        assert!(extract_token("Bearer").is_none());
        assert!(extract_token("").is_none());
    }
}
