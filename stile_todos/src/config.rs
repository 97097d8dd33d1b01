//! Environment-driven service configuration
//!
//! Configuration is loaded once in `main` and passed down by reference.
//! Nothing reads the environment after startup, and a bad signing key
//! aborts the process before the listener ever binds.

use std::{env, net::SocketAddr, time::Duration};

use stile::{error::KeyError, Audience, Issuer, SigningKey, TokenIssuer, TokenVerifier};
use thiserror::Error;

/// Required environment variable holding the shared signing secret
pub const SIGNING_KEY_VAR: &str = "TODOS_SIGNING_KEY";

/// Optional override for the `iss` claim stamped into tokens
pub const ISSUER_VAR: &str = "TODOS_ISSUER";

/// Optional override for the `aud` claim stamped into tokens
pub const AUDIENCE_VAR: &str = "TODOS_AUDIENCE";

/// Optional override for the token lifetime, in seconds
pub const TOKEN_LIFETIME_VAR: &str = "TODOS_TOKEN_LIFETIME_SECS";

/// Optional override for the socket address to listen on
pub const LISTEN_VAR: &str = "TODOS_LISTEN";

const DEFAULT_ISSUER: &str = "stile-todos";
const DEFAULT_AUDIENCE: &str = "stile-todos-api";

/// The service could not be configured from the environment
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No signing secret was provided
    #[error("TODOS_SIGNING_KEY is not set")]
    MissingSigningKey,

    /// The signing secret was rejected by the key constructor
    #[error("TODOS_SIGNING_KEY is unusable")]
    UnusableSigningKey(#[source] KeyError),

    /// A variable was present but could not be parsed
    #[error("{0} could not be parsed")]
    InvalidValue(
        &'static str,
        #[source] Box<dyn std::error::Error + Send + Sync + 'static>,
    ),
}

/// Everything the auth subsystem needs: one key, issuer, and audience triple
///
/// The issuer and verifier constructed here share the same key, so any
/// token the service hands out is accepted back until it expires.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    key: SigningKey,
    issuer: Issuer,
    audience: Audience,
    token_lifetime: Duration,
}

impl AuthConfig {
    /// Constructs an auth configuration with the default token lifetime
    pub fn new(key: SigningKey, issuer: Issuer, audience: Audience) -> Self {
        Self {
            key,
            issuer,
            audience,
            token_lifetime: TokenIssuer::DEFAULT_LIFETIME,
        }
    }

    /// Overrides the lifetime granted to issued tokens
    #[must_use]
    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    /// The token issuer for the login endpoint
    pub fn issuer(&self) -> TokenIssuer {
        TokenIssuer::new(
            self.key.clone(),
            self.issuer.clone(),
            self.audience.clone(),
        )
        .with_lifetime(self.token_lifetime)
    }

    /// The token verifier for the request gate
    ///
    /// A five second leeway absorbs clock skew between the issuing and
    /// verifying hosts when the service runs as multiple replicas.
    pub fn verifier(&self) -> TokenVerifier {
        TokenVerifier::new(
            self.key.clone(),
            self.issuer.clone(),
            self.audience.clone(),
        )
        .with_leeway_secs(5)
    }
}

/// Full service configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// The socket address to listen on
    pub listen: SocketAddr,

    /// The auth subsystem configuration
    pub auth: AuthConfig,
}

impl Config {
    /// Loads the configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the signing key is missing or weak, or if any
    /// provided value cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let key = match env::var(SIGNING_KEY_VAR) {
            Ok(secret) => SigningKey::new(secret).map_err(ConfigError::UnusableSigningKey)?,
            Err(env::VarError::NotPresent) => return Err(ConfigError::MissingSigningKey),
            Err(err) => return Err(ConfigError::InvalidValue(SIGNING_KEY_VAR, err.into())),
        };

        let issuer = env::var(ISSUER_VAR)
            .map(Issuer::from)
            .unwrap_or_else(|_| Issuer::from_static(DEFAULT_ISSUER));

        let audience = env::var(AUDIENCE_VAR)
            .map(Audience::from)
            .unwrap_or_else(|_| Audience::from_static(DEFAULT_AUDIENCE));

        let token_lifetime = match env::var(TOKEN_LIFETIME_VAR) {
            Ok(value) => {
                let secs = value
                    .parse::<u64>()
                    .map_err(|err| ConfigError::InvalidValue(TOKEN_LIFETIME_VAR, err.into()))?;
                Duration::from_secs(secs)
            }
            Err(_) => TokenIssuer::DEFAULT_LIFETIME,
        };

        let listen = match env::var(LISTEN_VAR) {
            Ok(value) => value
                .parse()
                .map_err(|err: std::net::AddrParseError| {
                    ConfigError::InvalidValue(LISTEN_VAR, err.into())
                })?,
            Err(_) => SocketAddr::from(([127, 0, 0, 1], 8080)),
        };

        Ok(Self {
            listen,
            auth: AuthConfig::new(key, issuer, audience).with_token_lifetime(token_lifetime),
        })
    }
}
