//! The static identity registry backing the login endpoint
//!
//! Credentials are compared as plaintext exact matches, preserved from the
//! system this one replaces. Do not register real secrets here; hashing is
//! deliberately out of scope.

use std::fmt;

use ahash::AHashMap;
use stile::PrivilegeSet;

/// A registered identity and the privileges it is granted on login
#[derive(Clone)]
pub struct Identity {
    username: String,
    password: String,
    grants: PrivilegeSet,
}

impl Identity {
    /// Constructs an identity
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        grants: PrivilegeSet,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            grants,
        }
    }

    /// The identity's login name
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The privileges granted to this identity
    #[must_use]
    pub fn grants(&self) -> &PrivilegeSet {
        &self.grants
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Identity")
            .field("username", &self.username)
            .field("password", &"***")
            .field("grants", &self.grants)
            .finish()
    }
}

/// An immutable registry of identities, built once at startup
#[derive(Clone, Debug, Default)]
pub struct CredentialStore {
    identities: AHashMap<String, Identity>,
}

impl CredentialStore {
    /// Constructs an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an identity, replacing any prior entry with the same username
    pub fn register(&mut self, identity: Identity) {
        self.identities
            .insert(identity.username.clone(), identity);
    }

    /// Whether the username and password name a registered identity
    ///
    /// Fails closed: empty usernames and empty passwords never match
    /// anything, even if such an identity were registered.
    #[must_use]
    pub fn is_valid(&self, username: &str, password: &str) -> bool {
        if username.is_empty() || password.is_empty() {
            return false;
        }

        self.identities
            .get(username)
            .is_some_and(|identity| identity.password == password)
    }

    /// The privileges granted to the named identity
    ///
    /// Unknown usernames hold no privileges.
    #[must_use]
    pub fn grants(&self, username: &str) -> PrivilegeSet {
        self.identities
            .get(username)
            .map(|identity| identity.grants.clone())
            .unwrap_or_default()
    }
}
