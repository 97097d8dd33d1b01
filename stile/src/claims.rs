//! The claim vocabulary carried by issued tokens
//!
//! On the wire, a claim is a stringly `"<name>": "true"` flag in the token
//! payload, preserved for compatibility with the system this one replaces.
//! In process, claims only ever appear behind the typed [`Privilege`] and
//! [`PrivilegeSet`] abstractions so policy logic never compares raw
//! strings.

use std::{collections::BTreeMap, fmt, str::FromStr};

use ahash::AHashSet;
use aliri_braid::braid;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::UnixTime;

/// An issuer of signed tokens
#[braid(serde, ref_doc = "A borrowed reference to an [`Issuer`]")]
pub struct Issuer;

/// The audience a signed token is intended for
#[braid(serde, ref_doc = "A borrowed reference to an [`Audience`]")]
pub struct Audience;

/// The provided name is not part of the claim vocabulary
#[derive(Debug, Error)]
#[error("'{name}' is not a recognized privilege")]
pub struct UnknownPrivilege {
    name: String,
}

/// A privilege that can be asserted about an identity
///
/// The vocabulary is fixed. Tokens may carry claim names outside of it,
/// but such claims confer no recognized access and are dropped when the
/// typed set is built.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Privilege {
    /// Permission to read items (`can_view`)
    CanView,

    /// Permission to remove items (`can_delete`)
    CanDelete,
}

impl Privilege {
    /// The wire name of the privilege's claim
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CanView => "can_view",
            Self::CanDelete => "can_delete",
        }
    }
}

impl FromStr for Privilege {
    type Err = UnknownPrivilege;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "can_view" => Ok(Self::CanView),
            "can_delete" => Ok(Self::CanDelete),
            _ => Err(UnknownPrivilege { name: s.to_owned() }),
        }
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of privileges asserted about one identity
///
/// Serializes as the flattened stringly claim flags the wire format
/// requires, in sorted name order so two identical sets always produce
/// identical bytes. Deserialization keeps exactly the entries whose value
/// is the string `"true"` and whose name is in the vocabulary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct PrivilegeSet(AHashSet<Privilege>);

impl PrivilegeSet {
    /// Produces an empty privilege set
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self(AHashSet::new())
    }

    /// Constructs a set holding a single privilege
    #[inline]
    #[must_use]
    pub fn single(privilege: Privilege) -> Self {
        let mut set = Self::empty();
        set.insert(privilege);
        set
    }

    /// Adds a privilege to the set
    #[inline]
    pub fn insert(&mut self, privilege: Privilege) {
        self.0.insert(privilege);
    }

    /// Adds a privilege, returning the updated set
    #[inline]
    #[must_use]
    pub fn and(mut self, privilege: Privilege) -> Self {
        self.insert(privilege);
        self
    }

    /// Whether the set holds the given privilege
    #[inline]
    #[must_use]
    pub fn contains(&self, privilege: Privilege) -> bool {
        self.0.contains(&privilege)
    }

    /// Whether the set holds every privilege in `required`
    #[inline]
    #[must_use]
    pub fn contains_all(&self, required: &PrivilegeSet) -> bool {
        self.0.is_superset(&required.0)
    }

    /// Whether the set is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the privileges in the set
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = Privilege> + '_ {
        self.0.iter().copied()
    }
}

impl From<Privilege> for PrivilegeSet {
    #[inline]
    fn from(privilege: Privilege) -> Self {
        Self::single(privilege)
    }
}

impl FromIterator<Privilege> for PrivilegeSet {
    #[inline]
    fn from_iter<I: IntoIterator<Item = Privilege>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Privilege> for PrivilegeSet {
    #[inline]
    fn extend<I: IntoIterator<Item = Privilege>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

impl From<PrivilegeSet> for BTreeMap<String, String> {
    fn from(set: PrivilegeSet) -> Self {
        set.0
            .into_iter()
            .map(|p| (p.as_str().to_owned(), String::from("true")))
            .collect()
    }
}

impl From<BTreeMap<String, String>> for PrivilegeSet {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter()
            .filter(|(_, value)| value == "true")
            .filter_map(|(name, _)| name.parse().ok())
            .collect()
    }
}

/// Constructs a [`PrivilegeSet`] from a list of privilege variants
///
/// ```
/// use stile::{privileges, Privilege};
///
/// let grants = privileges![CanView, CanDelete];
/// assert!(grants.contains(Privilege::CanDelete));
///
/// let none = privileges![];
/// assert!(none.is_empty());
/// ```
#[macro_export]
macro_rules! privileges {
    () => {
        $crate::PrivilegeSet::empty()
    };
    ($($p:ident),+ $(,)?) => {
        <$crate::PrivilegeSet as ::std::iter::FromIterator<_>>::from_iter([
            $($crate::Privilege::$p),+
        ])
    };
}

/// The payload of an issued token
///
/// Field order is fixed and the flattened claim flags are sorted, so a
/// payload serializes to the same bytes every time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct TokenClaims {
    iss: Issuer,
    aud: Audience,
    exp: UnixTime,
    #[serde(flatten)]
    grants: PrivilegeSet,
}

impl TokenClaims {
    /// Constructs a payload with no granted privileges
    pub fn new(iss: Issuer, aud: Audience, exp: UnixTime) -> Self {
        Self {
            iss,
            aud,
            exp,
            grants: PrivilegeSet::empty(),
        }
    }

    /// Replaces the granted privileges
    pub fn with_grants(mut self, grants: PrivilegeSet) -> Self {
        self.grants = grants;
        self
    }

    /// The `iss` claim
    pub fn issuer(&self) -> &IssuerRef {
        &self.iss
    }

    /// The `aud` claim
    pub fn audience(&self) -> &AudienceRef {
        &self.aud
    }

    /// The `exp` claim
    #[must_use]
    pub fn expiry(&self) -> UnixTime {
        self.exp
    }

    /// The privileges granted by this payload
    #[must_use]
    pub fn grants(&self) -> &PrivilegeSet {
        &self.grants
    }

    /// Extracts the granted privileges from the payload
    #[must_use]
    pub fn into_grants(self) -> PrivilegeSet {
        self.grants
    }
}
