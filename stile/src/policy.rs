//! Access policies evaluated against a verified claim set
//!
//! Policy evaluation only ever sees claims that have already survived
//! token verification. A denial here is an authorization failure, not an
//! authentication one, and callers are expected to surface it differently.

use std::sync::Arc;

use thiserror::Error;

use crate::claims::{Privilege, PrivilegeSet};

/// A policy deciding whether a request may proceed
pub trait Policy {
    /// The evidence the policy evaluates
    type Request;

    /// The error produced when the policy denies a request
    type Denial;

    /// Evaluates the policy against the given request
    ///
    /// # Errors
    ///
    /// Returns the denial if the request does not satisfy the policy.
    fn evaluate(&self, request: &Self::Request) -> Result<(), Self::Denial>;
}

impl<T> Policy for &'_ T
where
    T: Policy,
{
    type Request = T::Request;
    type Denial = T::Denial;

    #[inline]
    fn evaluate(&self, request: &Self::Request) -> Result<(), Self::Denial> {
        T::evaluate(&**self, request)
    }
}

impl<T> Policy for Box<T>
where
    T: Policy,
{
    type Request = T::Request;
    type Denial = T::Denial;

    #[inline]
    fn evaluate(&self, request: &Self::Request) -> Result<(), Self::Denial> {
        T::evaluate(&**self, request)
    }
}

impl<T> Policy for Arc<T>
where
    T: Policy,
{
    type Request = T::Request;
    type Denial = T::Denial;

    #[inline]
    fn evaluate(&self, request: &Self::Request) -> Result<(), Self::Denial> {
        T::evaluate(&**self, request)
    }
}

/// Indicates the requester held insufficient privileges to be granted
/// access to a controlled resource
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Error)]
#[error("insufficient privilege")]
pub struct InsufficientPrivilege;

/// An access policy over granted privileges
///
/// The policy is a conjunction: access is allowed only when the holder's
/// grants contain every required privilege. A policy requiring nothing
/// admits any verified holder, which is how "authenticated, but nothing
/// more" is expressed.
///
/// # Examples
///
/// ## Require being authenticated only
/// ```
/// use stile::{privileges, GrantPolicy, Policy};
///
/// let policy = GrantPolicy::authenticated();
/// assert!(policy.evaluate(&privileges![]).is_ok());
/// ```
///
/// ## Require a privilege
/// ```
/// use stile::{privileges, GrantPolicy, Policy, Privilege};
///
/// let policy = GrantPolicy::require(Privilege::CanDelete);
/// assert!(policy.evaluate(&privileges![CanView, CanDelete]).is_ok());
/// assert!(policy.evaluate(&privileges![CanView]).is_err());
/// ```
///
/// ## Require several privileges at once
/// ```
/// use stile::{privileges, GrantPolicy, Policy, Privilege};
///
/// let policy = GrantPolicy::require(Privilege::CanView)
///     .and_require(Privilege::CanDelete);
/// assert!(policy.evaluate(&privileges![CanView]).is_err());
/// assert!(policy.evaluate(&privileges![CanView, CanDelete]).is_ok());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct GrantPolicy {
    required: PrivilegeSet,
}

impl GrantPolicy {
    /// Constructs a policy satisfied by any verified holder
    #[inline]
    pub fn authenticated() -> Self {
        Self {
            required: PrivilegeSet::empty(),
        }
    }

    /// Constructs a policy requiring a single privilege
    #[inline]
    pub fn require(privilege: Privilege) -> Self {
        Self {
            required: PrivilegeSet::single(privilege),
        }
    }

    /// Constructs a policy requiring every privilege in the set
    #[inline]
    pub fn require_all(required: PrivilegeSet) -> Self {
        Self { required }
    }

    /// Adds a further required privilege
    #[inline]
    pub fn and_require(mut self, privilege: Privilege) -> Self {
        self.required.insert(privilege);
        self
    }

    /// Constructs a policy from whitespace-separated claim names
    ///
    /// # Panics
    ///
    /// This function will panic if any name is outside the privilege
    /// vocabulary. It is intended for policies written as literals in
    /// source code, where the panic surfaces at startup.
    pub fn require_all_from_static(privileges: &'static str) -> Self {
        privileges
            .split_whitespace()
            .map(|name| match name.parse::<Privilege>() {
                Ok(privilege) => privilege,
                Err(err) => panic!("{err}"),
            })
            .collect()
    }

    /// The privileges this policy requires
    #[must_use]
    pub fn required(&self) -> &PrivilegeSet {
        &self.required
    }
}

impl FromIterator<Privilege> for GrantPolicy {
    #[inline]
    fn from_iter<I: IntoIterator<Item = Privilege>>(iter: I) -> Self {
        Self {
            required: iter.into_iter().collect(),
        }
    }
}

impl From<Privilege> for GrantPolicy {
    #[inline]
    fn from(privilege: Privilege) -> Self {
        Self::require(privilege)
    }
}

impl Policy for GrantPolicy {
    type Request = PrivilegeSet;
    type Denial = InsufficientPrivilege;

    fn evaluate(&self, held: &Self::Request) -> Result<(), Self::Denial> {
        if held.contains_all(&self.required) {
            Ok(())
        } else {
            Err(InsufficientPrivilege)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::privileges;

    #[test]
    fn authenticated_policy_admits_an_empty_claim_set() {
        assert!(GrantPolicy::authenticated()
            .evaluate(&privileges![])
            .is_ok());
    }

    #[test]
    fn required_privilege_must_be_held() {
        let policy = GrantPolicy::require(Privilege::CanDelete);
        assert!(policy.evaluate(&privileges![CanDelete]).is_ok());
        assert_eq!(
            policy.evaluate(&privileges![CanView]),
            Err(InsufficientPrivilege)
        );
        assert!(policy.evaluate(&privileges![]).is_err());
    }

    #[test]
    fn conjunction_requires_every_privilege() {
        let policy = GrantPolicy::require(Privilege::CanView).and_require(Privilege::CanDelete);
        assert!(policy.evaluate(&privileges![CanView]).is_err());
        assert!(policy.evaluate(&privileges![CanDelete]).is_err());
        assert!(policy.evaluate(&privileges![CanView, CanDelete]).is_ok());
    }

    #[test]
    fn extra_privileges_do_not_hurt() {
        let policy = GrantPolicy::require(Privilege::CanView);
        assert!(policy.evaluate(&privileges![CanView, CanDelete]).is_ok());
    }

    #[test]
    fn static_names_build_the_same_policy() {
        assert_eq!(
            GrantPolicy::require_all_from_static("can_view can_delete"),
            GrantPolicy::require(Privilege::CanView).and_require(Privilege::CanDelete)
        );
    }

    #[test]
    #[should_panic(expected = "not a recognized privilege")]
    fn static_names_outside_the_vocabulary_panic() {
        let _ = GrantPolicy::require_all_from_static("can_fly");
    }
}
