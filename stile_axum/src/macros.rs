//! Types used to assert that a presented token is authorized to access
//! protected endpoints

/// Constructs an extractor that asserts a verified token holds the
/// expected privileges.
///
/// For a more concise way to construct several guards, see
/// [`grant_guards!`][crate::grant_guards!].
///
/// In the simplest case, a single claim name is required:
///
/// ```
/// use stile_axum::grant_guard;
///
/// grant_guard!(Admin; "can_delete");
/// ```
///
/// When several privileges must all be present, they are combined into a
/// single space-separated string:
///
/// ```
/// use stile_axum::grant_guard;
///
/// grant_guard!(ViewerAndAdmin; "can_view can_delete");
/// ```
///
/// A guard that admits any verified holder, regardless of its grants, is
/// written with `*`:
///
/// ```
/// use stile_axum::grant_guard;
///
/// grant_guard!(Authenticated; *);
/// ```
///
/// These guards can then be used on an axum handler endpoint to assert
/// that the presented token was verified by the token layer _and_ that it
/// carries the necessary privileges.
///
/// ```no_run
/// use std::net::SocketAddr;
///
/// use axum::{routing::get, Router};
/// use stile_axum::grant_guard;
///
/// grant_guard!(Admin; "can_delete");
///
/// async fn test_endpoint(_: Admin) -> &'static str {
///     "You're an admin!"
/// }
///
/// # #[tokio::main(flavor = "current_thread")] async fn main() {
/// let router = Router::new()
///     .route("/test", get(test_endpoint));
///
/// let listener = tokio::net::TcpListener::bind(&SocketAddr::new([0, 0, 0, 0].into(), 3000))
///     .await
///     .unwrap();
/// axum::serve(listener, router)
///     .await
///     .unwrap();
/// # }
/// ```
#[macro_export]
macro_rules! grant_guard {
    ($vis:vis $i:ident; *) => {
        /// A guard that admits any verified token, extracting and returning
        /// its claims
        ///
        /// The claims are cloned out of the request extensions, so guards may
        /// be stacked on a single route and each evaluates the same set.
        $vis struct $i($vis $crate::__private::TokenClaims);

        impl $i {
            #[allow(dead_code)]
            $vis fn into_claims(self) -> $crate::__private::TokenClaims {
                self.0
            }

            #[allow(dead_code)]
            $vis fn claims(&self) -> &$crate::__private::TokenClaims {
                &self.0
            }
        }

        impl $crate::EndpointGrantPolicy for $i {
            fn grant_policy() -> &'static $crate::__private::GrantPolicy {
                static POLICY: $crate::__private::OnceCell<$crate::__private::GrantPolicy> =
                    $crate::__private::OnceCell::new();
                POLICY.get_or_init($crate::__private::GrantPolicy::authenticated)
            }
        }

        #[::axum::async_trait]
        impl<S> ::axum::extract::FromRequestParts<S> for $i
        where
            S: Sync,
        {
            type Rejection = $crate::AuthFailed;

            async fn from_request_parts(
                req: &mut ::axum::http::request::Parts,
                _state: &S,
            ) -> Result<Self, Self::Rejection> {
                $crate::__private::from_request(req, <Self as $crate::EndpointGrantPolicy>::grant_policy()).map(Self)
            }
        }
    };
    ($vis:vis $i:ident; $grants:literal) => {
        /// Ensures that a verified token authorizes access to this endpoint
        ///
        /// The claims are cloned out of the request extensions, so guards may
        /// be stacked on a single route and each evaluates the same set.
        ///
        /// All of the following privileges must be held:
        #[doc = concat!("* `", $grants, "`")]
        $vis struct $i($vis $crate::__private::TokenClaims);

        impl $i {
            #[allow(dead_code)]
            $vis fn into_claims(self) -> $crate::__private::TokenClaims {
                self.0
            }

            #[allow(dead_code)]
            $vis fn claims(&self) -> &$crate::__private::TokenClaims {
                &self.0
            }
        }

        impl $crate::EndpointGrantPolicy for $i {
            fn grant_policy() -> &'static $crate::__private::GrantPolicy {
                static POLICY: $crate::__private::OnceCell<$crate::__private::GrantPolicy> =
                    $crate::__private::OnceCell::new();
                POLICY.get_or_init(|| {
                    $crate::__private::GrantPolicy::require_all_from_static($grants)
                })
            }
        }

        #[::axum::async_trait]
        impl<S> ::axum::extract::FromRequestParts<S> for $i
        where
            S: Sync,
        {
            type Rejection = $crate::AuthFailed;

            async fn from_request_parts(
                req: &mut ::axum::http::request::Parts,
                _state: &S,
            ) -> Result<Self, Self::Rejection> {
                $crate::__private::from_request(req, <Self as $crate::EndpointGrantPolicy>::grant_policy()).map(Self)
            }
        }
    };
}

/// Convenience macro for services that need to define many guards.
///
/// # Example
///
/// ```
/// use stile_axum::grant_guards;
///
/// grant_guards! {
///     guard Admin = "can_delete";
///     guard Viewer = "can_view";
///     guard ViewerAndAdmin = "can_view can_delete";
///     guard Authenticated = *;
/// }
/// ```
///
/// The above will define a guard type for each entry, similar to the
/// [`grant_guard!`] macro.
#[macro_export]
macro_rules! grant_guards {
    ($($vis:vis guard $i:ident = $grants:tt);* $(;)?) => {
        $(
            $crate::grant_guard!($vis $i; $grants);
        )*
    };
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::FromRequestParts,
        http::{request::Parts, Request},
    };
    use stile::{clock::UnixTime, privileges, Audience, Issuer, PrivilegeSet, TokenClaims};

    use crate::AuthFailed;

    grant_guard!(Admin; "can_delete");

    grant_guards! {
        guard Viewer = "can_view";
        guard ViewerAndAdmin = "can_view can_delete";
        guard Authenticated = *;
    }

    fn request_with_no_claims() -> Parts {
        Request::new(()).into_parts().0
    }

    fn request_with_grants(grants: PrivilegeSet) -> Parts {
        let claims = TokenClaims::new(
            Issuer::from_static("authority"),
            Audience::from_static("my_api"),
            UnixTime(1_700_000_000),
        )
        .with_grants(grants);

        let mut parts = Request::new(()).into_parts().0;
        parts.extensions.insert(claims);
        parts
    }

    #[tokio::test]
    async fn admin_guard_without_claims_is_a_server_error() {
        match Admin::from_request_parts(&mut request_with_no_claims(), &()).await {
            Err(AuthFailed::MissingClaims) => {}
            Err(AuthFailed::InsufficientGrants) => panic!("Expected missing claims error"),
            Ok(_) => panic!("Expected AuthFailed"),
        }
    }

    #[tokio::test]
    async fn admin_guard_with_delete_grant() {
        Admin::from_request_parts(&mut request_with_grants(privileges![CanDelete]), &())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn admin_guard_with_view_grant_only() {
        match Admin::from_request_parts(&mut request_with_grants(privileges![CanView]), &()).await {
            Err(AuthFailed::InsufficientGrants) => {}
            Err(AuthFailed::MissingClaims) => panic!("Expected insufficient grants error"),
            Ok(_) => panic!("Expected AuthFailed"),
        }
    }

    #[tokio::test]
    async fn viewer_guard_with_view_grant() {
        Viewer::from_request_parts(&mut request_with_grants(privileges![CanView]), &())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn viewer_guard_with_no_grants() {
        match Viewer::from_request_parts(&mut request_with_grants(privileges![]), &()).await {
            Err(AuthFailed::InsufficientGrants) => {}
            Err(AuthFailed::MissingClaims) => panic!("Expected insufficient grants error"),
            Ok(_) => panic!("Expected AuthFailed"),
        }
    }

    #[tokio::test]
    async fn conjunctive_guard_requires_both_grants() {
        match ViewerAndAdmin::from_request_parts(
            &mut request_with_grants(privileges![CanView]),
            &(),
        )
        .await
        {
            Err(AuthFailed::InsufficientGrants) => {}
            Err(AuthFailed::MissingClaims) => panic!("Expected insufficient grants error"),
            Ok(_) => panic!("Expected AuthFailed"),
        }

        ViewerAndAdmin::from_request_parts(
            &mut request_with_grants(privileges![CanView, CanDelete]),
            &(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn authenticated_guard_admits_any_verified_claims() {
        let guard = Authenticated::from_request_parts(&mut request_with_grants(privileges![]), &())
            .await
            .unwrap();
        assert!(guard.claims().grants().is_empty());
    }

    #[tokio::test]
    async fn stacked_guards_each_see_the_same_claims() {
        let mut parts = request_with_grants(privileges![CanView, CanDelete]);

        Viewer::from_request_parts(&mut parts, &())
            .await
            .expect("first guard should pass");
        let guard = Admin::from_request_parts(&mut parts, &())
            .await
            .expect("second guard should still find the claims");
        assert!(guard.claims().grants().contains_all(&privileges![CanView, CanDelete]));
    }

    #[tokio::test]
    async fn authenticated_guard_still_requires_claims() {
        match Authenticated::from_request_parts(&mut request_with_no_claims(), &()).await {
            Err(AuthFailed::MissingClaims) => {}
            _ => panic!("Expected missing claims error"),
        }
    }
}
