//! Route table and navigation guard.
//!
//! Every page transition is decided here before it happens: the guard is
//! a pure function of the requested route and the current session, and
//! answers either Allow or a redirect. Authorization is never an error,
//! only a different destination.

use crate::auth::Session;

/// Pages of the client. The camera page is the default landing page for
/// an authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    ChangePassword,
    Camera,
    Validation,
    Confirmation,
    AdminUsers,
}

/// Access policy declared per page; static and immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    Public,
    Authenticated,
    AdminOnly,
}

impl Route {
    pub fn policy(&self) -> AccessPolicy {
        match self {
            Route::Login => AccessPolicy::Public,
            Route::AdminUsers => AccessPolicy::AdminOnly,
            Route::ChangePassword | Route::Camera | Route::Validation | Route::Confirmation => {
                AccessPolicy::Authenticated
            }
        }
    }

    /// Get the display title for this page.
    pub fn title(&self) -> &'static str {
        match self {
            Route::Login => "Sign in",
            Route::ChangePassword => "Change password",
            Route::Camera => "Camera",
            Route::Validation => "Validation",
            Route::Confirmation => "Confirmation",
            Route::AdminUsers => "User accounts",
        }
    }
}

/// Outcome of a guard evaluation. `forbidden` marks the redirect that
/// carries the access-refused notice for the landing page to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect { to: Route, forbidden: bool },
}

impl RouteDecision {
    fn redirect(to: Route) -> Self {
        RouteDecision::Redirect {
            to,
            forbidden: false,
        }
    }
}

/// Decide a navigation request.
///
/// The checks run in a fixed order and the first match wins:
/// 1. Public route: an authenticated session asking for the login page
///    is sent to its account state (change-password if forced, else the
///    camera landing page); everyone else passes.
/// 2. No session: to the login page.
/// 3. Admin-only route without the admin role: to the landing page,
///    flagged so it shows the access-refused notice.
/// 4. Forced password change anywhere but the change-password page: to
///    the change-password page.
/// 5. Pass.
///
/// Reordering these checks changes observable behavior (e.g. an admin
/// with a forced password change must still land on change-password).
pub fn guard(to: Route, session: &Session) -> RouteDecision {
    if to.policy() == AccessPolicy::Public {
        if session.is_authenticated() && to == Route::Login {
            if session.force_password_change() {
                return RouteDecision::redirect(Route::ChangePassword);
            }
            return RouteDecision::redirect(Route::Camera);
        }
        return RouteDecision::Allow;
    }

    if !session.is_authenticated() {
        return RouteDecision::redirect(Route::Login);
    }

    if to.policy() == AccessPolicy::AdminOnly && !session.is_admin() {
        return RouteDecision::Redirect {
            to: Route::Camera,
            forbidden: true,
        };
    }

    if session.force_password_change() && to != Route::ChangePassword {
        return RouteDecision::redirect(Route::ChangePassword);
    }

    RouteDecision::Allow
}
