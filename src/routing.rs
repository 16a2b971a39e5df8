//! Pure route authorization: no I/O, no side effects beyond the navigation
//! the caller performs with the returned decision. Re-evaluate on every
//! session-state change.

use crate::models::identity::{Identity, Role, SessionState};

pub const LOGIN_PATH: &str = "/login";
pub const STUDENT_PATH: &str = "/student";
pub const COMPANY_PATH: &str = "/company";
pub const ADMIN_PATH: &str = "/admin";

/// Access policy attached to a protected route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePolicy {
    pub allowed_roles: &'static [Role],
    pub allow_guest: bool,
}

impl RoutePolicy {
    pub const fn for_roles(allowed_roles: &'static [Role]) -> Self {
        Self {
            allowed_roles,
            allow_guest: false,
        }
    }

    pub const fn with_guest(mut self) -> Self {
        self.allow_guest = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Session resolution still pending; render a loading indicator.
    Loading,
    RedirectToLogin,
    /// Company account awaiting administrator approval; blocks the render.
    PendingApproval,
    /// Wrong role for this route; send to that role's own landing page.
    Redirect(&'static str),
    Render,
}

/// Decides what a route renders. First match wins; exactly one outcome per
/// input pair.
pub fn evaluate(state: &SessionState, policy: &RoutePolicy) -> GateDecision {
    if state.is_loading {
        return GateDecision::Loading;
    }
    let Some(identity) = state.identity.as_ref() else {
        return GateDecision::RedirectToLogin;
    };
    if state.is_guest && !policy.allow_guest {
        return GateDecision::RedirectToLogin;
    }
    if identity.is_pending_approval() {
        return GateDecision::PendingApproval;
    }
    if !policy.allowed_roles.contains(&identity.role) {
        return GateDecision::Redirect(landing_path(Some(identity)));
    }
    GateDecision::Render
}

/// Default landing destination for a resolved identity; used for the root
/// path, post-login redirects, and role-mismatch redirects.
pub fn landing_path(identity: Option<&Identity>) -> &'static str {
    match identity.map(|i| i.role) {
        Some(Role::Student) => STUDENT_PATH,
        Some(Role::Company) => COMPANY_PATH,
        Some(Role::Admin) => ADMIN_PATH,
        None => LOGIN_PATH,
    }
}
