//! Declarative route authorization.
//!
//! Every administrative route is listed here with the roles allowed to call it.
//! Routes that are missing from the table are denied.

use crate::Role;

/// The roles allowed to call one `(method, route)` pair. `route` uses the
/// router's own pattern syntax, e.g. `/api/admin/tracks/{id}`.
#[derive(Debug, Clone, Copy)]
pub struct RoutePolicy {
    pub method: &'static str,
    pub route: &'static str,
    pub roles: &'static [Role],
}

const STAFF: &[Role] = &[Role::Admin, Role::Editor];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

const fn policy(method: &'static str, route: &'static str, roles: &'static [Role]) -> RoutePolicy {
    RoutePolicy {
        method,
        route,
        roles,
    }
}

pub const ADMIN_ROUTE_POLICIES: &[RoutePolicy] = &[
    policy("POST", "/api/admin/tracks", STAFF),
    policy("PUT", "/api/admin/tracks/{id}", STAFF),
    policy("DELETE", "/api/admin/tracks/{id}", ADMIN_ONLY),
    policy("POST", "/api/admin/subjects", STAFF),
    policy("PUT", "/api/admin/subjects/{id}", STAFF),
    policy("DELETE", "/api/admin/subjects/{id}", ADMIN_ONLY),
    policy("POST", "/api/admin/topics", STAFF),
    policy("PUT", "/api/admin/topics/{id}", STAFF),
    policy("DELETE", "/api/admin/topics/{id}", ADMIN_ONLY),
    policy("POST", "/api/admin/topics/{id}/notes", STAFF),
    policy("POST", "/api/admin/topics/{id}/summary", STAFF),
    policy("POST", "/api/admin/topics/{id}/mindmap", STAFF),
    policy("POST", "/api/admin/mcqs", STAFF),
    policy("POST", "/api/admin/mcqs/bulk", STAFF),
    policy("PUT", "/api/admin/mcqs/{id}", STAFF),
    policy("DELETE", "/api/admin/mcqs/{id}", ADMIN_ONLY),
    policy("GET", "/api/admin/users", ADMIN_ONLY),
    policy("PUT", "/api/admin/users/{id}", ADMIN_ONLY),
];

/// Looks up the roles allowed for a route, if the route is listed.
pub fn allowed_roles(method: &str, route: &str) -> Option<&'static [Role]> {
    ADMIN_ROUTE_POLICIES
        .iter()
        .find(|p| p.method.eq_ignore_ascii_case(method) && p.route == route)
        .map(|p| p.roles)
}

/// `true` only when the route is listed and `role` is among its allowed roles.
pub fn is_authorized(method: &str, route: &str, role: Role) -> bool {
    allowed_roles(method, route).is_some_and(|roles| roles.contains(&role))
}
