// Route authorization.
//
// Every navigation passes through `authorize`, which returns the route the
// user is actually allowed to see.

use wellness_core::models::Role;

use crate::protocol::{AdminTab, PatientSection, Route};

/// Landing page for a signed-in role.
pub fn home_for(role: Role) -> Route {
    match role {
        Role::Admin => Route::Admin(AdminTab::Dashboard),
        Role::Patient => Route::Patient(PatientSection::Overview),
    }
}

/// Resolve a requested route against the current role (`None` when signed
/// out).
pub fn authorize(requested: Route, role: Option<Role>) -> Route {
    match (requested, role) {
        (Route::Login | Route::Signup, None) => requested,
        (_, None) => Route::Login,
        (Route::Login | Route::Signup, Some(role)) => home_for(role),
        (Route::Admin(_), Some(Role::Patient)) => home_for(Role::Patient),
        (Route::Patient(_), Some(Role::Admin)) => home_for(Role::Admin),
        (route, Some(_)) => route,
    }
}
