pub mod attendance;
pub mod auth;
pub mod core;
pub mod dashboard;
pub mod enrollments;
pub mod excuses;
pub mod profile;
pub mod users;

/// Methods that run only with a resolved principal.
pub fn is_protected(method: &str) -> bool {
    [
        profile::METHODS,
        dashboard::METHODS,
        attendance::METHODS,
        enrollments::METHODS,
        users::METHODS,
        excuses::METHODS,
    ]
    .iter()
    .any(|family| family.contains(&method))
}
