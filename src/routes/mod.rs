/// Router Module Index
///
/// Splits the API into its two access surfaces. Access control is applied at the
/// module level (via Axum layers in `create_router`), so a handler registered in
/// `admin` can never be reached without passing the admin gate.

/// Read-only routes open to anonymous visitors, plus the contact form.
/// Every list and detail read is floored by `AccessPolicy::Public`.
pub mod public;

/// Full CRUD for every record kind, restricted to the ADMIN role.
pub mod admin;
