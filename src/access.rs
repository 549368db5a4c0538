//! Admin vs public read scoping.

use crate::schema::Schema;
use crate::store::Filter;

/// AccessPolicy
///
/// Fixed per route at registration time. Admin reads see everything the caller
/// asks for; public reads are always intersected with the schema's floor
/// (`isActive = true`, or `status = COMPLETED` for projects).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    Public,
    Admin,
}

impl AccessPolicy {
    /// The conditions every record visible under this policy satisfies.
    pub fn floor(self, schema: &Schema) -> Filter {
        match self {
            AccessPolicy::Admin => Filter::new(),
            AccessPolicy::Public => schema.public_filter(),
        }
    }

    /// Applies the floor on top of caller-supplied filters. Caller values for a
    /// floored key are overridden, never honored.
    pub fn scope(self, schema: &Schema, requested: Filter) -> Filter {
        requested.overlay(self.floor(schema))
    }
}
