//! Pure domain logic for the ModuleAB metadata server.
//!
//! Nothing in this crate performs I/O: the store, the HTTP layer and the
//! archive-service client all live in the `db` and `api` crates and are
//! passed in where needed.

pub mod error;
pub mod pagination;
pub mod roles;
pub mod signing;
pub mod types;
pub mod validation;
pub mod vault;
