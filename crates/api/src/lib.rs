//! ModuleAB metadata server library.
//!
//! Exposes the building blocks (config, state, error handling, the
//! authorization gate, routes and the archive-service client) so the
//! integration tests and the binary entrypoint share one router.

pub mod archive;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
