//! Request authorization.
//!
//! - [`gate::authorize`] -- decides per request between a signed API client
//!   and a session holder with enough role bits.
//! - [`auth::Caller`] -- the identity the gate admitted, as an extractor.

pub mod auth;
pub mod gate;
