//! Route handlers.
//!
//! `/` greets, `/user` holds the routes that need an identity, and anything
//! else ends in [`not_found::not_found`].

pub mod not_found;
pub mod root;
pub mod user;
