//! # Street Art API
//!
//! `streetart` is the HTTP entry point of the Street Art API. It wires a
//! Postgres-backed user directory, a fixed chain of request stages and the
//! `/user` route group into a single axum service.
//!
//! ## Request pipeline
//!
//! Every request crosses the same stages in the same order: hardened response
//! headers, gzip negotiation, CORS, JSON body parsing, authentication context,
//! routing and the catch-all `404`. Anything forwarded on the way settles in
//! the terminal error stage. The order is fixed in [`api::app`]; CORS wraps
//! the error stage so that error responses carry CORS headers as well.
//!
//! ## Authentication
//!
//! Two strategies are available to routes: `local` (email and password) and
//! `bearer` (opaque token). Both delegate the actual credential check to a
//! [`directory::UserDirectory`]. No server-side session is ever created; a
//! request is either anonymous or carries a [`auth::Principal`] resolved for
//! that request only.
//!
//! ## Deployment mode
//!
//! With `NODE_ENV=production`, forwarded errors are redacted to
//! `"An error occurred"`; in any other mode the error message is echoed back.

pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod directory;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
