//! Request stages that wrap every route.
//!
//! - `security`: hardened response headers
//! - `body`: JSON body parsing into [`JsonBody`]
//! - `errors`: the terminal error stage and panic recovery

mod body;
mod errors;
mod security;

pub use self::body::{parse_json_body, JsonBody, DEFAULT_JSON_LIMIT};
pub use self::errors::{forward_errors, panic_to_error};
pub use self::security::{security_headers, HARDENED_HEADERS};
