//! CGI-style variable names that make up the request metadata.
//!
//! These are purely helpers; [`RequestMetadata`](crate::request::RequestMetadata)
//! can be filled from any source.

/// Request-scoped override for the operation type.
pub const OPERATION_TYPE_KEY: &str = "OPERATION_TYPE";

pub const REQUEST_METHOD_KEY: &str = "REQUEST_METHOD";

pub const REQUEST_URI_KEY: &str = "REQUEST_URI";

pub const REMOTE_ADDR_KEY: &str = "REMOTE_ADDR";

pub const HTTP_USER_AGENT_KEY: &str = "HTTP_USER_AGENT";

pub const HTTP_REFERER_KEY: &str = "HTTP_REFERER";

/// Every key [`RequestMetadata::from_env`](crate::request::RequestMetadata::from_env) reads.
pub const REQUEST_ENV_KEYS: [&str; 6] = [
    OPERATION_TYPE_KEY,
    REQUEST_METHOD_KEY,
    REQUEST_URI_KEY,
    REMOTE_ADDR_KEY,
    HTTP_USER_AGENT_KEY,
    HTTP_REFERER_KEY,
];

/// Value written for request fields that the host did not supply.
pub const CLI_SENTINEL: &str = "CLI";

