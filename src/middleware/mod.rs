pub mod ags_auth;
pub mod rate_limit;
pub mod security_headers;
pub mod tracing;
