pub mod ags;
pub mod deep_link;
pub mod identity;
pub mod jwks_fetch;
pub mod keys;
pub mod launch;
pub mod launch_cache;
pub mod oidc;
pub mod ssrf;
pub mod stores;
