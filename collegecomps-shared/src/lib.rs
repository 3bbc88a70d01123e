//! # CollegeComps Shared Library
//!
//! This crate contains the types, persistence layer and outbound clients used
//! by the CollegeComps API server.
//!
//! ## Module Organization
//!
//! - `auth`: Password hashing, session tokens, credential tokens, tier checks
//! - `db`: SQLite connection pool and embedded migrations
//! - `models`: One module per table with its queries
//! - `email`: Transactional email delivery (Resend) and templates
//! - `billing`: Stripe checkout/portal client and webhook verification

pub mod auth;
pub mod billing;
pub mod db;
pub mod email;
pub mod models;

/// Current version of the CollegeComps shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
