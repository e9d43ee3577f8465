//! Shared building blocks for the secrets application: configuration,
//! errors, extractors, middleware, password schemes, crypto, OAuth clients
//! and HTML views.

pub mod config;
pub mod crypto;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod oauth;
pub mod password;
pub mod rejection;
pub mod view;
