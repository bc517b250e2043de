//! HTTP client for the Jobbergate API.
//!
//! Authenticates with the OIDC client-credentials grant and exposes the
//! agent-facing job submission endpoints.

pub mod auth;
pub mod cache;
pub mod client;
pub mod error;
pub mod pagination;

pub use auth::{CachedToken, OidcCredentials, TokenManager};
pub use cache::{CacheError, TokenCache};
pub use client::JobbergateClient;
pub use error::ClientError;
pub use pagination::collect_pages;
