use thiserror::Error;

use crate::cache::CacheError;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Token cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Pagination did not finish within {0} pages")]
    TooManyPages(u64),
}
