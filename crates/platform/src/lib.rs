//! HTTP client factory: builds a [`reqwest::Client`] honoring an optional
//! proxy URL and a global TLS-verification flag.

mod client;

pub use client::{build_client, ClientError};
