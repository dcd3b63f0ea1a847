//! Shared HTTP client construction for the crawler and the downloader.
//!
//! Both talk to the same upstream host, so timeouts, compression, the
//! User-Agent and the TLS verification switch are decided in one place.

use std::time::Duration;

use reqwest::Client;
use tracing::warn;

use crate::download::DEFAULT_TIMEOUT_SECS;
use crate::user_agent;

/// Network settings applied to every client this crate builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Connect timeout and per-read timeout, in seconds.
    pub timeout_secs: u64,
    /// Skip TLS certificate verification.
    ///
    /// SECURITY: the catalog host has served content under a certificate
    /// chain that could not be validated. Enabling this accepts any
    /// certificate, including a forged one, for every request made by the
    /// client. Off unless explicitly requested.
    pub accept_invalid_certs: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            accept_invalid_certs: false,
        }
    }
}

/// Builds a reqwest client from [`ClientOptions`].
///
/// # Errors
///
/// Returns the reqwest builder error (e.g. TLS backend initialization).
pub fn build_client(options: &ClientOptions) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(options.timeout_secs);
    let mut builder = Client::builder()
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .gzip(true)
        .user_agent(user_agent::default_user_agent());

    if options.accept_invalid_certs {
        warn!("TLS certificate verification is disabled for this client");
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build()
}
