// Copyright (c) 2025 - Cowboy AI, Inc.

//! Importer configuration
//!
//! Connection settings for the address manager plus the run options the
//! driver passes down to the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::domain::is_valid_host;
use crate::errors::{ImportError, ImportResult};

/// Address manager connection settings
#[derive(Clone, Serialize, Deserialize)]
pub struct BamConfig {
    /// Base URL of the address manager (e.g., "http://10.255.255.50")
    pub base_url: String,

    /// API user
    #[serde(default)]
    pub username: String,

    /// API password
    #[serde(default, skip_serializing)]
    pub password: String,

    /// Name of the configuration devices are created in
    #[serde(default)]
    pub configuration: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Extra attempts for requests that fail to reach the server
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    1
}

impl Default for BamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost".to_string(),
            username: String::new(),
            password: String::new(),
            configuration: String::new(),
            timeout_secs: default_timeout(),
            retries: default_retries(),
        }
    }
}

// Keeps the password out of debug logs
impl fmt::Debug for BamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BamConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("configuration", &self.configuration)
            .field("timeout_secs", &self.timeout_secs)
            .field("retries", &self.retries)
            .finish()
    }
}

impl BamConfig {
    /// Fail on settings that would only surface as a failed login later
    pub fn validate(&self) -> ImportResult<()> {
        if self.username.is_empty() {
            return Err(ImportError::Config("No username supplied".to_string()));
        }
        if self.password.is_empty() {
            return Err(ImportError::Config("No password supplied".to_string()));
        }
        if self.configuration.is_empty() {
            return Err(ImportError::Config("No configuration supplied".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ImportError::Config("Timeout must be at least one second".to_string()));
        }
        Ok(())
    }
}

/// Turn a server address from the command line into a base URL
///
/// Accepts `host`, `host:port`, or a full `http(s)://` URL. The host must be
/// an IPv4 address or a FQDN.
pub fn base_url_from_address(address: &str) -> ImportResult<String> {
    let address = address.trim().trim_end_matches('/');

    let (scheme, rest) = match address.split_once("://") {
        Some((scheme, rest)) if scheme == "http" || scheme == "https" => (scheme, rest),
        Some((scheme, _)) => {
            return Err(ImportError::Config(format!(
                "Unsupported scheme '{}' in address '{}'",
                scheme, address
            )))
        }
        None => ("http", address),
    };

    let authority = rest.split('/').next().unwrap_or(rest);
    let host = match authority.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => authority,
    };

    if !is_valid_host(host) {
        return Err(ImportError::Config(format!(
            "Invalid address supplied: '{}'",
            address
        )));
    }

    Ok(format!("{}://{}", scheme, rest))
}

/// Options for one import run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Spreadsheet to import
    pub filename: PathBuf,

    /// Reconcile and push against an in-memory directory instead of the server
    pub dry_run: bool,

    /// Emit the run summary at debug level, also on fatal errors
    pub verbose: bool,
}
