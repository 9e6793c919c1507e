// Copyright (c) 2025 - Cowboy AI, Inc.
//! Address Value Object
//!
//! A single network endpoint on a device: an IPv4 address, the subnet it must
//! belong to, and an optional hostname.

use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;
use thiserror::Error;
use tracing::warn;

use super::validation::{
    default_subnet, is_member_of_subnet, is_valid_fqdn, is_valid_subnet, parse_ipv4,
    DEFAULT_PREFIX,
};

/// Address validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Subnet '{0}' is not valid")]
    InvalidSubnet(String),

    #[error("IP '{0}' is not a valid IPv4 address")]
    InvalidIp(String),

    #[error("IP '{ip}' is not a member of subnet '{subnet}'")]
    NotInSubnet { ip: String, subnet: String },
}

/// IPv4 endpoint with subnet membership invariant
///
/// Invariants:
/// - `subnet` is valid CIDR with prefix ≤ 32
/// - `ip` is a valid dotted-quad IPv4 address
/// - `ip` is contained in `subnet`
///
/// The hostname is advisory. A hostname that fails the FQDN shape check is
/// reported but kept.
///
/// # Examples
///
/// ```rust
/// use bam_device_import::domain::Address;
///
/// let addr = Address::create("10.0.0.5", "10.0.0.0/24", None).unwrap();
/// assert_eq!(addr.ip().to_string(), "10.0.0.5");
/// assert_eq!(addr.subnet(), "10.0.0.0/24");
///
/// assert!(Address::create("10.0.1.5", "10.0.0.0/24", None).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Address {
    ip: Ipv4Addr,
    subnet: String,
    hostname: Option<String>,
}

impl Address {
    /// Validate and build an address
    ///
    /// # Invariants
    /// - Subnet checked first, then IP syntax and membership
    /// - Hostname never blocks construction
    pub fn create(
        ip: &str,
        subnet: &str,
        hostname: Option<&str>,
    ) -> Result<Self, AddressError> {
        if !is_valid_subnet(subnet) {
            return Err(AddressError::InvalidSubnet(subnet.to_string()));
        }

        let parsed = parse_ipv4(ip).ok_or_else(|| AddressError::InvalidIp(ip.to_string()))?;

        if !is_member_of_subnet(ip, subnet) {
            return Err(AddressError::NotInSubnet {
                ip: ip.to_string(),
                subnet: subnet.to_string(),
            });
        }

        if let Some(name) = hostname {
            if !is_valid_fqdn(name) {
                warn!("Hostname '{}' for IP {} is not a valid FQDN", name, ip);
            }
        }

        Ok(Self {
            ip: parsed,
            subnet: subnet.to_string(),
            hostname: hostname.map(str::to_string),
        })
    }

    /// Build an address on the `/24` of its first three octets
    pub fn with_default_subnet(ip: &str, hostname: Option<&str>) -> Result<Self, AddressError> {
        let subnet = default_subnet(ip).ok_or_else(|| AddressError::InvalidIp(ip.to_string()))?;
        Self::create(ip, &subnet, hostname)
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    pub fn subnet(&self) -> &str {
        &self.subnet
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    /// Whether the attached hostname (if any) passes the FQDN shape check
    pub fn has_valid_hostname(&self) -> bool {
        self.hostname.as_deref().map_or(true, is_valid_fqdn)
    }

    /// The `/24` block and network this address is filed under in the
    /// directory, independent of the subnet it was validated against
    pub fn default_network(&self) -> String {
        let [a, b, c, _] = self.ip.octets();
        format!("{}.{}.{}.0/{}", a, b, c, DEFAULT_PREFIX)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ip)
    }
}
