// Copyright (c) 2025 - Cowboy AI, Inc.
//! Device Entity
//!
//! A named device with its classification and the addresses collected for it
//! across every input row that carries its name.

use serde::Serialize;
use thiserror::Error;

use super::{Address, AddressError, DeviceSubtype, DeviceType, EntityId};

/// Device validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Device name is empty")]
    EmptyName,

    #[error("Device '{0}' has no valid addresses")]
    NoAddresses(String),

    #[error("Device subtype '{subtype}' is not a child of device type '{device_type}'")]
    SubtypeNotInType {
        subtype: String,
        device_type: String,
    },

    #[error("Device type '{device_type}' / subtype '{subtype}' has not been resolved")]
    Unclassified {
        device_type: String,
        subtype: String,
    },
}

/// Device aggregate
///
/// # Invariants
/// - Name is non-empty
/// - At least one address at construction
/// - Subtype is registered under the device type and points back at it
/// - Every address passed validation before it was stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    name: String,
    device_type: String,
    device_type_id: EntityId,
    device_subtype: DeviceSubtype,
    addresses: Vec<Address>,
}

impl Device {
    /// Create a device with validation
    pub fn new(
        name: impl Into<String>,
        addresses: Vec<Address>,
        device_type: &DeviceType,
        device_subtype: &DeviceSubtype,
    ) -> Result<Self, DeviceError> {
        let name = name.into();

        if name.trim().is_empty() {
            return Err(DeviceError::EmptyName);
        }

        if device_subtype.parent_id() != device_type.id() || !device_type.contains(device_subtype) {
            return Err(DeviceError::SubtypeNotInType {
                subtype: device_subtype.name().to_string(),
                device_type: device_type.name().to_string(),
            });
        }

        if addresses.is_empty() {
            return Err(DeviceError::NoAddresses(name));
        }

        Ok(Self {
            name,
            device_type: device_type.name().to_string(),
            device_type_id: device_type.id(),
            device_subtype: device_subtype.clone(),
            addresses,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn device_type_id(&self) -> EntityId {
        self.device_type_id
    }

    pub fn device_subtype(&self) -> &DeviceSubtype {
        &self.device_subtype
    }

    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// Validate `ip` on its default `/24` and append it
    ///
    /// On error the address list is left untouched.
    pub fn merge_address(&mut self, ip: &str, hostname: Option<&str>) -> Result<&Address, AddressError> {
        let address = Address::with_default_subnet(ip, hostname)?;
        self.addresses.push(address);
        Ok(&self.addresses[self.addresses.len() - 1])
    }

    /// Comma-joined address list in the form the directory expects
    pub fn joined_addresses(&self) -> String {
        self.addresses
            .iter()
            .map(|address| address.ip().to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}
