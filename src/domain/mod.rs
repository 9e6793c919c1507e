// Copyright (c) 2025 - Cowboy AI, Inc.
//! Inventory Domain Models
//!
//! Value objects and entities the importer builds from spreadsheet rows
//! before anything is sent to the address manager.
//!
//! # Value Objects with Invariants
//!
//! - [`Address`] - IPv4 address that is a member of its subnet
//! - [`DeviceSubtype`] - subtype bound to its parent type id
//!
//! # Entities
//!
//! - [`DeviceType`] - device type owning its subtypes
//! - [`Device`] - named device with classification and addresses
//! - [`Taxonomy`] - per-run working set of resolved device types

pub mod address;
pub mod device;
pub mod taxonomy;
pub mod validation;

/// Identifier assigned by the address manager. `0` means "no such entity".
pub type EntityId = u64;

pub use address::{Address, AddressError};
pub use device::{Device, DeviceError};
pub use taxonomy::{DeviceSubtype, DeviceType, Taxonomy, TaxonomyError};
pub use validation::{
    default_subnet, is_member_of_subnet, is_valid_fqdn, is_valid_host, is_valid_ipv4,
    is_valid_subnet,
};
