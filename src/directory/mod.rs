// Copyright (c) 2025 - Cowboy AI, Inc.

//! Directory Service - the address manager seen from the importer
//!
//! The importer never talks HTTP directly. Everything it needs from the
//! address manager goes through [`DirectoryService`]:
//!
//! ```text
//! Reconciler ──get-or-create──> DeviceType / DeviceSubtype
//! Pusher     ──get-or-create──> IP4Block / IP4Network ──> Device
//! ```
//!
//! Two implementations ship with the crate:
//!
//! - [`BamClient`] - BlueCat Address Manager legacy REST API (feature `bam`)
//! - [`InMemoryDirectory`] - process-local directory for dry runs and tests

#[cfg(feature = "bam")]
pub mod bam;
pub mod memory;

#[cfg(feature = "bam")]
pub use bam::BamClient;
pub use memory::{DirectoryCall, InMemoryDirectory};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use thiserror::Error;

use crate::domain::EntityId;

/// Errors reported by a directory implementation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Credentials rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Service could not be reached (connect failure, timeout)
    #[error("Directory service unavailable: {0}")]
    Unavailable(String),

    /// Create call refused because the entity is already there
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: EntityKind, name: String },

    /// Any other fault returned by the service
    #[error("Directory API error: {0}")]
    Api(String),

    /// Response could not be decoded
    #[error("Unexpected directory response: {0}")]
    Deserialization(String),

    /// Call made before a successful login
    #[error("Not logged in to the directory service")]
    NotAuthenticated,
}

impl DirectoryError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

/// Result type for directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Entity kinds the importer reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Configuration,
    DeviceType,
    DeviceSubtype,
    Device,
    IP4Network,
    IP4Block,
}

impl EntityKind {
    /// Type name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "Configuration",
            Self::DeviceType => "DeviceType",
            Self::DeviceSubtype => "DeviceSubtype",
            Self::Device => "Device",
            Self::IP4Network => "IP4Network",
            Self::IP4Block => "IP4Block",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Entity as returned by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub properties: Option<String>,
}

impl Entity {
    pub fn new(id: EntityId, name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id,
            name: Some(name.into()),
            kind: Some(kind.as_str().to_string()),
            properties: None,
        }
    }

    /// The directory answers lookups that match nothing with id 0
    pub fn exists(&self) -> bool {
        self.id != 0
    }
}

/// Operations the importer needs from the address manager
///
/// Calls are issued one at a time; implementations do not need to support
/// overlapping requests.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Open a session. Every other call requires one.
    async fn login(&mut self, username: &str, password: &str) -> DirectoryResult<()>;

    /// All configurations visible to the logged in user
    async fn list_configurations(&self) -> DirectoryResult<Vec<Entity>>;

    /// Child of `parent_id` with the given name and kind, if any
    async fn get_entity_by_name(
        &self,
        parent_id: EntityId,
        name: &str,
        kind: EntityKind,
    ) -> DirectoryResult<Option<Entity>>;

    /// Create a device type. Fails with [`DirectoryError::AlreadyExists`]
    /// when the name is taken.
    async fn add_device_type(&self, name: &str) -> DirectoryResult<Entity>;

    /// Create a subtype under `parent_id`. Fails with
    /// [`DirectoryError::AlreadyExists`] when the name is taken.
    async fn add_device_subtype(&self, parent_id: EntityId, name: &str) -> DirectoryResult<Entity>;

    /// Smallest range of `kind` in the configuration containing `ip`
    async fn get_ip_ranged_by_ip(
        &self,
        configuration_id: EntityId,
        kind: EntityKind,
        ip: Ipv4Addr,
    ) -> DirectoryResult<Option<Entity>>;

    async fn add_ip4_block_by_cidr(
        &self,
        configuration_id: EntityId,
        cidr: &str,
    ) -> DirectoryResult<Entity>;

    async fn add_ip4_network(&self, block_id: EntityId, cidr: &str) -> DirectoryResult<Entity>;

    /// Create a device. `addresses` is the comma-joined IPv4 list.
    async fn add_device(
        &self,
        configuration_id: EntityId,
        name: &str,
        type_id: EntityId,
        subtype_id: EntityId,
        addresses: &str,
    ) -> DirectoryResult<Entity>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_deserialization() {
        let entity: Entity = serde_json::from_str(
            r#"{"id": 42, "name": "Test", "type": "Configuration", "properties": "sharedNetwork=|"}"#,
        )
        .unwrap();
        assert_eq!(entity.id, 42);
        assert_eq!(entity.name.as_deref(), Some("Test"));
        assert!(entity.exists());
    }

    #[test]
    fn test_missing_entity() {
        let entity: Entity =
            serde_json::from_str(r#"{"id": 0, "name": null, "type": null, "properties": null}"#).unwrap();
        assert!(!entity.exists());
    }

    #[test]
    fn test_already_exists() {
        let err = DirectoryError::AlreadyExists {
            kind: EntityKind::DeviceType,
            name: "Router".to_string(),
        };
        assert!(err.is_already_exists());
        assert_eq!(err.to_string(), "DeviceType 'Router' already exists");
        assert!(!DirectoryError::Api("boom".to_string()).is_already_exists());
    }
}
