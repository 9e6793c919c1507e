// Copyright (c) 2025 - Cowboy AI, Inc.

//! In-memory directory
//!
//! Keeps the same bookkeeping the address manager would (types, subtypes,
//! blocks, networks, devices) inside the process. Used for `--dry-run` and by
//! the test suite, which inspects [`InMemoryDirectory::calls`] to check which
//! requests a run actually issued.

use async_trait::async_trait;
use ipnetwork::Ipv4Network;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::{DirectoryError, DirectoryResult, DirectoryService, Entity, EntityKind};
use crate::domain::validation::parse_subnet;
use crate::domain::EntityId;

/// One request received by the in-memory directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DirectoryCall {
    Login { username: String },
    ListConfigurations,
    GetEntityByName { parent_id: EntityId, name: String, kind: EntityKind },
    AddDeviceType { name: String },
    AddDeviceSubtype { parent_id: EntityId, name: String },
    GetIpRangedByIp { kind: EntityKind, ip: Ipv4Addr },
    AddIp4Block { cidr: String },
    AddIp4Network { block_id: EntityId, cidr: String },
    AddDevice { name: String, addresses: String },
}

/// Device as stored by the in-memory directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredDevice {
    pub id: EntityId,
    pub configuration_id: EntityId,
    pub name: String,
    pub type_id: EntityId,
    pub subtype_id: EntityId,
    pub addresses: String,
}

#[derive(Debug, Clone)]
struct StoredRange {
    id: EntityId,
    configuration_id: EntityId,
    network: Ipv4Network,
}

#[derive(Debug, Default)]
struct State {
    next_id: EntityId,
    credentials: Option<(String, String)>,
    logged_in: bool,
    configurations: Vec<Entity>,
    device_types: HashMap<String, EntityId>,
    subtypes: HashMap<(EntityId, String), EntityId>,
    blocks: Vec<StoredRange>,
    networks: Vec<StoredRange>,
    devices: Vec<StoredDevice>,
    unavailable: HashSet<EntityKind>,
    calls: Vec<DirectoryCall>,
}

impl State {
    fn allocate(&mut self) -> EntityId {
        self.next_id += 1;
        self.next_id
    }

    fn require_session(&self) -> DirectoryResult<()> {
        if self.logged_in {
            Ok(())
        } else {
            Err(DirectoryError::NotAuthenticated)
        }
    }

    fn check_available(&self, kind: EntityKind) -> DirectoryResult<()> {
        if self.unavailable.contains(&kind) {
            return Err(DirectoryError::Unavailable(format!(
                "{} requests are failing",
                kind
            )));
        }
        Ok(())
    }

    fn configuration_exists(&self, id: EntityId) -> bool {
        self.configurations.iter().any(|c| c.id == id)
    }

    fn smallest_range(ranges: &[StoredRange], configuration_id: EntityId, ip: Ipv4Addr) -> Option<&StoredRange> {
        ranges
            .iter()
            .filter(|r| r.configuration_id == configuration_id && r.network.contains(ip))
            .max_by_key(|r| r.network.prefix())
    }
}

/// Process-local [`DirectoryService`]
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: Mutex<State>,
}

impl InMemoryDirectory {
    /// Empty directory that accepts any credentials
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept this username/password pair on login
    pub fn with_credentials(self, username: &str, password: &str) -> Self {
        self.lock().credentials = Some((username.to_string(), password.to_string()));
        self
    }

    /// Add a configuration; ids are assigned in insertion order
    pub fn with_configuration(self, name: &str) -> Self {
        {
            let mut state = self.lock();
            let id = state.allocate();
            state.configurations.push(Entity::new(id, name, EntityKind::Configuration));
        }
        self
    }

    /// Pre-register a device type, as if created by an earlier run
    pub fn with_device_type(self, name: &str) -> Self {
        {
            let mut state = self.lock();
            let id = state.allocate();
            state.device_types.insert(name.to_string(), id);
        }
        self
    }

    /// Pre-register a subtype under an existing device type
    pub fn with_device_subtype(self, type_name: &str, name: &str) -> Self {
        {
            let mut state = self.lock();
            if let Some(&parent_id) = state.device_types.get(type_name) {
                let id = state.allocate();
                state.subtypes.insert((parent_id, name.to_string()), id);
            }
        }
        self
    }

    /// Pre-register a device by name in the first configuration
    pub fn with_device(self, name: &str) -> Self {
        {
            let mut state = self.lock();
            let configuration_id = state.configurations.first().map_or(0, |c| c.id);
            let id = state.allocate();
            state.devices.push(StoredDevice {
                id,
                configuration_id,
                name: name.to_string(),
                type_id: 0,
                subtype_id: 0,
                addresses: String::new(),
            });
        }
        self
    }

    /// Make every request touching `kind` fail as if the service were down
    pub fn with_unavailable(self, kind: EntityKind) -> Self {
        self.lock().unavailable.insert(kind);
        self
    }

    /// Requests received so far, in order
    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.lock().calls.clone()
    }

    /// Number of requests matching `predicate`
    pub fn count_calls(&self, predicate: impl Fn(&DirectoryCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn devices(&self) -> Vec<StoredDevice> {
        self.lock().devices.clone()
    }

    /// CIDRs of all stored networks
    pub fn networks(&self) -> Vec<String> {
        self.lock().networks.iter().map(|n| n.network.to_string()).collect()
    }

    /// CIDRs of all stored blocks
    pub fn blocks(&self) -> Vec<String> {
        self.lock().blocks.iter().map(|b| b.network.to_string()).collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DirectoryService for InMemoryDirectory {
    async fn login(&mut self, username: &str, password: &str) -> DirectoryResult<()> {
        let state = self.state.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.calls.push(DirectoryCall::Login {
            username: username.to_string(),
        });
        state.check_available(EntityKind::Configuration)?;

        if let Some((expected_user, expected_password)) = &state.credentials {
            if expected_user != username || expected_password != password {
                return Err(DirectoryError::Authentication(format!(
                    "invalid username or password for '{}'",
                    username
                )));
            }
        }

        state.logged_in = true;
        debug!("In-memory directory session opened for {}", username);
        Ok(())
    }

    async fn list_configurations(&self) -> DirectoryResult<Vec<Entity>> {
        let mut state = self.lock();
        state.calls.push(DirectoryCall::ListConfigurations);
        state.require_session()?;
        state.check_available(EntityKind::Configuration)?;
        Ok(state.configurations.clone())
    }

    async fn get_entity_by_name(
        &self,
        parent_id: EntityId,
        name: &str,
        kind: EntityKind,
    ) -> DirectoryResult<Option<Entity>> {
        let mut state = self.lock();
        state.calls.push(DirectoryCall::GetEntityByName {
            parent_id,
            name: name.to_string(),
            kind,
        });
        state.require_session()?;
        state.check_available(kind)?;

        let id = match kind {
            EntityKind::Configuration => state
                .configurations
                .iter()
                .find(|c| c.name.as_deref() == Some(name))
                .map(|c| c.id),
            EntityKind::DeviceType => state.device_types.get(name).copied(),
            EntityKind::DeviceSubtype => state.subtypes.get(&(parent_id, name.to_string())).copied(),
            EntityKind::Device => state
                .devices
                .iter()
                .find(|d| d.configuration_id == parent_id && d.name == name)
                .map(|d| d.id),
            EntityKind::IP4Network | EntityKind::IP4Block => None,
        };

        Ok(id.map(|id| Entity::new(id, name, kind)))
    }

    async fn add_device_type(&self, name: &str) -> DirectoryResult<Entity> {
        let mut state = self.lock();
        state.calls.push(DirectoryCall::AddDeviceType {
            name: name.to_string(),
        });
        state.require_session()?;
        state.check_available(EntityKind::DeviceType)?;

        if state.device_types.contains_key(name) {
            return Err(DirectoryError::AlreadyExists {
                kind: EntityKind::DeviceType,
                name: name.to_string(),
            });
        }

        let id = state.allocate();
        state.device_types.insert(name.to_string(), id);
        Ok(Entity::new(id, name, EntityKind::DeviceType))
    }

    async fn add_device_subtype(&self, parent_id: EntityId, name: &str) -> DirectoryResult<Entity> {
        let mut state = self.lock();
        state.calls.push(DirectoryCall::AddDeviceSubtype {
            parent_id,
            name: name.to_string(),
        });
        state.require_session()?;
        state.check_available(EntityKind::DeviceSubtype)?;

        if !state.device_types.values().any(|&id| id == parent_id) {
            return Err(DirectoryError::Api(format!(
                "Device type {} does not exist",
                parent_id
            )));
        }

        let key = (parent_id, name.to_string());
        if state.subtypes.contains_key(&key) {
            return Err(DirectoryError::AlreadyExists {
                kind: EntityKind::DeviceSubtype,
                name: name.to_string(),
            });
        }

        let id = state.allocate();
        state.subtypes.insert(key, id);
        Ok(Entity::new(id, name, EntityKind::DeviceSubtype))
    }

    async fn get_ip_ranged_by_ip(
        &self,
        configuration_id: EntityId,
        kind: EntityKind,
        ip: Ipv4Addr,
    ) -> DirectoryResult<Option<Entity>> {
        let mut state = self.lock();
        state.calls.push(DirectoryCall::GetIpRangedByIp { kind, ip });
        state.require_session()?;
        state.check_available(kind)?;

        let ranges = match kind {
            EntityKind::IP4Block => &state.blocks,
            EntityKind::IP4Network => &state.networks,
            other => {
                return Err(DirectoryError::Api(format!(
                    "{} is not an IP range type",
                    other
                )))
            }
        };

        Ok(State::smallest_range(ranges, configuration_id, ip)
            .map(|r| Entity::new(r.id, r.network.to_string(), kind)))
    }

    async fn add_ip4_block_by_cidr(
        &self,
        configuration_id: EntityId,
        cidr: &str,
    ) -> DirectoryResult<Entity> {
        let mut state = self.lock();
        state.calls.push(DirectoryCall::AddIp4Block {
            cidr: cidr.to_string(),
        });
        state.require_session()?;
        state.check_available(EntityKind::IP4Block)?;

        if !state.configuration_exists(configuration_id) {
            return Err(DirectoryError::Api(format!(
                "Configuration {} does not exist",
                configuration_id
            )));
        }

        let network = parse_subnet(cidr)
            .ok_or_else(|| DirectoryError::Api(format!("Invalid CIDR '{}'", cidr)))?;

        if state
            .blocks
            .iter()
            .any(|b| b.configuration_id == configuration_id && b.network == network)
        {
            return Err(DirectoryError::AlreadyExists {
                kind: EntityKind::IP4Block,
                name: cidr.to_string(),
            });
        }

        let id = state.allocate();
        state.blocks.push(StoredRange {
            id,
            configuration_id,
            network,
        });
        Ok(Entity::new(id, cidr, EntityKind::IP4Block))
    }

    async fn add_ip4_network(&self, block_id: EntityId, cidr: &str) -> DirectoryResult<Entity> {
        let mut state = self.lock();
        state.calls.push(DirectoryCall::AddIp4Network {
            block_id,
            cidr: cidr.to_string(),
        });
        state.require_session()?;
        state.check_available(EntityKind::IP4Network)?;

        let block = state
            .blocks
            .iter()
            .find(|b| b.id == block_id)
            .cloned()
            .ok_or_else(|| DirectoryError::Api(format!("Block {} does not exist", block_id)))?;

        let network = parse_subnet(cidr)
            .ok_or_else(|| DirectoryError::Api(format!("Invalid CIDR '{}'", cidr)))?;

        if !block.network.contains(network.network()) || network.prefix() < block.network.prefix() {
            return Err(DirectoryError::Api(format!(
                "Network {} is outside block {}",
                cidr, block.network
            )));
        }

        if state.networks.iter().any(|n| {
            n.configuration_id == block.configuration_id && n.network == network
        }) {
            return Err(DirectoryError::AlreadyExists {
                kind: EntityKind::IP4Network,
                name: cidr.to_string(),
            });
        }

        let id = state.allocate();
        state.networks.push(StoredRange {
            id,
            configuration_id: block.configuration_id,
            network,
        });
        Ok(Entity::new(id, cidr, EntityKind::IP4Network))
    }

    async fn add_device(
        &self,
        configuration_id: EntityId,
        name: &str,
        type_id: EntityId,
        subtype_id: EntityId,
        addresses: &str,
    ) -> DirectoryResult<Entity> {
        let mut state = self.lock();
        state.calls.push(DirectoryCall::AddDevice {
            name: name.to_string(),
            addresses: addresses.to_string(),
        });
        state.require_session()?;
        state.check_available(EntityKind::Device)?;

        if !state.configuration_exists(configuration_id) {
            return Err(DirectoryError::Api(format!(
                "Configuration {} does not exist",
                configuration_id
            )));
        }

        if !state
            .subtypes
            .iter()
            .any(|((parent, _), &id)| *parent == type_id && id == subtype_id)
        {
            return Err(DirectoryError::Api(format!(
                "Subtype {} is not a child of device type {}",
                subtype_id, type_id
            )));
        }

        if state
            .devices
            .iter()
            .any(|d| d.configuration_id == configuration_id && d.name == name)
        {
            return Err(DirectoryError::AlreadyExists {
                kind: EntityKind::Device,
                name: name.to_string(),
            });
        }

        let id = state.allocate();
        state.devices.push(StoredDevice {
            id,
            configuration_id,
            name: name.to_string(),
            type_id,
            subtype_id,
            addresses: addresses.to_string(),
        });
        Ok(Entity::new(id, name, EntityKind::Device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn session() -> InMemoryDirectory {
        let mut directory = InMemoryDirectory::new().with_configuration("Test");
        directory.login("admin", "secret").await.unwrap();
        directory
    }

    #[tokio::test]
    async fn test_login_checks_credentials() {
        let mut directory = InMemoryDirectory::new().with_credentials("admin", "secret");
        let err = directory.login("admin", "wrong").await.unwrap_err();
        assert!(matches!(err, DirectoryError::Authentication(_)));
        assert!(directory.list_configurations().await.is_err());

        directory.login("admin", "secret").await.unwrap();
        assert!(directory.list_configurations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_device_type_already_exists() {
        let directory = session().await;
        let created = directory.add_device_type("Router").await.unwrap();

        let err = directory.add_device_type("Router").await.unwrap_err();
        assert!(err.is_already_exists());

        let found = directory
            .get_entity_by_name(0, "Router", EntityKind::DeviceType)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn test_ranges() {
        let directory = session().await;
        let config = directory.list_configurations().await.unwrap()[0].id;
        let ip: Ipv4Addr = "10.0.0.5".parse().unwrap();

        assert!(directory
            .get_ip_ranged_by_ip(config, EntityKind::IP4Block, ip)
            .await
            .unwrap()
            .is_none());

        let block = directory.add_ip4_block_by_cidr(config, "10.0.0.0/24").await.unwrap();
        let network = directory.add_ip4_network(block.id, "10.0.0.0/24").await.unwrap();

        let found = directory
            .get_ip_ranged_by_ip(config, EntityKind::IP4Network, ip)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, network.id);

        let err = directory.add_ip4_network(block.id, "10.0.1.0/24").await.unwrap_err();
        assert!(matches!(err, DirectoryError::Api(_)));
    }

    #[tokio::test]
    async fn test_unavailable_kind() {
        let mut directory = InMemoryDirectory::new()
            .with_configuration("Test")
            .with_unavailable(EntityKind::DeviceType);
        directory.login("admin", "secret").await.unwrap();

        let err = directory.add_device_type("Router").await.unwrap_err();
        assert!(matches!(err, DirectoryError::Unavailable(_)));
    }
}
