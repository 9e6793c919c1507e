// Copyright (c) 2025 - Cowboy AI, Inc.
//! Directory push
//!
//! Writes reconciled devices to the directory one at a time. A device whose
//! name is already taken in the configuration is skipped; a device that fails
//! is reported and the batch moves on.
//!
//! Every address is filed under its `/24` network, which is created (along
//! with a `/24` block when no block contains the address) on first use.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::directory::{DirectoryError, DirectoryResult, DirectoryService, Entity, EntityKind};
use crate::domain::{Address, Device, EntityId};
use crate::errors::ImportError;

/// What happened to one device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PushOutcome {
    /// Device created with this id
    Created(EntityId),
    /// Device of that name already existed with this id
    Duplicate(EntityId),
}

/// Result of pushing a batch
#[derive(Debug, Default)]
pub struct PushReport {
    pub created: Vec<(String, EntityId)>,
    pub duplicates: Vec<(String, EntityId)>,
    pub failures: Vec<ImportError>,
}

impl PushReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Push every device in order, best effort
pub async fn push_devices<D>(directory: &D, configuration_id: EntityId, devices: &[Device]) -> PushReport
where
    D: DirectoryService + ?Sized,
{
    let mut report = PushReport::default();

    for device in devices {
        match push_device(directory, configuration_id, device).await {
            Ok(PushOutcome::Created(id)) => {
                info!("Created device '{}' with ID {}", device.name(), id);
                report.created.push((device.name().to_string(), id));
            }
            Ok(PushOutcome::Duplicate(id)) => {
                report.duplicates.push((device.name().to_string(), id));
            }
            Err(source) => {
                let error = ImportError::Push {
                    name: device.name().to_string(),
                    source,
                };
                warn!("{}", error);
                report.failures.push(error);
            }
        }
    }

    info!(
        "Pushed {} devices: {} created, {} already present, {} failed",
        devices.len(),
        report.created.len(),
        report.duplicates.len(),
        report.failures.len()
    );
    report
}

/// Create one device unless its name is already taken
pub async fn push_device<D>(
    directory: &D,
    configuration_id: EntityId,
    device: &Device,
) -> DirectoryResult<PushOutcome>
where
    D: DirectoryService + ?Sized,
{
    if let Some(existing) = directory
        .get_entity_by_name(configuration_id, device.name(), EntityKind::Device)
        .await?
    {
        warn!(
            "Device {} already exists with ID {}. Skipping...",
            device.name(),
            existing.id
        );
        return Ok(PushOutcome::Duplicate(existing.id));
    }

    for address in device.addresses() {
        ensure_network(directory, configuration_id, address).await?;
    }

    let created = directory
        .add_device(
            configuration_id,
            device.name(),
            device.device_type_id(),
            device.device_subtype().id(),
            &device.joined_addresses(),
        )
        .await;

    match created {
        Ok(entity) => Ok(PushOutcome::Created(entity.id)),
        Err(e) if e.is_already_exists() => {
            // Created by someone else between the lookup and the create
            let existing = directory
                .get_entity_by_name(configuration_id, device.name(), EntityKind::Device)
                .await?
                .ok_or(e)?;
            warn!(
                "Device {} already exists with ID {}. Skipping...",
                device.name(),
                existing.id
            );
            Ok(PushOutcome::Duplicate(existing.id))
        }
        Err(e) => Err(e),
    }
}

/// Network containing `address`, created on its `/24` if missing
pub async fn ensure_network<D>(
    directory: &D,
    configuration_id: EntityId,
    address: &Address,
) -> DirectoryResult<Entity>
where
    D: DirectoryService + ?Sized,
{
    let ip = address.ip();

    if let Some(network) = directory
        .get_ip_ranged_by_ip(configuration_id, EntityKind::IP4Network, ip)
        .await?
    {
        debug!("Network for IP {} already exists with ID {}", ip, network.id);
        return Ok(network);
    }
    debug!("No network entity found for IP {}", ip);

    let block = ensure_block(directory, configuration_id, address).await?;
    let cidr = address.default_network();

    debug!("Adding a new network for CIDR {}", cidr);
    match directory.add_ip4_network(block.id, &cidr).await {
        Ok(network) => Ok(network),
        Err(e) if e.is_already_exists() => {
            refetch(directory, configuration_id, EntityKind::IP4Network, address, e).await
        }
        Err(e) => Err(e),
    }
}

/// Block containing `address`, created on its `/24` if missing
pub async fn ensure_block<D>(
    directory: &D,
    configuration_id: EntityId,
    address: &Address,
) -> DirectoryResult<Entity>
where
    D: DirectoryService + ?Sized,
{
    let ip = address.ip();

    if let Some(block) = directory
        .get_ip_ranged_by_ip(configuration_id, EntityKind::IP4Block, ip)
        .await?
    {
        debug!("Block for IP {} already exists with ID {}", ip, block.id);
        return Ok(block);
    }

    let cidr = address.default_network();
    debug!("No block entity found for IP {}. Creating {}", ip, cidr);

    match directory.add_ip4_block_by_cidr(configuration_id, &cidr).await {
        Ok(block) => Ok(block),
        Err(e) if e.is_already_exists() => {
            refetch(directory, configuration_id, EntityKind::IP4Block, address, e).await
        }
        Err(e) => Err(e),
    }
}

async fn refetch<D>(
    directory: &D,
    configuration_id: EntityId,
    kind: EntityKind,
    address: &Address,
    original: DirectoryError,
) -> DirectoryResult<Entity>
where
    D: DirectoryService + ?Sized,
{
    directory
        .get_ip_ranged_by_ip(configuration_id, kind, address.ip())
        .await?
        .ok_or(original)
}
