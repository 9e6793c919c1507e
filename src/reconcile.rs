// Copyright (c) 2025 - Cowboy AI, Inc.
//! Reconciliation Engine
//!
//! Turns normalized rows into the in-memory model that is pushed afterwards:
//!
//! ```text
//! rows ──resolve_taxonomy──> Taxonomy (get-or-create per new type/subtype)
//!      ──assemble_devices──> [Device] unique by name + row failures
//! ```
//!
//! Taxonomy resolution talks to the directory and stops the run on any
//! service failure. Device assembly is pure; bad addresses and bad rows are
//! collected and the batch carries on.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::directory::{DirectoryError, DirectoryService, Entity, EntityKind};
use crate::domain::{Address, Device, DeviceError, DeviceSubtype, DeviceType, EntityId, Taxonomy};
use crate::errors::{ImportError, ImportResult};
use crate::source::{Row, RowSource};

/// Row that did not produce or extend a device
#[derive(Debug)]
pub struct RowFailure {
    pub row: Row,
    pub error: ImportError,
}

/// Output of device assembly
#[derive(Debug, Default)]
pub struct Assembly {
    /// Devices unique by name, in order of first appearance
    pub devices: Vec<Device>,
    /// Rows that failed to produce a device
    pub row_failures: Vec<RowFailure>,
    /// Addresses dropped from otherwise usable rows
    pub rejected_addresses: Vec<ImportError>,
}

/// Everything a run knows before pushing
#[derive(Debug, Default)]
pub struct Reconciliation {
    /// Rows read from the source
    pub rows: usize,
    pub taxonomy: Taxonomy,
    pub devices: Vec<Device>,
    pub row_failures: Vec<RowFailure>,
    pub rejected_addresses: Vec<ImportError>,
}

/// Per-run counters for the summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub rows: usize,
    pub device_types: usize,
    pub devices: usize,
    pub row_failures: usize,
    pub rejected_addresses: usize,
}

impl Reconciliation {
    pub fn stats(&self) -> ReconcileStats {
        ReconcileStats {
            rows: self.rows,
            device_types: self.taxonomy.len(),
            devices: self.devices.len(),
            row_failures: self.row_failures.len(),
            rejected_addresses: self.rejected_addresses.len(),
        }
    }
}

/// Read, normalize, resolve, and assemble in one go
pub async fn reconcile<D, S>(directory: &D, source: &S) -> ImportResult<Reconciliation>
where
    D: DirectoryService + ?Sized,
    S: RowSource + ?Sized,
{
    let rows: Vec<Row> = source.rows()?.iter().map(Row::normalize).collect();
    info!("Reconciling {} rows", rows.len());

    let mut taxonomy = Taxonomy::new();
    resolve_taxonomy(directory, &rows, &mut taxonomy).await?;
    info!("Resolved {} device types", taxonomy.len());

    let assembly = assemble_devices(&rows, &taxonomy);
    info!(
        "Assembled {} devices ({} rows failed, {} addresses rejected)",
        assembly.devices.len(),
        assembly.row_failures.len(),
        assembly.rejected_addresses.len()
    );

    Ok(Reconciliation {
        rows: rows.len(),
        taxonomy,
        devices: assembly.devices,
        row_failures: assembly.row_failures,
        rejected_addresses: assembly.rejected_addresses,
    })
}

/// Make sure every (type, subtype) pair in `rows` is in `taxonomy`
///
/// Pairs already in the working set cost no directory call. New types are
/// resolved before their subtypes, in row order.
pub async fn resolve_taxonomy<D>(directory: &D, rows: &[Row], taxonomy: &mut Taxonomy) -> ImportResult<()>
where
    D: DirectoryService + ?Sized,
{
    for row in rows {
        debug!("Checking device type '{}'", row.device_type);

        let type_id = match taxonomy.get(&row.device_type) {
            Some(device_type) => {
                debug!(
                    "Device type '{}' already present in id list with ID {}",
                    device_type.name(),
                    device_type.id()
                );
                device_type.id()
            }
            None => {
                let entity = get_or_create_device_type(directory, &row.device_type).await?;
                debug!("Device type '{}' has been added with ID {}", row.device_type, entity.id);
                taxonomy.insert(DeviceType::new(&row.device_type, entity.id)).id()
            }
        };

        debug!("Checking device subtype '{}'", row.device_subtype);

        if let Some(subtype) = taxonomy
            .get(&row.device_type)
            .and_then(|t| t.subtype(&row.device_subtype))
        {
            debug!(
                "Device subtype '{}' already present in id list with ID {}",
                subtype.name(),
                subtype.id()
            );
            continue;
        }

        let entity =
            get_or_create_device_subtype(directory, type_id, &row.device_type, &row.device_subtype).await?;
        debug!(
            "Device subtype '{}' has been added to '{}' with ID {}",
            row.device_subtype, row.device_type, entity.id
        );

        if let Some(device_type) = taxonomy.get_mut(&row.device_type) {
            device_type.add(DeviceSubtype::new(&row.device_subtype, entity.id, type_id))?;
        }
    }

    Ok(())
}

async fn get_or_create_device_type<D>(directory: &D, name: &str) -> ImportResult<Entity>
where
    D: DirectoryService + ?Sized,
{
    let fail = |source: DirectoryError| ImportError::DeviceType {
        name: name.to_string(),
        source,
    };

    match directory.add_device_type(name).await {
        Ok(entity) => Ok(entity),
        Err(e) if e.is_already_exists() => {
            let existing = directory
                .get_entity_by_name(0, name, EntityKind::DeviceType)
                .await
                .map_err(fail)?;
            match existing {
                Some(entity) => {
                    debug!("Server says: device type '{}' already exists with ID {}", name, entity.id);
                    Ok(entity)
                }
                None => Err(fail(e)),
            }
        }
        Err(e) => Err(fail(e)),
    }
}

async fn get_or_create_device_subtype<D>(
    directory: &D,
    parent_id: EntityId,
    type_name: &str,
    name: &str,
) -> ImportResult<Entity>
where
    D: DirectoryService + ?Sized,
{
    let fail = |source: DirectoryError| ImportError::DeviceSubtype {
        name: name.to_string(),
        device_type: type_name.to_string(),
        source,
    };

    match directory.add_device_subtype(parent_id, name).await {
        Ok(entity) => Ok(entity),
        Err(e) if e.is_already_exists() => {
            let existing = directory
                .get_entity_by_name(parent_id, name, EntityKind::DeviceSubtype)
                .await
                .map_err(fail)?;
            match existing {
                Some(entity) => {
                    debug!(
                        "Device subtype '{}' already exists with ID {} and parent ID {}",
                        name, entity.id, parent_id
                    );
                    Ok(entity)
                }
                None => Err(fail(e)),
            }
        }
        Err(e) => Err(fail(e)),
    }
}

/// Validate the addresses in a row's IP cell
///
/// Returns the valid ones in order plus an error per rejected candidate.
pub fn validate_row_addresses(row: &Row) -> (Vec<Address>, Vec<ImportError>) {
    let mut valid = Vec::new();
    let mut rejected = Vec::new();

    for candidate in row.ip_candidates() {
        match Address::with_default_subnet(candidate, row.hostname.as_deref()) {
            Ok(address) => valid.push(address),
            Err(source) => {
                let error = ImportError::Address {
                    index: row.index,
                    source,
                };
                warn!("{}", error);
                rejected.push(error);
            }
        }
    }

    (valid, rejected)
}

/// Fold rows into devices unique by name
///
/// The first row carrying a name fixes the device's classification; later
/// rows only add addresses.
pub fn assemble_devices(rows: &[Row], taxonomy: &Taxonomy) -> Assembly {
    let mut assembly = Assembly::default();
    let mut by_name: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let (addresses, rejected) = validate_row_addresses(row);
        assembly.rejected_addresses.extend(rejected);

        if let Some(&position) = by_name.get(&row.name) {
            let device = &mut assembly.devices[position];

            if device.device_type() != row.device_type
                || device.device_subtype().name() != row.device_subtype
            {
                warn!(
                    "Row {}: device '{}' is already classified as {}/{}, ignoring {}/{}",
                    row.index,
                    row.name,
                    device.device_type(),
                    device.device_subtype().name(),
                    row.device_type,
                    row.device_subtype
                );
            }

            for address in addresses {
                let ip = address.ip().to_string();
                if let Err(source) = device.merge_address(&ip, address.hostname()) {
                    let error = ImportError::Address {
                        index: row.index,
                        source,
                    };
                    warn!("{}", error);
                    assembly.rejected_addresses.push(error);
                }
            }
            continue;
        }

        let built = match taxonomy.classify(&row.device_type, &row.device_subtype) {
            Some((device_type, subtype)) => Device::new(&row.name, addresses, device_type, subtype),
            None => Err(DeviceError::Unclassified {
                device_type: row.device_type.clone(),
                subtype: row.device_subtype.clone(),
            }),
        };

        match built {
            Ok(device) => {
                by_name.insert(row.name.clone(), assembly.devices.len());
                assembly.devices.push(device);
            }
            Err(source) => {
                let error = ImportError::Row {
                    index: row.index,
                    source,
                };
                warn!("{}", error);
                assembly.row_failures.push(RowFailure {
                    row: row.clone(),
                    error,
                });
            }
        }
    }

    assembly
}
