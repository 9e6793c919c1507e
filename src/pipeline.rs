// Copyright (c) 2025 - Cowboy AI, Inc.
//! Import run
//!
//! Drives one import end to end:
//!
//! 1. log in and select the configuration
//! 2. read and reconcile rows (taxonomy get-or-create, device assembly)
//! 3. push devices
//!
//! Any fatal error is returned to the caller; the [`Importer`] keeps what it
//! had built so far so the caller can dump it before exiting.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::BamConfig;
use crate::directory::{DirectoryService, Entity};
use crate::domain::EntityId;
use crate::errors::{ImportError, ImportResult};
use crate::push::{push_devices, PushReport};
use crate::reconcile::{reconcile, ReconcileStats, Reconciliation};
use crate::source::RowSource;

/// Counters reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub reconcile: ReconcileStats,
    pub created: usize,
    pub duplicates: usize,
    pub push_failures: usize,
}

impl RunSummary {
    /// Non-fatal problems seen during the run
    pub fn problems(&self) -> usize {
        self.reconcile.row_failures + self.reconcile.rejected_addresses + self.push_failures
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows, {} device types, {} devices ({} created, {} already present, {} failed), {} rows skipped, {} addresses rejected",
            self.reconcile.rows,
            self.reconcile.device_types,
            self.reconcile.devices,
            self.created,
            self.duplicates,
            self.push_failures,
            self.reconcile.row_failures,
            self.reconcile.rejected_addresses
        )
    }
}

/// Find the configuration called `name`
pub async fn select_configuration<D>(directory: &D, name: &str) -> ImportResult<Entity>
where
    D: DirectoryService + ?Sized,
{
    let configurations = directory.list_configurations().await?;
    if configurations.is_empty() {
        return Err(ImportError::NoConfigurations);
    }

    configurations
        .into_iter()
        .find(|c| c.name.as_deref() == Some(name))
        .ok_or_else(|| ImportError::ConfigurationNotFound(name.to_string()))
}

/// State of one import run
pub struct Importer<D> {
    directory: D,
    configuration_id: Option<EntityId>,
    reconciliation: Option<Reconciliation>,
    report: Option<PushReport>,
}

impl<D: DirectoryService> Importer<D> {
    pub fn new(directory: D) -> Self {
        Self {
            directory,
            configuration_id: None,
            reconciliation: None,
            report: None,
        }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn reconciliation(&self) -> Option<&Reconciliation> {
        self.reconciliation.as_ref()
    }

    pub fn report(&self) -> Option<&PushReport> {
        self.report.as_ref()
    }

    /// Log in and select the configuration
    pub async fn connect(&mut self, config: &BamConfig) -> ImportResult<EntityId> {
        self.directory
            .login(&config.username, &config.password)
            .await
            .map_err(ImportError::Connection)?;

        let configuration = select_configuration(&self.directory, &config.configuration).await?;
        info!(
            "Using configuration '{}' (ID {})",
            config.configuration, configuration.id
        );

        self.configuration_id = Some(configuration.id);
        Ok(configuration.id)
    }

    /// Read rows and build the taxonomy and device list
    pub async fn reconcile<S>(&mut self, source: &S) -> ImportResult<&Reconciliation>
    where
        S: RowSource + ?Sized,
    {
        let reconciliation = reconcile(&self.directory, source).await?;

        for failure in &reconciliation.row_failures {
            debug!("Row {} skipped: {:?}", failure.row.index, failure.row);
        }

        Ok(&*self.reconciliation.insert(reconciliation))
    }

    /// Push the reconciled devices
    pub async fn push(&mut self) -> ImportResult<&PushReport> {
        let configuration_id = self
            .configuration_id
            .ok_or_else(|| ImportError::Config("No configuration selected".to_string()))?;

        let devices = self
            .reconciliation
            .as_ref()
            .map(|r| r.devices.as_slice())
            .unwrap_or_default();

        let report = push_devices(&self.directory, configuration_id, devices).await;
        Ok(&*self.report.insert(report))
    }

    /// connect → reconcile → push
    pub async fn run<S>(&mut self, config: &BamConfig, source: &S) -> ImportResult<RunSummary>
    where
        S: RowSource + ?Sized,
    {
        self.connect(config).await?;
        self.reconcile(source).await?;
        self.push().await?;

        let summary = self.summary();
        if summary.problems() > 0 {
            warn!("Import finished with problems: {}", summary);
        } else {
            info!("Import finished: {}", summary);
        }
        Ok(summary)
    }

    pub fn summary(&self) -> RunSummary {
        let reconcile = self
            .reconciliation
            .as_ref()
            .map(Reconciliation::stats)
            .unwrap_or_default();

        let (created, duplicates, push_failures) = self.report.as_ref().map_or((0, 0, 0), |r| {
            (r.created.len(), r.duplicates.len(), r.failures.len())
        });

        RunSummary {
            reconcile,
            created,
            duplicates,
            push_failures,
        }
    }

    /// Debug-level dump of everything the run has built
    pub fn dump_state(&self) {
        debug!("-----------------");
        debug!("Begin state dump");
        debug!("-----------------");
        debug!("Configuration ID: {:?}", self.configuration_id);

        match &self.reconciliation {
            Some(reconciliation) => {
                debug!("Device types:");
                for device_type in reconciliation.taxonomy.types() {
                    debug!("\t{}:", device_type);
                    let mut subtypes: Vec<_> = device_type.subtypes().values().collect();
                    subtypes.sort_by(|a, b| a.name().cmp(b.name()));
                    for subtype in subtypes {
                        debug!("\t\t{}", subtype);
                    }
                }

                debug!("Devices:");
                for device in &reconciliation.devices {
                    debug!(
                        "\t{} [{}/{}]: {}",
                        device.name(),
                        device.device_type(),
                        device.device_subtype().name(),
                        device.joined_addresses()
                    );
                }

                debug!("Row errors:");
                for failure in &reconciliation.row_failures {
                    debug!("\t{}", failure.error);
                }
            }
            None => debug!("\tNo rows were reconciled"),
        }

        if let Some(report) = &self.report {
            debug!("Push failures:");
            for failure in &report.failures {
                debug!("\t{}", failure);
            }
        }

        debug!("---------------");
        debug!("End state dump");
        debug!("---------------");
    }
}
