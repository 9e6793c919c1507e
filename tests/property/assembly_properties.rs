// Copyright (c) 2025 - Cowboy AI, Inc.
//! Device assembly invariants

use bam_device_import::domain::{DeviceSubtype, DeviceType, Taxonomy};
use bam_device_import::reconcile::assemble_devices;
use bam_device_import::Row;
use proptest::prelude::*;
use std::collections::HashSet;

fn taxonomy() -> Taxonomy {
    let mut taxonomy = Taxonomy::new();
    let router = taxonomy.insert(DeviceType::new("Router", 1));
    router.add(DeviceSubtype::new("Edge", 2, 1)).unwrap();
    taxonomy
}

fn row_strategy() -> impl Strategy<Value = (usize, u8)> {
    (0usize..5, any::<u8>())
}

proptest! {
    /// Device names are unique and every valid address lands on exactly one device
    #[test]
    fn prop_devices_unique_by_name(cells in prop::collection::vec(row_strategy(), 1..40)) {
        let rows: Vec<Row> = cells
            .iter()
            .enumerate()
            .map(|(index, (name, octet))| Row {
                index,
                name: format!("dev{}", name),
                ip: format!("10.1.0.{}", octet),
                device_type: "Router".to_string(),
                device_subtype: "Edge".to_string(),
                hostname: None,
            })
            .collect();

        let assembly = assemble_devices(&rows, &taxonomy());

        let names: HashSet<_> = assembly.devices.iter().map(|d| d.name()).collect();
        prop_assert_eq!(names.len(), assembly.devices.len());

        let distinct: HashSet<_> = cells.iter().map(|(name, _)| *name).collect();
        prop_assert_eq!(assembly.devices.len(), distinct.len());

        let addresses: usize = assembly.devices.iter().map(|d| d.addresses().len()).sum();
        prop_assert_eq!(addresses, rows.len());
        prop_assert!(assembly.row_failures.is_empty());
        prop_assert!(assembly.rejected_addresses.is_empty());
    }
}
