// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for bam-device-import
//!
//! Deterministic rows and directories shared by the integration tests.

#![allow(dead_code)]

use bam_device_import::directory::{DirectoryService, InMemoryDirectory};
use bam_device_import::{BamConfig, RawRow};

pub const USERNAME: &str = "api";
pub const PASSWORD: &str = "secret";
pub const CONFIGURATION: &str = "Test";

/// Raw row with every cell present
pub fn raw_row(index: usize, name: &str, ip: &str, device_type: &str, device_subtype: &str) -> RawRow {
    RawRow {
        index,
        name: Some(name.to_string()),
        ip: Some(ip.to_string()),
        device_type: Some(device_type.to_string()),
        device_subtype: Some(device_subtype.to_string()),
        hostname: None,
    }
}

/// Two rows for the same router, then a switch
pub fn router_rows() -> Vec<RawRow> {
    vec![
        raw_row(0, "r1", "10.0.0.1", "Router", "Edge"),
        raw_row(1, "r1", "10.0.0.2", "Router", "Edge"),
        raw_row(2, "s1", "10.0.1.10", "Switch", "Access"),
    ]
}

pub fn bam_config() -> BamConfig {
    BamConfig {
        base_url: "http://bam.example.com".to_string(),
        username: USERNAME.to_string(),
        password: PASSWORD.to_string(),
        configuration: CONFIGURATION.to_string(),
        ..BamConfig::default()
    }
}

/// Directory holding the test configuration, credentials enforced
pub fn directory() -> InMemoryDirectory {
    InMemoryDirectory::new()
        .with_credentials(USERNAME, PASSWORD)
        .with_configuration(CONFIGURATION)
}

/// [`directory`] with a session already open
pub async fn logged_in(directory: InMemoryDirectory) -> InMemoryDirectory {
    let mut directory = directory;
    directory
        .login(USERNAME, PASSWORD)
        .await
        .expect("fixture credentials are accepted");
    directory
}
