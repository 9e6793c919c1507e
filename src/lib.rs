//! Device inventory import for BlueCat Address Manager
//!
//! Reads device rows from a spreadsheet, validates their addresses, resolves
//! the device type taxonomy, and creates blocks, networks, and devices in the
//! address manager.
//!
//! ```text
//! RowSource ──normalize──> Reconciler ──> Taxonomy + [Device] ──push──> DirectoryService
//! ```

pub mod config;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod pipeline;
pub mod push;
pub mod reconcile;
pub mod source;

// Re-export commonly used types
pub use config::{BamConfig, RunConfig};
pub use directory::{DirectoryError, DirectoryService, EntityKind, InMemoryDirectory};
pub use domain::{Address, Device, DeviceSubtype, DeviceType, Taxonomy};
pub use errors::{ImportError, ImportResult};
pub use pipeline::{Importer, RunSummary};
pub use source::{CsvRowSource, RawRow, Row, RowSource};
