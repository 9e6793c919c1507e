//! Error types for import runs
//!
//! Every failure a run can report goes through [`ImportError`]. Its
//! [`is_fatal`](ImportError::is_fatal) flag decides what the caller does:
//! non-fatal errors are logged and collected, fatal errors stop the run.

use thiserror::Error;

use crate::directory::DirectoryError;
use crate::domain::{AddressError, DeviceError, TaxonomyError};
use crate::source::SourceError;

/// Errors that can occur during an import run
#[derive(Debug, Error)]
pub enum ImportError {
    /// Address dropped from a row
    #[error("Row {index}: {source}")]
    Address {
        index: usize,
        #[source]
        source: AddressError,
    },

    /// Row that did not produce a device
    #[error("Row {index}: {source}")]
    Row {
        index: usize,
        #[source]
        source: DeviceError,
    },

    /// Device that could not be written to the directory
    #[error("Error creating device '{name}': {source}")]
    Push {
        name: String,
        #[source]
        source: DirectoryError,
    },

    /// Directory could not be reached or rejected the credentials
    #[error("Could not initialize address manager client, check the service is running and credentials are correct: {0}")]
    Connection(#[source] DirectoryError),

    /// Named configuration missing on the server
    #[error("Configuration '{0}' not found on the address manager")]
    ConfigurationNotFound(String),

    /// Server has no configurations at all
    #[error("No configurations present on the address manager")]
    NoConfigurations,

    /// Device type could not be resolved for a reason other than "already exists"
    #[error("Device type '{name}' failed to be added: {source}")]
    DeviceType {
        name: String,
        #[source]
        source: DirectoryError,
    },

    /// Device subtype could not be resolved for a reason other than "already exists"
    #[error("Device subtype '{name}' failed to be added to '{device_type}': {source}")]
    DeviceSubtype {
        name: String,
        device_type: String,
        #[source]
        source: DirectoryError,
    },

    /// Local taxonomy rejected a resolved subtype
    #[error("Inconsistent taxonomy: {0}")]
    Taxonomy(#[from] TaxonomyError),

    /// Input file could not be read
    #[error("Could not read input rows: {0}")]
    Source(#[from] SourceError),

    /// Bad command line or connection settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other directory failure
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl ImportError {
    /// Fatal errors end the run; everything else is reported and skipped
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Address { .. } | Self::Row { .. } | Self::Push { .. }
        )
    }
}

/// Result type for import operations
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_level_errors_are_not_fatal() {
        let err = ImportError::Address {
            index: 3,
            source: AddressError::InvalidIp("256.1.1.1".to_string()),
        };
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Row 3: IP '256.1.1.1' is not a valid IPv4 address");

        let err = ImportError::Row {
            index: 4,
            source: DeviceError::NoAddresses("r1".to_string()),
        };
        assert!(!err.is_fatal());

        let err = ImportError::Push {
            name: "r1".to_string(),
            source: DirectoryError::Api("boom".to_string()),
        };
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_infrastructure_errors_are_fatal() {
        assert!(ImportError::NoConfigurations.is_fatal());
        assert!(ImportError::ConfigurationNotFound("Test".to_string()).is_fatal());
        assert!(ImportError::Connection(DirectoryError::Unavailable("down".to_string())).is_fatal());
        assert!(ImportError::DeviceType {
            name: "Router".to_string(),
            source: DirectoryError::Unavailable("down".to_string()),
        }
        .is_fatal());
        assert!(ImportError::Config("bad".to_string()).is_fatal());
    }
}
