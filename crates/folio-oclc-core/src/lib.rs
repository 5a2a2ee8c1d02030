//! Shared holding types, OCLC number normalisation, and run configuration.

pub mod config;
pub mod holding;
pub mod oclc_number;

pub use config::{Config, ConfigError};
pub use holding::{
    CheckHoldingResult, DesiredState, HoldingRequest, HoldingUpdateResult, Operation, Record,
};
pub use oclc_number::{MalformedIdentifierError, OclcNumber};
