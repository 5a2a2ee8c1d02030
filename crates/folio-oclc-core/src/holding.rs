//! Holding types shared between the FOLIO source, the OCLC engine, and reporting.

use std::fmt;

use crate::oclc_number::{MalformedIdentifierError, OclcNumber};

/// What the institution's WorldCat holding should look like after the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DesiredState {
    Set,
    Withdrawn,
}

impl DesiredState {
    /// The OCLC operation that moves a holding into this state.
    pub fn operation(self) -> Operation {
        match self {
            Self::Set => Operation::Set,
            Self::Withdrawn => Operation::Withdraw,
        }
    }
}

/// OCLC holding operation attempted for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Set,
    Withdraw,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work as supplied by a record source: a raw identifier
/// straight from FOLIO (or the test list) plus the state it should reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldingRequest {
    pub raw_oclc_number: String,
    pub desired_state: DesiredState,
}

impl HoldingRequest {
    pub fn new(raw_oclc_number: impl Into<String>, desired_state: DesiredState) -> Self {
        Self {
            raw_oclc_number: raw_oclc_number.into(),
            desired_state,
        }
    }

    /// Normalise the raw identifier into a [`Record`].
    pub fn to_record(&self) -> Result<Record, MalformedIdentifierError> {
        Ok(Record {
            oclc_number: OclcNumber::parse(&self.raw_oclc_number)?,
            desired_state: self.desired_state,
        })
    }
}

/// A normalised record ready for the update engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub oclc_number: OclcNumber,
    pub desired_state: DesiredState,
}

/// Current WorldCat holding state for a queried number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckHoldingResult {
    pub is_set: bool,
    /// Canonical number WorldCat considers authoritative. Differs from the
    /// queried number when records were merged; `None` when unknown.
    pub current_oclc_number: Option<String>,
}

impl CheckHoldingResult {
    pub fn unknown() -> Self {
        Self {
            is_set: false,
            current_oclc_number: None,
        }
    }
}

/// Outcome of one set/withdraw attempt. Displays as its message, which is
/// what ends up in the emailed summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldingUpdateResult {
    pub operation: Operation,
    pub success: bool,
    pub message: String,
}

impl HoldingUpdateResult {
    pub fn succeeded(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            operation,
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            operation,
            success: false,
            message: message.into(),
        }
    }
}

impl fmt::Display for HoldingUpdateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
