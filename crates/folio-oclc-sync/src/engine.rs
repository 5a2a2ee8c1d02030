//! Holding update engine: check-before-write set/withdraw for one record.
//!
//! WorldCat is not idempotent on blind writes, so every operation first asks
//! for the current holding state and the canonical number, then writes only
//! when the holding actually needs to change. Repeating a run for the same
//! record never applies an effect twice.

use async_trait::async_trait;
use folio_oclc_core::{CheckHoldingResult, DesiredState, HoldingUpdateResult, Operation, Record};
use tracing::{info, warn};

use crate::error::{AuthError, HoldingsError};

/// Write statuses accepted as success. 201 was returned by the previous
/// revision of the holdings API.
const SUCCESS_STATUSES: [u16; 2] = [200, 201];

const CONFLICT: u16 = 409;

/// The holdings operations the engine needs from WorldCat.
#[async_trait]
pub trait HoldingsService: Send {
    /// Current holding state and canonical number for `oclc_number`.
    async fn check_holding(
        &mut self,
        oclc_number: &str,
    ) -> Result<CheckHoldingResult, HoldingsError>;

    /// Set the institution's holding. Returns the HTTP status.
    async fn set_holding(&mut self, oclc_number: &str) -> Result<u16, HoldingsError>;

    /// Unset the institution's holding. Returns the HTTP status.
    async fn unset_holding(&mut self, oclc_number: &str) -> Result<u16, HoldingsError>;
}

/// Drives a [`HoldingsService`] to bring one record at a time into its
/// desired state.
pub struct HoldingUpdater<S> {
    service: S,
}

impl<S: HoldingsService> HoldingUpdater<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Set or withdraw the holding for `record`.
    ///
    /// API failures become a failed result. Only an authentication failure
    /// escapes, since no later record could succeed without a session.
    pub async fn update_holding(
        &mut self,
        record: &Record,
    ) -> Result<HoldingUpdateResult, AuthError> {
        let operation = record.desired_state.operation();
        let outcome = match record.desired_state {
            DesiredState::Set => self.set(record).await,
            DesiredState::Withdrawn => self.withdraw(record).await,
        };

        match outcome {
            Ok(result) => Ok(result),
            Err(HoldingsError::Auth(e)) => Err(e),
            Err(HoldingsError::Api(e)) => {
                warn!(oclc_number = %record.oclc_number, error = %e, "holding {operation} failed");
                Ok(HoldingUpdateResult::failed(
                    operation,
                    format!(
                        "Failed to {operation} holding for OCLC number {}: {e}",
                        record.oclc_number
                    ),
                ))
            }
        }
    }

    async fn set(&mut self, record: &Record) -> Result<HoldingUpdateResult, HoldingsError> {
        let requested = record.oclc_number.as_str();
        let check = self.service.check_holding(requested).await?;
        let target = check.current_oclc_number.as_deref().unwrap_or(requested);
        let label = describe(requested, target);

        if check.is_set {
            info!(oclc_number = requested, "holding already set");
            return Ok(HoldingUpdateResult::failed(
                Operation::Set,
                format!("Holding already set for {label}"),
            ));
        }

        let status = self.service.set_holding(target).await?;
        if SUCCESS_STATUSES.contains(&status) {
            info!(oclc_number = target, "holding set");
            Ok(HoldingUpdateResult::succeeded(
                Operation::Set,
                format!("Holding set for {label}"),
            ))
        } else {
            Ok(HoldingUpdateResult::failed(
                Operation::Set,
                format!("Failed to set holding for {label}: OCLC returned HTTP {status}"),
            ))
        }
    }

    async fn withdraw(&mut self, record: &Record) -> Result<HoldingUpdateResult, HoldingsError> {
        let requested = record.oclc_number.as_str();
        let check = self.service.check_holding(requested).await?;

        let Some(target) = check.current_oclc_number.as_deref() else {
            info!(oclc_number = requested, "OCLC number unknown to WorldCat");
            return Ok(HoldingUpdateResult::failed(
                Operation::Withdraw,
                format!("OCLC number {requested} is not known to WorldCat; nothing to withdraw"),
            ));
        };
        let label = describe(requested, target);

        if !check.is_set {
            info!(oclc_number = requested, "holding not set");
            return Ok(HoldingUpdateResult::failed(
                Operation::Withdraw,
                format!("Holding not set for {label}; nothing to withdraw"),
            ));
        }

        let status = self.service.unset_holding(target).await?;
        let result = match status {
            s if SUCCESS_STATUSES.contains(&s) => {
                info!(oclc_number = target, "holding withdrawn");
                HoldingUpdateResult::succeeded(
                    Operation::Withdraw,
                    format!("Holding withdrawn for {label}"),
                )
            }
            CONFLICT => HoldingUpdateResult::failed(
                Operation::Withdraw,
                format!(
                    "Failed to withdraw holding for {label}: OCLC returned HTTP {CONFLICT}; \
                     a local holdings record (LHR) is probably linked to this holding"
                ),
            ),
            s => HoldingUpdateResult::failed(
                Operation::Withdraw,
                format!("Failed to withdraw holding for {label}: OCLC returned HTTP {s}"),
            ),
        };
        Ok(result)
    }
}

/// "OCLC number 123", or "OCLC number 123 (current number 456)" when
/// WorldCat has merged the record under a new number.
fn describe(requested: &str, current: &str) -> String {
    if requested == current {
        format!("OCLC number {requested}")
    } else {
        format!("OCLC number {requested} (current number {current})")
    }
}
