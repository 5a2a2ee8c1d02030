//! Batch reconciliation: run every request through the update engine, in order.

use folio_oclc_core::{HoldingRequest, HoldingUpdateResult};
use tracing::{info, warn};

use crate::engine::{HoldingUpdater, HoldingsService};
use crate::error::ReconcileError;

/// Process `requests` sequentially and return one result per request, in
/// input order.
///
/// A malformed identifier or a failing OCLC call only fails its own record.
/// An authentication failure aborts the batch; the error keeps the results
/// gathered so far.
pub async fn reconcile<S: HoldingsService>(
    updater: &mut HoldingUpdater<S>,
    requests: &[HoldingRequest],
) -> Result<Vec<HoldingUpdateResult>, ReconcileError> {
    info!(count = requests.len(), "reconciling holdings");
    let mut results = Vec::with_capacity(requests.len());

    for request in requests {
        let result = match request.to_record() {
            Ok(record) => match updater.update_holding(&record).await {
                Ok(result) => result,
                Err(source) => {
                    warn!(
                        completed = results.len(),
                        total = requests.len(),
                        "OCLC session lost, aborting batch"
                    );
                    return Err(ReconcileError {
                        completed: results,
                        total: requests.len(),
                        source,
                    });
                }
            },
            Err(e) => {
                warn!(raw = %request.raw_oclc_number, "skipping malformed OCLC number");
                let operation = request.desired_state.operation();
                HoldingUpdateResult::failed(operation, format!("Failed to {operation} holding: {e}"))
            }
        };
        results.push(result);
    }

    let succeeded = results.iter().filter(|r| r.success).count();
    info!(
        succeeded,
        failed = results.len() - succeeded,
        "reconciliation complete"
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::FakeHoldings;
    use folio_oclc_core::{DesiredState, Operation};

    #[tokio::test]
    async fn empty_batch_yields_no_results() {
        let mut updater = HoldingUpdater::new(FakeHoldings::default());
        let results = reconcile(&mut updater, &[]).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn one_result_per_request_in_order() {
        let fake = FakeHoldings::default()
            .with("12345", false, Some("12345"))
            .with("67890", false, Some("67890"));
        let mut updater = HoldingUpdater::new(fake);
        let requests = vec![
            HoldingRequest::new("12345", DesiredState::Set),
            HoldingRequest::new("0067890", DesiredState::Withdrawn),
        ];

        let results = reconcile(&mut updater, &requests).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert_eq!(results[0].operation, Operation::Set);
        assert!(!results[1].success);
        assert_eq!(results[1].operation, Operation::Withdraw);
        assert!(results[1].message.contains("not set"));
        assert!(results[1].message.contains("67890"));
        assert_eq!(
            updater.service().calls,
            vec!["check 12345", "set 12345", "check 67890"]
        );
    }

    #[tokio::test]
    async fn failing_record_does_not_stop_batch() {
        let mut fake = FakeHoldings::default()
            .with("1", false, Some("1"))
            .with("3", true, Some("3"));
        fake.broken.insert("2".into());
        let mut updater = HoldingUpdater::new(fake);
        let requests = vec![
            HoldingRequest::new("1", DesiredState::Set),
            HoldingRequest::new("2", DesiredState::Set),
            HoldingRequest::new("3", DesiredState::Withdrawn),
        ];

        let results = reconcile(&mut updater, &requests).await.unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[2].success);
    }

    #[tokio::test]
    async fn malformed_identifier_fails_without_network_call() {
        let fake = FakeHoldings::default().with("9", false, Some("9"));
        let mut updater = HoldingUpdater::new(fake);
        let requests = vec![
            HoldingRequest::new("(OCoLC)", DesiredState::Withdrawn),
            HoldingRequest::new("9", DesiredState::Set),
        ];

        let results = reconcile(&mut updater, &requests).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(!results[0].success);
        assert_eq!(results[0].operation, Operation::Withdraw);
        assert!(results[0].message.contains("(OCoLC)"));
        assert!(results[1].success);
        assert_eq!(updater.service().calls, vec!["check 9", "set 9"]);
    }

    #[tokio::test]
    async fn auth_failure_aborts_batch() {
        let fake = FakeHoldings {
            auth_broken: true,
            ..Default::default()
        };
        let mut updater = HoldingUpdater::new(fake);
        let requests = vec![
            HoldingRequest::new("1", DesiredState::Set),
            HoldingRequest::new("2", DesiredState::Set),
        ];

        let err = reconcile(&mut updater, &requests).await.unwrap_err();
        assert!(err.completed.is_empty());
        assert_eq!(err.total, 2);
        assert_eq!(updater.service().calls, vec!["check 1"]);
    }

    #[tokio::test]
    async fn auth_failure_keeps_completed_results() {
        let mut fake = FakeHoldings::default()
            .with("1", false, Some("1"))
            .with("3", false, Some("3"));
        fake.auth_broken_for.insert("2".into());
        let mut updater = HoldingUpdater::new(fake);
        let requests = vec![
            HoldingRequest::new("1", DesiredState::Set),
            HoldingRequest::new("2", DesiredState::Set),
            HoldingRequest::new("3", DesiredState::Set),
        ];

        let err = reconcile(&mut updater, &requests).await.unwrap_err();

        assert_eq!(err.completed.len(), 1);
        assert!(err.completed[0].success);
        assert_eq!(err.completed[0].operation, Operation::Set);
        assert_eq!(err.total, 3);
        assert!(matches!(err.source, crate::AuthError::NoToken));
        assert!(err.to_string().starts_with("OCLC session lost after 1 of 3 records"));
        assert_eq!(updater.service().calls, vec!["check 1", "set 1", "check 2"]);
    }
}
