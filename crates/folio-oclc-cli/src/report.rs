//! Plain-text email summary of a reconciliation run.
//!
//! Results are grouped by (operation, outcome) into labelled sections, in a
//! fixed order; empty sections are left out.

use chrono::{DateTime, Local};
use folio_oclc_core::{HoldingUpdateResult, Operation};
use folio_oclc_sync::ReconcileError;

const SECTIONS: &[(Operation, bool, &str)] = &[
    (Operation::Set, true, "Successfully Set"),
    (Operation::Set, false, "Failure to Set"),
    (Operation::Withdraw, true, "Successfully Withdrawn"),
    (Operation::Withdraw, false, "Failure to Withdraw"),
];

pub struct Summary {
    pub subject: String,
    pub body: String,
    pub successes: usize,
    pub failures: usize,
}

impl Summary {
    pub fn from_results(
        results: &[HoldingUpdateResult],
        job_description: &str,
        at: DateTime<Local>,
    ) -> Self {
        let mut body = job_description.to_string();
        for &(operation, success, heading) in SECTIONS {
            let section: Vec<&HoldingUpdateResult> = results
                .iter()
                .filter(|r| r.operation == operation && r.success == success)
                .collect();
            if section.is_empty() {
                continue;
            }
            body.push_str(&format!("\n\n{heading}:"));
            for result in section {
                body.push_str(&format!("\n- {result}"));
            }
        }

        let successes = results.iter().filter(|r| r.success).count();
        let failures = results.len() - successes;
        let subject = format!(
            "Holdings to OCLC: {failures} failure(s) and {successes} success(es) at {}",
            at.format("%Y-%m-%d %H:%M:%S")
        );

        Self {
            subject,
            body,
            successes,
            failures,
        }
    }

    /// Summary of a batch cut short by a lost session: the records finished
    /// before the abort, with the reason under the job description.
    pub fn aborted(err: &ReconcileError, job_description: &str, at: DateTime<Local>) -> Self {
        let description = format!("{job_description}\nRun aborted: {err}");
        Self::from_results(&err.completed, &description, at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2022, 1, 11, 6, 0, 0).unwrap()
    }

    fn ok(op: Operation, msg: &str) -> HoldingUpdateResult {
        HoldingUpdateResult::succeeded(op, msg)
    }

    fn fail(op: Operation, msg: &str) -> HoldingUpdateResult {
        HoldingUpdateResult::failed(op, msg)
    }

    #[test]
    fn groups_results_into_sections_in_order() {
        let results = vec![
            fail(Operation::Withdraw, "Holding not set for OCLC number 3"),
            ok(Operation::Set, "Holding set for OCLC number 1"),
            fail(Operation::Set, "Holding already set for OCLC number 2"),
            ok(Operation::Set, "Holding set for OCLC number 4"),
        ];

        let summary = Summary::from_results(&results, "Holdings for 2022-01-10.", at());

        assert_eq!(
            summary.body,
            "Holdings for 2022-01-10.\
             \n\nSuccessfully Set:\
             \n- Holding set for OCLC number 1\
             \n- Holding set for OCLC number 4\
             \n\nFailure to Set:\
             \n- Holding already set for OCLC number 2\
             \n\nFailure to Withdraw:\
             \n- Holding not set for OCLC number 3"
        );
        assert_eq!(summary.successes, 2);
        assert_eq!(summary.failures, 2);
    }

    #[test]
    fn subject_counts_failures_and_successes() {
        let results = vec![
            ok(Operation::Withdraw, "Holding withdrawn for OCLC number 5"),
            fail(Operation::Set, "Failed to set holding for OCLC number 6"),
            fail(Operation::Withdraw, "Failed to withdraw holding for OCLC number 7"),
        ];

        let summary = Summary::from_results(&results, "job", at());

        assert_eq!(
            summary.subject,
            "Holdings to OCLC: 2 failure(s) and 1 success(es) at 2022-01-11 06:00:00"
        );
        assert!(summary.body.contains("Successfully Withdrawn:"));
    }

    #[test]
    fn empty_run_still_summarised() {
        let summary = Summary::from_results(&[], "Nothing changed.", at());
        assert_eq!(summary.body, "Nothing changed.");
        assert!(summary.subject.starts_with("Holdings to OCLC: 0 failure(s) and 0 success(es)"));
    }

    #[test]
    fn aborted_run_reports_completed_records_and_reason() {
        let err = ReconcileError {
            completed: vec![ok(Operation::Set, "Holding set for OCLC number 1")],
            total: 3,
            source: folio_oclc_sync::AuthError::NoToken,
        };

        let summary = Summary::aborted(&err, "Holdings for 2022-01-10.", at());

        assert_eq!(
            summary.body,
            "Holdings for 2022-01-10.\
             \nRun aborted: OCLC session lost after 1 of 3 records: no access token held\
             \n\nSuccessfully Set:\
             \n- Holding set for OCLC number 1"
        );
        assert_eq!(summary.successes, 1);
        assert_eq!(summary.failures, 0);
    }
}
