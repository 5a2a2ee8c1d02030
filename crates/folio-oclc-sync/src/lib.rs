//! Sync layer: OCLC holdings session and update engine, batch reconciliation,
//! and the FOLIO instance source.

use std::time::Duration;

pub mod engine;
pub mod error;
pub mod folio;
pub mod oclc;
pub mod reconcile;

pub use engine::{HoldingUpdater, HoldingsService};
pub use error::{AuthError, FolioError, HoldingsError, OclcApiError, ReconcileError};
pub use folio::FolioClient;
pub use oclc::OclcClient;
pub use reconcile::reconcile;

/// HTTP client shared by the OCLC and FOLIO clients, with an explicit
/// per-request timeout.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("folio-oclc/", env!("CARGO_PKG_VERSION")))
        .build()
}
