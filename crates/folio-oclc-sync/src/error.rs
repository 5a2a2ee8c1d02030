use folio_oclc_core::HoldingUpdateResult;
use thiserror::Error;

/// Token acquisition or refresh failed. Fatal to the run.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("no access token held")]
    NoToken,
    #[error("token endpoint returned unusable expires_in: {0}")]
    InvalidExpiry(i64),
}

/// A batch cut short by an [`AuthError`]. Carries the results of the records
/// processed before the session was lost.
#[derive(Debug, Error)]
#[error("OCLC session lost after {} of {total} records: {source}", .completed.len())]
pub struct ReconcileError {
    pub completed: Vec<HoldingUpdateResult>,
    pub total: usize,
    #[source]
    pub source: AuthError,
}

/// A holdings check or write failed at the transport or protocol level.
/// Scoped to the record being processed.
#[derive(Debug, Error)]
pub enum OclcApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Anything a [`HoldingsService`](crate::HoldingsService) call can fail with.
#[derive(Debug, Error)]
pub enum HoldingsError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Api(#[from] OclcApiError),
}

#[derive(Debug, Error)]
pub enum FolioError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("login response carried no Okapi token")]
    MissingToken,
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}
