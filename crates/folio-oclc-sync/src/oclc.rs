//! OCLC WorldCat Metadata API client: client-credentials session and the
//! institution holdings endpoints (current-number check, set, unset).

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use folio_oclc_core::CheckHoldingResult;
use folio_oclc_core::config::OclcConfig;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::engine::HoldingsService;
use crate::error::{AuthError, HoldingsError, OclcApiError};

pub const SCOPE: &str = "WorldCatMetadataAPI";

/// Tokens expiring within this window are refreshed before use.
const REFRESH_BUFFER_SECS: i64 = 60;

/// Assumed lifetime when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 1200;

const HOLDINGS_PATH: &str = "/worldcat/manage/institution/holdings";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// OAuth2 client-credentials session against the OCLC token endpoint.
///
/// Owns the single bearer token for the run and refreshes it in place.
/// Callers hold it by `&mut`, so refreshes never race.
pub struct OclcSession {
    http: reqwest::Client,
    token_url: String,
    ws_key: String,
    secret: String,
    token: Option<AccessToken>,
}

impl fmt::Debug for OclcSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OclcSession")
            .field("token_url", &self.token_url)
            .field("ws_key", &self.ws_key)
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.token.as_ref().map(|t| t.expires_at))
            .finish()
    }
}

impl OclcSession {
    pub fn new(config: &OclcConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            token_url: config.token_url.clone(),
            ws_key: config.ws_key.clone(),
            secret: config.secret.clone(),
            token: None,
        }
    }

    /// Request a fresh token, replacing any held one.
    pub async fn acquire(&mut self) -> Result<(), AuthError> {
        debug!(token_url = %self.token_url, "requesting OCLC access token");
        let resp = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.ws_key, Some(&self.secret))
            .header(ACCEPT, "application/json")
            .form(&[("grant_type", "client_credentials"), ("scope", SCOPE)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = resp.json().await?;
        let lifetime = token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let expires_at = expiry_after(Utc::now(), lifetime)?;
        info!(%expires_at, "acquired OCLC access token");

        self.token = Some(AccessToken {
            value: token.access_token,
            expires_at,
        });
        Ok(())
    }

    /// Re-acquire the token if it is missing or expires within the refresh
    /// buffer. No-op otherwise.
    pub async fn ensure_fresh(&mut self) -> Result<(), AuthError> {
        if self.needs_refresh(Utc::now()) {
            debug!("OCLC access token missing or near expiry, refreshing");
            self.acquire().await?;
        }
        Ok(())
    }

    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match &self.token {
            Some(token) => token
                .expires_at
                .checked_sub_signed(TimeDelta::seconds(REFRESH_BUFFER_SECS))
                .is_none_or(|refresh_at| refresh_at <= now),
            None => true,
        }
    }

    /// Fresh bearer token for the next request.
    async fn bearer(&mut self) -> Result<String, AuthError> {
        self.ensure_fresh().await?;
        self.token
            .as_ref()
            .map(|token| token.value.clone())
            .ok_or(AuthError::NoToken)
    }
}

/// `now + lifetime_secs`, or an error when the lifetime is outside what
/// `DateTime<Utc>` can represent.
fn expiry_after(now: DateTime<Utc>, lifetime_secs: i64) -> Result<DateTime<Utc>, AuthError> {
    TimeDelta::try_seconds(lifetime_secs)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or(AuthError::InvalidExpiry(lifetime_secs))
}

#[derive(Deserialize)]
struct CurrentHoldingsResponse {
    #[serde(default)]
    holdings: Vec<CurrentHolding>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentHolding {
    #[serde(default)]
    current_control_number: Option<String>,
    #[serde(default)]
    holding_set: bool,
}

/// Holdings client for one institution, authenticated by an [`OclcSession`].
#[derive(Debug)]
pub struct OclcClient {
    http: reqwest::Client,
    service_url: String,
    session: OclcSession,
}

impl OclcClient {
    /// Create a client. No token is requested until [`connect`](Self::connect)
    /// or the first call.
    pub fn new(config: &OclcConfig, http: reqwest::Client) -> Self {
        Self {
            session: OclcSession::new(config, http.clone()),
            service_url: config.service_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Create a client and acquire its first token. A credential problem
    /// surfaces here, before any record is touched.
    pub async fn connect(config: &OclcConfig, http: reqwest::Client) -> Result<Self, AuthError> {
        let mut client = Self::new(config, http);
        client.session.acquire().await?;
        Ok(client)
    }

    async fn post_action(
        &mut self,
        oclc_number: &str,
        action: &str,
    ) -> Result<u16, HoldingsError> {
        let url = format!("{}{HOLDINGS_PATH}/{oclc_number}/{action}", self.service_url);
        let bearer = self.session.bearer().await?;

        debug!(url = %url, "posting holding {action}");
        let resp = self
            .http
            .post(&url)
            .bearer_auth(bearer)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(OclcApiError::from)?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(oclc_number, status, body = %body, "holding {action} rejected");
        }
        Ok(status)
    }
}

#[async_trait]
impl HoldingsService for OclcClient {
    async fn check_holding(
        &mut self,
        oclc_number: &str,
    ) -> Result<CheckHoldingResult, HoldingsError> {
        let url = format!("{}{HOLDINGS_PATH}/current", self.service_url);
        let bearer = self.session.bearer().await?;

        let resp = self
            .http
            .get(&url)
            .query(&[("oclcNumbers", oclc_number)])
            .bearer_auth(bearer)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(OclcApiError::from)?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            info!(oclc_number, "OCLC number not found");
            return Ok(CheckHoldingResult::unknown());
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OclcApiError::Server {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let body = resp.text().await.map_err(OclcApiError::from)?;
        let parsed: CurrentHoldingsResponse =
            serde_json::from_str(&body).map_err(OclcApiError::from)?;

        let result = match parsed.holdings.into_iter().next() {
            Some(CurrentHolding {
                current_control_number: Some(current),
                holding_set,
            }) => CheckHoldingResult {
                is_set: holding_set,
                current_oclc_number: Some(current),
            },
            _ => CheckHoldingResult::unknown(),
        };
        debug!(
            oclc_number,
            is_set = result.is_set,
            current = ?result.current_oclc_number,
            "checked holding"
        );
        Ok(result)
    }

    async fn set_holding(&mut self, oclc_number: &str) -> Result<u16, HoldingsError> {
        self.post_action(oclc_number, "set").await
    }

    async fn unset_holding(&mut self, oclc_number: &str) -> Result<u16, HoldingsError> {
        self.post_action(oclc_number, "unset").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OclcConfig {
        OclcConfig {
            ws_key: "key".into(),
            secret: "shh".into(),
            token_url: "http://localhost:1/token".into(),
            service_url: "http://localhost:1/".into(),
        }
    }

    fn session_with_expiry(expires_at: DateTime<Utc>) -> OclcSession {
        let mut session = OclcSession::new(&config(), reqwest::Client::new());
        session.token = Some(AccessToken {
            value: "tok".into(),
            expires_at,
        });
        session
    }

    #[test]
    fn no_token_needs_refresh() {
        let session = OclcSession::new(&config(), reqwest::Client::new());
        assert!(session.needs_refresh(Utc::now()));
    }

    #[test]
    fn token_inside_buffer_needs_refresh() {
        let now = Utc::now();
        let session = session_with_expiry(now + TimeDelta::seconds(59));
        assert!(session.needs_refresh(now));
        let session = session_with_expiry(now + TimeDelta::seconds(60));
        assert!(session.needs_refresh(now));
    }

    #[test]
    fn token_outside_buffer_is_fresh() {
        let now = Utc::now();
        let session = session_with_expiry(now + TimeDelta::seconds(61));
        assert!(!session.needs_refresh(now));
    }

    #[test]
    fn out_of_range_lifetime_is_auth_error() {
        let now = Utc::now();
        assert!(matches!(
            expiry_after(now, i64::MAX),
            Err(AuthError::InvalidExpiry(i64::MAX))
        ));
        assert!(matches!(
            expiry_after(DateTime::<Utc>::MAX_UTC, 1),
            Err(AuthError::InvalidExpiry(1))
        ));
        assert_eq!(
            expiry_after(now, 1200).unwrap(),
            now + TimeDelta::seconds(1200)
        );
    }

    #[test]
    fn token_at_earliest_instant_needs_refresh() {
        let session = session_with_expiry(DateTime::<Utc>::MIN_UTC);
        assert!(session.needs_refresh(Utc::now()));
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = OclcClient::new(&config(), reqwest::Client::new());
        assert_eq!(client.service_url, "http://localhost:1");
    }

    #[test]
    fn debug_redacts_secret_and_token() {
        let session = session_with_expiry(Utc::now());
        let dbg = format!("{session:?}");
        assert!(!dbg.contains("shh"));
        assert!(!dbg.contains("tok\""));
        assert!(dbg.contains("[REDACTED]"));
    }
}
