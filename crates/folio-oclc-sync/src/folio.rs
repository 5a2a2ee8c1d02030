//! FOLIO Okapi client: finds instances whose status changed on a given date
//! and turns them into holding requests.

use chrono::NaiveDate;
use folio_oclc_core::config::FolioConfig;
use folio_oclc_core::{DesiredState, HoldingRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::FolioError;

const TENANT_HEADER: &str = "x-okapi-tenant";
const TOKEN_HEADER: &str = "x-okapi-token";

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(default)]
    okapi_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstancesResponse {
    #[serde(default)]
    instances: Vec<Instance>,
    #[serde(default)]
    total_records: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct Instance {
    #[serde(default)]
    id: String,
    #[serde(default)]
    identifiers: Vec<Identifier>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Identifier {
    identifier_type_id: String,
    value: String,
}

/// Inventory client for one FOLIO tenant.
pub struct FolioClient {
    http: reqwest::Client,
    okapi_url: String,
    config: FolioConfig,
    token: Option<String>,
}

impl FolioClient {
    pub fn new(config: FolioConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            okapi_url: config.okapi_url.trim_end_matches('/').to_string(),
            config,
            token: None,
        }
    }

    /// Log in and keep the Okapi token for later requests.
    pub async fn login(&mut self) -> Result<(), FolioError> {
        let url = format!("{}/authn/login", self.okapi_url);
        info!(url = %url, tenant = %self.config.tenant_id, "logging in to FOLIO");

        let resp = self
            .http
            .post(&url)
            .header(TENANT_HEADER, &self.config.tenant_id)
            .json(&LoginRequest {
                username: &self.config.username,
                password: &self.config.password,
            })
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FolioError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let header_token = resp
            .headers()
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let token = match header_token {
            Some(token) => token,
            None => {
                let body = resp.text().await?;
                let parsed: LoginResponse = serde_json::from_str(&body)?;
                parsed.okapi_token.ok_or(FolioError::MissingToken)?
            }
        };

        self.token = Some(token);
        Ok(())
    }

    /// Holding requests for every instance whose status changed to the "set"
    /// or "withdraw" status on `date`. Sets come first.
    pub async fn updated_holding_requests(
        &mut self,
        date: NaiveDate,
    ) -> Result<Vec<HoldingRequest>, FolioError> {
        if self.token.is_none() {
            self.login().await?;
        }

        let set_status = self.config.instance_status_set.clone();
        let withdraw_status = self.config.instance_status_withdraw.clone();

        let mut requests = Vec::new();
        for (status_id, state) in [
            (set_status, DesiredState::Set),
            (withdraw_status, DesiredState::Withdrawn),
        ] {
            let instances = self.updated_instances(date, &status_id).await?;
            let before = requests.len();
            requests.extend(
                instances
                    .iter()
                    .filter_map(|instance| self.oclc_identifier(instance))
                    .map(|raw| HoldingRequest::new(raw, state)),
            );
            info!(
                ?state,
                instances = instances.len(),
                requests = requests.len() - before,
                "collected FOLIO instances"
            );
        }
        Ok(requests)
    }

    /// Every instance moved to `status_id` on `date`, fetched `limit` at a
    /// time until `totalRecords` have been read.
    async fn updated_instances(
        &self,
        date: NaiveDate,
        status_id: &str,
    ) -> Result<Vec<Instance>, FolioError> {
        let query = status_query(date, status_id);
        let mut instances = Vec::new();
        loop {
            let page = self.instances_page(&query, instances.len()).await?;
            let fetched = page.instances.len();
            instances.extend(page.instances);

            let done = match page.total_records {
                Some(total) => instances.len() >= total,
                None => fetched < self.config.limit as usize,
            };
            if done || fetched == 0 {
                break;
            }
        }
        Ok(instances)
    }

    async fn instances_page(
        &self,
        query: &str,
        offset: usize,
    ) -> Result<InstancesResponse, FolioError> {
        let url = format!("{}/inventory/instances", self.okapi_url);
        let limit = self.config.limit.to_string();
        let offset = offset.to_string();
        debug!(url = %url, query = %query, offset = %offset, "querying FOLIO instances");

        let mut req = self
            .http
            .get(&url)
            .query(&[
                ("query", query),
                ("limit", limit.as_str()),
                ("offset", offset.as_str()),
            ])
            .header(TENANT_HEADER, &self.config.tenant_id);
        if let Some(token) = &self.token {
            req = req.header(TOKEN_HEADER, token);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FolioError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// First identifier of the configured OCLC type, if any.
    fn oclc_identifier(&self, instance: &Instance) -> Option<String> {
        let found = instance
            .identifiers
            .iter()
            .find(|id| id.identifier_type_id == self.config.id_type_oclc)
            .map(|id| id.value.clone());
        if found.is_none() {
            warn!(instance_id = %instance.id, "instance has no OCLC number, skipping");
        }
        found
    }
}

/// CQL selecting instances moved to `status_id` on `date`.
fn status_query(date: NaiveDate, status_id: &str) -> String {
    format!(
        "(statusUpdatedDate=={}* and statusId==\"{status_id}\")",
        date.format("%Y-%m-%d")
    )
}
