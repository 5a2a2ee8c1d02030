//! folio-oclc: set and withdraw WorldCat holdings for FOLIO instances whose
//! status changed on a given day, then email a summary.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::{Local, NaiveDate, TimeDelta};
use clap::Parser;
use folio_oclc_core::Config;
use folio_oclc_core::config::LoggingConfig;
use folio_oclc_sync::{FolioClient, HoldingUpdater, OclcClient, http_client, reconcile};
use tracing::{error, info, warn};

mod logging;
mod mail;
mod report;

use report::Summary;

/// Sync a day's FOLIO holding changes to OCLC WorldCat
#[derive(Parser)]
#[command(name = "folio-oclc")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, env = "FOLIO_OCLC_CONFIG")]
    config: PathBuf,

    /// Status-change date to process (YYYY-MM-DD); defaults to yesterday
    #[arg(short, long)]
    date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            logging::init(&LoggingConfig::default())?;
            error!(error = %e, "cannot load configuration");
            return Err(e.into());
        }
    };
    logging::init(&config.logging)?;
    info!("folio-oclc v{}", env!("CARGO_PKG_VERSION"));

    let date = cli.date.unwrap_or_else(yesterday);
    if let Err(e) = run(&config, date).await {
        error!("run failed: {e:#}");
        return Err(e);
    }
    Ok(())
}

fn yesterday() -> NaiveDate {
    Local::now().date_naive() - TimeDelta::days(1)
}

async fn run(config: &Config, date: NaiveDate) -> anyhow::Result<()> {
    info!(%date, "syncing holdings");
    let http = http_client(Duration::from_secs(config.http.timeout_secs))
        .context("building HTTP client")?;

    let oclc = OclcClient::connect(&config.oclc, http.clone())
        .await
        .context("authenticating with OCLC")?;

    let (requests, job_description) = if config.testing.is_empty() {
        let folio_config = config.folio.clone().context("missing [folio] section")?;
        let mut folio = FolioClient::new(folio_config, http);
        let requests = folio
            .updated_holding_requests(date)
            .await
            .context("querying FOLIO for updated instances")?;
        (
            requests,
            format!("Holdings to OCLC for FOLIO instances with status changes on {date}."),
        )
    } else {
        let requests = config.testing.requests();
        warn!(count = requests.len(), "using test OCLC numbers instead of FOLIO");
        (
            requests,
            "Holdings to OCLC for configured test OCLC numbers.".to_string(),
        )
    };

    let mut updater = HoldingUpdater::new(oclc);
    let results = match reconcile(&mut updater, &requests).await {
        Ok(results) => results,
        Err(e) => {
            let summary = Summary::aborted(&e, &job_description, Local::now());
            if let Err(mail_err) = mail::send(&config.email, &summary).await {
                error!("emailing partial results failed: {mail_err:#}");
            }
            return Err(e).context("OCLC session lost during reconciliation");
        }
    };

    let summary = Summary::from_results(&results, &job_description, Local::now());
    mail::send(&config.email, &summary)
        .await
        .context("emailing results")?;

    info!(
        successes = summary.successes,
        failures = summary.failures,
        "finished holdings sync"
    );
    Ok(())
}
