//! SMTP delivery of the run summary.

use anyhow::Context;
use folio_oclc_core::config::EmailConfig;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::info;

use crate::report::Summary;

fn build_message(config: &EmailConfig, summary: &Summary) -> anyhow::Result<Message> {
    let from_address: Address = config
        .from_address
        .parse()
        .with_context(|| format!("invalid from_address {:?}", config.from_address))?;
    let from_name = config.from_name.clone().filter(|name| !name.trim().is_empty());
    let to: Mailbox = config
        .to_address
        .parse()
        .with_context(|| format!("invalid to_address {:?}", config.to_address))?;

    let message = Message::builder()
        .from(Mailbox::new(from_name, from_address))
        .to(to)
        .subject(summary.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(summary.body.clone())?;
    Ok(message)
}

/// Send `summary` to the configured recipient over plain SMTP.
pub async fn send(config: &EmailConfig, summary: &Summary) -> anyhow::Result<()> {
    let message = build_message(config, summary)?;
    let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        .port(config.smtp_port)
        .build();

    transport
        .send(message)
        .await
        .with_context(|| format!("sending mail via {}:{}", config.smtp_host, config.smtp_port))?;
    info!(
        to = %config.to_address,
        failures = summary.failures,
        successes = summary.successes,
        "emailed results"
    );
    Ok(())
}
