use crate::cli::actions::Action;
use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgConnectOptions;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;
use url::Url;

/// Turn parsed arguments into an [`Action`].
///
/// # Errors
///
/// Returns an error if a required argument is missing or the DSN can't be
/// parsed.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>("port")
        .copied()
        .ok_or_else(|| anyhow!("Port is required. Please provide it using the --port flag."))?;

    // None means auto-detect
    let listen = matches.get_one::<String>("listen").cloned();

    let dsn = SecretString::from(
        matches
            .get_one::<String>("dsn")
            .cloned()
            .ok_or_else(|| anyhow!("DSN is required. Please provide it using the --dsn flag."))?,
    );

    PgConnectOptions::from_str(dsn.expose_secret())
        .with_context(|| format!("Invalid DSN: {}", redact_dsn(&dsn)))?;

    let scrape_timeout = matches
        .get_one::<u64>("scrape-timeout")
        .copied()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

    info!(dsn = %redact_dsn(&dsn), ?scrape_timeout, "using Odyssey console");

    Ok(Action::Run {
        port,
        listen,
        dsn,
        scrape_timeout,
    })
}

const UNPARSEABLE_DSN: &str = "<unparseable dsn>";

/// The DSN without its password, safe to log.
#[must_use]
pub fn redact_dsn(dsn: &SecretString) -> String {
    match Url::parse(dsn.expose_secret()) {
        Ok(mut url) => {
            if url.password().is_some() && url.set_password(Some("***")).is_err() {
                return UNPARSEABLE_DSN.to_string();
            }
            url.to_string()
        }
        Err(_) => UNPARSEABLE_DSN.to_string(),
    }
}
