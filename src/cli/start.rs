use crate::cli::{
    actions::Action,
    commands,
    dispatch::{handler, redact_dsn},
    telemetry,
};
use anyhow::Result;
use tracing::Level;

/// `-v` count to log level; errors only without the flag.
const fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

// Settings shown once at startup, never the DSN password
fn settings(action: &Action, level: Level) -> Vec<String> {
    match action {
        Action::Run {
            dsn,
            scrape_timeout,
            ..
        } => vec![
            format!("console: {}", redact_dsn(dsn)),
            format!(
                "scrape timeout: {}",
                scrape_timeout.map_or_else(|| "disabled".to_string(), |t| format!("{t:?}"))
            ),
            format!("log level: {level}"),
        ],
    }
}

fn format_list(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("  - {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse arguments, start logging, print the effective settings and return
/// the action to run.
///
/// # Errors
///
/// Returns an error if telemetry can't start or the arguments are invalid.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    let level = log_level(matches.get_count("verbose"));

    telemetry::init(level)?;

    let action = handler(&matches)?;

    println!(
        "{} {}\n{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        format_list(&settings(&action, level))
    );

    Ok(action)
}
