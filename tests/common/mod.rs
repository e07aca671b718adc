#![allow(dead_code)]

use anyhow::{Result, anyhow};
use futures::future::BoxFuture;
use odyssey_exporter::collectors::AdminConsole;
use odyssey_exporter::collectors::rows::ResultSet;
use odyssey_exporter::collectors::sink::MetricSample;
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Nothing listens on port 1, so every connection attempt is refused.
pub const UNREACHABLE_DSN: &str = "postgresql://console@127.0.0.1:1/console?sslmode=disable";

pub fn unreachable_dsn() -> SecretString {
    SecretString::from(UNREACHABLE_DSN)
}

/// In-memory console answering each command from a script.
///
/// Commands without a script entry return an empty result set.
#[derive(Default)]
pub struct ScriptedConsole {
    responses: HashMap<String, std::result::Result<ResultSet, String>>,
    calls: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl ScriptedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, command: &str, set: ResultSet) -> Self {
        self.responses.insert(command.to_string(), Ok(set));
        self
    }

    pub fn fail(mut self, command: &str, message: &str) -> Self {
        self.responses
            .insert(command.to_string(), Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl AdminConsole for ScriptedConsole {
    fn query<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<ResultSet>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(command.to_string());
        }

        let response = match self.responses.get(command) {
            Some(Ok(set)) => Ok(set.clone()),
            Some(Err(message)) => Err(anyhow!("{message}")),
            None => Ok(ResultSet::default()),
        };

        Box::pin(async move { response })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        self.closed.store(true, Ordering::SeqCst);
        Box::pin(async {})
    }
}

/// A console answering every command like a small healthy Odyssey.
pub fn healthy_console() -> ScriptedConsole {
    ScriptedConsole::new()
        .respond(
            "show version;",
            ResultSet::new(["version"]).with_row(["1.4.1"]),
        )
        .respond(
            "show lists;",
            ResultSet::new(["list", "items"])
                .with_row(["databases", "2"])
                .with_row(["users", "3"])
                .with_row(["used_clients", "7"]),
        )
        .respond(
            "show is_paused;",
            ResultSet::new(["is_paused"]).with_row(["f"]),
        )
        .respond(
            "show errors;",
            ResultSet::new(["error_type", "count"]).with_row(["OD_ECLIENT_READ", "4"]),
        )
        .respond(
            "show stats;",
            ResultSet::new(["database", "avg_xact_count", "avg_query_count"])
                .with_row(["app", "10", "20"]),
        )
        .respond(
            "show databases;",
            ResultSet::new(["name", "database", "force_user", "pool_size"])
                .with_row(["app", "app", "alice", "10"])
                .with_row(["app", "app", "bob", "20"]),
        )
        .respond(
            "show pools_extended;",
            ResultSet::new(["database", "user", "cl_active", "sv_active", "sv_idle"])
                .with_row(["app", "alice", "3", "2", "1"]),
        )
}

/// Samples of one family as `(labels, value)`.
pub fn samples<'a>(sink: &'a [MetricSample], name: &str) -> Vec<(Vec<&'a str>, f64)> {
    sink.iter()
        .filter(|s| s.desc.name == name)
        .map(|s| (s.labels.iter().map(String::as_str).collect(), s.value))
        .collect()
}

/// Find an available port for testing (returns port > 1024)
pub fn get_available_port() -> u16 {
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to random port");
    let port = listener
        .local_addr()
        .expect("Failed to get local addr")
        .port();

    assert!(port > 1024, "Assigned port {port} should be > 1024");

    port
}

/// Wait for server to be ready on the given port
pub async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    use tokio::time::{Duration, sleep};

    for attempt in 1..=max_attempts {
        if tokio::net::TcpStream::connect(format!("127.0.0.1:{port}"))
            .await
            .is_ok()
        {
            return true;
        }

        if attempt % 10 == 0 {
            eprintln!("Still waiting for server on port {port} (attempt {attempt}/{max_attempts})");
        }

        sleep(Duration::from_millis(100)).await;
    }

    eprintln!("Failed to connect to server on port {port} after {max_attempts} attempts");
    false
}

pub fn get_test_url(port: u16) -> String {
    format!("http://127.0.0.1:{port}")
}
