use anyhow::Result;
use prometheus::{Counter, Gauge, IntGauge, Opts, Registry};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, warn};

/// Resource usage of the exporter process.
///
/// - `odyssey_exporter_process_cpu_seconds_total`: user + system CPU time,
///   cumulative across cores
/// - `odyssey_exporter_process_resident_memory_bytes` / `_virtual_memory_bytes`
/// - `odyssey_exporter_process_threads` and `_open_fds` (read from `/proc` on
///   Linux)
/// - `odyssey_exporter_process_start_time_seconds`
///
/// Refreshed on every `/metrics` request.
#[derive(Clone)]
pub struct ProcessMetrics {
    cpu_seconds_total: Counter,
    resident_memory_bytes: IntGauge,
    virtual_memory_bytes: IntGauge,
    threads: IntGauge,
    open_fds: IntGauge,
    start_time_seconds: Gauge,
    state: Arc<Mutex<ProcessState>>,
    pid: Pid,
}

struct ProcessState {
    system: System,
    last_cpu_time: Option<Duration>,
}

impl Default for ProcessMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessMetrics {
    /// # Panics
    ///
    /// Panics if metric creation fails.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let cpu_seconds_total = Counter::with_opts(Opts::new(
            "odyssey_exporter_process_cpu_seconds_total",
            "Total user and system CPU time spent in seconds (cumulative across all cores)",
        ))
        .expect("odyssey_exporter_process_cpu_seconds_total");

        let resident_memory_bytes = IntGauge::with_opts(Opts::new(
            "odyssey_exporter_process_resident_memory_bytes",
            "Resident memory size in bytes (RSS)",
        ))
        .expect("odyssey_exporter_process_resident_memory_bytes");

        let virtual_memory_bytes = IntGauge::with_opts(Opts::new(
            "odyssey_exporter_process_virtual_memory_bytes",
            "Virtual memory size in bytes (VSZ)",
        ))
        .expect("odyssey_exporter_process_virtual_memory_bytes");

        let threads = IntGauge::with_opts(Opts::new(
            "odyssey_exporter_process_threads",
            "Number of OS threads in the process",
        ))
        .expect("odyssey_exporter_process_threads");

        let open_fds = IntGauge::with_opts(Opts::new(
            "odyssey_exporter_process_open_fds",
            "Number of open file descriptors",
        ))
        .expect("odyssey_exporter_process_open_fds");

        let start_time_seconds = Gauge::with_opts(Opts::new(
            "odyssey_exporter_process_start_time_seconds",
            "Start time of the process since unix epoch in seconds",
        ))
        .expect("odyssey_exporter_process_start_time_seconds");

        Self {
            cpu_seconds_total,
            resident_memory_bytes,
            virtual_memory_bytes,
            threads,
            open_fds,
            start_time_seconds,
            state: Arc::new(Mutex::new(ProcessState {
                system: System::new(),
                last_cpu_time: None,
            })),
            pid: Pid::from_u32(std::process::id()),
        }
    }

    /// # Errors
    ///
    /// Returns an error if any metric fails to register.
    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.cpu_seconds_total.clone()))?;
        registry.register(Box::new(self.resident_memory_bytes.clone()))?;
        registry.register(Box::new(self.virtual_memory_bytes.clone()))?;
        registry.register(Box::new(self.threads.clone()))?;
        registry.register(Box::new(self.open_fds.clone()))?;
        registry.register(Box::new(self.start_time_seconds.clone()))?;
        Ok(())
    }

    /// Read fresh numbers for this process from the OS.
    pub fn refresh(&self) {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("process metrics mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        };

        state
            .system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);

        let Some(process) = state.system.process(self.pid) else {
            return;
        };

        let rss = process.memory();
        let vsz = process.virtual_memory();
        let cpu_time = Duration::from_millis(process.accumulated_cpu_time());
        let start_time = Duration::from_secs(process.start_time());

        self.resident_memory_bytes
            .set(i64::try_from(rss).unwrap_or(i64::MAX));
        self.virtual_memory_bytes
            .set(i64::try_from(vsz).unwrap_or(i64::MAX));
        self.start_time_seconds.set(start_time.as_secs_f64());

        // the counter starts at the CPU time already spent before the first refresh
        let delta = state
            .last_cpu_time
            .map_or(cpu_time, |last| cpu_time.saturating_sub(last));
        if !delta.is_zero() {
            self.cpu_seconds_total.inc_by(delta.as_secs_f64());
        }
        state.last_cpu_time = Some(cpu_time);

        #[cfg(target_os = "linux")]
        {
            if let Ok(entries) = std::fs::read_dir(format!("/proc/{}/task", self.pid)) {
                self.threads
                    .set(i64::try_from(entries.count()).unwrap_or(0));
            }
            if let Ok(entries) = std::fs::read_dir(format!("/proc/{}/fd", self.pid)) {
                self.open_fds
                    .set(i64::try_from(entries.count()).unwrap_or(0));
            }
        }

        #[cfg(not(target_os = "linux"))]
        {
            self.threads.set(1);
            self.open_fds.set(0);
        }

        debug!(
            rss_mb = rss / 1024 / 1024,
            vsz_mb = vsz / 1024 / 1024,
            cpu_seconds_total = self.cpu_seconds_total.get(),
            threads = self.threads.get(),
            fds = self.open_fds.get(),
            "collected process metrics"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_registers_without_error() {
        let metrics = ProcessMetrics::new();
        let registry = Registry::new();
        assert!(metrics.register(&registry).is_ok());

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|m| m.name().to_string())
            .collect();

        for name in [
            "odyssey_exporter_process_cpu_seconds_total",
            "odyssey_exporter_process_resident_memory_bytes",
            "odyssey_exporter_process_virtual_memory_bytes",
            "odyssey_exporter_process_threads",
            "odyssey_exporter_process_open_fds",
            "odyssey_exporter_process_start_time_seconds",
        ] {
            assert!(names.contains(&name.to_string()), "{name}");
        }
    }

    #[test]
    fn test_refresh_reads_own_process() {
        let metrics = ProcessMetrics::new();
        metrics.refresh();

        assert!(metrics.resident_memory_bytes.get() > 0);
        assert!(metrics.virtual_memory_bytes.get() >= metrics.resident_memory_bytes.get());
        assert!(metrics.start_time_seconds.get() > 0.0);
        assert!(metrics.threads.get() >= 1);

        #[cfg(target_os = "linux")]
        assert!(metrics.open_fds.get() >= 3);
    }

    #[test]
    fn test_cpu_counter_is_monotonic() {
        let metrics = ProcessMetrics::new();
        metrics.refresh();
        let first = metrics.cpu_seconds_total.get();

        let mut sum = 0u64;
        for i in 0..1_000_000 {
            sum = sum.wrapping_add(i);
        }
        assert!(sum > 0);

        metrics.refresh();
        assert!(metrics.cpu_seconds_total.get() >= first);
        assert!(metrics.state.lock().unwrap().last_cpu_time.is_some());
    }

    #[test]
    fn test_repeated_refresh_does_not_panic() {
        let metrics = ProcessMetrics::new();
        for _ in 0..5 {
            metrics.refresh();
        }
        assert!(metrics.cpu_seconds_total.get() >= 0.0);
    }
}
