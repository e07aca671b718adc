//! Static metric descriptors and the column tables that feed them.
//!
//! Every sample the pipeline produces points at one of the descriptors below.
//! They are shared by all scrapes and never change at runtime.

use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const NAMESPACE: &str = "odyssey";

const ROUTE: &[&str] = &["user", "database"];
const ROUTE_QUANTILE: &[&str] = &["user", "database", "quantile"];
const DATABASE: &[&str] = &["database"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Gauge,
    Counter,
}

/// Name, help, label names and kind of one metric family.
#[derive(Debug, PartialEq, Eq)]
pub struct MetricDesc {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
    pub kind: ValueKind,
}

impl MetricDesc {
    const fn gauge(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            labels,
            kind: ValueKind::Gauge,
        }
    }

    const fn counter(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            labels,
            kind: ValueKind::Counter,
        }
    }
}

pub static EXPORTER_UP: MetricDesc =
    MetricDesc::gauge("odyssey_exporter_up", "The Odyssey exporter status", &[]);

pub static VERSION_INFO: MetricDesc =
    MetricDesc::gauge("odyssey_version_info", "The Odyssey version info", &["version"]);

pub static IS_PAUSED: MetricDesc =
    MetricDesc::gauge("odyssey_is_paused", "The Odyssey paused status", &[]);

pub static ERRORS_TOTAL: MetricDesc = MetricDesc::counter(
    "odyssey_errors_total",
    "Total number of Odyssey errors grouped by type",
    &["type"],
);

// show lists;
pub static LISTS_DATABASES: MetricDesc =
    MetricDesc::gauge("odyssey_lists_databases", "Count of databases", &[]);
pub static LISTS_USERS: MetricDesc =
    MetricDesc::gauge("odyssey_lists_users", "Count of users", &[]);
pub static LISTS_POOLS: MetricDesc =
    MetricDesc::gauge("odyssey_lists_pools", "Count of pools", &[]);
pub static LISTS_FREE_CLIENTS: MetricDesc =
    MetricDesc::gauge("odyssey_lists_free_clients", "Count of free clients", &[]);
pub static LISTS_USED_CLIENTS: MetricDesc =
    MetricDesc::gauge("odyssey_lists_used_clients", "Count of used clients", &[]);
pub static LISTS_LOGIN_CLIENTS: MetricDesc = MetricDesc::gauge(
    "odyssey_lists_login_clients",
    "Count of clients in login state",
    &[],
);
pub static LISTS_FREE_SERVERS: MetricDesc =
    MetricDesc::gauge("odyssey_lists_free_servers", "Count of free servers", &[]);
pub static LISTS_USED_SERVERS: MetricDesc =
    MetricDesc::gauge("odyssey_lists_used_servers", "Count of used servers", &[]);
pub static LISTS_CACHED_DNS_NAMES: MetricDesc = MetricDesc::gauge(
    "odyssey_lists_cached_dns_names",
    "Count of DNS names in the cache",
    &[],
);
pub static LISTS_CACHED_DNS_ZONES: MetricDesc = MetricDesc::gauge(
    "odyssey_lists_cached_dns_zones",
    "Count of DNS zones in the cache",
    &[],
);
pub static LISTS_IN_FLIGHT_DNS_QUERIES: MetricDesc = MetricDesc::gauge(
    "odyssey_lists_in_flight_dns_queries",
    "Count of in-flight DNS queries",
    &[],
);

// show stats;
pub static DATABASE_AVG_TX: MetricDesc = MetricDesc::gauge(
    "odyssey_database_avg_tx_per_second",
    "Average number of transactions per second reported by Odyssey cron",
    DATABASE,
);
pub static DATABASE_AVG_QUERY: MetricDesc = MetricDesc::gauge(
    "odyssey_database_avg_query_per_second",
    "Average number of queries per second reported by Odyssey cron",
    DATABASE,
);
pub static DATABASE_AVG_RECV: MetricDesc = MetricDesc::gauge(
    "odyssey_database_avg_recv_bytes_per_second",
    "Average bytes per second received from clients",
    DATABASE,
);
pub static DATABASE_AVG_SENT: MetricDesc = MetricDesc::gauge(
    "odyssey_database_avg_sent_bytes_per_second",
    "Average bytes per second sent to servers",
    DATABASE,
);
pub static DATABASE_AVG_XACT_TIME: MetricDesc = MetricDesc::gauge(
    "odyssey_database_avg_xact_time_seconds",
    "Average transaction time in seconds over the stats window",
    DATABASE,
);
pub static DATABASE_AVG_QUERY_TIME: MetricDesc = MetricDesc::gauge(
    "odyssey_database_avg_query_time_seconds",
    "Average query time in seconds over the stats window",
    DATABASE,
);
pub static DATABASE_AVG_WAIT_TIME: MetricDesc = MetricDesc::gauge(
    "odyssey_database_avg_wait_time_seconds",
    "Average wait time for a server in seconds over the stats window",
    DATABASE,
);

// show pools_extended;
pub static CLIENT_ACTIVE_ROUTE: MetricDesc = MetricDesc::gauge(
    "odyssey_client_pool_active_route",
    "Active clients currently using the route",
    ROUTE,
);
pub static CLIENT_WAITING_ROUTE: MetricDesc = MetricDesc::gauge(
    "odyssey_client_pool_waiting_route",
    "Clients waiting for a server connection on the route",
    ROUTE,
);
pub static CLIENT_MAXWAIT_ROUTE: MetricDesc = MetricDesc::gauge(
    "odyssey_client_pool_maxwait_seconds_route",
    "Maximum observed wait time for clients on the route (seconds)",
    ROUTE,
);
pub static SERVER_CAPACITY_ROUTE: MetricDesc = MetricDesc::gauge(
    "odyssey_server_pool_capacity_configured_route",
    "Configured server pool capacity for a specific route (0 means unlimited)",
    ROUTE,
);
pub static SERVER_STATE_ROUTE: MetricDesc = MetricDesc::gauge(
    "odyssey_server_pool_state_route",
    "Server pool state per route",
    &["user", "database", "state"],
);
pub static ROUTE_POOL_MODE_INFO: MetricDesc = MetricDesc::gauge(
    "odyssey_route_pool_mode_info",
    "Pool mode information for the route",
    &["user", "database", "mode"],
);
pub static ROUTE_BYTES_RECEIVED: MetricDesc = MetricDesc::counter(
    "odyssey_route_bytes_received_total",
    "Total bytes received from clients on the route",
    ROUTE,
);
pub static ROUTE_BYTES_SENT: MetricDesc = MetricDesc::counter(
    "odyssey_route_bytes_sent_total",
    "Total bytes sent to servers from the route",
    ROUTE,
);
pub static ROUTE_TCP_CONNECTIONS: MetricDesc = MetricDesc::counter(
    "odyssey_route_tcp_connections_total",
    "Total TCP connections established for the route",
    ROUTE,
);
pub static ROUTE_QUERY_DURATION: MetricDesc = MetricDesc::gauge(
    "odyssey_route_query_duration_seconds",
    "Route query duration quantiles",
    ROUTE_QUANTILE,
);
pub static ROUTE_TRANSACTION_DURATION: MetricDesc = MetricDesc::gauge(
    "odyssey_route_transaction_duration_seconds",
    "Route transaction duration quantiles",
    ROUTE_QUANTILE,
);

/// Every descriptor a scrape can emit.
pub static ALL: [&MetricDesc; 33] = [
    &EXPORTER_UP,
    &VERSION_INFO,
    &IS_PAUSED,
    &ERRORS_TOTAL,
    &LISTS_DATABASES,
    &LISTS_USERS,
    &LISTS_POOLS,
    &LISTS_FREE_CLIENTS,
    &LISTS_USED_CLIENTS,
    &LISTS_LOGIN_CLIENTS,
    &LISTS_FREE_SERVERS,
    &LISTS_USED_SERVERS,
    &LISTS_CACHED_DNS_NAMES,
    &LISTS_CACHED_DNS_ZONES,
    &LISTS_IN_FLIGHT_DNS_QUERIES,
    &DATABASE_AVG_TX,
    &DATABASE_AVG_QUERY,
    &DATABASE_AVG_RECV,
    &DATABASE_AVG_SENT,
    &DATABASE_AVG_XACT_TIME,
    &DATABASE_AVG_QUERY_TIME,
    &DATABASE_AVG_WAIT_TIME,
    &CLIENT_ACTIVE_ROUTE,
    &CLIENT_WAITING_ROUTE,
    &CLIENT_MAXWAIT_ROUTE,
    &SERVER_CAPACITY_ROUTE,
    &SERVER_STATE_ROUTE,
    &ROUTE_POOL_MODE_INFO,
    &ROUTE_BYTES_RECEIVED,
    &ROUTE_BYTES_SENT,
    &ROUTE_TCP_CONNECTIONS,
    &ROUTE_QUERY_DURATION,
    &ROUTE_TRANSACTION_DURATION,
];

/// How a raw column value maps to the metric value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    Raw,
    Microseconds,
}

impl Unit {
    #[must_use]
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Self::Raw => value,
            Self::Microseconds => value / 1e6,
        }
    }
}

/// A column that maps one to one onto a metric family.
#[derive(Debug)]
pub struct ColumnMetric {
    pub column: &'static str,
    pub desc: &'static MetricDesc,
    pub unit: Unit,
}

const fn column(column: &'static str, desc: &'static MetricDesc, unit: Unit) -> ColumnMetric {
    ColumnMetric { column, desc, unit }
}

/// `show lists;` rows, keyed by the `list` column. Unknown lists are ignored.
pub static LISTS: [ColumnMetric; 11] = [
    column("databases", &LISTS_DATABASES, Unit::Raw),
    column("users", &LISTS_USERS, Unit::Raw),
    column("pools", &LISTS_POOLS, Unit::Raw),
    column("free_clients", &LISTS_FREE_CLIENTS, Unit::Raw),
    column("used_clients", &LISTS_USED_CLIENTS, Unit::Raw),
    column("login_clients", &LISTS_LOGIN_CLIENTS, Unit::Raw),
    column("free_servers", &LISTS_FREE_SERVERS, Unit::Raw),
    column("used_servers", &LISTS_USED_SERVERS, Unit::Raw),
    column("dns_names", &LISTS_CACHED_DNS_NAMES, Unit::Raw),
    column("dns_zones", &LISTS_CACHED_DNS_ZONES, Unit::Raw),
    column("dns_queries", &LISTS_IN_FLIGHT_DNS_QUERIES, Unit::Raw),
];

/// `show stats;` columns always present.
pub static STATS_REQUIRED: [ColumnMetric; 2] = [
    column("avg_xact_count", &DATABASE_AVG_TX, Unit::Raw),
    column("avg_query_count", &DATABASE_AVG_QUERY, Unit::Raw),
];

/// `show stats;` columns emitted only by newer Odyssey releases.
pub static STATS_OPTIONAL: [ColumnMetric; 5] = [
    column("avg_recv", &DATABASE_AVG_RECV, Unit::Raw),
    column("avg_sent", &DATABASE_AVG_SENT, Unit::Raw),
    column("avg_xact_time", &DATABASE_AVG_XACT_TIME, Unit::Microseconds),
    column("avg_query_time", &DATABASE_AVG_QUERY_TIME, Unit::Microseconds),
    column("avg_wait_time", &DATABASE_AVG_WAIT_TIME, Unit::Microseconds),
];

/// `show pools_extended;` columns with a dedicated route metric.
pub static POOLS_COLUMNS: [ColumnMetric; 6] = [
    column("cl_active", &CLIENT_ACTIVE_ROUTE, Unit::Raw),
    column("cl_waiting", &CLIENT_WAITING_ROUTE, Unit::Raw),
    column("maxwait", &CLIENT_MAXWAIT_ROUTE, Unit::Raw),
    column("bytes_received", &ROUTE_BYTES_RECEIVED, Unit::Raw),
    column("bytes_sent", &ROUTE_BYTES_SENT, Unit::Raw),
    column("tcp_conn_count", &ROUTE_TCP_CONNECTIONS, Unit::Raw),
];

/// Latency percentile columns: `<prefix><quantile>` in microseconds.
pub static POOLS_QUANTILE_PREFIXES: [(&str, &MetricDesc); 2] = [
    ("query_", &ROUTE_QUERY_DURATION),
    ("transaction_", &ROUTE_TRANSACTION_DURATION),
];

/// Server connection states, in emission order.
pub static SERVER_STATES: [(&str, &str); 5] = [
    ("sv_active", "active"),
    ("sv_idle", "idle"),
    ("sv_used", "used"),
    ("sv_tested", "tested"),
    ("sv_login", "login"),
];

pub const POOL_MODE_COLUMN: &str = "pool_mode";

/// Columns still reported by Odyssey but superseded by another column.
pub static POOLS_DEPRECATED: [&str; 1] = ["maxwait_us"];

/// What the pools step does with a column.
#[derive(Clone, Copy, Debug)]
pub enum PoolColumn<'a> {
    Metric(&'static ColumnMetric),
    Quantile {
        desc: &'static MetricDesc,
        quantile: &'a str,
    },
    ServerState(usize),
    PoolMode,
    Deprecated,
}

static POOLS_BY_NAME: Lazy<HashMap<&'static str, &'static ColumnMetric>> =
    Lazy::new(|| POOLS_COLUMNS.iter().map(|c| (c.column, c)).collect());

/// Classify a `show pools_extended;` column, `None` if it is unknown.
#[must_use]
pub fn pool_column(name: &str) -> Option<PoolColumn<'_>> {
    if name == POOL_MODE_COLUMN {
        return Some(PoolColumn::PoolMode);
    }

    for (prefix, desc) in &POOLS_QUANTILE_PREFIXES {
        if let Some(quantile) = name.strip_prefix(prefix) {
            return Some(PoolColumn::Quantile {
                desc: *desc,
                quantile,
            });
        }
    }

    if let Some(slot) = SERVER_STATES.iter().position(|(column, _)| *column == name) {
        return Some(PoolColumn::ServerState(slot));
    }

    if POOLS_DEPRECATED.iter().any(|column| *column == name) {
        return Some(PoolColumn::Deprecated);
    }

    POOLS_BY_NAME.get(name).copied().map(PoolColumn::Metric)
}

/// Look up a `show lists;` entry.
#[must_use]
pub fn list_metric(list: &str) -> Option<&'static ColumnMetric> {
    LISTS.iter().find(|c| c.column == list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique_and_namespaced() {
        let mut seen = HashSet::new();
        for desc in ALL {
            assert!(desc.name.starts_with(NAMESPACE), "{}", desc.name);
            assert!(seen.insert(desc.name), "duplicate {}", desc.name);
        }
    }

    #[test]
    fn test_counters_end_with_total() {
        for desc in ALL {
            if desc.kind == ValueKind::Counter {
                assert!(desc.name.ends_with("_total"), "{}", desc.name);
            }
        }
    }

    #[test]
    fn test_route_labels_order() {
        assert_eq!(CLIENT_ACTIVE_ROUTE.labels, &["user", "database"]);
        assert_eq!(SERVER_STATE_ROUTE.labels, &["user", "database", "state"]);
    }

    #[test]
    fn test_microseconds() {
        assert!((Unit::Microseconds.apply(2_000_000.0) - 2.0).abs() < f64::EPSILON);
        assert!((Unit::Raw.apply(3.0) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pool_column() {
        assert!(matches!(
            pool_column("query_0.99"),
            Some(PoolColumn::Quantile { quantile: "0.99", .. })
        ));
        assert!(matches!(
            pool_column("transaction_0.5"),
            Some(PoolColumn::Quantile { quantile: "0.5", .. })
        ));
        assert!(matches!(pool_column("sv_tested"), Some(PoolColumn::ServerState(3))));
        assert!(matches!(pool_column("pool_mode"), Some(PoolColumn::PoolMode)));
        assert!(matches!(pool_column("maxwait_us"), Some(PoolColumn::Deprecated)));
        assert!(matches!(
            pool_column("bytes_sent"),
            Some(PoolColumn::Metric(ColumnMetric { unit: Unit::Raw, .. }))
        ));
        assert!(pool_column("foo_bar").is_none());
    }

    #[test]
    fn test_list_metric() {
        assert_eq!(
            list_metric("dns_names").map(|c| c.desc.name),
            Some("odyssey_lists_cached_dns_names")
        );
        assert!(list_metric("unknown").is_none());
    }
}
