use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default time a lookup may wait for its peer to bond before it fails.
pub const DEFAULT_DEFERRED_QUERY_TIMEOUT: Duration = Duration::from_secs(5);
/// Default maximum number of deferred lookups per peer.
pub const DEFAULT_MAX_DEFERRED_QUERIES: usize = 32;
/// Default maximum time the discovery loop blocks waiting for a message.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);
/// Smallest tick interval the discovery loop accepts.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Discovery loop configuration
pub struct Config {
    /// Bootstrap nodes, in `enode://<id>@<ip>:<port>[?discport=<port>]` form.
    ///
    /// Entries that fail to parse are logged and skipped.
    ///
    /// Defaults to an empty list.
    pub bootstrap: Vec<String>,
    /// How long a lookup may stay deferred, waiting for its peer to bond.
    ///
    /// Defaults to [DEFAULT_DEFERRED_QUERY_TIMEOUT]
    pub deferred_query_timeout: Duration,
    /// Maximum number of deferred lookups per peer, further lookups are rejected.
    ///
    /// Defaults to [DEFAULT_MAX_DEFERRED_QUERIES]
    pub max_deferred_queries: usize,
    /// Maximum time the loop waits for a message before expiring deferred lookups.
    ///
    /// Lower values expire lookups closer to their deadline at the cost of
    /// more wakeups. Values below [MIN_TICK_INTERVAL] are raised to it.
    ///
    /// Defaults to [DEFAULT_TICK_INTERVAL]
    pub tick_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bootstrap: Vec::new(),
            deferred_query_timeout: DEFAULT_DEFERRED_QUERY_TIMEOUT,
            max_deferred_queries: DEFAULT_MAX_DEFERRED_QUERIES,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}
