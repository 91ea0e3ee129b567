//! HTTP clients for deployed bot services.
//!
//! Provides the liveness monitor behind the `monitor` operation: a
//! fixed-interval HTTP poll of a deployed service's endpoint with running
//! availability statistics.

mod monitor;

pub use monitor::{
    LivenessMonitor, MonitorClient, PollOutcome, PollStats, DEFAULT_POLL_INTERVAL,
};
