// packages/engine/src/observability/job_metrics.rs
//! Metric names and recording helpers

use metrics::{counter, describe_counter, describe_gauge, gauge};

pub const JOBS_LAUNCHED: &str = "mangabatch_jobs_launched_total";
pub const LAUNCH_FAILURES: &str = "mangabatch_launch_failures_total";
pub const JOBS_COMPLETED: &str = "mangabatch_jobs_completed_total";
pub const IN_FLIGHT: &str = "mangabatch_in_flight";

/// Register metric descriptions with the installed recorder
pub fn describe() {
    describe_counter!(JOBS_LAUNCHED, "Workers launched");
    describe_counter!(LAUNCH_FAILURES, "Jobs that failed to start");
    describe_counter!(JOBS_COMPLETED, "Workers observed as finished, by reason");
    describe_gauge!(IN_FLIGHT, "Workers currently occupying a slot");
}

pub fn record_launch(in_flight: usize) {
    counter!(JOBS_LAUNCHED).increment(1);
    gauge!(IN_FLIGHT).set(in_flight as f64);
}

pub fn record_launch_failure() {
    counter!(LAUNCH_FAILURES).increment(1);
}

pub fn record_completion(reason: &'static str, in_flight: usize) {
    counter!(JOBS_COMPLETED, "reason" => reason).increment(1);
    gauge!(IN_FLIGHT).set(in_flight as f64);
}
