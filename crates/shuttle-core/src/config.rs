//! Worker configuration.
//!
//! The values the controller hands a worker at bootstrap. They are passed to
//! the engine explicitly; `env_vars` renders the same values for code that
//! still looks them up in the process environment.

use tracing::Level;

use crate::domain::WorkerId;

pub const ENV_TESTRUN_UID: &str = "SHUTTLE_TESTRUN_UID";
pub const ENV_WORKER: &str = "SHUTTLE_WORKER";
pub const ENV_WORKER_COUNT: &str = "SHUTTLE_WORKER_COUNT";

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: WorkerId,

    /// Shared by every worker of one run.
    pub testrun_uid: String,

    pub worker_count: usize,

    /// Log every sent event locally.
    pub verbose: bool,

    /// Relay log records at or above this level to the controller.
    /// `None` keeps the relay uninstalled.
    pub log_relay_level: Option<Level>,

    /// Suffix node ids with their load-group name.
    pub loadgroup: bool,
}

impl WorkerConfig {
    pub fn new(worker_id: WorkerId, testrun_uid: impl Into<String>, worker_count: usize) -> Self {
        Self {
            worker_id,
            testrun_uid: testrun_uid.into(),
            worker_count,
            verbose: false,
            log_relay_level: None,
            loadgroup: false,
        }
    }

    /// Fresh, time-sortable run id for a worker started without one.
    pub fn generate_testrun_uid() -> String {
        ulid::Ulid::new().to_string().to_lowercase()
    }

    pub fn env_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            (ENV_TESTRUN_UID, self.testrun_uid.clone()),
            (ENV_WORKER, self.worker_id.to_string()),
            (ENV_WORKER_COUNT, self.worker_count.to_string()),
        ]
    }
}

/// Parse a relay threshold: a level name (`info`, `WARNING`, ...) or a
/// numeric severity (`10`, `20`, `30`, `40`, `50`).
///
/// A number between two levels rounds up, so nothing below the threshold
/// is ever relayed.
pub fn parse_log_level(value: &str) -> Option<Level> {
    let value = value.trim();
    if let Ok(number) = value.parse::<u32>() {
        return Some(match number {
            0 => Level::TRACE,
            1..=10 => Level::DEBUG,
            11..=20 => Level::INFO,
            21..=30 => Level::WARN,
            _ => Level::ERROR,
        });
    }
    match value.to_ascii_lowercase().as_str() {
        "warning" => Some(Level::WARN),
        "critical" | "fatal" => Some(Level::ERROR),
        other => other.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("info", Some(Level::INFO))]
    #[case("WARNING", Some(Level::WARN))]
    #[case("warn", Some(Level::WARN))]
    #[case("critical", Some(Level::ERROR))]
    #[case("0", Some(Level::TRACE))]
    #[case("10", Some(Level::DEBUG))]
    #[case("15", Some(Level::INFO))]
    #[case("20", Some(Level::INFO))]
    #[case("25", Some(Level::WARN))]
    #[case("30", Some(Level::WARN))]
    #[case("35", Some(Level::ERROR))]
    #[case("50", Some(Level::ERROR))]
    #[case("loud", None)]
    fn parses_level_names_and_numbers(#[case] input: &str, #[case] expected: Option<Level>) {
        assert_eq!(parse_log_level(input), expected);
    }

    #[rstest]
    #[case("15", Level::DEBUG)]
    #[case("25", Level::INFO)]
    #[case("39", Level::WARN)]
    fn in_between_thresholds_exclude_the_level_below(#[case] input: &str, #[case] below: Level) {
        let threshold = parse_log_level(input).unwrap();
        // tracing: a more verbose level compares greater
        assert!(below > threshold);
    }

    #[test]
    fn env_vars_expose_run_identity() {
        let config = WorkerConfig::new(WorkerId::new("gw1"), "run-1", 4);
        let vars = config.env_vars();
        assert!(vars.contains(&(ENV_TESTRUN_UID, "run-1".to_string())));
        assert!(vars.contains(&(ENV_WORKER, "gw1".to_string())));
        assert!(vars.contains(&(ENV_WORKER_COUNT, "4".to_string())));
    }

    #[test]
    fn generated_run_ids_differ() {
        assert_ne!(
            WorkerConfig::generate_testrun_uid(),
            WorkerConfig::generate_testrun_uid()
        );
    }
}
