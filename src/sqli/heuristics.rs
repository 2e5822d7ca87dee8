use crate::sqli::fingerprint::{find_sql_error, is_block_status};
use crate::sqli::types::{BaselineSnapshot, ProbeResponse};

/// Minimum true/false length gap for a boolean differential
pub const BOOLEAN_MIN_DIFF: usize = 100;
/// Minimum baseline length gap for a UNION hit
pub const UNION_MIN_DELTA: usize = 500;
/// Minimum baseline length gap for a bypass payload to count as executed
pub const BYPASS_MIN_DELTA: usize = 100;
/// Slack subtracted from the configured delay before a response counts as slow
pub const TIME_TOLERANCE_SECS: f64 = 0.5;

/// Length figures behind a boolean verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BooleanMeasurement {
    pub true_len: usize,
    pub false_len: usize,
    pub diff: usize,
    pub true_delta: usize,
    pub false_delta: usize,
}

impl BooleanMeasurement {
    pub fn new(true_len: usize, false_len: usize, baseline_len: usize) -> Self {
        Self {
            true_len,
            false_len,
            diff: true_len.abs_diff(false_len),
            true_delta: true_len.abs_diff(baseline_len),
            false_delta: false_len.abs_diff(baseline_len),
        }
    }
}

/// Differential decision rules shared by the detection techniques
pub struct Heuristics;

impl Heuristics {
    pub fn time_delay_observed(elapsed: f64, delay_secs: u64) -> bool {
        elapsed >= delay_secs as f64 - TIME_TOLERANCE_SECS
    }

    /// TRUE looks like the baseline while FALSE diverges, or the statuses differ
    pub fn boolean_differential(m: &BooleanMeasurement, true_status: u16, false_status: u16) -> bool {
        let length_split =
            m.diff > BOOLEAN_MIN_DIFF && (m.true_delta as f64) < 0.5 * m.false_delta as f64;
        length_split || true_status != false_status
    }

    /// Lower-confidence than the timing and error checks: a "null" token or a
    /// mid-sized length change is weak evidence that the UNION executed.
    pub fn union_hit(response: &ProbeResponse, baseline: &BaselineSnapshot) -> bool {
        if response.status != 200 || find_sql_error(&response.body).is_some() {
            return false;
        }

        let null_appeared = response.body.to_lowercase().contains("null")
            && !baseline.response.body.to_lowercase().contains("null");

        let delta = response.body_len().abs_diff(baseline.length);
        let delta_in_band = delta > UNION_MIN_DELTA && delta < baseline.length.saturating_mul(10);

        null_appeared || delta_in_band
    }

    /// Not blocked, and either an SQL error leaked or the page changed noticeably
    pub fn bypass_worked(response: &ProbeResponse, baseline: &BaselineSnapshot) -> bool {
        if is_block_status(response.status) {
            return false;
        }
        find_sql_error(&response.body).is_some()
            || response.body_len().abs_diff(baseline.length) > BYPASS_MIN_DELTA
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn response(status: u16, body: &str) -> ProbeResponse {
        ProbeResponse {
            status,
            body: body.to_string(),
            headers: HashMap::new(),
        }
    }

    fn baseline(body: &str) -> BaselineSnapshot {
        BaselineSnapshot::new(response(200, body), 0.05)
    }

    #[test]
    fn test_time_threshold() {
        assert!(Heuristics::time_delay_observed(2.5, 3));
        assert!(Heuristics::time_delay_observed(3.2, 3));
        assert!(!Heuristics::time_delay_observed(2.49, 3));
    }

    #[test]
    fn test_boolean_reference_case() {
        let m = BooleanMeasurement::new(1000, 300, 1000);
        assert_eq!(m.diff, 700);
        assert_eq!(m.true_delta, 0);
        assert_eq!(m.false_delta, 700);
        assert!(Heuristics::boolean_differential(&m, 200, 200));
    }

    #[test]
    fn test_boolean_small_gap_is_not_differential() {
        let m = BooleanMeasurement::new(1000, 950, 1000);
        assert!(!Heuristics::boolean_differential(&m, 200, 200));
    }

    #[test]
    fn test_boolean_true_far_from_baseline() {
        // both diverge from baseline, TRUE not closer than half of FALSE's gap
        let m = BooleanMeasurement::new(600, 300, 1000);
        assert!(!Heuristics::boolean_differential(&m, 200, 200));
    }

    #[test]
    fn test_boolean_status_split() {
        let m = BooleanMeasurement::new(1000, 1000, 1000);
        assert!(Heuristics::boolean_differential(&m, 200, 500));
    }

    #[test]
    fn test_union_null_token() {
        let base = baseline("<p>Product list</p>");
        assert!(Heuristics::union_hit(&response(200, "<p>null null null</p>"), &base));
        assert!(!Heuristics::union_hit(&response(500, "<p>null</p>"), &base));
    }

    #[test]
    fn test_union_null_already_in_baseline() {
        let base = baseline("value: null");
        assert!(!Heuristics::union_hit(&response(200, "value: null"), &base));
    }

    #[test]
    fn test_union_rejects_sql_error() {
        let base = baseline("ok");
        let resp = response(200, "null - SQLSTATE[21000]: different number of columns");
        assert!(!Heuristics::union_hit(&resp, &base));
    }

    #[test]
    fn test_union_length_band() {
        let base = baseline(&"a".repeat(200));
        assert!(Heuristics::union_hit(&response(200, &"a".repeat(900)), &base));
        // beyond ten times the baseline length
        assert!(!Heuristics::union_hit(&response(200, &"a".repeat(2300)), &base));
        assert!(!Heuristics::union_hit(&response(200, &"a".repeat(650)), &base));
    }

    #[test]
    fn test_bypass_blocked_status_wins() {
        let base = baseline("ok");
        let resp = response(403, &format!("blocked {}", "x".repeat(5000)));
        assert!(!Heuristics::bypass_worked(&resp, &base));
    }

    #[test]
    fn test_bypass_length_or_error() {
        let base = baseline("ok");
        assert!(Heuristics::bypass_worked(&response(200, &"x".repeat(200)), &base));
        assert!(Heuristics::bypass_worked(&response(500, "syntax error at or near"), &base));
        assert!(!Heuristics::bypass_worked(&response(200, "ok!"), &base));
    }
}
