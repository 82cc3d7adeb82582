//! Per-silo health scoring and failure-trend detection.
//!
//! Scores combine cpu, memory, and latency headroom into one
//! `[0, 100]` metric; the calculator's trend detectors drive
//! rebalancing decisions.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Score at or below which a declining silo is predicted to fail.
pub const CRITICAL_SCORE_THRESHOLD: f64 = 30.0;

/// Regression slope (points per sample) at or below which a sequence
/// counts as gradual degradation.
pub const DEGRADATION_SLOPE_THRESHOLD: f64 = -3.0;

/// Minimum samples before either trend detector fires.
pub const MIN_TREND_SAMPLES: usize = 3;

/// One health sample for a silo.
///
/// Inputs are clamped on construction: cpu and memory to `[0, 100]`,
/// latency to `>= 0`.
///
/// # Example
/// ```rust
/// use granary_rt::health::SiloHealthScore;
///
/// let score = SiloHealthScore::new(150.0, -10.0, -5.0);
/// assert_eq!(score.cpu_pct, 100.0);
/// assert_eq!(score.mem_pct, 0.0);
/// assert_eq!(score.latency_ms, 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiloHealthScore {
    pub cpu_pct: f64,
    pub mem_pct: f64,
    pub latency_ms: f64,
    pub timestamp: DateTime<Utc>,
}

impl SiloHealthScore {
    /// Clamp the inputs and stamp the sample with the current time.
    pub fn new(cpu_pct: f64, mem_pct: f64, latency_ms: f64) -> Self {
        Self::at(cpu_pct, mem_pct, latency_ms, Utc::now())
    }

    /// Clamp the inputs with an explicit timestamp.
    pub fn at(cpu_pct: f64, mem_pct: f64, latency_ms: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            cpu_pct: cpu_pct.clamp(0.0, 100.0),
            mem_pct: mem_pct.clamp(0.0, 100.0),
            latency_ms: latency_ms.max(0.0),
            timestamp,
        }
    }

    /// Composite score in `[0, 100]`:
    /// `0.3·(100−cpu) + 0.3·(100−mem) + 0.4·max(0, 100 − latency/10)`.
    pub fn overall_score(&self) -> f64 {
        0.3 * (100.0 - self.cpu_pct)
            + 0.3 * (100.0 - self.mem_pct)
            + 0.4 * (100.0 - self.latency_ms / 10.0).max(0.0)
    }

    /// Whether the score meets a health threshold.
    pub fn is_healthy(&self, threshold: f64) -> bool {
        self.overall_score() >= threshold
    }
}

/// Computes health samples and detects failure trends.
pub struct HealthScoreCalculator {
    critical_threshold: f64,
    degradation_slope: f64,
}

impl HealthScoreCalculator {
    /// Calculator with the standard thresholds.
    pub fn new() -> Self {
        Self {
            critical_threshold: CRITICAL_SCORE_THRESHOLD,
            degradation_slope: DEGRADATION_SLOPE_THRESHOLD,
        }
    }

    /// Sample the given metrics at the current time.
    pub fn calculate(&self, cpu_pct: f64, mem_pct: f64, latency_ms: f64) -> SiloHealthScore {
        SiloHealthScore::new(cpu_pct, mem_pct, latency_ms)
    }

    /// Predict imminent failure: at least [`MIN_TREND_SAMPLES`] samples,
    /// every consecutive pair non-increasing, and the final score at or
    /// below the critical threshold. Improving or stable sequences return
    /// `false`.
    pub fn predict_failure(&self, scores: &[SiloHealthScore]) -> bool {
        if scores.len() < MIN_TREND_SAMPLES {
            return false;
        }
        let declining = scores
            .windows(2)
            .all(|pair| pair[1].overall_score() <= pair[0].overall_score());
        declining
            && scores
                .last()
                .map(|score| score.overall_score() <= self.critical_threshold)
                .unwrap_or(false)
    }

    /// Detect gradual degradation: at least [`MIN_TREND_SAMPLES`] samples
    /// and a least-squares slope of overall score against sample index at
    /// or below the degradation threshold.
    pub fn detect_gradual_degradation(&self, scores: &[SiloHealthScore]) -> bool {
        if scores.len() < MIN_TREND_SAMPLES {
            return false;
        }
        let n = scores.len() as f64;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut sum_xy = 0.0;
        let mut sum_xx = 0.0;
        for (index, score) in scores.iter().enumerate() {
            let x = index as f64;
            let y = score.overall_score();
            sum_x += x;
            sum_y += y;
            sum_xy += x * y;
            sum_xx += x * x;
        }
        let denominator = n * sum_xx - sum_x * sum_x;
        if denominator == 0.0 {
            return false;
        }
        let slope = (n * sum_xy - sum_x * sum_y) / denominator;
        slope <= self.degradation_slope
    }
}

impl Default for HealthScoreCalculator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(cpu: f64, mem: f64, latency: f64) -> SiloHealthScore {
        SiloHealthScore::new(cpu, mem, latency)
    }

    #[test]
    fn test_out_of_range_inputs_clamped() {
        let sample = score(150.0, -10.0, -5.0);
        assert_eq!(sample.cpu_pct, 100.0);
        assert_eq!(sample.mem_pct, 0.0);
        assert_eq!(sample.latency_ms, 0.0);
        // 0.3*(100-100) + 0.3*(100-0) + 0.4*max(0, 100-0) = 70
        assert!((sample.overall_score() - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_overall_score_formula() {
        let sample = score(50.0, 50.0, 500.0);
        // 0.3*50 + 0.3*50 + 0.4*50 = 50
        assert!((sample.overall_score() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_overall_score_bounds() {
        let idle = score(0.0, 0.0, 0.0);
        assert!((idle.overall_score() - 100.0).abs() < f64::EPSILON);

        let saturated = score(100.0, 100.0, 5000.0);
        assert_eq!(saturated.overall_score(), 0.0);

        for (cpu, mem, latency) in [
            (12.5, 80.0, 42.0),
            (99.0, 1.0, 1500.0),
            (-3.0, 250.0, 0.0),
        ] {
            let sample = score(cpu, mem, latency);
            let overall = sample.overall_score();
            assert!((0.0..=100.0).contains(&overall), "out of range: {overall}");
        }
    }

    #[test]
    fn test_latency_headroom_floors_at_zero() {
        let sample = score(0.0, 0.0, 2000.0);
        // latency term is max(0, 100 - 200) = 0
        assert!((sample.overall_score() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_is_healthy_threshold() {
        let sample = score(50.0, 50.0, 500.0); // overall 50
        assert!(sample.is_healthy(50.0));
        assert!(!sample.is_healthy(50.1));
    }

    #[test]
    fn test_predict_failure_on_decline_to_critical() {
        let calculator = HealthScoreCalculator::new();
        // Overall scores ~90, 50, 6
        let declining = vec![
            score(10.0, 10.0, 100.0),
            score(50.0, 50.0, 500.0),
            score(90.0, 90.0, 1200.0),
        ];
        assert!(calculator.predict_failure(&declining));

        let recovering: Vec<SiloHealthScore> = declining.iter().rev().cloned().collect();
        assert!(!calculator.predict_failure(&recovering));
    }

    #[test]
    fn test_predict_failure_needs_three_samples() {
        let calculator = HealthScoreCalculator::new();
        let short = vec![score(90.0, 90.0, 1200.0), score(95.0, 95.0, 2000.0)];
        assert!(!calculator.predict_failure(&short));
    }

    #[test]
    fn test_predict_failure_rejects_non_monotone() {
        let calculator = HealthScoreCalculator::new();
        let bumpy = vec![
            score(50.0, 50.0, 500.0),
            score(10.0, 10.0, 100.0), // improves in the middle
            score(90.0, 90.0, 1200.0),
        ];
        assert!(!calculator.predict_failure(&bumpy));
    }

    #[test]
    fn test_predict_failure_rejects_healthy_endpoint() {
        let calculator = HealthScoreCalculator::new();
        // Declining but the final score stays well above critical
        let mild = vec![
            score(0.0, 0.0, 0.0),
            score(10.0, 10.0, 0.0),
            score(20.0, 20.0, 0.0),
        ];
        assert!(!calculator.predict_failure(&mild));
    }

    #[test]
    fn test_gradual_degradation_steep_slope() {
        let calculator = HealthScoreCalculator::new();
        // Overall ~90, 50, 6: slope ~ -42 per sample
        let steep = vec![
            score(10.0, 10.0, 100.0),
            score(50.0, 50.0, 500.0),
            score(90.0, 90.0, 1200.0),
        ];
        assert!(calculator.detect_gradual_degradation(&steep));
    }

    #[test]
    fn test_gradual_degradation_flat_or_slow() {
        let calculator = HealthScoreCalculator::new();
        let flat = vec![score(20.0, 20.0, 0.0); 4];
        assert!(!calculator.detect_gradual_degradation(&flat));

        // Overall 84, 82.5, 81: slope -1.5, above the -3 threshold
        let slow = vec![
            score(20.0, 20.0, 100.0),
            score(22.5, 22.5, 100.0),
            score(25.0, 25.0, 100.0),
        ];
        assert!(!calculator.detect_gradual_degradation(&slow));
    }

    #[test]
    fn test_calculator_stamps_now() {
        let calculator = HealthScoreCalculator::new();
        let before = Utc::now();
        let sample = calculator.calculate(10.0, 20.0, 30.0);
        assert!(sample.timestamp >= before);
    }
}
