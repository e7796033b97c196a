//! The simulation parameter table.
//!
//! Every probability gate and sampling range the agents use lives here, so
//! the behaviour of a cycle is fully described by one value that tests can
//! replace (for example with all gates at 1.0).

use serde::{Deserialize, Serialize};

/// Inclusive integer sampling range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub min: u64,
    pub max: u64,
}

impl IntRange {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: u64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Inclusive floating-point sampling range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatRange {
    pub min: f64,
    pub max: f64,
}

impl FloatRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Probability that each step runs in a cycle. Dependent steps are only
/// candidates when their upstream step produced output in the same cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepGates {
    #[serde(default = "default_monitoring_gate")]
    pub monitoring: f64,
    #[serde(default = "default_decision_gate")]
    pub decision: f64,
    #[serde(default = "default_resource_gate")]
    pub resource: f64,
    #[serde(default = "default_lifecycle_gate")]
    pub lifecycle: f64,
    #[serde(default = "default_financial_gate")]
    pub financial: f64,
    #[serde(default = "default_security_gate")]
    pub security: f64,
    #[serde(default = "default_learning_gate")]
    pub learning: f64,
}

fn default_monitoring_gate() -> f64 {
    0.7
}
fn default_decision_gate() -> f64 {
    0.6
}
fn default_resource_gate() -> f64 {
    1.0
}
fn default_lifecycle_gate() -> f64 {
    0.6
}
fn default_financial_gate() -> f64 {
    0.5
}
fn default_security_gate() -> f64 {
    0.6
}
fn default_learning_gate() -> f64 {
    0.5
}

impl Default for StepGates {
    fn default() -> Self {
        Self {
            monitoring: default_monitoring_gate(),
            decision: default_decision_gate(),
            resource: default_resource_gate(),
            lifecycle: default_lifecycle_gate(),
            financial: default_financial_gate(),
            security: default_security_gate(),
            learning: default_learning_gate(),
        }
    }
}

impl StepGates {
    /// Every step runs whenever its inputs exist.
    pub fn always() -> Self {
        Self {
            monitoring: 1.0,
            decision: 1.0,
            resource: 1.0,
            lifecycle: 1.0,
            financial: 1.0,
            security: 1.0,
            learning: 1.0,
        }
    }

    fn all(&self) -> [(&'static str, f64); 7] {
        [
            ("monitoring", self.monitoring),
            ("decision", self.decision),
            ("resource", self.resource),
            ("lifecycle", self.lifecycle),
            ("financial", self.financial),
            ("security", self.security),
            ("learning", self.learning),
        ]
    }
}

/// The full table of probabilities and ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub gates: StepGates,

    /// CPU or memory percent strictly above which a server is at risk
    #[serde(default = "default_risk_threshold")]
    pub risk_threshold: f64,

    #[serde(default = "default_max_predictions")]
    pub max_predictions_per_step: usize,

    #[serde(default = "default_confidence")]
    pub prediction_confidence: IntRange,
    #[serde(default = "default_time_to_failure")]
    pub time_to_failure_hours: IntRange,
    #[serde(default = "default_business_impact")]
    pub business_impact_usd: IntRange,
    #[serde(default = "default_preventive_cost")]
    pub preventive_cost_usd: IntRange,
    #[serde(default = "default_technician_duration")]
    pub technician_duration_hours: FloatRange,
    #[serde(default = "default_client_health")]
    pub client_health_score: IntRange,

    #[serde(default = "default_renewal_chance")]
    pub renewal_chance: f64,
    #[serde(default = "default_pricing_chance")]
    pub pricing_adjustment_chance: f64,
    #[serde(default = "default_vulnerability_chance")]
    pub vulnerability_chance: f64,
    #[serde(default = "default_remediation_chance")]
    pub remediation_chance: f64,
    #[serde(default = "default_compliance_chance")]
    pub compliance_audit_chance: f64,
    #[serde(default = "default_improvement_chance")]
    pub learning_improvement_chance: f64,

    /// Added to prediction accuracy every cycle
    #[serde(default = "default_accuracy_drift")]
    pub accuracy_drift: FloatRange,
    #[serde(default = "default_accuracy_cap")]
    pub accuracy_cap: f64,

    /// Chance per cycle that the active incident count moves by one
    #[serde(default = "default_incident_walk_chance")]
    pub incident_walk_chance: f64,
}

fn default_risk_threshold() -> f64 {
    85.0
}
fn default_max_predictions() -> usize {
    5
}
fn default_confidence() -> IntRange {
    IntRange::new(75, 95)
}
fn default_time_to_failure() -> IntRange {
    IntRange::new(24, 48)
}
fn default_business_impact() -> IntRange {
    IntRange::new(5_000, 25_000)
}
fn default_preventive_cost() -> IntRange {
    IntRange::new(500, 2_000)
}
fn default_technician_duration() -> FloatRange {
    FloatRange::new(1.0, 4.0)
}
fn default_client_health() -> IntRange {
    IntRange::new(60, 85)
}
fn default_renewal_chance() -> f64 {
    0.3
}
fn default_pricing_chance() -> f64 {
    0.7
}
fn default_vulnerability_chance() -> f64 {
    0.5
}
fn default_remediation_chance() -> f64 {
    0.7
}
fn default_compliance_chance() -> f64 {
    0.3
}
fn default_improvement_chance() -> f64 {
    0.7
}
fn default_accuracy_drift() -> FloatRange {
    FloatRange::new(-0.1, 0.3)
}
fn default_accuracy_cap() -> f64 {
    95.0
}
fn default_incident_walk_chance() -> f64 {
    0.1
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            gates: StepGates::default(),
            risk_threshold: default_risk_threshold(),
            max_predictions_per_step: default_max_predictions(),
            prediction_confidence: default_confidence(),
            time_to_failure_hours: default_time_to_failure(),
            business_impact_usd: default_business_impact(),
            preventive_cost_usd: default_preventive_cost(),
            technician_duration_hours: default_technician_duration(),
            client_health_score: default_client_health(),
            renewal_chance: default_renewal_chance(),
            pricing_adjustment_chance: default_pricing_chance(),
            vulnerability_chance: default_vulnerability_chance(),
            remediation_chance: default_remediation_chance(),
            compliance_audit_chance: default_compliance_chance(),
            learning_improvement_chance: default_improvement_chance(),
            accuracy_drift: default_accuracy_drift(),
            accuracy_cap: default_accuracy_cap(),
            incident_walk_chance: default_incident_walk_chance(),
        }
    }
}

impl SimulationConfig {
    /// Check every probability is in [0, 1] and every range is ordered.
    pub fn validate(&self) -> Result<(), String> {
        let mut probabilities: Vec<(&str, f64)> = self.gates.all().to_vec();
        probabilities.extend([
            ("renewal_chance", self.renewal_chance),
            ("pricing_adjustment_chance", self.pricing_adjustment_chance),
            ("vulnerability_chance", self.vulnerability_chance),
            ("remediation_chance", self.remediation_chance),
            ("compliance_audit_chance", self.compliance_audit_chance),
            ("learning_improvement_chance", self.learning_improvement_chance),
            ("incident_walk_chance", self.incident_walk_chance),
        ]);
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(format!("{name} must be between 0.0 and 1.0, got {p}"));
            }
        }

        let int_ranges = [
            ("prediction_confidence", self.prediction_confidence),
            ("time_to_failure_hours", self.time_to_failure_hours),
            ("business_impact_usd", self.business_impact_usd),
            ("preventive_cost_usd", self.preventive_cost_usd),
            ("client_health_score", self.client_health_score),
        ];
        for (name, range) in int_ranges {
            if range.min > range.max {
                return Err(format!("{name}: min {} > max {}", range.min, range.max));
            }
        }
        if self.prediction_confidence.max > 100 || self.client_health_score.max > 100 {
            return Err("percent ranges must stay within 0..=100".into());
        }
        if self.preventive_cost_usd.min == 0 {
            return Err("preventive_cost_usd.min must be > 0".into());
        }

        for (name, range) in [
            ("technician_duration_hours", self.technician_duration_hours),
            ("accuracy_drift", self.accuracy_drift),
        ] {
            if !(range.min.is_finite() && range.max.is_finite() && (range.max - range.min).is_finite()) {
                return Err(format!("{name}: bounds must be finite, got {} and {}", range.min, range.max));
            }
            if range.min > range.max {
                return Err(format!("{name}: min {} > max {}", range.min, range.max));
            }
        }
        for (name, value) in [("accuracy_cap", self.accuracy_cap), ("risk_threshold", self.risk_threshold)] {
            if !value.is_finite() {
                return Err(format!("{name} must be finite, got {value}"));
            }
        }

        if self.max_predictions_per_step == 0 {
            return Err("max_predictions_per_step must be > 0".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_valid() {
        let sim = SimulationConfig::default();
        assert!(sim.validate().is_ok());
        assert!((sim.gates.monitoring - 0.7).abs() < f64::EPSILON);
        assert_eq!(sim.preventive_cost_usd, IntRange::new(500, 2_000));
    }

    #[test]
    fn out_of_range_probability_rejected() {
        let mut sim = SimulationConfig::default();
        sim.gates.security = 1.5;
        let err = sim.validate().unwrap_err();
        assert!(err.contains("security"));
    }

    #[test]
    fn inverted_range_rejected() {
        let sim = SimulationConfig {
            business_impact_usd: IntRange::new(9_000, 100),
            ..SimulationConfig::default()
        };
        assert!(sim.validate().unwrap_err().contains("business_impact_usd"));
    }

    #[test]
    fn non_finite_float_ranges_rejected() {
        for drift in [
            FloatRange::new(-0.1, f64::INFINITY),
            FloatRange::new(f64::NAN, 0.3),
            FloatRange::new(-f64::MAX, f64::MAX),
        ] {
            let sim = SimulationConfig {
                accuracy_drift: drift,
                ..SimulationConfig::default()
            };
            assert!(sim.validate().unwrap_err().contains("accuracy_drift"));
        }

        let sim = SimulationConfig {
            technician_duration_hours: FloatRange::new(1.0, f64::NAN),
            ..SimulationConfig::default()
        };
        assert!(sim.validate().unwrap_err().contains("technician_duration_hours"));

        let sim = SimulationConfig {
            accuracy_cap: f64::NAN,
            ..SimulationConfig::default()
        };
        assert!(sim.validate().unwrap_err().contains("accuracy_cap"));
    }

    #[test]
    fn nan_and_inf_from_toml_rejected() {
        let sim: SimulationConfig = toml::from_str(
            r#"
accuracy_drift = { min = -0.1, max = inf }
"#,
        )
        .unwrap();
        assert!(sim.validate().is_err());

        let sim: SimulationConfig = toml::from_str(
            r#"
accuracy_drift = { min = nan, max = 0.3 }
"#,
        )
        .unwrap();
        assert!(sim.validate().is_err());
    }

    #[test]
    fn partial_table_fills_defaults() {
        let sim: SimulationConfig = toml::from_str(
            r#"
risk_threshold = 80.0
[gates]
monitoring = 1.0
"#,
        )
        .unwrap();
        assert!((sim.risk_threshold - 80.0).abs() < f64::EPSILON);
        assert!((sim.gates.monitoring - 1.0).abs() < f64::EPSILON);
        assert!((sim.gates.decision - 0.6).abs() < f64::EPSILON);
        assert_eq!(sim.max_predictions_per_step, 5);
    }

    #[test]
    fn ranges_are_inclusive() {
        let r = IntRange::new(500, 2_000);
        assert!(r.contains(500));
        assert!(r.contains(2_000));
        assert!(!r.contains(2_001));
        assert!(FloatRange::new(1.0, 4.0).contains(4.0));
    }
}
