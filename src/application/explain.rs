//! Explainability synthesizer.
//!
//! Builds the explanation shown next to a prediction: banded per-feature
//! attributions around a base value, four illustrative partial dependence
//! curves, and a ranked list of the locally relevant findings.
//!
//! The output depends only on the record and the prediction it explains.

use crate::domain::{
    Attribution, ClinicalRecord, ExplanationBundle, Impact, LocalFactor, PartialDependence,
};

/// Reference risk before any feature contribution.
pub const BASE_VALUE: f64 = 0.3;

/// Number of points on each partial dependence curve.
pub const PDP_POINTS: usize = 20;

/// Maximum entries in the local explanation.
pub const MAX_LOCAL_FACTORS: usize = 5;

/// Errors raised while building an explanation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExplainError {
    #[error("Invalid prediction: {0}")]
    InvalidPrediction(String),
}

/// Explanation step used by the assessment service.
pub trait Explainer: Send + Sync {
    /// Explain a prediction for `record`.
    ///
    /// # Errors
    /// Returns `ExplainError` if no explanation can be produced.
    fn explain(
        &self,
        record: &ClinicalRecord,
        probability: f64,
        label: u8,
    ) -> Result<ExplanationBundle, ExplainError>;
}

/// Measurements read by the synthesizer, with neutral values substituted
/// for anything missing or not coercible.
struct Readings {
    sc: f64,
    age: f64,
    hemo: f64,
    bu: f64,
    bp: f64,
    al: f64,
    bgr: f64,
    sod: f64,
    pot: f64,
    wbcc: f64,
    rbcc: f64,
    htn: bool,
    dm: bool,
    ane: bool,
    pe: bool,
}

impl Readings {
    fn from_record(record: &ClinicalRecord) -> Self {
        Self {
            sc: record.number_or("sc", 1.0),
            age: record.number_or("age", 45.0),
            // A hemoglobin of 0 is an unmeasured reading.
            hemo: record.number("hemo").filter(|h| *h > 0.0).unwrap_or(12.0),
            bu: record.number_or("bu", 35.0),
            bp: record.number_or("bp", 120.0),
            al: record.number_or("al", 1.0),
            bgr: record.number_or("bgr", 145.0),
            sod: record.number_or("sod", 135.0),
            pot: record.number_or("pot", 4.5),
            wbcc: record.number_or("wbcc", 7600.0),
            rbcc: record.number_or("rbcc", 5.2),
            htn: record.is_yes("htn"),
            dm: record.is_yes("dm"),
            ane: record.is_yes("ane"),
            pe: record.is_yes("pe"),
        }
    }
}

fn flag(present: bool, if_present: f64, if_absent: f64) -> f64 {
    if present {
        if_present
    } else {
        if_absent
    }
}

/// Generator for [`ExplanationBundle`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplainabilitySynthesizer;

impl ExplainabilitySynthesizer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Explain a prediction for `record`.
    ///
    /// # Errors
    /// Returns `ExplainError::InvalidPrediction` if `probability` is not a
    /// finite value in [0, 1] or `label` is not binary.
    pub fn explain(
        &self,
        record: &ClinicalRecord,
        probability: f64,
        label: u8,
    ) -> Result<ExplanationBundle, ExplainError> {
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(ExplainError::InvalidPrediction(format!(
                "probability {probability} outside [0, 1]"
            )));
        }
        if label > 1 {
            return Err(ExplainError::InvalidPrediction(format!(
                "label {label} is not binary"
            )));
        }

        let readings = Readings::from_record(record);
        let attributions = Self::attributions(&readings);
        let attribution_total = BASE_VALUE + attributions.iter().map(|a| a.weight).sum::<f64>();

        Ok(ExplanationBundle {
            attributions,
            base_value: BASE_VALUE,
            attribution_total,
            partial_dependence: Self::partial_dependence(),
            local_explanation: Self::local_explanation(&readings),
            probability,
            label,
        })
    }

    fn attributions(r: &Readings) -> Vec<Attribution> {
        let weights = [
            (
                "Serum Creatinine",
                if r.sc > 1.5 {
                    0.35
                } else if r.sc > 1.2 {
                    0.18
                } else {
                    -0.05
                },
            ),
            (
                "Age",
                if r.age > 60.0 {
                    0.15
                } else if r.age > 45.0 {
                    0.08
                } else {
                    -0.02
                },
            ),
            (
                "Hemoglobin",
                if r.hemo < 10.0 {
                    0.25
                } else if r.hemo < 12.0 {
                    0.12
                } else {
                    -0.03
                },
            ),
            (
                "Blood Urea",
                if r.bu > 40.0 {
                    0.18
                } else if r.bu > 25.0 {
                    0.08
                } else {
                    -0.02
                },
            ),
            (
                "Blood Pressure",
                if r.bp > 140.0 {
                    0.12
                } else if r.bp > 130.0 {
                    0.06
                } else {
                    -0.01
                },
            ),
            ("Hypertension", flag(r.htn, 0.10, -0.02)),
            (
                "Albumin",
                if r.al > 2.0 {
                    0.15
                } else if r.al > 1.0 {
                    0.06
                } else {
                    -0.01
                },
            ),
            ("Diabetes", flag(r.dm, 0.12, -0.02)),
            (
                "Blood Glucose",
                if r.bgr > 180.0 {
                    0.08
                } else if r.bgr > 160.0 {
                    0.04
                } else {
                    -0.01
                },
            ),
            (
                "Sodium",
                flag(r.sod < 130.0 || r.sod > 145.0, 0.03, -0.01),
            ),
            (
                "Potassium",
                flag(r.pot > 5.0 || r.pot < 3.5, 0.03, -0.01),
            ),
            ("WBC Count", flag(r.wbcc > 10_000.0, 0.02, -0.01)),
            ("RBC Count", flag(r.rbcc < 4.5, 0.02, -0.01)),
            ("Anemia", flag(r.ane, 0.08, -0.01)),
            ("Pedal Edema", flag(r.pe, 0.06, -0.03)),
        ];

        weights
            .into_iter()
            .map(|(feature, weight)| Attribution {
                feature: feature.to_string(),
                weight,
            })
            .collect()
    }

    /// The four illustrative response curves.
    #[must_use]
    pub fn partial_dependence() -> Vec<PartialDependence> {
        vec![
            curve("Serum Creatinine", 0.5, 4.0, |x| {
                1.0 / (1.0 + (-(x - 1.5) * 3.0).exp())
            }),
            curve("Age", 20.0, 80.0, |x| 0.2 + (x - 20.0) * 0.015),
            curve("Hemoglobin", 6.0, 16.0, |x| f64::max(1.2 - x * 0.08, 0.1)),
            curve("Blood Urea", 10.0, 80.0, |x| 0.15 + (x / 100.0).powf(1.5)),
        ]
    }

    fn local_explanation(r: &Readings) -> Vec<LocalFactor> {
        let mut factors = Vec::new();

        if r.sc > 1.2 {
            let (impact, weight) = if r.sc > 1.5 {
                (Impact::High, 0.35)
            } else {
                (Impact::Moderate, 0.18)
            };
            factors.push(LocalFactor {
                feature: "Serum Creatinine".into(),
                value: format!("{} mg/dL", r.sc),
                impact,
                weight,
                explanation: format!(
                    "Elevated creatinine ({}) indicates reduced kidney function",
                    r.sc
                ),
            });
        }

        if r.age > 50.0 {
            factors.push(LocalFactor {
                feature: "Age".into(),
                value: format!("{} years", r.age),
                impact: if r.age < 65.0 {
                    Impact::Moderate
                } else {
                    Impact::High
                },
                weight: if r.age > 60.0 { 0.15 } else { 0.08 },
                explanation: format!(
                    "Age {} increases CKD risk due to natural kidney decline",
                    r.age
                ),
            });
        }

        if r.hemo < 12.0 {
            let (impact, weight) = if r.hemo < 10.0 {
                (Impact::High, 0.25)
            } else {
                (Impact::Moderate, 0.12)
            };
            factors.push(LocalFactor {
                feature: "Hemoglobin".into(),
                value: format!("{} g/dL", r.hemo),
                impact,
                weight,
                explanation: format!(
                    "Low hemoglobin ({}) suggests anemia, common in CKD",
                    r.hemo
                ),
            });
        }

        if r.bu > 25.0 {
            let (impact, weight) = if r.bu > 40.0 {
                (Impact::High, 0.18)
            } else {
                (Impact::Moderate, 0.08)
            };
            factors.push(LocalFactor {
                feature: "Blood Urea".into(),
                value: format!("{} mg/dL", r.bu),
                impact,
                weight,
                explanation: format!(
                    "Blood urea of {} reflects reduced waste clearance",
                    r.bu
                ),
            });
        }

        if r.bp > 130.0 {
            factors.push(LocalFactor {
                feature: "Blood Pressure".into(),
                value: format!("{} mmHg", r.bp),
                impact: Impact::Moderate,
                weight: if r.bp > 140.0 { 0.12 } else { 0.06 },
                explanation: format!("Blood pressure of {} strains the glomeruli", r.bp),
            });
        }

        if r.al > 1.0 {
            let (impact, weight) = if r.al > 2.0 {
                (Impact::High, 0.15)
            } else {
                (Impact::Moderate, 0.06)
            };
            factors.push(LocalFactor {
                feature: "Albumin".into(),
                value: format!("{} (0-5 scale)", r.al),
                impact,
                weight,
                explanation: "Albumin in urine signals glomerular damage".into(),
            });
        }

        let conditions = [
            (
                r.htn,
                "Hypertension",
                Impact::Moderate,
                0.10,
                "Hypertension damages kidney blood vessels over time",
            ),
            (
                r.dm,
                "Diabetes",
                Impact::High,
                0.15,
                "Diabetes is the leading cause of chronic kidney disease",
            ),
            (
                r.ane,
                "Anemia",
                Impact::Moderate,
                0.08,
                "Anemia often accompanies declining kidney function",
            ),
            (
                r.pe,
                "Pedal Edema",
                Impact::Moderate,
                0.06,
                "Pedal edema can indicate fluid retention from reduced filtration",
            ),
        ];
        for (present, feature, impact, weight, explanation) in conditions {
            if present {
                factors.push(LocalFactor {
                    feature: feature.into(),
                    value: "Present".into(),
                    impact,
                    weight,
                    explanation: explanation.into(),
                });
            }
        }

        // Stable sort keeps the listing order on equal weights.
        factors.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        factors.truncate(MAX_LOCAL_FACTORS);
        factors
    }
}

impl Explainer for ExplainabilitySynthesizer {
    fn explain(
        &self,
        record: &ClinicalRecord,
        probability: f64,
        label: u8,
    ) -> Result<ExplanationBundle, ExplainError> {
        ExplainabilitySynthesizer::explain(self, record, probability, label)
    }
}

fn curve(feature: &str, start: f64, end: f64, f: impl Fn(f64) -> f64) -> PartialDependence {
    let step = (end - start) / (PDP_POINTS - 1) as f64;
    let x_values: Vec<f64> = (0..PDP_POINTS).map(|i| start + step * i as f64).collect();
    let y_values = x_values.iter().map(|&x| f(x).clamp(0.0, 1.0)).collect();
    PartialDependence {
        feature: feature.to_string(),
        x_values,
        y_values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> ClinicalRecord {
        ClinicalRecord::from_json(&value).expect("Should parse record")
    }

    fn explain(value: serde_json::Value) -> ExplanationBundle {
        ExplainabilitySynthesizer::new()
            .explain(&record(value), 0.67, 1)
            .expect("Should explain")
    }

    #[test]
    fn test_fifteen_attributions_in_order() {
        let bundle = explain(json!({}));
        assert_eq!(bundle.attributions.len(), 15);
        assert_eq!(bundle.attributions[0].feature, "Serum Creatinine");
        assert_eq!(bundle.attributions[14].feature, "Pedal Edema");
        assert_eq!(bundle.base_value, BASE_VALUE);

        let sum: f64 = bundle.attributions.iter().map(|a| a.weight).sum();
        assert!((bundle.attribution_total - (BASE_VALUE + sum)).abs() < 1e-12);
    }

    #[test]
    fn test_flags_weigh_more_when_present() {
        let flags = [
            ("pe", "Pedal Edema"),
            ("ane", "Anemia"),
            ("htn", "Hypertension"),
            ("dm", "Diabetes"),
        ];
        for (field, feature) in flags {
            let yes = explain(json!({ field: "yes" })).weight_of(feature);
            let no = explain(json!({ field: "no" })).weight_of(feature);
            assert!(yes > no, "{feature} presence must outweigh absence");
        }
        // Absent pedal edema is risk-reducing evidence.
        let no_pe = explain(json!({ "pe": "no" })).weight_of("Pedal Edema");
        assert_eq!(no_pe, Some(-0.03));
    }

    #[test]
    fn test_missing_measurements_use_neutral_values() {
        let empty = explain(json!({}));
        let neutral = explain(json!({
            "sc": 1.0, "age": 45, "hemo": 12, "bu": 35, "bp": 120, "al": 1,
            "bgr": 145, "sod": 135, "pot": 4.5, "wbcc": 7600, "rbcc": 5.2,
        }));
        assert_eq!(empty.attributions, neutral.attributions);

        let unmeasured_hemo = explain(json!({ "hemo": 0 }));
        assert_eq!(unmeasured_hemo.weight_of("Hemoglobin"), Some(-0.03));
    }

    #[test]
    fn test_deterministic() {
        let input = json!({ "sc": 2.4, "age": 67, "hemo": 9.5, "dm": "yes" });
        assert_eq!(explain(input.clone()), explain(input));
    }

    #[test]
    fn test_partial_dependence_curves() {
        let curves = ExplainabilitySynthesizer::partial_dependence();
        assert_eq!(curves.len(), 4);

        for curve in &curves {
            assert_eq!(curve.x_values.len(), PDP_POINTS);
            assert_eq!(curve.y_values.len(), PDP_POINTS);
            assert!(curve.y_values.iter().all(|y| (0.0..=1.0).contains(y)));
        }

        let creatinine = &curves[0];
        assert!((creatinine.x_values[0] - 0.5).abs() < 1e-12);
        assert!((creatinine.x_values[PDP_POINTS - 1] - 4.0).abs() < 1e-12);
        assert!(creatinine.y_values.windows(2).all(|w| w[1] >= w[0]));

        let hemoglobin = &curves[2];
        assert!(hemoglobin.y_values.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_local_explanation_ranked_and_capped() {
        let bundle = explain(json!({
            "sc": 3.1, "age": 70, "hemo": 9, "bu": 60, "bp": 150, "al": 3,
            "htn": "yes", "dm": "yes", "ane": "yes", "pe": "yes",
        }));
        let local = &bundle.local_explanation;
        assert_eq!(local.len(), MAX_LOCAL_FACTORS);
        assert!(local.windows(2).all(|w| w[0].weight >= w[1].weight));
        assert_eq!(local[0].feature, "Serum Creatinine");
        assert_eq!(local[0].impact, Impact::High);
        // Age, Albumin and Diabetes tie at 0.15 and keep their listing order.
        let names: Vec<&str> = local.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(
            names,
            vec!["Serum Creatinine", "Hemoglobin", "Blood Urea", "Age", "Albumin"]
        );
    }

    #[test]
    fn test_healthy_record_has_no_local_factors() {
        let bundle = explain(json!({
            "sc": 0.9, "age": 30, "hemo": 14, "bu": 20, "bp": 118, "al": 0,
            "htn": "no", "dm": "no", "ane": "no", "pe": "no",
        }));
        assert!(bundle.local_explanation.is_empty());
    }

    #[test]
    fn test_rejects_invalid_prediction() {
        let synth = ExplainabilitySynthesizer::new();
        let r = record(json!({}));
        assert!(matches!(
            synth.explain(&r, f64::NAN, 1),
            Err(ExplainError::InvalidPrediction(_))
        ));
        assert!(synth.explain(&r, 1.2, 1).is_err());
        assert!(synth.explain(&r, 0.4, 2).is_err());
    }
}
