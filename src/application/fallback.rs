//! Clinical fallback scorer: deterministic weighted-rule CKD risk.
//!
//! Used as the last inference tier. Each measurement contributes at most one
//! banded increment (most severe band first); categorical flags add
//! independently. The total is capped at [`MAX_SCORE`].
//!
//! A band fires when a rising marker reaches its threshold (`>=`), or when
//! hemoglobin falls strictly below its threshold.

use crate::domain::{derive, ClinicalRecord, FeatureVector, HIGH_CREATININE_MG_DL};

/// The rule engine never reports certainty.
pub const MAX_SCORE: f64 = 0.95;

/// Scores above this are labelled CKD.
pub const LABEL_THRESHOLD: f64 = 0.5;

/// `(threshold, increment)`, most severe first.
type Bands = &'static [(f64, f64)];

const AGE_BANDS: Bands = &[(65.0, 0.15), (50.0, 0.08), (40.0, 0.03)];

const CREATININE_BANDS: Bands = &[
    (3.0, 0.40),
    (2.5, 0.35),
    (2.0, 0.28),
    (1.5, 0.18),
    (1.2, 0.08),
];

const BP_BANDS: Bands = &[(160.0, 0.12), (140.0, 0.08), (130.0, 0.04)];

/// Inverse: lower hemoglobin is worse.
const HEMOGLOBIN_BANDS: Bands = &[(9.0, 0.15), (11.0, 0.10), (12.0, 0.05)];

const UREA_BANDS: Bands = &[(50.0, 0.12), (40.0, 0.10), (25.0, 0.08)];

/// `(feature, increment)` for yes/no comorbidity flags.
const FLAG_WEIGHTS: &[(&str, f64)] = &[("htn", 0.10), ("dm", 0.12), ("ane", 0.08), ("pe", 0.06)];

fn rising(value: f64, bands: Bands) -> f64 {
    bands
        .iter()
        .find(|(threshold, _)| value >= *threshold)
        .map_or(0.0, |(_, inc)| *inc)
}

fn falling(value: f64, bands: Bands) -> f64 {
    // 0 means the reading is absent; no hemoglobin is physiologically 0.
    if value <= 0.0 {
        return 0.0;
    }
    bands
        .iter()
        .find(|(threshold, _)| value < *threshold)
        .map_or(0.0, |(_, inc)| *inc)
}

/// Weighted-rule risk estimator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClinicalFallbackScorer;

impl ClinicalFallbackScorer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Score a raw record.
    #[must_use]
    pub fn score(&self, record: &ClinicalRecord) -> f64 {
        self.score_features(&derive(record))
    }

    /// Score an already derived feature vector.
    #[must_use]
    pub fn score_features(&self, features: &FeatureVector) -> f64 {
        let mut score = 0.0;

        score += rising(features.value("age"), AGE_BANDS);
        score += rising(features.value("sc"), CREATININE_BANDS);
        score += rising(features.value("bp"), BP_BANDS);
        score += falling(features.value("hemo"), HEMOGLOBIN_BANDS);
        score += rising(features.value("bu"), UREA_BANDS);

        for (flag, inc) in FLAG_WEIGHTS {
            if features.value(flag) == 1.0 {
                score += inc;
            }
        }

        f64::min(score, MAX_SCORE)
    }

    /// Binary label for a score.
    #[must_use]
    pub fn label(score: f64) -> u8 {
        u8::from(score > LABEL_THRESHOLD)
    }

    /// Abnormal findings worth reporting alongside the score.
    #[must_use]
    pub fn primary_factors(&self, features: &FeatureVector) -> Vec<String> {
        let sc = features.value("sc");
        let hemo = features.value("hemo");
        let bu = features.value("bu");
        let bp = features.value("bp");

        let mut factors = Vec::new();
        if sc > HIGH_CREATININE_MG_DL {
            factors.push(format!("Elevated creatinine ({sc} mg/dL)"));
        }
        if hemo > 0.0 && hemo < 12.0 {
            factors.push(format!("Low hemoglobin ({hemo} g/dL)"));
        }
        if bu > 25.0 {
            factors.push(format!("High blood urea ({bu} mg/dL)"));
        }
        if bp > 140.0 {
            factors.push(format!("High blood pressure ({bp} mmHg)"));
        }
        factors
    }

    /// One-line summary of the primary factors.
    #[must_use]
    pub fn reasoning(factors: &[String]) -> String {
        if factors.is_empty() {
            "Risk assessment based on: Overall clinical parameters within normal ranges".to_string()
        } else {
            format!("Risk assessment based on: {}", factors.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn score(value: serde_json::Value) -> f64 {
        let record = ClinicalRecord::from_json(&value).expect("Should parse record");
        ClinicalFallbackScorer::new().score(&record)
    }

    #[test]
    fn test_empty_record_scores_zero() {
        assert_eq!(score(json!({})), 0.0);
    }

    #[test]
    fn test_reference_example() {
        let p = score(json!({
            "age": 50, "bp": 140, "sc": 2.0, "hemo": 11, "bu": 35,
            "htn": "yes", "dm": "no", "pe": "no", "ane": "no",
        }));
        // 0.08 + 0.28 + 0.08 + 0.05 + 0.08 + 0.10
        assert!((p - 0.67).abs() < 1e-9);
        assert_eq!(ClinicalFallbackScorer::label(p), 1);
    }

    #[test]
    fn test_caps_at_max() {
        let p = score(json!({
            "age": 80, "sc": 5, "bp": 200, "hemo": 6, "bu": 100,
            "htn": "yes", "dm": "yes", "ane": "yes", "pe": "yes",
        }));
        assert_eq!(p, MAX_SCORE);
    }

    #[test]
    fn test_monotone_in_creatinine() {
        let mut previous = 0.0;
        for step in 0..=60 {
            let sc = f64::from(step) * 0.1;
            let p = score(json!({ "age": 55, "bp": 135, "hemo": 12.5, "bu": 30, "sc": sc }));
            assert!(p >= previous, "score dropped at sc={sc}");
            previous = p;
        }
    }

    #[test]
    fn test_one_band_per_measurement() {
        // sc=3.5 only takes the most severe band.
        assert!((score(json!({ "sc": 3.5 })) - 0.40).abs() < 1e-12);
        assert!((score(json!({ "hemo": 8 })) - 0.15).abs() < 1e-12);
        assert!((score(json!({ "hemo": 13 })) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_hemoglobin_contributes_nothing() {
        assert_eq!(score(json!({ "hemo": "n/a" })), 0.0);
    }

    #[test]
    fn test_label_threshold_is_strict() {
        assert_eq!(ClinicalFallbackScorer::label(0.5), 0);
        assert_eq!(ClinicalFallbackScorer::label(0.51), 1);
    }

    #[test]
    fn test_primary_factors_and_reasoning() {
        let record = ClinicalRecord::from_json(&json!({ "sc": 2.0, "hemo": 11, "bp": 120 }))
            .expect("Should parse record");
        let scorer = ClinicalFallbackScorer::new();
        let factors = scorer.primary_factors(&derive(&record));

        assert_eq!(factors.len(), 2);
        assert!(factors[0].starts_with("Elevated creatinine"));
        assert!(ClinicalFallbackScorer::reasoning(&factors).contains("; "));
        assert!(ClinicalFallbackScorer::reasoning(&[]).contains("within normal ranges"));
    }
}
