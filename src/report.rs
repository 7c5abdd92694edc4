//! Damage report aggregation.
//!
//! Turns a finite detection list into a `DamageReport`: per-class counts and
//! a severity tier. Assessment is pure and infallible; empty or unknown-class
//! input degrades to `NoDamage` or an `unknown_<id>` bucket, never an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::detect::{DamageClass, Detection};

/// Overall severity tier for one image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    NoDamage,
    Minor,
    Moderate,
    Severe,
}

/// Tunable severity thresholds.
///
/// The default values (3/5 severe, 1/3 moderate) come from the original
/// assessment model. The rule ordering is part of the contract: severe-class
/// membership is checked before total-count thresholds, so a single crack is
/// Moderate, not Minor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeverityThresholds {
    /// Classes that escalate severity regardless of total count.
    pub severe_classes: Vec<DamageClass>,
    /// Severe when at least this many severe-class detections.
    pub severe_count_for_severe: usize,
    /// Severe when at least this many detections in total.
    pub total_for_severe: usize,
    /// Moderate when at least this many severe-class detections.
    pub severe_count_for_moderate: usize,
    /// Moderate when at least this many detections in total.
    pub total_for_moderate: usize,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            severe_classes: vec![
                DamageClass::BrokenPart,
                DamageClass::GlassDamage,
                DamageClass::Crack,
            ],
            severe_count_for_severe: 3,
            total_for_severe: 5,
            severe_count_for_moderate: 1,
            total_for_moderate: 3,
        }
    }
}

/// Aggregated damage assessment for one image. Built once, never mutated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DamageReport {
    pub total_damages: usize,
    /// Count per damage class. Classes absent from the input have no entry.
    pub damage_summary: BTreeMap<DamageClass, usize>,
    pub detailed_damages: Vec<Detection>,
    pub severity: Severity,
}

/// Severity assessor with explicit thresholds.
#[derive(Clone, Debug, Default)]
pub struct SeverityAssessor {
    thresholds: SeverityThresholds,
}

impl SeverityAssessor {
    pub fn new(thresholds: SeverityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &SeverityThresholds {
        &self.thresholds
    }

    /// Build a report from a detection list. The input is copied unmodified
    /// into `detailed_damages` in its original order.
    pub fn assess(&self, detections: &[Detection]) -> DamageReport {
        let mut damage_summary: BTreeMap<DamageClass, usize> = BTreeMap::new();
        for det in detections {
            *damage_summary.entry(det.class).or_insert(0) += 1;
        }

        DamageReport {
            total_damages: detections.len(),
            damage_summary,
            detailed_damages: detections.to_vec(),
            severity: self.severity_of(detections),
        }
    }

    /// Ordered decision, first matching rule wins.
    fn severity_of(&self, detections: &[Detection]) -> Severity {
        if detections.is_empty() {
            return Severity::NoDamage;
        }

        let t = &self.thresholds;
        let total = detections.len();
        let severe_count = detections
            .iter()
            .filter(|det| t.severe_classes.contains(&det.class))
            .count();

        if severe_count >= t.severe_count_for_severe || total >= t.total_for_severe {
            Severity::Severe
        } else if severe_count >= t.severe_count_for_moderate || total >= t.total_for_moderate {
            Severity::Moderate
        } else {
            Severity::Minor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::PixelBBox;

    fn det(class: DamageClass) -> Detection {
        Detection::new(class, 0.8, PixelBBox::new(0.0, 0.0, 10.0, 10.0))
    }

    fn severity(detections: &[Detection]) -> Severity {
        SeverityAssessor::default().assess(detections).severity
    }

    #[test]
    fn empty_input_is_no_damage() {
        let report = SeverityAssessor::default().assess(&[]);
        assert_eq!(report.total_damages, 0);
        assert!(report.damage_summary.is_empty());
        assert!(report.detailed_damages.is_empty());
        assert_eq!(report.severity, Severity::NoDamage);
    }

    #[test]
    fn severity_is_monotonic_in_count_for_non_severe_classes() {
        let expected = [
            (0, Severity::NoDamage),
            (1, Severity::Minor),
            (2, Severity::Minor),
            (3, Severity::Moderate),
            (4, Severity::Moderate),
            (5, Severity::Severe),
            (6, Severity::Severe),
        ];
        for (count, want) in expected {
            let dets: Vec<_> = (0..count).map(|_| det(DamageClass::Dent)).collect();
            assert_eq!(severity(&dets), want, "count={}", count);
        }
    }

    #[test]
    fn single_severe_class_detection_is_moderate_not_minor() {
        assert_eq!(severity(&[det(DamageClass::Crack)]), Severity::Moderate);
        assert_eq!(
            severity(&[det(DamageClass::GlassDamage)]),
            Severity::Moderate
        );
        assert_eq!(severity(&[det(DamageClass::BrokenPart)]), Severity::Moderate);
    }

    #[test]
    fn three_severe_class_detections_are_severe() {
        // severe_count=3 triggers the severe rule even though total=3 < 5
        let dets = vec![
            det(DamageClass::Crack),
            det(DamageClass::Crack),
            det(DamageClass::Crack),
        ];
        assert_eq!(severity(&dets), Severity::Severe);
    }

    #[test]
    fn summary_counts_only_present_classes() {
        let dets = vec![
            det(DamageClass::Dent),
            det(DamageClass::Dent),
            det(DamageClass::Scratch),
        ];
        let report = SeverityAssessor::default().assess(&dets);
        assert_eq!(report.damage_summary[&DamageClass::Dent], 2);
        assert_eq!(report.damage_summary[&DamageClass::Scratch], 1);
        assert!(!report.damage_summary.contains_key(&DamageClass::Rust));
        assert_eq!(report.total_damages, 3);
    }

    #[test]
    fn unknown_classes_count_under_their_own_bucket() {
        let dets = vec![det(DamageClass::Unknown(11)), det(DamageClass::Unknown(11))];
        let report = SeverityAssessor::default().assess(&dets);
        assert_eq!(report.damage_summary[&DamageClass::Unknown(11)], 2);
        assert_eq!(report.severity, Severity::Minor);
    }

    #[test]
    fn detailed_damages_preserve_input_order() {
        let dets = vec![det(DamageClass::Rust), det(DamageClass::Scratch)];
        let report = SeverityAssessor::default().assess(&dets);
        assert_eq!(report.detailed_damages[0].class, DamageClass::Rust);
        assert_eq!(report.detailed_damages[1].class, DamageClass::Scratch);
    }

    #[test]
    fn report_json_shape() {
        let report = SeverityAssessor::default().assess(&[det(DamageClass::Dent)]);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["total_damages"], 1);
        assert_eq!(value["damage_summary"]["dent"], 1);
        assert_eq!(value["severity"], "Minor");
        assert!(value["detailed_damages"].is_array());
    }

    #[test]
    fn custom_thresholds_shift_the_tiers() {
        let assessor = SeverityAssessor::new(SeverityThresholds {
            total_for_severe: 2,
            ..SeverityThresholds::default()
        });
        let dets = vec![det(DamageClass::Dent), det(DamageClass::Dent)];
        assert_eq!(assessor.assess(&dets).severity, Severity::Severe);
    }
}
