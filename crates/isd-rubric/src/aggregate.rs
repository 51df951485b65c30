//! Multi-rater feedback aggregation
use std::collections::{BTreeMap, BTreeSet};

use crate::verdict::QualityVerdict;

/// Combines a panel of rater verdicts into one gate verdict.
///
/// The headline score is the arithmetic mean of the rater scores; each
/// per-sub-criterion grade is the MINIMUM across raters. The asymmetry
/// is deliberate: a panel can be satisfied on average while a single
/// dissatisfied rater still vetoes the specific criterion they flagged.
pub struct FeedbackAggregator;

impl FeedbackAggregator {
    pub fn aggregate(verdicts: &[QualityVerdict], threshold: f64) -> QualityVerdict {
        if verdicts.is_empty() {
            return QualityVerdict::fail_safe("no rater verdicts to aggregate");
        }

        let mean = verdicts.iter().map(|v| v.score).sum::<f64>() / verdicts.len() as f64;

        let sub_ids: BTreeSet<u8> = verdicts
            .iter()
            .flat_map(|v| v.sub_grades.keys().copied())
            .collect();
        let mut sub_grades = BTreeMap::new();
        for id in sub_ids {
            let min = verdicts
                .iter()
                .filter_map(|v| v.sub_grades.get(&id))
                .min()
                .copied();
            if let Some(min) = min {
                sub_grades.insert(id, min);
            }
        }

        let rationale = verdicts
            .iter()
            .map(|v| {
                let who = v.rater.map(|r| r.label()).unwrap_or("panel");
                format!("{}: {}", who, v.rationale)
            })
            .collect::<Vec<_>>()
            .join("\n");

        QualityVerdict {
            rater: None,
            score: mean,
            sub_grades,
            passed: mean >= threshold,
            rationale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::RaterRole;

    fn verdict(rater: RaterRole, score: f64) -> QualityVerdict {
        QualityVerdict::rated(rater, score, 7.0, format!("{} says {}", rater.label(), score))
    }

    #[test]
    fn test_headline_is_mean() {
        let panel = vec![
            verdict(RaterRole::Client, 6.0),
            verdict(RaterRole::Expert, 8.0),
            verdict(RaterRole::Learner, 9.0),
        ];
        let combined = FeedbackAggregator::aggregate(&panel, 7.0);
        assert!((combined.score - 23.0 / 3.0).abs() < 1e-9);
        assert!((combined.score - 7.667).abs() < 1e-3);
        assert!(combined.is_passing());
    }

    #[test]
    fn test_sub_grades_take_minimum() {
        let mut client = verdict(RaterRole::Client, 8.0);
        client.sub_grades.insert(18, 8);
        let mut expert = verdict(RaterRole::Expert, 8.0);
        expert.sub_grades.insert(18, 3);
        let mut learner = verdict(RaterRole::Learner, 8.0);
        learner.sub_grades.insert(18, 9);

        let combined = FeedbackAggregator::aggregate(&[client, expert, learner], 7.0);
        assert_eq!(combined.sub_grades.get(&18), Some(&3));
    }

    #[test]
    fn test_sub_grade_missing_from_some_raters() {
        let mut client = verdict(RaterRole::Client, 8.0);
        client.sub_grades.insert(11, 6);
        let expert = verdict(RaterRole::Expert, 8.0);

        let combined = FeedbackAggregator::aggregate(&[client, expert], 7.0);
        assert_eq!(combined.sub_grades.get(&11), Some(&6));
    }

    #[test]
    fn test_empty_panel_fails_safe() {
        let combined = FeedbackAggregator::aggregate(&[], 7.0);
        assert_eq!(combined.score, 0.0);
        assert!(!combined.is_passing());
    }

    #[test]
    fn test_rationale_carries_rater_labels() {
        let panel = vec![verdict(RaterRole::Client, 5.0), verdict(RaterRole::Expert, 6.0)];
        let combined = FeedbackAggregator::aggregate(&panel, 7.0);
        assert!(combined.rationale.contains("client:"));
        assert!(combined.rationale.contains("expert:"));
    }
}
