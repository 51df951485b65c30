//! Phase weight vectors and context-driven weight resolution
//!
//! Every context attribute contributes signed adjustments to the
//! baseline phase weights. Adjustments compound across attributes (two
//! attributes pushing the same phase push twice), each weight is clamped
//! to a floor so no phase ever vanishes, then the vector is renormalized
//! to sum exactly 1. Resolution is a pure function of the context.

use serde::{Deserialize, Serialize};

use isd_core::scenario::ContextAttributes;

use crate::criteria::Phase;

/// No phase weight may drop below this after adjustment.
pub const WEIGHT_FLOOR: f64 = 0.05;

/// Weights over the five phases. Always normalized (sum 1.0 ± 1e-6)
/// when produced by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    pub analysis: f64,
    pub design: f64,
    pub development: f64,
    pub implementation: f64,
    pub evaluation: f64,
}

impl WeightVector {
    /// Discipline-neutral baseline.
    pub fn baseline() -> Self {
        Self {
            analysis: 0.25,
            design: 0.25,
            development: 0.20,
            implementation: 0.15,
            evaluation: 0.15,
        }
    }

    pub fn get(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Analysis => self.analysis,
            Phase::Design => self.design,
            Phase::Development => self.development,
            Phase::Implementation => self.implementation,
            Phase::Evaluation => self.evaluation,
        }
    }

    fn get_mut(&mut self, phase: Phase) -> &mut f64 {
        match phase {
            Phase::Analysis => &mut self.analysis,
            Phase::Design => &mut self.design,
            Phase::Development => &mut self.development,
            Phase::Implementation => &mut self.implementation,
            Phase::Evaluation => &mut self.evaluation,
        }
    }

    pub fn sum(&self) -> f64 {
        Phase::ALL.iter().map(|p| self.get(*p)).sum()
    }

    fn clamp_to_floor(&mut self) {
        for phase in Phase::ALL {
            let w = self.get_mut(phase);
            if *w < WEIGHT_FLOOR {
                *w = WEIGHT_FLOOR;
            }
        }
    }

    /// Renormalize to sum 1 without letting any phase slip back under
    /// the floor: phases that would scale below it are pinned at the
    /// floor and the remaining mass is redistributed proportionally.
    fn normalize_with_floor(&mut self) {
        if (self.sum() - 1.0).abs() < 1e-9 {
            return;
        }
        let mut pinned: Vec<Phase> = Vec::new();
        loop {
            let free: Vec<Phase> = Phase::ALL
                .iter()
                .copied()
                .filter(|p| !pinned.contains(p))
                .collect();
            let free_mass: f64 = free.iter().map(|p| self.get(*p)).sum();
            let target = 1.0 - WEIGHT_FLOOR * pinned.len() as f64;
            if free.is_empty() || free_mass <= 0.0 {
                break;
            }

            let mut repinned = false;
            for phase in &free {
                if self.get(*phase) / free_mass * target < WEIGHT_FLOOR {
                    pinned.push(*phase);
                    repinned = true;
                }
            }
            if repinned {
                continue;
            }

            for phase in &free {
                let scaled = self.get(*phase) / free_mass * target;
                *self.get_mut(*phase) = scaled;
            }
            for phase in &pinned {
                *self.get_mut(*phase) = WEIGHT_FLOOR;
            }
            break;
        }
    }
}

impl Default for WeightVector {
    fn default() -> Self {
        Self::baseline()
    }
}

type Rule = (&'static str, &'static [(Phase, f64)]);

const AGE_RULES: &[Rule] = &[
    ("teens", &[
        (Phase::Development, 0.10),
        (Phase::Design, 0.05),
        (Phase::Analysis, -0.10),
        (Phase::Evaluation, -0.05),
    ]),
    ("30s", &[
        (Phase::Analysis, 0.05),
        (Phase::Implementation, 0.05),
        (Phase::Development, -0.05),
        (Phase::Evaluation, -0.05),
    ]),
    ("40s and above", &[
        (Phase::Analysis, 0.10),
        (Phase::Implementation, 0.05),
        (Phase::Development, -0.10),
        (Phase::Design, -0.05),
    ]),
];

const EDUCATION_RULES: &[Rule] = &[
    ("elementary", &[
        (Phase::Development, 0.15),
        (Phase::Design, 0.05),
        (Phase::Analysis, -0.10),
        (Phase::Evaluation, -0.10),
    ]),
    ("middle school", &[
        (Phase::Development, 0.10),
        (Phase::Design, 0.05),
        (Phase::Analysis, -0.10),
        (Phase::Evaluation, -0.05),
    ]),
    ("high school", &[
        (Phase::Design, 0.05),
        (Phase::Evaluation, 0.05),
        (Phase::Development, -0.05),
        (Phase::Implementation, -0.05),
    ]),
    ("adult", &[
        (Phase::Analysis, 0.10),
        (Phase::Implementation, 0.05),
        (Phase::Development, -0.10),
        (Phase::Design, -0.05),
    ]),
];

const EXPERTISE_RULES: &[Rule] = &[
    ("novice", &[
        (Phase::Development, 0.10),
        (Phase::Design, 0.05),
        (Phase::Analysis, -0.05),
        (Phase::Evaluation, -0.10),
    ]),
    ("advanced", &[
        (Phase::Analysis, 0.10),
        (Phase::Evaluation, 0.10),
        (Phase::Development, -0.10),
        (Phase::Design, -0.10),
    ]),
];

const DOMAIN_RULES: &[Rule] = &[
    ("Language", &[
        (Phase::Implementation, 0.10),
        (Phase::Design, 0.05),
        (Phase::Analysis, -0.10),
        (Phase::Evaluation, -0.05),
    ]),
    ("Mathematics", &[
        (Phase::Design, 0.10),
        (Phase::Development, 0.05),
        (Phase::Implementation, -0.10),
        (Phase::Analysis, -0.05),
    ]),
    ("Science", &[
        (Phase::Development, 0.10),
        (Phase::Design, 0.05),
        (Phase::Analysis, -0.05),
        (Phase::Evaluation, -0.10),
    ]),
    ("Social Studies", &[
        (Phase::Analysis, 0.05),
        (Phase::Design, 0.05),
        (Phase::Development, -0.05),
        (Phase::Implementation, -0.05),
    ]),
    ("Software/IT", &[
        (Phase::Implementation, 0.10),
        (Phase::Development, 0.05),
        (Phase::Analysis, -0.10),
        (Phase::Evaluation, -0.05),
    ]),
    ("AI", &[
        (Phase::Implementation, 0.10),
        (Phase::Development, 0.05),
        (Phase::Analysis, -0.10),
        (Phase::Evaluation, -0.05),
    ]),
    ("Medical/Nursing", &[
        (Phase::Evaluation, 0.10),
        (Phase::Development, 0.05),
        (Phase::Analysis, -0.05),
        (Phase::Design, -0.10),
    ]),
    ("Business/HR", &[
        (Phase::Analysis, 0.05),
        (Phase::Evaluation, 0.05),
        (Phase::Development, -0.05),
        (Phase::Implementation, -0.05),
    ]),
    ("Education/Pedagogy", &[
        (Phase::Design, 0.10),
        (Phase::Evaluation, 0.05),
        (Phase::Development, -0.05),
        (Phase::Analysis, -0.10),
    ]),
    ("Customer Service", &[
        (Phase::Implementation, 0.10),
        (Phase::Evaluation, 0.05),
        (Phase::Analysis, -0.10),
        (Phase::Development, -0.05),
    ]),
];

const DELIVERY_RULES: &[Rule] = &[
    ("offline classroom", &[
        (Phase::Implementation, 0.10),
        (Phase::Design, 0.05),
        (Phase::Development, -0.10),
        (Phase::Analysis, -0.05),
    ]),
    ("online live", &[
        (Phase::Implementation, 0.10),
        (Phase::Design, 0.05),
        (Phase::Development, -0.05),
        (Phase::Evaluation, -0.10),
    ]),
    ("online asynchronous (LMS)", &[
        (Phase::Development, 0.10),
        (Phase::Analysis, -0.05),
        (Phase::Implementation, -0.05),
    ]),
    ("blended", &[
        (Phase::Design, 0.05),
        (Phase::Implementation, 0.05),
        (Phase::Development, -0.05),
        (Phase::Evaluation, -0.05),
    ]),
    ("simulation/VR", &[
        (Phase::Development, 0.15),
        (Phase::Analysis, -0.05),
        (Phase::Evaluation, -0.10),
    ]),
    ("mobile microlearning", &[
        (Phase::Development, 0.15),
        (Phase::Analysis, 0.05),
        (Phase::Implementation, -0.10),
        (Phase::Evaluation, -0.10),
    ]),
    ("project-based (PBL)", &[
        (Phase::Design, 0.10),
        (Phase::Evaluation, 0.10),
        (Phase::Development, -0.10),
        (Phase::Analysis, -0.10),
    ]),
];

const INSTITUTION_RULES: &[Rule] = &[
    ("corporate", &[
        (Phase::Analysis, 0.05),
        (Phase::Implementation, 0.05),
        (Phase::Development, -0.05),
        (Phase::Evaluation, -0.05),
    ]),
    ("university", &[
        (Phase::Design, 0.05),
        (Phase::Evaluation, 0.05),
        (Phase::Implementation, -0.05),
        (Phase::Analysis, -0.05),
    ]),
    ("k-12 school", &[
        (Phase::Development, 0.10),
        (Phase::Analysis, -0.05),
        (Phase::Evaluation, -0.05),
    ]),
];

const DURATION_RULES: &[Rule] = &[
    ("short (1 week or less)", &[
        (Phase::Implementation, 0.10),
        (Phase::Analysis, -0.05),
        (Phase::Evaluation, -0.05),
    ]),
    ("long (1-6 months)", &[
        (Phase::Analysis, 0.05),
        (Phase::Evaluation, 0.05),
        (Phase::Implementation, -0.05),
        (Phase::Development, -0.05),
    ]),
];

const CLASS_SIZE_RULES: &[Rule] = &[
    ("small (1-10)", &[
        (Phase::Design, 0.05),
        (Phase::Evaluation, 0.10),
        (Phase::Development, -0.10),
        (Phase::Implementation, -0.05),
    ]),
    ("medium (10-30)", &[
        (Phase::Implementation, 0.10),
        (Phase::Design, 0.05),
        (Phase::Analysis, -0.10),
        (Phase::Evaluation, -0.05),
    ]),
    ("large (30+)", &[
        (Phase::Development, 0.10),
        (Phase::Implementation, 0.05),
        (Phase::Evaluation, -0.10),
        (Phase::Design, -0.05),
    ]),
];

/// Resolves phase weights from scenario context. Stateless and pure:
/// the same context always yields the same vector.
pub struct ContextWeightResolver;

impl ContextWeightResolver {
    pub fn resolve(context: &ContextAttributes) -> WeightVector {
        let mut weights = WeightVector::baseline();

        Self::apply(&mut weights, context.age_band.as_deref(), AGE_RULES);
        Self::apply(&mut weights, context.education_level.as_deref(), EDUCATION_RULES);
        Self::apply(&mut weights, context.expertise_level.as_deref(), EXPERTISE_RULES);
        Self::apply(&mut weights, context.subject_domain.as_deref(), DOMAIN_RULES);
        Self::apply(&mut weights, context.delivery_mode.as_deref(), DELIVERY_RULES);
        Self::apply(&mut weights, context.class_size.as_deref(), CLASS_SIZE_RULES);
        Self::apply(&mut weights, context.institution_type.as_deref(), INSTITUTION_RULES);
        Self::apply(&mut weights, context.duration.as_deref(), DURATION_RULES);

        weights.clamp_to_floor();
        weights.normalize_with_floor();
        weights
    }

    /// Unrecognized or absent attribute values match no rule and leave
    /// the vector untouched.
    fn apply(weights: &mut WeightVector, value: Option<&str>, rules: &[Rule]) {
        let Some(value) = value else { return };
        for (key, deltas) in rules {
            if value.eq_ignore_ascii_case(key) {
                for (phase, delta) in *deltas {
                    *weights.get_mut(*phase) += delta;
                }
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_normalized(w: &WeightVector) {
        assert!((w.sum() - 1.0).abs() < 1e-6, "sum was {}", w.sum());
        for phase in Phase::ALL {
            assert!(w.get(phase) >= WEIGHT_FLOOR - 1e-9, "{:?} below floor", phase);
        }
    }

    #[test]
    fn test_baseline_is_normalized() {
        assert_normalized(&WeightVector::baseline());
    }

    #[test]
    fn test_empty_context_yields_baseline() {
        let weights = ContextWeightResolver::resolve(&ContextAttributes::default());
        assert_eq!(weights, WeightVector::baseline());
    }

    #[test]
    fn test_unrecognized_values_ignored() {
        let context = ContextAttributes {
            age_band: Some("centenarians".to_string()),
            subject_domain: Some("Alchemy".to_string()),
            ..Default::default()
        };
        let weights = ContextWeightResolver::resolve(&context);
        assert_eq!(weights, WeightVector::baseline());
    }

    #[test]
    fn test_senior_medical_context_shifts_weights() {
        let context = ContextAttributes {
            age_band: Some("40s and above".to_string()),
            subject_domain: Some("Medical/Nursing".to_string()),
            ..Default::default()
        };
        let weights = ContextWeightResolver::resolve(&context);
        assert_normalized(&weights);
        assert!(weights.evaluation > 0.15);
        assert!(weights.analysis > 0.25);
    }

    #[test]
    fn test_adjustments_compound_across_attributes() {
        // elementary + novice + Science + simulation/VR all push Analysis
        // and Evaluation down; both end clamped at the floor.
        let context = ContextAttributes {
            education_level: Some("elementary".to_string()),
            expertise_level: Some("novice".to_string()),
            subject_domain: Some("Science".to_string()),
            delivery_mode: Some("simulation/VR".to_string()),
            ..Default::default()
        };
        let weights = ContextWeightResolver::resolve(&context);
        assert_normalized(&weights);
        assert!(weights.development > weights.analysis);
        assert!(weights.development > weights.evaluation);
    }

    #[test]
    fn test_institution_and_duration_adjust_weights() {
        // corporate and long-course rules both raise analysis
        let context = ContextAttributes {
            institution_type: Some("corporate".to_string()),
            duration: Some("long (1-6 months)".to_string()),
            ..Default::default()
        };
        let weights = ContextWeightResolver::resolve(&context);
        assert_normalized(&weights);
        assert!((weights.analysis - 0.35).abs() < 1e-9);
        assert!((weights.evaluation - 0.15).abs() < 1e-9);
        assert!((weights.development - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_resolution_is_pure() {
        let context = ContextAttributes {
            age_band: Some("teens".to_string()),
            delivery_mode: Some("blended".to_string()),
            class_size: Some("large (30+)".to_string()),
            ..Default::default()
        };
        let a = ContextWeightResolver::resolve(&context);
        let b = ContextWeightResolver::resolve(&context);
        assert_eq!(a, b);
    }

    #[test]
    fn test_normalization_holds_across_rule_grid() {
        let ages = [None, Some("teens"), Some("30s"), Some("40s and above")];
        let domains = [None, Some("Language"), Some("Medical/Nursing"), Some("Software/IT")];
        let sizes = [None, Some("small (1-10)"), Some("large (30+)")];
        for age in ages {
            for domain in domains {
                for size in sizes {
                    let context = ContextAttributes {
                        age_band: age.map(String::from),
                        subject_domain: domain.map(String::from),
                        class_size: size.map(String::from),
                        ..Default::default()
                    };
                    assert_normalized(&ContextWeightResolver::resolve(&context));
                }
            }
        }
    }
}
