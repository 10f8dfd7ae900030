use quakesafe_game::{
    FeatureRecord, FoundationType, PredictionResult, Predictor, SimulationProgress,
    SuperstructureMaterial, TransportError,
};
use std::collections::BTreeMap;

const FLOOR_WEIGHT: f64 = 0.3;
const AGE_WEIGHT: f64 = 0.25;
const AGE_SCALE_YEARS: f64 = 50.0;
const SLENDERNESS_WEIGHT: f64 = 0.15;
const REFERENCE_HEIGHT_PLINTH_RATIO: f64 = 0.05;
/// Number of weighted terms; the score is averaged over them.
const TERM_COUNT: f64 = 5.0;
/// Importance scale applied to each term.
const IMPORTANCE_SCALE: f64 = 20.0;
/// Categorical weights above this push damage up, below it pull damage down.
const NEUTRAL_WEIGHT: f64 = 0.5;

const fn foundation_weight(foundation: FoundationType) -> f64 {
    match foundation {
        FoundationType::MudMortarStoneBrick => 0.8,
        FoundationType::BambooTimber => 0.9,
        FoundationType::CementStoneBrick => 0.5,
        FoundationType::Rc => 0.2,
        FoundationType::Other => 0.7,
    }
}

const fn foundation_column(foundation: FoundationType) -> &'static str {
    match foundation {
        FoundationType::MudMortarStoneBrick => "foundation_type_Mud mortar-Stone/Brick",
        FoundationType::BambooTimber => "foundation_type_Bamboo/Timber",
        FoundationType::CementStoneBrick => "foundation_type_Cement-Stone/Brick",
        FoundationType::Rc => "foundation_type_RC",
        FoundationType::Other => "foundation_type_Other",
    }
}

const fn material_weight(material: SuperstructureMaterial) -> f64 {
    match material {
        SuperstructureMaterial::AdobeMud => 0.9,
        SuperstructureMaterial::MudMortarStone | SuperstructureMaterial::StoneFlag => 0.8,
        SuperstructureMaterial::CementMortarStone => 0.7,
        SuperstructureMaterial::MudMortarBrick => 0.6,
        SuperstructureMaterial::CementMortarBrick => 0.5,
        SuperstructureMaterial::Timber => 0.4,
        SuperstructureMaterial::Bamboo | SuperstructureMaterial::RcNonEngineered => 0.3,
        SuperstructureMaterial::Other => 0.2,
        SuperstructureMaterial::RcEngineered => 0.1,
    }
}

/// Deterministic weighted damage heuristic used when no prediction service is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflinePredictor;

impl OfflinePredictor {
    /// Damage percentage and per-column importance for `features`.
    #[must_use]
    pub fn estimate(features: &FeatureRecord) -> PredictionResult {
        let mut importance = BTreeMap::new();

        let floors = (f64::from(features.count_floors_pre_eq) * FLOOR_WEIGHT).min(1.0);
        importance.insert("count_floors_pre_eq".to_string(), floors * IMPORTANCE_SCALE);

        let age =
            (f64::from(features.age_building) / AGE_SCALE_YEARS * AGE_WEIGHT).min(1.0);
        importance.insert("age_building".to_string(), age * IMPORTANCE_SCALE);

        let slenderness = (features.height_plinth_ratio / REFERENCE_HEIGHT_PLINTH_RATIO
            * SLENDERNESS_WEIGHT)
            .min(1.0);
        importance.insert(
            "height_plinth_ratio".to_string(),
            slenderness * IMPORTANCE_SCALE,
        );

        let foundation_kind = features.foundation().unwrap_or(FoundationType::Other);
        let foundation = foundation_weight(foundation_kind);
        importance.insert(
            foundation_column(foundation_kind).to_string(),
            (foundation - NEUTRAL_WEIGHT) * IMPORTANCE_SCALE,
        );

        let present: Vec<SuperstructureMaterial> = SuperstructureMaterial::ALL
            .into_iter()
            .filter(|&m| features.has_material(m))
            .collect();
        let superstructure = if present.is_empty() {
            material_weight(SuperstructureMaterial::Other)
        } else {
            let total: f64 = present.iter().map(|&m| material_weight(m)).sum();
            total / f64::from(u32::try_from(present.len()).unwrap_or(u32::MAX))
        };
        for material in present {
            importance.insert(
                format!("has_superstructure_{}", material.key()),
                (material_weight(material) - NEUTRAL_WEIGHT) * IMPORTANCE_SCALE,
            );
        }

        let score = floors + age + slenderness + foundation + superstructure;
        let prediction = ((score / TERM_COUNT * 100.0) * 10.0).round() / 10.0;
        PredictionResult::new(prediction.clamp(0.0, 100.0)).with_importance(importance)
    }
}

impl Predictor for OfflinePredictor {
    async fn predict(
        &self,
        features: &FeatureRecord,
        progress: &mut dyn FnMut(&SimulationProgress),
    ) -> Result<PredictionResult, TransportError> {
        progress(&SimulationProgress {
            progress: 0.0,
            message: Some("Estimating damage offline".to_string()),
        });
        let result = Self::estimate(features);
        log::debug!("offline estimate {:.1}% damage", result.prediction);
        progress(&SimulationProgress {
            progress: 100.0,
            message: None,
        });
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quakesafe_game::{Catalog, ImpactBucket, RiskInsights};

    fn record(size: &str, structure: &str) -> FeatureRecord {
        let catalog = Catalog::default_catalog();
        FeatureRecord::from_selections(
            catalog.building_size(size),
            catalog.building_structure(structure),
            catalog.location("gorkha"),
        )
        .unwrap()
    }

    #[test]
    fn concrete_two_story_scores_as_weighted_average() {
        let result = OfflinePredictor::estimate(&record("medium-two-story", "modern-concrete"));
        assert!((result.prediction - 28.8).abs() < 1e-9, "{}", result.prediction);
        assert!((result.survival_probability() - 71.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mixed_superstructure_is_averaged() {
        let result = OfflinePredictor::estimate(&record("small-single-story", "traditional-bamboo"));
        assert!((result.prediction - 32.6).abs() < 1e-9, "{}", result.prediction);
        let importance = result.feature_importance.unwrap();
        assert!(importance["has_superstructure_timber"] < 0.0);
        assert!(importance["has_superstructure_bamboo"] < 0.0);
        assert!(importance["foundation_type_Bamboo/Timber"] > 0.0);
    }

    #[test]
    fn reinforced_foundation_reads_as_protective() {
        let result = OfflinePredictor::estimate(&record(
            "large-three-story",
            "engineered-earthquake-resistant",
        ));
        let insights = RiskInsights::from_importance(&result.feature_importance.unwrap());
        assert!(
            insights
                .in_bucket(ImpactBucket::HighlyProtective)
                .any(|f| f.key == "foundation_type_RC")
        );
    }

    #[test]
    fn taller_buildings_take_more_damage() {
        let low = OfflinePredictor::estimate(&record("small-single-story", "basic-stone-brick"));
        let high = OfflinePredictor::estimate(&record("tall-three-story", "basic-stone-brick"));
        assert!(high.prediction > low.prediction);
    }

    #[test]
    fn predictor_reports_start_and_finish() {
        let mut seen = Vec::new();
        let result = tokio_test::block_on(OfflinePredictor.predict(
            &record("medium-two-story", "modern-concrete"),
            &mut |p| seen.push(p.progress),
        ))
        .unwrap();
        assert!(result.feature_importance.is_some());
        assert_eq!(seen, vec![0.0, 100.0]);
    }
}
