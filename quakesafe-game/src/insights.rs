//! Turn raw per-feature importance scores into player-facing risk factors.
use serde::Serialize;
use std::collections::BTreeMap;

use crate::constants::{
    IMPORTANCE_HIGH_RISK, IMPORTANCE_HIGHLY_PROTECTIVE, IMPORTANCE_MODERATE_RISK,
    PRIMARY_FACTOR_LIMIT,
};

struct FeatureDescriptor {
    key: &'static str,
    name: &'static str,
    description: &'static str,
    unit: Option<&'static str>,
}

const fn describe(
    key: &'static str,
    name: &'static str,
    description: &'static str,
) -> FeatureDescriptor {
    FeatureDescriptor {
        key,
        name,
        description,
        unit: None,
    }
}

const DESCRIPTORS: &[FeatureDescriptor] = &[
    FeatureDescriptor {
        key: "age_building",
        name: "Building Age",
        description: "How old the building is",
        unit: Some("years"),
    },
    describe(
        "count_floors_pre_eq",
        "Number of Floors",
        "The number of floors in the building",
    ),
    describe(
        "geotechnical_risk",
        "Ground Stability Risk",
        "Risk related to the stability of the ground",
    ),
    describe(
        "height_plinth_ratio",
        "Height to Base Size Ratio",
        "The ratio of building height to its base area",
    ),
    describe(
        "has_superstructure_adobe_mud",
        "Adobe Mud Construction",
        "Made with sun-dried mud bricks",
    ),
    describe(
        "has_superstructure_mud_mortar_stone",
        "Stone with Mud Mortar Construction",
        "Made with stones held together by mud mortar",
    ),
    describe(
        "has_superstructure_stone_flag",
        "Stone Flag Construction",
        "Made with flat stone pieces",
    ),
    describe(
        "has_superstructure_cement_mortar_stone",
        "Stone with Cement Mortar Construction",
        "Made with stones held together by cement mortar",
    ),
    describe(
        "has_superstructure_mud_mortar_brick",
        "Brick with Mud Mortar Construction",
        "Made with bricks held together by mud mortar",
    ),
    describe(
        "has_superstructure_cement_mortar_brick",
        "Brick with Cement Mortar Construction",
        "Made with bricks held together by cement mortar",
    ),
    describe(
        "has_superstructure_timber",
        "Timber Construction",
        "Made primarily with wooden structures",
    ),
    describe(
        "has_superstructure_bamboo",
        "Bamboo Construction",
        "Made primarily with bamboo structures",
    ),
    describe(
        "has_superstructure_rc_non_engineered",
        "Non-Engineered Reinforced Concrete",
        "Built with reinforced concrete but without proper engineering design",
    ),
    describe(
        "has_superstructure_rc_engineered",
        "Engineered Reinforced Concrete",
        "Built with professionally engineered reinforced concrete",
    ),
    describe(
        "has_superstructure_other",
        "Other Construction Materials",
        "Uses other types of construction materials",
    ),
    describe(
        "foundation_type_Bamboo/Timber",
        "Bamboo/Timber Foundation",
        "Foundation made of bamboo or wood",
    ),
    describe(
        "foundation_type_Cement-Stone/Brick",
        "Cement-Stone/Brick Foundation",
        "Foundation made of cement-bonded stone or brick",
    ),
    describe(
        "foundation_type_Mud mortar-Stone/Brick",
        "Mud Mortar-Stone/Brick Foundation",
        "Foundation made of stone or brick with mud mortar",
    ),
    describe(
        "foundation_type_Other",
        "Other Foundation Type",
        "Uses other types of foundation materials",
    ),
    describe(
        "foundation_type_RC",
        "Reinforced Concrete Foundation",
        "Foundation made of reinforced concrete",
    ),
    describe(
        "roof_type_Bamboo/Timber",
        "Bamboo/Timber Roof",
        "Roof made of bamboo or wood",
    ),
    describe(
        "roof_type_RCC/RB/RBC",
        "Concrete Roof",
        "Roof made of reinforced cement concrete",
    ),
    describe(
        "ground_floor_type_Brick/Stone",
        "Brick/Stone Ground Floor",
        "Ground floor made of brick or stone",
    ),
    describe(
        "ground_floor_type_Mud",
        "Mud Ground Floor",
        "Ground floor made of mud",
    ),
    describe(
        "ground_floor_type_Other",
        "Other Ground Floor Type",
        "Uses other types of ground floor materials",
    ),
    describe(
        "ground_floor_type_RC",
        "Reinforced Concrete Ground Floor",
        "Ground floor made of reinforced concrete",
    ),
    describe(
        "ground_floor_type_Timber",
        "Timber Ground Floor",
        "Ground floor made of wood",
    ),
    describe(
        "other_floor_type_Not applicable",
        "No Upper Floors",
        "Building has only a ground floor",
    ),
    describe(
        "other_floor_type_RCC/RB/RBC",
        "Concrete Upper Floors",
        "Upper floors made of reinforced cement concrete",
    ),
    describe(
        "other_floor_type_TImber/Bamboo-Mud",
        "Timber/Bamboo-Mud Upper Floors",
        "Upper floors made of timber or bamboo with mud",
    ),
    describe(
        "other_floor_type_Timber-Planck",
        "Timber Plank Upper Floors",
        "Upper floors made of timber planks",
    ),
    describe(
        "position_Attached-1 side",
        "Attached on One Side",
        "Building is attached to another structure on one side",
    ),
    describe(
        "position_Attached-2 side",
        "Attached on Two Sides",
        "Building is attached to other structures on two sides",
    ),
    describe(
        "position_Attached-3 side",
        "Attached on Three Sides",
        "Building is attached to other structures on three sides",
    ),
    describe(
        "position_Not attached",
        "Standalone Building",
        "Building is not attached to any other structures",
    ),
];

fn descriptor(key: &str) -> Option<&'static FeatureDescriptor> {
    DESCRIPTORS.iter().find(|d| d.key == key)
}

/// Impact bucket of a single factor. Positive scores push damage up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactBucket {
    HighRisk,
    ModerateRisk,
    LowRisk,
    Protective,
    HighlyProtective,
}

impl ImpactBucket {
    /// Bucket for a raw importance score; exactly zero has no bucket.
    #[must_use]
    pub fn classify(value: f64) -> Option<Self> {
        if value >= IMPORTANCE_HIGH_RISK {
            Some(Self::HighRisk)
        } else if value >= IMPORTANCE_MODERATE_RISK {
            Some(Self::ModerateRisk)
        } else if value > 0.0 {
            Some(Self::LowRisk)
        } else if value <= IMPORTANCE_HIGHLY_PROTECTIVE {
            Some(Self::HighlyProtective)
        } else if value < 0.0 {
            Some(Self::Protective)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }
}

/// One model feature described for the player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorInsight {
    pub key: String,
    pub name: &'static str,
    pub description: &'static str,
    pub unit: Option<&'static str>,
    /// Absolute strength of the effect.
    pub impact: f64,
    pub raw_impact: f64,
    pub bucket: ImpactBucket,
}

/// Summary of what drove the prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskInsights {
    pub risk_level: RiskLevel,
    pub primary_factors: Vec<&'static str>,
    /// Every known factor with a nonzero score, most damaging first.
    pub factors: Vec<FactorInsight>,
}

impl RiskInsights {
    /// Build insights from raw importance scores; unknown feature names are ignored.
    #[must_use]
    pub fn from_importance(importance: &BTreeMap<String, f64>) -> Self {
        let mut factors: Vec<FactorInsight> = importance
            .iter()
            .filter(|(_, value)| value.is_finite())
            .filter_map(|(key, &value)| {
                let info = descriptor(key)?;
                let bucket = ImpactBucket::classify(value)?;
                Some(FactorInsight {
                    key: key.clone(),
                    name: info.name,
                    description: info.description,
                    unit: info.unit,
                    impact: value.abs(),
                    raw_impact: value,
                    bucket,
                })
            })
            .collect();
        factors.sort_by(|a, b| b.raw_impact.total_cmp(&a.raw_impact));

        let strongest = |bucket: ImpactBucket| -> Vec<&'static str> {
            let mut matching: Vec<&FactorInsight> =
                factors.iter().filter(|f| f.bucket == bucket).collect();
            matching.sort_by(|a, b| b.impact.total_cmp(&a.impact));
            matching
                .into_iter()
                .take(PRIMARY_FACTOR_LIMIT)
                .map(|f| f.name)
                .collect()
        };
        let high = strongest(ImpactBucket::HighRisk);
        let moderate = strongest(ImpactBucket::ModerateRisk);
        let highly_protective = strongest(ImpactBucket::HighlyProtective);

        let (risk_level, primary_factors) = if !high.is_empty() {
            (RiskLevel::High, high)
        } else if !highly_protective.is_empty() && moderate.is_empty() {
            (RiskLevel::Low, highly_protective)
        } else {
            (RiskLevel::Moderate, moderate)
        };

        Self {
            risk_level,
            primary_factors,
            factors,
        }
    }

    /// Factors in `bucket`, most damaging first.
    pub fn in_bucket(&self, bucket: ImpactBucket) -> impl Iterator<Item = &FactorInsight> {
        self.factors.iter().filter(move |f| f.bucket == bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    #[test]
    fn buckets_follow_thresholds() {
        assert_eq!(ImpactBucket::classify(10.0), Some(ImpactBucket::HighRisk));
        assert_eq!(ImpactBucket::classify(9.9), Some(ImpactBucket::ModerateRisk));
        assert_eq!(ImpactBucket::classify(5.0), Some(ImpactBucket::ModerateRisk));
        assert_eq!(ImpactBucket::classify(0.1), Some(ImpactBucket::LowRisk));
        assert_eq!(ImpactBucket::classify(0.0), None);
        assert_eq!(ImpactBucket::classify(-0.1), Some(ImpactBucket::Protective));
        assert_eq!(ImpactBucket::classify(-5.0), Some(ImpactBucket::HighlyProtective));
    }

    #[test]
    fn any_high_risk_factor_means_high_risk() {
        let insights = RiskInsights::from_importance(&scores(&[
            ("count_floors_pre_eq", 12.0),
            ("has_superstructure_bamboo", 15.5),
            ("height_plinth_ratio", 11.0),
            ("foundation_type_RC", -8.0),
        ]));
        assert_eq!(insights.risk_level, RiskLevel::High);
        assert_eq!(
            insights.primary_factors,
            vec!["Bamboo Construction", "Number of Floors"]
        );
        assert_eq!(insights.factors.first().map(|f| f.raw_impact), Some(15.5));
        assert_eq!(insights.factors.last().map(|f| f.raw_impact), Some(-8.0));
    }

    #[test]
    fn protective_without_moderate_means_low_risk() {
        let insights = RiskInsights::from_importance(&scores(&[
            ("foundation_type_RC", -9.0),
            ("roof_type_RCC/RB/RBC", -6.0),
            ("age_building", 1.0),
        ]));
        assert_eq!(insights.risk_level, RiskLevel::Low);
        assert_eq!(
            insights.primary_factors,
            vec!["Reinforced Concrete Foundation", "Concrete Roof"]
        );
        assert_eq!(insights.in_bucket(ImpactBucket::LowRisk).count(), 1);
    }

    #[test]
    fn moderate_is_the_fallback() {
        let insights = RiskInsights::from_importance(&scores(&[
            ("foundation_type_RC", -9.0),
            ("geotechnical_risk", 6.0),
        ]));
        assert_eq!(insights.risk_level, RiskLevel::Moderate);
        assert_eq!(insights.primary_factors, vec!["Ground Stability Risk"]);

        let empty = RiskInsights::from_importance(&BTreeMap::new());
        assert_eq!(empty.risk_level, RiskLevel::Moderate);
        assert!(empty.primary_factors.is_empty());
    }

    #[test]
    fn unknown_and_zero_features_are_skipped() {
        let insights = RiskInsights::from_importance(&scores(&[
            ("mystery_column", 50.0),
            ("age_building", 0.0),
        ]));
        assert!(insights.factors.is_empty());
        assert_eq!(insights.risk_level, RiskLevel::Moderate);
    }
}
