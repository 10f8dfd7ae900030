//! Flat feature record sent to the damage predictor.
use serde::{Deserialize, Serialize};

use crate::catalog::{
    BuildingSize, BuildingStructure, FoundationType, GroundFloorType, Location, OtherFloorType,
    RoofType, SuperstructureMaterial,
};
use crate::constants::NEW_BUILDING_AGE;
use crate::state::SessionError;

/// Model input row. Serialized names are the exact column labels the model was trained on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FeatureRecord {
    pub count_floors_pre_eq: u32,
    pub age_building: u32,
    pub has_superstructure_adobe_mud: u8,
    pub has_superstructure_mud_mortar_stone: u8,
    pub has_superstructure_stone_flag: u8,
    pub has_superstructure_cement_mortar_stone: u8,
    pub has_superstructure_mud_mortar_brick: u8,
    pub has_superstructure_cement_mortar_brick: u8,
    pub has_superstructure_timber: u8,
    pub has_superstructure_bamboo: u8,
    pub has_superstructure_rc_non_engineered: u8,
    pub has_superstructure_rc_engineered: u8,
    pub has_superstructure_other: u8,
    pub geotechnical_risk: f64,
    pub height_plinth_ratio: f64,
    #[serde(rename = "foundation_type_Bamboo/Timber")]
    pub foundation_bamboo_timber: u8,
    #[serde(rename = "foundation_type_Cement-Stone/Brick")]
    pub foundation_cement_stone_brick: u8,
    #[serde(rename = "foundation_type_Mud mortar-Stone/Brick")]
    pub foundation_mud_mortar_stone_brick: u8,
    #[serde(rename = "foundation_type_Other")]
    pub foundation_other: u8,
    #[serde(rename = "foundation_type_RC")]
    pub foundation_rc: u8,
    #[serde(rename = "roof_type_Bamboo/Timber")]
    pub roof_bamboo_timber: u8,
    #[serde(rename = "roof_type_RCC/RB/RBC")]
    pub roof_rcc_rb_rbc: u8,
    #[serde(rename = "ground_floor_type_Brick/Stone")]
    pub ground_floor_brick_stone: u8,
    #[serde(rename = "ground_floor_type_Mud")]
    pub ground_floor_mud: u8,
    #[serde(rename = "ground_floor_type_Other")]
    pub ground_floor_other: u8,
    #[serde(rename = "ground_floor_type_RC")]
    pub ground_floor_rc: u8,
    #[serde(rename = "ground_floor_type_Timber")]
    pub ground_floor_timber: u8,
    #[serde(rename = "other_floor_type_Not applicable")]
    pub other_floor_not_applicable: u8,
    #[serde(rename = "other_floor_type_RCC/RB/RBC")]
    pub other_floor_rcc_rb_rbc: u8,
    #[serde(rename = "other_floor_type_TImber/Bamboo-Mud")]
    pub other_floor_timber_bamboo_mud: u8,
    #[serde(rename = "other_floor_type_Timber-Planck")]
    pub other_floor_timber_planck: u8,
    #[serde(rename = "position_Attached-1 side")]
    pub position_attached_1_side: u8,
    #[serde(rename = "position_Attached-2 side")]
    pub position_attached_2_side: u8,
    #[serde(rename = "position_Attached-3 side")]
    pub position_attached_3_side: u8,
    #[serde(rename = "position_Not attached")]
    pub position_not_attached: u8,
}

fn flag(on: bool) -> u8 {
    u8::from(on)
}

impl FeatureRecord {
    /// Build the record for the current selections.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MissingSelection`] when the size or structure is absent.
    pub fn from_selections(
        size: Option<&BuildingSize>,
        structure: Option<&BuildingStructure>,
        location: Option<&Location>,
    ) -> Result<Self, SessionError> {
        let size = size.ok_or(SessionError::MissingSelection("building size"))?;
        let structure = structure.ok_or(SessionError::MissingSelection("building structure"))?;
        let has = |material| flag(structure.has_material(material));
        let plinth = size.plinth_area_sq_ft.midpoint();
        let height_plinth_ratio = if plinth > 0.0 {
            size.height_ft_pre_eq.midpoint() / plinth
        } else {
            0.0
        };

        Ok(Self {
            count_floors_pre_eq: size.count_floors_pre_eq,
            age_building: NEW_BUILDING_AGE,
            has_superstructure_adobe_mud: has(SuperstructureMaterial::AdobeMud),
            has_superstructure_mud_mortar_stone: has(SuperstructureMaterial::MudMortarStone),
            has_superstructure_stone_flag: has(SuperstructureMaterial::StoneFlag),
            has_superstructure_cement_mortar_stone: has(SuperstructureMaterial::CementMortarStone),
            has_superstructure_mud_mortar_brick: has(SuperstructureMaterial::MudMortarBrick),
            has_superstructure_cement_mortar_brick: has(SuperstructureMaterial::CementMortarBrick),
            has_superstructure_timber: has(SuperstructureMaterial::Timber),
            has_superstructure_bamboo: has(SuperstructureMaterial::Bamboo),
            has_superstructure_rc_non_engineered: has(SuperstructureMaterial::RcNonEngineered),
            has_superstructure_rc_engineered: has(SuperstructureMaterial::RcEngineered),
            has_superstructure_other: has(SuperstructureMaterial::Other),
            geotechnical_risk: location.map_or(0.0, |l| l.geotechnical_risk_factor),
            height_plinth_ratio,
            foundation_bamboo_timber: flag(structure.foundation_type == FoundationType::BambooTimber),
            foundation_cement_stone_brick: flag(
                structure.foundation_type == FoundationType::CementStoneBrick,
            ),
            foundation_mud_mortar_stone_brick: flag(
                structure.foundation_type == FoundationType::MudMortarStoneBrick,
            ),
            foundation_other: flag(structure.foundation_type == FoundationType::Other),
            foundation_rc: flag(structure.foundation_type == FoundationType::Rc),
            // Light and heavy bamboo roofs match neither column and encode as the reference category.
            roof_bamboo_timber: flag(structure.roof_type == RoofType::BambooTimber),
            roof_rcc_rb_rbc: flag(structure.roof_type == RoofType::RccRbRbc),
            ground_floor_brick_stone: flag(
                structure.ground_floor_type == GroundFloorType::BrickStone,
            ),
            ground_floor_mud: flag(structure.ground_floor_type == GroundFloorType::Mud),
            ground_floor_other: flag(structure.ground_floor_type == GroundFloorType::Other),
            ground_floor_rc: flag(structure.ground_floor_type == GroundFloorType::Rc),
            ground_floor_timber: flag(structure.ground_floor_type == GroundFloorType::Timber),
            other_floor_not_applicable: flag(
                structure.other_floor_type == OtherFloorType::NotApplicable,
            ),
            other_floor_rcc_rb_rbc: flag(structure.other_floor_type == OtherFloorType::RccRbRbc),
            other_floor_timber_bamboo_mud: flag(
                structure.other_floor_type == OtherFloorType::TimberBambooMud,
            ),
            other_floor_timber_planck: flag(
                structure.other_floor_type == OtherFloorType::TimberPlanck,
            ),
            position_attached_1_side: 0,
            position_attached_2_side: 0,
            position_attached_3_side: 0,
            position_not_attached: 0,
        })
    }

    /// Whether the record flags `material` in its superstructure columns.
    #[must_use]
    pub const fn has_material(&self, material: SuperstructureMaterial) -> bool {
        let value = match material {
            SuperstructureMaterial::AdobeMud => self.has_superstructure_adobe_mud,
            SuperstructureMaterial::MudMortarStone => self.has_superstructure_mud_mortar_stone,
            SuperstructureMaterial::StoneFlag => self.has_superstructure_stone_flag,
            SuperstructureMaterial::CementMortarStone => {
                self.has_superstructure_cement_mortar_stone
            }
            SuperstructureMaterial::MudMortarBrick => self.has_superstructure_mud_mortar_brick,
            SuperstructureMaterial::CementMortarBrick => {
                self.has_superstructure_cement_mortar_brick
            }
            SuperstructureMaterial::Timber => self.has_superstructure_timber,
            SuperstructureMaterial::Bamboo => self.has_superstructure_bamboo,
            SuperstructureMaterial::RcNonEngineered => self.has_superstructure_rc_non_engineered,
            SuperstructureMaterial::RcEngineered => self.has_superstructure_rc_engineered,
            SuperstructureMaterial::Other => self.has_superstructure_other,
        };
        value == 1
    }

    /// The foundation column set to 1, if any.
    #[must_use]
    pub const fn foundation(&self) -> Option<FoundationType> {
        if self.foundation_bamboo_timber == 1 {
            Some(FoundationType::BambooTimber)
        } else if self.foundation_cement_stone_brick == 1 {
            Some(FoundationType::CementStoneBrick)
        } else if self.foundation_mud_mortar_stone_brick == 1 {
            Some(FoundationType::MudMortarStoneBrick)
        } else if self.foundation_other == 1 {
            Some(FoundationType::Other)
        } else if self.foundation_rc == 1 {
            Some(FoundationType::Rc)
        } else {
            None
        }
    }
}
