//! Immutable reference data: characters, locations, building sizes and structures.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_CATALOG_DATA: &str = include_str!("../assets/data/catalog.json");

/// A selectable persona whose modifier scales the base budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub education: String,
    pub age: u32,
    pub budget_modifier: f64,
    #[serde(default)]
    pub backstory: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A selectable region with independent seismic and ground-stability risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub region: String,
    pub description: String,
    /// 0-1, higher means stronger expected shaking.
    pub earthquake_risk_factor: f64,
    /// 0-1, higher means less stable ground.
    pub geotechnical_risk_factor: f64,
    #[serde(default)]
    pub coordinates: Coordinates,
    #[serde(default)]
    pub historical_context: String,
}

/// Errors raised when a `"min to max"` range label cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeParseError {
    #[error("range '{0}' is not of the form 'min to max'")]
    Shape(String),
    #[error("range bound '{0}' is not a number")]
    Bound(String),
    #[error("range '{0}' has min greater than max")]
    Inverted(String),
}

/// A measured range in feet (or square feet) parsed from a `"min to max"` label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeetRange {
    pub min: f64,
    pub max: f64,
}

impl FeetRange {
    #[must_use]
    pub fn midpoint(self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

impl FromStr for FeetRange {
    type Err = RangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        let [min, sep, max] = tokens.as_slice() else {
            return Err(RangeParseError::Shape(s.to_string()));
        };
        if !sep.eq_ignore_ascii_case("to") {
            return Err(RangeParseError::Shape(s.to_string()));
        }
        let parse = |token: &str| {
            token
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| RangeParseError::Bound(token.to_string()))
        };
        let range = Self {
            min: parse(min)?,
            max: parse(max)?,
        };
        if range.min > range.max {
            return Err(RangeParseError::Inverted(s.to_string()));
        }
        Ok(range)
    }
}

impl TryFrom<String> for FeetRange {
    type Error = RangeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FeetRange> for String {
    fn from(range: FeetRange) -> Self {
        format!("{} to {}", range.min, range.max)
    }
}

/// Descriptive building size tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingSize {
    pub id: String,
    pub name: String,
    pub description: String,
    pub plinth_area_sq_ft: FeetRange,
    pub height_ft_pre_eq: FeetRange,
    pub count_floors_pre_eq: u32,
    pub base_cost: i64,
    #[serde(default)]
    pub capacity: String,
    #[serde(default)]
    pub insight: String,
}

/// Superstructure material; the predictor sees one `has_superstructure_*` column per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuperstructureMaterial {
    AdobeMud,
    MudMortarStone,
    StoneFlag,
    CementMortarStone,
    MudMortarBrick,
    CementMortarBrick,
    Timber,
    Bamboo,
    RcNonEngineered,
    RcEngineered,
    Other,
}

impl SuperstructureMaterial {
    pub const ALL: [Self; 11] = [
        Self::AdobeMud,
        Self::MudMortarStone,
        Self::StoneFlag,
        Self::CementMortarStone,
        Self::MudMortarBrick,
        Self::CementMortarBrick,
        Self::Timber,
        Self::Bamboo,
        Self::RcNonEngineered,
        Self::RcEngineered,
        Self::Other,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::AdobeMud => "adobe_mud",
            Self::MudMortarStone => "mud_mortar_stone",
            Self::StoneFlag => "stone_flag",
            Self::CementMortarStone => "cement_mortar_stone",
            Self::MudMortarBrick => "mud_mortar_brick",
            Self::CementMortarBrick => "cement_mortar_brick",
            Self::Timber => "timber",
            Self::Bamboo => "bamboo",
            Self::RcNonEngineered => "rc_non_engineered",
            Self::RcEngineered => "rc_engineered",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FoundationType {
    #[serde(rename = "Bamboo/Timber")]
    BambooTimber,
    #[serde(rename = "Cement-Stone/Brick")]
    CementStoneBrick,
    #[serde(rename = "Mud mortar-Stone/Brick")]
    MudMortarStoneBrick,
    Other,
    #[serde(rename = "RC")]
    Rc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoofType {
    #[serde(rename = "Bamboo/Timber")]
    BambooTimber,
    #[serde(rename = "Bamboo/Timber-Light roof")]
    BambooTimberLight,
    #[serde(rename = "Bamboo/Timber-Heavy roof")]
    BambooTimberHeavy,
    #[serde(rename = "RCC/RB/RBC")]
    RccRbRbc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroundFloorType {
    #[serde(rename = "Brick/Stone")]
    BrickStone,
    Mud,
    Other,
    #[serde(rename = "RC")]
    Rc,
    Timber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OtherFloorType {
    #[serde(rename = "Not applicable")]
    NotApplicable,
    #[serde(rename = "RCC/RB/RBC")]
    RccRbRbc,
    // Spelling matches the survey column the model was trained on.
    #[serde(rename = "TImber/Bamboo-Mud")]
    TimberBambooMud,
    #[serde(rename = "Timber-Planck")]
    TimberPlanck,
}

/// Construction type offered in the structure phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingStructure {
    pub id: String,
    pub name: String,
    pub description: String,
    pub superstructure: SmallVec<[SuperstructureMaterial; 2]>,
    pub foundation_type: FoundationType,
    pub roof_type: RoofType,
    pub ground_floor_type: GroundFloorType,
    pub other_floor_type: OtherFloorType,
    pub base_cost: i64,
    /// Historical protection indicator, 0-100, higher is better.
    pub protection_score: u8,
    #[serde(default)]
    pub damage_description: String,
}

impl BuildingStructure {
    #[must_use]
    pub fn has_material(&self, material: SuperstructureMaterial) -> bool {
        self.superstructure.contains(&material)
    }
}

/// Errors raised when the reference catalog is malformed.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog JSON is invalid: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate {table} id '{id}'")]
    DuplicateId { table: &'static str, id: String },
    #[error("{id}: {field} must be within 0..=1 (got {value})")]
    RiskOutOfRange {
        id: String,
        field: &'static str,
        value: f64,
    },
    #[error("{id}: budget modifier must be positive (got {value})")]
    InvalidModifier { id: String, value: f64 },
    #[error("{id}: cost must not be negative (got {cost})")]
    NegativeCost { id: String, cost: i64 },
    #[error("{id}: structure lists no superstructure material")]
    EmptySuperstructure { id: String },
    #[error("{id}: protection score must be within 0..=100 (got {value})")]
    ProtectionOutOfRange { id: String, value: u8 },
}

/// All reference tables, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Catalog {
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub building_sizes: Vec<BuildingSize>,
    #[serde(default)]
    pub building_structures: Vec<BuildingStructure>,
}

impl Catalog {
    /// Parse and validate a catalog from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or violates a catalog invariant.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load the catalog embedded in the crate, falling back to an empty one.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_CATALOG_DATA).unwrap_or_else(|err| {
            log::error!("embedded catalog rejected: {err}");
            Self::default()
        })
    }

    /// Process-wide read-only catalog, loaded once.
    #[must_use]
    pub fn default_catalog() -> &'static Self {
        static CATALOG: OnceLock<Catalog> = OnceLock::new();
        CATALOG.get_or_init(Self::load_from_static)
    }

    #[must_use]
    pub fn character(&self, id: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    #[must_use]
    pub fn building_size(&self, id: &str) -> Option<&BuildingSize> {
        self.building_sizes.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn building_structure(&self, id: &str) -> Option<&BuildingStructure> {
        self.building_structures.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
            && self.locations.is_empty()
            && self.building_sizes.is_empty()
            && self.building_structures.is_empty()
    }

    fn validate(&self) -> Result<(), CatalogError> {
        ensure_unique("character", self.characters.iter().map(|c| c.id.as_str()))?;
        ensure_unique("location", self.locations.iter().map(|l| l.id.as_str()))?;
        ensure_unique("size", self.building_sizes.iter().map(|s| s.id.as_str()))?;
        ensure_unique(
            "structure",
            self.building_structures.iter().map(|s| s.id.as_str()),
        )?;

        for character in &self.characters {
            if !(character.budget_modifier.is_finite() && character.budget_modifier > 0.0) {
                return Err(CatalogError::InvalidModifier {
                    id: character.id.clone(),
                    value: character.budget_modifier,
                });
            }
        }
        for location in &self.locations {
            ensure_unit(
                &location.id,
                "earthquake_risk_factor",
                location.earthquake_risk_factor,
            )?;
            ensure_unit(
                &location.id,
                "geotechnical_risk_factor",
                location.geotechnical_risk_factor,
            )?;
        }
        for size in &self.building_sizes {
            ensure_cost(&size.id, size.base_cost)?;
        }
        for structure in &self.building_structures {
            ensure_cost(&structure.id, structure.base_cost)?;
            if structure.superstructure.is_empty() {
                return Err(CatalogError::EmptySuperstructure {
                    id: structure.id.clone(),
                });
            }
            if structure.protection_score > 100 {
                return Err(CatalogError::ProtectionOutOfRange {
                    id: structure.id.clone(),
                    value: structure.protection_score,
                });
            }
        }
        Ok(())
    }
}

fn ensure_unique<'a>(
    table: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CatalogError::DuplicateId {
                table,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

fn ensure_unit(id: &str, field: &'static str, value: f64) -> Result<(), CatalogError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CatalogError::RiskOutOfRange {
            id: id.to_string(),
            field,
            value,
        })
    }
}

fn ensure_cost(id: &str, cost: i64) -> Result<(), CatalogError> {
    if cost < 0 {
        return Err(CatalogError::NegativeCost {
            id: id.to_string(),
            cost,
        });
    }
    Ok(())
}
