//! QuakeSafe Game Engine
//!
//! Platform-agnostic core logic for the QuakeSafe earthquake preparedness game.
//! This crate holds the session state machine, reference catalog, cost rules,
//! predictor feature mapping and lesson generation without UI or network code.

pub mod catalog;
pub mod constants;
pub mod costs;
pub mod features;
pub mod insights;
pub mod lessons;
pub mod numbers;
pub mod phase;
pub mod result;
pub mod selectors;
pub mod session;
pub mod simulation;
pub mod state;
pub mod stream;

// Re-export commonly used types
pub use catalog::{
    BuildingSize, BuildingStructure, Catalog, CatalogError, Character, Coordinates, FeetRange,
    FoundationType, GroundFloorType, Location, OtherFloorType, RangeParseError, RoofType,
    SuperstructureMaterial,
};
pub use constants::{BASE_BUDGET, REFERENCE_EVENT_MAGNITUDE, SCENARIO_MAGNITUDE};
pub use costs::{can_afford, character_budget, format_cost};
pub use features::FeatureRecord;
pub use insights::{FactorInsight, ImpactBucket, RiskInsights, RiskLevel};
pub use lessons::generate_lessons;
pub use phase::Phase;
pub use result::{ResultSummary, SurvivalBand, result_summary};
pub use selectors::{
    BudgetView, OptionView, budget_view, character_options, location_options, size_options,
    structure_options,
};
pub use session::GameSession;
pub use simulation::{
    FoldOutcome, PredictionResult, Predictor, SimulationProgress, SimulationRequest,
    SimulationStatus, SimulationTicket, TransportError, run_simulation,
};
pub use state::{AdvanceOutcome, SessionError, SessionState};
pub use stream::{FrameDecoder, StreamEvent};
