//! Centralized balance and tuning constants for QuakeSafe game logic.
//!
//! These values define the deterministic math for the session core.
//! Keeping them together ensures that gameplay can only be adjusted via
//! code changes reviewed in version control, rather than through external
//! JSON assets.

// Budget -------------------------------------------------------------------
/// Budget every character's modifier is applied to.
pub const BASE_BUDGET: i64 = 200_000;

// Simulation ---------------------------------------------------------------
/// Magnitude of the scenario earthquake every session is simulated against.
pub const SCENARIO_MAGNITUDE: f64 = 9.5;
/// Magnitude of the 2015 Gorkha earthquake used as the historical reference.
pub const REFERENCE_EVENT_MAGNITUDE: f64 = 7.8;
pub(crate) const SURVIVAL_MIN: f64 = 0.0;
pub(crate) const SURVIVAL_MAX: f64 = 100.0;
pub(crate) const SURVIVAL_STRONG_ABOVE: f64 = 70.0;
pub(crate) const SURVIVAL_FAIR_ABOVE: f64 = 40.0;
/// Age reported to the predictor for every newly built house.
pub(crate) const NEW_BUILDING_AGE: u32 = 0;

// Lesson thresholds --------------------------------------------------------
pub(crate) const LESSON_PROTECTION_THRESHOLD: u8 = 50;
pub(crate) const LESSON_INTENSITY_THRESHOLD: f64 = 7.5;
pub(crate) const LESSON_UNDERSPEND_RATIO: f64 = 0.3;
pub(crate) const LESSON_HIGH_RISK_FACTOR: f64 = 0.7;
pub(crate) const LESSON_LOW_RISK_FACTOR: f64 = 0.4;

// Feature importance buckets -----------------------------------------------
pub(crate) const IMPORTANCE_HIGH_RISK: f64 = 10.0;
pub(crate) const IMPORTANCE_MODERATE_RISK: f64 = 5.0;
pub(crate) const IMPORTANCE_HIGHLY_PROTECTIVE: f64 = -5.0;
pub(crate) const PRIMARY_FACTOR_LIMIT: usize = 2;

// Logging keys -------------------------------------------------------------
pub(crate) const LOG_PHASE_ADVANCED: &str = "log.phase.advanced";
pub(crate) const LOG_PHASE_RETREATED: &str = "log.phase.retreated";
pub(crate) const LOG_PHASE_BLOCKED: &str = "log.phase.blocked";
pub(crate) const LOG_SELECTION_APPLIED: &str = "log.selection.applied";
pub(crate) const LOG_SIMULATION_REQUESTED: &str = "log.simulation.requested";
pub(crate) const LOG_SIMULATION_COMPLETED: &str = "log.simulation.completed";
pub(crate) const LOG_SIMULATION_FAILED: &str = "log.simulation.failed";
pub(crate) const LOG_SIMULATION_STALE: &str = "log.simulation.stale";
pub(crate) const LOG_SESSION_RESET: &str = "log.session.reset";
