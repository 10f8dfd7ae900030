//! Session state machine: phase transitions, selections and simulation folding.
use serde::Serialize;
use thiserror::Error;

use crate::catalog::{BuildingSize, BuildingStructure, Character, Location};
use crate::constants::{
    BASE_BUDGET, LOG_PHASE_ADVANCED, LOG_PHASE_BLOCKED, LOG_PHASE_RETREATED,
    LOG_SELECTION_APPLIED, LOG_SESSION_RESET, LOG_SIMULATION_COMPLETED, LOG_SIMULATION_FAILED,
    LOG_SIMULATION_REQUESTED, LOG_SIMULATION_STALE, SCENARIO_MAGNITUDE,
};
use crate::costs::{can_afford, character_budget, size_cost, structure_cost};
use crate::features::FeatureRecord;
use crate::insights::RiskInsights;
use crate::lessons::generate_lessons;
use crate::phase::Phase;
use crate::simulation::{
    FoldOutcome, PredictionResult, SimulationRequest, SimulationStatus, SimulationTicket,
    TransportError,
};

/// Precondition faults raised by session operators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("{0} has not been selected")]
    MissingSelection(&'static str),
    #[error("{action} is only allowed during {expected} (currently {actual})")]
    WrongPhase {
        action: &'static str,
        expected: Phase,
        actual: Phase,
    },
    #[error("'{id}' costs {cost} but only {available} is available")]
    Unaffordable {
        id: String,
        cost: i64,
        available: i64,
    },
    #[error("a character must be chosen before spending the budget")]
    NoCharacter,
    #[error("the simulation has not completed")]
    SimulationIncomplete,
    #[error("unknown {kind} '{id}'")]
    UnknownId { kind: &'static str, id: String },
}

impl SessionError {
    pub(crate) fn unknown(kind: &'static str, id: &str) -> Self {
        Self::UnknownId {
            kind,
            id: id.to_string(),
        }
    }
}

/// Result of a call to [`SessionState::advance`].
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    Moved { from: Phase, to: Phase },
    /// Entered the simulation phase; the request must be handed to a predictor.
    SimulationRequested(SimulationRequest),
    /// The current phase's exit condition is not met, or this is the last phase.
    Blocked(Phase),
}

/// All mutable state of one play-through.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    phase: Phase,
    base_budget: i64,
    total_budget: i64,
    available_funds: i64,
    character: Option<Character>,
    location: Option<Location>,
    building_size: Option<BuildingSize>,
    building_structure: Option<BuildingStructure>,
    earthquake_intensity: Option<f64>,
    survival_probability: Option<f64>,
    prediction: Option<PredictionResult>,
    lessons: Vec<String>,
    insights: Option<RiskInsights>,
    simulation_complete: bool,
    simulation: SimulationStatus,
    epoch: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_budget(BASE_BUDGET)
    }

    #[must_use]
    pub fn with_base_budget(base_budget: i64) -> Self {
        Self {
            phase: Phase::Introduction,
            base_budget,
            total_budget: base_budget,
            available_funds: base_budget,
            character: None,
            location: None,
            building_size: None,
            building_structure: None,
            earthquake_intensity: None,
            survival_probability: None,
            prediction: None,
            lessons: Vec::new(),
            insights: None,
            simulation_complete: false,
            simulation: SimulationStatus::Idle,
            epoch: 0,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn base_budget(&self) -> i64 {
        self.base_budget
    }

    #[must_use]
    pub const fn total_budget(&self) -> i64 {
        self.total_budget
    }

    #[must_use]
    pub const fn available_funds(&self) -> i64 {
        self.available_funds
    }

    /// Money committed to the current size and structure.
    #[must_use]
    pub fn amount_spent(&self) -> i64 {
        self.total_budget - self.available_funds
    }

    #[must_use]
    pub const fn character(&self) -> Option<&Character> {
        self.character.as_ref()
    }

    #[must_use]
    pub const fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    #[must_use]
    pub const fn building_size(&self) -> Option<&BuildingSize> {
        self.building_size.as_ref()
    }

    #[must_use]
    pub const fn building_structure(&self) -> Option<&BuildingStructure> {
        self.building_structure.as_ref()
    }

    #[must_use]
    pub const fn earthquake_intensity(&self) -> Option<f64> {
        self.earthquake_intensity
    }

    #[must_use]
    pub const fn survival_probability(&self) -> Option<f64> {
        self.survival_probability
    }

    #[must_use]
    pub const fn prediction(&self) -> Option<&PredictionResult> {
        self.prediction.as_ref()
    }

    #[must_use]
    pub fn lessons(&self) -> &[String] {
        &self.lessons
    }

    #[must_use]
    pub const fn insights(&self) -> Option<&RiskInsights> {
        self.insights.as_ref()
    }

    #[must_use]
    pub const fn is_simulation_complete(&self) -> bool {
        self.simulation_complete
    }

    #[must_use]
    pub const fn simulation_status(&self) -> &SimulationStatus {
        &self.simulation
    }

    /// Ticket a prediction issued now would carry.
    #[must_use]
    pub const fn ticket(&self) -> SimulationTicket {
        SimulationTicket { epoch: self.epoch }
    }

    // Phase transitions ----------------------------------------------------

    /// Whether the current phase's exit condition holds.
    #[must_use]
    pub const fn can_advance(&self) -> bool {
        match self.phase {
            Phase::CharacterSelection => self.character.is_some(),
            Phase::LocationSelection => self.location.is_some(),
            Phase::BuildingSize => self.building_size.is_some(),
            Phase::BuildingStructure => self.building_structure.is_some(),
            Phase::Simulation => self.simulation_complete,
            Phase::Introduction | Phase::Results => true,
            Phase::Reflection => false,
        }
    }

    /// Move to the next phase when allowed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MissingSelection`] if the feature record for the simulation
    /// request cannot be built.
    pub fn advance(&mut self) -> Result<AdvanceOutcome, SessionError> {
        let from = self.phase;
        let Some(to) = from.next().filter(|_| self.can_advance()) else {
            log::debug!("{LOG_PHASE_BLOCKED}: {from}");
            return Ok(AdvanceOutcome::Blocked(from));
        };
        if to == Phase::Simulation {
            let features = self.feature_record()?;
            self.phase = to;
            log::debug!("{LOG_PHASE_ADVANCED}: {from} -> {to}");
            return Ok(AdvanceOutcome::SimulationRequested(
                self.issue_request(features),
            ));
        }
        self.phase = to;
        log::debug!("{LOG_PHASE_ADVANCED}: {from} -> {to}");
        Ok(AdvanceOutcome::Moved { from, to })
    }

    /// Move to the previous phase; returns `false` when retreat is not allowed.
    pub fn retreat(&mut self) -> bool {
        let from = self.phase;
        if from.is_forward_only() {
            log::debug!("{LOG_PHASE_BLOCKED}: {from}");
            return false;
        }
        let Some(to) = from.previous() else {
            log::debug!("{LOG_PHASE_BLOCKED}: {from}");
            return false;
        };
        if from == Phase::Simulation {
            self.cancel_simulation();
        }
        self.phase = to;
        log::debug!("{LOG_PHASE_RETREATED}: {from} -> {to}");
        true
    }

    /// Return to a fresh session, keeping the base budget. In-flight predictions become stale.
    pub fn reset(&mut self) {
        let epoch = self.epoch + 1;
        *self = Self::with_base_budget(self.base_budget);
        self.epoch = epoch;
        log::debug!("{LOG_SESSION_RESET}: epoch {epoch}");
    }

    // Selections -----------------------------------------------------------

    /// Choose the character, fixing the total budget.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WrongPhase`] outside character selection and
    /// [`SessionError::Unaffordable`] if the new budget cannot cover selections already made.
    pub fn select_character(&mut self, character: &Character) -> Result<(), SessionError> {
        self.ensure_phase("select_character", Phase::CharacterSelection)?;
        let total = character_budget(self.base_budget, character);
        let committed = self.committed_costs();
        if committed > total {
            return Err(SessionError::Unaffordable {
                id: character.id.clone(),
                cost: committed,
                available: total,
            });
        }
        self.total_budget = total;
        self.available_funds = total - committed;
        self.character = Some(character.clone());
        log::debug!(
            "{LOG_SELECTION_APPLIED}: character={} budget={total}",
            character.id
        );
        Ok(())
    }

    /// Choose the location.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WrongPhase`] outside location selection.
    pub fn select_location(&mut self, location: &Location) -> Result<(), SessionError> {
        self.ensure_phase("select_location", Phase::LocationSelection)?;
        self.location = Some(location.clone());
        log::debug!("{LOG_SELECTION_APPLIED}: location={}", location.id);
        Ok(())
    }

    /// Choose the building size, charging the difference to the previous choice.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WrongPhase`], [`SessionError::NoCharacter`] or
    /// [`SessionError::Unaffordable`].
    pub fn select_building_size(&mut self, size: &BuildingSize) -> Result<(), SessionError> {
        self.ensure_phase("select_building_size", Phase::BuildingSize)?;
        self.ensure_character()?;
        let previous = self.building_size.as_ref().map_or(0, size_cost);
        self.charge(&size.id, size_cost(size), previous)?;
        self.building_size = Some(size.clone());
        log::debug!(
            "{LOG_SELECTION_APPLIED}: size={} funds={}",
            size.id,
            self.available_funds
        );
        Ok(())
    }

    /// Choose the building structure, charging the difference to the previous choice.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WrongPhase`], [`SessionError::NoCharacter`] or
    /// [`SessionError::Unaffordable`].
    pub fn select_building_structure(
        &mut self,
        structure: &BuildingStructure,
    ) -> Result<(), SessionError> {
        self.ensure_phase("select_building_structure", Phase::BuildingStructure)?;
        self.ensure_character()?;
        let previous = self.building_structure.as_ref().map_or(0, structure_cost);
        self.charge(&structure.id, structure_cost(structure), previous)?;
        self.building_structure = Some(structure.clone());
        log::debug!(
            "{LOG_SELECTION_APPLIED}: structure={} funds={}",
            structure.id,
            self.available_funds
        );
        Ok(())
    }

    #[must_use]
    pub fn can_afford_size(&self, size: &BuildingSize) -> bool {
        let replaced = self.building_size.as_ref().map_or(0, size_cost);
        can_afford(self.available_funds, size_cost(size), replaced)
    }

    #[must_use]
    pub fn can_afford_structure(&self, structure: &BuildingStructure) -> bool {
        let replaced = self.building_structure.as_ref().map_or(0, structure_cost);
        can_afford(self.available_funds, structure_cost(structure), replaced)
    }

    // Simulation -----------------------------------------------------------

    /// Feature record for the current selections.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MissingSelection`] when the size or structure is absent.
    pub fn feature_record(&self) -> Result<FeatureRecord, SessionError> {
        FeatureRecord::from_selections(
            self.building_size.as_ref(),
            self.building_structure.as_ref(),
            self.location.as_ref(),
        )
    }

    /// Fold a successful prediction into the session.
    pub fn complete_simulation(
        &mut self,
        ticket: SimulationTicket,
        result: PredictionResult,
    ) -> FoldOutcome {
        if !self.accepts(ticket) {
            log::warn!("{LOG_SIMULATION_STALE}: epoch {} != {}", ticket.epoch, self.epoch);
            return FoldOutcome::Stale;
        }
        let survival_probability = result.survival_probability();
        let intensity = SCENARIO_MAGNITUDE;
        self.survival_probability = Some(survival_probability);
        self.earthquake_intensity = Some(intensity);
        self.lessons = generate_lessons(self, intensity);
        self.insights = result
            .feature_importance
            .as_ref()
            .map(RiskInsights::from_importance);
        self.prediction = Some(result);
        self.simulation_complete = true;
        self.simulation = SimulationStatus::Idle;
        log::info!(
            "{LOG_SIMULATION_COMPLETED}: survival={survival_probability} lessons={}",
            self.lessons.len()
        );
        FoldOutcome::Completed {
            survival_probability,
        }
    }

    /// Record a transport fault; the phase and selections are kept.
    pub fn fail_simulation(
        &mut self,
        ticket: SimulationTicket,
        error: &TransportError,
    ) -> FoldOutcome {
        if !self.accepts(ticket) {
            log::warn!("{LOG_SIMULATION_STALE}: epoch {} != {}", ticket.epoch, self.epoch);
            return FoldOutcome::Stale;
        }
        log::warn!("{LOG_SIMULATION_FAILED}: {error}");
        self.simulation = SimulationStatus::Failed(error.to_string());
        FoldOutcome::Failed
    }

    /// Issue a fresh request for the simulation phase, invalidating any earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WrongPhase`] outside the simulation phase and
    /// [`SessionError::MissingSelection`] if the feature record cannot be built.
    pub fn retry_simulation(&mut self) -> Result<SimulationRequest, SessionError> {
        self.ensure_phase("retry_simulation", Phase::Simulation)?;
        let features = self.feature_record()?;
        self.epoch += 1;
        Ok(self.issue_request(features))
    }

    fn issue_request(&mut self, features: FeatureRecord) -> SimulationRequest {
        self.clear_results();
        self.simulation = SimulationStatus::Pending;
        let ticket = self.ticket();
        log::info!("{LOG_SIMULATION_REQUESTED}: epoch {}", ticket.epoch);
        SimulationRequest { features, ticket }
    }

    fn cancel_simulation(&mut self) {
        self.epoch += 1;
        self.simulation = SimulationStatus::Idle;
        self.clear_results();
    }

    fn clear_results(&mut self) {
        self.simulation_complete = false;
        self.survival_probability = None;
        self.earthquake_intensity = None;
        self.prediction = None;
        self.insights = None;
        self.lessons.clear();
    }

    /// Whether a result carrying `ticket` may still be folded in.
    pub(crate) fn accepts(&self, ticket: SimulationTicket) -> bool {
        ticket.epoch == self.epoch
            && self.phase == Phase::Simulation
            && self.simulation == SimulationStatus::Pending
    }

    // Helpers --------------------------------------------------------------

    fn committed_costs(&self) -> i64 {
        self.building_size.as_ref().map_or(0, size_cost)
            + self.building_structure.as_ref().map_or(0, structure_cost)
    }

    fn charge(&mut self, id: &str, cost: i64, replaced: i64) -> Result<(), SessionError> {
        if !can_afford(self.available_funds, cost, replaced) {
            return Err(SessionError::Unaffordable {
                id: id.to_string(),
                cost,
                available: self.available_funds + replaced,
            });
        }
        self.available_funds -= cost - replaced;
        Ok(())
    }

    fn ensure_phase(&self, action: &'static str, expected: Phase) -> Result<(), SessionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SessionError::WrongPhase {
                action,
                expected,
                actual: self.phase,
            })
        }
    }

    const fn ensure_character(&self) -> Result<(), SessionError> {
        if self.character.is_some() {
            Ok(())
        } else {
            Err(SessionError::NoCharacter)
        }
    }
}
