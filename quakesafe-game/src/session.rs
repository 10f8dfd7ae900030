use crate::catalog::Catalog;
use crate::phase::Phase;
use crate::result::{ResultSummary, result_summary};
use crate::simulation::{FoldOutcome, Predictor, SimulationProgress, SimulationRequest, run_simulation};
use crate::state::{AdvanceOutcome, SessionError, SessionState};

/// High-level session wrapper binding a catalog to a mutable session state, so drivers can
/// select entries by id.
#[derive(Debug, Clone)]
pub struct GameSession<'c> {
    catalog: &'c Catalog,
    state: SessionState,
}

impl<'c> GameSession<'c> {
    /// Fresh session over `catalog` with the default base budget.
    #[must_use]
    pub fn new(catalog: &'c Catalog) -> Self {
        Self::from_state(catalog, SessionState::new())
    }

    #[must_use]
    pub const fn from_state(catalog: &'c Catalog, state: SessionState) -> Self {
        Self { catalog, state }
    }

    #[must_use]
    pub const fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    /// Borrow the underlying session state.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Borrow the underlying mutable session state.
    pub const fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    /// Apply a closure to the mutable session state.
    pub fn with_state_mut<R>(&mut self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        f(&mut self.state)
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// # Errors
    ///
    /// See [`SessionState::advance`].
    pub fn advance(&mut self) -> Result<AdvanceOutcome, SessionError> {
        self.state.advance()
    }

    pub fn retreat(&mut self) -> bool {
        self.state.retreat()
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// # Errors
    ///
    /// Returns [`SessionError::UnknownId`] for an id missing from the catalog, otherwise
    /// see [`SessionState::select_character`].
    pub fn choose_character(&mut self, id: &str) -> Result<(), SessionError> {
        let character = self
            .catalog
            .character(id)
            .ok_or_else(|| SessionError::unknown("character", id))?;
        self.state.select_character(character)
    }

    /// # Errors
    ///
    /// Returns [`SessionError::UnknownId`] or the error of [`SessionState::select_location`].
    pub fn choose_location(&mut self, id: &str) -> Result<(), SessionError> {
        let location = self
            .catalog
            .location(id)
            .ok_or_else(|| SessionError::unknown("location", id))?;
        self.state.select_location(location)
    }

    /// # Errors
    ///
    /// Returns [`SessionError::UnknownId`] or the error of
    /// [`SessionState::select_building_size`].
    pub fn choose_size(&mut self, id: &str) -> Result<(), SessionError> {
        let size = self
            .catalog
            .building_size(id)
            .ok_or_else(|| SessionError::unknown("building size", id))?;
        self.state.select_building_size(size)
    }

    /// # Errors
    ///
    /// Returns [`SessionError::UnknownId`] or the error of
    /// [`SessionState::select_building_structure`].
    pub fn choose_structure(&mut self, id: &str) -> Result<(), SessionError> {
        let structure = self
            .catalog
            .building_structure(id)
            .ok_or_else(|| SessionError::unknown("building structure", id))?;
        self.state.select_building_structure(structure)
    }

    /// Hand `request` to `predictor` and fold the answer in.
    pub async fn simulate<P: Predictor>(
        &mut self,
        request: SimulationRequest,
        predictor: &P,
        progress: &mut dyn FnMut(&SimulationProgress),
    ) -> FoldOutcome {
        run_simulation(&mut self.state, request, predictor, progress).await
    }

    /// # Errors
    ///
    /// See [`result_summary`].
    pub fn summary(&self) -> Result<ResultSummary, SessionError> {
        result_summary(&self.state)
    }

    /// Consume the session, returning the underlying state.
    #[must_use]
    pub fn into_state(self) -> SessionState {
        self.state
    }
}
