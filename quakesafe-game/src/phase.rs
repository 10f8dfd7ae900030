//! Ordered game phases.
use serde::{Deserialize, Serialize};

/// One ordered stage of the linear game flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Phase {
    #[default]
    Introduction,
    CharacterSelection,
    LocationSelection,
    BuildingSize,
    BuildingStructure,
    Simulation,
    Results,
    Reflection,
}

impl Phase {
    /// Every phase in play order.
    pub const ALL: [Self; 8] = [
        Self::Introduction,
        Self::CharacterSelection,
        Self::LocationSelection,
        Self::BuildingSize,
        Self::BuildingStructure,
        Self::Simulation,
        Self::Results,
        Self::Reflection,
    ];

    /// Position of the phase in [`Phase::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Introduction => 0,
            Self::CharacterSelection => 1,
            Self::LocationSelection => 2,
            Self::BuildingSize => 3,
            Self::BuildingStructure => 4,
            Self::Simulation => 5,
            Self::Results => 6,
            Self::Reflection => 7,
        }
    }

    /// The adjacent next phase, `None` from the last one.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// The adjacent previous phase, `None` from the first one.
    #[must_use]
    pub fn previous(self) -> Option<Self> {
        self.index()
            .checked_sub(1)
            .and_then(|idx| Self::ALL.get(idx).copied())
    }

    /// Phases that cannot be left backwards once reached.
    #[must_use]
    pub const fn is_forward_only(self) -> bool {
        matches!(self, Self::Results | Self::Reflection)
    }

    /// Whether the player makes a catalog selection in this phase.
    #[must_use]
    pub const fn is_selection(self) -> bool {
        matches!(
            self,
            Self::CharacterSelection
                | Self::LocationSelection
                | Self::BuildingSize
                | Self::BuildingStructure
        )
    }

    /// Share of the flow completed when this phase is shown, 0-100.
    #[must_use]
    pub fn progress_pct(self) -> u8 {
        let last = Self::ALL.len() - 1;
        let pct = self.index() * 100 / last;
        u8::try_from(pct).unwrap_or(100)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Introduction => "Introduction",
            Self::CharacterSelection => "Character Selection",
            Self::LocationSelection => "Location Selection",
            Self::BuildingSize => "Building Size",
            Self::BuildingStructure => "Building Structure",
            Self::Simulation => "Simulation",
            Self::Results => "Results",
            Self::Reflection => "Reflection",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
