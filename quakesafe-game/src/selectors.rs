//! Read-only views derived from the session for option listings and headers.
use serde::Serialize;

use crate::catalog::{BuildingSize, BuildingStructure, Catalog, Character, Location};
use crate::costs::{character_budget, format_cost, size_cost, structure_cost};
use crate::numbers::{i64_to_f64, round_clamped};
use crate::state::SessionState;

/// One selectable catalog entry as it should be presented right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionView<'a, T> {
    pub item: &'a T,
    pub cost: i64,
    pub cost_label: String,
    pub affordable: bool,
    pub selected: bool,
}

impl<'a, T> OptionView<'a, T> {
    fn new(item: &'a T, cost: i64, affordable: bool, selected: bool) -> Self {
        Self {
            item,
            cost,
            cost_label: format_cost(cost),
            affordable,
            selected,
        }
    }
}

/// Characters, with the budget each one would bring as the cost column.
#[must_use]
pub fn character_options<'a>(
    catalog: &'a Catalog,
    state: &SessionState,
) -> Vec<OptionView<'a, Character>> {
    let current = state.character().map(|c| c.id.as_str());
    catalog
        .characters
        .iter()
        .map(|c| {
            OptionView::new(
                c,
                character_budget(state.base_budget(), c),
                true,
                current == Some(c.id.as_str()),
            )
        })
        .collect()
}

#[must_use]
pub fn location_options<'a>(
    catalog: &'a Catalog,
    state: &SessionState,
) -> Vec<OptionView<'a, Location>> {
    let current = state.location().map(|l| l.id.as_str());
    catalog
        .locations
        .iter()
        .map(|l| OptionView::new(l, 0, true, current == Some(l.id.as_str())))
        .collect()
}

#[must_use]
pub fn size_options<'a>(
    catalog: &'a Catalog,
    state: &SessionState,
) -> Vec<OptionView<'a, BuildingSize>> {
    let current = state.building_size().map(|s| s.id.as_str());
    catalog
        .building_sizes
        .iter()
        .map(|s| {
            OptionView::new(
                s,
                size_cost(s),
                state.can_afford_size(s),
                current == Some(s.id.as_str()),
            )
        })
        .collect()
}

#[must_use]
pub fn structure_options<'a>(
    catalog: &'a Catalog,
    state: &SessionState,
) -> Vec<OptionView<'a, BuildingStructure>> {
    let current = state.building_structure().map(|s| s.id.as_str());
    catalog
        .building_structures
        .iter()
        .map(|s| {
            OptionView::new(
                s,
                structure_cost(s),
                state.can_afford_structure(s),
                current == Some(s.id.as_str()),
            )
        })
        .collect()
}

/// Budget header figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetView {
    pub total_budget: i64,
    pub available_funds: i64,
    pub amount_spent: i64,
    /// Share of the budget committed, 0-100.
    pub spent_pct: f64,
}

#[must_use]
pub fn budget_view(state: &SessionState) -> BudgetView {
    let spent = state.amount_spent();
    let spent_pct = if state.total_budget() > 0 {
        round_clamped(
            i64_to_f64(spent) * 100.0 / i64_to_f64(state.total_budget()),
            0.0,
            100.0,
        )
    } else {
        0.0
    };
    BudgetView {
        total_budget: state.total_budget(),
        available_funds: state.available_funds(),
        amount_spent: spent,
        spent_pct,
    }
}
