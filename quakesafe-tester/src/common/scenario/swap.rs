use anyhow::{Context, Result, ensure};
use quakesafe_game::{GameSession, Phase, size_options, structure_options};

use super::{
    Scenario, ScenarioCtx, ScenarioRun, check_budget, expect_moved, finish, request_simulation,
};

/// Cycle through every affordable option and come back, checking the funds each time.
pub struct SwapScenario;

#[async_trait::async_trait(?Send)]
impl Scenario for SwapScenario {
    fn name(&self) -> &'static str {
        "Credit-back Swaps"
    }

    async fn run(&self, ctx: &ScenarioCtx<'_>) -> Result<ScenarioRun> {
        let catalog = ctx.catalog;
        let mut session = GameSession::new(catalog);
        expect_moved(&mut session)?;

        let wealthy = catalog
            .characters
            .iter()
            .max_by(|a, b| a.budget_modifier.total_cmp(&b.budget_modifier))
            .context("catalog has no characters")?;
        session.choose_character(&wealthy.id)?;
        let total = session.state().total_budget();
        expect_moved(&mut session)?;
        let calmest = catalog
            .locations
            .iter()
            .min_by(|a, b| a.earthquake_risk_factor.total_cmp(&b.earthquake_risk_factor))
            .context("catalog has no locations")?;
        session.choose_location(&calmest.id)?;

        expect_moved(&mut session)?;
        let sizes = size_options(catalog, session.state());
        let first_size = sizes.first().context("catalog has no building sizes")?;
        for option in sizes.iter().chain(std::iter::once(first_size)) {
            session.choose_size(&option.item.id)?;
            ensure!(
                session.state().available_funds() == total - option.cost,
                "after picking {} expected {} available, found {}",
                option.item.id,
                total - option.cost,
                session.state().available_funds()
            );
            // Picking the same entry again is a no-op.
            session.choose_size(&option.item.id)?;
            ensure!(
                session.state().available_funds() == total - option.cost,
                "re-selecting {} charged twice",
                option.item.id
            );
        }
        let size_cost = first_size.cost;

        expect_moved(&mut session)?;
        let structures = structure_options(catalog, session.state());
        let affordable: Vec<_> = structures.iter().filter(|o| o.affordable).collect();
        let first_structure = *affordable.first().context("no affordable structure")?;
        for option in affordable.iter().chain(std::iter::once(&first_structure)) {
            session.choose_structure(&option.item.id)?;
            ensure!(
                session.state().available_funds() == total - size_cost - option.cost,
                "after picking {} the funds are {}",
                option.item.id,
                session.state().available_funds()
            );
        }
        let reselected = structure_options(catalog, session.state());
        ensure!(
            reselected
                .iter()
                .filter(|o| o.selected)
                .map(|o| o.item.id.as_str())
                .eq([first_structure.item.id.as_str()]),
            "exactly {} should be marked selected",
            first_structure.item.id
        );

        // Going back keeps the selections made so far.
        ensure!(session.retreat(), "building structure allows going back");
        ensure!(session.phase() == Phase::BuildingSize, "retreat landed on {}", session.phase());
        ensure!(
            session.state().building_structure().is_some(),
            "retreat dropped the structure"
        );
        expect_moved(&mut session)?;
        check_budget(session.state())?;
        if ctx.verbose {
            println!(
                "  🔁 Swapped through {} sizes and {} structures",
                sizes.len(),
                affordable.len()
            );
        }

        let request = request_simulation(&mut session)?;
        finish(&mut session, request, ctx).await
    }
}
