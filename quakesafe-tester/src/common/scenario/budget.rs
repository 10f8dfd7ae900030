use anyhow::{Context, Result, bail, ensure};
use quakesafe_game::{
    GameSession, SessionError, character_budget, size_options, structure_options,
};

use super::{
    Scenario, ScenarioCtx, ScenarioRun, check_budget, expect_moved, finish, request_simulation,
};

/// Tightest budget and the biggest house, so some structures are out of reach.
pub struct BudgetScenario;

#[async_trait::async_trait(?Send)]
impl Scenario for BudgetScenario {
    fn name(&self) -> &'static str {
        "Budget Walk"
    }

    async fn run(&self, ctx: &ScenarioCtx<'_>) -> Result<ScenarioRun> {
        let catalog = ctx.catalog;
        let mut session = GameSession::new(catalog);
        expect_moved(&mut session)?;

        let frugal = catalog
            .characters
            .iter()
            .min_by(|a, b| a.budget_modifier.total_cmp(&b.budget_modifier))
            .context("catalog has no characters")?;
        session.choose_character(&frugal.id)?;
        let total = session.state().total_budget();
        ensure!(
            total == character_budget(session.state().base_budget(), frugal),
            "{} should bring {} not {total}",
            frugal.id,
            character_budget(session.state().base_budget(), frugal)
        );
        ensure!(
            session.state().available_funds() == total,
            "nothing is spent yet"
        );

        expect_moved(&mut session)?;
        match session.choose_character(&frugal.id) {
            Err(SessionError::WrongPhase { .. }) => {}
            other => bail!("character changed outside its phase: {other:?}"),
        }
        let riskiest = catalog
            .locations
            .iter()
            .max_by(|a, b| a.earthquake_risk_factor.total_cmp(&b.earthquake_risk_factor))
            .context("catalog has no locations")?;
        session.choose_location(&riskiest.id)?;
        ensure!(
            session.state().available_funds() == total,
            "locations are free"
        );

        expect_moved(&mut session)?;
        let biggest = size_options(catalog, session.state())
            .into_iter()
            .filter(|option| option.affordable)
            .max_by_key(|option| option.cost)
            .context("no affordable building size")?;
        let biggest_id = biggest.item.id.clone();
        session.choose_size(&biggest_id)?;
        check_budget(session.state())?;

        expect_moved(&mut session)?;
        let options = structure_options(catalog, session.state());
        let before = session.state().available_funds();
        for option in options.iter().filter(|option| !option.affordable) {
            ensure!(
                !session.state().can_afford_structure(option.item),
                "selector and session disagree on {}",
                option.item.id
            );
            match session.choose_structure(&option.item.id) {
                Err(SessionError::Unaffordable { .. }) => {}
                other => bail!("{} should be unaffordable: {other:?}", option.item.id),
            }
            ensure!(
                session.state().available_funds() == before,
                "refused purchase changed the funds"
            );
            if ctx.verbose {
                println!("  💸 Refused {} ({})", option.item.name, option.cost_label);
            }
        }
        let cheapest = options
            .iter()
            .filter(|option| option.affordable)
            .min_by_key(|option| option.cost)
            .context("no affordable structure left")?;
        session.choose_structure(&cheapest.item.id)?;
        ensure!(
            session.state().available_funds() == before - cheapest.cost,
            "structure cost not deducted"
        );
        ensure!(
            session.state().total_budget() == total,
            "total budget moved after the character was chosen"
        );

        let request = request_simulation(&mut session)?;
        finish(&mut session, request, ctx).await
    }
}
