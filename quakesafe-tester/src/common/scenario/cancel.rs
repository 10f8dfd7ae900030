use anyhow::{Result, ensure};
use quakesafe_game::{AdvanceOutcome, FoldOutcome, GameSession, Phase};

use super::{
    Picks, Scenario, ScenarioCtx, ScenarioRun, finish, request_simulation, walk_to_simulation,
};

const PICKS: Picks<'static> = Picks {
    character: "rural-farmer",
    location: "sindhuli",
    size: "small-single-story",
    structure: "traditional-bamboo",
};

/// Abandon predictions mid-flight and check their answers are ignored.
pub struct CancelScenario;

#[async_trait::async_trait(?Send)]
impl Scenario for CancelScenario {
    fn name(&self) -> &'static str {
        "Stale Result Discard"
    }

    async fn run(&self, ctx: &ScenarioCtx<'_>) -> Result<ScenarioRun> {
        let mut session = GameSession::new(ctx.catalog);

        let abandoned = walk_to_simulation(&mut session, PICKS)?;
        ensure!(
            session.advance()? == AdvanceOutcome::Blocked(Phase::Simulation),
            "simulation must not be skippable"
        );
        session.reset();
        let outcome = session.simulate(abandoned, ctx.predictor, &mut |_| {}).await;
        ensure!(outcome == FoldOutcome::Stale, "reset should orphan the request, got {outcome:?}");
        ensure!(
            session.phase() == Phase::Introduction && session.state().character().is_none(),
            "stale answer touched the fresh session"
        );

        let withdrawn = walk_to_simulation(&mut session, PICKS)?;
        ensure!(session.retreat(), "simulation allows going back");
        let outcome = session.simulate(withdrawn.clone(), ctx.predictor, &mut |_| {}).await;
        ensure!(outcome == FoldOutcome::Stale, "retreat should orphan the request, got {outcome:?}");
        ensure!(
            session.phase() == Phase::BuildingStructure
                && session.state().survival_probability().is_none(),
            "stale answer was folded in"
        );
        if ctx.verbose {
            println!("  🗑️  Discarded two stale predictions");
        }

        let request = request_simulation(&mut session)?;
        ensure!(
            request.ticket != withdrawn.ticket,
            "a fresh request must carry a new ticket"
        );
        finish(&mut session, request, ctx).await
    }
}
