use anyhow::{Context, Result, ensure};
use quakesafe_game::GameSession;

use super::{Picks, Scenario, ScenarioCtx, ScenarioRun, finish, walk_to_simulation};

const PICKS: Picks<'static> = Picks {
    character: "village-teacher",
    location: "gorkha",
    size: "medium-two-story",
    structure: "modern-concrete",
};

pub struct SmokeScenario;

#[async_trait::async_trait(?Send)]
impl Scenario for SmokeScenario {
    fn name(&self) -> &'static str {
        "Smoke Test"
    }

    async fn run(&self, ctx: &ScenarioCtx<'_>) -> Result<ScenarioRun> {
        let mut session = GameSession::new(ctx.catalog);
        ensure!(!session.retreat(), "introduction has no previous phase");

        let request = walk_to_simulation(&mut session, PICKS)?;
        let size = ctx
            .catalog
            .building_size(PICKS.size)
            .context("smoke size missing from catalog")?;
        let structure = ctx
            .catalog
            .building_structure(PICKS.structure)
            .context("smoke structure missing from catalog")?;
        ensure!(
            session.state().amount_spent() == size.base_cost + structure.base_cost,
            "spent {} after choosing {} and {}",
            session.state().amount_spent(),
            size.id,
            structure.id
        );
        ensure!(
            request.features.count_floors_pre_eq == size.count_floors_pre_eq,
            "request carries {} floors",
            request.features.count_floors_pre_eq
        );
        ensure!(
            request.features.foundation() == Some(structure.foundation_type),
            "request foundation does not match {}",
            structure.id
        );
        if ctx.verbose {
            println!("  🧱 Requested simulation for {} / {}", size.name, structure.name);
        }

        finish(&mut session, request, ctx).await
    }
}
