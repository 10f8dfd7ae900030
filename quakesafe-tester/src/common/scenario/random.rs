use anyhow::{Context, Result, ensure};
use quakesafe_game::{GameSession, Phase, size_options, structure_options};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{
    Scenario, ScenarioCtx, ScenarioRun, check_budget, expect_moved, finish, request_simulation,
};

/// Seeded play-through over whatever the budget allows at each step.
pub struct RandomScenario;

#[async_trait::async_trait(?Send)]
impl Scenario for RandomScenario {
    fn name(&self) -> &'static str {
        "Random Walk"
    }

    async fn run(&self, ctx: &ScenarioCtx<'_>) -> Result<ScenarioRun> {
        let catalog = ctx.catalog;
        let mut rng = ChaCha8Rng::seed_from_u64(ctx.seed);
        let mut session = GameSession::new(catalog);
        expect_moved(&mut session)?;

        let character = catalog
            .characters
            .choose(&mut rng)
            .context("catalog has no characters")?;
        session.choose_character(&character.id)?;
        expect_moved(&mut session)?;
        let location = catalog
            .locations
            .choose(&mut rng)
            .context("catalog has no locations")?;
        session.choose_location(&location.id)?;
        expect_moved(&mut session)?;

        let sizes: Vec<_> = size_options(catalog, session.state())
            .into_iter()
            .filter(|o| o.affordable)
            .collect();
        let size = sizes
            .choose(&mut rng)
            .context("no affordable building size")?;
        session.choose_size(&size.item.id)?;
        check_budget(session.state())?;
        expect_moved(&mut session)?;

        let structures: Vec<_> = structure_options(catalog, session.state())
            .into_iter()
            .filter(|o| o.affordable)
            .collect();
        let structure = structures.choose(&mut rng).with_context(|| {
            format!(
                "{} leaves nothing affordable for {}",
                size.item.id, character.id
            )
        })?;
        session.choose_structure(&structure.item.id)?;
        check_budget(session.state())?;

        if rng.gen_bool(0.5) {
            ensure!(session.retreat(), "building structure allows going back");
            ensure!(session.phase() == Phase::BuildingSize, "retreat landed on {}", session.phase());
            expect_moved(&mut session)?;
        }
        if ctx.verbose {
            println!(
                "  🎲 seed {}: {} in {} with {} / {}",
                ctx.seed, character.id, location.id, size.item.id, structure.item.id
            );
        }

        let request = request_simulation(&mut session)?;
        finish(&mut session, request, ctx).await
    }
}
