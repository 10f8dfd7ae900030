use anyhow::{Result, bail, ensure};
use quakesafe_game::{
    AdvanceOutcome, Catalog, FoldOutcome, GameSession, Phase, SessionState, SimulationRequest,
    SimulationStatus,
};
use serde::Serialize;

use crate::predictor::PredictorBackend;

pub mod budget;
pub mod cancel;
pub mod random;
pub mod smoke;
pub mod swap;

pub struct ScenarioCtx<'a> {
    pub catalog: &'static Catalog,
    pub predictor: &'a PredictorBackend,
    pub seed: u64,
    pub verbose: bool,
}

/// Where a scripted play-through ended up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioRun {
    pub final_phase: Phase,
    pub survival_probability: Option<f64>,
    pub lessons: usize,
}

// Predictor futures are not `Send`, so scenarios run on the calling task.
#[async_trait::async_trait(?Send)]
pub trait Scenario {
    fn name(&self) -> &'static str;
    async fn run(&self, ctx: &ScenarioCtx<'_>) -> Result<ScenarioRun>;
}

/// Catalog ids chosen in each selection phase.
#[derive(Debug, Clone, Copy)]
pub struct Picks<'p> {
    pub character: &'p str,
    pub location: &'p str,
    pub size: &'p str,
    pub structure: &'p str,
}

pub fn get_scenario(name: &str) -> Option<Box<dyn Scenario>> {
    match name.to_lowercase().as_str() {
        "smoke" => Some(Box::new(smoke::SmokeScenario)),
        "budget" | "budget-walk" => Some(Box::new(budget::BudgetScenario)),
        "swap" | "credit-back" => Some(Box::new(swap::SwapScenario)),
        "random" | "random-walk" => Some(Box::new(random::RandomScenario)),
        "cancel" | "stale-result" => Some(Box::new(cancel::CancelScenario)),
        _ => None,
    }
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    vec![
        ("smoke", "Fixed play-through from introduction to reflection"),
        ("budget", "Budget bookkeeping and unaffordable choices"),
        ("swap", "Replacing selections credits the previous cost back"),
        ("random", "Seeded random play-through over affordable options"),
        ("cancel", "Predictions outliving their session are discarded"),
    ]
}

/// Advance once, failing unless the session actually moved.
pub(crate) fn expect_moved(session: &mut GameSession<'_>) -> Result<Phase> {
    let from = session.phase();
    match session.advance()? {
        AdvanceOutcome::Moved { to, .. } => Ok(to),
        other => bail!("expected to leave {from}, got {other:?}"),
    }
}

/// Advance out of building structure, returning the simulation request it issues.
pub(crate) fn request_simulation(session: &mut GameSession<'_>) -> Result<SimulationRequest> {
    match session.advance()? {
        AdvanceOutcome::SimulationRequested(request) => Ok(request),
        other => bail!("expected a simulation request, got {other:?}"),
    }
}

/// Walk a fresh session through every selection phase.
pub(crate) fn walk_to_simulation(
    session: &mut GameSession<'_>,
    picks: Picks<'_>,
) -> Result<SimulationRequest> {
    ensure!(
        session.phase() == Phase::Introduction,
        "walk must start at the introduction, not {}",
        session.phase()
    );
    expect_moved(session)?;
    session.choose_character(picks.character)?;
    expect_moved(session)?;
    session.choose_location(picks.location)?;
    expect_moved(session)?;
    session.choose_size(picks.size)?;
    check_budget(session.state())?;
    expect_moved(session)?;
    session.choose_structure(picks.structure)?;
    check_budget(session.state())?;
    request_simulation(session)
}

/// Sum of the base costs of the size and structure currently held.
pub(crate) fn committed_costs(state: &SessionState) -> i64 {
    state.building_size().map_or(0, |size| size.base_cost)
        + state.building_structure().map_or(0, |structure| structure.base_cost)
}

pub(crate) fn check_budget(state: &SessionState) -> Result<()> {
    ensure!(
        state.available_funds() >= 0,
        "available funds went negative: {}",
        state.available_funds()
    );
    let committed = committed_costs(state);
    ensure!(
        state.available_funds() == state.total_budget() - committed,
        "budget does not balance: {} available != {} total - {} committed",
        state.available_funds(),
        state.total_budget(),
        committed
    );
    Ok(())
}

/// Run the prediction, then walk results into reflection and check what the player sees.
pub(crate) async fn finish(
    session: &mut GameSession<'_>,
    request: SimulationRequest,
    ctx: &ScenarioCtx<'_>,
) -> Result<ScenarioRun> {
    let verbose = ctx.verbose;
    let outcome = session
        .simulate(request, ctx.predictor, &mut |update| {
            if verbose {
                println!(
                    "  ⏳ {:>3.0}% {}",
                    update.progress,
                    update.message.as_deref().unwrap_or("")
                );
            }
        })
        .await;

    let survival = match outcome {
        FoldOutcome::Completed {
            survival_probability,
        } => survival_probability,
        FoldOutcome::Failed => {
            let reason = match session.state().simulation_status() {
                SimulationStatus::Failed(message) => message.clone(),
                other => format!("{other:?}"),
            };
            bail!("prediction failed: {reason}");
        }
        FoldOutcome::Stale => bail!("prediction was discarded as stale"),
    };
    ensure!(
        (0.0..=100.0).contains(&survival),
        "survival probability {survival} out of range"
    );
    ensure!(
        session.phase() == Phase::Results,
        "completed simulation should land on results, not {}",
        session.phase()
    );

    let summary = session.summary()?;
    ensure!(
        (summary.survival_probability - survival).abs() < f64::EPSILON,
        "summary shows {} but the fold reported {survival}",
        summary.survival_probability
    );
    if verbose {
        println!(
            "  🏚️  {} in {}: {:.0}% survival ({})",
            summary.structure_name, summary.location_name, survival, summary.band
        );
    }

    expect_moved(session)?;
    ensure!(
        session.advance()? == AdvanceOutcome::Blocked(Phase::Reflection),
        "reflection should be the last phase"
    );
    ensure!(!session.retreat(), "results and reflection are forward-only");
    check_budget(session.state())?;

    Ok(ScenarioRun {
        final_phase: session.phase(),
        survival_probability: session.state().survival_probability(),
        lessons: session.state().lessons().len(),
    })
}
