use std::cell::Cell;

use quakesafe_game::{
    AdvanceOutcome, Catalog, FeatureRecord, FoldOutcome, GameSession, Phase, PredictionResult,
    Predictor, SessionState, SimulationProgress, SimulationStatus, SuperstructureMaterial,
    TransportError, generate_lessons,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const BUDGET_CATALOG: &str = r#"{
    "characters": [
        {"id": "steady", "name": "Steady Saver", "description": "", "age": 40, "budget_modifier": 1.0},
        {"id": "frugal", "name": "Frugal Farmer", "description": "", "age": 50, "budget_modifier": 0.3}
    ],
    "locations": [
        {"id": "hills", "name": "Hills", "description": "", "earthquake_risk_factor": 0.8, "geotechnical_risk_factor": 0.3},
        {"id": "plains", "name": "Plains", "description": "", "earthquake_risk_factor": 0.2, "geotechnical_risk_factor": 0.1}
    ],
    "building_sizes": [
        {"id": "mid", "name": "Mid", "description": "", "plinth_area_sq_ft": "200 to 400", "height_ft_pre_eq": "10 to 20", "count_floors_pre_eq": 2, "base_cost": 50000},
        {"id": "big", "name": "Big", "description": "", "plinth_area_sq_ft": "400 to 600", "height_ft_pre_eq": "15 to 25", "count_floors_pre_eq": 3, "base_cost": 80000}
    ],
    "building_structures": [
        {"id": "cane", "name": "Cane", "description": "", "superstructure": ["bamboo"], "foundation_type": "Bamboo/Timber", "roof_type": "Bamboo/Timber", "ground_floor_type": "Mud", "other_floor_type": "Not applicable", "base_cost": 30000, "protection_score": 40},
        {"id": "frame", "name": "Frame", "description": "", "superstructure": ["rc_engineered"], "foundation_type": "RC", "roof_type": "RCC/RB/RBC", "ground_floor_type": "RC", "other_floor_type": "RCC/RB/RBC", "base_cost": 10000, "protection_score": 95}
    ]
}"#;

fn budget_catalog() -> Catalog {
    Catalog::from_json(BUDGET_CATALOG).unwrap()
}

/// Walks a session from the introduction to the start of `target`.
fn session_at<'c>(catalog: &'c Catalog, character: &str, target: Phase) -> GameSession<'c> {
    let mut session = GameSession::new(catalog);
    while session.phase() < target {
        match session.phase() {
            Phase::CharacterSelection => session.choose_character(character).unwrap(),
            Phase::LocationSelection => session.choose_location("hills").unwrap(),
            Phase::BuildingSize => session.choose_size("mid").unwrap(),
            Phase::BuildingStructure => session.choose_structure("cane").unwrap(),
            _ => {}
        }
        session.advance().unwrap();
    }
    session
}

struct FixedPredictor {
    damage: f64,
    calls: Cell<u32>,
}

impl FixedPredictor {
    fn new(damage: f64) -> Self {
        Self {
            damage,
            calls: Cell::new(0),
        }
    }
}

impl Predictor for FixedPredictor {
    async fn predict(
        &self,
        features: &FeatureRecord,
        progress: &mut dyn FnMut(&SimulationProgress),
    ) -> Result<PredictionResult, TransportError> {
        assert!(features.count_floors_pre_eq > 0);
        self.calls.set(self.calls.get() + 1);
        progress(&SimulationProgress {
            progress: 100.0,
            message: Some("done".to_string()),
        });
        Ok(PredictionResult::new(self.damage))
    }
}

struct DownPredictor;

impl Predictor for DownPredictor {
    async fn predict(
        &self,
        _features: &FeatureRecord,
        _progress: &mut dyn FnMut(&SimulationProgress),
    ) -> Result<PredictionResult, TransportError> {
        Err(TransportError::Network("connection refused".to_string()))
    }
}

#[test]
fn budget_scenario_tracks_deltas() {
    let catalog = budget_catalog();
    let mut session = session_at(&catalog, "steady", Phase::CharacterSelection);
    session.choose_character("steady").unwrap();
    assert_eq!(session.state().total_budget(), 200_000);
    assert_eq!(session.state().available_funds(), 200_000);

    session.advance().unwrap();
    session.choose_location("plains").unwrap();
    session.advance().unwrap();
    session.choose_size("mid").unwrap();
    assert_eq!(session.state().available_funds(), 150_000);

    session.advance().unwrap();
    session.choose_structure("cane").unwrap();
    assert_eq!(session.state().available_funds(), 120_000);

    assert!(session.retreat());
    session.choose_size("big").unwrap();
    assert_eq!(session.state().available_funds(), 90_000);
    assert_eq!(session.state().total_budget(), 200_000);
}

#[test]
fn reselecting_same_size_is_idempotent() {
    let catalog = budget_catalog();
    let mut session = session_at(&catalog, "steady", Phase::BuildingSize);
    session.choose_size("mid").unwrap();
    let after_first = session.state().available_funds();
    session.choose_size("mid").unwrap();
    assert_eq!(session.state().available_funds(), after_first);
}

#[test]
fn swapping_sizes_round_trips_funds() {
    let catalog = budget_catalog();
    let mut session = session_at(&catalog, "steady", Phase::BuildingSize);
    let before = session.state().available_funds();
    session.choose_size("mid").unwrap();
    let after_a = session.state().available_funds();
    session.choose_size("big").unwrap();
    session.choose_size("mid").unwrap();
    assert_eq!(session.state().available_funds(), after_a);
    assert_eq!(before - after_a, 50_000);
}

#[test]
fn can_advance_from_size_needs_a_size() {
    let catalog = budget_catalog();
    let mut session = session_at(&catalog, "steady", Phase::BuildingSize);
    assert!(!session.state().can_advance());
    assert_eq!(
        session.advance().unwrap(),
        AdvanceOutcome::Blocked(Phase::BuildingSize)
    );
    session.choose_size("big").unwrap();
    assert!(session.state().can_advance());
}

#[test]
fn seven_advances_reach_reflection_through_simulation() {
    let catalog = budget_catalog();
    let predictor = FixedPredictor::new(25.0);
    let mut session = GameSession::new(&catalog);
    let mut visited = vec![session.phase()];
    let mut advances = 0;

    while session.phase() != Phase::Reflection {
        match session.phase() {
            Phase::CharacterSelection => session.choose_character("steady").unwrap(),
            Phase::LocationSelection => session.choose_location("hills").unwrap(),
            Phase::BuildingSize => session.choose_size("mid").unwrap(),
            Phase::BuildingStructure => session.choose_structure("frame").unwrap(),
            _ => {}
        }
        match session.advance().unwrap() {
            AdvanceOutcome::SimulationRequested(request) => {
                assert_eq!(session.phase(), Phase::Simulation);
                assert!(!session.state().can_advance());
                visited.push(Phase::Simulation);
                // The orchestrator issues the advance out of Simulation once the result is folded.
                advances += 1;
                let outcome = tokio_test::block_on(session.simulate(
                    request,
                    &predictor,
                    &mut |_| {},
                ));
                assert_eq!(
                    outcome,
                    FoldOutcome::Completed {
                        survival_probability: 75.0
                    }
                );
            }
            AdvanceOutcome::Moved { .. } => {}
            AdvanceOutcome::Blocked(phase) => panic!("blocked at {phase}"),
        }
        advances += 1;
        visited.push(session.phase());
    }

    assert_eq!(advances, 7);
    assert_eq!(predictor.calls.get(), 1);
    assert_eq!(visited, Phase::ALL.to_vec());
    assert_eq!(
        session.advance().unwrap(),
        AdvanceOutcome::Blocked(Phase::Reflection)
    );
}

#[test]
fn seven_explicit_advances_reach_reflection() {
    let catalog = budget_catalog();
    let mut session = GameSession::new(&catalog);
    let mut moved = 0;
    for _ in 0..7 {
        match session.phase() {
            Phase::CharacterSelection => session.choose_character("steady").unwrap(),
            Phase::LocationSelection => session.choose_location("hills").unwrap(),
            Phase::BuildingSize => session.choose_size("mid").unwrap(),
            Phase::BuildingStructure => session.choose_structure("frame").unwrap(),
            _ => {}
        }
        match session.advance().unwrap() {
            AdvanceOutcome::SimulationRequested(request) => {
                let ticket = request.ticket;
                let outcome = session
                    .state_mut()
                    .complete_simulation(ticket, PredictionResult::new(40.0));
                assert!(matches!(outcome, FoldOutcome::Completed { .. }));
                moved += 1;
            }
            AdvanceOutcome::Moved { .. } => moved += 1,
            AdvanceOutcome::Blocked(phase) => panic!("blocked at {phase}"),
        }
    }
    assert_eq!(moved, 7);
    assert_eq!(session.phase(), Phase::Reflection);
}

#[test]
fn simulation_cannot_be_skipped() {
    let catalog = budget_catalog();
    let mut session = session_at(&catalog, "steady", Phase::Simulation);
    for _ in 0..5 {
        assert_eq!(
            session.advance().unwrap(),
            AdvanceOutcome::Blocked(Phase::Simulation)
        );
    }
    assert_eq!(session.phase(), Phase::Simulation);
}

#[test]
fn transport_failure_keeps_phase_and_selections() {
    let catalog = budget_catalog();
    let mut session = session_at(&catalog, "steady", Phase::BuildingStructure);
    session.choose_structure("frame").unwrap();
    let AdvanceOutcome::SimulationRequested(request) = session.advance().unwrap() else {
        panic!("expected a simulation request");
    };
    let outcome = tokio_test::block_on(session.simulate(request, &DownPredictor, &mut |_| {}));
    assert_eq!(outcome, FoldOutcome::Failed);
    assert_eq!(session.phase(), Phase::Simulation);
    assert_eq!(
        session.state().simulation_status(),
        &SimulationStatus::Failed("network error: connection refused".to_string())
    );
    assert_eq!(
        session.state().building_structure().map(|s| s.id.as_str()),
        Some("frame")
    );

    let retry = session.state_mut().retry_simulation().unwrap();
    let predictor = FixedPredictor::new(10.0);
    let outcome = tokio_test::block_on(session.simulate(retry, &predictor, &mut |_| {}));
    assert!(matches!(outcome, FoldOutcome::Completed { .. }));
    assert_eq!(session.phase(), Phase::Results);
    assert!(!session.retreat());
}

#[test]
fn reset_discards_late_prediction() {
    let catalog = budget_catalog();
    let mut session = session_at(&catalog, "steady", Phase::BuildingStructure);
    session.choose_structure("cane").unwrap();
    let AdvanceOutcome::SimulationRequested(request) = session.advance().unwrap() else {
        panic!("expected a simulation request");
    };
    session.reset();
    let outcome = session
        .state_mut()
        .complete_simulation(request.ticket, PredictionResult::new(5.0));
    assert_eq!(outcome, FoldOutcome::Stale);
    assert_eq!(session.phase(), Phase::Introduction);
    assert!(session.state().survival_probability().is_none());
    assert!(session.state().lessons().is_empty());
}

#[test]
fn stale_request_never_reaches_predictor() {
    let catalog = budget_catalog();
    let mut session = session_at(&catalog, "steady", Phase::BuildingStructure);
    session.choose_structure("cane").unwrap();
    let AdvanceOutcome::SimulationRequested(request) = session.advance().unwrap() else {
        panic!("expected a simulation request");
    };
    session.reset();
    let predictor = FixedPredictor::new(5.0);
    let outcome = tokio_test::block_on(session.simulate(request, &predictor, &mut |_| {}));
    assert_eq!(outcome, FoldOutcome::Stale);
    assert_eq!(predictor.calls.get(), 0);
    assert_eq!(session.phase(), Phase::Introduction);
}

#[test]
fn lessons_flag_underspending_and_intensity() {
    let catalog = budget_catalog();
    let mut state = SessionState::with_base_budget(100_000);
    state.advance().unwrap();
    state
        .select_character(catalog.character("steady").unwrap())
        .unwrap();
    state.advance().unwrap();
    state
        .select_location(catalog.location("hills").unwrap())
        .unwrap();
    state.advance().unwrap();
    state
        .select_building_size(catalog.building_size("mid").unwrap())
        .unwrap();
    state.advance().unwrap();
    state
        .select_building_structure(catalog.building_structure("frame").unwrap())
        .unwrap();
    assert_eq!(state.total_budget(), 100_000);
    assert_eq!(state.available_funds(), 40_000);

    let lessons = generate_lessons(&state, 8.0);
    assert!(lessons.iter().any(|l| l.starts_with("Underspending on preparedness")));
    assert!(lessons.iter().any(|l| l.starts_with("At magnitude 8.0,")));
    assert!(lessons.iter().any(|l| l.starts_with("Living in Hills, a high-risk area")));
    assert!(
        !lessons
            .iter()
            .any(|l| l.starts_with("Building structural integrity"))
    );
    assert_eq!(lessons.len(), 3);
}

#[test]
fn lessons_name_low_risk_location() {
    let catalog = budget_catalog();
    let mut session = session_at(&catalog, "steady", Phase::LocationSelection);
    session.choose_location("plains").unwrap();
    let lessons = generate_lessons(session.state(), 6.0);
    assert!(
        lessons
            .iter()
            .any(|l| l.starts_with("Though Plains experienced less intense shaking"))
    );
}

#[test]
fn bamboo_only_structure_sets_only_the_bamboo_flag() {
    let catalog = budget_catalog();
    let session = session_at(&catalog, "steady", Phase::Simulation);
    let record = session.state().feature_record().unwrap();
    for material in SuperstructureMaterial::ALL {
        let expected = material == SuperstructureMaterial::Bamboo;
        assert_eq!(record.has_material(material), expected, "{material:?}");
    }
    assert_eq!(record.has_superstructure_bamboo, 1);
    assert_eq!(record.roof_bamboo_timber, 1);
    assert_eq!(record.foundation_bamboo_timber, 1);
    assert!((record.geotechnical_risk - 0.3).abs() < f64::EPSILON);
    assert!((record.height_plinth_ratio - 0.05).abs() < 1e-12);
}

#[test]
fn cheaper_character_cannot_strand_existing_costs() {
    let catalog = budget_catalog();
    let mut session = session_at(&catalog, "steady", Phase::BuildingStructure);
    session.choose_structure("cane").unwrap();
    // Back to character selection with 80 000 committed.
    for _ in 0..3 {
        assert!(session.retreat());
    }
    assert_eq!(session.phase(), Phase::CharacterSelection);
    let before = session.state().clone();
    let err = session.choose_character("frugal").unwrap_err();
    assert!(matches!(
        err,
        quakesafe_game::SessionError::Unaffordable { cost: 80_000, .. }
    ));
    assert_eq!(session.state(), &before);
}

#[test]
fn random_walks_preserve_budget_invariants() {
    let catalog = Catalog::default_catalog();
    for seed in 0..64_u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut session = GameSession::new(catalog);
        let mut fixed_total = None;

        for _ in 0..200 {
            let phase = session.phase();
            match phase {
                Phase::CharacterSelection if fixed_total.is_none() => {
                    let pick = &catalog.characters[rng.gen_range(0..catalog.characters.len())];
                    session.choose_character(&pick.id).unwrap();
                    fixed_total = Some(session.state().total_budget());
                }
                Phase::LocationSelection => {
                    let pick = &catalog.locations[rng.gen_range(0..catalog.locations.len())];
                    session.choose_location(&pick.id).unwrap();
                }
                Phase::BuildingSize => {
                    let pick =
                        &catalog.building_sizes[rng.gen_range(0..catalog.building_sizes.len())];
                    if session.state().can_afford_size(pick) {
                        session.choose_size(&pick.id).unwrap();
                    } else {
                        assert!(session.choose_size(&pick.id).is_err());
                    }
                }
                Phase::BuildingStructure => {
                    let pick = &catalog.building_structures
                        [rng.gen_range(0..catalog.building_structures.len())];
                    if session.state().can_afford_structure(pick) {
                        session.choose_structure(&pick.id).unwrap();
                    } else {
                        assert!(session.choose_structure(&pick.id).is_err());
                    }
                }
                _ => {}
            }

            let state = session.state();
            let committed = state.building_size().map_or(0, |s| s.base_cost)
                + state.building_structure().map_or(0, |s| s.base_cost);
            assert_eq!(state.available_funds(), state.total_budget() - committed);
            assert!(state.available_funds() >= 0);
            if let Some(total) = fixed_total {
                assert_eq!(state.total_budget(), total);
            }

            if phase == Phase::Simulation || phase == Phase::Reflection {
                break;
            }
            if rng.gen_bool(0.2) {
                session.retreat();
            } else {
                session.advance().unwrap();
            }
        }
    }
}
