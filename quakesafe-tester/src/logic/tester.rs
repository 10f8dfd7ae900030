use colored::Colorize;
use quakesafe_game::Catalog;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::common::scenario::{Scenario, ScenarioCtx, ScenarioRun};
use crate::predictor::PredictorBackend;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub backend: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    /// Mean survival probability over the successful iterations.
    pub mean_survival: Option<f64>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

/// Runs scripted scenarios against one predictor backend.
pub struct LogicTester<'a> {
    catalog: &'static Catalog,
    predictor: &'a PredictorBackend,
    verbose: bool,
}

impl<'a> LogicTester<'a> {
    pub const fn new(
        catalog: &'static Catalog,
        predictor: &'a PredictorBackend,
        verbose: bool,
    ) -> Self {
        Self {
            catalog,
            predictor,
            verbose,
        }
    }

    pub async fn run_scenario(
        &self,
        scenario: &dyn Scenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (backend: {} seed: {})",
                    scenario.name().bright_white(),
                    self.predictor.label(),
                    seed
                );
            }

            let result = self.run_single_scenario(scenario, seed, iterations).await;
            results.push(result);
        }

        results
    }

    async fn run_single_scenario(
        &self,
        scenario: &dyn Scenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();
        let mut survivals = Vec::new();

        for i in 0..iterations {
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
            let ctx = ScenarioCtx {
                catalog: self.catalog,
                predictor: self.predictor,
                seed: iteration_seed,
                verbose: self.verbose,
            };
            let start_time = Instant::now();

            match scenario.run(&ctx).await {
                Ok(run) => {
                    let duration = start_time.elapsed();
                    performance_data.push(duration);
                    if let Some(survival) = run.survival_probability {
                        survivals.push(survival);
                    }
                    if self.verbose {
                        println!(
                            "  ✅ Iteration {}/{} passed ({duration:?}) {}",
                            i + 1,
                            iterations,
                            describe_run(&run)
                        );
                    }
                }
                Err(err) => {
                    failures.push(format!(
                        "Iteration {} (backend {}, seed {}): {err:#}",
                        i + 1,
                        self.predictor.label(),
                        iteration_seed
                    ));
                    if self.verbose {
                        println!(
                            "  ❌ Iteration {}/{} failed: {}",
                            i + 1,
                            iterations,
                            format!("{err:#}").as_str().red()
                        );
                    }
                }
            }
        }

        ScenarioResult {
            scenario_name: scenario.name().to_string(),
            backend: self.predictor.label().to_string(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: performance_data.len(),
            failures,
            mean_survival: mean(&survivals),
            average_duration: average(&performance_data),
            performance_data,
        }
    }
}

fn describe_run(run: &ScenarioRun) -> String {
    let survival = run
        .survival_probability
        .map_or_else(|| "-".to_string(), |s| format!("{s:.0}%"));
    format!(
        "phase:{} survival:{survival} lessons:{}",
        run.final_phase, run.lessons
    )
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let count = f64::from(u32::try_from(values.len()).unwrap_or(u32::MAX));
    Some(values.iter().sum::<f64>() / count)
}

fn average(durations: &[Duration]) -> Duration {
    if durations.is_empty() {
        Duration::ZERO
    } else {
        durations.iter().sum::<Duration>() / u32::try_from(durations.len()).unwrap_or(1)
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::scenario::{get_scenario, list_scenarios};
    use crate::predictor::OfflinePredictor;

    fn offline() -> PredictorBackend {
        PredictorBackend::Offline(OfflinePredictor)
    }

    #[test]
    fn every_scenario_passes_offline() {
        let backend = offline();
        let tester = LogicTester::new(Catalog::default_catalog(), &backend, false);
        for (key, _) in list_scenarios() {
            let scenario = get_scenario(key).unwrap();
            let results =
                tokio_test::block_on(tester.run_scenario(scenario.as_ref(), &[7, 1337], 3));
            assert_eq!(results.len(), 2);
            for result in results {
                assert!(result.passed, "{key}: {:?}", result.failures);
                assert_eq!(result.successful_iterations, 3);
                assert_eq!(result.backend, "offline");
                let survival = result.mean_survival.unwrap();
                assert!((0.0..=100.0).contains(&survival));
            }
        }
    }

    #[test]
    fn smoke_scenario_survival_is_deterministic() {
        let backend = offline();
        let tester = LogicTester::new(Catalog::default_catalog(), &backend, false);
        let scenario = get_scenario("smoke").unwrap();
        let results = tokio_test::block_on(tester.run_scenario(scenario.as_ref(), &[1], 2));
        assert_eq!(results[0].mean_survival, Some(71.0));
    }

    #[test]
    fn unreachable_service_fails_every_iteration() {
        let backend = PredictorBackend::Http(
            crate::predictor::HttpPredictor::new(
                "http://127.0.0.1:9",
                crate::predictor::Transport::Single,
                Duration::from_secs(2),
            )
            .unwrap(),
        );
        let tester = LogicTester::new(Catalog::default_catalog(), &backend, false);
        let scenario = get_scenario("smoke").unwrap();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let results = runtime.block_on(tester.run_scenario(scenario.as_ref(), &[1], 2));
        assert!(!results[0].passed);
        assert_eq!(results[0].successful_iterations, 0);
        assert_eq!(results[0].failures.len(), 2);
        assert!(results[0].failures[0].contains("prediction failed"));
        assert_eq!(results[0].mean_survival, None);
    }

    #[test]
    fn durations_serialize_as_millis() {
        let result = ScenarioResult {
            scenario_name: "Smoke Test".to_string(),
            backend: "offline".to_string(),
            seed: 1,
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            failures: Vec::new(),
            mean_survival: Some(55.0),
            average_duration: Duration::from_millis(12),
            performance_data: vec![Duration::from_millis(12)],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["average_duration"], 12);
        assert_eq!(json["performance_data"][0], 12);
        let back: ScenarioResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.average_duration, Duration::from_millis(12));
    }
}
