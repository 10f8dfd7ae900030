mod common;
mod logic;
mod predictor;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use quakesafe_game::Catalog;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use common::scenario::{get_scenario, list_scenarios};
use common::split_csv;
use logic::{LogicTester, ScenarioResult, SeedInfo, resolve_seed_inputs};
use predictor::{HttpPredictor, OfflinePredictor, PredictorBackend, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TestMode {
    /// Built-in offline predictor (fast, no network)
    Logic,
    /// External prediction service over HTTP
    Service,
    /// Run against both predictors
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
}

#[derive(Debug, Parser)]
#[command(name = "quakesafe-tester", version)]
#[command(about = "Scripted play-throughs of the QuakeSafe game against a damage predictor")]
struct Args {
    /// Predictor to play against: logic (offline), service (HTTP), or both
    #[arg(long, value_enum, default_value_t = TestMode::Logic)]
    mode: TestMode,

    /// Scenarios to run (comma-separated, or `all`)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated, decimal or 0x hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Base URL of the prediction service
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    endpoint: String,

    /// How to talk to the prediction service
    #[arg(long, value_enum, default_value_t = Transport::Single)]
    transport: Transport,

    /// Give up on a prediction after this many seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let scenarios = expand_scenarios(&args.scenarios);
    let seed_infos = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let seeds: Vec<u64> = seed_infos.iter().map(|s| s.seed).collect();
    let seed_labels: Vec<String> = seed_infos.iter().map(SeedInfo::label).collect();
    println!("🌱 Seeds: {}", seed_labels.join(", "));
    let backends = build_backends(&args)?;

    let mut all_results = Vec::new();
    for backend in &backends {
        all_results.extend(run_scenarios(&args, &scenarios, &seeds, backend).await);
    }

    write_reports(&args, &all_results, start_time)?;

    if all_results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:10} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🏠 QuakeSafe Automated Tester".bright_cyan().bold());
    println!("{}", "=============================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s.eq_ignore_ascii_case("all")) {
        scenarios.retain(|s| !s.eq_ignore_ascii_case("all"));
        for (key, _) in list_scenarios() {
            if !scenarios.iter().any(|s| s == key) {
                scenarios.push(key.to_string());
            }
        }
    }
    scenarios
}

fn build_backends(args: &Args) -> Result<Vec<PredictorBackend>> {
    let mut backends = Vec::new();
    if matches!(args.mode, TestMode::Logic | TestMode::Both) {
        backends.push(PredictorBackend::Offline(OfflinePredictor));
    }
    if matches!(args.mode, TestMode::Service | TestMode::Both) {
        let client = HttpPredictor::new(
            &args.endpoint,
            args.transport,
            Duration::from_secs(args.timeout_secs),
        )
        .with_context(|| format!("failed to set up predictor for {}", args.endpoint))?;
        backends.push(PredictorBackend::Http(client));
    }
    Ok(backends)
}

async fn run_scenarios(
    args: &Args,
    scenarios: &[String],
    seeds: &[u64],
    backend: &PredictorBackend,
) -> Vec<ScenarioResult> {
    let mut results: Vec<ScenarioResult> = Vec::new();

    match backend {
        PredictorBackend::Offline(_) => {
            println!("{}", "🧠 Running Offline Scenarios".bright_yellow().bold());
            println!("{}", "-".repeat(30).yellow());
        }
        PredictorBackend::Http(_) => {
            println!(
                "{} {}",
                "🌐 Running Service Scenarios against".bright_blue().bold(),
                args.endpoint
            );
            println!("{}", "-".repeat(30).blue());
        }
    }

    let tester = LogicTester::new(Catalog::default_catalog(), backend, args.verbose);

    for scenario_name in scenarios {
        if let Some(scenario) = get_scenario(scenario_name) {
            let scenario_results = tester
                .run_scenario(scenario.as_ref(), seeds, args.iterations)
                .await;
            results.extend(scenario_results);
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }

    results
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report {
        ReportFormat::Json => {
            logic::reports::generate_json_report(&mut output_target, results)?;
        }
        ReportFormat::Markdown => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# QuakeSafe Scenario Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        ReportFormat::Console => {
            if results.is_empty() {
                writeln!(&mut output_target, "No scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(
                &mut output_target,
                "🏁 Total time: {:?}",
                start_time.elapsed()
            )?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
