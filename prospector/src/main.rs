// src/main.rs
//
// Research-harness CLI for the prospector engine.
//
// Subcommands:
// - rollout:   run baseline policies over a seed range, print summaries
// - parity:    record / compare JSONL traces, or run the in-process self-check
// - inspect:   dump the generated world for a seed as JSON
//
// Engine tunables come from PROSPECTOR_* env vars, then CLI flags.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use prospector::config::EngineConfig;
use prospector::logging::{EventSink, JsonlSink, NoopSink};
use prospector::parity::{self, Suite, Tolerances, Trace};
use prospector::rollout::{run_rollouts, PolicyKind, RolloutAggregate, RolloutConfig};
use prospector::rng::Pcg32;
use prospector::world::World;

#[derive(Debug, Parser)]
#[command(
    name = "prospector",
    about = "Asteroid prospector RL environment (research harness)",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run baseline policies over a range of seeds.
    Rollout(RolloutArgs),
    /// Cross-build parity tooling.
    #[command(subcommand)]
    Parity(ParityCommand),
    /// Print the world generated for a seed.
    Inspect {
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum PolicyArg {
    Random,
    Cycle,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SuiteArg {
    A,
    B,
    C,
}

impl From<SuiteArg> for Suite {
    fn from(s: SuiteArg) -> Self {
        match s {
            SuiteArg::A => Suite::A,
            SuiteArg::B => Suite::B,
            SuiteArg::C => Suite::C,
        }
    }
}

#[derive(Debug, Args)]
struct EngineArgs {
    /// Episode time budget (overrides PROSPECTOR_TIME_MAX).
    #[arg(long)]
    time_max: Option<f32>,

    /// Invalid-action penalty (overrides PROSPECTOR_INVALID_ACTION_PENALTY).
    #[arg(long)]
    invalid_action_penalty: Option<f32>,
}

impl EngineArgs {
    fn resolve(&self) -> Result<EngineConfig> {
        let mut cfg = EngineConfig::from_env();
        if let Some(t) = self.time_max {
            cfg.time_max = t;
        }
        if let Some(p) = self.invalid_action_penalty {
            cfg.invalid_action_penalty = p;
        }
        cfg.validate().context("invalid engine configuration")?;
        Ok(cfg)
    }
}

#[derive(Debug, Args)]
struct RolloutArgs {
    #[arg(long, default_value_t = 10)]
    seeds: u64,

    #[arg(long, default_value_t = 0)]
    seed_start: u64,

    /// Step cap per episode.
    #[arg(long, default_value_t = 2000)]
    steps: u64,

    #[arg(long, value_enum, default_value_t = PolicyArg::Random)]
    policy: PolicyArg,

    /// Comma-separated action codes for `--policy cycle`.
    #[arg(long, value_delimiter = ',', default_values_t = vec![6i64])]
    pattern: Vec<i64>,

    /// Worker threads (0 = available parallelism).
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// JSONL trace output. Falls back to PROSPECTOR_TRACE_MODE / _PATH.
    #[arg(long)]
    jsonl: Option<PathBuf>,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Debug, Subcommand)]
enum ParityCommand {
    /// Record one case to a JSONL trace.
    Record {
        #[arg(long, value_enum)]
        suite: SuiteArg,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 2000)]
        steps: usize,
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Compare two recorded traces; exits non-zero on mismatch.
    Compare {
        #[arg(long)]
        reference: PathBuf,
        #[arg(long)]
        candidate: PathBuf,
        #[arg(long, default_value_t = 1e-6)]
        obs_atol: f64,
        #[arg(long, default_value_t = 1e-5)]
        obs_rtol: f64,
        #[arg(long, default_value_t = 1e-6)]
        reward_atol: f64,
        #[arg(long, default_value_t = 1e-5)]
        reward_rtol: f64,
        #[arg(long, default_value_t = 1e-4)]
        info_rel: f64,
        #[arg(long)]
        allow_mismatch: bool,
    },
    /// Determinism and batched-equivalence check over every suite.
    SelfCheck {
        #[arg(long, default_value_t = 10)]
        seeds: u64,
        #[arg(long, default_value_t = 0)]
        seed_start: u64,
        #[arg(long, default_value_t = 2000)]
        steps: usize,
        /// Repeat for several suites; defaults to A, B and C.
        #[arg(long, value_enum)]
        suite: Vec<SuiteArg>,
        /// One or more time budgets to test.
        #[arg(long, num_args = 1.., default_values_t = vec![2000.0f32, 8000.0])]
        time_max: Vec<f32>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Rollout(args) => run_rollout(&args),
        Command::Parity(cmd) => run_parity(cmd),
        Command::Inspect { seed } => run_inspect(seed),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_rollout(args: &RolloutArgs) -> Result<ExitCode> {
    let engine = args.engine.resolve()?;
    let threads = if args.threads == 0 {
        std::thread::available_parallelism().map_or(1, |n| n.get())
    } else {
        args.threads
    };
    let policy = match args.policy {
        PolicyArg::Random => PolicyKind::Random,
        PolicyArg::Cycle => PolicyKind::Cycle(args.pattern.clone()),
    };
    let cfg = RolloutConfig {
        engine,
        seed_start: args.seed_start,
        num_seeds: args.seeds,
        max_steps: args.steps,
        threads,
        policy,
    };

    println!(
        "prospector | time_max={} | invalid_penalty={} | seeds={}..{} | steps={} | threads={}",
        engine.time_max,
        engine.invalid_action_penalty,
        cfg.seed_start,
        cfg.seed_start + cfg.num_seeds,
        cfg.max_steps,
        threads
    );

    let mut sink: Box<dyn EventSink> = match &args.jsonl {
        Some(path) => Box::new(JsonlSink::create(path)),
        None => {
            let sink = JsonlSink::from_env();
            if sink.is_enabled() {
                Box::new(sink)
            } else {
                Box::new(NoopSink)
            }
        }
    };

    let summaries = run_rollouts(&cfg, sink.as_mut()).context("rollout failed")?;
    sink.flush();

    for s in &summaries {
        println!(
            "seed={} steps={} ticks={} return={:.4} credits={:.1} net_profit={:.1} survival={} reason={}",
            s.seed,
            s.steps,
            s.ticks,
            s.total_return,
            s.credits,
            s.net_profit,
            s.survival,
            s.termination_reason
                .map(|r| r.to_string())
                .unwrap_or_else(|| "step_cap".to_string())
        );
    }
    let aggregate = RolloutAggregate::from_summaries(&summaries);
    println!("{}", serde_json::to_string_pretty(&aggregate)?);
    Ok(ExitCode::SUCCESS)
}

fn run_parity(cmd: ParityCommand) -> Result<ExitCode> {
    match cmd {
        ParityCommand::Record {
            suite,
            seed,
            steps,
            out,
            engine,
        } => {
            let cfg = engine.resolve()?;
            let trace = Trace::record(cfg, suite.into(), seed, steps)
                .with_context(|| format!("recording suite {:?} seed {}", suite, seed))?;
            trace
                .write_jsonl(&out)
                .with_context(|| format!("writing trace to {}", out.display()))?;
            println!(
                "recorded suite={} seed={} steps={} digest={} -> {}",
                trace.header.suite,
                seed,
                steps,
                trace.digest(),
                out.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        ParityCommand::Compare {
            reference,
            candidate,
            obs_atol,
            obs_rtol,
            reward_atol,
            reward_rtol,
            info_rel,
            allow_mismatch,
        } => {
            let r = Trace::read_jsonl(&reference)
                .with_context(|| format!("reading {}", reference.display()))?;
            let c = Trace::read_jsonl(&candidate)
                .with_context(|| format!("reading {}", candidate.display()))?;
            if r.header.suite != c.header.suite || r.header.seed != c.header.seed {
                bail!(
                    "traces describe different cases: suite {} seed {} vs suite {} seed {}",
                    r.header.suite,
                    r.header.seed,
                    c.header.suite,
                    c.header.seed
                );
            }
            let tol = Tolerances {
                obs_atol,
                obs_rtol,
                reward_atol,
                reward_rtol,
                info_rel,
            };
            match parity::compare(&r, &c, &tol)? {
                None => {
                    println!(
                        "PASS suite={} seed={} time_max={} steps={}",
                        r.header.suite,
                        r.header.seed,
                        r.header.time_max,
                        r.steps.len()
                    );
                    Ok(ExitCode::SUCCESS)
                }
                Some(m) => {
                    println!(
                        "FAIL suite={} seed={} time_max={} {}",
                        r.header.suite, r.header.seed, r.header.time_max, m
                    );
                    println!("{}", serde_json::to_string(&m)?);
                    if allow_mismatch {
                        Ok(ExitCode::SUCCESS)
                    } else {
                        Ok(ExitCode::FAILURE)
                    }
                }
            }
        }
        ParityCommand::SelfCheck {
            seeds,
            seed_start,
            steps,
            suite,
            time_max,
        } => {
            let suites: Vec<Suite> = if suite.is_empty() {
                Suite::ALL.to_vec()
            } else {
                suite.into_iter().map(Suite::from).collect()
            };
            let seed_values: Vec<u64> = (0..seeds).map(|i| seed_start + i).collect();

            let mut total = 0usize;
            let mut failed = 0usize;
            for t in time_max {
                let cfg = EngineConfig::short(t);
                cfg.validate().context("invalid --time-max")?;
                for case in parity::self_check(cfg, &suites, &seed_values, steps)? {
                    total += 1;
                    let status = if case.passed() { "PASS" } else { "FAIL" };
                    if !case.passed() {
                        failed += 1;
                    }
                    println!(
                        "{} suite={} seed={} time_max={} steps={} episodes={} deterministic={} batched={} digest={}",
                        status,
                        case.suite,
                        case.seed,
                        t,
                        steps,
                        case.episodes,
                        case.deterministic,
                        case.batched_equivalent,
                        case.digest
                    );
                }
            }
            println!("Completed {} self-check cases. Failed: {}.", total, failed);
            Ok(if failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn run_inspect(seed: u64) -> Result<ExitCode> {
    let mut rng = Pcg32::new(seed);
    let world = World::generate(&mut rng);
    println!("{}", serde_json::to_string_pretty(&world)?);
    Ok(ExitCode::SUCCESS)
}
