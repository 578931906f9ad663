//! CLI entry point for the conquest loot simulator

use clap::{Parser, Subcommand, ValueEnum};
use conquest_sim::{
    best_stage_per_item, compute_efficiency,
    config::DatasetConfig,
    interactive::run_interactive,
    report::{render_best_stages, render_simulation, render_trials},
    simulation::{runs_for_stamina, run_trials, simulate_stage, FastRng, TrialOptions},
    Dataset, Result,
};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "conquest-sim")]
#[command(version = "1.0")]
#[command(
    about = "Drop-rate EV analyzer and loot simulator for conquest stages",
    long_about = None
)]
struct Args {
    /// Drop table file (YAML or JSON); the built-in table is used when omitted
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    output: OutputFormat,

    /// Random seed; drawn from entropy when omitted
    #[arg(short, long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the most stamina-efficient stage for every item
    Best,
    /// Simulate clears of one stage
    Simulate(SimulateOptions),
    /// Print the best-stage table, then prompt for simulations (default)
    Interactive,
}

#[derive(clap::Args, Debug)]
struct SimulateOptions {
    /// Boss name
    #[arg(short, long)]
    boss: String,

    /// Difficulty name
    #[arg(short, long)]
    difficulty: String,

    /// Number of clears
    #[arg(short, long, conflicts_with = "stamina", required_unless_present = "stamina")]
    runs: Option<u64>,

    /// Stamina budget; spent on as many whole clears as it covers
    #[arg(long)]
    stamina: Option<u64>,

    /// Repeat the simulation and report per-item spread
    #[arg(short = 'n', long)]
    trials: Option<usize>,

    /// Run trials in parallel
    #[arg(short, long, default_value = "false")]
    parallel: bool,

    /// Worker threads for parallel trials
    #[arg(long)]
    threads: Option<usize>,

    /// Show timing information
    #[arg(short, long, default_value = "false")]
    timing: bool,
}

fn load_dataset(path: Option<&Path>) -> Result<Dataset> {
    let config = match path {
        Some(path) => {
            log::info!("loading drop table from {}", path.display());
            DatasetConfig::from_file(path)?
        }
        None => DatasetConfig::builtin()?,
    };
    Dataset::from_config(&config)
}

fn print_best(dataset: &Dataset, output: &OutputFormat) -> Result<()> {
    let table = compute_efficiency(&dataset.stages);
    let best = best_stage_per_item(&table);
    match output {
        OutputFormat::Text => print!("{}", render_best_stages(&best)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&best)?),
    }
    Ok(())
}

fn run_simulate(
    dataset: &Dataset,
    output: &OutputFormat,
    seed: u64,
    opts: &SimulateOptions,
) -> Result<()> {
    let stage = dataset.stage(&opts.boss, &opts.difficulty)?;
    let runs = match opts.runs {
        Some(runs) => runs,
        None => runs_for_stamina(stage, opts.stamina.unwrap_or(0))?,
    };

    let start = Instant::now();
    match opts.trials {
        Some(trials) => {
            let options = TrialOptions {
                trials,
                parallel: opts.parallel,
                threads: opts.threads,
                seed,
            };
            let stats = run_trials(stage, runs, &options)?;
            match output {
                OutputFormat::Text => print!("{}", render_trials(&stats)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
            }
        }
        None => {
            let outcome = simulate_stage(stage, runs, &mut FastRng::new(seed))?;
            match output {
                OutputFormat::Text => print!("{}", render_simulation(&outcome)),
                OutputFormat::Json => {
                    let json = serde_json::json!({
                        "stage": outcome.stage.to_string(),
                        "seed": seed,
                        "runs": outcome.runs,
                        "stamina_spent": outcome.stamina_spent,
                        "loot": outcome.loot,
                    });
                    println!("{}", serde_json::to_string_pretty(&json)?);
                }
            }
        }
    }
    let elapsed = start.elapsed();

    if opts.timing {
        println!();
        println!("--- Performance ---");
        println!("Total time: {:.3}s", elapsed.as_secs_f64());
        println!("Seed: {}", seed);
    }
    Ok(())
}

/// The prompt loop is text only; JSON would be interleaved with prompts
fn check_output(command: &Command, output: &OutputFormat) -> std::result::Result<(), String> {
    match (command, output) {
        (Command::Interactive, OutputFormat::Json) => {
            Err("--output json is not supported in interactive mode".to_string())
        }
        _ => Ok(()),
    }
}

fn run_session(dataset: &Dataset, seed: u64) -> Result<()> {
    print_best(dataset, &OutputFormat::Text)?;
    println!();

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();
    run_interactive(dataset, &mut input, &mut stdout, &mut FastRng::new(seed))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let command = args.command.unwrap_or(Command::Interactive);
    if let Err(message) = check_output(&command, &args.output) {
        eprintln!("Error: {}", message);
        std::process::exit(2);
    }

    let dataset = match load_dataset(args.data.as_deref()) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error loading drop table: {}", e);
            std::process::exit(1);
        }
    };
    let seed = args.seed.unwrap_or_else(rand::random);
    log::debug!("seed {seed}");

    let result = match &command {
        Command::Best => print_best(&dataset, &args.output),
        Command::Simulate(opts) => run_simulate(&dataset, &args.output, seed, opts),
        Command::Interactive => run_session(&dataset, seed),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
