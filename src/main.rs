use clap::{Parser, Subcommand};
use log::{debug, info};
use std::io;
use std::process::ExitCode;

mod channel;
mod error;
mod graph;
mod parser;
mod search;
mod signal;

use channel::{ChannelNames, Consumer, DEFAULT_NAMESPACE, Producer};
use error::Error;
use search::{
    GeneratorConfig, GeneratorReport, LaunchConfig, SupervisorConfig, SupervisorReport,
    run_generator, run_solve, run_supervisor,
};
use signal::StopFlag;

// --- Command Line Arguments ---

#[derive(Parser)]
#[command(name = "threecolor")]
#[command(about = "threecolor - randomized 3-coloring over a shared-memory ring")]
#[command(version)]
#[command(subcommand_required = true)]
#[command(arg_required_else_help = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the ring and report the best colorings generators find
    Supervisor {
        /// Namespace for the shared memory and semaphore names
        #[arg(long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
        /// Stop after reading this many candidates
        #[arg(long)]
        limit: Option<u64>,
        /// Print run statistics to stderr on exit
        #[arg(long, short)]
        verbose: bool,
    },
    /// Attach to a running supervisor and feed it random colorings
    Generator {
        /// Edges of the graph, written FROM-TO (e.g. 0-1 1-2 2-0)
        #[arg(required = true, value_name = "EDGE")]
        edges: Vec<String>,
        /// Namespace for the shared memory and semaphore names
        #[arg(long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,
        /// Stop after writing this many candidates
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Run a supervisor together with its own generator processes
    Solve {
        /// Edges of the graph, written FROM-TO (e.g. 0-1 1-2 2-0)
        #[arg(required = true, value_name = "EDGE")]
        edges: Vec<String>,
        /// Number of generator processes (default: number of CPUs)
        #[arg(long, short = 'j')]
        generators: Option<usize>,
        /// Namespace for the shared memory and semaphore names
        #[arg(long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
        /// Base random seed; generator i uses seed + i
        #[arg(long)]
        seed: Option<u64>,
        /// Stop after reading this many candidates
        #[arg(long)]
        limit: Option<u64>,
        /// Print run statistics to stderr on exit
        #[arg(long, short)]
        verbose: bool,
    },
}

// --- Entry Points ---

fn supervise(
    names: &ChannelNames,
    config: &SupervisorConfig,
    stop: &StopFlag,
) -> Result<SupervisorReport, Error> {
    let mut consumer = Consumer::create(names)?;
    let stdout = io::stdout();
    let result = run_supervisor(&mut consumer, config, stop, &mut stdout.lock());
    // Tear down even if the loop failed; the loop's error wins.
    let closed = consumer.close();
    let report = result?;
    closed?;
    Ok(report)
}

fn generate(
    names: &ChannelNames,
    edges: &[String],
    config: &GeneratorConfig,
    stop: &StopFlag,
) -> Result<GeneratorReport, Error> {
    let graph = parser::parse_graph(edges)?;
    let producer = Producer::attach(names)?;
    let result = run_generator(&producer, &graph, config, stop);
    let closed = producer.close();
    let report = result?;
    closed?;
    Ok(report)
}

fn solve(edges: &[String], config: &LaunchConfig, stop: &StopFlag) -> Result<SupervisorReport, Error> {
    let graph = parser::parse_graph(edges)?;
    let exe = std::env::current_exe().map_err(Error::CurrentExe)?;
    let stdout = io::stdout();
    run_solve(&exe, &graph, config, stop, &mut stdout.lock())
}

/// Print supervisor statistics
fn print_supervisor_report(report: &SupervisorReport) {
    eprintln!("\nSupervisor Statistics:");
    eprintln!("  Outcome: {}", report.outcome);
    eprintln!("  Elapsed time: {:?}", report.elapsed_time);
    eprintln!("  Candidates consumed: {}", report.candidates_consumed);
    eprintln!("  Improvements found: {}", report.improvements);
    if let Some(best) = &report.best {
        eprintln!("  Best conflicts: {}", best.len());
    }
}

fn run(args: Args) -> Result<(), Error> {
    signal::install_handlers().map_err(Error::Signal)?;
    let stop = StopFlag::from_signals();

    match args.command {
        Commands::Supervisor {
            namespace,
            limit,
            verbose,
        } => {
            let names = ChannelNames::new(&namespace)?;
            let config = SupervisorConfig::default().with_limit_option(limit);
            let report = supervise(&names, &config, &stop)?;
            if verbose {
                print_supervisor_report(&report);
            }
        }
        Commands::Generator {
            edges,
            namespace,
            seed,
            limit,
        } => {
            let names = ChannelNames::new(&namespace)?;
            let config = GeneratorConfig::default()
                .with_seed_option(seed)
                .with_limit_option(limit);
            let report = generate(&names, &edges, &config, &stop)?;
            info!(
                "generator {:?}: emitted {} candidates in {:?}, fewest conflicts {:?}",
                report.exit, report.candidates_emitted, report.elapsed_time, report.fewest_conflicts
            );
        }
        Commands::Solve {
            edges,
            generators,
            namespace,
            seed,
            limit,
            verbose,
        } => {
            let mut config = LaunchConfig::default()
                .with_names(ChannelNames::new(&namespace)?)
                .with_seed_option(seed)
                .with_supervisor(SupervisorConfig::default().with_limit_option(limit));
            if let Some(n) = generators {
                config = config.with_generators(n);
            }
            debug!("launching {} generators", config.generators);
            let report = solve(&edges, &config, &stop)?;
            if verbose {
                print_supervisor_report(&report);
            }
        }
    }
    Ok(())
}

// --- Main Function ---
fn main() -> ExitCode {
    let env = env_logger::Env::new()
        .filter("THREECOLOR_LOG")
        .write_style("THREECOLOR_LOG_STYLE");
    env_logger::init_from_env(env);

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", env!("CARGO_PKG_NAME"), e);
            ExitCode::FAILURE
        }
    }
}
