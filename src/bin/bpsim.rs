//! Command line front end: error rate simulations and code utilities

use anyhow::{bail, Context};
use bpsim::{
    AlphaStableNoise, BeliefPropagationDecoder, Modulation, NoiseModel, Simulation,
    SimulationConfig, TannerGraph,
};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Belief propagation LDPC decoder simulations
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Opts {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Estimate bit and word error rates over a list of noise levels
    Simulate(SimulateArgs),
    /// Print a random regular code in the description format
    Generate {
        /// Code length
        #[arg(long)]
        length: usize,
        /// Checks per variable
        #[arg(long, default_value_t = 3)]
        column_weight: usize,
        /// Variables per check
        #[arg(long, default_value_t = 6)]
        row_weight: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Print the dimensions of a code
    Info {
        /// Parity-check description file
        #[arg(long)]
        code: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct SimulateArgs {
    /// Parity-check description file
    #[arg(long)]
    code: PathBuf,

    /// Number of amplitude levels: 2, 4 or 8
    #[arg(long, default_value_t = 2)]
    modulation: usize,

    /// Alpha-stable noise exponent; Gaussian noise when absent
    #[arg(long)]
    alpha: Option<f64>,

    /// Eb/N0 values in dB (Gaussian) or noise scales (alpha-stable)
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
    levels: Vec<f64>,

    #[arg(long, default_value_t = bpsim::cs::ecc::DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    #[arg(long, default_value_t = 1000)]
    min_bit_errors: usize,

    #[arg(long, default_value_t = 100)]
    min_word_errors: usize,

    #[arg(long, default_value_t = 10_000_000)]
    max_words: usize,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Parallel workers, defaults to the number of CPUs
    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match opts.command {
        Command::Simulate(args) => simulate(args),
        Command::Generate {
            length,
            column_weight,
            row_weight,
            seed,
        } => {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let graph = TannerGraph::regular(length, column_weight, row_weight, &mut rng)?;
            print!("{}", graph);
            Ok(())
        }
        Command::Info { code } => {
            let graph = load(&code)?;
            println!("length {}", graph.length());
            println!("checks {}", graph.nchecks());
            println!("edges  {}", graph.nedges());
            println!("rate   {:.6}", graph.rate());
            Ok(())
        }
    }
}

fn load(path: &Path) -> anyhow::Result<TannerGraph> {
    TannerGraph::from_path(path).with_context(|| format!("loading code {}", path.display()))
}

fn simulate(args: SimulateArgs) -> anyhow::Result<()> {
    let graph = load(&args.code)?;
    let modulation = Modulation::from_order(args.modulation)?;
    let noise = match args.alpha {
        Some(alpha) => NoiseModel::AlphaStable(Arc::new(AlphaStableNoise::new(alpha)?)),
        None => NoiseModel::Gaussian,
    };

    let mut config = SimulationConfig::default()
        .with_max_iterations(args.max_iterations)
        .with_min_errors(args.min_bit_errors, args.min_word_errors)
        .with_max_words(args.max_words)
        .with_seed(args.seed);
    if let Some(workers) = args.workers {
        if workers == 0 {
            bail!("--workers must be positive");
        }
        config = config.with_workers(workers);
    }

    println!("# code       {}", args.code.display());
    println!(
        "# length {}, checks {}, rate {:.6}",
        graph.length(),
        graph.nchecks(),
        graph.rate()
    );
    println!("# modulation {}-level", modulation.order());
    println!("# noise      {}", noise);
    println!(
        "# iterations {}, min bit errors {}, min word errors {}, seed {}",
        config.max_iterations, config.min_bit_errors, config.min_word_errors, config.seed
    );
    println!(
        "# {:>6} {:>12} {:>12} {:>8} {:>10} {:>10} {:>8}",
        "level", "ber", "fer", "iters", "words", "biterrs", "worderrs"
    );

    let simulation = Simulation::new(
        BeliefPropagationDecoder::new(graph),
        modulation,
        noise,
        config,
    )?;
    for &level in &args.levels {
        let result = simulation.run_point(level)?;
        println!("{}", result);
    }
    Ok(())
}
