use std::{collections::BTreeMap, fs};
use clap::Parser;
use color_eyre::eyre::{self, WrapErr};
use signpost_dfs::bench::{diff_results, random_path_puzzle, Bench};
use signpost_dfs::core::Error;
use signpost_dfs::solver::Solver;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

const UNSOLVED: Error = Error::internal_const("random puzzle was not solved");

/// Time the solver on seeded random puzzles.
#[derive(Parser, Debug)]
#[command(name = "bench-signpost")]
struct Args {
    #[arg(long, default_value = "stats/bench-signpost.json")]
    output: String,

    /// Earlier results to print a difference against.
    #[arg(long)]
    baseline: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    let mut bench = Bench::new();
    bench.benchmark(200, "generate_6x6", |rng| {
        random_path_puzzle(rng, 6, 6, 0.2)?;
        Ok(())
    })?;
    let sizes = [(3, 3), (4, 4), (5, 4), (5, 5)];
    bench.benchmark_cases(20, &sizes, "propagate_random", |&(rows, cols), rng| {
        let (grid, _) = random_path_puzzle(rng, rows, cols, 0.25)?;
        Solver::new(grid).propagate()?;
        Ok(())
    })?;
    bench.benchmark_cases(20, &sizes, "solve_random", |&(rows, cols), rng| {
        let (grid, _) = random_path_puzzle(rng, rows, cols, 0.15)?;
        if !Solver::new(grid).solve()?.is_solved() {
            return Err(UNSOLVED);
        }
        Ok(())
    })?;

    if let Some(dir) = std::path::Path::new(&args.output).parent() {
        fs::create_dir_all(dir)?;
    }
    bench.save_json(&args.output).wrap_err_with(|| format!("writing {}", args.output))?;

    let results = bench.into_results();
    if let Some(path) = &args.baseline {
        let text = fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path))?;
        let baseline: BTreeMap<String, f64> = if text.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&text)?
        };
        println!("{}", serde_json::to_string_pretty(&diff_results(&baseline, &results))?);
    } else {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}
