use std::fs;
use std::time::Duration;
use clap::Parser;
use color_eyre::eyre::{self, bail, WrapErr};
use signpost_dfs::config::SolverConfig;
use signpost_dfs::debug::{DbgObserver, Sample};
use signpost_dfs::encoding::values_to_json;
use signpost_dfs::grid::Grid;
use signpost_dfs::solver::Solver;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Solve a Signpost puzzle.
#[derive(Parser, Debug)]
#[command(name = "signpost", version)]
struct Args {
    /// Game ID such as 4x4:1defedgbheachbba16a, or a JSON matrix of
    /// [value, direction] pairs.
    puzzle: String,

    /// JSON file with solver limits.
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    max_iterations: Option<usize>,

    #[arg(long)]
    max_depth: Option<usize>,

    /// Only run deduction; never guess.
    #[arg(long)]
    propagate_only: bool,

    /// Write a JSON report of the solve to this file.
    #[arg(long)]
    stats: Option<String>,

    /// With --verbose, log a solver step at most this often instead of
    /// logging every step.
    #[arg(long)]
    progress_secs: Option<f64>,

    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> eyre::Result<SolverConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .wrap_err_with(|| format!("reading config {}", path))?;
            SolverConfig::from_json(&text)?
        },
        None => SolverConfig::default(),
    };
    if let Some(n) = args.max_iterations {
        config.max_iterations = n;
    }
    if args.max_depth.is_some() {
        config.max_depth = args.max_depth;
    }
    Ok(config)
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

    let config = load_config(&args)?;
    let grid: Grid = args.puzzle.parse().wrap_err("parsing puzzle")?;
    print!("{}", grid);

    let mut observer = DbgObserver::new();
    let sample = match (args.verbose, args.progress_secs) {
        (false, _) => Sample::at_end(),
        (true, None) => Sample::every_n(1),
        (true, Some(secs)) => {
            let every = Duration::try_from_secs_f64(secs)
                .wrap_err_with(|| format!("bad --progress-secs {}", secs))?;
            Sample::time(every)
        },
    };
    observer.sample_print(sample);
    if let Some(path) = &args.stats {
        observer.stats_to(path.as_str());
    }
    let mut solver = Solver::with_config(grid, config).with_observer(&mut observer);

    if args.propagate_only {
        let branch = solver.propagate()?;
        println!("{:?}", solver.state());
        print!("{}", branch.grid);
        println!("{}", values_to_json(&branch.grid.values())?);
        return Ok(());
    }

    let solution = solver.solve()?;
    println!("{}", serde_json::to_string(solver.stats())?);
    let solved = solution.is_solved();
    let json = solution.to_json()?;
    let grid = solution.into_grid();
    println!("{}", if solved { "Solved" } else { "Unsolvable" });
    print!("{}", grid);
    println!("{}", json);
    if !solved {
        bail!("no solution found");
    }
    Ok(())
}
