use std::{collections::{BTreeMap, BTreeSet}, fs::File, time::Instant};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use strum::IntoEnumIterator;
use tracing::info;
use crate::core::{all_indices, Error, Index};
use crate::grid::Grid;
use crate::ray::{Direction, Ray};

pub struct Bench {
    results: BTreeMap<String, f64>,
    rng: ChaCha20Rng,
}

const SEED: u64 = 0x51637a0b2e4d9c15;

impl Bench {
    pub fn new() -> Self {
        Self::with_seed(SEED)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            results: BTreeMap::new(),
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    pub fn benchmark<F: FnMut(&mut ChaCha20Rng) -> Result<(), Error>>(&mut self, n: usize, name: &str, mut f: F) -> Result<(), Error> {
        let start = Instant::now();
        for _ in 0..n {
            f(&mut self.rng)?;
        }
        let duration = start.elapsed();
        info!(bench = name, seconds = duration.as_secs_f64(), runs = n, "benchmark");
        self.results.insert(name.into(), duration.as_secs_f64());
        Ok(())
    }

    pub fn benchmark_cases<T, F: FnMut(&T, &mut ChaCha20Rng) -> Result<(), Error>>(&mut self, n: usize, cases: &[T], name: &str, mut f: F) -> Result<(), Error> {
        let start = Instant::now();
        for _ in 0..n {
            for case in cases {
                f(case, &mut self.rng)?;
            }
        }
        let duration = start.elapsed();
        info!(bench = name, seconds = duration.as_secs_f64(), runs = n * cases.len(), "benchmark");
        self.results.insert(name.into(), duration.as_secs_f64());
        Ok(())
    }

    pub fn into_results(self) -> BTreeMap<String, f64> {
        self.results
    }

    pub fn save_json(&self, filename: &str) -> Result<(), std::io::Error> {
        serde_json::to_writer_pretty(File::create(filename)?, &self.results)?;
        Ok(())
    }
}

/// Per-benchmark change in seconds from `baseline` to `current`. A name
/// missing on either side counts as zero there.
pub fn diff_results(
    baseline: &BTreeMap<String, f64>, current: &BTreeMap<String, f64>,
) -> BTreeMap<String, f64> {
    let names: BTreeSet<&String> = baseline.keys().chain(current.keys()).collect();
    names
        .into_iter()
        .map(|name| {
            let before = baseline.get(name).copied().unwrap_or(0.0);
            let after = current.get(name).copied().unwrap_or(0.0);
            (name.clone(), after - before)
        })
        .collect()
}

const PATH_ATTEMPTS: usize = 200;
const PATH_BUDGET: usize = 20_000;
const PATH_FANOUT: usize = 3;

fn direction_between(from: Index, to: Index) -> Option<Direction> {
    let dr = to[0] as isize - from[0] as isize;
    let dc = to[1] as isize - from[1] as isize;
    Direction::iter().find(|d| d.reaches(dr, dc))
}

fn queen_moves(from: Index, rows: usize, cols: usize) -> Vec<Index> {
    Direction::iter().flat_map(|d| Ray::new(from, d, rows, cols)).collect()
}

fn extend_path<R: Rng>(
    rng: &mut R, rows: usize, cols: usize, path: &mut Vec<Index>, used: &mut Vec<bool>, budget: &mut usize,
) -> bool {
    if path.len() == rows * cols {
        return true;
    }
    if *budget == 0 {
        return false;
    }
    *budget -= 1;
    let last = path[path.len() - 1];
    let mut next: Vec<Index> = queen_moves(last, rows, cols)
        .into_iter()
        .filter(|i| !used[i[0] * cols + i[1]])
        .collect();
    next.shuffle(rng);
    for i in next.into_iter().take(PATH_FANOUT) {
        path.push(i);
        used[i[0] * cols + i[1]] = true;
        if extend_path(rng, rows, cols, path, used, budget) {
            return true;
        }
        used[i[0] * cols + i[1]] = false;
        path.pop();
    }
    false
}

/// A random path visiting every cell, each step moving like a chess queen.
pub fn random_path<R: Rng>(rng: &mut R, rows: usize, cols: usize) -> Result<Vec<Index>, Error> {
    let cells: Vec<Index> = all_indices(rows, cols).collect();
    for _ in 0..PATH_ATTEMPTS {
        let start = cells[rng.random_range(0..cells.len())];
        let mut path = vec![start];
        let mut used = vec![false; rows * cols];
        used[start[0] * cols + start[1]] = true;
        let mut budget = PATH_BUDGET;
        if extend_path(rng, rows, cols, &mut path, &mut used, &mut budget) {
            return Ok(path);
        }
    }
    Err(Error::internal(format!("no random path found for {}x{}", cols, rows)))
}

/// Build a puzzle from a random path. The first and last cells are always
/// numbered; every other cell is numbered with probability `given_ratio`.
/// Returns the puzzle and the value matrix of the path it was built from.
pub fn random_path_puzzle<R: Rng>(
    rng: &mut R, rows: usize, cols: usize, given_ratio: f64,
) -> Result<(Grid, Vec<Vec<u32>>), Error> {
    if rows == 0 || cols == 0 {
        return Err(Error::malformed_const("puzzle must have at least one cell"));
    }
    let path = random_path(rng, rows, cols)?;
    let n = path.len();
    let mut cells = vec![(None, Some(Direction::N)); n];
    let mut solution = vec![vec![0; cols]; rows];
    for (k, at) in path.iter().enumerate() {
        let value = k as u32 + 1;
        solution[at[0]][at[1]] = value;
        let slot = &mut cells[at[0] * cols + at[1]];
        if let Some(to) = path.get(k + 1) {
            slot.1 = Some(direction_between(*at, *to)
                .ok_or_else(|| Error::internal_const("path step is not a queen move"))?);
        }
        if k == 0 || k + 1 == n || rng.random_bool(given_ratio) {
            slot.0 = Some(value);
        }
    }
    Ok((Grid::new(rows, cols, cells)?, solution))
}
