use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use serde_derive::Serialize;
use tracing::{debug, info, trace, warn};
use crate::chain::{Chain, ChainSet, Insertion};
use crate::commit::{commit_way, CommitError};
use crate::config::SolverConfig;
use crate::core::{Error, Index};
use crate::encoding::values_to_json;
use crate::grid::Grid;
use crate::linkage::Linkage;
use crate::rules::{standard_rules, successor_candidates, DeductionRule};
use crate::validate::is_valid;

/// The state of the solver. Each branch propagates until it is solved, hits
/// a contradiction, or stalls; a stalled branch forks into speculative
/// guesses. The whole solve ends Solved or Unsolvable.
#[derive(Debug, PartialEq, Clone, Copy, Eq, Serialize)]
pub enum SolverState {
    Propagating,
    Stalled,
    SpeculativeGuess,
    Solved,
    Unsolvable,
}

/// How propagation of a single branch ended.
#[derive(Debug, PartialEq, Clone, Copy, Eq)]
pub enum Propagation {
    Complete,
    Stalled,
    Contradiction,
}

/// One line of search: a grid, the chains known on it, and bookkeeping for
/// detecting when propagation stops making progress.
#[derive(Debug, Clone)]
pub struct Branch {
    pub grid: Grid,
    pub chains: ChainSet,
    pub depth: usize,
    pub iterations: usize,
    seen: HashSet<u64>,
    previous: Option<u64>,
}

impl Branch {
    pub fn root(grid: Grid) -> Self {
        Branch {
            grid,
            chains: ChainSet::new(),
            depth: 0,
            iterations: 0,
            seen: HashSet::new(),
            previous: None,
        }
    }

    // Deep copy for a speculative guess. Stall detection starts over.
    fn child(&self) -> Self {
        Branch {
            grid: self.grid.clone(),
            chains: self.chains.clone(),
            depth: self.depth + 1,
            iterations: 0,
            seen: HashSet::new(),
            previous: None,
        }
    }

    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.grid.values().hash(&mut hasher);
        self.chains.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SolveStats {
    pub iterations: usize,
    pub branches: usize,
    pub guesses: usize,
    pub max_depth: usize,
    pub invalid_chains: usize,
}

/// What the solver hands to a StepObserver after each step.
pub struct StepView<'b> {
    pub state: SolverState,
    pub branch: &'b Branch,
    pub stats: &'b SolveStats,
}

// Mostly for debugging purposes, a StepObserver allows the caller to dump or
// otherwise inspect the solver after each step without having to instrument
// the solving loop itself.
pub trait StepObserver {
    fn after_step(&mut self, step: &StepView);
    fn on_finish(&mut self, _state: SolverState, _stats: &SolveStats) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Solution {
    Solved(Grid),
    /// Every branch failed. Carries the root grid as far as propagation
    /// got, so partial progress can still be inspected.
    Unsolvable(Grid),
}

impl Solution {
    pub fn is_solved(&self) -> bool {
        matches!(self, Solution::Solved(_))
    }

    pub fn grid(&self) -> &Grid {
        match self {
            Solution::Solved(g) | Solution::Unsolvable(g) => g,
        }
    }

    pub fn into_grid(self) -> Grid {
        match self {
            Solution::Solved(g) | Solution::Unsolvable(g) => g,
        }
    }

    /// The value matrix, with None wherever nothing was resolved.
    pub fn values(&self) -> Vec<Vec<Option<u32>>> {
        self.grid().values()
    }

    pub fn to_json(&self) -> Result<String, Error> {
        values_to_json(&self.values())
    }
}

/// Propagation plus speculative search. Deduction rules run to a fixpoint on
/// each branch; stalled branches fork on the cell with the fewest successor
/// candidates, trying candidates nearest first.
pub struct Solver<'a> {
    root: Grid,
    config: SolverConfig,
    rules: Vec<Box<dyn DeductionRule>>,
    observer: Option<&'a mut dyn StepObserver>,
    invalid_chains: Vec<Chain>,
    stats: SolveStats,
    state: SolverState,
}

impl <'a> Solver<'a> {
    pub fn new(grid: Grid) -> Self {
        Self::with_config(grid, SolverConfig::default())
    }

    pub fn with_config(grid: Grid, config: SolverConfig) -> Self {
        Solver {
            root: grid,
            config,
            rules: standard_rules(),
            observer: None,
            invalid_chains: vec![],
            stats: SolveStats::default(),
            state: SolverState::Propagating,
        }
    }

    pub fn with_observer(mut self, observer: &'a mut dyn StepObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_rules(mut self, rules: Vec<Box<dyn DeductionRule>>) -> Self {
        self.rules = rules;
        self
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn stats(&self) -> &SolveStats {
        &self.stats
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Every chain that failed to commit during the last solve, on any
    /// branch. Cleared when a new solve starts.
    pub fn invalid_chains(&self) -> &[Chain] {
        &self.invalid_chains
    }

    fn notify(&mut self, branch: &Branch) {
        if let Some(observer) = &mut self.observer {
            observer.after_step(&StepView { state: self.state, branch, stats: &self.stats });
        }
    }

    fn finish(&mut self, state: SolverState) {
        self.state = state;
        if let Some(observer) = &mut self.observer {
            observer.on_finish(state, &self.stats);
        }
    }

    // One round of deduce, merge, and commit. Returns false when the branch
    // turned out to be contradictory.
    fn step(&mut self, branch: &mut Branch) -> Result<bool, Error> {
        let linkage = Linkage::new(&branch.grid, &branch.chains)?;
        let mut edges = vec![];
        for rule in &self.rules {
            for edge in rule.deduce(&branch.grid, &linkage)? {
                trace!(rule = rule.name(), from = ?edge.from, to = ?edge.to, "forced edge");
                edges.push(edge);
            }
        }
        for edge in edges {
            if let Insertion::Conflict(reason) = branch.chains.insert_edge(edge.from, edge.to) {
                debug!(from = ?edge.from, to = ?edge.to, %reason, depth = branch.depth, "edge contradicts known chains");
                return Ok(false);
            }
        }
        let mut i = 0;
        while let Some(chain) = branch.chains.get(i) {
            trace!(head = ?chain.head(), len = chain.len(), "commit");
            match commit_way(&mut branch.grid, chain) {
                Ok(()) => {
                    branch.chains.remove(i);
                },
                Err(CommitError::NoAnchor) => i += 1,
                Err(e) => {
                    let chain = branch.chains.remove(i);
                    debug!(head = ?chain.head(), len = chain.len(), reason = %e, depth = branch.depth, "chain cannot be committed");
                    self.invalid_chains.push(chain);
                    self.stats.invalid_chains += 1;
                    return Ok(false);
                },
            }
        }
        Ok(true)
    }

    fn propagate_branch(&mut self, branch: &mut Branch) -> Result<Propagation, Error> {
        self.state = SolverState::Propagating;
        loop {
            if branch.grid.is_complete() {
                return Ok(Propagation::Complete);
            }
            if branch.iterations >= self.config.max_iterations {
                warn!(iterations = branch.iterations, depth = branch.depth, "propagation iteration cap reached");
                return Ok(Propagation::Stalled);
            }
            branch.iterations += 1;
            self.stats.iterations += 1;
            if !self.step(branch)? {
                return Ok(Propagation::Contradiction);
            }
            self.notify(branch);
            if branch.grid.is_complete() {
                return Ok(Propagation::Complete);
            }
            let fingerprint = branch.fingerprint();
            if branch.previous == Some(fingerprint) {
                debug!(filled = branch.grid.filled(), chains = branch.chains.len(), "fixpoint");
                return Ok(Propagation::Stalled);
            }
            if !branch.seen.insert(fingerprint) {
                debug!(filled = branch.grid.filled(), "propagation cycle");
                return Ok(Propagation::Stalled);
            }
            branch.previous = Some(fingerprint);
        }
    }

    /// The cell with the fewest successor candidates (more than one), first
    /// found in row-major order on ties.
    pub fn choose_guess(&self, branch: &Branch) -> Result<Option<(Index, Vec<Index>)>, Error> {
        let linkage = Linkage::new(&branch.grid, &branch.chains)?;
        let mut best: Option<(Index, Vec<Index>)> = None;
        for cell in branch.grid.cells() {
            if !linkage.not_linking.get(cell.index)? {
                continue;
            }
            let candidates = successor_candidates(&branch.grid, &linkage, cell.index)?;
            if candidates.len() > 1 && best.as_ref().map_or(true, |(_, b)| candidates.len() < b.len()) {
                best = Some((cell.index, candidates));
            }
        }
        Ok(best)
    }

    /// Run deduction on the puzzle without guessing.
    pub fn propagate(&mut self) -> Result<Branch, Error> {
        self.stats = SolveStats::default();
        self.invalid_chains.clear();
        self.stats.branches = 1;
        let mut branch = Branch::root(self.root.clone());
        let state = match self.propagate_branch(&mut branch)? {
            Propagation::Complete if is_valid(&branch.grid) => SolverState::Solved,
            Propagation::Stalled => SolverState::Stalled,
            _ => SolverState::Unsolvable,
        };
        self.finish(state);
        Ok(branch)
    }

    pub fn solve(&mut self) -> Result<Solution, Error> {
        self.stats = SolveStats::default();
        self.invalid_chains.clear();
        let depth_limit = self.config.depth_limit(self.root.size() as usize);
        let mut stack = vec![Branch::root(self.root.clone())];
        let mut best: Option<Grid> = None;
        while let Some(mut branch) = stack.pop() {
            if self.stats.branches >= self.config.max_branches {
                warn!(branches = self.stats.branches, "branch budget exhausted");
                break;
            }
            self.stats.branches += 1;
            self.stats.max_depth = self.stats.max_depth.max(branch.depth);
            let outcome = self.propagate_branch(&mut branch)?;
            if best.is_none() {
                best = Some(branch.grid.clone());
            }
            match outcome {
                Propagation::Contradiction => {
                    debug!(depth = branch.depth, "branch failed");
                    continue;
                },
                Propagation::Complete => {
                    if is_valid(&branch.grid) {
                        self.state = SolverState::Solved;
                        self.notify(&branch);
                        info!(
                            solved = true,
                            iterations = self.stats.iterations,
                            branches = self.stats.branches,
                            guesses = self.stats.guesses,
                            "solve finished",
                        );
                        self.finish(SolverState::Solved);
                        return Ok(Solution::Solved(branch.grid));
                    }
                    debug!(depth = branch.depth, "complete grid failed validation");
                    continue;
                },
                Propagation::Stalled => {},
            }
            self.state = SolverState::Stalled;
            self.notify(&branch);
            if branch.depth >= depth_limit {
                warn!(depth = branch.depth, "speculative depth limit reached");
                continue;
            }
            let (cell, candidates) = match self.choose_guess(&branch)? {
                Some(guess) => guess,
                None => {
                    debug!(depth = branch.depth, "stalled with nothing to guess");
                    continue;
                },
            };
            self.state = SolverState::SpeculativeGuess;
            self.stats.guesses += 1;
            debug!(cell = ?cell, candidates = ?candidates, depth = branch.depth, "speculative guess");
            self.notify(&branch);
            // Pushed in reverse so the nearest candidate is explored first.
            for candidate in candidates.into_iter().rev() {
                let mut child = branch.child();
                match child.chains.insert_edge(cell, candidate) {
                    Insertion::Conflict(_) => continue,
                    _ => stack.push(child),
                }
            }
        }
        info!(
            solved = false,
            iterations = self.stats.iterations,
            branches = self.stats.branches,
            guesses = self.stats.guesses,
            "solve finished",
        );
        self.finish(SolverState::Unsolvable);
        Ok(Solution::Unsolvable(best.unwrap_or_else(|| self.root.clone())))
    }
}
