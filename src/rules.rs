use std::fmt::Debug;
use strum::IntoEnumIterator;
use crate::core::{Error, Index};
use crate::grid::Grid;
use crate::linkage::Linkage;
use crate::ray::{cast_ray, points_at, Direction};

/// An edge `from -> to` that every solution must contain: the value at `to`
/// is one more than the value at `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForcedEdge {
    pub from: Index,
    pub to: Index,
}

impl ForcedEdge {
    pub fn new(from: Index, to: Index) -> Self {
        ForcedEdge { from, to }
    }
}

/// Deduction rules inspect the grid (via a fresh Linkage snapshot) and
/// report edges that are forced. Rules never mutate anything; the solver
/// merges their output into the chain set and commits it.
///
/// A rule may report an edge that is already known, or even one that
/// contradicts the known chains on a bad speculative branch. Sorting that
/// out is the chain set's job, not the rule's.
pub trait DeductionRule where Self: Debug {
    fn name(&self) -> &'static str;
    fn deduce(&self, grid: &Grid, linkage: &Linkage) -> Result<Vec<ForcedEdge>, Error>;
}

/// Possible successors of `origin`, nearest first. A numbered origin facing
/// a cell that holds exactly the next value has that cell as its only
/// candidate. Cells that would close a loop with origin's own chain are
/// skipped.
pub fn successor_candidates(grid: &Grid, linkage: &Linkage, origin: Index) -> Result<Vec<Index>, Error> {
    let cell = grid.cell(origin)?;
    let direction = match cell.direction {
        Some(d) => d,
        None => return Ok(vec![]),
    };
    let loop_head = linkage.chains.loop_head(origin);
    let mut candidates = vec![];
    for p in cast_ray(grid, direction, origin)? {
        if !linkage.not_linked.get(p.index)? || loop_head == Some(p.index) {
            continue;
        }
        match (cell.value, p.value) {
            (Some(ov), Some(pv)) => {
                if pv == ov + 1 {
                    candidates = vec![p.index];
                    break;
                }
            },
            _ => candidates.push(p.index),
        }
    }
    Ok(candidates)
}

/// Possible predecessors of `target`: cells still needing a successor whose
/// arrow points at it.
pub fn predecessor_candidates(grid: &Grid, linkage: &Linkage, target: Index) -> Result<Vec<Index>, Error> {
    let value = grid.value(target)?;
    let loop_tail = linkage.chains.loop_tail(target);
    let mut candidates = vec![];
    for d in Direction::iter() {
        for p in cast_ray(grid, d, target)? {
            if p.direction != Some(d.opposite()) || !linkage.not_linking.get(p.index)? {
                continue;
            }
            if loop_tail == Some(p.index) {
                continue;
            }
            if let (Some(tv), Some(pv)) = (value, p.value) {
                if pv + 1 != tv {
                    continue;
                }
            }
            candidates.push(p.index);
        }
    }
    Ok(candidates)
}

/// A cell that still needs a successor and has exactly one place to go.
#[derive(Debug)]
pub struct OnlyOneMove;

impl DeductionRule for OnlyOneMove {
    fn name(&self) -> &'static str { "OnlyOneMove" }

    fn deduce(&self, grid: &Grid, linkage: &Linkage) -> Result<Vec<ForcedEdge>, Error> {
        let mut edges = vec![];
        for cell in grid.cells() {
            if !linkage.not_linking.get(cell.index)? {
                continue;
            }
            if let [only] = successor_candidates(grid, linkage, cell.index)?[..] {
                edges.push(ForcedEdge::new(cell.index, only));
            }
        }
        Ok(edges)
    }
}

/// A cell that still needs a predecessor and is pointed at by exactly one
/// eligible cell.
#[derive(Debug)]
pub struct OnlyOneLinking;

impl DeductionRule for OnlyOneLinking {
    fn name(&self) -> &'static str { "OnlyOneLinking" }

    fn deduce(&self, grid: &Grid, linkage: &Linkage) -> Result<Vec<ForcedEdge>, Error> {
        let mut edges = vec![];
        for cell in grid.cells() {
            if !linkage.not_linked.get(cell.index)? {
                continue;
            }
            if let [only] = predecessor_candidates(grid, linkage, cell.index)?[..] {
                edges.push(ForcedEdge::new(only, cell.index));
            }
        }
        Ok(edges)
    }
}

/// Values v and v+2 are placed but v+1 is not. If exactly one free cell on
/// v's ray also points at v+2, it must hold v+1.
#[derive(Debug)]
pub struct SingleGapBridge;

impl DeductionRule for SingleGapBridge {
    fn name(&self) -> &'static str { "SingleGapBridge" }

    fn deduce(&self, grid: &Grid, linkage: &Linkage) -> Result<Vec<ForcedEdge>, Error> {
        let mut edges = vec![];
        for a in grid.cells() {
            let (v, direction) = match (a.value, a.direction) {
                (Some(v), Some(d)) => (v, d),
                _ => continue,
            };
            if linkage.holder(v + 1).is_some() {
                continue;
            }
            let c = match linkage.holder(v + 2) {
                Some(c) => c,
                None => continue,
            };
            if !linkage.not_linking.get(a.index)? || !linkage.not_linked.get(c)? {
                continue;
            }
            let mut bridges = vec![];
            for b in cast_ray(grid, direction, a.index)? {
                if b.value.is_some()
                    || !linkage.not_linking.get(b.index)?
                    || !linkage.not_linked.get(b.index)? {
                    continue;
                }
                if points_at(grid, b.index, c)? {
                    bridges.push(b.index);
                }
            }
            if let [b] = bridges[..] {
                edges.push(ForcedEdge::new(a.index, b));
                edges.push(ForcedEdge::new(b, c));
            }
        }
        Ok(edges)
    }
}

/// The rules run on every propagation step, in order.
pub fn standard_rules() -> Vec<Box<dyn DeductionRule>> {
    vec_box::vec_box![OnlyOneMove, OnlyOneLinking, SingleGapBridge]
}

#[cfg(test)]
mod test {
    use crate::chain::{Chain, ChainSet};
    use crate::grid::test_util::*;
    use super::*;

    fn run(rule: &dyn DeductionRule, grid: &Grid, chains: &ChainSet) -> Result<Vec<ForcedEdge>, Error> {
        let linkage = Linkage::new(grid, chains)?;
        rule.deduce(grid, &linkage)
    }

    fn edge(from: Index, to: Index) -> ForcedEdge {
        ForcedEdge::new(from, to)
    }

    #[test]
    fn test_only_one_move() -> Result<(), Error> {
        let grid = parse("3x1:1cc3a");
        let edges = run(&OnlyOneMove, &grid, &ChainSet::new())?;
        assert_eq!(edges, vec![edge([0, 0], [0, 1]), edge([0, 1], [0, 2])]);
        Ok(())
    }

    #[test]
    fn test_only_one_move_ambiguous() -> Result<(), Error> {
        // 1 at the top-left points SE at two free cells and at 16.
        let grid = board_4x4_one();
        let linkage = Linkage::new(&grid, &ChainSet::new())?;
        assert_eq!(successor_candidates(&grid, &linkage, [0, 0])?, vec![[1, 1], [2, 2]]);
        let edges = OnlyOneMove.deduce(&grid, &linkage)?;
        assert!(edges.iter().all(|e| e.from != [0, 0]));
        Ok(())
    }

    #[test]
    fn test_only_one_linking() -> Result<(), Error> {
        let grid = parse("3x1:1cc3a");
        let edges = run(&OnlyOneLinking, &grid, &ChainSet::new())?;
        assert_eq!(edges, vec![edge([0, 0], [0, 1]), edge([0, 1], [0, 2])]);
        Ok(())
    }

    #[test]
    fn test_single_gap_bridge() -> Result<(), Error> {
        let grid = parse("3x1:1cc3a");
        let edges = run(&SingleGapBridge, &grid, &ChainSet::new())?;
        assert_eq!(edges, vec![edge([0, 0], [0, 1]), edge([0, 1], [0, 2])]);
        Ok(())
    }

    #[test]
    fn test_single_gap_bridge_needs_unique_middle() -> Result<(), Error> {
        // Both free cells point east at 3, so neither is forced to be 2.
        let grid = parse("4x1:1ccc3a");
        assert!(run(&SingleGapBridge, &grid, &ChainSet::new())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_candidates_skip_loops() -> Result<(), Error> {
        let grid = parse("3x1:cgg");
        let chains = ChainSet::from_chains(vec![Chain::new(vec![[0, 0], [0, 1]])?]);
        let linkage = Linkage::new(&grid, &chains)?;
        assert!(successor_candidates(&grid, &linkage, [0, 1])?.is_empty());
        assert_eq!(predecessor_candidates(&grid, &linkage, [0, 0])?, vec![[0, 2]]);
        Ok(())
    }

    #[test]
    fn test_predecessors_respect_values() -> Result<(), Error> {
        // 3 sits east of both 1 and an unnumbered cell; only the latter can
        // precede it.
        let grid = parse("3x1:1cc3a");
        let linkage = Linkage::new(&grid, &ChainSet::new())?;
        assert_eq!(predecessor_candidates(&grid, &linkage, [0, 2])?, vec![[0, 1]]);
        Ok(())
    }

    #[test]
    fn test_standard_rules_order() {
        let names: Vec<&str> = standard_rules().iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["OnlyOneMove", "OnlyOneLinking", "SingleGapBridge"]);
    }
}
