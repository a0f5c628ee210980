use std::collections::HashMap;
use thiserror::Error;
use crate::core::{Error, Index};

/// A path fragment whose edges are known but whose values are not yet
/// written to the grid. Always holds at least two cells.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chain(Vec<Index>);

const SHORT_CHAIN: Error = Error::internal_const("a chain needs at least two cells");

impl Chain {
    pub fn new(cells: Vec<Index>) -> Result<Self, Error> {
        if cells.len() < 2 {
            return Err(SHORT_CHAIN);
        }
        Ok(Chain(cells))
    }

    pub fn edge(from: Index, to: Index) -> Self {
        Chain(vec![from, to])
    }

    pub fn head(&self) -> Index {
        self.0[0]
    }

    pub fn tail(&self) -> Index {
        self.0[self.0.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn cells(&self) -> &[Index] {
        &self.0
    }

    pub fn contains_edge(&self, from: Index, to: Index) -> bool {
        self.0.windows(2).any(|w| w[0] == from && w[1] == to)
    }

    // Append `other`, whose head must equal our tail.
    fn splice(&mut self, other: Chain) {
        self.0.extend(other.0.into_iter().skip(1));
    }
}

/// Why an edge cannot be added to the current chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChainConflict {
    #[error("source cell already has a different successor")]
    SuccessorTaken,
    #[error("target cell already has a predecessor")]
    PredecessorTaken,
    #[error("edge from a cell to itself")]
    SelfLoop,
    #[error("edge would close a cycle")]
    ClosesCycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Added,
    Duplicate,
    Conflict(ChainConflict),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainPos {
    pub chain: usize,
    pub offset: usize,
    pub len: usize,
}

/// Lookup from cell to its place in the chain set, rebuilt on demand.
#[derive(Debug, Clone)]
pub struct ChainIndex {
    positions: HashMap<Index, ChainPos>,
    ends: Vec<(Index, Index)>,
}

impl ChainIndex {
    pub fn get(&self, index: Index) -> Option<ChainPos> {
        self.positions.get(&index).copied()
    }

    pub fn has_successor(&self, index: Index) -> bool {
        self.get(index).map_or(false, |p| p.offset + 1 < p.len)
    }

    pub fn has_predecessor(&self, index: Index) -> bool {
        self.get(index).map_or(false, |p| p.offset > 0)
    }

    /// If `index` ends a chain, the cell that chain starts from. Linking
    /// the tail back to it would make a loop.
    pub fn loop_head(&self, index: Index) -> Option<Index> {
        let p = self.get(index)?;
        if p.offset + 1 == p.len {
            Some(self.ends[p.chain].0)
        } else {
            None
        }
    }

    /// If `index` starts a chain, the cell that chain ends at.
    pub fn loop_tail(&self, index: Index) -> Option<Index> {
        let p = self.get(index)?;
        if p.offset == 0 {
            Some(self.ends[p.chain].1)
        } else {
            None
        }
    }
}

/// All chains known on one search branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ChainSet {
    chains: Vec<Chain>,
}

impl ChainSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing chains as-is, without merging them.
    pub fn from_chains(chains: Vec<Chain>) -> Self {
        ChainSet { chains }
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Chain> {
        self.chains.get(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chain> {
        self.chains.iter()
    }

    pub fn remove(&mut self, i: usize) -> Chain {
        self.chains.remove(i)
    }

    pub fn index(&self) -> ChainIndex {
        let mut positions = HashMap::new();
        let mut ends = Vec::with_capacity(self.chains.len());
        for (k, chain) in self.chains.iter().enumerate() {
            for (offset, cell) in chain.cells().iter().enumerate() {
                positions.insert(*cell, ChainPos { chain: k, offset, len: chain.len() });
            }
            ends.push((chain.head(), chain.tail()));
        }
        ChainIndex { positions, ends }
    }

    /// Record the forced edge `from -> to` and merge it into any chains it
    /// touches. Edges already present are ignored; edges contradicting the
    /// known chains are refused and leave the set untouched.
    pub fn insert_edge(&mut self, from: Index, to: Index) -> Insertion {
        if self.chains.iter().any(|c| c.contains_edge(from, to)) {
            return Insertion::Duplicate;
        }
        if from == to {
            return Insertion::Conflict(ChainConflict::SelfLoop);
        }
        let index = self.index();
        if index.has_successor(from) {
            return Insertion::Conflict(ChainConflict::SuccessorTaken);
        }
        if index.has_predecessor(to) {
            return Insertion::Conflict(ChainConflict::PredecessorTaken);
        }
        if index.loop_head(from) == Some(to) {
            return Insertion::Conflict(ChainConflict::ClosesCycle);
        }
        self.chains.push(Chain::edge(from, to));
        self.compress();
        Insertion::Added
    }

    /// Insert every edge of `chain`. All or nothing: a conflicting edge
    /// leaves the set as it was.
    pub fn insert(&mut self, chain: &Chain) -> Insertion {
        let mut next = self.clone();
        let mut added = false;
        for w in chain.cells().windows(2) {
            match next.insert_edge(w[0], w[1]) {
                Insertion::Added => added = true,
                Insertion::Duplicate => {},
                conflict => return conflict,
            }
        }
        *self = next;
        if added { Insertion::Added } else { Insertion::Duplicate }
    }

    /// Stitch chains together wherever one's tail is another's head, until
    /// no such pair remains. Returns whether anything was merged.
    pub fn compress(&mut self) -> bool {
        let mut merged = false;
        while let Some((i, j)) = self.find_splice() {
            let next = self.chains.remove(j);
            let i = if j < i { i - 1 } else { i };
            self.chains[i].splice(next);
            merged = true;
        }
        merged
    }

    fn find_splice(&self) -> Option<(usize, usize)> {
        for (i, a) in self.chains.iter().enumerate() {
            for (j, b) in self.chains.iter().enumerate() {
                if i != j && a.tail() == b.head() {
                    return Some((i, j));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod test {
    use rand::{seq::SliceRandom, Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;
    use crate::bench::random_path;
    use super::*;

    fn chain(cells: &[Index]) -> Chain {
        Chain::new(cells.to_vec()).unwrap()
    }

    #[test]
    fn test_chain_needs_two_cells() {
        assert_eq!(Chain::new(vec![[0, 0]]), Err(SHORT_CHAIN));
        assert!(Chain::new(vec![[0, 0], [0, 1]]).is_ok());
    }

    #[test]
    fn test_insert_merges_both_orders() {
        let mut set = ChainSet::new();
        assert_eq!(set.insert_edge([1, 1], [2, 2]), Insertion::Added);
        assert_eq!(set.insert_edge([0, 0], [1, 1]), Insertion::Added);
        assert_eq!(set.len(), 1);
        assert_eq!(set.insert_edge([2, 2], [3, 3]), Insertion::Added);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(0).unwrap().cells(), &[[0, 0], [1, 1], [2, 2], [3, 3]]);
    }

    #[test]
    fn test_insert_duplicate() {
        let mut set = ChainSet::new();
        set.insert_edge([0, 0], [0, 1]);
        set.insert_edge([0, 1], [0, 3]);
        assert_eq!(set.insert_edge([0, 1], [0, 3]), Insertion::Duplicate);
        assert_eq!(set.insert_edge([0, 0], [0, 1]), Insertion::Duplicate);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_insert_conflicts() {
        let mut set = ChainSet::new();
        set.insert_edge([0, 0], [0, 1]);
        set.insert_edge([0, 1], [0, 2]);
        let before = set.clone();
        assert_eq!(set.insert_edge([0, 0], [1, 0]), Insertion::Conflict(ChainConflict::SuccessorTaken));
        assert_eq!(set.insert_edge([1, 0], [0, 2]), Insertion::Conflict(ChainConflict::PredecessorTaken));
        assert_eq!(set.insert_edge([0, 2], [0, 0]), Insertion::Conflict(ChainConflict::ClosesCycle));
        assert_eq!(set.insert_edge([3, 3], [3, 3]), Insertion::Conflict(ChainConflict::SelfLoop));
        assert_eq!(set, before);
    }

    #[test]
    fn test_insert_whole_chain() {
        let mut set = ChainSet::from_chains(vec![chain(&[[0, 0], [0, 1], [0, 2]])]);
        let before = set.clone();
        assert_eq!(
            set.insert(&chain(&[[0, 2], [1, 2], [0, 0]])),
            Insertion::Conflict(ChainConflict::ClosesCycle),
        );
        assert_eq!(set, before);
        assert_eq!(set.insert(&chain(&[[0, 2], [1, 2], [2, 2]])), Insertion::Added);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(0).unwrap().len(), 5);
        assert_eq!(set.insert(&chain(&[[0, 1], [0, 2]])), Insertion::Duplicate);
    }

    #[test]
    fn test_compress_transitive() {
        let mut set = ChainSet::from_chains(vec![
            chain(&[[2, 0], [3, 0]]),
            chain(&[[0, 0], [1, 0]]),
            chain(&[[5, 5], [4, 4]]),
            chain(&[[1, 0], [2, 0]]),
        ]);
        assert!(set.compress());
        let cells: Vec<&[Index]> = set.iter().map(|c| c.cells()).collect();
        assert_eq!(set.len(), 2);
        assert!(cells.contains(&&[[0, 0], [1, 0], [2, 0], [3, 0]][..]));
        assert!(cells.contains(&&[[5, 5], [4, 4]][..]));
    }

    #[test]
    fn test_compress_idempotent() {
        let mut set = ChainSet::from_chains(vec![
            chain(&[[0, 2], [0, 3]]),
            chain(&[[1, 1], [0, 2]]),
            chain(&[[3, 0], [2, 0]]),
            chain(&[[0, 3], [1, 3], [2, 3]]),
            chain(&[[2, 0], [2, 1]]),
        ]);
        set.compress();
        let once = set.clone();
        assert!(!set.compress());
        assert_eq!(set, once);
    }

    #[test]
    fn test_compress_random_segments() -> Result<(), Error> {
        let mut rng = ChaCha20Rng::seed_from_u64(0xc4a1);
        for (rows, cols) in [(3, 3), (4, 5), (5, 5), (6, 4)] {
            for _ in 0..5 {
                let path = random_path(&mut rng, rows, cols)?;
                let mut segments = vec![];
                let mut start = 0;
                while start + 1 < path.len() {
                    let end = (start + rng.random_range(2..=3)).min(path.len());
                    segments.push(Chain::new(path[start..end].to_vec())?);
                    start = end - 1;
                }
                segments.shuffle(&mut rng);
                let mut set = ChainSet::from_chains(segments);
                set.compress();
                let once = set.clone();
                assert!(!set.compress());
                assert_eq!(set, once);
                assert_eq!(set.len(), 1);
                assert_eq!(set.get(0).unwrap().cells(), &path[..]);
            }
        }
        Ok(())
    }

    #[test]
    fn test_compress_ignores_interior_overlap() {
        let mut set = ChainSet::from_chains(vec![
            chain(&[[0, 0], [0, 1], [0, 2]]),
            chain(&[[1, 0], [0, 1], [1, 1]]),
        ]);
        assert!(!set.compress());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_chain_index() {
        let set = ChainSet::from_chains(vec![chain(&[[0, 0], [1, 1], [2, 2]])]);
        let index = set.index();
        assert!(index.has_successor([0, 0]));
        assert!(!index.has_predecessor([0, 0]));
        assert!(index.has_successor([1, 1]));
        assert!(index.has_predecessor([1, 1]));
        assert!(!index.has_successor([2, 2]));
        assert_eq!(index.loop_head([2, 2]), Some([0, 0]));
        assert_eq!(index.loop_head([1, 1]), None);
        assert_eq!(index.loop_tail([0, 0]), Some([2, 2]));
        assert_eq!(index.get([3, 3]), None);
    }
}
