use bit_set::BitSet;
use crate::chain::{ChainIndex, ChainSet};
use crate::core::{Error, GridIndex, Index};
use crate::grid::{Cell, Grid};

/// A boolean per grid cell, stored as a bitset in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkMap {
    rows: usize,
    cols: usize,
    bits: BitSet,
}

impl LinkMap {
    fn new(rows: usize, cols: usize) -> Self {
        LinkMap { rows, cols, bits: BitSet::with_capacity(rows * cols) }
    }

    pub fn get(&self, index: Index) -> Result<bool, Error> {
        if !index.in_bounds(self.rows, self.cols) {
            return Err(Error::OutOfBounds { index, rows: self.rows, cols: self.cols });
        }
        Ok(self.bits.contains(index[0] * self.cols + index[1]))
    }

    fn set(&mut self, index: Index) {
        self.bits.insert(index[0] * self.cols + index[1]);
    }

    pub fn count(&self) -> usize {
        self.bits.len()
    }

    pub fn to_rows(&self) -> Vec<Vec<bool>> {
        (0..self.rows)
            .map(|r| (0..self.cols).map(|c| self.bits.contains(r * self.cols + c)).collect())
            .collect()
    }
}

fn is_placed(positions: &[Option<Index>], value: Option<u32>) -> bool {
    value
        .and_then(|v| positions.get(v as usize))
        .map_or(false, |p| p.is_some())
}

// A cell still needs a successor unless value+1 is already placed, it is the
// end cell, or a chain already leaves from it.
fn needs_successor(cell: &Cell, n: u32, positions: &[Option<Index>], index: &ChainIndex) -> bool {
    let next_placed = cell.value.map_or(false, |v| is_placed(positions, Some(v + 1)));
    !(next_placed || cell.is_end(n) || index.has_successor(cell.index))
}

fn needs_predecessor(cell: &Cell, positions: &[Option<Index>], index: &ChainIndex) -> bool {
    let prev_placed = cell.value.map_or(false, |v| v > 1 && is_placed(positions, Some(v - 1)));
    !(prev_placed || cell.is_start() || index.has_predecessor(cell.index))
}

fn build_map<F: Fn(&Cell) -> bool>(grid: &Grid, f: F) -> LinkMap {
    let mut map = LinkMap::new(grid.rows(), grid.cols());
    for cell in grid.cells() {
        if f(cell) {
            map.set(cell.index);
        }
    }
    map
}

/// Cells whose outgoing edge is still undecided.
pub fn not_linking_map(grid: &Grid, chains: &ChainSet) -> Result<LinkMap, Error> {
    Ok(Linkage::new(grid, chains)?.not_linking)
}

/// Cells whose incoming edge is still undecided.
pub fn not_linked_map(grid: &Grid, chains: &ChainSet) -> Result<LinkMap, Error> {
    Ok(Linkage::new(grid, chains)?.not_linked)
}

/// Everything the deduction rules read about the current state, computed
/// fresh once per propagation step.
#[derive(Debug, Clone)]
pub struct Linkage {
    pub positions: Vec<Option<Index>>,
    pub chains: ChainIndex,
    pub not_linking: LinkMap,
    pub not_linked: LinkMap,
}

impl Linkage {
    pub fn new(grid: &Grid, chains: &ChainSet) -> Result<Self, Error> {
        let positions = grid.positions();
        let index = chains.index();
        for chain in chains.iter() {
            for cell in chain.cells() {
                grid.cell(*cell)?;
            }
        }
        let n = grid.size();
        let not_linking = build_map(grid, |c| needs_successor(c, n, &positions, &index));
        let not_linked = build_map(grid, |c| needs_predecessor(c, &positions, &index));
        Ok(Linkage { positions, chains: index, not_linking, not_linked })
    }

    /// Cell currently holding `value`, if any.
    pub fn holder(&self, value: u32) -> Option<Index> {
        self.positions.get(value as usize).copied().flatten()
    }
}

#[cfg(test)]
mod test {
    use crate::chain::Chain;
    use crate::grid::test_util::*;
    use super::*;

    const T: bool = true;
    const F: bool = false;

    #[test]
    fn test_seeded_board_maps() -> Result<(), Error> {
        let grid = parse(LINKAGE_4X4);
        let chains = ChainSet::new();
        assert_eq!(not_linking_map(&grid, &chains)?.to_rows(), vec![
            vec![F, F, T, F],
            vec![T, F, T, T],
            vec![T, T, T, T],
            vec![F, T, T, F],
        ]);
        assert_eq!(not_linked_map(&grid, &chains)?.to_rows(), vec![
            vec![F, F, F, T],
            vec![T, F, T, T],
            vec![T, T, T, T],
            vec![F, T, T, F],
        ]);
        Ok(())
    }

    #[test]
    fn test_chain_members_are_linked() -> Result<(), Error> {
        let grid = board_4x4_one();
        let chains = ChainSet::from_chains(vec![
            Chain::new(vec![[1, 1], [2, 2], [1, 0]])?,
        ]);
        let linkage = Linkage::new(&grid, &chains)?;
        assert!(!linkage.not_linking.get([1, 1])?);
        assert!(!linkage.not_linking.get([2, 2])?);
        assert!(linkage.not_linking.get([1, 0])?);
        assert!(linkage.not_linked.get([1, 1])?);
        assert!(!linkage.not_linked.get([2, 2])?);
        assert!(!linkage.not_linked.get([1, 0])?);
        // Start and end.
        assert!(linkage.not_linking.get([0, 0])?);
        assert!(!linkage.not_linked.get([0, 0])?);
        assert!(!linkage.not_linking.get([3, 3])?);
        assert!(linkage.not_linked.get([3, 3])?);
        Ok(())
    }

    #[test]
    fn test_linkage_rejects_stray_chain() -> Result<(), Error> {
        let grid = board_4x4_one();
        let chains = ChainSet::from_chains(vec![Chain::new(vec![[0, 0], [0, 9]])?]);
        assert!(matches!(Linkage::new(&grid, &chains), Err(Error::OutOfBounds { .. })));
        Ok(())
    }

    #[test]
    fn test_link_map_bounds() -> Result<(), Error> {
        let grid = board_4x4_one();
        let map = not_linking_map(&grid, &ChainSet::new())?;
        assert!(map.get([4, 0]).is_err());
        assert_eq!(map.count(), 15);
        Ok(())
    }

    #[test]
    fn test_holder() -> Result<(), Error> {
        let grid = board_4x4_one();
        let linkage = Linkage::new(&grid, &ChainSet::new())?;
        assert_eq!(linkage.holder(1), Some([0, 0]));
        assert_eq!(linkage.holder(16), Some([3, 3]));
        assert_eq!(linkage.holder(2), None);
        assert_eq!(linkage.holder(40), None);
        Ok(())
    }
}
