use std::fmt::Display;
use crate::core::{all_indices, Error, GridIndex, Index};
use crate::ray::Direction;

/// A single grid position. The arrow is fixed when the puzzle is built; only
/// the value changes while solving.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cell {
    pub index: Index,
    pub direction: Option<Direction>,
    pub value: Option<u32>,
}

impl Cell {
    pub fn is_start(&self) -> bool {
        self.value == Some(1)
    }

    /// The end cell is whichever one holds the final number of an n-cell path.
    pub fn is_end(&self, n: u32) -> bool {
        self.value == Some(n)
    }
}

/// The puzzle grid, stored as a flat row-major slice of cells.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Box<[Cell]>,
}

const EMPTY_GRID: Error = Error::malformed_const("grid must have at least one row and column");
const WRONG_CELL_COUNT: Error = Error::malformed_const("cell count does not match grid dimensions");
const TOO_MANY_CELLS: Error = Error::malformed_const("grid dimensions are too large");

/// rows * cols, refused when the product overflows or the largest value
/// would not fit in a u32.
pub fn cell_count(rows: usize, cols: usize) -> Result<usize, Error> {
    match rows.checked_mul(cols) {
        Some(n) if n <= u32::MAX as usize => Ok(n),
        _ => Err(TOO_MANY_CELLS),
    }
}

impl Grid {
    /// Build a grid from row-major (value, direction) pairs. Givens must lie
    /// in 1..=rows*cols and must not repeat.
    pub fn new(rows: usize, cols: usize, cells: Vec<(Option<u32>, Option<Direction>)>) -> Result<Self, Error> {
        if rows == 0 || cols == 0 {
            return Err(EMPTY_GRID);
        }
        if cells.len() != cell_count(rows, cols)? {
            return Err(WRONG_CELL_COUNT);
        }
        let cells = all_indices(rows, cols)
            .zip(cells)
            .map(|(index, (value, direction))| Cell { index, direction, value })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let grid = Grid { rows, cols, cells };
        grid.check_givens()?;
        Ok(grid)
    }

    fn check_givens(&self) -> Result<(), Error> {
        let n = self.size();
        let mut seen = vec![false; n as usize + 1];
        for cell in self.cells.iter() {
            if let Some(v) = cell.value {
                if v < 1 || v > n {
                    return Err(Error::malformed(format!(
                        "value {} at {:?} is outside 1..={}", v, cell.index, n,
                    )));
                }
                if seen[v as usize] {
                    return Err(Error::malformed(format!("value {} appears more than once", v)));
                }
                seen[v as usize] = true;
            }
        }
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of cells, which is also the largest value on a solved grid.
    /// `new` guarantees it fits in a u32.
    pub fn size(&self) -> u32 {
        self.cells.len() as u32
    }

    fn offset_of(&self, index: Index) -> Result<usize, Error> {
        if index.in_bounds(self.rows, self.cols) {
            Ok(index[0] * self.cols + index[1])
        } else {
            Err(Error::OutOfBounds { index, rows: self.rows, cols: self.cols })
        }
    }

    pub fn cell(&self, index: Index) -> Result<&Cell, Error> {
        Ok(&self.cells[self.offset_of(index)?])
    }

    pub fn value(&self, index: Index) -> Result<Option<u32>, Error> {
        Ok(self.cell(index)?.value)
    }

    pub fn set_value(&mut self, index: Index, value: Option<u32>) -> Result<(), Error> {
        let offset = self.offset_of(index)?;
        self.cells[offset].value = value;
        Ok(())
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Where each value currently sits; slot 0 is always None.
    pub fn positions(&self) -> Vec<Option<Index>> {
        let mut positions = vec![None; self.size() as usize + 1];
        for cell in self.cells.iter() {
            if let Some(v) = cell.value {
                if let Some(slot) = positions.get_mut(v as usize) {
                    *slot = Some(cell.index);
                }
            }
        }
        positions
    }

    /// The current value matrix, row-major.
    pub fn values(&self) -> Vec<Vec<Option<u32>>> {
        self.cells.chunks(self.cols)
            .map(|row| row.iter().map(|c| c.value).collect())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(|c| c.value.is_some())
    }

    pub fn filled(&self) -> usize {
        self.cells.iter().filter(|c| c.value.is_some()).count()
    }
}

impl Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self.size().to_string().len();
        for row in self.cells.chunks(self.cols) {
            let line = row.iter().map(|c| {
                let v = c.value.map(|v| v.to_string()).unwrap_or(".".to_string());
                let d = c.direction.map(|d| d.to_string()).unwrap_or("*".to_string());
                format!("{:>width$}{}", v, d, width = width)
            }).collect::<Vec<_>>().join(" ");
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    use crate::encoding::parse_game_id;
    use super::*;

    /// Seeds only at 1 and 16; propagation alone solves it.
    pub const BOARD_4X4_ONE: &str = "4x4:1defedgbheachbba16a";
    pub const BOARD_4X4_ONE_SOLUTION: [[u32; 4]; 4] = [
        [1, 4, 7, 15],
        [12, 11, 14, 6],
        [8, 10, 2, 3],
        [9, 5, 13, 16],
    ];

    pub const BOARD_4X4_TWO: &str = "4x4:1dcefe2agfcbeacab16a";
    pub const BOARD_4X4_TWO_SOLUTION: [[u32; 4]; 4] = [
        [1, 3, 4, 14],
        [6, 2, 5, 11],
        [7, 13, 8, 10],
        [15, 12, 9, 16],
    ];

    /// Heavily seeded board used for checking the linkage maps.
    pub const LINKAGE_4X4: &str = "4x4:1d3c4e14f6e2ag11fcb8ea15cab16a";

    /// Three columns by four rows. Propagation stalls with one ambiguous
    /// cell at [0, 0] pointing south; the nearer candidate [1, 0] is wrong.
    pub const GUESS_3X4: &str = "3x4:eegdcec7af1a12aa";
    pub const GUESS_3X4_SOLUTION: [[u32; 3]; 4] = [
        [5, 8, 4],
        [2, 9, 10],
        [6, 7, 11],
        [1, 12, 3],
    ];

    /// Stalls after propagation; the first speculative candidate is right.
    pub const STALL_4X4: &str = "4x4:ecgedcagachgc1h16ah";
    pub const STALL_4X4_SOLUTION: [[u32; 4]; 4] = [
        [14, 11, 10, 12],
        [3, 7, 9, 8],
        [2, 4, 6, 5],
        [15, 1, 16, 13],
    ];

    pub fn board_4x4_one() -> Grid {
        parse_game_id(BOARD_4X4_ONE).unwrap()
    }

    pub fn parse(id: &str) -> Grid {
        parse_game_id(id).unwrap()
    }

    pub fn to_rows<const R: usize, const C: usize>(solution: &[[u32; C]; R]) -> Vec<Vec<Option<u32>>> {
        solution.iter().map(|row| row.iter().map(|v| Some(*v)).collect()).collect()
    }

    pub fn assert_unique_values(grid: &Grid) {
        let mut seen = std::collections::HashSet::new();
        for cell in grid.cells() {
            if let Some(v) = cell.value {
                assert!(seen.insert(v), "value {} repeated in\n{}", v, grid);
            }
        }
    }
}
