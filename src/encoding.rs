use std::str::FromStr;
use crate::core::Error;
use crate::grid::{cell_count, Grid};
use crate::ray::Direction;

/// One cell of the matrix form: an optional value and an optional direction
/// number (0 = North, clockwise to 7 = Northwest).
pub type MatrixCell = (Option<u32>, Option<u8>);
pub type Matrix = Vec<Vec<MatrixCell>>;

const MISSING_COLON: Error = Error::malformed_const("game ID must look like WxH:<cells>");
const BAD_DIMENSIONS: Error = Error::malformed_const("game ID dimensions must be positive integers");
const DANGLING_DIGITS: Error = Error::malformed_const("game ID ends with a value but no direction");
const EMPTY_MATRIX: Error = Error::malformed_const("matrix must have at least one row and column");
const RAGGED_MATRIX: Error = Error::malformed_const("matrix rows have unequal length");

fn parse_dimension(s: &str) -> Result<usize, Error> {
    match s.parse::<usize>() {
        Ok(d) if d > 0 => Ok(d),
        _ => Err(BAD_DIMENSIONS),
    }
}

/// Parse a game ID such as `4x4:1defedgbheachbba16a`. Each cell record is
/// an optional decimal value followed by a direction letter a..h, in
/// row-major order.
pub fn parse_game_id(s: &str) -> Result<Grid, Error> {
    let (dims, body) = s.trim().split_once(':').ok_or(MISSING_COLON)?;
    let (w, h) = dims.split_once('x').ok_or(BAD_DIMENSIONS)?;
    let cols = parse_dimension(w)?;
    let rows = parse_dimension(h)?;
    let expected = cell_count(rows, cols)?;
    let mut cells = Vec::new();
    let mut digits = String::new();
    for c in body.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let direction = Direction::from_letter(c)?;
        let value = if digits.is_empty() {
            None
        } else {
            let v = digits.parse::<u32>()
                .map_err(|_| Error::malformed(format!("bad value {:?}", digits)))?;
            digits.clear();
            Some(v)
        };
        cells.push((value, Some(direction)));
    }
    if !digits.is_empty() {
        return Err(DANGLING_DIGITS);
    }
    if cells.len() != expected {
        return Err(Error::malformed(format!(
            "expected {} cell records for {}x{}, found {}", expected, cols, rows, cells.len(),
        )));
    }
    Grid::new(rows, cols, cells)
}

/// Encode a grid as a game ID. Values currently on the grid are written out,
/// so encoding a partly solved grid captures the progress too. The end cell
/// may lack an arrow and is then written as `a`.
pub fn to_game_id(grid: &Grid) -> Result<String, Error> {
    let n = grid.size();
    let mut out = format!("{}x{}:", grid.cols(), grid.rows());
    for cell in grid.cells() {
        if let Some(v) = cell.value {
            out.push_str(&v.to_string());
        }
        let direction = match cell.direction {
            Some(d) => d,
            None if cell.is_end(n) => Direction::N,
            None => return Err(Error::malformed(format!(
                "cell {:?} has no direction and cannot be encoded", cell.index,
            ))),
        };
        out.push(direction.letter());
    }
    Ok(out)
}

pub fn parse_matrix(matrix: &Matrix) -> Result<Grid, Error> {
    let rows = matrix.len();
    let cols = matrix.first().map(|r| r.len()).unwrap_or(0);
    if rows == 0 || cols == 0 {
        return Err(EMPTY_MATRIX);
    }
    let mut cells = Vec::new();
    for row in matrix {
        if row.len() != cols {
            return Err(RAGGED_MATRIX);
        }
        for &(value, direction) in row {
            let direction = match direction {
                Some(d) => Some(Direction::try_from(d).map_err(|_| {
                    Error::malformed(format!("direction {} is outside 0..=7", d))
                })?),
                None => None,
            };
            cells.push((value, direction));
        }
    }
    Grid::new(rows, cols, cells)
}

pub fn to_matrix(grid: &Grid) -> Matrix {
    let cells: Vec<MatrixCell> = grid.cells()
        .map(|c| (c.value, c.direction.map(u8::from)))
        .collect();
    cells.chunks(grid.cols()).map(|row| row.to_vec()).collect()
}

pub fn parse_matrix_json(s: &str) -> Result<Grid, Error> {
    let matrix: Matrix = serde_json::from_str(s)
        .map_err(|e| Error::malformed(format!("invalid matrix JSON: {}", e)))?;
    parse_matrix(&matrix)
}

pub fn to_matrix_json(grid: &Grid) -> Result<String, Error> {
    serde_json::to_string(&to_matrix(grid))
        .map_err(|e| Error::internal(e.to_string()))
}

/// Serialize a value matrix (solver output) as JSON, with null for cells
/// that were never resolved.
pub fn values_to_json(values: &Vec<Vec<Option<u32>>>) -> Result<String, Error> {
    serde_json::to_string(values).map_err(|e| Error::internal(e.to_string()))
}

impl FromStr for Grid {
    type Err = Error;

    /// Accepts either a game ID or a JSON matrix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim_start().starts_with('[') {
            parse_matrix_json(s)
        } else {
            parse_game_id(s)
        }
    }
}
