use std::fmt::Display;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::EnumCount;
use crate::core::{Error, GridIndex, Index};
use crate::grid::{Cell, Grid};

/// The eight compass headings a cell's arrow can take, numbered clockwise
/// starting from North.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, strum_macros::EnumCount, strum_macros::EnumIter)]
#[repr(u8)]
pub enum Direction {
    N = 0,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

/// Unit vectors as (d_row, d_col), indexed by direction number.
const OFFSETS: [(isize, isize); Direction::COUNT] = [
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
];

const BAD_LETTER: Error = Error::malformed_const("direction letter must be in a..h");

impl Direction {
    pub fn offset(self) -> (isize, isize) {
        OFFSETS[u8::from(self) as usize]
    }

    pub fn opposite(self) -> Direction {
        // Wrapping within 0..8 always yields a valid discriminant.
        Direction::try_from((u8::from(self) + 4) % 8).unwrap_or(self)
    }

    pub fn from_letter(c: char) -> Result<Direction, Error> {
        if !('a'..='h').contains(&c) {
            return Err(BAD_LETTER);
        }
        Direction::try_from(c as u8 - b'a').map_err(|_| BAD_LETTER)
    }

    pub fn letter(self) -> char {
        (b'a' + u8::from(self)) as char
    }

    /// Would a ray in this direction pass through a cell displaced by
    /// (dr, dc) from the origin? Signs must agree on every axis the
    /// direction moves along, the other axis must be unchanged, and
    /// diagonals need equal magnitudes.
    pub fn reaches(self, dr: isize, dc: isize) -> bool {
        if dr == 0 && dc == 0 {
            return false;
        }
        let (ur, uc) = self.offset();
        if dr.signum() != ur || dc.signum() != uc {
            return false;
        }
        ur == 0 || uc == 0 || dr.abs() == dc.abs()
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Direction::N => "↑",
            Direction::NE => "↗",
            Direction::E => "→",
            Direction::SE => "↘",
            Direction::S => "↓",
            Direction::SW => "↙",
            Direction::W => "←",
            Direction::NW => "↖",
        };
        write!(f, "{}", s)
    }
}

/// Indices visited when walking from an origin in a fixed direction. The
/// origin itself is never produced and the walk stops at the grid edge.
#[derive(Debug, Clone)]
pub struct Ray {
    next: Option<Index>,
    offset: (isize, isize),
    rows: usize,
    cols: usize,
}

impl Ray {
    pub fn new(origin: Index, direction: Direction, rows: usize, cols: usize) -> Self {
        let offset = direction.offset();
        let mut ray = Ray { next: None, offset, rows, cols };
        ray.next = ray.step(origin);
        ray
    }

    fn step(&self, from: Index) -> Option<Index> {
        from.offset(self.offset.0, self.offset.1)
            .filter(|i| i.in_bounds(self.rows, self.cols))
    }
}

impl Iterator for Ray {
    type Item = Index;

    fn next(&mut self) -> Option<Index> {
        let current = self.next?;
        self.next = self.step(current);
        Some(current)
    }
}

/// Cells along the ray from `origin`, nearest first.
pub fn cast_ray(grid: &Grid, direction: Direction, origin: Index) -> Result<Vec<&Cell>, Error> {
    grid.cell(origin)?;
    Ray::new(origin, direction, grid.rows(), grid.cols())
        .map(|i| grid.cell(i))
        .collect()
}

/// Does the arrow at `from` point at `to`? False for cells without an arrow.
pub fn points_at(grid: &Grid, from: Index, to: Index) -> Result<bool, Error> {
    grid.cell(to)?;
    let dir = match grid.cell(from)?.direction {
        Some(d) => d,
        None => return Ok(false),
    };
    let dr = to[0] as isize - from[0] as isize;
    let dc = to[1] as isize - from[1] as isize;
    Ok(dir.reaches(dr, dc))
}

#[cfg(test)]
mod test {
    use strum::IntoEnumIterator;
    use crate::core::all_indices;
    use crate::grid::test_util::board_4x4_one;
    use super::*;

    fn indices(cells: Vec<&Cell>) -> Vec<Index> {
        cells.into_iter().map(|c| c.index).collect()
    }

    #[test]
    fn test_letters() -> Result<(), Error> {
        assert_eq!(Direction::from_letter('a')?, Direction::N);
        assert_eq!(Direction::from_letter('d')?, Direction::SE);
        assert_eq!(Direction::from_letter('h')?, Direction::NW);
        assert!(Direction::from_letter('i').is_err());
        assert!(Direction::from_letter('A').is_err());
        for d in Direction::iter() {
            assert_eq!(Direction::from_letter(d.letter())?, d);
        }
        Ok(())
    }

    #[test]
    fn test_opposite() {
        assert_eq!(Direction::N.opposite(), Direction::S);
        assert_eq!(Direction::SW.opposite(), Direction::NE);
        for d in Direction::iter() {
            assert_eq!(d.opposite().opposite(), d);
        }
    }

    #[test]
    fn test_reaches() {
        assert!(Direction::SE.reaches(3, 3));
        assert!(!Direction::SE.reaches(3, 2));
        assert!(Direction::E.reaches(0, 5));
        assert!(!Direction::E.reaches(1, 5));
        assert!(!Direction::W.reaches(0, 5));
        assert!(Direction::N.reaches(-2, 0));
        assert!(!Direction::N.reaches(0, 0));
    }

    #[test]
    fn test_cast_ray_4x4() -> Result<(), Error> {
        let grid = board_4x4_one();
        assert_eq!(indices(cast_ray(&grid, Direction::SE, [0, 0])?), vec![[1, 1], [2, 2], [3, 3]]);
        assert_eq!(indices(cast_ray(&grid, Direction::W, [2, 3])?), vec![[2, 2], [2, 1], [2, 0]]);
        assert_eq!(indices(cast_ray(&grid, Direction::NE, [3, 0])?), vec![[2, 1], [1, 2], [0, 3]]);
        assert!(cast_ray(&grid, Direction::N, [0, 2])?.is_empty());
        assert!(cast_ray(&grid, Direction::NW, [0, 0])?.is_empty());
        Ok(())
    }

    #[test]
    fn test_cast_ray_origin_out_of_bounds() {
        let grid = board_4x4_one();
        assert!(matches!(
            cast_ray(&grid, Direction::E, [0, 4]),
            Err(Error::OutOfBounds { .. }),
        ));
    }

    #[test]
    fn test_cast_ray_deterministic_everywhere() -> Result<(), Error> {
        let grid = board_4x4_one();
        for origin in all_indices(grid.rows(), grid.cols()) {
            for d in Direction::iter() {
                let first = indices(cast_ray(&grid, d, origin)?);
                let second = indices(cast_ray(&grid, d, origin)?);
                assert_eq!(first, second);
                assert!(!first.contains(&origin));
                for i in &first {
                    assert!(i.in_bounds(grid.rows(), grid.cols()));
                    let dr = i[0] as isize - origin[0] as isize;
                    let dc = i[1] as isize - origin[1] as isize;
                    assert!(d.reaches(dr, dc));
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_points_at() -> Result<(), Error> {
        let grid = board_4x4_one();
        // [0, 0] holds 1 with a south-east arrow.
        assert!(points_at(&grid, [0, 0], [3, 3])?);
        assert!(!points_at(&grid, [0, 0], [0, 1])?);
        assert!(points_at(&grid, [0, 0], [4, 4]).is_err());
        Ok(())
    }
}
