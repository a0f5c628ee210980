use std::borrow::Cow;
use thiserror::Error;

/// Error type. This is used to indicate something wrong with either the
/// puzzle encoding or with the algorithm itself. Contradictions found while
/// solving and exhaustion of the search space are not errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("malformed encoding: {0}")]
    MalformedEncoding(Cow<'static, str>),
    #[error("index {index:?} out of bounds for {rows}x{cols} grid")]
    OutOfBounds { index: Index, rows: usize, cols: usize },
    #[error("internal error: {0}")]
    Internal(Cow<'static, str>),
}

impl Error {
    pub const fn malformed_const(s: &'static str) -> Self {
        Error::MalformedEncoding(Cow::Borrowed(s))
    }

    pub fn malformed<S: Into<String>>(s: S) -> Self {
        Error::MalformedEncoding(Cow::Owned(s.into()))
    }

    pub const fn internal_const(s: &'static str) -> Self {
        Error::Internal(Cow::Borrowed(s))
    }

    pub fn internal<S: Into<String>>(s: S) -> Self {
        Error::Internal(Cow::Owned(s.into()))
    }
}

/// Puzzles are laid out on a rectangular grid of cells. Indices are
/// [row, col], so a cell at horizontal position x and vertical position y
/// lives at [y, x].
pub type Index = [usize; 2];

pub trait GridIndex {
    // Is the index still valid or has it gone off the end of the grid?
    fn in_bounds(&self, rows: usize, cols: usize) -> bool;
    // Step by a signed offset, or None if that would go below zero.
    fn offset(&self, dr: isize, dc: isize) -> Option<Index>;
}

impl GridIndex for Index {
    fn in_bounds(&self, rows: usize, cols: usize) -> bool {
        self[0] < rows && self[1] < cols
    }

    fn offset(&self, dr: isize, dc: isize) -> Option<Index> {
        Some([
            self[0].checked_add_signed(dr)?,
            self[1].checked_add_signed(dc)?,
        ])
    }
}

/// Iterate every index of a rows x cols grid in row-major order.
pub fn all_indices(rows: usize, cols: usize) -> impl Iterator<Item = Index> {
    (0..rows).flat_map(move |r| (0..cols).map(move |c| [r, c]))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_in_bounds() {
        let i: Index = [1, 2];
        assert!(i.in_bounds(2, 3));
        assert!(!i.in_bounds(2, 2));
        assert!(![2, 0].in_bounds(2, 3));
    }

    #[test]
    fn test_offset_refuses_negative() {
        let i: Index = [0, 1];
        assert_eq!(i.offset(-1, 0), None);
        assert_eq!(i.offset(1, -1), Some([1, 0]));
    }

    #[test]
    fn test_all_indices_row_major() {
        let v: Vec<Index> = all_indices(2, 2).collect();
        assert_eq!(v, vec![[0, 0], [0, 1], [1, 0], [1, 1]]);
    }

    #[test]
    fn test_error_display() {
        let e = Error::OutOfBounds { index: [4, 0], rows: 4, cols: 4 };
        assert_eq!(e.to_string(), "index [4, 0] out of bounds for 4x4 grid");
        assert_eq!(
            Error::malformed_const("bad").to_string(),
            "malformed encoding: bad",
        );
    }
}
