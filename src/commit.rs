use thiserror::Error;
use crate::chain::Chain;
use crate::core::Index;
use crate::grid::Grid;

/// Why a chain could not be written to the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommitError {
    /// Nothing on the chain pins down its numbering yet. Try again later.
    #[error("chain has no usable anchor")]
    NoAnchor,
    #[error("value {value} is already held by {holder:?}")]
    DuplicateValue { value: u32, holder: Index },
    #[error("cell {index:?} needs {expected} but holds {found:?}")]
    Conflict { index: Index, expected: u32, found: Option<u32> },
    #[error("chain leaves the grid at {index:?}")]
    OutOfBounds { index: Index },
}

impl CommitError {
    /// Whether the chain can never be committed on this grid.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CommitError::NoAnchor)
    }
}

/// Number every cell on `chain` from its first numbered cell. Nothing is
/// written unless the whole chain checks out.
pub fn commit_way(grid: &mut Grid, chain: &Chain) -> Result<(), CommitError> {
    let cells = chain.cells();
    let mut values = Vec::with_capacity(cells.len());
    for index in cells {
        values.push(grid.value(*index).map_err(|_| CommitError::OutOfBounds { index: *index })?);
    }
    let (offset, value) = values.iter()
        .enumerate()
        .find_map(|(i, v)| v.map(|v| (i, v)))
        .ok_or(CommitError::NoAnchor)?;
    if (value as usize) <= offset {
        return Err(CommitError::NoAnchor);
    }
    let head = value - offset as u32;
    let last = head + cells.len() as u32 - 1;
    if last > grid.size() {
        return Err(CommitError::Conflict { index: chain.tail(), expected: last, found: values[cells.len() - 1] });
    }
    let positions = grid.positions();
    for (i, index) in cells.iter().enumerate() {
        let target = head + i as u32;
        if cells[..i].contains(index) {
            return Err(CommitError::Conflict { index: *index, expected: target, found: values[i] });
        }
        if let Some(holder) = positions[target as usize] {
            if holder != *index {
                return Err(CommitError::DuplicateValue { value: target, holder });
            }
        }
        if values[i].is_some() && values[i] != Some(target) {
            return Err(CommitError::Conflict { index: *index, expected: target, found: values[i] });
        }
    }
    for (i, index) in cells.iter().enumerate() {
        grid.set_value(*index, Some(head + i as u32))
            .map_err(|_| CommitError::OutOfBounds { index: *index })?;
    }
    Ok(())
}
