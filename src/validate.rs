use crate::grid::Grid;

/// No value appears on more than one cell.
pub fn has_unique_values(grid: &Grid) -> bool {
    let mut seen = vec![false; grid.size() as usize + 1];
    for v in grid.cells().filter_map(|c| c.value) {
        match seen.get_mut(v as usize) {
            Some(s) if !*s => *s = true,
            _ => return false,
        }
    }
    true
}

/// True when every value 1..=N is placed exactly once and each cell's arrow
/// points towards the cell holding the next value.
pub fn is_valid(grid: &Grid) -> bool {
    if !has_unique_values(grid) {
        return false;
    }
    let positions = grid.positions();
    let mut placed = Vec::with_capacity(positions.len());
    for p in positions.iter().skip(1) {
        match p {
            Some(i) => placed.push(*i),
            None => return false,
        }
    }
    placed.windows(2).all(|w| {
        let (from, to) = (w[0], w[1]);
        let direction = match grid.cell(from).map(|c| c.direction) {
            Ok(Some(d)) => d,
            _ => return false,
        };
        let dr = to[0] as isize - from[0] as isize;
        let dc = to[1] as isize - from[1] as isize;
        direction.reaches(dr, dc)
    })
}
