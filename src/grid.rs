//! Grid: square matrix of tile cells. Row 0 is the top row.

use std::fmt;

use crate::error::GridError;
use crate::random::TileSource;

/// Smallest grid that still leaves room for a three-tile match.
pub const MIN_FIELD_SIZE: usize = 3;

/// Ordinary tile types must stay below the special offset.
pub const MAX_TILE_KINDS: u8 = 10;

/// Key and locked-door cells compare as `SPECIAL_OFFSET + kind`.
pub const SPECIAL_OFFSET: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Chebyshev distance < 2, so diagonal neighbours count as adjacent.
    pub fn is_adjacent(self, other: Self) -> bool {
        self.row.abs_diff(other.row) < 2 && self.col.abs_diff(other.col) < 2
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Marker carried by a cell on top of its tile type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpecialKind {
    #[default]
    None = 0,
    Hero = 1,
    Key = 2,
    LockedDoor = 3,
}

impl SpecialKind {
    /// Key and LockedDoor are pulled out of ordinary matching; the hero is cosmetic.
    pub fn is_locked(self) -> bool {
        matches!(self, Self::Key | Self::LockedDoor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub tile: u8,
    pub special: SpecialKind,
    pub occupied: bool,
}

impl Cell {
    pub const fn tile(tile: u8) -> Self {
        Self {
            tile,
            special: SpecialKind::None,
            occupied: true,
        }
    }

    /// Value used when comparing cells for a match.
    pub fn match_value(&self) -> u8 {
        if self.special.is_locked() {
            SPECIAL_OFFSET + self.special as u8
        } else {
            self.tile
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    kinds: u8,
    /// Row-major, `row * size + col`.
    cells: Vec<Cell>,
}

impl Grid {
    /// Build a `size`x`size` grid filled with random tiles in `[0, tile_kinds)`.
    pub fn new(size: usize, tile_kinds: u8, source: &mut dyn TileSource) -> Result<Self, GridError> {
        Self::check_dims(size, tile_kinds)?;
        let cells = (0..size * size)
            .map(|_| Cell::tile(source.next_tile_type() % tile_kinds))
            .collect();
        Ok(Self {
            size,
            kinds: tile_kinds,
            cells,
        })
    }

    /// Build a grid from explicit rows of tile types (every cell occupied).
    pub fn from_rows(rows: &[&[u8]], tile_kinds: u8) -> Result<Self, GridError> {
        let size = rows.len();
        Self::check_dims(size, tile_kinds)?;
        let mut cells = Vec::with_capacity(size * size);
        for (r, row) in rows.iter().enumerate() {
            if row.len() != size {
                return Err(GridError::InvalidConfig(format!(
                    "row {r} has {} cells, expected {size}",
                    row.len()
                )));
            }
            for &t in row.iter() {
                if t >= tile_kinds {
                    return Err(GridError::InvalidConfig(format!(
                        "tile type {t} outside [0, {tile_kinds})"
                    )));
                }
                cells.push(Cell::tile(t));
            }
        }
        Ok(Self {
            size,
            kinds: tile_kinds,
            cells,
        })
    }

    fn check_dims(size: usize, tile_kinds: u8) -> Result<(), GridError> {
        if size < MIN_FIELD_SIZE {
            return Err(GridError::InvalidConfig(format!(
                "field size {size} is below the minimum of {MIN_FIELD_SIZE}"
            )));
        }
        if tile_kinds == 0 || tile_kinds > MAX_TILE_KINDS {
            return Err(GridError::InvalidConfig(format!(
                "tile kinds must be in 1..={MAX_TILE_KINDS}, got {tile_kinds}"
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn tile_kinds(&self) -> u8 {
        self.kinds
    }

    #[inline]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.size && col < self.size
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> Result<usize, GridError> {
        if !self.contains(row, col) {
            return Err(GridError::OutOfBounds {
                row,
                col,
                size: self.size,
            });
        }
        Ok(row * self.size + col)
    }

    pub fn get(&self, row: usize, col: usize) -> Result<&Cell, GridError> {
        let idx = self.index(row, col)?;
        Ok(&self.cells[idx])
    }

    pub fn at(&self, pos: Position) -> Result<&Cell, GridError> {
        self.get(pos.row, pos.col)
    }

    /// Place a marker. Key and LockedDoor switch the cell to the offset comparison value.
    pub fn set_special(&mut self, row: usize, col: usize, kind: SpecialKind) -> Result<(), GridError> {
        let idx = self.index(row, col)?;
        self.cells[idx].special = kind;
        Ok(())
    }

    /// Vacate every listed cell. Validates all positions before touching any.
    pub fn mark_empty(&mut self, positions: &[Position]) -> Result<(), GridError> {
        let indices = positions
            .iter()
            .map(|p| self.index(p.row, p.col))
            .collect::<Result<Vec<_>, _>>()?;
        for idx in indices {
            self.cells[idx].occupied = false;
            self.cells[idx].special = SpecialKind::None;
        }
        Ok(())
    }

    /// Unoccupied cells strictly below `row` in `col`.
    pub fn count_empty_below(&self, row: usize, col: usize) -> usize {
        if col >= self.size {
            return 0;
        }
        (row + 1..self.size)
            .filter(|&r| !self.cells[r * self.size + col].occupied)
            .count()
    }

    /// Unoccupied cells in the whole column.
    pub fn count_empty_in_column(&self, col: usize) -> usize {
        if col >= self.size {
            return 0;
        }
        self.size - self.count_occupied_in_column(col)
    }

    pub fn count_occupied_in_column(&self, col: usize) -> usize {
        if col >= self.size {
            return 0;
        }
        (0..self.size)
            .filter(|&r| self.cells[r * self.size + col].occupied)
            .count()
    }

    /// Copy `from`'s content (tile and marker) into `to` and vacate `from`.
    pub fn move_cell(&mut self, from: Position, to: Position) -> Result<(), GridError> {
        let src = self.index(from.row, from.col)?;
        let dst = self.index(to.row, to.col)?;
        if src == dst {
            return Ok(());
        }
        self.cells[dst] = self.cells[src];
        self.cells[src].occupied = false;
        self.cells[src].special = SpecialKind::None;
        Ok(())
    }

    /// Refill a cell with a fresh ordinary tile.
    pub fn fill(&mut self, pos: Position, tile: u8) -> Result<(), GridError> {
        let idx = self.index(pos.row, pos.col)?;
        self.cells[idx] = Cell::tile(tile % self.kinds);
        Ok(())
    }

    /// Every position, row-major.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        let size = self.size;
        (0..size * size).map(move |i| Position::new(i / size, i % size))
    }

    /// Cells paired with their positions, row-major.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Cell)> + '_ {
        self.positions().zip(self.cells.iter())
    }

    /// First cell holding `kind`, scanning row-major.
    pub fn find_special(&self, kind: SpecialKind) -> Option<Position> {
        self.iter()
            .find(|(_, c)| c.occupied && c.special == kind)
            .map(|(p, _)| p)
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| c.occupied)
    }
}

/// One character per cell: tile digit, `H`/`K`/`D` for markers, `.` when empty.
impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.size {
            for col in 0..self.size {
                let c = &self.cells[row * self.size + col];
                let ch = if !c.occupied {
                    '.'
                } else {
                    match c.special {
                        SpecialKind::Hero => 'H',
                        SpecialKind::Key => 'K',
                        SpecialKind::LockedDoor => 'D',
                        SpecialKind::None => char::from(b'0' + c.tile),
                    }
                };
                write!(f, "{ch}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SequenceSource;

    fn checker() -> Grid {
        Grid::from_rows(&[&[0, 1, 0], &[1, 0, 1], &[0, 1, 0]], 4).unwrap()
    }

    #[test]
    fn test_new_rejects_small_field() {
        let mut src = SequenceSource::new(vec![0]);
        assert!(matches!(
            Grid::new(2, 4, &mut src),
            Err(GridError::InvalidConfig(_))
        ));
        assert!(matches!(
            Grid::new(8, 0, &mut src),
            Err(GridError::InvalidConfig(_))
        ));
        assert!(matches!(
            Grid::new(8, 11, &mut src),
            Err(GridError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_new_fills_every_cell() {
        let mut src = SequenceSource::new(vec![0, 1, 2, 3]);
        let grid = Grid::new(8, 4, &mut src).unwrap();
        assert_eq!(grid.iter().count(), 64);
        assert!(grid.is_full());
        assert_eq!(grid.get(0, 1).unwrap().tile, 1);
        assert_eq!(grid.get(7, 7).unwrap().tile, 3);
    }

    #[test]
    fn test_get_out_of_bounds() {
        let grid = checker();
        assert_eq!(
            grid.get(3, 0),
            Err(GridError::OutOfBounds {
                row: 3,
                col: 0,
                size: 3
            })
        );
        assert!(grid.get(0, 3).is_err());
    }

    #[test]
    fn test_special_offsets_match_value() {
        let mut grid = checker();
        grid.set_special(0, 0, SpecialKind::Key).unwrap();
        grid.set_special(0, 2, SpecialKind::LockedDoor).unwrap();
        grid.set_special(2, 2, SpecialKind::Hero).unwrap();
        assert_eq!(grid.get(0, 0).unwrap().match_value(), 12);
        assert_eq!(grid.get(0, 2).unwrap().match_value(), 13);
        // hero keeps its tile value
        assert_eq!(grid.get(2, 2).unwrap().match_value(), 0);
    }

    #[test]
    fn test_mark_empty_and_counts() {
        let mut grid = checker();
        grid.mark_empty(&[Position::new(1, 0), Position::new(2, 0)]).unwrap();
        assert_eq!(grid.count_empty_below(0, 0), 2);
        assert_eq!(grid.count_empty_below(1, 0), 1);
        assert_eq!(grid.count_empty_below(2, 0), 0);
        assert_eq!(grid.count_empty_in_column(0), 2);
        assert_eq!(grid.count_occupied_in_column(0), 1);
        assert_eq!(grid.count_occupied_in_column(1), 3);
    }

    #[test]
    fn test_mark_empty_is_all_or_nothing() {
        let mut grid = checker();
        let err = grid.mark_empty(&[Position::new(0, 0), Position::new(9, 9)]);
        assert!(err.is_err());
        assert!(grid.is_full());
    }

    #[test]
    fn test_move_cell_carries_marker() {
        let mut grid = checker();
        grid.set_special(0, 1, SpecialKind::Key).unwrap();
        grid.mark_empty(&[Position::new(2, 1)]).unwrap();
        grid.move_cell(Position::new(0, 1), Position::new(2, 1)).unwrap();
        assert!(!grid.get(0, 1).unwrap().occupied);
        assert_eq!(grid.get(2, 1).unwrap().special, SpecialKind::Key);
        assert_eq!(grid.find_special(SpecialKind::Key), Some(Position::new(2, 1)));
    }

    #[test]
    fn test_adjacency_includes_diagonals() {
        let hero = Position::new(3, 3);
        assert!(hero.is_adjacent(Position::new(4, 4)));
        assert!(hero.is_adjacent(Position::new(2, 3)));
        assert!(hero.is_adjacent(hero));
        assert!(!hero.is_adjacent(Position::new(5, 3)));
        assert!(!hero.is_adjacent(Position::new(1, 4)));
    }

    #[test]
    fn test_display_marks_empties() {
        let mut grid = checker();
        grid.mark_empty(&[Position::new(1, 1)]).unwrap();
        assert_eq!(grid.to_string(), "010\n1.1\n010\n");
    }
}
