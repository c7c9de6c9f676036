//! Flood-fill match search.

use std::collections::HashSet;

use crate::error::GridError;
use crate::grid::{Grid, Position};

/// Default removal threshold: a region must hold more than this many cells.
pub const DEFAULT_THRESHOLD: usize = 2;

/// Expansion order: +col, -col, +row, -row.
const NEIGHBOURS_4: [(isize, isize); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// Connected same-valued cells in discovery order. No duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    cells: Vec<Position>,
    members: HashSet<Position>,
}

impl Region {
    fn push(&mut self, pos: Position) -> bool {
        if self.members.insert(pos) {
            self.cells.push(pos);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.members.contains(&pos)
    }

    pub fn positions(&self) -> &[Position] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchFinder {
    threshold: usize,
}

impl Default for MatchFinder {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl MatchFinder {
    pub fn new(threshold: usize) -> Result<Self, GridError> {
        if threshold == 0 {
            return Err(GridError::InvalidConfig(
                "match threshold must be at least 1".into(),
            ));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// True when the region is large enough to be removed (strictly above threshold).
    pub fn qualifies(&self, region: &Region) -> bool {
        region.len() > self.threshold
    }

    /// 4-directional depth-first flood fill from `seed`.
    ///
    /// Uses an explicit stack, visiting cells in the same pre-order a recursive
    /// fill would. An unoccupied seed yields an empty region.
    pub fn find_region(&self, grid: &Grid, seed: Position) -> Result<Region, GridError> {
        let seed_cell = grid.at(seed)?;
        let mut region = Region::default();
        if !seed_cell.occupied {
            return Ok(region);
        }
        let value = seed_cell.match_value();

        let mut stack = vec![seed];
        while let Some(pos) = stack.pop() {
            if region.contains(pos) {
                continue;
            }
            let cell = grid.at(pos)?;
            if !cell.occupied || cell.match_value() != value {
                continue;
            }
            region.push(pos);
            // reversed so the first direction is popped first
            for &(dr, dc) in NEIGHBOURS_4.iter().rev() {
                let (Some(row), Some(col)) = (
                    pos.row.checked_add_signed(dr),
                    pos.col.checked_add_signed(dc),
                ) else {
                    continue;
                };
                if grid.contains(row, col) && !region.contains(Position::new(row, col)) {
                    stack.push(Position::new(row, col));
                }
            }
        }
        Ok(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::SpecialKind;

    fn grid(rows: &[&[u8]]) -> Grid {
        Grid::from_rows(rows, 4).unwrap()
    }

    /// No in-bounds occupied neighbour with the same value is left out.
    fn assert_maximal(grid: &Grid, region: &Region) {
        let value = grid.at(region.positions()[0]).unwrap().match_value();
        for &p in region.positions() {
            assert_eq!(grid.at(p).unwrap().match_value(), value);
            for (dr, dc) in NEIGHBOURS_4 {
                let (Some(r), Some(c)) = (p.row.checked_add_signed(dr), p.col.checked_add_signed(dc))
                else {
                    continue;
                };
                if let Ok(cell) = grid.get(r, c) {
                    if cell.occupied && cell.match_value() == value {
                        assert!(region.contains(Position::new(r, c)));
                    }
                }
            }
        }
    }

    #[test]
    fn test_threshold_must_be_positive() {
        assert!(MatchFinder::new(0).is_err());
        assert_eq!(MatchFinder::new(3).unwrap().threshold(), 3);
    }

    #[test]
    fn test_region_order_is_depth_first() {
        let g = grid(&[&[1, 1, 0], &[1, 0, 0], &[1, 1, 2]]);
        let region = MatchFinder::default()
            .find_region(&g, Position::new(0, 0))
            .unwrap();
        assert_eq!(
            region.positions(),
            &[
                Position::new(0, 0),
                Position::new(0, 1),
                Position::new(1, 0),
                Position::new(2, 0),
                Position::new(2, 1),
            ]
        );
        assert_maximal(&g, &region);
    }

    #[test]
    fn test_no_diagonal_expansion() {
        let g = grid(&[&[1, 0, 0], &[0, 1, 0], &[0, 0, 1]]);
        let region = MatchFinder::default()
            .find_region(&g, Position::new(1, 1))
            .unwrap();
        assert_eq!(region.len(), 1);
    }

    #[test]
    fn test_loop_does_not_duplicate() {
        let g = grid(&[&[2, 2, 2], &[2, 0, 2], &[2, 2, 2]]);
        let region = MatchFinder::default()
            .find_region(&g, Position::new(0, 0))
            .unwrap();
        assert_eq!(region.len(), 8);
        let unique: HashSet<_> = region.positions().iter().collect();
        assert_eq!(unique.len(), 8);
        assert_maximal(&g, &region);
    }

    #[test]
    fn test_empty_seed_is_a_no_op() {
        let mut g = grid(&[&[1, 1, 1], &[1, 1, 1], &[1, 1, 1]]);
        g.mark_empty(&[Position::new(1, 1)]).unwrap();
        let region = MatchFinder::default()
            .find_region(&g, Position::new(1, 1))
            .unwrap();
        assert!(region.is_empty());
        // the hole splits nothing, but is never part of a region
        let region = MatchFinder::default()
            .find_region(&g, Position::new(0, 0))
            .unwrap();
        assert_eq!(region.len(), 8);
        assert!(!region.contains(Position::new(1, 1)));
    }

    #[test]
    fn test_seed_out_of_bounds() {
        let g = grid(&[&[1, 1, 1], &[1, 1, 1], &[1, 1, 1]]);
        assert!(matches!(
            MatchFinder::default().find_region(&g, Position::new(0, 3)),
            Err(GridError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_locked_cells_break_regions() {
        let mut g = grid(&[&[1, 1, 1], &[0, 0, 0], &[0, 0, 0]]);
        g.set_special(0, 1, SpecialKind::Key).unwrap();
        let finder = MatchFinder::default();
        let region = finder.find_region(&g, Position::new(0, 0)).unwrap();
        assert_eq!(region.len(), 1);
        let key = finder.find_region(&g, Position::new(0, 1)).unwrap();
        assert_eq!(key.positions(), &[Position::new(0, 1)]);
    }

    #[test]
    fn test_threshold_boundary() {
        let finder = MatchFinder::default();
        let g = grid(&[&[1, 1, 0], &[0, 2, 2], &[3, 2, 0]]);
        let pair = finder.find_region(&g, Position::new(0, 0)).unwrap();
        assert_eq!(pair.len(), 2);
        assert!(!finder.qualifies(&pair));
        let triple = finder.find_region(&g, Position::new(1, 1)).unwrap();
        assert_eq!(triple.len(), 3);
        assert!(finder.qualifies(&triple));
    }
}
