//! Gravity resolution: collapse surviving tiles into holes, then refill from the top.

use crate::error::GridError;
use crate::grid::{Grid, Position};
use crate::random::TileSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileMove {
    pub from: Position,
    pub to: Position,
}

impl TileMove {
    /// Rows travelled; always positive since tiles only fall.
    pub fn distance(&self) -> usize {
        self.to.row - self.from.row
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRefill {
    pub col: usize,
    pub count: usize,
}

/// What one resolve pass did to the grid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub moves: Vec<TileMove>,
    pub refills: Vec<ColumnRefill>,
    /// New tiles in placement order: per column, bottommost first.
    pub spawned: Vec<(Position, u8)>,
}

impl Resolution {
    /// Nothing moved and nothing was refilled.
    pub fn is_stable(&self) -> bool {
        self.moves.is_empty() && self.refills.is_empty()
    }

    pub fn refilled_cells(&self) -> usize {
        self.refills.iter().map(|r| r.count).sum()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GravityResolver;

impl GravityResolver {
    /// Run one collapse-and-refill pass over `grid`, mutating it in place.
    pub fn resolve(grid: &mut Grid, source: &mut dyn TileSource) -> Result<Resolution, GridError> {
        let size = grid.size();
        let mut out = Resolution::default();

        // Bottom row never moves; scan upward so everything below is already settled.
        for row in (0..size.saturating_sub(1)).rev() {
            for col in 0..size {
                if !grid.get(row, col)?.occupied {
                    continue;
                }
                let holes = grid.count_empty_below(row, col);
                if holes == 0 {
                    continue;
                }
                let from = Position::new(row, col);
                let to = Position::new(row + holes, col);
                grid.move_cell(from, to)?;
                out.moves.push(TileMove { from, to });
            }
        }

        for col in 0..size {
            let top = grid.count_empty_in_column(col);
            if top == 0 {
                continue;
            }
            for row in (0..top).rev() {
                let pos = Position::new(row, col);
                let tile = source.next_tile_type();
                grid.fill(pos, tile)?;
                out.spawned.push((pos, tile % grid.tile_kinds()));
            }
            out.refills.push(ColumnRefill { col, count: top });
        }

        if !out.is_stable() {
            tracing::debug!(
                moves = out.moves.len(),
                refilled = out.refilled_cells(),
                "gravity pass"
            );
        }
        Ok(out)
    }
}

/// True when no column has an empty cell underneath an occupied one.
pub fn is_settled(grid: &Grid) -> bool {
    let size = grid.size();
    (0..size).all(|col| {
        let mut seen_occupied = false;
        for row in 0..size {
            let occupied = grid.get(row, col).map(|c| c.occupied).unwrap_or(false);
            if occupied {
                seen_occupied = true;
            } else if seen_occupied {
                return false;
            }
        }
        true
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::SpecialKind;
    use crate::random::SequenceSource;

    fn column(grid: &Grid, col: usize) -> Vec<Option<u8>> {
        (0..grid.size())
            .map(|r| {
                let c = grid.get(r, col).unwrap();
                c.occupied.then_some(c.tile)
            })
            .collect()
    }

    #[test]
    fn test_full_grid_is_stable() {
        let mut grid = Grid::from_rows(&[&[0, 1, 2], &[1, 2, 0], &[2, 0, 1]], 3).unwrap();
        let mut src = SequenceSource::new(vec![0]);
        let res = GravityResolver::resolve(&mut grid, &mut src).unwrap();
        assert!(res.is_stable());
        assert_eq!(res.refilled_cells(), 0);
    }

    #[test]
    fn test_collapse_preserves_order() {
        let mut grid = Grid::from_rows(
            &[&[0, 0, 0, 0], &[1, 0, 0, 0], &[2, 0, 0, 0], &[3, 0, 0, 0]],
            4,
        )
        .unwrap();
        grid.mark_empty(&[Position::new(1, 0), Position::new(3, 0)])
            .unwrap();
        let mut src = SequenceSource::new(vec![3]);
        let res = GravityResolver::resolve(&mut grid, &mut src).unwrap();

        assert_eq!(
            res.moves,
            vec![
                TileMove {
                    from: Position::new(2, 0),
                    to: Position::new(3, 0)
                },
                TileMove {
                    from: Position::new(0, 0),
                    to: Position::new(2, 0)
                },
            ]
        );
        assert_eq!(res.refills, vec![ColumnRefill { col: 0, count: 2 }]);
        assert_eq!(column(&grid, 0), vec![Some(3), Some(3), Some(0), Some(2)]);
        assert!(is_settled(&grid));
        assert!(grid.is_full());
    }

    #[test]
    fn test_refill_places_bottommost_first() {
        let mut grid = Grid::from_rows(&[&[0, 1, 1], &[0, 1, 1], &[0, 1, 1]], 4).unwrap();
        grid.mark_empty(&[Position::new(0, 0), Position::new(1, 0), Position::new(2, 0)])
            .unwrap();
        let mut src = SequenceSource::new(vec![1, 2, 3]);
        let res = GravityResolver::resolve(&mut grid, &mut src).unwrap();
        assert!(res.moves.is_empty());
        assert_eq!(
            res.spawned,
            vec![
                (Position::new(2, 0), 1),
                (Position::new(1, 0), 2),
                (Position::new(0, 0), 3),
            ]
        );
    }

    #[test]
    fn test_markers_fall_with_their_tile() {
        let mut grid = Grid::from_rows(&[&[0, 1, 2], &[1, 2, 0], &[2, 0, 1]], 3).unwrap();
        grid.set_special(0, 2, SpecialKind::LockedDoor).unwrap();
        grid.mark_empty(&[Position::new(1, 2), Position::new(2, 2)])
            .unwrap();
        let mut src = SequenceSource::new(vec![0]);
        GravityResolver::resolve(&mut grid, &mut src).unwrap();
        assert_eq!(grid.get(2, 2).unwrap().special, SpecialKind::LockedDoor);
        assert_eq!(grid.get(0, 2).unwrap().special, SpecialKind::None);
    }

    #[test]
    fn test_no_tile_moves_up() {
        let mut src = SequenceSource::new(vec![0, 1, 2, 3, 1, 2]);
        let mut grid = Grid::new(6, 4, &mut src).unwrap();
        grid.mark_empty(&[
            Position::new(5, 0),
            Position::new(2, 1),
            Position::new(3, 1),
            Position::new(5, 5),
            Position::new(0, 5),
        ])
        .unwrap();
        let res = GravityResolver::resolve(&mut grid, &mut src).unwrap();
        assert!(res.moves.iter().all(|m| m.to.row > m.from.row && m.to.col == m.from.col));
        assert_eq!(res.refilled_cells(), 5);
        assert!(is_settled(&grid));
    }
}
