//! Occupancy grid recording which tower claims each cell.

use tower_defence_core::{AffordanceHint, CellCoord, Occupancy, TowerId, TransactionError};

#[derive(Clone, Copy, Debug, Default)]
struct Cell {
    occupant: Option<TowerId>,
    hint: AffordanceHint,
}

/// Dense grid of cells. Occupancy and presentation hints are stored side by
/// side so that hint updates can never alter a claim.
#[derive(Clone, Debug)]
pub(crate) struct Grid {
    columns: u32,
    rows: u32,
    cells: Vec<Cell>,
}

impl Grid {
    pub(crate) fn new(columns: u32, rows: u32) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            cells: vec![Cell::default(); capacity],
        }
    }

    pub(crate) fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    pub(crate) fn occupancy(&self, cell: CellCoord) -> Option<Occupancy> {
        self.get(cell).map(|slot| match slot.occupant {
            Some(tower) => Occupancy::Occupied { tower },
            None => Occupancy::Empty,
        })
    }

    pub(crate) fn hint(&self, cell: CellCoord) -> Option<AffordanceHint> {
        self.get(cell).map(|slot| slot.hint)
    }

    /// Reports whether the cell lies inside the grid and is unclaimed.
    pub(crate) fn is_free(&self, cell: CellCoord) -> bool {
        self.get(cell).is_some_and(|slot| slot.occupant.is_none())
    }

    /// Claims every cell for `tower`, or nothing at all.
    pub(crate) fn try_claim(
        &mut self,
        cells: &[CellCoord],
        tower: TowerId,
    ) -> Result<(), TransactionError> {
        if cells.is_empty() || !cells.iter().all(|cell| self.is_free(*cell)) {
            return Err(TransactionError::CellsUnavailable);
        }

        for cell in cells {
            if let Some(slot) = self.get_mut(*cell) {
                slot.occupant = Some(tower);
            }
        }
        Ok(())
    }

    /// Repoints claims held by `from` to `to` without the cells ever becoming empty.
    pub(crate) fn transfer(
        &mut self,
        cells: &[CellCoord],
        from: TowerId,
        to: TowerId,
    ) -> Result<(), TransactionError> {
        let held = cells
            .iter()
            .all(|cell| self.get(*cell).is_some_and(|slot| slot.occupant == Some(from)));
        if !held {
            return Err(TransactionError::CellsUnavailable);
        }

        for cell in cells {
            if let Some(slot) = self.get_mut(*cell) {
                slot.occupant = Some(to);
            }
        }
        Ok(())
    }

    pub(crate) fn release(&mut self, cells: &[CellCoord]) {
        for cell in cells {
            if let Some(slot) = self.get_mut(*cell) {
                slot.occupant = None;
            }
        }
    }

    /// Stores a presentation hint, returning whether it differs from the previous one.
    pub(crate) fn set_affordance(
        &mut self,
        cell: CellCoord,
        hint: AffordanceHint,
    ) -> Result<bool, TransactionError> {
        let slot = self
            .get_mut(cell)
            .ok_or(TransactionError::CellsUnavailable)?;
        if slot.hint == hint {
            return Ok(false);
        }
        slot.hint = hint;
        Ok(true)
    }

    fn get(&self, cell: CellCoord) -> Option<&Cell> {
        self.index(cell).and_then(|index| self.cells.get(index))
    }

    fn get_mut(&mut self, cell: CellCoord) -> Option<&mut Cell> {
        self.index(cell).and_then(|index| self.cells.get_mut(index))
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(coords: &[(u32, u32)]) -> Vec<CellCoord> {
        coords
            .iter()
            .map(|(column, row)| CellCoord::new(*column, *row))
            .collect()
    }

    #[test]
    fn claim_marks_every_cell() {
        let mut grid = Grid::new(4, 4);
        let tower = TowerId::new(1);
        grid.try_claim(&cells(&[(0, 0), (1, 0)]), tower)
            .expect("claim free cells");

        assert_eq!(
            grid.occupancy(CellCoord::new(0, 0)),
            Some(Occupancy::Occupied { tower })
        );
        assert_eq!(
            grid.occupancy(CellCoord::new(1, 0)),
            Some(Occupancy::Occupied { tower })
        );
        assert_eq!(grid.occupancy(CellCoord::new(2, 0)), Some(Occupancy::Empty));
    }

    #[test]
    fn claim_is_all_or_nothing() {
        let mut grid = Grid::new(4, 4);
        grid.try_claim(&cells(&[(1, 1)]), TowerId::new(1))
            .expect("claim free cell");

        let result = grid.try_claim(&cells(&[(0, 1), (1, 1)]), TowerId::new(2));

        assert_eq!(result, Err(TransactionError::CellsUnavailable));
        assert!(
            grid.is_free(CellCoord::new(0, 1)),
            "partial claim must not leak into the grid"
        );
    }

    #[test]
    fn claim_rejects_out_of_bounds_and_empty_sets() {
        let mut grid = Grid::new(2, 2);
        assert_eq!(
            grid.try_claim(&cells(&[(1, 1), (2, 1)]), TowerId::new(1)),
            Err(TransactionError::CellsUnavailable)
        );
        assert_eq!(
            grid.try_claim(&[], TowerId::new(1)),
            Err(TransactionError::CellsUnavailable)
        );
        assert!(grid.is_free(CellCoord::new(1, 1)));
    }

    #[test]
    fn affordance_outside_grid_is_rejected() {
        let mut grid = Grid::new(2, 2);
        assert_eq!(
            grid.set_affordance(CellCoord::new(2, 0), AffordanceHint::AvailableForPlant),
            Err(TransactionError::CellsUnavailable)
        );
        assert_eq!(
            grid.set_affordance(CellCoord::new(1, 1), AffordanceHint::AvailableForPlant),
            Ok(true)
        );
    }

    #[test]
    fn release_is_idempotent() {
        let mut grid = Grid::new(3, 3);
        let claimed = cells(&[(2, 2)]);
        grid.try_claim(&claimed, TowerId::new(4))
            .expect("claim free cell");

        grid.release(&claimed);
        grid.release(&claimed);

        assert_eq!(grid.occupancy(CellCoord::new(2, 2)), Some(Occupancy::Empty));
    }

    #[test]
    fn transfer_requires_existing_claim() {
        let mut grid = Grid::new(3, 3);
        let claimed = cells(&[(0, 0), (0, 1)]);
        grid.try_claim(&claimed, TowerId::new(1))
            .expect("claim free cells");

        assert_eq!(
            grid.transfer(&claimed, TowerId::new(9), TowerId::new(2)),
            Err(TransactionError::CellsUnavailable)
        );
        grid.transfer(&claimed, TowerId::new(1), TowerId::new(2))
            .expect("transfer held cells");

        assert_eq!(
            grid.occupancy(CellCoord::new(0, 1)).and_then(|o| o.tower()),
            Some(TowerId::new(2))
        );
    }

    #[test]
    fn affordance_does_not_touch_occupancy() {
        let mut grid = Grid::new(2, 2);
        let cell = CellCoord::new(0, 0);
        grid.try_claim(&[cell], TowerId::new(3))
            .expect("claim free cell");

        assert_eq!(
            grid.set_affordance(cell, AffordanceHint::AvailableForPlant),
            Ok(true)
        );
        assert_eq!(
            grid.set_affordance(cell, AffordanceHint::AvailableForPlant),
            Ok(false)
        );
        assert_eq!(
            grid.occupancy(cell),
            Some(Occupancy::Occupied {
                tower: TowerId::new(3)
            })
        );
        assert_eq!(grid.hint(cell), Some(AffordanceHint::AvailableForPlant));
    }
}
