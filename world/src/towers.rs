//! Authoritative tower state management utilities.

use std::collections::{BTreeMap, BTreeSet};

use tower_defence_core::{
    CellCoord, ConfigError, DefinitionId, Event, Money, TowerDefinition, TowerId,
    TransactionError,
};

use crate::{economy::Economy, grid::Grid};

/// Snapshot of a tower stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct TowerState {
    /// Identifier allocated by the world for the tower.
    pub(crate) id: TowerId,
    /// Catalog entry the tower was built from.
    pub(crate) definition: DefinitionId,
    /// Cells claimed by the tower, sorted and free of duplicates.
    pub(crate) cells: Vec<CellCoord>,
}

/// Registry that stores planted towers, the static catalog, and identifier allocation.
#[derive(Debug)]
pub(crate) struct TowerRegistry {
    catalog: BTreeMap<DefinitionId, TowerDefinition>,
    entries: BTreeMap<TowerId, TowerState>,
    placement_order: Vec<TowerId>,
    next_tower_id: TowerId,
}

impl TowerRegistry {
    /// Creates an empty registry over a validated catalog.
    pub(crate) fn new(definitions: Vec<TowerDefinition>) -> Result<Self, ConfigError> {
        let mut catalog = BTreeMap::new();
        for definition in definitions {
            if definition.footprint.is_empty() {
                return Err(ConfigError::EmptyFootprint(definition.id));
            }
            let id = definition.id;
            if catalog.insert(id, definition).is_some() {
                return Err(ConfigError::DuplicateDefinition(id));
            }
        }

        for definition in catalog.values() {
            if let Some(target) = definition
                .upgrades
                .iter()
                .find(|target| !catalog.contains_key(*target))
            {
                return Err(ConfigError::UnknownUpgradeTarget {
                    definition: definition.id,
                    target: *target,
                });
            }
        }

        Ok(Self {
            catalog,
            entries: BTreeMap::new(),
            placement_order: Vec::new(),
            next_tower_id: TowerId::new(0),
        })
    }

    pub(crate) fn definition(&self, id: DefinitionId) -> Option<&TowerDefinition> {
        self.catalog.get(&id)
    }

    pub(crate) fn catalog(&self) -> impl Iterator<Item = &TowerDefinition> {
        self.catalog.values()
    }

    pub(crate) fn tower(&self, id: TowerId) -> Option<&TowerState> {
        self.entries.get(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &TowerState> {
        self.entries.values()
    }

    /// Charges for and plants a new tower.
    ///
    /// Affordability is settled before the claim; a failed claim refunds the
    /// charge and discards its notification.
    pub(crate) fn build(
        &mut self,
        definition: DefinitionId,
        cells: &[CellCoord],
        grid: &mut Grid,
        economy: &mut Economy,
        out_events: &mut Vec<Event>,
    ) -> Result<TowerId, TransactionError> {
        let price = self.price_of(definition)?;
        let cells = normalise(cells);

        let mut staged = Vec::new();
        let _ = economy.charge(price, &mut staged)?;

        let tower = self.vacant_id();
        if let Err(error) = grid.try_claim(&cells, tower) {
            economy.restore(price);
            tracing::warn!(?definition, ?cells, "cell claim failed, charge refunded");
            return Err(error);
        }

        self.insert(TowerState {
            id: tower,
            definition,
            cells: cells.clone(),
        });
        out_events.extend(staged);
        out_events.push(Event::TowerPlaced {
            tower,
            definition,
            cells,
        });
        Ok(tower)
    }

    /// Replaces `tower` with a new instance of `definition` on the same cells.
    ///
    /// Cells are repointed in place and never pass through the empty state.
    pub(crate) fn upgrade(
        &mut self,
        tower: TowerId,
        definition: DefinitionId,
        grid: &mut Grid,
        economy: &mut Economy,
        out_events: &mut Vec<Event>,
    ) -> Result<TowerId, TransactionError> {
        let (current, cells) = self
            .entries
            .get(&tower)
            .map(|state| (state.definition, state.cells.clone()))
            .ok_or(TransactionError::UnknownTowerId(tower))?;
        let price = self.price_of(definition)?;
        let offered = self
            .definition(current)
            .is_some_and(|existing| existing.offers_upgrade(definition));
        if !offered {
            return Err(TransactionError::UpgradeNotOffered { tower, definition });
        }

        let mut staged = Vec::new();
        let _ = economy.charge(price, &mut staged)?;

        let replacement = self.vacant_id();
        if let Err(error) = grid.transfer(&cells, tower, replacement) {
            economy.restore(price);
            return Err(error);
        }

        let _ = self.entries.remove(&tower);
        self.placement_order.retain(|id| *id != tower);
        self.insert(TowerState {
            id: replacement,
            definition,
            cells: cells.clone(),
        });

        out_events.extend(staged);
        out_events.push(Event::TowerRemoved { tower });
        out_events.push(Event::TowerPlaced {
            tower: replacement,
            definition,
            cells,
        });
        Ok(replacement)
    }

    /// Refunds half the tower's price, frees its cells and forgets it.
    pub(crate) fn sell(
        &mut self,
        tower: TowerId,
        grid: &mut Grid,
        economy: &mut Economy,
        out_events: &mut Vec<Event>,
    ) -> Result<Money, TransactionError> {
        let definition = self
            .entries
            .get(&tower)
            .map(|state| state.definition)
            .ok_or(TransactionError::UnknownTowerId(tower))?;
        let refund = self
            .definition(definition)
            .map(TowerDefinition::sale_value)
            .ok_or(TransactionError::UnknownDefinitionId(definition))?;

        let Some(state) = self.entries.remove(&tower) else {
            return Err(TransactionError::UnknownTowerId(tower));
        };
        self.placement_order.retain(|id| *id != tower);
        grid.release(&state.cells);

        let _ = economy.credit(refund, out_events);
        out_events.push(Event::TowerRemoved { tower });
        Ok(refund)
    }

    /// Removes the most recently planted tower without a refund.
    pub(crate) fn remove_last(
        &mut self,
        grid: &mut Grid,
        out_events: &mut Vec<Event>,
    ) -> Option<TowerId> {
        let tower = self.placement_order.pop()?;
        if let Some(state) = self.entries.remove(&tower) {
            grid.release(&state.cells);
        }
        out_events.push(Event::TowerRemoved { tower });
        Some(tower)
    }

    fn price_of(&self, definition: DefinitionId) -> Result<Money, TransactionError> {
        self.definition(definition)
            .map(|entry| entry.price)
            .ok_or(TransactionError::UnknownDefinitionId(definition))
    }

    /// Next identifier, at or after `next_tower_id`, not held by a planted tower.
    ///
    /// Any `len + 1` consecutive identifiers contain at least one vacant one,
    /// so the search stays bounded once the counter wraps.
    fn vacant_id(&self) -> TowerId {
        let start = self.next_tower_id.get();
        let mut candidate = start;
        for _ in 0..=self.entries.len() {
            if !self.entries.contains_key(&TowerId::new(candidate)) {
                break;
            }
            candidate = candidate.wrapping_add(1);
        }
        TowerId::new(candidate)
    }

    fn insert(&mut self, state: TowerState) {
        let id = state.id;
        self.next_tower_id = TowerId::new(id.get().wrapping_add(1));
        self.placement_order.push(id);
        if let Some(previous) = self.entries.insert(id, state) {
            tracing::error!(tower = ?previous.id, "tower identifier reused while still planted");
        }
    }
}

fn normalise(cells: &[CellCoord]) -> Vec<CellCoord> {
    cells
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_defence_core::{CellOffset, Occupancy};

    fn definition(id: u32, price: Money, upgrades: &[u32]) -> TowerDefinition {
        TowerDefinition {
            id: DefinitionId::new(id),
            name: format!("tower-{id}"),
            price,
            footprint: vec![CellOffset::new(0, 0)],
            upgrades: upgrades.iter().copied().map(DefinitionId::new).collect(),
        }
    }

    fn setup(money: Money) -> (TowerRegistry, Grid, Economy) {
        let registry = TowerRegistry::new(vec![
            definition(1, 40, &[2]),
            definition(2, 75, &[]),
        ])
        .expect("valid catalog");
        (registry, Grid::new(6, 6), Economy::new(3, money))
    }

    #[test]
    fn catalog_rejects_duplicate_definitions() {
        let result = TowerRegistry::new(vec![definition(1, 10, &[]), definition(1, 20, &[])]);
        assert_eq!(
            result.err(),
            Some(ConfigError::DuplicateDefinition(DefinitionId::new(1)))
        );
    }

    #[test]
    fn catalog_rejects_unknown_upgrade_targets() {
        let result = TowerRegistry::new(vec![definition(1, 10, &[7])]);
        assert_eq!(
            result.err(),
            Some(ConfigError::UnknownUpgradeTarget {
                definition: DefinitionId::new(1),
                target: DefinitionId::new(7),
            })
        );
    }

    #[test]
    fn catalog_rejects_empty_footprint() {
        let mut empty = definition(3, 10, &[]);
        empty.footprint.clear();
        assert_eq!(
            TowerRegistry::new(vec![empty]).err(),
            Some(ConfigError::EmptyFootprint(DefinitionId::new(3)))
        );
    }

    #[test]
    fn failed_claim_refunds_charge_silently() {
        let (mut registry, mut grid, mut economy) = setup(100);
        let mut events = Vec::new();
        let cell = CellCoord::new(1, 1);
        let _ = registry
            .build(DefinitionId::new(1), &[cell], &mut grid, &mut economy, &mut events)
            .expect("first build");
        events.clear();

        let result = registry.build(
            DefinitionId::new(1),
            &[cell],
            &mut grid,
            &mut economy,
            &mut events,
        );

        assert_eq!(result, Err(TransactionError::CellsUnavailable));
        assert_eq!(economy.money(), 60);
        assert!(events.is_empty(), "rolled back build must not notify");
    }

    #[test]
    fn duplicate_cells_collapse_into_one_claim() {
        let (mut registry, mut grid, mut economy) = setup(100);
        let mut events = Vec::new();
        let cell = CellCoord::new(2, 2);

        let tower = registry
            .build(
                DefinitionId::new(1),
                &[cell, cell],
                &mut grid,
                &mut economy,
                &mut events,
            )
            .expect("build");

        assert_eq!(registry.tower(tower).map(|t| t.cells.clone()), Some(vec![cell]));
    }

    #[test]
    fn upgrade_rejects_targets_not_offered() {
        let (mut registry, mut grid, mut economy) = setup(500);
        let mut events = Vec::new();
        let tower = registry
            .build(
                DefinitionId::new(2),
                &[CellCoord::new(0, 0)],
                &mut grid,
                &mut economy,
                &mut events,
            )
            .expect("build");
        events.clear();

        let result = registry.upgrade(
            tower,
            DefinitionId::new(1),
            &mut grid,
            &mut economy,
            &mut events,
        );

        assert_eq!(
            result,
            Err(TransactionError::UpgradeNotOffered {
                tower,
                definition: DefinitionId::new(1),
            })
        );
        assert_eq!(economy.money(), 425);
        assert!(events.is_empty());
    }

    #[test]
    fn wrapped_identifiers_skip_planted_towers() {
        let (mut registry, mut grid, mut economy) = setup(500);
        let mut events = Vec::new();
        let first_cell = CellCoord::new(0, 0);
        let first = registry
            .build(DefinitionId::new(1), &[first_cell], &mut grid, &mut economy, &mut events)
            .expect("first build");
        registry.next_tower_id = TowerId::new(u32::MAX);

        let last = registry
            .build(
                DefinitionId::new(1),
                &[CellCoord::new(1, 0)],
                &mut grid,
                &mut economy,
                &mut events,
            )
            .expect("build at the last identifier");
        let wrapped = registry
            .build(
                DefinitionId::new(1),
                &[CellCoord::new(2, 0)],
                &mut grid,
                &mut economy,
                &mut events,
            )
            .expect("build after wrapping");

        assert_eq!(last, TowerId::new(u32::MAX));
        assert_eq!(first, TowerId::new(0));
        assert_eq!(wrapped, TowerId::new(1));

        let _ = registry
            .sell(wrapped, &mut grid, &mut economy, &mut events)
            .expect("sell");
        assert_eq!(
            grid.occupancy(first_cell),
            Some(Occupancy::Occupied { tower: first })
        );
        assert_eq!(grid.occupancy(CellCoord::new(2, 0)), Some(Occupancy::Empty));
        assert!(registry.tower(first).is_some());
    }

    #[test]
    fn remove_last_follows_placement_order() {
        let (mut registry, mut grid, mut economy) = setup(500);
        let mut events = Vec::new();
        let first = registry
            .build(
                DefinitionId::new(1),
                &[CellCoord::new(0, 0)],
                &mut grid,
                &mut economy,
                &mut events,
            )
            .expect("first build");
        let second = registry
            .build(
                DefinitionId::new(1),
                &[CellCoord::new(1, 0)],
                &mut grid,
                &mut economy,
                &mut events,
            )
            .expect("second build");
        let upgraded = registry
            .upgrade(first, DefinitionId::new(2), &mut grid, &mut economy, &mut events)
            .expect("upgrade");

        assert_eq!(registry.remove_last(&mut grid, &mut events), Some(upgraded));
        assert_eq!(registry.remove_last(&mut grid, &mut events), Some(second));
        assert_eq!(registry.remove_last(&mut grid, &mut events), None);
        assert_eq!(grid.occupancy(CellCoord::new(0, 0)), Some(Occupancy::Empty));
        assert_eq!(economy.money(), 500 - 40 - 40 - 75);
    }
}
