#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative session state for the tower defence engine.
//!
//! The [`World`] owns the grid, the economy, wave progression and the tower
//! registry. Every mutation goes through one of its transactional operations
//! (or [`apply`]), which either completes entirely and appends notifications
//! to the caller's event buffer, or fails with a [`TransactionError`] and
//! leaves the world exactly as it was.

mod economy;
mod grid;
mod towers;
mod waves;

use tower_defence_core::{
    AffordanceHint, CellCoord, Command, ConfigError, DefinitionId, EnemyId, Event, Money,
    SessionConfig, SessionOutcome, SessionState, TowerId, TransactionError, WaveDefinition,
    MAX_GRID_CELLS,
};

use economy::{Economy, LifeLoss};
use grid::Grid;
use towers::TowerRegistry;
use waves::WaveProgression;

/// Represents the authoritative state of one play session.
#[derive(Debug)]
pub struct World {
    state: SessionState,
    max_lives: u32,
    grid: Grid,
    economy: Economy,
    waves: WaveProgression,
    rosters: Vec<WaveDefinition>,
    registry: TowerRegistry,
}

impl World {
    /// Creates a session awaiting the first wave.
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        let SessionConfig {
            max_lives,
            starting_money,
            grid,
            towers,
            waves,
        } = config;

        if grid.columns == 0 || grid.rows == 0 {
            return Err(ConfigError::EmptyGrid);
        }
        if grid.cell_count() > MAX_GRID_CELLS {
            return Err(ConfigError::GridTooLarge {
                columns: grid.columns,
                rows: grid.rows,
            });
        }
        if max_lives == 0 {
            return Err(ConfigError::NoLives);
        }
        if waves.is_empty() {
            return Err(ConfigError::NoWaves);
        }
        let registry = TowerRegistry::new(towers)?;

        Ok(Self {
            state: SessionState::AwaitingWaveStart,
            max_lives,
            grid: Grid::new(grid.columns, grid.rows),
            economy: Economy::new(max_lives, starting_money),
            waves: WaveProgression::new(waves.len()),
            rosters: waves,
            registry,
        })
    }

    /// Emits the current balance, lives and wave so a freshly attached
    /// presentation layer can initialise its displays.
    pub fn announce(&self, out_events: &mut Vec<Event>) {
        out_events.push(Event::MoneyChanged {
            balance: self.economy.money(),
        });
        out_events.push(Event::LivesChanged {
            lives: self.economy.lives(),
        });
        match self.state.outcome() {
            Some(outcome) => out_events.push(Event::SessionEnded { outcome }),
            None if self.state == SessionState::AwaitingWaveStart => {
                out_events.push(Event::WaveAdvanced {
                    wave: self.waves.current(),
                    total: self.waves.total(),
                });
            }
            None => {}
        }
    }

    /// Plants a tower of `definition` on `cells`.
    pub fn build(
        &mut self,
        definition: DefinitionId,
        cells: &[CellCoord],
        out_events: &mut Vec<Event>,
    ) -> Result<TowerId, TransactionError> {
        self.ensure_active()?;
        let tower = self.registry.build(
            definition,
            cells,
            &mut self.grid,
            &mut self.economy,
            out_events,
        )?;
        tracing::debug!(?tower, ?definition, money = self.economy.money(), "tower built");
        Ok(tower)
    }

    /// Replaces `tower` with a new tower of `definition` on the same cells.
    ///
    /// The full price of the new definition is charged; nothing is refunded
    /// for the replaced tower.
    pub fn upgrade(
        &mut self,
        tower: TowerId,
        definition: DefinitionId,
        out_events: &mut Vec<Event>,
    ) -> Result<TowerId, TransactionError> {
        self.ensure_active()?;
        let replacement = self.registry.upgrade(
            tower,
            definition,
            &mut self.grid,
            &mut self.economy,
            out_events,
        )?;
        tracing::debug!(
            ?tower,
            ?replacement,
            ?definition,
            money = self.economy.money(),
            "tower upgraded"
        );
        Ok(replacement)
    }

    /// Sells `tower`, returning the refunded amount.
    pub fn sell(
        &mut self,
        tower: TowerId,
        out_events: &mut Vec<Event>,
    ) -> Result<Money, TransactionError> {
        self.ensure_active()?;
        let refund = self
            .registry
            .sell(tower, &mut self.grid, &mut self.economy, out_events)?;
        tracing::debug!(?tower, refund, money = self.economy.money(), "tower sold");
        Ok(refund)
    }

    /// Removes the most recently planted tower without a refund.
    pub fn remove_last(
        &mut self,
        out_events: &mut Vec<Event>,
    ) -> Result<Option<TowerId>, TransactionError> {
        self.ensure_active()?;
        let removed = self.registry.remove_last(&mut self.grid, out_events);
        tracing::debug!(?removed, "last tower removed");
        Ok(removed)
    }

    /// Starts the current wave and asks the enemy engine to spawn its roster.
    pub fn start_wave(&mut self, out_events: &mut Vec<Event>) -> Result<usize, TransactionError> {
        self.ensure_active()?;
        if self.state == SessionState::WaveInProgress {
            return Err(TransactionError::WaveInProgress);
        }

        let wave = self.waves.current();
        self.waves.begin();
        self.state = SessionState::WaveInProgress;
        tracing::info!(wave, total = self.waves.total(), "wave started");
        out_events.push(Event::WaveStarted {
            wave,
            total: self.waves.total(),
            roster: self.rosters.get(wave).cloned().unwrap_or_default(),
        });
        Ok(wave)
    }

    /// Records an enemy reaching the goal. Ignored outside a running wave.
    pub fn enemy_leaked(&mut self, enemy: EnemyId, out_events: &mut Vec<Event>) {
        if self.state != SessionState::WaveInProgress {
            tracing::debug!(?enemy, state = ?self.state, "leak ignored");
            return;
        }

        match self.economy.lose_life(out_events) {
            LifeLoss::Remaining => {
                tracing::debug!(?enemy, lives = self.economy.lives(), "enemy leaked");
            }
            LifeLoss::Depleted | LifeLoss::AlreadyDepleted => {
                self.end(SessionOutcome::Lost, out_events);
            }
        }
    }

    /// Mirrors the enemy engine's active count and resolves a cleared wave.
    pub fn live_enemy_count_changed(&mut self, count: u32, out_events: &mut Vec<Event>) {
        let cleared = self.waves.on_live_enemy_count_changed(count);
        if !cleared || self.state != SessionState::WaveInProgress {
            return;
        }

        if self.waves.is_last() {
            self.end(SessionOutcome::Won, out_events);
            return;
        }

        if let Ok(wave) = self.waves.advance() {
            self.state = SessionState::AwaitingWaveStart;
            tracing::info!(wave, total = self.waves.total(), "wave cleared");
            out_events.push(Event::WaveAdvanced {
                wave,
                total: self.waves.total(),
            });
        }
    }

    /// Updates the presentation hint of `cell`. Occupancy is unaffected.
    pub fn set_affordance(
        &mut self,
        cell: CellCoord,
        hint: AffordanceHint,
        out_events: &mut Vec<Event>,
    ) -> Result<(), TransactionError> {
        if self.grid.set_affordance(cell, hint)? {
            out_events.push(Event::AffordanceChanged { cell, hint });
        }
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), TransactionError> {
        match self.state.outcome() {
            Some(outcome) => Err(TransactionError::SessionEnded { outcome }),
            None => Ok(()),
        }
    }

    fn end(&mut self, outcome: SessionOutcome, out_events: &mut Vec<Event>) {
        self.state = match outcome {
            SessionOutcome::Won => SessionState::Won,
            SessionOutcome::Lost => SessionState::Lost,
        };
        tracing::info!(?outcome, wave = self.waves.current(), "session ended");
        out_events.push(Event::SessionEnded { outcome });
    }
}

/// Applies the provided command to the world.
///
/// Inbound signals from the enemy engine never fail; player transactions
/// report their rejection reason and leave the world untouched.
pub fn apply(
    world: &mut World,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), TransactionError> {
    match command {
        Command::Build { definition, cells } => {
            let _ = world.build(definition, &cells, out_events)?;
        }
        Command::Upgrade { tower, definition } => {
            let _ = world.upgrade(tower, definition, out_events)?;
        }
        Command::Sell { tower } => {
            let _ = world.sell(tower, out_events)?;
        }
        Command::RemoveLast => {
            let _ = world.remove_last(out_events)?;
        }
        Command::StartWave => {
            let _ = world.start_wave(out_events)?;
        }
        Command::EnemyLeaked { enemy } => world.enemy_leaked(enemy, out_events),
        Command::LiveEnemyCountChanged { count } => {
            world.live_enemy_count_changed(count, out_events);
        }
        Command::SetAffordance { cell, hint } => world.set_affordance(cell, hint, out_events)?,
    }
    Ok(())
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::World;
    use tower_defence_core::{
        AffordanceHint, CellCoord, DefinitionId, Money, Occupancy, SessionState,
        TowerDefinition, TowerId,
    };

    /// Current phase of the session state machine.
    #[must_use]
    pub fn state(world: &World) -> SessionState {
        world.state
    }

    /// Current money balance.
    #[must_use]
    pub fn money(world: &World) -> Money {
        world.economy.money()
    }

    /// Lives remaining.
    #[must_use]
    pub fn lives(world: &World) -> u32 {
        world.economy.lives()
    }

    /// Lives the session started with.
    #[must_use]
    pub fn max_lives(world: &World) -> u32 {
        world.max_lives
    }

    /// Reports whether the balance covers `price`.
    #[must_use]
    pub fn can_afford(world: &World, price: Money) -> bool {
        world.economy.can_afford(price)
    }

    /// Snapshot of wave progression.
    #[must_use]
    pub fn wave(world: &World) -> WaveStatus {
        WaveStatus {
            current: world.waves.current(),
            total: world.waves.total(),
            live_enemies: world.waves.live_enemies(),
        }
    }

    /// Dimensions of the placement grid as `(columns, rows)`.
    #[must_use]
    pub fn grid_dimensions(world: &World) -> (u32, u32) {
        world.grid.dimensions()
    }

    /// Occupancy and hint of a cell, or `None` outside the grid.
    #[must_use]
    pub fn cell(world: &World, cell: CellCoord) -> Option<CellSnapshot> {
        let occupancy = world.grid.occupancy(cell)?;
        let hint = world.grid.hint(cell)?;
        Some(CellSnapshot { occupancy, hint })
    }

    /// Reports whether the cell lies inside the grid and holds no tower.
    #[must_use]
    pub fn is_free(world: &World, cell: CellCoord) -> bool {
        world.grid.is_free(cell)
    }

    /// Tower occupying the provided cell, if any.
    #[must_use]
    pub fn tower_at(world: &World, cell: CellCoord) -> Option<TowerId> {
        world.grid.occupancy(cell).and_then(|occupancy| occupancy.tower())
    }

    /// Snapshot of a single planted tower.
    #[must_use]
    pub fn tower(world: &World, tower: TowerId) -> Option<TowerSnapshot> {
        world.registry.tower(tower).map(|state| TowerSnapshot {
            id: state.id,
            definition: state.definition,
            cells: state.cells.clone(),
        })
    }

    /// Captures every planted tower in identifier order.
    #[must_use]
    pub fn towers(world: &World) -> Vec<TowerSnapshot> {
        world
            .registry
            .iter()
            .map(|state| TowerSnapshot {
                id: state.id,
                definition: state.definition,
                cells: state.cells.clone(),
            })
            .collect()
    }

    /// Looks up a catalog entry.
    #[must_use]
    pub fn definition(world: &World, definition: DefinitionId) -> Option<&TowerDefinition> {
        world.registry.definition(definition)
    }

    /// Iterates the catalog in identifier order.
    pub fn catalog(world: &World) -> impl Iterator<Item = &TowerDefinition> {
        world.registry.catalog()
    }

    /// Wave progression as seen by the session.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct WaveStatus {
        /// Zero-based index of the current wave.
        pub current: usize,
        /// Total number of waves.
        pub total: usize,
        /// Last count reported by the enemy engine.
        pub live_enemies: u32,
    }

    /// Both dimensions of a cell's state.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CellSnapshot {
        /// Logical claim on the cell.
        pub occupancy: Occupancy,
        /// Presentation hint.
        pub hint: AffordanceHint,
    }

    /// Immutable representation of a planted tower.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct TowerSnapshot {
        /// Identifier allocated by the world.
        pub id: TowerId,
        /// Catalog entry the tower was built from.
        pub definition: DefinitionId,
        /// Cells claimed by the tower.
        pub cells: Vec<CellCoord>,
    }
}
