#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the tower defence engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative session world, and pure systems. Adapters submit [`Command`]
//! values describing requested transactions, the world executes them through
//! its `apply` entry point, and then reports the outcome as [`Event`] values.
//! Rejected commands surface as a [`TransactionError`] and leave the world
//! untouched. Presentation layers consume events through the
//! [`SessionObserver`] contract.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unit of currency used by the economy.
pub type Money = u32;

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Translates the cell by the provided offset, returning `None` on overflow.
    #[must_use]
    pub fn offset(self, offset: CellOffset) -> Option<CellCoord> {
        Some(CellCoord::new(
            self.column.checked_add(offset.column)?,
            self.row.checked_add(offset.row)?,
        ))
    }
}

/// Offset of a footprint cell relative to the anchor of a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellOffset {
    column: u32,
    row: u32,
}

impl CellOffset {
    /// Creates a new footprint offset.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Column distance from the anchor.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Row distance from the anchor.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

/// Unique identifier assigned to a planted tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tower identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a static tower definition within the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefinitionId(u32);

impl DefinitionId {
    /// Creates a new definition identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the definition identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier the external enemy engine assigns to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the enemy identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Logical occupancy of a grid cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Occupancy {
    /// No tower claims the cell.
    #[default]
    Empty,
    /// The cell is claimed by the referenced tower.
    Occupied {
        /// Tower holding the claim. Lookup only, the registry owns the tower.
        tower: TowerId,
    },
}

impl Occupancy {
    /// Reports whether a tower claims the cell.
    #[must_use]
    pub const fn is_occupied(&self) -> bool {
        matches!(self, Self::Occupied { .. })
    }

    /// Tower holding the claim, if any.
    #[must_use]
    pub const fn tower(&self) -> Option<TowerId> {
        match self {
            Self::Empty => None,
            Self::Occupied { tower } => Some(*tower),
        }
    }
}

/// Transient presentation hint shown while the player hovers a placement.
///
/// Hints never influence [`Occupancy`]; the two are stored side by side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AffordanceHint {
    /// No highlight.
    #[default]
    Default,
    /// The hovered placement would be accepted.
    AvailableForPlant,
    /// The hovered placement would be rejected.
    UnavailableForPlant,
}

/// Phase of the session state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Waiting for the player to start the current wave.
    AwaitingWaveStart,
    /// Enemies of the current wave are on the field.
    WaveInProgress,
    /// Every wave was cleared. Terminal.
    Won,
    /// All lives were lost. Terminal.
    Lost,
}

impl SessionState {
    /// Reports whether the session has ended.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }

    /// Outcome of the session once terminal.
    #[must_use]
    pub const fn outcome(&self) -> Option<SessionOutcome> {
        match self {
            Self::Won => Some(SessionOutcome::Won),
            Self::Lost => Some(SessionOutcome::Lost),
            Self::AwaitingWaveStart | Self::WaveInProgress => None,
        }
    }
}

/// Final result of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionOutcome {
    /// The last wave was cleared with lives remaining.
    Won,
    /// The last life was lost.
    Lost,
}

/// Group of identical enemies spawned as part of a wave.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnemySpawn {
    /// Enemy archetype understood by the enemy engine.
    pub enemy: String,
    /// Number of enemies of this archetype.
    pub count: u32,
}

/// Static roster of a single wave.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaveDefinition {
    /// Spawn groups in the order the enemy engine should release them.
    #[serde(default)]
    pub enemies: Vec<EnemySpawn>,
}

impl WaveDefinition {
    /// Total number of enemies in the wave.
    #[must_use]
    pub fn enemy_count(&self) -> u32 {
        self.enemies
            .iter()
            .fold(0u32, |total, spawn| total.saturating_add(spawn.count))
    }
}

/// Static description of a buildable tower.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TowerDefinition {
    /// Catalog identifier.
    pub id: DefinitionId,
    /// Display name.
    pub name: String,
    /// Cost of building the tower or upgrading into it.
    pub price: Money,
    /// Cells covered by the tower relative to its anchor cell.
    pub footprint: Vec<CellOffset>,
    /// Definitions an instance of this tower may be upgraded into.
    #[serde(default)]
    pub upgrades: Vec<DefinitionId>,
}

impl TowerDefinition {
    /// Refund granted when a tower of this definition is sold.
    ///
    /// Sale returns half the price, truncated.
    #[must_use]
    pub const fn sale_value(&self) -> Money {
        self.price / 2
    }

    /// Cells covered when the tower is anchored at `anchor`.
    ///
    /// Returns `None` if any footprint cell would overflow the coordinate space.
    #[must_use]
    pub fn footprint_at(&self, anchor: CellCoord) -> Option<Vec<CellCoord>> {
        self.footprint
            .iter()
            .map(|offset| anchor.offset(*offset))
            .collect()
    }

    /// Reports whether the definition may be upgraded into `target`.
    #[must_use]
    pub fn offers_upgrade(&self, target: DefinitionId) -> bool {
        self.upgrades.contains(&target)
    }
}

/// Largest number of cells a session grid may contain.
pub const MAX_GRID_CELLS: u64 = 1 << 20;

/// Dimensions of the placement grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridConfig {
    /// Number of columns.
    pub columns: u32,
    /// Number of rows.
    pub rows: u32,
}

impl GridConfig {
    /// Total number of cells covered by the grid.
    #[must_use]
    pub fn cell_count(&self) -> u64 {
        u64::from(self.columns) * u64::from(self.rows)
    }
}

/// Static inputs required to start a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Lives available at the start of the session.
    pub max_lives: u32,
    /// Money available at the start of the session.
    pub starting_money: Money,
    /// Placement grid dimensions.
    pub grid: GridConfig,
    /// Catalog of buildable and upgrade tower definitions.
    pub towers: Vec<TowerDefinition>,
    /// Wave roster table indexed by wave.
    pub waves: Vec<WaveDefinition>,
}

/// Requests accepted by the session world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Plants a new tower on the provided cells.
    Build {
        /// Definition of the tower to build.
        definition: DefinitionId,
        /// Cells the tower will occupy.
        cells: Vec<CellCoord>,
    },
    /// Replaces an existing tower with one of its upgrade definitions.
    Upgrade {
        /// Tower being replaced.
        tower: TowerId,
        /// Definition of the replacement tower.
        definition: DefinitionId,
    },
    /// Sells a tower for half its price and frees its cells.
    Sell {
        /// Tower being sold.
        tower: TowerId,
    },
    /// Removes the most recently planted tower without a refund.
    RemoveLast,
    /// Starts the current wave.
    StartWave,
    /// Reports that an enemy reached the goal.
    EnemyLeaked {
        /// Enemy that leaked.
        enemy: EnemyId,
    },
    /// Mirrors the enemy engine's count of active enemies.
    LiveEnemyCountChanged {
        /// Number of enemies currently alive.
        count: u32,
    },
    /// Updates the presentation hint of a single cell.
    SetAffordance {
        /// Cell receiving the hint.
        cell: CellCoord,
        /// Hint to display.
        hint: AffordanceHint,
    },
}

/// Notifications broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The money balance changed.
    MoneyChanged {
        /// Balance after the change.
        balance: Money,
    },
    /// The lives counter changed.
    LivesChanged {
        /// Lives remaining after the change.
        lives: u32,
    },
    /// A wave started; the enemy engine should spawn its roster.
    WaveStarted {
        /// Zero-based index of the started wave.
        wave: usize,
        /// Total number of waves in the session.
        total: usize,
        /// Enemies the wave releases.
        roster: WaveDefinition,
    },
    /// The session is waiting for the player to start the indicated wave.
    WaveAdvanced {
        /// Zero-based index of the next wave.
        wave: usize,
        /// Total number of waves in the session.
        total: usize,
    },
    /// The session reached a terminal state.
    SessionEnded {
        /// Final result.
        outcome: SessionOutcome,
    },
    /// A tower now occupies the listed cells.
    TowerPlaced {
        /// Identifier assigned to the tower.
        tower: TowerId,
        /// Definition the tower was built from.
        definition: DefinitionId,
        /// Cells occupied by the tower.
        cells: Vec<CellCoord>,
    },
    /// A tower left the registry.
    TowerRemoved {
        /// Identifier of the removed tower.
        tower: TowerId,
    },
    /// The presentation hint of a cell changed.
    AffordanceChanged {
        /// Cell whose hint changed.
        cell: CellCoord,
        /// Hint now displayed.
        hint: AffordanceHint,
    },
}

/// Reasons a transaction is rejected. The world is unchanged after any of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum TransactionError {
    /// The balance does not cover the price.
    #[error("insufficient funds: price {price} exceeds balance {balance}")]
    InsufficientFunds {
        /// Price that was requested.
        price: Money,
        /// Balance at the time of the request.
        balance: Money,
    },
    /// At least one requested cell is occupied, outside the grid, or the set is empty.
    #[error("requested cells are unavailable")]
    CellsUnavailable,
    /// The current wave is the last one.
    #[error("no more waves")]
    NoMoreWaves,
    /// The session already reached a terminal state.
    #[error("session ended: {outcome:?}")]
    SessionEnded {
        /// Final result of the session.
        outcome: SessionOutcome,
    },
    /// No planted tower carries the identifier.
    #[error("unknown tower {0:?}")]
    UnknownTowerId(TowerId),
    /// The catalog has no definition with the identifier.
    #[error("unknown tower definition {0:?}")]
    UnknownDefinitionId(DefinitionId),
    /// A wave is already running.
    #[error("a wave is already in progress")]
    WaveInProgress,
    /// The tower's definition does not list the requested upgrade.
    #[error("tower {tower:?} cannot be upgraded into {definition:?}")]
    UpgradeNotOffered {
        /// Tower that was to be upgraded.
        tower: TowerId,
        /// Requested target definition.
        definition: DefinitionId,
    },
}

/// Reasons a [`SessionConfig`] cannot start a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum ConfigError {
    /// The grid has no cells.
    #[error("grid must contain at least one cell")]
    EmptyGrid,
    /// The grid holds more than [`MAX_GRID_CELLS`] cells.
    #[error("grid of {columns}x{rows} cells exceeds the limit of {MAX_GRID_CELLS}")]
    GridTooLarge {
        /// Requested number of columns.
        columns: u32,
        /// Requested number of rows.
        rows: u32,
    },
    /// The session starts without any lives.
    #[error("session requires at least one life")]
    NoLives,
    /// The wave table is empty.
    #[error("session requires at least one wave")]
    NoWaves,
    /// Two catalog entries share an identifier.
    #[error("duplicate tower definition {0:?}")]
    DuplicateDefinition(DefinitionId),
    /// A definition covers no cells.
    #[error("tower definition {0:?} has an empty footprint")]
    EmptyFootprint(DefinitionId),
    /// A definition lists an upgrade that is not in the catalog.
    #[error("tower definition {definition:?} upgrades into unknown {target:?}")]
    UnknownUpgradeTarget {
        /// Definition listing the upgrade.
        definition: DefinitionId,
        /// Missing upgrade target.
        target: DefinitionId,
    },
}

/// Contract implemented by presentation adapters that consume world events.
///
/// Every method defaults to a no-op so adapters only implement what they display.
pub trait SessionObserver {
    /// Balance display should show `balance`.
    fn money_changed(&mut self, _balance: Money) {}

    /// Lives display should show `lives`.
    fn lives_changed(&mut self, _lives: u32) {}

    /// The enemy engine should spawn `roster` for wave `wave`.
    fn wave_started(&mut self, _wave: usize, _total: usize, _roster: &WaveDefinition) {}

    /// A "start next wave" affordance for `wave` should be offered.
    fn wave_advanced(&mut self, _wave: usize, _total: usize) {}

    /// The session finished.
    fn session_ended(&mut self, _outcome: SessionOutcome) {}

    /// A tower appeared on `cells`.
    fn tower_placed(&mut self, _tower: TowerId, _definition: DefinitionId, _cells: &[CellCoord]) {}

    /// A tower disappeared.
    fn tower_removed(&mut self, _tower: TowerId) {}

    /// A cell's highlight changed.
    fn affordance_changed(&mut self, _cell: CellCoord, _hint: AffordanceHint) {}
}

/// Forwards each event to the matching observer method in order.
pub fn dispatch<O>(events: &[Event], observer: &mut O)
where
    O: SessionObserver + ?Sized,
{
    for event in events {
        match event {
            Event::MoneyChanged { balance } => observer.money_changed(*balance),
            Event::LivesChanged { lives } => observer.lives_changed(*lives),
            Event::WaveStarted {
                wave,
                total,
                roster,
            } => observer.wave_started(*wave, *total, roster),
            Event::WaveAdvanced { wave, total } => observer.wave_advanced(*wave, *total),
            Event::SessionEnded { outcome } => observer.session_ended(*outcome),
            Event::TowerPlaced {
                tower,
                definition,
                cells,
            } => observer.tower_placed(*tower, *definition, cells),
            Event::TowerRemoved { tower } => observer.tower_removed(*tower),
            Event::AffordanceChanged { cell, hint } => observer.affordance_changed(*cell, *hint),
        }
    }
}
