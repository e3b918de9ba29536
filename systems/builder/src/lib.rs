#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure placement system that turns adapter input into session commands.
//!
//! The system highlights the hovered footprint through affordance hints and
//! emits build, sell and upgrade requests. It never inspects the world
//! directly; adapters provide a [`PlacementPreview`] and a tower lookup.

use std::collections::BTreeMap;

use tower_defence_core::{
    AffordanceHint, CellCoord, Command, DefinitionId, Event, TowerDefinition, TowerId,
};

/// Declarative placement preview describing a potential tower construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacementPreview {
    /// Definition proposed for placement.
    pub definition: DefinitionId,
    /// Anchor cell of the footprint.
    pub anchor: CellCoord,
    /// Footprint cells that fall inside the grid.
    pub cells: Vec<CellCoord>,
    /// Indicates whether the session would accept the placement.
    pub placeable: bool,
}

impl PlacementPreview {
    /// Evaluates `definition` anchored at `anchor`.
    ///
    /// The placement is acceptable when every footprint cell lies inside
    /// `bounds` (columns, rows), `is_free` accepts each of them, and the
    /// player can afford the price.
    #[must_use]
    pub fn evaluate<F>(
        definition: &TowerDefinition,
        anchor: CellCoord,
        bounds: (u32, u32),
        affordable: bool,
        mut is_free: F,
    ) -> Self
    where
        F: FnMut(CellCoord) -> bool,
    {
        let (columns, rows) = bounds;
        let footprint = definition.footprint_at(anchor).unwrap_or_default();
        let cells: Vec<CellCoord> = footprint
            .iter()
            .copied()
            .filter(|cell| cell.column() < columns && cell.row() < rows)
            .collect();
        let placeable = affordable
            && !footprint.is_empty()
            && cells.len() == footprint.len()
            && cells.iter().all(|cell| is_free(*cell));

        Self {
            definition: definition.id,
            anchor,
            cells,
            placeable,
        }
    }
}

/// Input snapshot distilled from adapter-provided frame input data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuilderInput {
    /// Indicates whether the player confirmed a placement on this frame.
    pub confirm_action: bool,
    /// Indicates whether the player requested to sell the hovered tower.
    pub sell_action: bool,
    /// Upgrade chosen for the hovered tower on this frame.
    pub upgrade_to: Option<DefinitionId>,
    /// Cell currently hovered by the cursor.
    pub cursor_cell: Option<CellCoord>,
}

/// Placement system that translates preview + input into session commands.
#[derive(Debug, Clone)]
pub struct Builder {
    session_open: bool,
    highlighted: BTreeMap<CellCoord, AffordanceHint>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Creates a new builder system instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            session_open: true,
            highlighted: BTreeMap::new(),
        }
    }

    /// Consumes world events and adapter-derived input to emit commands.
    ///
    /// The `tower_at` closure should mirror the semantics of the world's
    /// `query::tower_at` helper so the system can identify the hovered tower.
    pub fn handle<F>(
        &mut self,
        events: &[Event],
        preview: Option<PlacementPreview>,
        input: BuilderInput,
        mut tower_at: F,
        out: &mut Vec<Command>,
    ) where
        F: FnMut(CellCoord) -> Option<TowerId>,
    {
        for event in events {
            if let Event::SessionEnded { .. } = event {
                self.session_open = false;
            }
        }

        if !self.session_open {
            self.highlight(&BTreeMap::new(), out);
            return;
        }

        let desired: BTreeMap<CellCoord, AffordanceHint> = preview
            .as_ref()
            .map(|preview| {
                let hint = if preview.placeable {
                    AffordanceHint::AvailableForPlant
                } else {
                    AffordanceHint::UnavailableForPlant
                };
                preview.cells.iter().map(|cell| (*cell, hint)).collect()
            })
            .unwrap_or_default();
        self.highlight(&desired, out);

        if input.confirm_action {
            if let Some(preview) = preview.filter(|preview| preview.placeable) {
                out.push(Command::Build {
                    definition: preview.definition,
                    cells: preview.cells,
                });
            }
        }

        let hovered_tower = input.cursor_cell.and_then(&mut tower_at);
        if let Some(tower) = hovered_tower {
            if let Some(definition) = input.upgrade_to {
                out.push(Command::Upgrade { tower, definition });
            } else if input.sell_action {
                out.push(Command::Sell { tower });
            }
        }
    }

    fn highlight(&mut self, desired: &BTreeMap<CellCoord, AffordanceHint>, out: &mut Vec<Command>) {
        for cell in self.highlighted.keys() {
            if !desired.contains_key(cell) {
                out.push(Command::SetAffordance {
                    cell: *cell,
                    hint: AffordanceHint::Default,
                });
            }
        }
        for (cell, hint) in desired {
            if self.highlighted.get(cell) != Some(hint) {
                out.push(Command::SetAffordance {
                    cell: *cell,
                    hint: *hint,
                });
            }
        }
        self.highlighted = desired.clone();
    }
}
