//! Presentation adapter that reports session notifications through `tracing`.

use tower_defence_core::{
    AffordanceHint, CellCoord, DefinitionId, Money, SessionObserver, SessionOutcome, TowerId,
    WaveDefinition,
};

/// Logs every notification and remembers how the session ended.
#[derive(Debug, Default)]
pub(crate) struct LoggingObserver {
    outcome: Option<SessionOutcome>,
}

impl LoggingObserver {
    /// Outcome announced by the session, if it ended.
    pub(crate) fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome
    }
}

impl SessionObserver for LoggingObserver {
    fn money_changed(&mut self, balance: Money) {
        tracing::info!(balance, "money changed");
    }

    fn lives_changed(&mut self, lives: u32) {
        tracing::info!(lives, "lives changed");
    }

    fn wave_started(&mut self, wave: usize, total: usize, roster: &WaveDefinition) {
        tracing::info!(
            wave = wave + 1,
            total,
            enemies = roster.enemy_count(),
            "spawn wave"
        );
    }

    fn wave_advanced(&mut self, wave: usize, total: usize) {
        tracing::info!(wave = wave + 1, total, "ready to start wave");
    }

    fn session_ended(&mut self, outcome: SessionOutcome) {
        self.outcome = Some(outcome);
        tracing::info!(?outcome, "session ended");
    }

    fn tower_placed(&mut self, tower: TowerId, definition: DefinitionId, cells: &[CellCoord]) {
        tracing::info!(
            tower = tower.get(),
            definition = definition.get(),
            cells = cells.len(),
            "tower placed"
        );
    }

    fn tower_removed(&mut self, tower: TowerId) {
        tracing::info!(tower = tower.get(), "tower removed");
    }

    fn affordance_changed(&mut self, cell: CellCoord, hint: AffordanceHint) {
        tracing::debug!(column = cell.column(), row = cell.row(), ?hint, "cell highlight");
    }
}
