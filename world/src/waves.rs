//! Wave index bookkeeping and clear detection.

use tower_defence_core::TransactionError;

#[derive(Clone, Debug)]
pub(crate) struct WaveProgression {
    current: usize,
    total: usize,
    live_enemies: u32,
    active: bool,
}

impl WaveProgression {
    /// Creates progression over `total` waves. Callers guarantee `total >= 1`.
    pub(crate) fn new(total: usize) -> Self {
        Self {
            current: 0,
            total,
            live_enemies: 0,
            active: false,
        }
    }

    pub(crate) fn current(&self) -> usize {
        self.current
    }

    pub(crate) fn total(&self) -> usize {
        self.total
    }

    pub(crate) fn live_enemies(&self) -> u32 {
        self.live_enemies
    }

    pub(crate) fn is_last(&self) -> bool {
        self.current + 1 >= self.total
    }

    /// Marks the current wave as spawned.
    pub(crate) fn begin(&mut self) {
        self.active = true;
    }

    /// Mirrors the enemy engine's count. Returns `true` when the active wave
    /// has just been cleared.
    pub(crate) fn on_live_enemy_count_changed(&mut self, count: u32) -> bool {
        self.live_enemies = count;
        if count == 0 && self.active {
            self.active = false;
            return true;
        }
        false
    }

    pub(crate) fn advance(&mut self) -> Result<usize, TransactionError> {
        if self.is_last() {
            return Err(TransactionError::NoMoreWaves);
        }
        self.current += 1;
        Ok(self.current)
    }
}
