//! Money and lives counters.

use tower_defence_core::{Event, Money, TransactionError};

/// Result of removing a life.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LifeLoss {
    /// Lives remain after the loss.
    Remaining,
    /// The loss took the last life.
    Depleted,
    /// Lives were already at zero; nothing changed.
    AlreadyDepleted,
}

#[derive(Clone, Debug)]
pub(crate) struct Economy {
    lives: u32,
    money: Money,
}

impl Economy {
    pub(crate) fn new(max_lives: u32, starting_money: Money) -> Self {
        Self {
            lives: max_lives,
            money: starting_money,
        }
    }

    pub(crate) fn lives(&self) -> u32 {
        self.lives
    }

    pub(crate) fn money(&self) -> Money {
        self.money
    }

    pub(crate) fn can_afford(&self, price: Money) -> bool {
        self.money >= price
    }

    pub(crate) fn charge(
        &mut self,
        price: Money,
        out_events: &mut Vec<Event>,
    ) -> Result<Money, TransactionError> {
        if !self.can_afford(price) {
            return Err(TransactionError::InsufficientFunds {
                price,
                balance: self.money,
            });
        }
        self.money -= price;
        out_events.push(Event::MoneyChanged {
            balance: self.money,
        });
        Ok(self.money)
    }

    pub(crate) fn credit(&mut self, amount: Money, out_events: &mut Vec<Event>) -> Money {
        self.money = self.money.saturating_add(amount);
        out_events.push(Event::MoneyChanged {
            balance: self.money,
        });
        self.money
    }

    /// Reverts a charge whose transaction failed. Emits nothing because the
    /// charge's own notification is discarded with the transaction.
    pub(crate) fn restore(&mut self, amount: Money) {
        self.money = self.money.saturating_add(amount);
    }

    /// Removes one life, clamped at zero.
    pub(crate) fn lose_life(&mut self, out_events: &mut Vec<Event>) -> LifeLoss {
        if self.lives == 0 {
            return LifeLoss::AlreadyDepleted;
        }
        self.lives -= 1;
        out_events.push(Event::LivesChanged { lives: self.lives });
        if self.lives == 0 {
            LifeLoss::Depleted
        } else {
            LifeLoss::Remaining
        }
    }
}
