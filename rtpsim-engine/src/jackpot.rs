//! Jackpot accrual, seller-return bookkeeping, and reset-on-hit.
//!
//! While the jackpot is in [`JackpotPhase::Funding`] part of every wager is
//! returned to the seller who pre-funded the initial jackpot, capped at the
//! initial amount. Once the seller has been made whole the jackpot moves to
//! [`JackpotPhase::PostReturn`] and accrues at the post-return rate. A jackpot
//! hit resets the cycle.
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::numbers::checked;
use crate::rules::{ConfigurationError, JackpotConfig};

/// Which contribution rate applies to new wagers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JackpotPhase {
    /// Seller is still being repaid for the initial jackpot.
    Funding,
    /// Seller has been repaid; only the pool is funded.
    PostReturn,
}

/// Jackpot balance and funding cycle owned by one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JackpotState {
    pub balance: Decimal,
    pub returned_so_far: Decimal,
    pub phase: JackpotPhase,
}

impl JackpotState {
    /// Fresh cycle seeded with the configured initial amount.
    #[must_use]
    pub const fn initial(cfg: &JackpotConfig) -> Self {
        Self {
            balance: cfg.initial_amount,
            returned_so_far: Decimal::ZERO,
            phase: JackpotPhase::Funding,
        }
    }

    /// Contribution rate applied to the next wager.
    #[must_use]
    pub const fn contribution_rate(&self, cfg: &JackpotConfig) -> Decimal {
        if !cfg.enabled {
            return Decimal::ZERO;
        }
        match self.phase {
            JackpotPhase::Funding => cfg.contribution_rate,
            JackpotPhase::PostReturn => cfg.post_return_contribution_rate,
        }
    }
}

/// Reporting-only split of a round's wagers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FundingRecord {
    pub seller_return: Decimal,
    pub pool_contribution: Decimal,
    pub sales: Decimal,
}

impl FundingRecord {
    /// Sum of the three parts; always equals the wagered amount.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.seller_return + self.pool_contribution + self.sales
    }
}

/// Route a round's wagers through the funding protocol.
///
/// Returns the funding split and the successor state; `state` is not modified.
///
/// # Errors
///
/// Returns `ConfigurationError::Overflow` when an amount leaves the decimal range.
pub fn apply_round_funding(
    total_bet_amount: Decimal,
    cfg: &JackpotConfig,
    state: &JackpotState,
) -> Result<(FundingRecord, JackpotState), ConfigurationError> {
    if !cfg.enabled {
        let record = FundingRecord {
            sales: total_bet_amount,
            ..FundingRecord::default()
        };
        return Ok((record, *state));
    }

    let mut next = *state;
    let record = match state.phase {
        JackpotPhase::Funding => {
            let pool_contribution = checked(
                total_bet_amount.checked_mul(cfg.contribution_rate),
                "pool contribution",
            )?;
            let uncapped = checked(
                total_bet_amount.checked_mul(cfg.return_rate),
                "seller return",
            )?;
            let remaining = (cfg.initial_amount - state.returned_so_far).max(Decimal::ZERO);
            let seller_return = uncapped.min(remaining);
            let sales = checked(
                total_bet_amount
                    .checked_sub(pool_contribution)
                    .and_then(|rest| rest.checked_sub(seller_return)),
                "sales amount",
            )?;

            next.balance = checked(state.balance.checked_add(pool_contribution), "jackpot balance")?;
            next.returned_so_far = checked(
                state.returned_so_far.checked_add(seller_return),
                "seller return total",
            )?;
            if next.returned_so_far >= cfg.initial_amount {
                next.phase = JackpotPhase::PostReturn;
                log::debug!(
                    "seller repaid {} of {}; jackpot enters post-return phase",
                    next.returned_so_far,
                    cfg.initial_amount
                );
            }

            FundingRecord {
                seller_return,
                pool_contribution,
                sales,
            }
        }
        JackpotPhase::PostReturn => {
            let pool_contribution = checked(
                total_bet_amount.checked_mul(cfg.post_return_contribution_rate),
                "pool contribution",
            )?;
            let sales = checked(
                total_bet_amount.checked_sub(pool_contribution),
                "sales amount",
            )?;
            next.balance = checked(state.balance.checked_add(pool_contribution), "jackpot balance")?;

            FundingRecord {
                seller_return: Decimal::ZERO,
                pool_contribution,
                sales,
            }
        }
    };

    Ok((record, next))
}

/// Pay out the jackpot and start a fresh funding cycle.
///
/// The payout base is the balance floored at `min_jackpot`.
#[must_use]
pub fn settle_jackpot_hit(state: &JackpotState, cfg: &JackpotConfig) -> (Decimal, JackpotState) {
    let payout_share_base = state.balance.max(cfg.min_jackpot);
    (payout_share_base, JackpotState::initial(cfg))
}
