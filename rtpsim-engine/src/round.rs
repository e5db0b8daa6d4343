//! One simulated round: population, draw, matching, funding, and payouts.
use std::sync::Arc;

use rand::Rng;
use rand::seq::index;
use rust_decimal::Decimal;
use serde::Serialize;
use smallvec::SmallVec;

use crate::config::RunParams;
use crate::jackpot::{FundingRecord, JackpotState, apply_round_funding, settle_jackpot_hit};
use crate::numbers::{checked, checked_div, ratio};
use crate::rules::{ConfigurationError, GameRules, PrizePayout};
use crate::seed::RngStreams;

/// Winning combination of a round, sorted ascending.
pub type WinningNumbers = SmallVec<[u32; 8]>;

/// Payout outcome of one prize tier in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelOutcome {
    pub level: u32,
    pub winners: u64,
    pub per_winner: Decimal,
    pub amount: Decimal,
}

/// Everything that happened in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundResult {
    pub round: u64,
    pub players: u64,
    pub bets: u64,
    pub winning_players: u64,
    pub total_bet_amount: Decimal,
    pub total_payout: Decimal,
    /// One entry per prize tier, in prize-level order.
    pub levels: Vec<LevelOutcome>,
    pub jackpot_hit: bool,
    pub jackpot_after: JackpotState,
    pub funding: FundingRecord,
    pub winning_numbers: WinningNumbers,
    pub rtp: Decimal,
}

impl RoundResult {
    #[must_use]
    pub const fn jackpot_balance_after(&self) -> Decimal {
        self.jackpot_after.balance
    }
}

/// Plays rounds of one game in order, owning the run's jackpot and RNG streams.
#[derive(Debug)]
pub struct RoundSimulator {
    rules: Arc<GameRules>,
    params: RunParams,
    jackpot: JackpotState,
    streams: RngStreams,
    /// Prize tier index for each possible match count.
    tier_by_matches: Vec<Option<usize>>,
    winning_mask: Vec<bool>,
    rounds_played: u64,
}

impl RoundSimulator {
    #[must_use]
    pub fn new(rules: Arc<GameRules>, params: RunParams, seed: u64) -> Self {
        let mut tier_by_matches = vec![None; rules.selection_count() as usize + 1];
        for (idx, level) in rules.prize_levels().iter().enumerate() {
            if let Some(slot) = tier_by_matches.get_mut(level.match_condition as usize) {
                *slot = Some(idx);
            }
        }
        Self {
            jackpot: JackpotState::initial(rules.jackpot()),
            winning_mask: vec![false; rules.pool_size() as usize],
            streams: RngStreams::from_user_seed(seed),
            rules,
            params,
            tier_by_matches,
            rounds_played: 0,
        }
    }

    #[must_use]
    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    #[must_use]
    pub const fn jackpot(&self) -> &JackpotState {
        &self.jackpot
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.streams.seed()
    }

    #[must_use]
    pub const fn rounds_played(&self) -> u64 {
        self.rounds_played
    }

    /// Total random draws consumed so far across all streams.
    #[must_use]
    pub const fn rng_draws(&self) -> u64 {
        self.streams.total_draws()
    }

    /// Simulate the next round.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` when funding or payout arithmetic leaves
    /// the decimal range. The jackpot state is left as it was before the round.
    pub fn play_round(&mut self) -> Result<RoundResult, ConfigurationError> {
        let winning_numbers = self.draw_winning_numbers();

        let pool = self.rules.pool_size() as usize;
        let selection = self.rules.selection_count() as usize;
        let (players_min, players_max) = self.params.players_range;
        let (bets_min, bets_max) = self.params.bets_range;

        let mut tier_winners = vec![0_u64; self.rules.prize_levels().len()];
        let players = self.streams.population().gen_range(players_min..=players_max);
        let mut bets: u64 = 0;
        let mut winning_players: u64 = 0;

        for _ in 0..players {
            let bet_count = self.streams.population().gen_range(bets_min..=bets_max);
            bets += u64::from(bet_count);
            let mut player_won = false;
            for _ in 0..bet_count {
                let picks = index::sample(self.streams.tickets(), pool, selection);
                let matches = picks
                    .iter()
                    .filter(|&idx| self.winning_mask[idx])
                    .count();
                if let Some(tier) = self.tier_by_matches[matches] {
                    tier_winners[tier] += 1;
                    player_won = true;
                }
            }
            if player_won {
                winning_players += 1;
            }
        }

        let total_bet_amount = checked(
            Decimal::from(bets).checked_mul(self.rules.ticket_price()),
            "total bet amount",
        )?;
        let (funding, mut next_jackpot) =
            apply_round_funding(total_bet_amount, self.rules.jackpot(), &self.jackpot)?;

        let mut levels = Vec::with_capacity(tier_winners.len());
        let mut total_payout = Decimal::ZERO;
        let mut jackpot_hit = false;

        for (level, &winners) in self.rules.prize_levels().iter().zip(&tier_winners) {
            let per_winner = if winners == 0 {
                Decimal::ZERO
            } else {
                match level.payout {
                    PrizePayout::Fixed { amount } => amount,
                    PrizePayout::PoolShare { .. } if self.rules.jackpot().enabled => {
                        let cfg = self.rules.jackpot();
                        let (base, reset) = settle_jackpot_hit(&next_jackpot, cfg);
                        let share = checked_div(base, Decimal::from(winners), "jackpot share")?;
                        let bonus = cfg.jackpot_fixed_prize.unwrap_or(Decimal::ZERO);
                        log::debug!(
                            "jackpot hit in round {}: {winners} winner(s) split {base}",
                            self.rounds_played + 1
                        );
                        next_jackpot = reset;
                        jackpot_hit = true;
                        checked(share.checked_add(bonus), "jackpot payout")?
                    }
                    PrizePayout::PoolShare { percentage } => {
                        let tier_pool = checked(
                            total_bet_amount.checked_mul(percentage),
                            "pool share",
                        )?;
                        checked_div(tier_pool, Decimal::from(winners), "pool share")?
                    }
                }
            };
            let amount = checked(
                per_winner.checked_mul(Decimal::from(winners)),
                "tier payout",
            )?;
            total_payout = checked(total_payout.checked_add(amount), "total payout")?;
            levels.push(LevelOutcome {
                level: level.level,
                winners,
                per_winner,
                amount,
            });
        }

        self.jackpot = next_jackpot;
        self.rounds_played += 1;

        Ok(RoundResult {
            round: self.rounds_played,
            players: u64::from(players),
            bets,
            winning_players,
            total_bet_amount,
            total_payout,
            levels,
            jackpot_hit,
            jackpot_after: next_jackpot,
            funding,
            winning_numbers,
            rtp: ratio(total_payout, total_bet_amount),
        })
    }

    fn draw_winning_numbers(&mut self) -> WinningNumbers {
        self.winning_mask.fill(false);
        let pool = self.rules.pool_size() as usize;
        let selection = self.rules.selection_count() as usize;
        let (min_number, _) = self.rules.number_range();

        let mut numbers: WinningNumbers = index::sample(self.streams.draw(), pool, selection)
            .iter()
            .map(|idx| {
                self.winning_mask[idx] = true;
                // idx < pool <= MAX_NUMBER_POOL, so the cast is lossless
                min_number + idx as u32
            })
            .collect();
        numbers.sort_unstable();
        numbers
    }
}
