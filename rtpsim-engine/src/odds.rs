//! Closed-form match odds used to sanity-check simulated results.
use crate::numbers::decimal_to_f64;
use crate::rules::{GameRules, PrizePayout};

/// Natural log of the binomial coefficient `C(n, k)`.
fn ln_choose(n: u32, k: u32) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    let k = k.min(n - k);
    (0..k).fold(0.0, |acc, i| {
        acc + f64::from(n - i).ln() - f64::from(i + 1).ln()
    })
}

/// Probability that a bet of `selection` numbers shares exactly `matches`
/// numbers with a draw of `selection` numbers from a pool of `pool`.
#[must_use]
pub fn match_probability(pool: u32, selection: u32, matches: u32) -> f64 {
    if selection > pool || matches > selection {
        return 0.0;
    }
    let misses = selection - matches;
    if misses > pool - selection {
        return 0.0;
    }
    let ln_p = ln_choose(selection, matches) + ln_choose(pool - selection, misses)
        - ln_choose(pool, selection);
    ln_p.exp()
}

/// Per-tier theoretical win probability, in prize-level order.
#[must_use]
pub fn level_probabilities(rules: &GameRules) -> Vec<f64> {
    rules
        .prize_levels()
        .iter()
        .map(|level| {
            match_probability(rules.pool_size(), rules.selection_count(), level.match_condition)
        })
        .collect()
}

/// Expected return of the fixed-prize tiers alone, as a fraction of the
/// ticket price. Pool-share tiers depend on the jackpot and are excluded.
#[must_use]
pub fn theoretical_fixed_rtp(rules: &GameRules) -> f64 {
    let price = decimal_to_f64(rules.ticket_price());
    if price <= 0.0 {
        return 0.0;
    }
    rules
        .prize_levels()
        .iter()
        .zip(level_probabilities(rules))
        .filter_map(|(level, probability)| match level.payout {
            PrizePayout::Fixed { amount } => Some(probability * decimal_to_f64(amount)),
            PrizePayout::PoolShare { .. } => None,
        })
        .sum::<f64>()
        / price
}
