//! Game rule documents and the validated, immutable rule model.
//!
//! Configuration arrives as a loosely typed [`GameConfigDoc`] (the shape the
//! dashboard stores). [`GameRules::from_doc`] checks every field, collects all
//! violations at once, and produces a model where each prize tier carries a
//! tagged [`PrizePayout`] instead of two nullable fields.
use std::collections::HashSet;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_CONTRIBUTION_RATE, DEFAULT_POST_RETURN_CONTRIBUTION_RATE, DEFAULT_RETURN_RATE,
    MAX_NUMBER_POOL,
};
use crate::numbers::decimal_from_f64;

/// Family of game a rule set describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    #[default]
    Lottery,
    Scratch,
    Slot,
    Custom,
}

/// Prize tier as written in a configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrizeLevelDoc {
    pub level: i64,
    pub name: String,
    pub match_condition: i64,
    #[serde(default)]
    pub fixed_prize: Option<f64>,
    #[serde(default)]
    pub prize_percentage: Option<f64>,
}

/// Jackpot section of a configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JackpotDoc {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub initial_amount: f64,
    #[serde(default = "JackpotDoc::default_contribution_rate")]
    pub contribution_rate: f64,
    #[serde(default = "JackpotDoc::default_post_return_contribution_rate")]
    pub post_return_contribution_rate: f64,
    #[serde(default = "JackpotDoc::default_return_rate")]
    pub return_rate: f64,
    #[serde(default)]
    pub jackpot_fixed_prize: Option<f64>,
    #[serde(default)]
    pub min_jackpot: f64,
}

impl JackpotDoc {
    #[must_use]
    pub const fn default_contribution_rate() -> f64 {
        DEFAULT_CONTRIBUTION_RATE
    }

    #[must_use]
    pub const fn default_post_return_contribution_rate() -> f64 {
        DEFAULT_POST_RETURN_CONTRIBUTION_RATE
    }

    #[must_use]
    pub const fn default_return_rate() -> f64 {
        DEFAULT_RETURN_RATE
    }
}

impl Default for JackpotDoc {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_amount: 0.0,
            contribution_rate: Self::default_contribution_rate(),
            post_return_contribution_rate: Self::default_post_return_contribution_rate(),
            return_rate: Self::default_return_rate(),
            jackpot_fixed_prize: None,
            min_jackpot: 0.0,
        }
    }
}

/// Raw game configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfigDoc {
    #[serde(default = "GameConfigDoc::default_name")]
    pub name: String,
    #[serde(default)]
    pub game_type: GameType,
    #[serde(default)]
    pub description: Option<String>,
    pub number_range: (i64, i64),
    pub selection_count: i64,
    pub ticket_price: f64,
    #[serde(default)]
    pub prize_levels: Vec<PrizeLevelDoc>,
    #[serde(default)]
    pub jackpot: JackpotDoc,
}

impl GameConfigDoc {
    #[must_use]
    pub fn default_name() -> String {
        "unnamed game".to_string()
    }

    /// Validate the document into an immutable rule model.
    ///
    /// # Errors
    ///
    /// Returns every violation found in the document.
    pub fn validate(&self) -> Result<GameRules, ValidationError> {
        GameRules::from_doc(self)
    }
}

/// How a prize tier pays each of its winners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrizePayout {
    /// Fixed amount per winner.
    Fixed { amount: Decimal },
    /// Share of a pool: the jackpot when enabled, otherwise the round's sales.
    PoolShare { percentage: Decimal },
}

impl PrizePayout {
    #[must_use]
    pub const fn is_pool_share(&self) -> bool {
        matches!(self, Self::PoolShare { .. })
    }
}

/// A validated prize tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrizeLevel {
    pub level: u32,
    pub name: String,
    pub match_condition: u32,
    pub payout: PrizePayout,
}

/// Validated jackpot parameters with rates held as exact decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JackpotConfig {
    pub enabled: bool,
    pub initial_amount: Decimal,
    pub contribution_rate: Decimal,
    pub post_return_contribution_rate: Decimal,
    pub return_rate: Decimal,
    pub jackpot_fixed_prize: Option<Decimal>,
    pub min_jackpot: Decimal,
}

impl JackpotConfig {
    /// A disabled jackpot with no funding.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            initial_amount: Decimal::ZERO,
            contribution_rate: Decimal::ZERO,
            post_return_contribution_rate: Decimal::ZERO,
            return_rate: Decimal::ZERO,
            jackpot_fixed_prize: None,
            min_jackpot: Decimal::ZERO,
        }
    }
}

/// Immutable, validated rules for one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameRules {
    name: String,
    game_type: GameType,
    description: Option<String>,
    number_range: (u32, u32),
    selection_count: u32,
    ticket_price: Decimal,
    prize_levels: Vec<PrizeLevel>,
    jackpot: JackpotConfig,
}

impl GameRules {
    /// Validate a configuration document, reporting every violation found.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` listing each offending field.
    pub fn from_doc(doc: &GameConfigDoc) -> Result<Self, ValidationError> {
        let mut report = ViolationReport::default();

        let number_range = validate_number_range(doc.number_range, &mut report);
        let selection_count =
            validate_selection_count(doc.selection_count, number_range, &mut report);
        let ticket_price = report.positive_decimal("ticket_price", doc.ticket_price);
        let prize_levels = validate_prize_levels(&doc.prize_levels, selection_count, &mut report);
        let jackpot = validate_jackpot(&doc.jackpot, &mut report);

        if let (Some(levels), Some(jackpot)) = (prize_levels.as_ref(), jackpot.as_ref()) {
            validate_jackpot_tier(levels, jackpot, &mut report);
        }

        report.finish()?;
        match (number_range, selection_count, ticket_price, prize_levels, jackpot) {
            (Some(number_range), Some(selection_count), Some(ticket_price), Some(prize_levels), Some(jackpot)) => {
                Ok(Self {
                    name: doc.name.clone(),
                    game_type: doc.game_type,
                    description: doc.description.clone(),
                    number_range,
                    selection_count,
                    ticket_price,
                    prize_levels,
                    jackpot,
                })
            }
            _ => Err(ValidationError::single("game_config", "document could not be validated")),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn game_type(&self) -> GameType {
        self.game_type
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub const fn number_range(&self) -> (u32, u32) {
        self.number_range
    }

    /// Count of numbers in the draw universe.
    #[must_use]
    pub const fn pool_size(&self) -> u32 {
        self.number_range.1 - self.number_range.0 + 1
    }

    #[must_use]
    pub const fn selection_count(&self) -> u32 {
        self.selection_count
    }

    #[must_use]
    pub const fn ticket_price(&self) -> Decimal {
        self.ticket_price
    }

    /// Prize tiers in payout priority order.
    #[must_use]
    pub fn prize_levels(&self) -> &[PrizeLevel] {
        &self.prize_levels
    }

    #[must_use]
    pub const fn jackpot(&self) -> &JackpotConfig {
        &self.jackpot
    }

    /// Index of the tier carrying a pool share, if any.
    #[must_use]
    pub fn pool_share_index(&self) -> Option<usize> {
        self.prize_levels
            .iter()
            .position(|level| level.payout.is_pool_share())
    }
}

/// Validate a configuration document without keeping the result around.
///
/// # Errors
///
/// Returns every violation found in the document.
pub fn validate_config(doc: &GameConfigDoc) -> Result<GameRules, ValidationError> {
    GameRules::from_doc(doc)
}

fn validate_number_range(range: (i64, i64), report: &mut ViolationReport) -> Option<(u32, u32)> {
    let (min, max) = range;
    let before = report.len();
    if min < 1 {
        report.push("number_range", format!("minimum must be at least 1 (got {min})"));
    }
    if min >= max {
        report.push(
            "number_range",
            format!("minimum must be less than maximum (got {min}..{max})"),
        );
    }
    if report.len() > before {
        return None;
    }
    let pool = u64::try_from(max - min + 1).unwrap_or(u64::MAX);
    if pool > MAX_NUMBER_POOL {
        report.push(
            "number_range",
            format!("pool of {pool} numbers exceeds the limit of {MAX_NUMBER_POOL}"),
        );
        return None;
    }
    match (u32::try_from(min), u32::try_from(max)) {
        (Ok(min), Ok(max)) => Some((min, max)),
        _ => {
            report.push("number_range", "bounds must fit in 32 bits".to_string());
            None
        }
    }
}

fn validate_selection_count(
    count: i64,
    range: Option<(u32, u32)>,
    report: &mut ViolationReport,
) -> Option<u32> {
    if count < 1 {
        report.push("selection_count", format!("must be greater than 0 (got {count})"));
        return None;
    }
    let Ok(count) = u32::try_from(count) else {
        report.push("selection_count", format!("must fit in 32 bits (got {count})"));
        return None;
    };
    let (min, max) = range?;
    let pool = max - min + 1;
    if count > pool {
        report.push(
            "selection_count",
            format!("cannot exceed the {pool} numbers in number_range (got {count})"),
        );
        return None;
    }
    Some(count)
}

fn validate_prize_levels(
    docs: &[PrizeLevelDoc],
    selection_count: Option<u32>,
    report: &mut ViolationReport,
) -> Option<Vec<PrizeLevel>> {
    if docs.is_empty() {
        report.push("prize_levels", "at least one prize level is required".to_string());
        return None;
    }

    let before = report.len();
    let mut seen_levels = HashSet::new();
    let mut seen_conditions = HashSet::new();
    let mut levels = Vec::with_capacity(docs.len());

    for (idx, doc) in docs.iter().enumerate() {
        let field = |name: &str| format!("prize_levels[{idx}].{name}");

        let level = match u32::try_from(doc.level) {
            Ok(level) if level >= 1 => Some(level),
            _ => {
                report.push(field("level"), format!("must be at least 1 (got {})", doc.level));
                None
            }
        };
        if let Some(level) = level
            && !seen_levels.insert(level)
        {
            report.push(field("level"), format!("duplicate level {level}"));
        }

        let condition = match u32::try_from(doc.match_condition) {
            Ok(condition) => Some(condition),
            Err(_) => {
                report.push(
                    field("match_condition"),
                    format!("cannot be negative (got {})", doc.match_condition),
                );
                None
            }
        };
        if let (Some(condition), Some(selection)) = (condition, selection_count)
            && condition > selection
        {
            report.push(
                field("match_condition"),
                format!("cannot exceed selection_count {selection} (got {condition})"),
            );
        }
        if let Some(condition) = condition
            && !seen_conditions.insert(condition)
        {
            report.push(
                field("match_condition"),
                format!("another level already matches {condition} numbers"),
            );
        }

        let payout = match (doc.fixed_prize, doc.prize_percentage) {
            (Some(amount), None) => report
                .non_negative_decimal(&field("fixed_prize"), amount)
                .map(|amount| PrizePayout::Fixed { amount }),
            (None, Some(percentage)) => report
                .unit_rate(&field("prize_percentage"), percentage)
                .map(|percentage| PrizePayout::PoolShare { percentage }),
            (Some(_), Some(_)) => {
                report.push(
                    field("payout"),
                    "set exactly one of fixed_prize or prize_percentage".to_string(),
                );
                None
            }
            (None, None) => {
                report.push(
                    field("payout"),
                    "requires fixed_prize or prize_percentage".to_string(),
                );
                None
            }
        };

        if let (Some(level), Some(match_condition), Some(payout)) = (level, condition, payout) {
            levels.push(PrizeLevel {
                level,
                name: doc.name.clone(),
                match_condition,
                payout,
            });
        }
    }

    (report.len() == before).then_some(levels)
}

fn validate_jackpot(doc: &JackpotDoc, report: &mut ViolationReport) -> Option<JackpotConfig> {
    let initial_amount = report.non_negative_decimal("jackpot.initial_amount", doc.initial_amount);
    let contribution_rate = report.unit_rate("jackpot.contribution_rate", doc.contribution_rate);
    let post_return_contribution_rate = report.unit_rate(
        "jackpot.post_return_contribution_rate",
        doc.post_return_contribution_rate,
    );
    let return_rate = report.unit_rate("jackpot.return_rate", doc.return_rate);
    let min_jackpot = report.non_negative_decimal("jackpot.min_jackpot", doc.min_jackpot);
    let jackpot_fixed_prize = match doc.jackpot_fixed_prize {
        Some(value) => Some(report.non_negative_decimal("jackpot.jackpot_fixed_prize", value)?),
        None => None,
    };

    Some(JackpotConfig {
        enabled: doc.enabled,
        initial_amount: initial_amount?,
        contribution_rate: contribution_rate?,
        post_return_contribution_rate: post_return_contribution_rate?,
        return_rate: return_rate?,
        jackpot_fixed_prize,
        min_jackpot: min_jackpot?,
    })
}

fn validate_jackpot_tier(levels: &[PrizeLevel], jackpot: &JackpotConfig, report: &mut ViolationReport) {
    let pool_tiers: Vec<&PrizeLevel> = levels
        .iter()
        .filter(|level| level.payout.is_pool_share())
        .collect();

    if pool_tiers.len() > 1 {
        report.push(
            "prize_levels",
            format!(
                "only one level may carry prize_percentage (found {})",
                pool_tiers.len()
            ),
        );
        return;
    }

    match pool_tiers.first() {
        None if jackpot.enabled => report.push(
            "jackpot.enabled",
            "an enabled jackpot requires one prize level with prize_percentage".to_string(),
        ),
        Some(tier) => {
            let top = levels
                .iter()
                .map(|level| level.match_condition)
                .max()
                .unwrap_or(tier.match_condition);
            if tier.match_condition != top {
                report.push(
                    "prize_levels",
                    format!(
                        "prize_percentage is reserved for the top tier (level {} matches {}, top tier matches {top})",
                        tier.level, tier.match_condition
                    ),
                );
            }
        }
        None => {}
    }
}

/// A single field-qualified validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Malformed or out-of-range configuration; lists every violation found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration: {}", join_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    #[must_use]
    pub fn single(field: &str, message: &str) -> Self {
        Self {
            violations: vec![Violation {
                field: field.to_string(),
                message: message.to_string(),
            }],
        }
    }

    /// Fold two validation outcomes into one error carrying both sets of violations.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        let mut violations = self.violations;
        violations.extend(other.violations);
        Self { violations }
    }

    /// Whether any violation names the given field.
    #[must_use]
    pub fn mentions(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Semantically incomplete or unrepresentable rules discovered while a run executes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("decimal overflow while computing {operation}")]
    Overflow { operation: &'static str },
    #[error("division by zero while computing {operation}")]
    ZeroDivision { operation: &'static str },
}

/// Accumulates violations while a document is checked.
#[derive(Debug, Default)]
pub(crate) struct ViolationReport {
    violations: Vec<Violation>,
}

impl ViolationReport {
    pub(crate) fn push(&mut self, field: impl Into<String>, message: String) {
        self.violations.push(Violation {
            field: field.into(),
            message,
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.violations.len()
    }

    pub(crate) fn finish(self) -> Result<(), ValidationError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                violations: self.violations,
            })
        }
    }

    fn decimal(&mut self, field: &str, value: f64) -> Option<Decimal> {
        let parsed = decimal_from_f64(value);
        if parsed.is_none() {
            self.push(field, format!("{value} is not representable as a decimal amount"));
        }
        parsed
    }

    fn positive_decimal(&mut self, field: &str, value: f64) -> Option<Decimal> {
        let parsed = self.decimal(field, value)?;
        if parsed <= Decimal::ZERO {
            self.push(field, format!("must be greater than 0 (got {value})"));
            return None;
        }
        Some(parsed)
    }

    fn non_negative_decimal(&mut self, field: &str, value: f64) -> Option<Decimal> {
        let parsed = self.decimal(field, value)?;
        if parsed.is_sign_negative() && !parsed.is_zero() {
            self.push(field, format!("cannot be negative (got {value})"));
            return None;
        }
        Some(parsed)
    }

    fn unit_rate(&mut self, field: &str, value: f64) -> Option<Decimal> {
        if !(0.0..=1.0).contains(&value) {
            self.push(field, format!("must be between 0 and 1 (got {value})"));
            return None;
        }
        self.decimal(field, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lotto_doc() -> GameConfigDoc {
        GameConfigDoc {
            name: "Lotto 6/42".to_string(),
            game_type: GameType::Lottery,
            description: None,
            number_range: (1, 42),
            selection_count: 6,
            ticket_price: 20.0,
            prize_levels: vec![
                PrizeLevelDoc {
                    level: 1,
                    name: "Jackpot".to_string(),
                    match_condition: 6,
                    fixed_prize: None,
                    prize_percentage: Some(0.9),
                },
                PrizeLevelDoc {
                    level: 2,
                    name: "Second".to_string(),
                    match_condition: 5,
                    fixed_prize: Some(5000.0),
                    prize_percentage: None,
                },
            ],
            jackpot: JackpotDoc {
                enabled: true,
                initial_amount: 100_000.0,
                ..JackpotDoc::default()
            },
        }
    }

    #[test]
    fn valid_document_builds_tagged_payouts() {
        let rules = lotto_doc().validate().expect("valid rules");
        assert_eq!(rules.pool_size(), 42);
        assert_eq!(rules.ticket_price(), Decimal::from(20));
        assert_eq!(
            rules.prize_levels()[0].payout,
            PrizePayout::PoolShare {
                percentage: Decimal::new(9, 1)
            }
        );
        assert_eq!(
            rules.prize_levels()[1].payout,
            PrizePayout::Fixed {
                amount: Decimal::from(5000)
            }
        );
        assert_eq!(rules.pool_share_index(), Some(0));
        assert_eq!(rules.jackpot().contribution_rate, Decimal::new(15, 2));
    }

    #[test]
    fn reports_every_violation_at_once() {
        let mut doc = lotto_doc();
        doc.number_range = (10, 5);
        doc.ticket_price = 0.0;
        doc.jackpot.return_rate = 1.5;
        doc.prize_levels[1].level = 1;
        let err = doc.validate().unwrap_err();
        assert!(err.mentions("number_range"));
        assert!(err.mentions("ticket_price"));
        assert!(err.mentions("jackpot.return_rate"));
        assert!(err.mentions("prize_levels[1].level"));
        assert!(err.violations.len() >= 4);
        assert!(err.to_string().contains("ticket_price"));
    }

    #[test]
    fn level_without_payout_is_rejected() {
        let mut doc = lotto_doc();
        doc.prize_levels[1].fixed_prize = None;
        let err = doc.validate().unwrap_err();
        assert!(err.mentions("prize_levels[1].payout"));
    }

    #[test]
    fn duplicate_match_conditions_are_rejected() {
        let mut doc = lotto_doc();
        doc.prize_levels[1].match_condition = 6;
        let err = doc.validate().unwrap_err();
        assert!(err.mentions("prize_levels[1].match_condition"));
    }

    #[test]
    fn selection_count_must_fit_range() {
        let mut doc = lotto_doc();
        doc.number_range = (1, 5);
        doc.selection_count = 6;
        let err = doc.validate().unwrap_err();
        assert!(err.mentions("selection_count"));
    }

    #[test]
    fn enabled_jackpot_requires_pool_tier() {
        let mut doc = lotto_doc();
        doc.prize_levels[0].prize_percentage = None;
        doc.prize_levels[0].fixed_prize = Some(1_000_000.0);
        let err = doc.validate().unwrap_err();
        assert!(err.mentions("jackpot.enabled"));

        doc.jackpot.enabled = false;
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn pool_share_must_sit_on_top_tier() {
        let mut doc = lotto_doc();
        doc.prize_levels[0].prize_percentage = None;
        doc.prize_levels[0].fixed_prize = Some(1_000_000.0);
        doc.prize_levels[1].fixed_prize = None;
        doc.prize_levels[1].prize_percentage = Some(0.5);
        let err = doc.validate().unwrap_err();
        assert!(err.mentions("prize_levels"));
    }

    #[test]
    fn document_defaults_fill_jackpot_rates() {
        let doc: GameConfigDoc = serde_json::from_str(
            r#"{
                "number_range": [1, 10],
                "selection_count": 3,
                "ticket_price": 2,
                "prize_levels": [
                    {"level": 1, "name": "Top", "match_condition": 3, "fixed_prize": 100}
                ]
            }"#,
        )
        .expect("parse doc");
        assert_eq!(doc.jackpot.contribution_rate, 0.15);
        assert!(!doc.jackpot.enabled);
        let rules = doc.validate().expect("valid");
        assert_eq!(rules.name(), "unnamed game");
        assert_eq!(rules.pool_share_index(), None);
    }
}
