//! Wager economics
//!
//! Pure betting math over normalized odds: expected value, Kelly sizing,
//! the "sharp score" market-interest heuristic, confidence grades and
//! parlay combination. Nothing here performs I/O or holds shared state,
//! so every function is safe to call from concurrent handlers.
//!
//! ## Invalid input discipline
//!
//! Functions are total. Decimal odds `<= 1.0` (or non-finite input) never
//! raise: they yield the sentinel `0.0` (no value, no stake, no score).
//! Callers that need an explicit signal validate at the boundary with
//! [`WagerEstimate::new`](crate::types::WagerEstimate::new), which returns
//! `BotError::InvalidOdds`.


use crate::error::{BotError, Result};
use crate::types::{GameRecord, Grade, MarketKind, WagerEstimate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Pick'em baseline for moneyline divergence
const PICKEM: f64 = 0.5;

fn valid_odds(decimal_odds: f64) -> bool {
    decimal_odds.is_finite() && decimal_odds > 1.0
}

/// Expected profit per unit staked.
///
/// `ev = c * (o - 1) - (1 - c)`: a win (probability `c`) pays `o - 1`
/// units of profit, a loss costs the 1-unit stake. Confidence is clamped
/// to `[0, 1]`; invalid odds return `0.0`.
pub fn expected_value(confidence: f64, decimal_odds: f64) -> f64 {
    if !valid_odds(decimal_odds) || !confidence.is_finite() {
        return 0.0;
    }
    let c = confidence.clamp(0.0, 1.0);
    c * (decimal_odds - 1.0) - (1.0 - c)
}

/// Kelly stake as a fraction of bankroll for a probability `edge` over
/// break-even at the given odds.
///
/// `k = edge / (o - 1)`, clamped to `[0, 1]`. Returns `0.0` when
/// `o - 1 <= 0` or any input is non-finite.
pub fn kelly_fraction(edge: f64, decimal_odds: f64) -> f64 {
    if !edge.is_finite() || !decimal_odds.is_finite() {
        return 0.0;
    }
    let b = decimal_odds - 1.0;
    if b <= 0.0 {
        return 0.0;
    }
    (edge / b).clamp(0.0, 1.0)
}

/// Break-even win probability priced into a quote (`1 / o`).
pub fn implied_probability(decimal_odds: f64) -> f64 {
    if !valid_odds(decimal_odds) {
        return 0.0;
    }
    1.0 / decimal_odds
}

/// Probability margin of `confidence` over the break-even price.
pub fn edge(confidence: f64, decimal_odds: f64) -> f64 {
    if !valid_odds(decimal_odds) || !confidence.is_finite() {
        return 0.0;
    }
    confidence.clamp(0.0, 1.0) - implied_probability(decimal_odds)
}

/// Fractional-Kelly stake in bankroll units, rounded to cents, never negative.
pub fn stake_units(bankroll: Decimal, kelly: f64, multiplier: f64) -> Decimal {
    if bankroll <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let fraction = (kelly * multiplier).clamp(0.0, 1.0);
    let fraction = Decimal::from_f64_retain(fraction).unwrap_or(Decimal::ZERO);
    bankroll
        .checked_mul(fraction)
        .map(|stake| stake.round_dp(2).max(Decimal::ZERO))
        .unwrap_or(Decimal::ZERO)
}

/// Combined decimal odds of independent legs. Invalid legs are skipped;
/// no valid legs gives `0.0`.
pub fn parlay_odds(legs: &[WagerEstimate]) -> f64 {
    let mut valid = legs.iter().filter(|l| valid_odds(l.decimal_odds)).peekable();
    if valid.peek().is_none() {
        return 0.0;
    }
    valid.map(|l| l.decimal_odds).product()
}

/// Probability that every leg hits, assuming independence.
pub fn parlay_confidence(legs: &[WagerEstimate]) -> f64 {
    let mut valid = legs.iter().filter(|l| valid_odds(l.decimal_odds)).peekable();
    if valid.peek().is_none() {
        return 0.0;
    }
    valid.map(|l| l.confidence.clamp(0.0, 1.0)).product()
}

/// Collapse legs into a single estimate for the whole ticket
pub fn combine_parlay(legs: &[WagerEstimate]) -> Option<WagerEstimate> {
    let odds = parlay_odds(legs);
    if !valid_odds(odds) {
        return None;
    }
    let description = legs
        .iter()
        .filter(|l| valid_odds(l.decimal_odds))
        .map(|l| l.description.as_str())
        .collect::<Vec<_>>()
        .join(" + ");
    Some(WagerEstimate {
        description,
        confidence: parlay_confidence(legs),
        decimal_odds: odds,
    })
}

/// Confidence thresholds for each grade, highest first.
///
/// Defaults are untested tuning choices, not validated constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeLadder {
    #[serde(default = "default_grade_a")]
    pub a: f64,
    #[serde(default = "default_grade_b_plus")]
    pub b_plus: f64,
    #[serde(default = "default_grade_b")]
    pub b: f64,
    #[serde(default = "default_grade_c")]
    pub c: f64,
}

fn default_grade_a() -> f64 {
    0.85
}
fn default_grade_b_plus() -> f64 {
    0.70
}
fn default_grade_b() -> f64 {
    0.55
}
fn default_grade_c() -> f64 {
    0.40
}

impl Default for GradeLadder {
    fn default() -> Self {
        Self {
            a: default_grade_a(),
            b_plus: default_grade_b_plus(),
            b: default_grade_b(),
            c: default_grade_c(),
        }
    }
}

impl GradeLadder {
    pub fn grade(&self, confidence: f64) -> Grade {
        if !confidence.is_finite() {
            return Grade::F;
        }
        if confidence >= self.a {
            Grade::A
        } else if confidence >= self.b_plus {
            Grade::BPlus
        } else if confidence >= self.b {
            Grade::B
        } else if confidence >= self.c {
            Grade::C
        } else {
            Grade::F
        }
    }
}

/// Grade with the default ladder (0.85 / 0.70 / 0.55 / 0.40)
pub fn grade_from_confidence(confidence: f64) -> Grade {
    GradeLadder::default().grade(confidence)
}

/// Weights for the sharp score boost terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharpWeights {
    /// Multiplier on mean spread standard deviation (book disagreement)
    #[serde(default = "default_spread_std_weight")]
    pub spread_std_weight: f64,
    /// Multiplier on moneyline divergence from a pick'em
    #[serde(default = "default_ml_divergence_weight")]
    pub ml_divergence_weight: f64,
    /// Moneyline prices at or below this count as a coin flip
    #[serde(default = "default_ml_price_floor")]
    pub ml_price_floor: f64,
    /// Books that must list a subject's spread for it to count
    #[serde(default = "default_min_books")]
    pub min_books: usize,
}

fn default_spread_std_weight() -> f64 {
    1.2
}
fn default_ml_divergence_weight() -> f64 {
    2.0
}
fn default_ml_price_floor() -> f64 {
    1.01
}
fn default_min_books() -> usize {
    2
}

impl Default for SharpWeights {
    fn default() -> Self {
        Self {
            spread_std_weight: default_spread_std_weight(),
            ml_divergence_weight: default_ml_divergence_weight(),
            ml_price_floor: default_ml_price_floor(),
            min_books: default_min_books(),
        }
    }
}

/// Intermediate terms of a sharp score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    /// Average absolute spread across subjects (lower = closer game)
    pub mean_abs_spread: f64,
    /// Average spread standard deviation across subjects
    pub mean_spread_std: f64,
    /// Average distance of implied moneyline probability from 0.5
    pub ml_divergence: f64,
    pub score: f64,
}

impl SharpWeights {
    /// Compute every term of the score.
    ///
    /// Fails with `IncompleteData` only when no subject has spreads from
    /// `min_books` books; bad individual quotes are skipped.
    pub fn breakdown(&self, game: &GameRecord) -> Result<ScoreBreakdown> {
        // subject -> one spread per book (first listed)
        let mut spreads: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        // subject -> one implied probability per book
        let mut implied: BTreeMap<&str, Vec<f64>> = BTreeMap::new();

        for book in &game.books {
            let mut seen_spread: HashSet<&str> = HashSet::new();
            let mut seen_ml: HashSet<&str> = HashSet::new();

            for q in &book.quotes {
                match q.market {
                    MarketKind::Spread => {
                        let Some(line) = q.line.filter(|l| l.is_finite()) else {
                            continue;
                        };
                        if seen_spread.insert(q.subject.as_str()) {
                            spreads.entry(q.subject.as_str()).or_default().push(line);
                        }
                    }
                    MarketKind::Moneyline => {
                        if !q.price.is_finite() {
                            continue;
                        }
                        if seen_ml.insert(q.subject.as_str()) {
                            let p = if q.price <= self.ml_price_floor {
                                PICKEM
                            } else {
                                1.0 / q.price
                            };
                            implied.entry(q.subject.as_str()).or_default().push(p);
                        }
                    }
                    _ => {}
                }
            }
        }

        let qualified: Vec<(f64, f64)> = spreads
            .values()
            .filter(|lines| lines.len() >= self.min_books.max(1))
            .map(|lines| mean_and_std(lines))
            .collect();

        if qualified.is_empty() {
            return Err(BotError::IncompleteData(format!(
                "no spread listed by {} or more books for {}",
                self.min_books,
                game.matchup()
            )));
        }

        let n = qualified.len() as f64;
        let mean_abs_spread = qualified.iter().map(|(m, _)| m.abs()).sum::<f64>() / n;
        let mean_spread_std = qualified.iter().map(|(_, s)| *s).sum::<f64>() / n;

        let ml_divergence = if implied.is_empty() {
            0.0
        } else {
            implied
                .values()
                .map(|probs| (probs.iter().sum::<f64>() / probs.len() as f64 - PICKEM).abs())
                .sum::<f64>()
                / implied.len() as f64
        };

        let closeness = 1.0 / (1.0 + mean_abs_spread);
        let boost = 1.0
            + mean_spread_std * self.spread_std_weight
            + ml_divergence * self.ml_divergence_weight;

        Ok(ScoreBreakdown {
            mean_abs_spread,
            mean_spread_std,
            ml_divergence,
            score: closeness * boost,
        })
    }

    /// Sharp score, `0.0` when the game lacks usable spread data
    pub fn score(&self, game: &GameRecord) -> f64 {
        match self.breakdown(game) {
            Ok(b) if b.score.is_finite() => b.score,
            Ok(_) => 0.0,
            Err(e) => {
                tracing::debug!("Sharp score skipped: {}", e);
                0.0
            }
        }
    }
}

/// Sharp score with default weights
pub fn sharp_score(game: &GameRecord) -> f64 {
    SharpWeights::default().score(game)
}

/// Arithmetic mean and population standard deviation
fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// A game paired with its sharp score
#[derive(Debug, Clone)]
pub struct RankedGame {
    pub game: GameRecord,
    pub score: f64,
}

/// Sort games by sharp score, highest first. Equal scores keep fetch order.
pub fn rank_games(games: Vec<GameRecord>, weights: &SharpWeights) -> Vec<RankedGame> {
    let mut ranked: Vec<RankedGame> = games
        .into_iter()
        .map(|game| {
            let score = weights.score(&game);
            RankedGame { game, score }
        })
        .collect();
    // sort_by is stable
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

/// Betting math for one estimate
#[derive(Debug, Clone, PartialEq)]
pub struct WagerMetrics {
    pub expected_value: f64,
    pub edge: f64,
    pub kelly: f64,
    pub grade: Grade,
}

impl WagerMetrics {
    pub fn evaluate(estimate: &WagerEstimate, ladder: &GradeLadder) -> Self {
        let edge = edge(estimate.confidence, estimate.decimal_odds);
        Self {
            expected_value: expected_value(estimate.confidence, estimate.decimal_odds),
            edge,
            kelly: kelly_fraction(edge, estimate.decimal_odds),
            grade: ladder.grade(estimate.confidence),
        }
    }
}
