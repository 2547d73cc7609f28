//! Prompt construction and parsing of model answers
//!
//! Models are asked for JSON but routinely wrap it in prose or code fences,
//! quote numbers as strings, give confidence as a percentage or odds in
//! American format. Parsing accepts all of that and gives up (returning
//! `None`) only when no usable pick remains.

use crate::economics::RankedGame;
use crate::llm::SuggestionRequest;
use crate::types::WagerEstimate;
use serde_json::Value;

const SHARP_CONTEXT: &str = "You are an elite sharp sports bettor. \
Give ONE strong college or NFL player prop or side/total with reasoning under 100 words.";

const SINGLE_FORMAT: &str = "Answer with a JSON object: \
{\"pick\": string, \"confidence\": win probability 0-1, \"odds\": decimal odds, \"reasoning\": string}.";

const LEGS_FORMAT: &str = "Answer with a JSON object: \
{\"legs\": [{\"pick\": string, \"confidence\": win probability 0-1, \"odds\": decimal odds}], \"reasoning\": string}.";

/// Kind of multi-leg ticket requested from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketKind {
    Parlay,
    SameGame,
    Bomb,
}

impl TicketKind {
    pub fn title(&self) -> &'static str {
        match self {
            TicketKind::Parlay => "Sharp Parlay",
            TicketKind::SameGame => "Same Game Parlay",
            TicketKind::Bomb => "Longshot Bomb",
        }
    }

    fn instructions(&self) -> &'static str {
        match self {
            TicketKind::Parlay => {
                "You are an elite sharp sports bettor. Build a 2 to 4 leg college or NFL parlay \
                 from different games, sides, totals or player props you actually like."
            }
            TicketKind::SameGame => {
                "You are an elite sharp sports bettor. Build a 2 to 4 leg same game parlay using \
                 only the game below. Legs must be correlated and can mix sides, totals and props."
            }
            TicketKind::Bomb => {
                "You are a degenerate but sharp sports bettor. Build a 4 to 6 leg longshot parlay \
                 of plus-money plays (decimal odds 2.0 or higher per leg) with a real path to cash."
            }
        }
    }
}

/// Compact text summary of the top games for prompt context
pub fn games_snippet(games: &[RankedGame], limit: usize) -> String {
    games
        .iter()
        .take(limit)
        .map(|r| {
            let g = &r.game;
            let mut line = format!("{} ({})", g.matchup(), g.start.format("%Y-%m-%d"));
            if let Some(spread) = g.spread_for(&g.home) {
                line.push_str(&format!(", {} {:+.1}", g.home, spread));
            }
            if let Some(total) = g.total_line() {
                line.push_str(&format!(", O/U {}", total));
            }
            if let (Some(home), Some(away)) = (g.moneyline_for(&g.home), g.moneyline_for(&g.away)) {
                line.push_str(&format!(", ML {:.2}/{:.2}", home, away));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn with_snippet(mut system: String, snippet: &str) -> String {
    if !snippet.is_empty() {
        system.push_str("\n\nLive games snippet:\n");
        system.push_str(snippet);
    }
    system
}

/// Single pick request, the user's own message is passed through
pub fn pick_request(user_text: &str, snippet: &str) -> SuggestionRequest {
    SuggestionRequest {
        system: with_snippet(format!("{} {}", SHARP_CONTEXT, SINGLE_FORMAT), snippet),
        user: user_text.to_string(),
        max_tokens: None,
        json: true,
    }
}

pub fn ticket_request(kind: TicketKind, user_text: &str, snippet: &str, max_tokens: u32) -> SuggestionRequest {
    SuggestionRequest {
        system: with_snippet(format!("{} {}", kind.instructions(), LEGS_FORMAT), snippet),
        user: user_text.to_string(),
        max_tokens: Some(max_tokens),
        json: true,
    }
}

/// A parsed single pick
#[derive(Debug, Clone, PartialEq)]
pub struct PickSuggestion {
    pub estimate: WagerEstimate,
    pub reasoning: Option<String>,
}

/// Parsed ticket legs
#[derive(Debug, Clone, PartialEq)]
pub struct TicketSuggestion {
    pub legs: Vec<WagerEstimate>,
    pub reasoning: Option<String>,
}

/// Outermost `{...}` of a model answer
fn extract_object(answer: &str) -> Option<Value> {
    let start = answer.find('{')?;
    let end = answer.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&answer[start..=end]).ok()
}

fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|v| v.is_finite())
}

/// Accepts `0.62`, `62` or `"62%"`. Bare numbers between 1 and 2 fit
/// neither a probability nor a sensible percentage and are rejected.
fn confidence(value: &Value) -> Option<f64> {
    let percent_sign = value.as_str().is_some_and(|s| s.trim().ends_with('%'));
    let c = number(value)?;
    let c = if percent_sign || (2.0..=100.0).contains(&c) {
        c / 100.0
    } else if c <= 1.0 {
        c
    } else {
        return None;
    };
    (0.0..=1.0).contains(&c).then_some(c)
}

/// Accepts decimal odds or American odds (`-110`, `+150`). American odds
/// have magnitude 100 or more; a negative number short of that is neither.
fn decimal_odds(value: &Value) -> Option<f64> {
    let o = number(value)?;
    if o >= 100.0 {
        Some(1.0 + o / 100.0)
    } else if o <= -100.0 {
        Some(1.0 + 100.0 / o.abs())
    } else if o > 0.0 {
        Some(o)
    } else {
        None
    }
}

fn text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn estimate(obj: &Value) -> Option<WagerEstimate> {
    let description = ["pick", "play", "description", "leg"]
        .iter()
        .find_map(|k| text(&obj[*k]))?;
    let confidence = confidence(&obj["confidence"])?;
    let odds = decimal_odds(&obj["odds"])?;
    WagerEstimate::new(description, confidence, odds).ok()
}

pub fn parse_pick(answer: &str) -> Option<PickSuggestion> {
    let obj = extract_object(answer)?;
    Some(PickSuggestion {
        estimate: estimate(&obj)?,
        reasoning: text(&obj["reasoning"]),
    })
}

/// Legs that fail validation are dropped; `None` when none survive
pub fn parse_ticket(answer: &str) -> Option<TicketSuggestion> {
    let obj = extract_object(answer)?;
    let legs: Vec<WagerEstimate> = obj["legs"].as_array()?.iter().filter_map(estimate).collect();
    if legs.is_empty() {
        return None;
    }
    Some(TicketSuggestion {
        legs,
        reasoning: text(&obj["reasoning"]),
    })
}
