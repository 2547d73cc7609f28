//! Reply text for every command
//!
//! Replies are plain text so they survive any Telegram parse mode.

use super::suggest::{PickSuggestion, TicketKind, TicketSuggestion};
use crate::economics::{RankedGame, WagerMetrics};
use crate::types::{LedgerEntry, WagerEstimate};
use rust_decimal::Decimal;

pub const ODDS_DOWN: &str = "⚠️ Odds API down or key expired.";
pub const LLM_OFF: &str = "🤖 AI picks are off: no language model key is configured.";
pub const RATE_LIMITED: &str = "⏳ Easy there. Give me a minute before the next one.";

pub const HELP: &str = "👊 Send me:\n\
• “card” → today’s slate\n\
• “pick” → one sharp AI play\n\
• “parlay” → 2-4 leg ticket\n\
• “sgp” → same game parlay on the top game\n\
• “bomb” → longshot parlay\n\
• “bankroll” → your units (add 5, sub 2, set 100, history)\n\
• or just ask anything NFL/CFB";

pub const BANKROLL_USAGE: &str = "💰 Bankroll commands:\n\
• bankroll → show units\n\
• bankroll add 5 (or +5)\n\
• bankroll sub 2 (or -2)\n\
• bankroll set 100\n\
• bankroll history";

/// Today's card. Games missing a home spread or total render as a
/// one-line placeholder.
pub fn card(games: &[RankedGame], limit: usize) -> String {
    if games.is_empty() {
        return ODDS_DOWN.to_string();
    }

    let lines: Vec<String> = games.iter().take(limit).map(card_entry).collect();
    format!("🔥 Today's Sharp Card:\n\n{}", lines.join("\n\n"))
}

fn card_entry(ranked: &RankedGame) -> String {
    let g = &ranked.game;
    let date = g.start.format("%Y-%m-%d");
    match (g.spread_for(&g.home), g.total_line()) {
        (Some(spread), Some(total)) => format!(
            "🏈 {} @ {}\n   {} {:+.1} | O/U {}\n   {} | sharp {:.2}",
            g.away, g.home, g.home, spread, total, date, ranked.score
        ),
        _ => format!("🏈 {} @ {} – {}", g.away, g.home, date),
    }
}

pub fn units(value: Decimal) -> String {
    format!("{}u", value.normalize())
}

fn signed_units(value: Decimal) -> String {
    if value.is_sign_negative() && !value.is_zero() {
        units(value)
    } else {
        format!("+{}", units(value))
    }
}

fn metric_lines(estimate: &WagerEstimate, metrics: &WagerMetrics, stake: Decimal, bankroll: Decimal) -> String {
    let mut out = format!(
        "Odds {:.2} | Confidence {:.0}%\n\
         EV {:+.3}u per unit | Edge {:+.1}%\n\
         Grade {}",
        estimate.decimal_odds,
        estimate.confidence * 100.0,
        metrics.expected_value,
        metrics.edge * 100.0,
        metrics.grade,
    );
    if stake > Decimal::ZERO {
        out.push_str(&format!(
            "\nStake {} of {} (Kelly {:.1}%)",
            units(stake),
            units(bankroll),
            metrics.kelly * 100.0
        ));
    } else {
        out.push_str("\nNo edge at this price, pass or shop the line");
    }
    out
}

pub fn pick(suggestion: &PickSuggestion, metrics: &WagerMetrics, stake: Decimal, bankroll: Decimal) -> String {
    let mut out = format!(
        "🎯 {}\n{}",
        suggestion.estimate.description,
        metric_lines(&suggestion.estimate, metrics, stake, bankroll)
    );
    if let Some(reasoning) = &suggestion.reasoning {
        out.push_str("\n\n");
        out.push_str(reasoning);
    }
    out
}

/// Multi-leg ticket with the combined price and metrics
pub fn ticket(
    kind: TicketKind,
    suggestion: &TicketSuggestion,
    combined: &WagerEstimate,
    metrics: &WagerMetrics,
    stake: Decimal,
    bankroll: Decimal,
) -> String {
    let icon = match kind {
        TicketKind::Parlay => "🎟",
        TicketKind::SameGame => "🧩",
        TicketKind::Bomb => "💣",
    };
    let mut out = format!("{} {} ({} legs)\n", icon, kind.title(), suggestion.legs.len());
    for (i, leg) in suggestion.legs.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} @ {:.2} ({:.0}%)\n",
            i + 1,
            leg.description,
            leg.decimal_odds,
            leg.confidence * 100.0
        ));
    }
    out.push_str(&format!(
        "\nCombined odds {:.2} | Hit chance {:.1}%\n",
        combined.decimal_odds,
        combined.confidence * 100.0
    ));
    out.push_str(&format!(
        "EV {:+.3}u per unit | Grade {}",
        metrics.expected_value, metrics.grade
    ));
    if stake > Decimal::ZERO {
        out.push_str(&format!("\nStake {} of {}", units(stake), units(bankroll)));
    }
    if let Some(reasoning) = &suggestion.reasoning {
        out.push_str("\n\n");
        out.push_str(reasoning);
    }
    out
}

pub fn balance(value: Decimal) -> String {
    format!("💰 Bankroll: {}", units(value))
}

pub fn balance_change(delta: Decimal, balance: Decimal) -> String {
    let icon = if delta.is_sign_negative() && !delta.is_zero() { "📉" } else { "✅" };
    format!("{} {} → {}", icon, signed_units(delta), units(balance))
}

pub fn balance_set(balance: Decimal) -> String {
    format!("📌 Bankroll set to {}", units(balance))
}

pub fn history(entries: &[LedgerEntry]) -> String {
    if entries.is_empty() {
        return "📒 No bankroll history yet.".to_string();
    }
    let lines: Vec<String> = entries
        .iter()
        .map(|e| {
            format!(
                "{} {} → {} ({})",
                e.at.format("%m-%d %H:%M"),
                signed_units(e.delta),
                units(e.balance),
                e.note
            )
        })
        .collect();
    format!("📒 Last {} moves:\n{}", entries.len(), lines.join("\n"))
}
