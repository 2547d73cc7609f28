//! Keyword command dispatch
//!
//! Every inbound chat message maps to exactly one [`Command`]. The handler
//! owns its collaborators (odds, language model, bankroll store, transport)
//! and is shared across webhook tasks as `Arc<CommandHandler>`.

pub mod format;
pub mod suggest;


use crate::config::{Config, EconomicsConfig};
use crate::economics::{combine_parlay, stake_units, RankedGame, WagerMetrics};
use crate::error::Result;
use crate::llm::SuggestionSource;
use crate::odds::OddsService;
use crate::store::StateStore;
use crate::telegram::{ChatTransport, Update};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use rust_decimal::Decimal;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use suggest::TicketKind;
use tracing::{debug, info, warn};

/// Bankroll sub-command
#[derive(Debug, Clone, PartialEq)]
pub enum BankrollAction {
    Show,
    Add(Decimal),
    Sub(Decimal),
    Set(Decimal),
    History,
    /// Unparseable arguments, answered with usage
    Usage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Bankroll(BankrollAction),
    Bomb,
    Sgp,
    Parlay,
    Card,
    Pick,
    Help,
}

/// Lowercase, trim, and strip a leading `/` plus any `@botname` suffix on
/// the first word.
pub fn normalize(text: &str) -> String {
    let text = text.trim().to_lowercase();
    let Some(rest) = text.strip_prefix('/') else {
        return text;
    };
    let (head, tail) = match rest.find(char::is_whitespace) {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    let head = head.split('@').next().unwrap_or(head);
    format!("{}{}", head, tail)
}

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// Keyword dispatch on the normalized text, first match wins
pub fn parse_command(text: &str) -> Command {
    let text = normalize(text);

    if contains_any(&text, &["bankroll", "units", "balance"]) {
        Command::Bankroll(parse_bankroll(&text))
    } else if contains_any(&text, &["bomb", "longshot"]) {
        Command::Bomb
    } else if contains_any(&text, &["sgp", "same game"]) {
        Command::Sgp
    } else if contains_any(&text, &["parlay"]) {
        Command::Parlay
    } else if contains_any(&text, &["card", "slate", "games", "today"]) {
        Command::Card
    } else if contains_any(&text, &["pick", "play", "bet", "sharp"]) {
        Command::Pick
    } else {
        Command::Help
    }
}

/// Limiter size that first triggers dropping idle chats
const LIMITER_PRUNE_AT: usize = 1024;

/// Largest amount a single bankroll command accepts
const MAX_AMOUNT_UNITS: i64 = 1_000_000_000;

fn parse_amount(raw: Option<&&str>) -> Option<Decimal> {
    let raw = raw?.trim_start_matches('+').trim_end_matches('u');
    Decimal::from_str(raw)
        .ok()
        .filter(|d| *d > Decimal::ZERO && *d <= Decimal::from(MAX_AMOUNT_UNITS))
}

/// Arguments after a bankroll keyword: `add N`, `sub N`, `set N`, `+N`,
/// `-N`, `history`.
pub fn parse_bankroll(text: &str) -> BankrollAction {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    for (i, token) in tokens.iter().enumerate() {
        let action = match *token {
            "add" | "plus" => parse_amount(tokens.get(i + 1)).map(BankrollAction::Add),
            "sub" | "minus" | "subtract" => parse_amount(tokens.get(i + 1)).map(BankrollAction::Sub),
            "set" => parse_amount(tokens.get(i + 1)).map(BankrollAction::Set),
            "history" | "log" => Some(BankrollAction::History),
            t if t.len() > 1 && t.starts_with('+') => parse_amount(Some(&t)).map(BankrollAction::Add),
            t if t.len() > 1 && t.starts_with('-') => {
                parse_amount(Some(&&t[1..])).map(BankrollAction::Sub)
            }
            _ => continue,
        };
        return action.unwrap_or(BankrollAction::Usage);
    }
    BankrollAction::Show
}

/// Reply sizes and limits taken from configuration
#[derive(Debug, Clone)]
struct ReplyLimits {
    card_size: usize,
    snippet_games: usize,
    history_limit: usize,
    parlay_max_tokens: u32,
}

pub struct CommandHandler {
    odds: Arc<OddsService>,
    llm: Option<Arc<dyn SuggestionSource>>,
    store: Arc<dyn StateStore>,
    transport: Arc<dyn ChatTransport>,
    economics: EconomicsConfig,
    limits: ReplyLimits,
    limiter: Option<DefaultKeyedRateLimiter<i64>>,
    /// Tracked-chat count that triggers the next limiter prune
    prune_at: AtomicUsize,
}

impl CommandHandler {
    pub fn new(
        config: &Config,
        odds: Arc<OddsService>,
        llm: Option<Arc<dyn SuggestionSource>>,
        store: Arc<dyn StateStore>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        let limiter = if config.rate_limit.enabled {
            NonZeroU32::new(config.rate_limit.per_minute)
                .map(|n| RateLimiter::keyed(Quota::per_minute(n)))
        } else {
            None
        };

        Self {
            odds,
            llm,
            store,
            transport,
            economics: config.economics.clone(),
            limits: ReplyLimits {
                card_size: config.odds.card_size,
                snippet_games: config.odds.snippet_games,
                history_limit: config.bankroll.history_limit,
                parlay_max_tokens: config
                    .llm
                    .as_ref()
                    .map(|l| l.parlay_max_tokens)
                    .unwrap_or(400),
            },
            limiter,
            prune_at: AtomicUsize::new(LIMITER_PRUNE_AT),
        }
    }

    fn allow(&self, chat_id: i64) -> bool {
        let Some(limiter) = &self.limiter else {
            return true;
        };
        let allowed = limiter.check_key(&chat_id).is_ok();

        if limiter.len() >= self.prune_at.load(Ordering::Relaxed) {
            limiter.retain_recent();
            limiter.shrink_to_fit();
            let tracked = limiter.len();
            self.prune_at
                .store((tracked * 2).max(LIMITER_PRUNE_AT), Ordering::Relaxed);
            debug!("Pruned rate limiter, {} chats still tracked", tracked);
        }
        allowed
    }

    /// Chats the rate limiter currently holds state for
    pub fn tracked_chats(&self) -> usize {
        self.limiter.as_ref().map(|l| l.len()).unwrap_or(0)
    }

    /// Handle one webhook or polled update, replying through the transport.
    /// Updates without a text message are ignored.
    pub async fn handle_update(&self, update: Update) -> Result<()> {
        let Some(message) = update.message else {
            debug!("Ignoring update {} without message", update.update_id);
            return Ok(());
        };
        let Some(text) = message.text.as_deref().filter(|t| !t.trim().is_empty()) else {
            return Ok(());
        };

        let reply = self.handle_text(message.chat.id, text).await;
        self.transport.send_message(message.chat.id, &reply).await
    }

    /// Reply text for one message
    pub async fn handle_text(&self, chat_id: i64, text: &str) -> String {
        if !self.allow(chat_id) {
            warn!("Rate limited chat {}", chat_id);
            return format::RATE_LIMITED.to_string();
        }

        let command = parse_command(text);
        info!("Chat {} -> {:?}", chat_id, command);

        match command {
            Command::Card => self.card(None).await,
            Command::Pick => self.pick(chat_id, text.trim()).await,
            Command::Parlay => self.ticket(chat_id, TicketKind::Parlay, text.trim()).await,
            Command::Sgp => self.ticket(chat_id, TicketKind::SameGame, text.trim()).await,
            Command::Bomb => self.ticket(chat_id, TicketKind::Bomb, text.trim()).await,
            Command::Bankroll(action) => self.bankroll(chat_id, action),
            Command::Help => format::HELP.to_string(),
        }
    }

    /// Ranked card, optionally pinned to one sport key
    pub async fn card(&self, sport: Option<&str>) -> String {
        let ranked = self.odds.ranked(sport).await;
        format::card(&ranked, self.limits.card_size)
    }

    fn stake(&self, chat_id: i64, kelly: f64) -> (Decimal, Decimal) {
        let bankroll = self.store.balance(chat_id);
        let stake = stake_units(bankroll, kelly, self.economics.kelly_multiplier);
        (stake, bankroll)
    }

    /// Single pick for `text`, priced against the chat's bankroll
    pub async fn pick(&self, chat_id: i64, text: &str) -> String {
        let Some(llm) = &self.llm else {
            return format::LLM_OFF.to_string();
        };

        let ranked = self.odds.ranked(None).await;
        let snippet = suggest::games_snippet(&ranked, self.limits.snippet_games);
        let request = suggest::pick_request(text, &snippet);

        match llm.suggest(&request).await {
            Ok(answer) => match suggest::parse_pick(&answer) {
                Some(pick) => {
                    let metrics = WagerMetrics::evaluate(&pick.estimate, &self.economics.grades);
                    let (stake, bankroll) = self.stake(chat_id, metrics.kelly);
                    format::pick(&pick, &metrics, stake, bankroll)
                }
                None => {
                    debug!("Unstructured pick answer, relaying raw text");
                    answer
                }
            },
            Err(e) => {
                warn!("Pick suggestion failed: {}", e);
                format!("AI choked: {}", e)
            }
        }
    }

    async fn ticket(&self, chat_id: i64, kind: TicketKind, text: &str) -> String {
        let Some(llm) = &self.llm else {
            return format::LLM_OFF.to_string();
        };

        let ranked = self.odds.ranked(None).await;
        let snippet = match kind {
            TicketKind::SameGame => match ranked.first() {
                Some(top) => suggest::games_snippet(std::slice::from_ref(top), 1),
                None => return format::ODDS_DOWN.to_string(),
            },
            _ => suggest::games_snippet(&ranked, self.limits.snippet_games),
        };
        let request = suggest::ticket_request(kind, text, &snippet, self.limits.parlay_max_tokens);

        let answer = match llm.suggest(&request).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("{} suggestion failed: {}", kind.title(), e);
                return format!("AI choked: {}", e);
            }
        };

        let Some(ticket) = suggest::parse_ticket(&answer) else {
            debug!("Unstructured {} answer, relaying raw text", kind.title());
            return answer;
        };
        let Some(combined) = combine_parlay(&ticket.legs) else {
            return answer;
        };

        let metrics = WagerMetrics::evaluate(&combined, &self.economics.grades);
        let (stake, bankroll) = self.stake(chat_id, metrics.kelly);
        format::ticket(kind, &ticket, &combined, &metrics, stake, bankroll)
    }

    fn bankroll(&self, chat_id: i64, action: BankrollAction) -> String {
        let result = match action {
            BankrollAction::Show => return format::balance(self.store.balance(chat_id)),
            BankrollAction::History => {
                return format::history(&self.store.history(chat_id, self.limits.history_limit))
            }
            BankrollAction::Usage => return format::BANKROLL_USAGE.to_string(),
            BankrollAction::Add(n) => self
                .store
                .add_units(chat_id, n, "add")
                .map(|b| format::balance_change(n, b)),
            BankrollAction::Sub(n) => self
                .store
                .add_units(chat_id, -n, "sub")
                .map(|b| format::balance_change(-n, b)),
            BankrollAction::Set(n) => self
                .store
                .set_balance(chat_id, n, "set")
                .map(format::balance_set),
        };

        result.unwrap_or_else(|e| {
            warn!("Bankroll update failed for chat {}: {}", chat_id, e);
            format!("❌ {}", e)
        })
    }

    /// Ranked games for the `score` CLI command
    pub async fn ranked(&self, sport: Option<&str>) -> Vec<RankedGame> {
        self.odds.ranked(sport).await
    }
}
