//! Sharpline Telegram Betting Bot
//!
//! Webhook server, long-poll worker and a few local commands for checking
//! the odds feed and the model without going through Telegram.

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use sharpline_bot::{
    bot::CommandHandler,
    config::Config,
    llm::{LlmClient, SuggestionSource},
    odds::{OddsApiClient, OddsService},
    server,
    store::open_store,
    telegram::{ChatTransport, TelegramClient},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "sharpline-bot")]
#[command(about = "Keyword Telegram bot for sharp sports cards, picks and parlays")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server
    Serve,
    /// Long-poll Telegram instead of receiving webhooks
    Poll,
    /// Print today's card
    Card {
        /// Sport key, skips the fallback chain
        #[arg(short, long)]
        sport: Option<String>,
    },
    /// Ask the model for one pick and print the reply
    Pick {
        /// Message passed to the model
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Print sharp scores for the current slate
    Score {
        #[arg(short, long)]
        sport: Option<String>,
    },
}

/// Prints replies for the local commands
struct ConsoleTransport;

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn send_message(&self, _chat_id: i64, text: &str) -> sharpline_bot::error::Result<()> {
        println!("{}", text);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Poll => poll(config).await,
        Commands::Card { sport } => {
            let handler = build_handler(&config, Arc::new(ConsoleTransport))?;
            println!("{}", handler.card(sport.as_deref()).await);
            Ok(())
        }
        Commands::Pick { text } => {
            let handler = build_handler(&config, Arc::new(ConsoleTransport))?;
            println!("{}", handler.pick(0, &text.join(" ")).await);
            Ok(())
        }
        Commands::Score { sport } => show_scores(config, sport.as_deref()).await,
    }
}

fn build_handler(config: &Config, transport: Arc<dyn ChatTransport>) -> anyhow::Result<Arc<CommandHandler>> {
    if config.odds.api_key.is_empty() {
        tracing::warn!("odds.api_key not set, the card will report the Odds API as down");
    }
    let source = OddsApiClient::new(config.odds.clone())?;
    let odds = Arc::new(OddsService::new(
        Arc::new(source),
        &config.odds,
        config.economics.sharp.clone(),
    ));

    let llm: Option<Arc<dyn SuggestionSource>> = match &config.llm {
        Some(llm_config) => match LlmClient::from_config(llm_config) {
            Ok(client) => {
                tracing::info!("LLM initialized: {} ({})", client.name(), client.model());
                Some(Arc::new(client) as Arc<dyn SuggestionSource>)
            }
            Err(e) => {
                tracing::warn!("Failed to initialize LLM: {}", e);
                None
            }
        },
        None => {
            tracing::warn!("LLM not configured, picks and parlays disabled");
            None
        }
    };

    let store = open_store(&config.bankroll, config.state_path())?;

    Ok(Arc::new(CommandHandler::new(config, odds, llm, store, transport)))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    config.validate_telegram()?;
    let telegram = Arc::new(TelegramClient::new(&config.telegram)?);
    let handler = build_handler(&config, telegram)?;

    if config.server.secret_token.is_none() {
        tracing::warn!("server.secret_token not set, webhook accepts unauthenticated calls");
    }

    tracing::info!("Starting sharpline bot in webhook mode");
    server::start_server(handler, &config.server).await?;
    Ok(())
}

async fn poll(config: Config) -> anyhow::Result<()> {
    config.validate_telegram()?;
    let telegram = Arc::new(TelegramClient::new(&config.telegram)?);
    let handler = build_handler(&config, telegram.clone())?;

    tracing::info!("Starting sharpline bot in polling mode");
    tokio::select! {
        _ = telegram.run_polling(handler) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutdown signal received"),
    }
    Ok(())
}

async fn show_scores(config: Config, sport: Option<&str>) -> anyhow::Result<()> {
    let handler = build_handler(&config, Arc::new(ConsoleTransport))?;
    let ranked = handler.ranked(sport).await;
    if ranked.is_empty() {
        println!("⚠️ Odds API down or key expired.");
        return Ok(());
    }

    println!("\n🔥 Sharp scores ({} games):\n", ranked.len());
    println!(
        "{:<50} {:>8} {:>8} {:>8} {:>8}",
        "Game", "Score", "|Sprd|", "Std", "ML div"
    );
    println!("{}", "-".repeat(86));

    for r in ranked {
        let matchup = r.game.matchup();
        let matchup = if matchup.chars().count() > 47 {
            format!("{}...", matchup.chars().take(47).collect::<String>())
        } else {
            matchup
        };

        match config.economics.sharp.breakdown(&r.game) {
            Ok(b) => println!(
                "{:<50} {:>8.3} {:>8.2} {:>8.2} {:>8.3}",
                matchup, b.score, b.mean_abs_spread, b.mean_spread_std, b.ml_divergence
            ),
            Err(_) => println!("{:<50} {:>8.3} {:>8} {:>8} {:>8}", matchup, r.score, "-", "-", "-"),
        }
    }

    Ok(())
}
