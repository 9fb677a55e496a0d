mod config;
mod telegram;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Json, Router, routing::get};
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ChatMemberUpdated};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use kaizen_ai::{
    CalendarClient, GroqClient, Integrations, NotionClient, ObsidianVault, PerplexityClient, Scraper,
};
use kaizen_bot::{AppState, BotSettings, Scheduler};
use kaizen_db::Database;
use kaizen_session::{MemorySessionStore, SessionStore, SqliteSessionStore};

use config::{Config, SessionBackend};
use telegram::TelegramMessenger;

/// How often the scheduler wakes up to look for due work.
const TICK_SECS: u64 = 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kaizen=debug,teloxide=info".into()),
        )
        .init();

    // Config
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            eprintln!("       Fix your .env file and restart.");
            std::process::exit(1);
        }
    };

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);

    let sessions: Arc<dyn SessionStore> = match config.session_backend {
        SessionBackend::Memory => Arc::new(MemorySessionStore::new()),
        SessionBackend::Sqlite => Arc::new(SqliteSessionStore::new(db.clone())),
    };

    let integrations = Arc::new(integrations(&config));

    // Shared state
    let tg = teloxide::Bot::new(&config.bot_token);
    let messenger = Arc::new(TelegramMessenger::new(tg.clone(), &config.bot_token));
    let settings = BotSettings {
        reminder_hours: config.reminder_hours.clone(),
        ..BotSettings::default()
    };
    let state: AppState = Arc::new(kaizen_bot::Bot::new(db, sessions, messenger, integrations, settings));

    info!(
        hours = ?config.reminder_hours,
        backend = ?config.session_backend,
        "Kaizen starting"
    );

    tokio::spawn(run_scheduler(state.clone()));

    if let Some(addr) = config.health_addr {
        tokio::spawn(async move {
            if let Err(e) = serve_health(addr).await {
                warn!("Health server stopped: {:#}", e);
            }
        });
    }

    // Telegram dispatcher
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(
            |msg: Message, state: AppState| async move {
                if let Some(incoming) = telegram::incoming_message(&msg) {
                    state.handle_message(incoming).await;
                }
                respond(())
            },
        ))
        .branch(Update::filter_callback_query().endpoint(
            |q: CallbackQuery, state: AppState| async move {
                state.handle_callback(telegram::incoming_callback(&q)).await;
                respond(())
            },
        ))
        .branch(Update::filter_my_chat_member().endpoint(
            |update: ChatMemberUpdated, state: AppState| async move {
                if let Some(change) = telegram::membership_change(&update) {
                    state.handle_membership(change).await;
                }
                respond(())
            },
        ));

    Dispatcher::builder(tg, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Kaizen stopped");
    Ok(())
}

/// A service whose client fails to build is left disabled; the bot then
/// names the variable to fix when someone uses it.
fn integrations(config: &Config) -> Integrations {
    fn enabled<T, E: std::fmt::Display>(name: &str, client: Result<T, E>) -> Option<T> {
        match client {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("{} disabled: {}", name, e);
                None
            }
        }
    }

    let integrations = Integrations {
        groq: config
            .groq_api_key
            .as_deref()
            .and_then(|key| enabled("Groq", GroqClient::new(key))),
        perplexity: config
            .perplexity_api_key
            .as_deref()
            .and_then(|key| enabled("Perplexity", PerplexityClient::new(key))),
        calendar: config
            .calendar_token
            .as_deref()
            .and_then(|token| enabled("Google Calendar", CalendarClient::new(token))),
        notion: config
            .notion
            .as_ref()
            .and_then(|(key, page)| enabled("Notion", NotionClient::new(key, page))),
        obsidian: config.obsidian_vault.clone().map(ObsidianVault::new),
        scraper: enabled("Scraper", Scraper::new()),
    };

    info!(
        groq = integrations.groq.is_some(),
        perplexity = integrations.perplexity.is_some(),
        calendar = integrations.calendar.is_some(),
        notion = integrations.notion.is_some(),
        obsidian = integrations.obsidian.is_some(),
        "Integrations configured"
    );
    integrations
}

async fn run_scheduler(state: AppState) {
    let mut scheduler = Scheduler::new();
    let mut interval = tokio::time::interval(Duration::from_secs(TICK_SECS));
    loop {
        interval.tick().await;
        state.scheduler_tick(&mut scheduler).await;
    }
}

async fn serve_health(addr: SocketAddr) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http());

    info!("Health endpoint listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
