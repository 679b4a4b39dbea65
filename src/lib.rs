use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use teloxide::Bot;

pub mod api;
mod config;
pub mod db;
pub mod error;
pub mod messages;
pub mod notify;
pub mod premium;
pub mod store;
mod system_info;
pub mod token;


pub use config::Config;

use api::AppState;
use db::Database;
use notify::Notifier;
use store::{ActivityTracker, SessionStore};

/// How often the background retention sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

pub async fn run() -> Result<()> {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting anonimka server...");
    tracing::info!("{}", system_info::get_system_info());

    let db_url = db::prepare_sqlite_url(&config.db_url);
    let pool = db::connect_db(&db_url, 5).await?;
    db::init_schema(&pool).await?;
    let database = Database::new(pool);

    let bot = config.bot_token.clone().map(Bot::new);
    let notifier = Notifier::new(bot, &config.webapp_url);

    let state = Arc::new(AppState {
        db: database.clone(),
        web_sessions: SessionStore::new(),
        tg_sessions: SessionStore::new(),
        activity: ActivityTracker::new(),
        notifier,
        token_secret: config.token_secret.clone(),
        bot_token: config.bot_token.clone(),
    });

    tokio::spawn(sweep_loop(database));

    let app = api::build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "Listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn sweep_loop(db: Database) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    // the first tick fires immediately, which doubles as a startup sweep
    loop {
        interval.tick().await;
        if let Err(err) = api::admin::run_sweep(&db, api::now()).await {
            tracing::error!(error = %err, "Retention sweep failed");
        }
    }
}
