use tracing::info;

mod evaluator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "herald_engine=info,herald_store=info,herald_audit=info".into()
            }),
        )
        .init();

    // load config: explicit path > HERALD_CONFIG env > ~/.herald/herald.toml
    let config_path = std::env::var("HERALD_CONFIG").ok();
    let config =
        herald_core::config::HeraldConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
            tracing::warn!("Config load failed ({}), using defaults", e);
            herald_core::config::HeraldConfig::default()
        });

    // one SQLite file holds both the claim store and the audit log
    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    // schema setup is idempotent, safe on every start
    herald_store::db::init_db(&db)?;
    herald_audit::db::init_db(&db)?;
    info!("database migrations complete");

    // campaign roster; definitions that fail validation are dropped at load
    // with a warning, so one bad campaign cannot take the engine down
    let campaigns = herald_campaign::roster::load(&config.engine.roster)?;
    info!(
        count = campaigns.len(),
        path = %config.engine.roster,
        "campaign roster loaded"
    );

    // the store and the audit log each get their own connection
    let store = herald_store::MetadataStore::new(rusqlite::Connection::open(db_path)?)?;
    let audit = herald_audit::AuditLog::new(rusqlite::Connection::open(db_path)?)?;

    let mut transports = herald_channels::TransportRegistry::new();
    transports.register(Box::new(LogTransport));

    let engine = evaluator::Evaluator::new(
        campaigns,
        store,
        audit,
        transports,
        config.engine.tick_secs,
        config.engine.stuck_grace_minutes,
    );

    // spawn the evaluator loop in background
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let engine_task = tokio::spawn(async move { engine.run(shutdown_rx).await });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    // signal the evaluator to stop and wait for the in-flight tick
    let _ = shutdown_tx.send(true);
    engine_task.await?;
    Ok(())
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}

/// Console transport used when no real messaging platform is wired up.
///
/// Campaigns reference it as `transport = "log"`, the roster default.
struct LogTransport;

#[async_trait::async_trait]
impl herald_channels::Transport for LogTransport {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(
        &self,
        delivery: &herald_channels::OutboundDelivery,
    ) -> Result<(), herald_channels::TransportError> {
        info!(
            campaign = %delivery.campaign_id,
            recipient = %delivery.recipient_key,
            has_payload = delivery.payload.is_some(),
            "delivery: {}",
            delivery.content
        );
        Ok(())
    }
}
