use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docgen::{api, config::Config, db::Database, state::AppState};

#[derive(Parser)]
#[command(name = "docgen")]
#[command(about = "AI-assisted report and slide deck generation server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for HTTP API
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },
    /// Apply database migrations and exit
    Migrate,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "docgen=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_database(config: &Config) -> anyhow::Result<Database> {
    let db = match &config.database_path {
        Some(path) => Database::open(path.clone())?,
        None => Database::open_default()?,
    };
    let applied = db.migrate()?;
    if !applied.is_empty() {
        tracing::info!(?applied, "Database migrated");
    }
    Ok(db)
}

async fn serve(config: Config, host: &str, port: u16) -> anyhow::Result<()> {
    let db = open_database(&config)?;
    let (state, worker) = AppState::from_config(db, &config)?;
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!("docgen listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down");
        })
        .await?;

    // running pipelines are abandoned; their sections stay "Generating..."
    worker.abort();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let config = Config::from_env();

    match cli.command {
        Some(Commands::Serve { host, port }) => serve(config, &host, port).await?,
        Some(Commands::Migrate) => {
            open_database(&config)?;
            tracing::info!("Database schema is up to date");
        }
        None => serve(config, "127.0.0.1", 8000).await?,
    }

    Ok(())
}
