mod seed;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use readalong_auth::TokenService;
use readalong_server::ServerConfig;
use readalong_store::Database;

#[derive(Parser)]
#[command(name = "readalong", about = "Reading-practice server", version)]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Database file path. Defaults to ~/.readalong/readalong.db.
    #[arg(long)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (the default when no subcommand is given).
    Serve,
    /// Populate the database with demo accounts and sample stories.
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let db_path = cli.db_path.unwrap_or_else(default_db_path);
    let db = Database::open(&db_path)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Seed => seed::run(&db)?,
        Command::Serve => {
            let tokens = TokenService::new(&jwt_secret());
            let config = ServerConfig {
                port: cli.port,
                ..Default::default()
            };
            let handle = readalong_server::start(config, db, tokens).await?;
            tracing::info!(port = handle.port, "readalong ready");

            tokio::signal::ctrl_c().await?;
            tracing::info!("shutting down");
        }
    }

    Ok(())
}

fn default_db_path() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join(".readalong")
        .join("readalong.db")
}

fn jwt_secret() -> String {
    std::env::var("READALONG_JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("READALONG_JWT_SECRET not set; using a development secret");
        "development-secret".to_string()
    })
}
