use clap::Parser;
use gym_journal_bot::config::Config;
use gym_journal_bot::daemon;
use gym_journal_bot::error::Result;

#[derive(Parser, Debug)]
#[command(name = "gym-journal-botd")]
#[command(about = "Gym Journal Bot event daemon")]
struct Cli {
    /// JSON config file; defaults apply when omitted.
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// SQLite file; overrides the config and DATABASE_URL.
    #[arg(long)]
    db: Option<String>,

    #[arg(long, env = "GYM_JOURNAL_TOKEN", hide_env_values = true)]
    token: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    gym_journal_bot::logging::init_tracing("gym_journal_botd");
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(db) = cli.db {
        config.database.get_or_insert_with(Default::default).sqlite_path = Some(db);
    }
    let host = cli.host.unwrap_or_else(|| config.host());
    let port = cli.port.unwrap_or_else(|| config.port());

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutdown requested");
    };
    daemon::run_with_shutdown(&host, port, &config, &cli.token, shutdown).await
}
