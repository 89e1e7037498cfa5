use clap::{Parser, Subcommand};
use pomodoro_core::Config;

mod commands;
mod logging;
mod render;

#[derive(Parser)]
#[command(
    name = "pomodoro",
    version,
    about = "Pomodoro timer with session tracking"
)]
struct Cli {
    /// Output in JSON format
    #[arg(short = 'j', long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a Pomodoro run and wait for it to finish
    Start(commands::timer::StartArgs),
    /// Stop the current session
    Stop,
    /// Check if a session is running
    Status,
    /// View session history
    History(commands::history::HistoryArgs),
    /// View productivity statistics
    Stats(commands::stats::StatsArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();

    let loaded = Config::load();
    let log_level = loaded
        .as_ref()
        .map(|cfg| cfg.log.level.clone())
        .unwrap_or_else(|_| "warn".to_string());
    if let Err(e) = logging::init_tracing(&log_level) {
        eprintln!("warning: {e}");
    }
    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "falling back to default configuration");
        Config::default()
    });

    let json = cli.json;
    let result = match cli.command {
        Commands::Start(args) => commands::timer::start(args, &config, json),
        Commands::Stop => commands::timer::stop(json),
        Commands::Status => commands::timer::status(json),
        Commands::History(args) => commands::history::run(args, &config, json),
        Commands::Stats(args) => commands::stats::run(args, json),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
