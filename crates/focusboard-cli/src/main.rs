use clap::{Parser, Subcommand};
use focusboard_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod commands;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "FOCUSBOARD_LOG";

#[derive(Parser)]
#[command(name = "focusboard", version, about = "Kanban board with a pomodoro timer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Account sign-in
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Pomodoro timer
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Board views
    Board {
        #[command(subcommand)]
        action: commands::board::BoardAction,
    },
    /// Cognitive preferences
    Prefs {
        #[command(subcommand)]
        action: commands::prefs::PrefsAction,
    },
    /// User profile
    Profile {
        #[command(subcommand)]
        action: commands::profile::ProfileAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| match config.log.filter.trim() {
            "" => Err(()),
            directive => EnvFilter::try_new(directive).map_err(|_| ()),
        })
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(command: Commands, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Config { action } => commands::config::run(action),
        Commands::Auth { action } => commands::auth::run(action, config).await,
        Commands::Task { action } => commands::task::run(action, config).await,
        Commands::Timer { action } => commands::timer::run(action, config).await,
        Commands::Board { action } => commands::board::run(action, config).await,
        Commands::Prefs { action } => commands::prefs::run(action, config).await,
        Commands::Profile { action } => commands::profile::run(action, config).await,
    }
}

fn main() {
    let cli = Cli::parse();
    let (config, load_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    init_tracing(&config);
    if let Some(e) = load_error {
        tracing::warn!(error = %e, "falling back to default config");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(cli.command, config)) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
