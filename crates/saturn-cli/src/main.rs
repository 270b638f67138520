mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, monitor::MonitorSubcommand, org::OrgSubcommand,
    schedule::ScheduleSubcommand, user::UserSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "saturn",
    about = "Saturn job monitoring: heartbeat pings, missed-run detection, incidents and alerts",
    version,
    propagate_version = true
)]
struct Cli {
    /// Data directory holding saturn.yaml and the database
    #[arg(long, global = true, env = "SATURN_DATA_DIR", default_value = ".saturn")]
    data_dir: PathBuf,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API with the background evaluator
    Serve {
        /// Port to listen on (defaults to the configured port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run a single missed-run evaluation pass
    Evaluate,

    /// Manage organizations
    Org {
        #[command(subcommand)]
        subcommand: OrgSubcommand,
    },

    /// Manage users and issue sessions
    User {
        #[command(subcommand)]
        subcommand: UserSubcommand,
    },

    /// Manage monitors
    Monitor {
        #[command(subcommand)]
        subcommand: MonitorSubcommand,
    },

    /// Inspect schedules without touching the database
    Schedule {
        #[command(subcommand)]
        subcommand: ScheduleSubcommand,
    },

    /// Show or validate configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let data_dir = cli.data_dir.as_path();

    let result = match cli.command {
        Commands::Serve { port } => cmd::serve::run(data_dir, port),
        Commands::Evaluate => cmd::evaluate::run(data_dir, cli.json),
        Commands::Org { subcommand } => cmd::org::run(data_dir, subcommand, cli.json),
        Commands::User { subcommand } => cmd::user::run(data_dir, subcommand, cli.json),
        Commands::Monitor { subcommand } => cmd::monitor::run(data_dir, subcommand, cli.json),
        Commands::Schedule { subcommand } => cmd::schedule::run(subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(data_dir, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
