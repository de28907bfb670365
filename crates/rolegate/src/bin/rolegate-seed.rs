//! Maintenance entry point: seeds the catalog and answers ad-hoc checks.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rolegate::core::Codename;
use rolegate::store::Store;
use rolegate::{Gate, GateConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rolegate-seed", version, about = "Seed and inspect a rolegate database")]
struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Seed the permission catalog, baseline roles and default accounts.
    Bootstrap {
        /// JSON config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Database file, overriding the config.
        #[arg(long)]
        database: Option<PathBuf>,
    },

    /// Print whether a user holds a permission codename.
    Check {
        #[arg(long)]
        user: String,

        #[arg(long)]
        codename: String,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        database: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = match cli.command {
        Command::Bootstrap { config, database } => run_bootstrap(config, database).await,
        Command::Check {
            user,
            codename,
            config,
            database,
        } => run_check(&user, &codename, config, database).await,
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<PathBuf>, database: Option<PathBuf>) -> anyhow::Result<GateConfig> {
    let mut config = match path {
        Some(path) => GateConfig::from_file(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => GateConfig::default(),
    };
    if let Some(database) = database {
        config.database_path = database;
    }
    Ok(config)
}

async fn run_bootstrap(
    config: Option<PathBuf>,
    database: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    let config = load_config(config, database)?;
    let gate = Gate::open(config).context("opening database")?;

    let report = gate.bootstrap().await.context("bootstrap failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    let counts = gate.store().counts().await?;
    println!(
        "permissions={} roles={} grants={} users={} assignments={}",
        counts.permissions, counts.roles, counts.grants, counts.users, counts.assignments
    );

    Ok(if report.skipped > 0 {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

async fn run_check(
    username: &str,
    codename: &str,
    config: Option<PathBuf>,
    database: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    let codename = Codename::new(codename)?;
    let gate = Gate::open(load_config(config, database)?).context("opening database")?;

    let Some(principal) = gate.store().get_user_by_username(username).await? else {
        bail!("no user named {username:?}");
    };
    let decision = gate.authorize(&principal, Some(&codename)).await?;
    println!("{username} {codename}: {decision:?}");

    Ok(if decision.is_granted() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
