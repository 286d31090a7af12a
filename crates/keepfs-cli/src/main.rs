use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use keepfs_config::KeepFsConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod connect;
mod errors;

use errors::CliError;

#[derive(Parser)]
#[command(name = "keepfs", version, about = "Notes as files")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// File containing "<user> <password>"
    #[arg(long, global = true)]
    credentials: Option<PathBuf>,

    /// Use an in-memory note store instead of the configured service
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount the notes at a directory and serve them until unmounted
    Mount {
        /// Mount point path
        mountpoint: PathBuf,
        /// Reject every modification
        #[arg(long)]
        read_only: bool,
    },
    /// List visible note names
    Ls,
    /// Print a note's text
    Cat {
        /// Note title or id
        name: String,
    },
    /// Show effective configuration
    Config,
}

fn find_config() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("KEEPFS_CONFIG") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from("keepfs.yaml");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    if let Some(home) = dirs_next::home_dir() {
        let home_config = home.join(".config/keepfs/config.yaml");
        if home_config.exists() {
            return Some(home_config);
        }
    }

    None
}

fn load_config(explicit: Option<PathBuf>) -> Result<KeepFsConfig, Box<dyn std::error::Error>> {
    let config = match explicit {
        Some(path) => KeepFsConfig::from_file(&path)?,
        None => match find_config() {
            Some(path) => {
                tracing::debug!("using config {:?}", path);
                KeepFsConfig::from_file(&path)?
            }
            None => KeepFsConfig::default(),
        },
    };
    config.validate_or_err()?;
    Ok(config)
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(cli.config)?;

    if let Commands::Config = cli.command {
        return commands::config::run(&config);
    }

    let options = connect::ConnectOptions {
        credentials: cli.credentials,
        memory: cli.memory,
    };
    let service = connect::connect(&config, &options)?;

    match cli.command {
        Commands::Mount { mountpoint, read_only } => {
            let args = commands::mount::MountArgs { mountpoint, read_only };
            commands::mount::run(service, config.mount, args)?;
        }
        Commands::Ls => commands::ls::run(service)?,
        Commands::Cat { name } => commands::cat::run(service, &name)?,
        Commands::Config => {}
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = err.exit_code().clamp(0, 255);
            return ExitCode::from(code as u8);
        }
    };

    init_tracing(cli.debug);

    if let Err(e) = run(cli) {
        if let Some(CliError::Usage(_)) = e.downcast_ref::<CliError>() {
            eprintln!("{}", Cli::command().render_usage());
        }
        errors::print_error(e.as_ref());
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
