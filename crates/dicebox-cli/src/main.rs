use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use dicebox_core::config::{Config, WarnLevel};

#[derive(Parser)]
#[command(
    name = "dicebox",
    about = "Dice-driven idea installation daemon — supervises the dice and serves the pick API",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to the config file
    #[arg(long, global = true, env = "DICEBOX_CONFIG", default_value = "dicebox.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config with sample labels
    Init,

    /// Validate the config and print warnings
    Check,

    /// Run the device supervisor and the REST API
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
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

    let result = match cli.command {
        Commands::Init => run_init(&cli.config),
        Commands::Check => run_check(&cli.config),
        Commands::Serve { port } => run_serve(&cli.config, port),
    };

    if let Err(error) = result {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run_init(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    Config::sample().save(path)?;
    println!("wrote {}", path.display());
    println!("fill in the dice hardware addresses before serving");
    Ok(())
}

fn run_check(path: &Path) -> anyhow::Result<()> {
    let config = Config::load(path)?;
    let warnings = config.validate();

    if warnings.is_empty() {
        println!("config ok");
        return Ok(());
    }

    for warning in &warnings {
        let level = match warning.level {
            WarnLevel::Error => "error",
            WarnLevel::Warning => "warning",
        };
        println!("{level}: {}", warning.message);
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config has errors");
    }
    Ok(())
}

fn run_serve(path: &Path, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = Config::load(path)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    for warning in config.validate() {
        tracing::warn!("config: {}", warning.message);
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(dicebox_server::serve(config))
}
