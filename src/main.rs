use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use inject::config::{ConfigLoader, ConfigurationData, InjectableDescription};
use inject::errors::AppError;
use inject::infrastructure::Resolver;
use inject::logging::{init_logging, LoggingConfig, OperationTimer};

/// Inspects dependency-injection configuration files.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a configuration and print its interface bindings
    Check {
        /// Configuration file (.toml, .json, .yaml or .yml)
        config: PathBuf,
    },
    /// Show which injectable a type identifier resolves to
    Resolve {
        config: PathBuf,
        /// Interface or injectable name, short or `package.Name`
        identifier: String,
    },
}

fn load(path: &PathBuf) -> Result<ConfigurationData, AppError> {
    let timer = OperationTimer::new("load_configuration");
    let config = ConfigLoader::new().load(path)?;
    timer.finish();
    Ok(config)
}

fn print_injectable(description: &InjectableDescription) {
    println!("  injectable: {}", description.path);
    println!("  mode:       {:?}", description.mode);
    if let Some(factory) = &description.factory {
        println!("  factory:    {}", factory);
    }
    if let Some(params) = &description.params {
        println!("  params:     {}", params);
    }
}

fn check(path: &PathBuf) -> anyhow::Result<()> {
    let config = load(path).with_context(|| format!("checking {}", path.display()))?;
    println!(
        "{}: {} factories, {} injectables, {} interfaces",
        path.display(),
        config.factories.len(),
        config.injectables.len(),
        config.interfaces.len()
    );

    for factory in &config.factories {
        let policy = if factory.is_singleton {
            "singleton"
        } else {
            "transient"
        };
        println!("factory {} ({})", factory.path, policy);
    }

    let mut unbound = 0;
    for (interface, chosen) in Resolver::new(&config).bindings() {
        match chosen {
            Some(injectable) => println!("{} -> {}", interface.path, injectable.path),
            None => {
                unbound += 1;
                println!(
                    "{} -> '{}' (not declared)",
                    interface.path, interface.injectable
                );
            }
        }
    }

    let duplicates = config.duplicates();
    for duplicate in &duplicates {
        println!("warning: {}", duplicate);
    }

    if unbound > 0 {
        return Err(AppError::Generic(format!(
            "{} interface(s) bound to undeclared injectables",
            unbound
        ))
        .into());
    }
    Ok(())
}

fn resolve(path: &PathBuf, identifier: &str) -> anyhow::Result<()> {
    let config = load(path).with_context(|| format!("resolving against {}", path.display()))?;
    match Resolver::new(&config).resolve(identifier) {
        Some(description) => {
            println!("{}", identifier);
            print_injectable(description);
            Ok(())
        }
        None => anyhow::bail!("'{}' does not resolve to any injectable", identifier),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Err(e) = init_logging(LoggingConfig::production().with_verbosity(cli.verbose)) {
        eprintln!("failed to initialize logging: {}", e);
    }

    match &cli.command {
        Command::Check { config } => check(config),
        Command::Resolve { config, identifier } => resolve(config, identifier),
    }
}
