//! Config Deprecation - CLI Entry Point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config_deprecation::{CheckOptions, ConfigService, DeprecationRegistry, ReportFormat, report};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "config-deprecation",
    about = "Detects and rewrites deprecated settings",
    version
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, global = true, default_value = "warn")]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite settings files and report deprecated settings
    Check {
        /// Settings file; may be repeated, later files win
        #[arg(short, long = "config", required = true)]
        configs: Vec<PathBuf>,

        /// Override a setting (e.g. server.port=5601)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<String>,

        /// Write the rewritten settings back to the config file
        #[arg(long)]
        write: bool,

        /// Report format
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },

    /// List the registered rules in the order they run
    PrintRules,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; the report goes to stdout
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Check {
            configs,
            overrides,
            write,
            format,
        } => {
            let options = CheckOptions {
                configs,
                overrides,
                write,
                format,
            };
            let outcome = config_deprecation::check(&ConfigService::standard(), &options)?;
            print!("{}", outcome.report);
            outcome.ensure_startable()?;
            Ok(())
        }
        Command::PrintRules => {
            print!("{}", report::render_rules(&DeprecationRegistry::standard()));
            Ok(())
        }
    }
}
