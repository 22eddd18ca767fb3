use anyhow::{bail, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::server::{start_server, ServeConfig, DEFAULT_PORT};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "fredag-web")]
#[command(about = "Static file server for the is-it-friday page")]
#[command(version = VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(long = "dir", default_value = ".")]
    #[arg(help = "Directory to serve")]
    pub dir: PathBuf,

    #[arg(short = 'p', long = "port", default_value_t = DEFAULT_PORT)]
    #[arg(help = "Port to listen on")]
    pub port: u16,

    #[arg(long = "log-level", default_value = "info")]
    #[arg(help = "Log level (debug, info, warn, error)")]
    pub log_level: String,

    #[arg(long = "log-format", default_value = "console")]
    #[arg(help = "Log format (json, console)")]
    pub log_format: String,

    #[arg(long = "log-requests", default_value_t = true, action = clap::ArgAction::Set)]
    #[arg(help = "Log HTTP requests")]
    pub log_requests: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the web server")]
    Serve {
        #[arg(help = "Directory to serve")]
        directory: Option<PathBuf>,

        #[arg(short = 'p', long = "port")]
        #[arg(help = "Port to listen on")]
        port: Option<u16>,

        #[arg(long = "log-level")]
        #[arg(help = "Log level (debug, info, warn, error)")]
        log_level: Option<String>,

        #[arg(long = "log-format")]
        #[arg(help = "Log format (json, console)")]
        log_format: Option<String>,

        #[arg(long = "log-requests")]
        #[arg(help = "Log HTTP requests")]
        log_requests: Option<bool>,
    },
    #[command(about = "Show version information")]
    Version,
    #[command(about = "Generate completion script")]
    Completion {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Some(Commands::Serve {
                directory,
                port,
                log_level,
                log_format,
                log_requests,
            }) => {
                init_logging(
                    log_level.as_deref().unwrap_or(&self.log_level),
                    log_format.as_deref().unwrap_or(&self.log_format),
                )?;

                // Subcommand values win over the global flags
                let config = ServeConfig {
                    public_dir: directory.unwrap_or(self.dir),
                    port: port.unwrap_or(self.port),
                    log_requests: log_requests.unwrap_or(self.log_requests),
                };
                start_server(config).await
            }
            Some(Commands::Version) => {
                println!("{}", full_version());
                Ok(())
            }
            Some(Commands::Completion { shell }) => {
                generate_completion(shell);
                Ok(())
            }
            None => {
                init_logging(&self.log_level, &self.log_format)?;

                let config = ServeConfig {
                    public_dir: self.dir,
                    port: self.port,
                    log_requests: self.log_requests,
                };
                start_server(config).await
            }
        }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `level` when set.
pub fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        "json" => builder.json().init(),
        "console" => builder.init(),
        other => bail!("unknown log format: {other} (expected json or console)"),
    }

    Ok(())
}

fn full_version() -> String {
    format!("fredag-web v{VERSION}")
}

fn generate_completion(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "fredag-web", &mut io::stdout());
}
