//! nbfetch CLI - fetch coursework datasets and link notebook resources
//!
//! Downloads are sequential, retried with exponential backoff and checked
//! against the server's declared size.

mod commands;
mod output;
mod progress;

use anyhow::Result;
use clap::{Parser, Subcommand};
use nbfetch_core::{FetchError, Fetcher, ResourceBundle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// nbfetch - dataset fetcher for notebook coursework
#[derive(Parser)]
#[command(name = "nbfetch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file (JSON)
    #[arg(long, env = "NBFETCH_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "human")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a single URL to a file
    Fetch {
        /// URL to download
        url: String,

        /// Destination file
        path: PathBuf,
    },

    /// Download release assets, one after another
    Release {
        /// Release tag
        version: String,

        /// Asset file names
        #[arg(required = true)]
        files: Vec<String>,

        /// Target directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Download a named coursework dataset bundle
    Bundle {
        /// Bundle name
        bundle: BundleArg,

        /// Target directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Link (or copy) every entry of a resource directory into another
    Link {
        /// Source directory
        src: PathBuf,

        /// Destination directory
        dst: PathBuf,
    },

    /// Show or initialise settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum BundleArg {
    Week3,
    Week4,
    Week6,
}

impl From<BundleArg> for ResourceBundle {
    fn from(arg: BundleArg) -> Self {
        match arg {
            BundleArg::Week3 => ResourceBundle::Week3,
            BundleArg::Week4 => ResourceBundle::Week4,
            BundleArg::Week6 => ResourceBundle::Week6,
        }
    }
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective settings
    Show,

    /// Print the settings file location
    Path,

    /// Write the default settings file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if matches!(e.downcast_ref::<FetchError>(), Some(FetchError::Interrupted)) => {
            eprintln!("{}", console::style("Interrupted").yellow());
            ExitCode::from(130)
        }
        Err(e) => {
            eprintln!("{} {:#}", console::style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings_path = cli
        .config
        .clone()
        .unwrap_or_else(nbfetch_core::default_settings_path);
    let format = cli.output;

    match cli.command {
        Commands::Fetch { url, path } => {
            let session = Session::start(&settings_path, format).await?;
            let result = commands::fetch(&session.fetcher, &url, &path, format).await;
            session.finish(result).await
        }

        Commands::Release {
            version,
            files,
            dir,
        } => {
            let session = Session::start(&settings_path, format).await?;
            let result = commands::release(&session.fetcher, &version, &files, &dir, format).await;
            session.finish(result).await
        }

        Commands::Bundle { bundle, dir } => {
            let session = Session::start(&settings_path, format).await?;
            let result = commands::bundle(&session.fetcher, bundle.into(), &dir, format).await;
            session.finish(result).await
        }

        Commands::Link { src, dst } => commands::link(&src, &dst, format).await,

        Commands::Config { action } => commands::config_action(&settings_path, action, format).await,

        Commands::Completions { shell } => {
            use clap::CommandFactory;
            clap_complete::generate(shell, &mut Cli::command(), "nbfetch", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// A fetcher wired to Ctrl-C and to the progress renderer
struct Session {
    fetcher: Fetcher,
    progress: tokio::task::JoinHandle<()>,
}

impl Session {
    async fn start(settings_path: &Path, format: OutputFormat) -> Result<Self> {
        let settings = nbfetch_core::load_settings(settings_path).await?;
        let fetcher = Fetcher::new(settings)?;

        // Ctrl-C aborts the running transfer instead of killing the process,
        // so the partial file is still cleaned up.
        let interrupt = fetcher.interrupt_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.cancel();
            }
        });

        let progress = progress::FetchProgress::spawn(
            fetcher.subscribe(),
            matches!(format, OutputFormat::Human),
        );

        Ok(Self { fetcher, progress })
    }

    /// Wait for the progress renderer to drain, then hand back `result`
    async fn finish(self, result: Result<()>) -> Result<()> {
        // Dropping the last sender closes the event channel
        drop(self.fetcher);
        let _ = self.progress.await;
        result
    }
}
