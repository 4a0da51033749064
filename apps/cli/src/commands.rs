//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use folio_core::{BufferedResponse, Logger, Outcome, Server, ServerOptions};
use folio_plugin::builtin::{DirSourcer, LogErrorHandler, PassthroughRenderer};
use folio_shared::{AppConfig, init_config, load_config};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Folio serves files through a pluggable source/render pipeline.
#[derive(Parser)]
#[command(
    name = "folio",
    version,
    about = "Serve a directory through a source → open → render pipeline.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv). Any level also routes pipeline logs
    /// to the terminal.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Serve a directory over HTTP.
    Serve {
        /// Directory to serve (defaults to `[serve] root`).
        #[arg(short, long)]
        root: Option<String>,

        /// Listener address (defaults to `[serve] bind`).
        #[arg(short, long)]
        bind: Option<String>,

        /// Source the directory before accepting connections.
        #[arg(long)]
        source_on_init: bool,
    },

    /// Render a single path to stdout.
    Render {
        /// Request path, e.g. `/blog/post.md`.
        path: String,

        /// Directory to serve (defaults to `[serve] root`).
        #[arg(short, long)]
        root: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "folio=info",
        1 => "folio=debug",
        _ => "folio=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let verbose = cli.verbose > 0;
    match cli.command {
        Command::Serve {
            root,
            bind,
            source_on_init,
        } => cmd_serve(root.as_deref(), bind.as_deref(), source_on_init, verbose).await,
        Command::Render { path, root } => cmd_render(&path, root.as_deref(), verbose).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Build a directory-serving pipeline from config and CLI overrides.
fn build_server(
    config: &AppConfig,
    root: &str,
    source_on_init: bool,
    verbose: bool,
) -> Result<Server> {
    let mut opts = ServerOptions::from(&config.server);
    opts.source_on_init |= source_on_init;
    if verbose {
        opts.logger = Logger::Global;
    }

    let server = Server::new(
        Arc::new(DirSourcer::new(root)),
        Arc::new(PassthroughRenderer),
        Arc::new(LogErrorHandler),
        opts,
    )?;
    Ok(server)
}

async fn cmd_serve(
    root: Option<&str>,
    bind: Option<&str>,
    source_on_init: bool,
    verbose: bool,
) -> Result<()> {
    let config = load_config()?;
    let root = root.unwrap_or(&config.serve.root);
    let bind = bind.unwrap_or(&config.serve.bind);

    let server = Arc::new(build_server(&config, root, source_on_init, verbose)?);
    info!(root, bind, "starting server");

    let http = tiny_http::Server::http(bind).map_err(|e| eyre!("failed to bind {bind}: {e}"))?;
    match http.server_addr().to_ip() {
        Some(addr) => println!("Serving {root} on http://{addr}"),
        None => println!("Serving {root} on {bind}"),
    }

    let workers = std::thread::available_parallelism().map_or(4, usize::from);
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutting down");
    };
    crate::http::serve_on(Arc::new(http), server, workers, shutdown).await
}

async fn cmd_render(path: &str, root: Option<&str>, verbose: bool) -> Result<()> {
    let config = load_config()?;
    let root = root.unwrap_or(&config.serve.root).to_string();
    let server = build_server(&config, &root, false, verbose)?;

    let path = path.to_string();
    let (outcome, res) = tokio::task::spawn_blocking(move || {
        let mut res = BufferedResponse::new();
        let outcome = server.serve(&path, &mut res);
        (outcome, res)
    })
    .await?;

    match outcome {
        Outcome::Served { .. } => {
            std::io::stdout().write_all(res.body())?;
            Ok(())
        }
        Outcome::Failed(stage) => Err(eyre!(
            "{stage} stage failed with status {}: {}",
            res.status().unwrap_or_default(),
            res.body_text()
        )),
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
