//! # vaultqa
//!
//! Ask questions about a personal note vault. Notes under `journals/` and
//! `pages/` are chunked along their bullet outline, embedded, and stored in a
//! vector database; questions are answered by a language model from the most
//! relevant chunks.
//!
//! ```bash
//! vaultqa sync full
//! vaultqa sync incremental --since-hours 48
//! vaultqa query "What did Caelum reveal in the ruins?" --show-context
//! vaultqa query "What happened last week?" --from 2024-12-20 --to 2024-12-27
//! vaultqa status
//! vaultqa config init > vaultqa.toml
//! ```

mod output;
mod services;

use std::{
    io::Write,
    ops::ControlFlow,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use {
    anyhow::{Context, Result, bail},
    chrono::NaiveDate,
    clap::{Parser, Subcommand, ValueEnum},
    tracing::{debug, warn},
    tracing_subscriber::EnvFilter,
    vaultqa_config::{CONFIG_TEMPLATE, VaultQaConfig, discover_config_path, load_config},
    vaultqa_memory::{DateRange, SyncMode},
};

#[derive(Parser)]
#[command(name = "vaultqa")]
#[command(about = "Question answering over a personal note vault")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ./vaultqa.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (when RUST_LOG is not set)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log line format on stderr
    #[arg(long, global = true, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum SyncKind {
    /// Re-index every note
    #[default]
    Full,
    /// Re-index notes modified recently
    Incremental,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the vault into the vector store
    Sync {
        #[arg(value_enum, default_value = "full")]
        kind: SyncKind,

        /// Window for incremental sync, in hours
        #[arg(long, default_value = "24")]
        since_hours: u64,
    },

    /// Ask a question about your notes
    Query {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Print the retrieved notes before the answer
        #[arg(long)]
        show_context: bool,

        /// Wait for the whole answer instead of streaming it
        #[arg(long)]
        no_stream: bool,

        /// Number of notes to retrieve (default from config)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Only use journal entries on or after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Only use journal entries on or before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Show index status
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration (secrets redacted)
    Show,
    /// Print a sample configuration file
    Init,
    /// Show the config file path
    Path,
}

fn init_logging(verbose: bool, format: LogFormat) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to set tracing subscriber: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format)?;
    match dotenv {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(e) if !e.not_found() => warn!(error = %e, "failed to read .env"),
        Err(_) => {},
    }

    let explicit = cli.config.as_deref();
    match cli.command {
        Commands::Config { action } => config_command(explicit, action),
        Commands::Sync { kind, since_hours } => sync(&load(explicit)?, kind, since_hours).await,
        Commands::Query {
            question,
            show_context,
            no_stream,
            top_k,
            from,
            to,
        } => {
            let config = load(explicit)?;
            let options = QueryOptions {
                show_context,
                stream: !no_stream,
                top_k: top_k.unwrap_or(config.query.top_k),
                range: DateRange::new(from, to),
            };
            query(&config, &question.join(" "), options).await
        },
        Commands::Status => status(&load(explicit)?).await,
    }
}

fn load(explicit: Option<&Path>) -> Result<VaultQaConfig> {
    load_config(explicit).context("failed to load config")
}

fn config_command(explicit: Option<&Path>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", output::render_config(&load(explicit)?));
        },
        ConfigAction::Init => print!("{CONFIG_TEMPLATE}"),
        ConfigAction::Path => match discover_config_path(explicit) {
            Some(path) => println!("{}", path.display()),
            None => {
                let user = vaultqa_config::loader::user_config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<no home directory>".into());
                println!("No config file found (using defaults). Searched ./vaultqa.toml and {user}");
            },
        },
    }
    Ok(())
}

async fn sync(config: &VaultQaConfig, kind: SyncKind, since_hours: u64) -> Result<()> {
    let vault = config.vault_path()?.to_path_buf();
    if !vault.is_dir() {
        bail!("vault directory does not exist: {}", vault.display());
    }
    let manager = services::manager(config, vault).await?;

    let mode = match kind {
        SyncKind::Full => SyncMode::Full,
        SyncKind::Incremental => {
            let window = Duration::from_secs(since_hours.saturating_mul(3600));
            let since = SystemTime::now()
                .checked_sub(window)
                .unwrap_or(SystemTime::UNIX_EPOCH);
            SyncMode::Incremental { since }
        },
    };

    let report = manager.sync(mode).await?;
    println!("{}", output::sync_summary(&report));
    Ok(())
}

struct QueryOptions {
    show_context: bool,
    stream: bool,
    top_k: usize,
    range: DateRange,
}

async fn query(config: &VaultQaConfig, question: &str, options: QueryOptions) -> Result<()> {
    if let (Some(from), Some(to)) = (options.range.from, options.range.to)
        && from > to
    {
        bail!("--from {from} is after --to {to}");
    }
    if options.top_k == 0 {
        bail!("--top-k must be greater than zero");
    }

    let vault = config.vault.path.clone().unwrap_or_default();
    let manager = services::manager(config, vault).await?;
    let results = if options.range.is_unbounded() {
        manager.search(question, options.top_k).await?
    } else {
        manager
            .search_in_range(question, options.range, options.top_k)
            .await?
    };

    if results.is_empty() {
        println!("{}", output::NO_RESULTS_HINT);
        return Ok(());
    }
    if options.show_context {
        println!("{}", output::context_listing(&results));
    }

    let agent = services::answer_agent(config)?;
    if options.stream {
        let mut stdout = std::io::stdout();
        let answer = agent
            .answer_streaming(question, &results, |token| {
                match write!(stdout, "{token}").and_then(|()| stdout.flush()) {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(_) => ControlFlow::Break(()),
                }
            })
            .await?;
        println!();
        debug!(
            input_tokens = answer.usage.input_tokens,
            output_tokens = answer.usage.output_tokens,
            "answer streamed"
        );
    } else {
        let answer = agent.answer(question, &results).await?;
        println!("{}", answer.text);
        debug!(
            input_tokens = answer.usage.input_tokens,
            output_tokens = answer.usage.output_tokens,
            "answer complete"
        );
    }
    Ok(())
}

async fn status(config: &VaultQaConfig) -> Result<()> {
    let vault = config.vault.path.clone().unwrap_or_default();
    let manager = services::manager(config, vault).await?;
    let status = manager.status().await?;
    println!("{}", output::status_summary(&status));
    Ok(())
}
