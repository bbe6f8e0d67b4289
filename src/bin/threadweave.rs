use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use threadweave::outline::{load_messages, render_outline};
use threadweave::{MessageThreader, ThreadweaveConfig, ThreadweaveError, init_tracing};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Indented, numbered text outline
    Outline,
    /// The numbered forest as JSON
    Json,
}

/// Rebuild threaded conversations from a flat JSON message log
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// JSON array of messages, or `-` to read stdin
    #[clap(long, value_name = "PATH", default_value = "-")]
    input: PathBuf,

    /// Fold same-author messages closer together than this
    #[clap(long, value_name = "MS")]
    coalesce_window_ms: Option<i64>,

    /// Adopt the previous message as parent when it is closer than this
    #[clap(long, value_name = "MS")]
    implicit_link_window_ms: Option<i64>,

    /// Output format
    #[clap(long, value_enum, default_value_t = OutputFormat::Outline)]
    format: OutputFormat,

    /// Directory for application logs
    #[clap(long, value_name = "PATH")]
    logs_dir: Option<PathBuf>,

    /// Fail instead of falling back to a flat view
    #[clap(long)]
    strict: bool,
}

fn main() -> Result<(), ThreadweaveError> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = ThreadweaveConfig::from_env()?;
    if let Some(coalesce_window_ms) = args.coalesce_window_ms {
        config.threading.coalesce_window_ms = coalesce_window_ms;
    }
    if let Some(implicit_link_window_ms) = args.implicit_link_window_ms {
        config.threading.implicit_link_window_ms = implicit_link_window_ms;
    }
    if args.logs_dir.is_some() {
        config.logs_dir = args.logs_dir;
    }

    init_tracing(config.logs_dir.as_deref())?;
    tracing::debug!("Running with {:?}", config);

    let messages = load_messages(&args.input)?;
    tracing::info!("Loaded {} messages from {:?}", messages.len(), args.input);

    let threader = MessageThreader::with_config(config.threading);
    let forest = if args.strict {
        threader.reconstruct(messages).inspect_err(|err| {
            tracing::error!("Failed to reconstruct threads: {}", err);
        })?
    } else {
        threader.reconstruct_or_flat(messages)
    };

    tracing::info!(
        "Reconstructed {} nodes ({} ghosts) in {} threads",
        forest.len(),
        forest.ghost_count(),
        forest.roots().len()
    );

    match args.format {
        OutputFormat::Outline => print!("{}", render_outline(&forest)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(forest.roots())?),
    }

    Ok(())
}
