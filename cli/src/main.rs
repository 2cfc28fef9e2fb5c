//! Scribe CLI - command-line host for the external completion engine.
//!
//! The heavy lifting (process supervision, the request/response channel)
//! lives in [`scribe_client`]; this binary is thin glue: configuration,
//! tracing, argument parsing, and printing results.
//!
//! - `query` reads a document from stdin, windows it around the cursor, and
//!   asks the engine for completions;
//! - `command` sends one of the engine's magic `scribe::…` prompts;
//! - `uninstall` runs the engine once in report mode and exits with the
//!   engine's own exit code.

mod config;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scribe_client::{RequestChannel, StatusCell, Supervisor, report_and_exit};
use scribe_types::AutocompleteRequest;

use crate::config::ScribeConfig;

/// Context window (in bytes) sent to the engine on each side of the cursor.
const CHAR_LIMIT: usize = 100_000;

/// Timeout for magic engine commands.
const COMMAND_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
#[command(name = "scribe")]
#[command(about = "Client for the Scribe completion engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Query completions at a cursor offset; the document is read from stdin
    Query {
        /// Filename the engine uses for language detection
        filename: PathBuf,
        /// Byte offset of the cursor; defaults to the end of the document
        #[arg(long)]
        offset: Option<usize>,
        /// Override the configured maximum number of results
        #[arg(long)]
        max_results: Option<usize>,
        /// Print the raw engine reply as JSON instead of formatted results
        #[arg(long)]
        raw: bool,
    },
    /// Send a magic engine command (config, sem, no_sem, ...)
    Command {
        name: String,
    },
    /// Report an uninstall to the engine and exit with its exit code
    Uninstall,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = ScribeConfig::load();

    if !config.enabled {
        eprintln!("scribe is disabled by configuration");
        return Ok(());
    }

    match cli.command {
        CliCommand::Query {
            filename,
            offset,
            max_results,
            raw,
        } => query(&config, &filename, offset, max_results, raw).await,
        CliCommand::Command { name } => run_command(&config, &name).await,
        CliCommand::Uninstall => {
            let code = report_and_exit(&config.supervisor_config()?, &["--uninstalled".to_string()])
                .await
                .context("reporting uninstall to engine")?;
            std::process::exit(code);
        }
    }
}

/// Start the engine and open a channel with the given default timeout.
async fn connect(config: &ScribeConfig, timeout: Duration) -> Result<(Supervisor, RequestChannel)> {
    let supervisor = Supervisor::new(config.supervisor_config()?, StatusCell::new());
    supervisor
        .start()
        .await
        .context("starting engine process")?;
    let channel = RequestChannel::new(&supervisor, timeout);
    Ok((supervisor, channel))
}

async fn query(
    config: &ScribeConfig,
    filename: &Path,
    offset: Option<usize>,
    max_results: Option<usize>,
    raw: bool,
) -> Result<()> {
    if let Some(ext) = filename.extension().and_then(|e| e.to_str()) {
        if config.disabled_language_ids.iter().any(|id| id == ext) {
            eprintln!("completions are disabled for {ext} files");
            return Ok(());
        }
    }

    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("reading document from stdin")?;

    let max_num_results = max_results.unwrap_or(config.max_num_results);
    let offset = floor_char_boundary(&text, offset.unwrap_or(text.len()));
    let request = window_request(filename, &text, offset, max_num_results);

    let (_supervisor, channel) = connect(config, config.request_timeout()).await?;

    let body = serde_json::to_value(scribe_types::EngineRequest::Autocomplete(request))?;
    let reply = channel.send(&body, None, None).await?;
    if config.debug {
        tracing::debug!(reply = %reply, "raw engine reply");
    }
    if raw {
        println!("{}", serde_json::to_string_pretty(&reply)?);
        return Ok(());
    }

    let response: scribe_types::AutocompleteResponse =
        serde_json::from_value(reply).context("engine reply is not an autocomplete response")?;

    if !response.user_message.is_empty() {
        eprintln!("{}", response.user_message.join(" "));
    }
    if response.results.is_empty() {
        eprintln!("no completions");
        return Ok(());
    }

    for entry in response.results.iter().take(max_num_results) {
        let kind = entry.kind().map(|k| k.label()).unwrap_or("scribe");
        match &entry.detail {
            Some(detail) => println!("{}\t{kind}\t{detail}", entry.display_text()),
            None => println!("{}\t{kind}", entry.display_text()),
        }
    }
    Ok(())
}

/// Build an autocomplete request windowed to `CHAR_LIMIT` bytes around the
/// cursor, on char boundaries.
fn window_request(
    filename: &Path,
    text: &str,
    offset: usize,
    max_num_results: usize,
) -> AutocompleteRequest {
    let before_start = floor_char_boundary(text, offset.saturating_sub(CHAR_LIMIT));
    let after_end = floor_char_boundary(text, (offset + CHAR_LIMIT).min(text.len()));

    AutocompleteRequest {
        filename: filename.display().to_string(),
        before: text[before_start..offset].to_string(),
        after: text[offset..after_end].to_string(),
        region_includes_beginning: before_start == 0,
        region_includes_end: after_end == text.len(),
        max_num_results,
    }
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// The engine treats a handful of `scribe::…` prompts as commands; it
/// replies with a single pseudo-completion carrying the outcome.
async fn run_command(config: &ScribeConfig, name: &str) -> Result<()> {
    let prompt = format!("scribe::{name}");
    let request = AutocompleteRequest {
        filename: String::new(),
        before: prompt.clone(),
        after: prompt.clone(),
        region_includes_beginning: true,
        region_includes_end: true,
        max_num_results: 1,
    };

    let (_supervisor, channel) = connect(config, COMMAND_TIMEOUT).await?;
    let response = channel.autocomplete(request, None, None).await?;
    match response.results.first() {
        Some(entry) => println!("{}", entry.new_prefix),
        None => eprintln!("engine returned no result for {prompt}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_covers_whole_small_document() {
        let request = window_request(Path::new("a.rs"), "fn main() {}", 6, 5);
        assert_eq!(request.before, "fn mai");
        assert_eq!(request.after, "n() {}");
        assert!(request.region_includes_beginning);
        assert!(request.region_includes_end);
        assert_eq!(request.max_num_results, 5);
    }

    #[test]
    fn test_window_clamps_large_document() {
        let text = "x".repeat(CHAR_LIMIT * 4);
        let offset = CHAR_LIMIT * 2;
        let request = window_request(Path::new("a.rs"), &text, offset, 5);
        assert_eq!(request.before.len(), CHAR_LIMIT);
        assert_eq!(request.after.len(), CHAR_LIMIT);
        assert!(!request.region_includes_beginning);
        assert!(!request.region_includes_end);
    }

    #[test]
    fn test_window_cursor_at_end() {
        let request = window_request(Path::new("a.rs"), "hello", 5, 1);
        assert_eq!(request.before, "hello");
        assert_eq!(request.after, "");
        assert!(request.region_includes_end);
    }

    #[test]
    fn test_floor_char_boundary_respects_utf8() {
        let text = "héllo"; // 'é' spans bytes 1..3
        assert_eq!(floor_char_boundary(text, 2), 1);
        assert_eq!(floor_char_boundary(text, 3), 3);
        assert_eq!(floor_char_boundary(text, 99), text.len());
    }
}
