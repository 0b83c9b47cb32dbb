use std::io;
use std::path::PathBuf;
use std::process;

use clap::{CommandFactory, Parser};
use clap_complete::Shell;

use csvpeek::config::Config;

/// csvpeek: bounded Markdown previews of CSV files, for AI agents and humans.
/// Handles quoted fields, embedded newlines and CRLF; never loads more than it shows.
#[derive(Parser)]
#[command(name = "csvpeek", version, about)]
struct Cli {
    /// CSV file to preview. Use `-` for stdin.
    file: Option<PathBuf>,

    /// Data rows to show (header excluded). Values below 1 count as 1.
    #[arg(long, allow_negative_numbers = true)]
    max_rows: Option<i64>,

    /// Columns to show. Values below 1 count as 1.
    #[arg(long, allow_negative_numbers = true)]
    max_cols: Option<i64>,

    /// Name to show in the summary line instead of the path.
    #[arg(long)]
    name: Option<String>,

    /// Max tokens in response. Drops table rows to fit.
    #[arg(long)]
    budget: Option<u64>,

    /// Machine-readable JSON output (structured preview + text).
    #[arg(long)]
    json: bool,

    /// Run as MCP server (JSON-RPC on stdio).
    #[arg(long)]
    mcp: bool,

    /// Storage root for MCP keys. Overrides config and CSVPEEK_ROOT.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Config file (default: ./csvpeek.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug logging to stderr (CSVPEEK_LOG takes precedence).
    #[arg(short, long)]
    verbose: bool,

    /// Print shell completions for the given shell.
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

fn main() {
    let cli = Cli::parse();

    // Shell completions
    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "csvpeek", &mut io::stdout());
        return;
    }

    csvpeek::logging::init(cli.verbose);

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            process::exit(e.exit_code());
        }
    };
    if let Some(root) = cli.root {
        config.storage_root = root;
    }

    // MCP mode: JSON-RPC server
    if cli.mcp {
        if let Err(e) = csvpeek::mcp::run(config) {
            eprintln!("mcp error: {e}");
            process::exit(1);
        }
        return;
    }

    let Some(file) = cli.file else {
        eprintln!("usage: csvpeek <file> [--max-rows N] [--max-cols N] [--budget N] [--json]");
        process::exit(3);
    };

    let defaults = config.default_options();
    let options = csvpeek::PreviewOptions::new(
        cli.max_rows.unwrap_or(defaults.max_rows),
        cli.max_cols.unwrap_or(defaults.max_cols),
    );

    match csvpeek::preview_path(&file, cli.name.as_deref(), options, cli.budget) {
        Ok((preview, text)) => {
            if cli.json {
                let json = serde_json::json!({
                    "file": file.display().to_string(),
                    "preview": preview,
                    "text": text,
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json)
                        .expect("serde_json::Value is always serializable")
                );
            } else {
                println!("{text}");
            }
        }
        Err(e) => {
            eprintln!("{e}");
            if let Some(solution) = e.solution() {
                eprintln!("{solution}");
            }
            process::exit(e.exit_code());
        }
    }
}
