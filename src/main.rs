//! CLI entry point for `msgshell`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};

use msgshell::config::Config;
use msgshell::export::text::BodyFormat;
use msgshell::ParsedMessage;

#[derive(Parser)]
#[command(name = "msgshell", version, about = "Inspect Outlook .msg files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Show headers, body and attachments of a message
    Show {
        path: PathBuf,
        /// Print the parsed message as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one body representation
    Body {
        path: PathBuf,
        #[arg(short, long, value_enum, default_value_t = BodyArg::Text)]
        format: BodyArg,
    },
    /// List every raw property of the top-level message
    Properties { path: PathBuf },
    /// Extract all attachments, embedded messages into subfolders
    Attachments {
        path: PathBuf,
        /// Output directory (defaults to the configured export directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(Clone, Copy, ValueEnum)]
enum BodyArg {
    Text,
    Html,
    Rtf,
}

impl From<BodyArg> for BodyFormat {
    fn from(arg: BodyArg) -> Self {
        match arg {
            BodyArg::Text => BodyFormat::Text,
            BodyArg::Html => BodyFormat::Html,
            BodyArg::Rtf => BodyFormat::Rtf,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = msgshell::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Show { path, json } => cmd_show(&path, json, &config),
        Commands::Body { path, format } => cmd_body(&path, format.into(), &config),
        Commands::Properties { path } => cmd_properties(&path, &config),
        Commands::Attachments { path, output } => cmd_attachments(&path, output, &config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = msgshell::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "msgshell.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

fn open(path: &Path, config: &Config) -> anyhow::Result<ParsedMessage> {
    msgshell::parse_file(path, &config.parser)
        .with_context(|| format!("Could not read {}", path.display()))
}

/// Print a human-readable summary or the JSON form of a message.
fn cmd_show(path: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    let message = open(path, config)?;
    if json {
        println!(
            "{}",
            msgshell::export::json::to_json(&message, config.export.json_pretty)?
        );
    } else {
        print!("{}", msgshell::export::text::render_text(&message));
    }
    Ok(())
}

fn cmd_body(path: &Path, format: BodyFormat, config: &Config) -> anyhow::Result<()> {
    let message = open(path, config)?;
    match msgshell::export::text::select_body(&message, format) {
        Some(body) => println!("{body}"),
        None => anyhow::bail!("{} has no {:?} body", path.display(), format),
    }
    Ok(())
}

fn cmd_properties(path: &Path, config: &Config) -> anyhow::Result<()> {
    let message = open(path, config)?;
    print!("{}", message.property_listing());
    Ok(())
}

/// Extract all attachments of a message, recursing into embedded messages.
fn cmd_attachments(path: &Path, output: Option<PathBuf>, config: &Config) -> anyhow::Result<()> {
    let output = output
        .or_else(|| config.export.default_output_dir.clone())
        .context("No output directory given (use -o or set export.default_output_dir)")?;
    let message = open(path, config)?;

    let paths = msgshell::export::attachment::export_all_attachments(&message, &output)?;
    if paths.is_empty() {
        println!("  No attachments found.");
        return Ok(());
    }

    use humansize::{format_size, BINARY};
    let total: u64 = paths
        .iter()
        .filter_map(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .sum();
    println!(
        "  Extracted {} attachment(s), {} to {}",
        paths.len(),
        format_size(total, BINARY),
        output.display()
    );
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "msgshell", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
