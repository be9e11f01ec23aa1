use clap::{Args, Parser, Subcommand};
use relnotes::commands::{self, RunOptions, SourceOptions};
use relnotes::core::config::Config;
use relnotes::core::error::{NotesError, NotesResult, ResultExt, print_error};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Draft release notes from git history, with a human review step
#[derive(Parser)]
#[command(name = "relnotes")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  #[command(subcommand)]
  command: Commands,

  /// Config file (default: relnotes.toml, .relnotes.toml or .config/relnotes.toml)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Debug-level diagnostics on stderr (RUST_LOG takes precedence)
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Also append diagnostics to this file
  #[arg(long, global = true)]
  log_file: Option<PathBuf>,
}

#[derive(Args)]
struct RangeArgs {
  /// Start of the range (exclusive)
  #[arg(long = "from")]
  from: String,
  /// End of the range (inclusive)
  #[arg(long = "to")]
  to: String,
  /// Local path or clonable URL (overrides [source] repo)
  #[arg(long)]
  repo: Option<String>,
  /// Read change records from a JSON file instead of git
  #[arg(long, conflicts_with = "repo")]
  records: Option<PathBuf>,
}

impl From<RangeArgs> for SourceOptions {
  fn from(args: RangeArgs) -> Self {
    Self {
      from: args.from,
      to: args.to,
      repo: args.repo,
      records: args.records,
    }
  }
}

#[derive(Subcommand)]
enum Commands {
  /// Harvest, classify and escalate a range, then write the review manifest
  Run {
    #[command(flatten)]
    range: RangeArgs,
    /// Manifest path (overrides [output] manifest)
    #[arg(long)]
    manifest: Option<PathBuf>,
    /// Render Markdown after writing the manifest (optionally to PATH)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    render: Option<Option<PathBuf>>,
    /// Wait for ENTER after writing the manifest so it can be edited first
    #[arg(long)]
    review: bool,
    /// Print a JSON summary instead of text
    #[arg(long)]
    json: bool,
    /// No progress or summary output
    #[arg(short, long)]
    quiet: bool,
  },

  /// Run only the deterministic rules and show what would be escalated
  Classify {
    #[command(flatten)]
    range: RangeArgs,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Render a reviewed manifest to Markdown
  Render {
    /// Manifest to read (overrides [output] manifest)
    #[arg(long)]
    manifest: Option<PathBuf>,
    /// Markdown output path (overrides [output] notes)
    #[arg(long)]
    output: Option<PathBuf>,
    /// No summary output
    #[arg(short, long)]
    quiet: bool,
  },
}

/// Get custom styles for CLI help output
fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

/// Diagnostics go to stderr (and optionally a file); stdout stays for command output
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> NotesResult<()> {
  let filter = match std::env::var("RUST_LOG") {
    Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
    _ if verbose => EnvFilter::new("relnotes=debug"),
    _ => EnvFilter::new("relnotes=warn"),
  };

  let file_layer = match log_file {
    Some(path) => {
      let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
      Some(
        tracing_subscriber::fmt::layer()
          .with_ansi(false)
          .with_writer(Mutex::new(file)),
      )
    }
    None => None,
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .with(file_layer)
    .init();

  Ok(())
}

fn load_config(path: Option<&Path>) -> NotesResult<Config> {
  match path {
    Some(path) => Config::load_from(path),
    None => {
      let cwd = std::env::current_dir().context("Failed to get current directory")?;
      Config::load_or_default(&cwd)
    }
  }
}

fn main() {
  let cli = Cli::parse();

  let config = match load_config(cli.config.as_deref()) {
    Ok(config) => config,
    Err(err) => handle_error(err),
  };

  let log_file = cli.log_file.clone().or_else(|| config.logging.file.clone());
  if let Err(err) = init_tracing(cli.verbose, log_file.as_deref()) {
    handle_error(err);
  }

  let result = match cli.command {
    Commands::Run {
      range,
      manifest,
      render,
      review,
      json,
      quiet,
    } => {
      let options = RunOptions {
        manifest,
        render,
        review,
        json,
        quiet,
      };
      commands::run_pipeline(&config, &range.into(), &options)
    }
    Commands::Classify { range, json } => commands::run_classify(&config, &range.into(), json),
    Commands::Render {
      manifest,
      output,
      quiet,
    } => commands::run_render(&config, manifest, output, quiet),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: NotesError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
