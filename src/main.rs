//! Command line front end: builds a project, prints the optimization plan or explains
//! how a single file would be processed.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use asset_pipeline::logging::{LogLevel, init_logging};
use asset_pipeline::sources::collect_sources;
use asset_pipeline::{
  BuildMode, BuildOrchestrator, BuildParams, PipelineConfig, TransformRegistry,
};

/// Rule-driven asset pipeline for front-end bundles
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
  /// Project root containing the configuration file
  #[arg(long, global = true, default_value = ".", value_hint = clap::ValueHint::DirPath)]
  root: PathBuf,

  /// Output verbosity (silent, error, warn, info, debug)
  #[arg(long, global = true, default_value = "info")]
  log_level: LogLevel,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Build the project and write the output directory
  #[command(visible_alias = "b")]
  Build(BuildArgs),

  /// Print the optimization plan for a mode as JSON
  Plan {
    /// Build mode
    #[arg(long, default_value = "development")]
    mode: BuildMode,
  },

  /// Print the transform chain a file would get as JSON
  Explain {
    /// Project relative path of the file
    path: String,

    /// Build mode
    #[arg(long, default_value = "development")]
    mode: BuildMode,

    /// File size in bytes; read from disk when omitted
    #[arg(long)]
    size: Option<u64>,
  },
}

#[derive(Args, Debug)]
struct BuildArgs {
  /// Build mode
  #[arg(long, default_value = "production")]
  mode: BuildMode,

  /// Source directories relative to the root
  #[arg(long = "src", default_value = "src")]
  sources: Vec<String>,

  /// Entry point as `name=path`
  #[arg(long = "entry", value_parser = parse_entry, default_value = "main=src/main.js")]
  entries: Vec<(String, String)>,

  /// Output directory relative to the root
  #[arg(long = "out", default_value = "build", value_hint = clap::ValueHint::DirPath)]
  output: PathBuf,
}

fn parse_entry(value: &str) -> Result<(String, String), String> {
  match value.split_once('=') {
    Some((name, path)) if !name.is_empty() && !path.is_empty() => {
      Ok((name.to_string(), path.to_string()))
    }
    _ => Err(format!("expected `name=path`, got `{value}`")),
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(cli.log_level);

  let config = PipelineConfig::discover(&cli.root)
    .with_context(|| format!("failed to load configuration from {}", cli.root.display()))?;

  match cli.command {
    Command::Build(args) => build(&cli.root, config, args),
    Command::Plan { mode } => {
      let orchestrator = BuildOrchestrator::new(config, TransformRegistry::with_builtins())?;
      print_json(&orchestrator.plan(mode))
    }
    Command::Explain { path, mode, size } => {
      let orchestrator = BuildOrchestrator::new(config, TransformRegistry::with_builtins())?;
      let size = match size {
        Some(size) => size,
        None => fs::metadata(cli.root.join(&path))
          .with_context(|| format!("failed to read {path}; pass --size for files not on disk"))?
          .len(),
      };
      print_json(&orchestrator.explain(&path, size, mode))
    }
  }
}

fn build(root: &Path, config: PipelineConfig, args: BuildArgs) -> Result<()> {
  let template = match config.html_template_path(root) {
    Some(path) if path.is_file() => Some(
      fs::read_to_string(&path)
        .with_context(|| format!("failed to read HTML template {}", path.display()))?,
    ),
    _ => None,
  };
  let clean = config.output.clean;

  let files = collect_sources(root, &args.sources)?;
  if files.is_empty() {
    bail!("no source files found below {}", root.display());
  }

  let output_dir = root.join(&args.output);
  let mut params = BuildParams::new(args.mode).output_dir(&output_dir);
  for (name, path) in &args.entries {
    params = params.entry(name, path);
  }
  if let Some(template) = template {
    params = params.html_template(template);
  }

  let mut orchestrator = BuildOrchestrator::new(config, TransformRegistry::with_builtins())?;
  let result = orchestrator.run(&files, &params)?;
  let written = result.emit(&output_dir, clean)?;

  for warning in &result.warnings {
    eprintln!("warning: {warning}");
  }
  info!(
    files = written.len(),
    out = %output_dir.display(),
    "wrote {} build",
    result.mode
  );
  Ok(())
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
