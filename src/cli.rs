use crate::{
    builder::{self, Labels},
    config::Config,
    model::InspectionReport,
    pipeline::ReportGenerator,
    render::pdf::fonts::{FontResolver, ProbeStatus, SystemFonts},
    util::ensure_dir,
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "inspection-report")]
#[command(about = "Render building safety inspection results to Word or PDF")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./inspection-report.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Label language for the report body (en/zh).
    #[arg(long)]
    pub lang: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a report. Without --input the built-in sample is used.
    Render {
        #[arg(long)]
        input: Option<PathBuf>,
        /// word | docx | pdf
        #[arg(long)]
        format: Option<String>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Print the document tree as JSON.
    Tree {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Show which PDF font candidates are usable.
    Fonts {},
    /// Print the built-in sample report.
    Sample {},
}

pub fn dispatch(args: Args) -> Result<()> {
    let mut cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    if let Some(lang) = &args.lang {
        cfg.report.language = lang.clone();
    }

    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    match &args.cmd {
        Command::Render {
            input,
            format,
            out_dir,
        } => render(&cfg, input.as_deref(), format.as_deref(), out_dir.as_deref()),
        Command::Tree { input } => tree(&cfg, input.as_deref()),
        Command::Fonts {} => fonts(&cfg),
        Command::Sample {} => {
            println!("{}", serde_json::to_string_pretty(&InspectionReport::sample())?);
            Ok(())
        }
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    ["inspection-report.toml", "inspection-report.example.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output; logs go to stderr.
    let console_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from(&cfg.output.dir).join("inspection-report.log"))
}

fn load_input(input: Option<&Path>) -> Result<InspectionReport> {
    match input {
        Some(path) => InspectionReport::load(path),
        None => {
            debug!("no --input given; using the built-in sample report");
            Ok(InspectionReport::sample())
        }
    }
}

fn render(
    cfg: &Config,
    input: Option<&Path>,
    format: Option<&str>,
    out_dir: Option<&Path>,
) -> Result<()> {
    let report = load_input(input)?;
    let format = format.unwrap_or(cfg.output.format.as_str());
    let out_dir = out_dir
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.output.dir));

    let generator = ReportGenerator::new(cfg);
    let path = generator.generate(&report, format, &out_dir)?;
    info!("done: {}", path.display());

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "status": "ok",
            "format": format.to_ascii_lowercase(),
            "report_id": report.report_id,
            "path": path,
        }))?
    );
    Ok(())
}

fn tree(cfg: &Config, input: Option<&Path>) -> Result<()> {
    let report = load_input(input)?;
    let labels = Labels::for_language(&cfg.report.language);
    let tree = builder::build_with(&report, &labels);
    println!("{}", serde_json::to_string_pretty(&tree)?);
    Ok(())
}

fn fonts(cfg: &Config) -> Result<()> {
    let probes = FontResolver::new(SystemFonts).probe(&cfg.pdf.font_candidates);
    let selected = probes
        .iter()
        .find(|p| matches!(p.status, ProbeStatus::Registered { .. }))
        .map(|p| p.path.clone())
        .unwrap_or_else(|| "built-in Helvetica".to_string());

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "pdf_backend": cfg!(feature = "pdf"),
            "selected": selected,
            "candidates": probes,
        }))?
    );
    Ok(())
}
