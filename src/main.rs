use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use fpl_features::config::PipelineConfig;
use fpl_features::export::{self, ExportFormat};
use fpl_features::pipeline;
use fpl_features::progress::TracingObserver;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let config_path = arg_value(&args, "--config").map(PathBuf::from);
    let mut config = PipelineConfig::resolve(config_path.as_deref())?;
    if let Some(dir) = arg_value(&args, "--data-dir") {
        config.data_dir = PathBuf::from(dir);
    }
    let format = match arg_value(&args, "--format") {
        Some(raw) => ExportFormat::parse(&raw)?,
        None => ExportFormat::Csv,
    };
    let out = arg_value(&args, "--out")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("features.{}", format.extension())));

    tracing::info!(
        data_dir = %config.data_dir.display(),
        seasons = config.seasons.len(),
        "starting feature pipeline"
    );
    let output = pipeline::run(&config, &mut TracingObserver)?;
    export::write(&output.table, &out, format)
        .with_context(|| format!("write features to {}", out.display()))?;
    if let Some(manifest) = arg_value(&args, "--manifest") {
        let manifest = PathBuf::from(manifest);
        export::write_manifest(&output.table, &manifest)?;
        println!("Manifest: {}", manifest.display());
    }

    println!("Feature pipeline complete");
    println!("Output: {}", out.display());
    for season in &output.report.seasons {
        println!(
            " - {}: {} rows ({} unresolved positions)",
            season.season, season.rows, season.unresolved_positions
        );
    }
    println!(
        "Rows: {} kept, {} dropped for missing values",
        output.report.rows_after_drop,
        output.report.dropped()
    );
    if output.report.duplicate_keys > 0 {
        println!("Duplicate player/fixture keys: {}", output.report.duplicate_keys);
    }
    println!("Feature columns: {}", output.table.columns.len());
    Ok(())
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
