use std::path::PathBuf;

use anyhow::{Context, Result};

use fpl_features::season::SeasonSpec;
use fpl_features::synthetic::{self, SyntheticConfig};

fn main() -> Result<()> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let out = parse_arg(&args, "--out")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("synthetic"));
    let mut config = SyntheticConfig {
        seasons: SeasonSpec::default_catalog(),
        teams: 20,
        players_per_team: 15,
        gameweeks: 38,
        ..SyntheticConfig::default()
    };
    if let Some(seed) = parse_arg(&args, "--seed") {
        config.seed = seed
            .parse()
            .with_context(|| format!("--seed expects an integer, got {seed:?}"))?;
    }

    let summary = synthetic::write_source_tree(&out, &config)?;
    println!("Synthetic seasons written");
    println!("Root: {}", out.display());
    println!("Seasons: {}", summary.seasons);
    println!("Rows: {}", summary.rows_written);
    println!("Run: FPL_DATA_DIR={} fpl_features", out.display());
    Ok(())
}

fn parse_arg(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix)
            && !value.trim().is_empty()
        {
            return Some(value.trim().to_string());
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}
