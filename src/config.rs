use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::season::{SeasonSpec, TextEncoding};
use crate::window::{WindowBin, default_bins};

pub const DATA_DIR_ENV: &str = "FPL_DATA_DIR";
pub const DEFAULT_OPPONENT_HISTORY: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Root of the source tree; season files live under `<data_dir>/data/`.
    pub data_dir: PathBuf,
    pub seasons: Vec<SeasonSpec>,
    pub bins: Vec<WindowBin>,
    /// Gameweeks averaged for the opponent goals-conceded feature.
    pub opponent_history: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            seasons: SeasonSpec::default_catalog(),
            bins: default_bins(),
            opponent_history: DEFAULT_OPPONENT_HISTORY,
        }
    }
}

/// On-disk overrides; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub data_dir: Option<PathBuf>,
    pub seasons: Option<Vec<String>>,
    #[serde(default)]
    pub encodings: HashMap<String, TextEncoding>,
    pub bins: Option<Vec<[usize; 2]>>,
    pub opponent_history: Option<usize>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse config {}", path.display()))
    }
}

impl PipelineConfig {
    /// Defaults, then the optional config file, then `FPL_DATA_DIR` from the
    /// environment (`.env.local` / `.env` are honoured).
    pub fn resolve(config_path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");

        let file = match config_path {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        let mut config = Self::default().with_file(file)?;
        if let Ok(dir) = std::env::var(DATA_DIR_ENV)
            && !dir.trim().is_empty()
        {
            config.data_dir = PathBuf::from(dir.trim());
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_file(mut self, file: ConfigFile) -> Result<Self> {
        if let Some(dir) = file.data_dir {
            self.data_dir = dir;
        }
        if let Some(labels) = file.seasons {
            self.seasons = labels
                .iter()
                .map(|label| SeasonSpec::standard(label))
                .collect::<Result<Vec<_>>>()?;
        }
        for (label, encoding) in file.encodings {
            let spec = self
                .seasons
                .iter_mut()
                .find(|s| s.label == label)
                .ok_or_else(|| anyhow!("encoding override for unknown season {label}"))?;
            spec.encoding = encoding;
        }
        if let Some(bins) = file.bins {
            self.bins = bins
                .iter()
                .map(|&[start, end]| WindowBin::new(start, end))
                .collect::<Result<Vec<_>>>()?;
        }
        if let Some(history) = file.opponent_history {
            self.opponent_history = history;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.seasons.is_empty() {
            return Err(anyhow!("at least one season is required"));
        }
        if self.opponent_history == 0 {
            return Err(anyhow!("opponent_history must be at least 1"));
        }
        if let Some(bin) = self.bins.iter().find(|b| b.start() >= b.end()) {
            return Err(anyhow!(
                "window bin ({}, {}) must start before it ends",
                bin.start(),
                bin.end()
            ));
        }
        Ok(())
    }

    pub fn season_labels(&self) -> Vec<&str> {
        self.seasons.iter().map(|s| s.label.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::season::DEFAULT_SEASONS;

    #[test]
    fn defaults_cover_every_season() {
        let config = PipelineConfig::default();
        assert_eq!(config.season_labels(), DEFAULT_SEASONS.to_vec());
        assert_eq!(config.bins.len(), 7);
        assert_eq!(config.bins[6], WindowBin::new(10, 20).unwrap());
        assert_eq!(config.opponent_history, 5);
        config.validate().unwrap();
    }

    #[test]
    fn file_overrides_apply() {
        let file: ConfigFile = serde_json::from_str(
            r#"{
                "data_dir": "/srv/fpl",
                "seasons": ["2021-22", "2018-19"],
                "encodings": {"2018-19": "utf-8"},
                "bins": [[0, 1], [1, 3]],
                "opponent_history": 3
            }"#,
        )
        .unwrap();
        let config = PipelineConfig::default().with_file(file).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/fpl"));
        assert_eq!(config.season_labels(), vec!["2021-22", "2018-19"]);
        assert_eq!(config.seasons[1].encoding, TextEncoding::Utf8);
        assert_eq!(config.bins[1], WindowBin::new(1, 3).unwrap());
        assert_eq!(config.opponent_history, 3);
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let bad_bin: ConfigFile = serde_json::from_str(r#"{"bins": [[3, 1]]}"#).unwrap();
        assert!(PipelineConfig::default().with_file(bad_bin).is_err());

        let bad_encoding: ConfigFile =
            serde_json::from_str(r#"{"encodings": {"1999-00": "latin-1"}}"#).unwrap();
        assert!(PipelineConfig::default().with_file(bad_encoding).is_err());

        let zero_history: ConfigFile = serde_json::from_str(r#"{"opponent_history": 0}"#).unwrap();
        let config = PipelineConfig::default().with_file(zero_history).unwrap();
        assert!(config.validate().is_err());

        assert!(serde_json::from_str::<ConfigFile>(r#"{"bogus": 1}"#).is_err());
    }
}
