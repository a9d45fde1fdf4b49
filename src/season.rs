use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Seasons loaded by default, newest first.
pub const DEFAULT_SEASONS: [&str; 7] = [
    "2022-23", "2021-22", "2020-21", "2019-20", "2018-19", "2017-18", "2016-17",
];
const DEFAULT_SEASON_START_YEARS: [i32; 7] = [2022, 2021, 2020, 2019, 2018, 2017, 2016];

// Last season whose team names live in the shared master list.
const LAST_MASTER_LIST_SEASON: i32 = 2020;
// Last season whose positions come from a separate players table.
const LAST_PLAYERS_RAW_SEASON: i32 = 2019;
// From this season on the players table keys carry the player id.
const FIRST_KEYED_PLAYERS_RAW_SEASON: i32 = 2018;
const LAST_LATIN1_SEASON: i32 = 2018;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    #[serde(rename = "utf-8", alias = "utf8", alias = "utf_8")]
    Utf8,
    #[serde(rename = "latin-1", alias = "latin1", alias = "iso-8859-1")]
    Latin1,
}

impl TextEncoding {
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            TextEncoding::Utf8 => {
                let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                String::from_utf8(body.to_vec()).context("decode utf-8 text")
            }
            // Every latin-1 byte is the code point of the same value.
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamSource {
    /// `data/master_team_list.csv`, filtered by season.
    MasterList,
    /// `data/<season>/teams.csv`.
    SeasonFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSource {
    /// Position column already present in the gameweek table.
    Embedded,
    /// `data/<season>/players_raw.csv`; `keyed_by_id` selects the
    /// `First_Last_<id>` key format over `First_Last`.
    PlayersRaw { keyed_by_id: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonSpec {
    pub label: String,
    pub encoding: TextEncoding,
    pub teams: TeamSource,
    pub positions: PositionSource,
}

impl SeasonSpec {
    /// Layout rules for a `YYYY-YY` season label.
    pub fn standard(label: &str) -> Result<Self> {
        let start = start_year(label)?;
        Ok(Self::for_start_year(label.to_string(), start))
    }

    fn for_start_year(label: String, start: i32) -> Self {
        let encoding = if (2016..=LAST_LATIN1_SEASON).contains(&start) {
            TextEncoding::Latin1
        } else {
            TextEncoding::Utf8
        };
        let teams = if start <= LAST_MASTER_LIST_SEASON {
            TeamSource::MasterList
        } else {
            TeamSource::SeasonFile
        };
        let positions = if start <= LAST_PLAYERS_RAW_SEASON {
            PositionSource::PlayersRaw {
                keyed_by_id: start >= FIRST_KEYED_PLAYERS_RAW_SEASON,
            }
        } else {
            PositionSource::Embedded
        };
        Self {
            label,
            encoding,
            teams,
            positions,
        }
    }

    pub fn default_catalog() -> Vec<Self> {
        DEFAULT_SEASON_START_YEARS
            .iter()
            .map(|&start| Self::for_start_year(season_label(start), start))
            .collect()
    }

    pub fn season_dir(&self, data_dir: &Path) -> PathBuf {
        data_dir.join("data").join(&self.label)
    }

    pub fn gameweeks_path(&self, data_dir: &Path) -> PathBuf {
        self.season_dir(data_dir).join("gws").join("merged_gw.csv")
    }

    pub fn teams_path(&self, data_dir: &Path) -> PathBuf {
        match self.teams {
            TeamSource::MasterList => master_team_list_path(data_dir),
            TeamSource::SeasonFile => self.season_dir(data_dir).join("teams.csv"),
        }
    }

    pub fn players_raw_path(&self, data_dir: &Path) -> PathBuf {
        self.season_dir(data_dir).join("players_raw.csv")
    }
}

pub fn master_team_list_path(data_dir: &Path) -> PathBuf {
    data_dir.join("data").join("master_team_list.csv")
}

/// `2019` → `2019-20`.
pub fn season_label(start: i32) -> String {
    format!("{start}-{:02}", (start + 1).rem_euclid(100))
}

pub fn start_year(label: &str) -> Result<i32> {
    let (start, end) = label
        .split_once('-')
        .ok_or_else(|| anyhow!("season label {label:?} is not of the form YYYY-YY"))?;
    if start.len() != 4 || end.len() != 2 || !end.chars().all(|c| c.is_ascii_digit()) {
        return Err(anyhow!("season label {label:?} is not of the form YYYY-YY"));
    }
    start
        .parse::<i32>()
        .with_context(|| format!("season label {label:?} has a non-numeric start year"))
}
