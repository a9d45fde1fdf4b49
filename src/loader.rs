use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::names::normalize_player_name;
use crate::progress::{PipelineEvent, ProgressObserver, Stage};
use crate::record::{MatchRecord, Position};
use crate::reference::{PlayerPositionMap, TeamNameMap, read_text};
use crate::season::{PositionSource, SeasonSpec};

/// Columns every gameweek table must carry. `position` is additionally
/// required for seasons that embed it.
const REQUIRED_COLUMNS: [&str; 16] = [
    "name",
    "GW",
    "opponent_team",
    "kickoff_time",
    "was_home",
    "selected",
    "minutes",
    "total_points",
    "saves",
    "bonus",
    "clean_sheets",
    "goals_conceded",
    "goals_scored",
    "assists",
    "red_cards",
    "yellow_cards",
];

#[derive(Debug, Deserialize)]
struct GameweekRow {
    name: Option<String>,
    #[serde(default)]
    position: Option<String>,
    #[serde(rename = "GW")]
    gameweek: Option<f64>,
    opponent_team: i64,
    kickoff_time: Option<String>,
    was_home: Option<String>,
    selected: Option<f64>,
    minutes: Option<f64>,
    total_points: Option<f64>,
    saves: Option<f64>,
    bonus: Option<f64>,
    clean_sheets: Option<f64>,
    goals_conceded: Option<f64>,
    goals_scored: Option<f64>,
    assists: Option<f64>,
    red_cards: Option<f64>,
    yellow_cards: Option<f64>,
}

/// A gameweek row after team and position resolution; any field may still be
/// missing until the null drop.
#[derive(Debug, Clone, Default)]
struct PartialRecord {
    season: String,
    gameweek: Option<u32>,
    name: Option<String>,
    position: Option<Position>,
    opponent_name: String,
    opponent_team: i64,
    kickoff_time: Option<DateTime<Utc>>,
    was_home: Option<bool>,
    selected: Option<i64>,
    selected_weight: Option<f64>,
    minutes: Option<i32>,
    total_points: Option<i32>,
    saves: Option<i32>,
    bonus: Option<i32>,
    clean_sheets: Option<i32>,
    goals_conceded: Option<i32>,
    goals_scored: Option<i32>,
    assists: Option<i32>,
    red_cards: Option<i32>,
    yellow_cards: Option<i32>,
}

impl PartialRecord {
    fn complete(self) -> Option<MatchRecord> {
        let name = self.name?;
        Some(MatchRecord {
            name_cleaned: normalize_player_name(&name),
            name,
            season: self.season,
            gameweek: self.gameweek?,
            position: self.position?,
            opponent_name: self.opponent_name,
            opponent_team: self.opponent_team,
            kickoff_time: self.kickoff_time?,
            was_home: self.was_home?,
            selected: self.selected?,
            selected_weight: self.selected_weight?,
            minutes: self.minutes?,
            total_points: self.total_points?,
            saves: self.saves?,
            bonus: self.bonus?,
            clean_sheets: self.clean_sheets?,
            goals_conceded: self.goals_conceded?,
            goals_scored: self.goals_scored?,
            assists: self.assists?,
            red_cards: self.red_cards?,
            yellow_cards: self.yellow_cards?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonSummary {
    pub season: String,
    pub rows: usize,
    pub unresolved_positions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub seasons: Vec<SeasonSummary>,
    pub rows_before_drop: usize,
    pub rows_after_drop: usize,
    /// Rows sharing (season, gameweek, player, kickoff) with an earlier row.
    pub duplicate_keys: usize,
}

impl LoadReport {
    pub fn dropped(&self) -> usize {
        self.rows_before_drop.saturating_sub(self.rows_after_drop)
    }
}

#[derive(Debug, Clone)]
pub struct LoadedData {
    pub records: Vec<MatchRecord>,
    pub report: LoadReport,
}

#[derive(Debug)]
pub struct SeasonRows {
    rows: Vec<PartialRecord>,
    pub unresolved_positions: usize,
}

impl SeasonRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Loads every season in `seasons`, unifies them into one table sorted by
/// (season, gameweek, opponent, kickoff, name) and drops incomplete rows.
pub fn load_all(
    data_dir: &Path,
    seasons: &[SeasonSpec],
    observer: &mut impl ProgressObserver,
) -> Result<LoadedData> {
    if seasons.is_empty() {
        return Err(anyhow!("no seasons to load"));
    }

    let mut partial = Vec::new();
    let mut summaries = Vec::with_capacity(seasons.len());
    for spec in seasons {
        let season_rows =
            load_season(spec, data_dir).with_context(|| format!("load season {}", spec.label))?;
        observer.on_event(&PipelineEvent::SeasonLoaded {
            season: spec.label.clone(),
            rows: season_rows.len(),
        });
        summaries.push(SeasonSummary {
            season: spec.label.clone(),
            rows: season_rows.len(),
            unresolved_positions: season_rows.unresolved_positions,
        });
        partial.extend(season_rows.rows);
    }

    let (records, report) = unify(partial, summaries);
    observer.on_event(&PipelineEvent::NullsDropped {
        before: report.rows_before_drop,
        after: report.rows_after_drop,
    });
    observer.on_event(&PipelineEvent::StageFinished { stage: Stage::Load });
    Ok(LoadedData { records, report })
}

pub fn load_season(spec: &SeasonSpec, data_dir: &Path) -> Result<SeasonRows> {
    let teams = TeamNameMap::load(spec, data_dir)?;
    let positions = PlayerPositionMap::load(spec, data_dir)?;
    let path = spec.gameweeks_path(data_dir);
    let text = read_text(&path, spec.encoding)?;
    let rows = parse_gameweeks(&text, spec, &teams, positions.as_ref())
        .with_context(|| format!("parse {}", path.display()))?;
    tracing::debug!(
        season = %spec.label,
        rows = rows.len(),
        teams = teams.len(),
        unresolved_positions = rows.unresolved_positions,
        "parsed gameweek table"
    );
    Ok(rows)
}

/// Parses one season's gameweek table, resolving opponents through `teams`
/// and positions through `positions` (or the embedded column when `None`).
pub fn parse_gameweeks(
    text: &str,
    spec: &SeasonSpec,
    teams: &TeamNameMap,
    positions: Option<&PlayerPositionMap>,
) -> Result<SeasonRows> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers = reader.headers().context("read header row")?.clone();
    let mut required: Vec<&str> = REQUIRED_COLUMNS.to_vec();
    if spec.positions == PositionSource::Embedded {
        required.push("position");
    }
    if let Some(missing) = required
        .iter()
        .find(|col| !headers.iter().any(|h| h == **col))
    {
        return Err(anyhow!("column {missing:?} missing from gameweek table"));
    }

    let mut rows = Vec::new();
    let mut unresolved_positions = 0usize;
    for (idx, row) in reader.deserialize::<GameweekRow>().enumerate() {
        let row = row.with_context(|| format!("read gameweek row {}", idx + 1))?;
        let opponent_name = teams.resolve(row.opponent_team)?.to_string();
        let position = match positions {
            Some(map) => row.name.as_deref().and_then(|name| map.get(name)),
            None => row.position.as_deref().and_then(Position::from_code),
        };
        if position.is_none() {
            unresolved_positions += 1;
        }
        rows.push(PartialRecord {
            season: spec.label.clone(),
            gameweek: row.gameweek.and_then(to_gameweek),
            name: row.name,
            position,
            opponent_name,
            opponent_team: row.opponent_team,
            kickoff_time: row.kickoff_time.as_deref().and_then(parse_kickoff),
            was_home: row.was_home.as_deref().and_then(parse_flag),
            selected: row.selected.and_then(to_count).map(i64::from),
            selected_weight: None,
            minutes: row.minutes.and_then(to_count),
            total_points: row.total_points.and_then(to_count),
            saves: row.saves.and_then(to_count),
            bonus: row.bonus.and_then(to_count),
            clean_sheets: row.clean_sheets.and_then(to_count),
            goals_conceded: row.goals_conceded.and_then(to_count),
            goals_scored: row.goals_scored.and_then(to_count),
            assists: row.assists.and_then(to_count),
            red_cards: row.red_cards.and_then(to_count),
            yellow_cards: row.yellow_cards.and_then(to_count),
        });
    }

    apply_selected_weight(&mut rows);
    if unresolved_positions > 0 {
        tracing::warn!(
            season = %spec.label,
            unresolved_positions,
            "rows without a resolvable position will be dropped"
        );
    }
    Ok(SeasonRows {
        rows,
        unresolved_positions,
    })
}

fn unify(partial: Vec<PartialRecord>, seasons: Vec<SeasonSummary>) -> (Vec<MatchRecord>, LoadReport) {
    let rows_before_drop = partial.len();
    let mut records: Vec<MatchRecord> = partial
        .into_iter()
        .filter_map(PartialRecord::complete)
        .collect();
    records.sort_by(MatchRecord::load_order);

    let mut seen = HashSet::with_capacity(records.len());
    let duplicate_keys = records
        .iter()
        .filter(|r| {
            !seen.insert((
                r.season.as_str(),
                r.gameweek,
                r.name_cleaned.as_str(),
                r.kickoff_time,
            ))
        })
        .count();
    if duplicate_keys > 0 {
        tracing::warn!(duplicate_keys, "duplicate (season, gameweek, player, kickoff) rows");
    }

    let report = LoadReport {
        seasons,
        rows_before_drop,
        rows_after_drop: records.len(),
        duplicate_keys,
    };
    (records, report)
}

/// Selection count relative to the season mean, so seasons with very
/// different player counts compare. Rows without a count stay null.
fn apply_selected_weight(rows: &mut [PartialRecord]) {
    let (sum, n) = rows
        .iter()
        .filter_map(|r| r.selected)
        .fold((0.0_f64, 0usize), |(sum, n), s| (sum + s as f64, n + 1));
    if n == 0 {
        return;
    }
    let mean = sum / n as f64;
    if mean <= 0.0 {
        return;
    }
    for row in rows {
        row.selected_weight = row.selected.map(|s| s as f64 / mean);
    }
}

fn to_count(value: f64) -> Option<i32> {
    if !value.is_finite() || value.fract() != 0.0 {
        return None;
    }
    i32::try_from(value as i64).ok()
}

fn to_gameweek(value: f64) -> Option<u32> {
    to_count(value).and_then(|v| u32::try_from(v).ok())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim() {
        "True" | "true" | "TRUE" | "1" => Some(true),
        "False" | "false" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}

fn parse_kickoff(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
