use std::ops::Range;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::features::{
    ColumnValues, FeatureColumn, FeatureDescriptor, FeatureKind, FeatureRow, FeatureTable,
};
use crate::progress::{PipelineEvent, ProgressObserver, Stage, report_row};
use crate::record::MatchRecord;

/// Last game, game before last, ..., games 5-10 back, games 10-20 back.
pub const DEFAULT_BINS: [(usize, usize); 7] =
    [(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 10), (10, 20)];

pub const POSITION_FEATURE: &str = "f|current|position|";
pub const IS_HOME_FEATURE: &str = "f|current|is_home";

/// A trailing window over one player's own rows: from `end` rows back up to
/// but excluding `start` rows back. `(0, 1)` is the previous game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct WindowBin {
    start: usize,
    end: usize,
}

impl WindowBin {
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if start >= end {
            return Err(anyhow!(
                "window bin ({start}, {end}) must start before it ends"
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn label(&self) -> String {
        format!("{}_to_{}", self.start, self.end)
    }

    /// Rows of the window for row `n`, whose player's rows begin at
    /// `player_start`. `None` when the window reaches before the table or
    /// into another player's rows.
    pub fn rows_for(&self, n: usize, player_start: usize) -> Option<Range<usize>> {
        let lo = n.checked_sub(self.end)?;
        let hi = n.checked_sub(self.start)?;
        if lo < player_start || lo >= hi {
            return None;
        }
        Some(lo..hi)
    }
}

pub fn default_bins() -> Vec<WindowBin> {
    DEFAULT_BINS
        .iter()
        .map(|&(start, end)| WindowBin { start, end })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedStat {
    TotalPoints,
    Minutes,
    GoalsScored,
    Assists,
    CleanSheets,
    Bonus,
    WasHome,
    OpponentGcHistory,
    OpponentGcHistoryAvailable,
}

impl TrackedStat {
    pub const ALL: [TrackedStat; 9] = [
        TrackedStat::TotalPoints,
        TrackedStat::Minutes,
        TrackedStat::GoalsScored,
        TrackedStat::Assists,
        TrackedStat::CleanSheets,
        TrackedStat::Bonus,
        TrackedStat::WasHome,
        TrackedStat::OpponentGcHistory,
        TrackedStat::OpponentGcHistoryAvailable,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TrackedStat::TotalPoints => "total_points",
            TrackedStat::Minutes => "minutes",
            TrackedStat::GoalsScored => "goals_scored",
            TrackedStat::Assists => "assists",
            TrackedStat::CleanSheets => "clean_sheets",
            TrackedStat::Bonus => "bonus",
            TrackedStat::WasHome => "was_home",
            TrackedStat::OpponentGcHistory => "opponent_gc_history",
            TrackedStat::OpponentGcHistoryAvailable => "opponent_gc_history_available",
        }
    }

    pub fn value(self, row: &FeatureRow) -> f64 {
        let r = &row.record;
        match self {
            TrackedStat::TotalPoints => f64::from(r.total_points),
            TrackedStat::Minutes => f64::from(r.minutes),
            TrackedStat::GoalsScored => f64::from(r.goals_scored),
            TrackedStat::Assists => f64::from(r.assists),
            TrackedStat::CleanSheets => f64::from(r.clean_sheets),
            TrackedStat::Bonus => f64::from(r.bonus),
            TrackedStat::WasHome => flag(r.was_home),
            TrackedStat::OpponentGcHistory => row.opponent.mean_goals_conceded,
            TrackedStat::OpponentGcHistoryAvailable => flag(row.opponent.available),
        }
    }
}

pub fn windowed_feature_name(stat: TrackedStat, bin: WindowBin) -> String {
    format!("f|{}|{}", stat.name(), bin.label())
}

pub fn player_exists_feature_name(bin: WindowBin) -> String {
    format!("f|player_exists|{}", bin.label())
}

pub fn current_season_feature_name(bin: WindowBin) -> String {
    format!("f|current_season|{}", bin.label())
}

/// Sorts `rows` by (player, season, gameweek, kickoff) and derives, for every
/// row and bin, the mean of each tracked stat over the window plus the
/// player-exists and current-season flags. Windows that are not fully backed
/// by the player's own history are zero-filled with both flags at 0.
pub fn build_window_features(
    mut rows: Vec<FeatureRow>,
    bins: &[WindowBin],
    observer: &mut impl ProgressObserver,
) -> Result<FeatureTable> {
    if let Some(bin) = bins.iter().find(|b| b.start >= b.end) {
        return Err(anyhow!(
            "window bin ({}, {}) must start before it ends",
            bin.start,
            bin.end
        ));
    }
    rows.sort_by(|a, b| MatchRecord::player_order(&a.record, &b.record));
    let starts = player_starts(&rows);
    let stat_values: Vec<[f64; 9]> = rows
        .iter()
        .map(|row| TrackedStat::ALL.map(|stat| stat.value(row)))
        .collect();

    let total = rows.len();
    let n_bins = bins.len();
    let mut windowed = vec![vec![0.0_f64; total]; TrackedStat::ALL.len() * n_bins];
    let mut current_season = vec![vec![0.0_f64; total]; n_bins];
    let mut player_exists = vec![vec![0.0_f64; total]; n_bins];
    let mut positions = Vec::with_capacity(total);
    let mut is_home = Vec::with_capacity(total);

    for n in 0..total {
        report_row(observer, Stage::TrailingWindows, n, total);
        let record = &rows[n].record;
        positions.push(record.position.code().to_string());
        is_home.push(flag(record.was_home));

        for (b, bin) in bins.iter().enumerate() {
            let Some(range) = bin.rows_for(n, starts[n]) else {
                continue;
            };
            player_exists[b][n] = 1.0;
            let width = range.len() as f64;
            for s in 0..TrackedStat::ALL.len() {
                let sum: f64 = stat_values[range.clone()].iter().map(|v| v[s]).sum();
                windowed[s * n_bins + b][n] = sum / width;
            }
            if rows[range.start].record.season == record.season {
                current_season[b][n] = 1.0;
            }
        }
    }

    let mut table = FeatureTable::new(rows);
    let mut windowed = windowed.into_iter();
    for stat in TrackedStat::ALL {
        for &bin in bins {
            let values = windowed.next().unwrap_or_default();
            table.push_column(FeatureColumn {
                descriptor: FeatureDescriptor::numeric(
                    windowed_feature_name(stat, bin),
                    FeatureKind::Windowed { stat, bin },
                ),
                values: ColumnValues::Numeric(values),
            })?;
        }
    }
    for (&bin, values) in bins.iter().zip(current_season) {
        table.push_column(FeatureColumn {
            descriptor: FeatureDescriptor::numeric(
                current_season_feature_name(bin),
                FeatureKind::CurrentSeason { bin },
            ),
            values: ColumnValues::Numeric(values),
        })?;
    }
    for (&bin, values) in bins.iter().zip(player_exists) {
        table.push_column(FeatureColumn {
            descriptor: FeatureDescriptor::numeric(
                player_exists_feature_name(bin),
                FeatureKind::PlayerExists { bin },
            ),
            values: ColumnValues::Numeric(values),
        })?;
    }
    table.push_column(FeatureColumn {
        descriptor: FeatureDescriptor::one_hot(POSITION_FEATURE, FeatureKind::Current),
        values: ColumnValues::Categorical(positions),
    })?;
    table.push_column(FeatureColumn {
        descriptor: FeatureDescriptor::numeric(IS_HOME_FEATURE, FeatureKind::Current),
        values: ColumnValues::Numeric(is_home),
    })?;

    observer.on_event(&PipelineEvent::StageFinished {
        stage: Stage::TrailingWindows,
    });
    Ok(table)
}

/// Index of the first row of each row's player run; rows must already be
/// sorted so that a player's rows are contiguous.
fn player_starts(rows: &[FeatureRow]) -> Vec<usize> {
    let mut starts = Vec::with_capacity(rows.len());
    let mut start = 0usize;
    for (n, row) in rows.iter().enumerate() {
        if n > 0 && row.record.name_cleaned != rows[n - 1].record.name_cleaned {
            start = n;
        }
        starts.push(start);
    }
    starts
}

fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}
