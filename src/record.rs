use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "GKP")]
    Goalkeeper,
    #[serde(rename = "DEF")]
    Defender,
    #[serde(rename = "MID")]
    Midfielder,
    #[serde(rename = "FWD")]
    Forward,
}

impl Position {
    pub fn code(self) -> &'static str {
        match self {
            Position::Goalkeeper => "GKP",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }

    /// Parses a position label. Only the literal `GK` is folded into `GKP`;
    /// other labels (e.g. `AM`) return `None`, and the loader drops those rows
    /// with the other incomplete ones rather than adding a fifth position.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "GKP" | "GK" => Some(Position::Goalkeeper),
            "DEF" => Some(Position::Defender),
            "MID" => Some(Position::Midfielder),
            "FWD" => Some(Position::Forward),
            _ => None,
        }
    }

    /// `element_type` as used by the players tables (1..=4).
    pub fn from_element_type(element_type: i64) -> Option<Self> {
        match element_type {
            1 => Some(Position::Goalkeeper),
            2 => Some(Position::Defender),
            3 => Some(Position::Midfielder),
            4 => Some(Position::Forward),
            _ => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One player's line for one fixture, after the loader has resolved team
/// names and positions and every required field is present.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub season: String,
    pub gameweek: u32,
    pub name: String,
    pub name_cleaned: String,
    pub position: Position,
    pub opponent_name: String,
    pub opponent_team: i64,
    pub kickoff_time: DateTime<Utc>,
    pub was_home: bool,
    pub selected: i64,
    pub selected_weight: f64,
    pub minutes: i32,
    pub total_points: i32,
    pub saves: i32,
    pub bonus: i32,
    pub clean_sheets: i32,
    pub goals_conceded: i32,
    pub goals_scored: i32,
    pub assists: i32,
    pub red_cards: i32,
    pub yellow_cards: i32,
}

impl MatchRecord {
    /// Order used for the unified table.
    pub fn load_order(a: &Self, b: &Self) -> std::cmp::Ordering {
        a.season
            .cmp(&b.season)
            .then(a.gameweek.cmp(&b.gameweek))
            .then_with(|| a.opponent_name.cmp(&b.opponent_name))
            .then(a.kickoff_time.cmp(&b.kickoff_time))
            .then_with(|| a.name.cmp(&b.name))
    }

    /// Order the trailing windows rely on: one player's rows end up contiguous
    /// and chronological.
    pub fn player_order(a: &Self, b: &Self) -> std::cmp::Ordering {
        a.name_cleaned
            .cmp(&b.name_cleaned)
            .then_with(|| a.season.cmp(&b.season))
            .then(a.gameweek.cmp(&b.gameweek))
            .then(a.kickoff_time.cmp(&b.kickoff_time))
    }
}
