use std::collections::{BTreeMap, HashMap};

use crate::progress::{PipelineEvent, ProgressObserver, Stage, report_row};
use crate::record::MatchRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct TeamGameweek {
    pub season: String,
    pub gameweek: u32,
    pub goals_conceded: i64,
}

/// Goals scored against each team per (season, gameweek): every player row
/// contributes its goals to the opponent it faced. Built once, read-only
/// afterwards; each team's gameweeks are kept chronologically so trailing
/// lookups are a binary search instead of a table scan.
#[derive(Debug, Clone, Default)]
pub struct GoalsConcededAggregate {
    by_team: HashMap<String, Vec<TeamGameweek>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpponentHistory {
    pub mean_goals_conceded: f64,
    pub available: bool,
}

impl OpponentHistory {
    pub const UNAVAILABLE: Self = Self {
        mean_goals_conceded: 0.0,
        available: false,
    };
}

impl GoalsConcededAggregate {
    pub fn build(records: &[MatchRecord]) -> Self {
        // Keyed team-first so iteration yields each team's gameweeks in order.
        let mut totals: BTreeMap<(&str, &str, u32), i64> = BTreeMap::new();
        for r in records {
            *totals
                .entry((r.opponent_name.as_str(), r.season.as_str(), r.gameweek))
                .or_default() += i64::from(r.goals_scored);
        }

        let mut by_team: HashMap<String, Vec<TeamGameweek>> = HashMap::new();
        for ((team, season, gameweek), goals_conceded) in totals {
            by_team.entry(team.to_string()).or_default().push(TeamGameweek {
                season: season.to_string(),
                gameweek,
                goals_conceded,
            });
        }
        Self { by_team }
    }

    pub fn teams(&self) -> usize {
        self.by_team.len()
    }

    pub fn get(&self, season: &str, gameweek: u32, team: &str) -> Option<i64> {
        let seq = self.by_team.get(team)?;
        let idx = position_of(seq, season, gameweek)?;
        Some(seq[idx].goals_conceded)
    }

    /// The team's (season, gameweek) rows in chronological order.
    pub fn sequence(&self, team: &str) -> &[TeamGameweek] {
        self.by_team.get(team).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mean goals conceded by `team` over the `history` gameweeks it played
    /// immediately before (`season`, `gameweek`). Season boundaries are not a
    /// barrier: a defence's record carries over.
    pub fn trailing_mean(
        &self,
        team: &str,
        season: &str,
        gameweek: u32,
        history: usize,
    ) -> OpponentHistory {
        let seq = self.sequence(team);
        let Some(idx) = position_of(seq, season, gameweek) else {
            return OpponentHistory::UNAVAILABLE;
        };
        if history == 0 || idx < history {
            return OpponentHistory::UNAVAILABLE;
        }
        let window = &seq[idx - history..idx];
        let total: i64 = window.iter().map(|g| g.goals_conceded).sum();
        OpponentHistory {
            mean_goals_conceded: total as f64 / history as f64,
            available: true,
        }
    }
}

fn position_of(seq: &[TeamGameweek], season: &str, gameweek: u32) -> Option<usize> {
    seq.binary_search_by(|g| {
        g.season
            .as_str()
            .cmp(season)
            .then(g.gameweek.cmp(&gameweek))
    })
    .ok()
}

/// Opponent-strength feature for every record, in record order.
pub fn opponent_history(
    records: &[MatchRecord],
    aggregate: &GoalsConcededAggregate,
    history: usize,
    observer: &mut impl ProgressObserver,
) -> Vec<OpponentHistory> {
    let total = records.len();
    let out = records
        .iter()
        .enumerate()
        .map(|(n, r)| {
            report_row(observer, Stage::OpponentHistory, n, total);
            aggregate.trailing_mean(&r.opponent_name, &r.season, r.gameweek, history)
        })
        .collect();
    observer.on_event(&PipelineEvent::StageFinished {
        stage: Stage::OpponentHistory,
    });
    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::progress::NoopObserver;
    use crate::record::Position;

    fn row(season: &str, gameweek: u32, opponent: &str, goals: i32) -> MatchRecord {
        MatchRecord {
            season: season.to_string(),
            gameweek,
            name: "P".to_string(),
            name_cleaned: "p".to_string(),
            position: Position::Forward,
            opponent_name: opponent.to_string(),
            opponent_team: 1,
            kickoff_time: Utc.with_ymd_and_hms(2020, 1, 1, 15, 0, 0).unwrap(),
            was_home: true,
            selected: 1,
            selected_weight: 1.0,
            minutes: 90,
            total_points: 2,
            saves: 0,
            bonus: 0,
            clean_sheets: 0,
            goals_conceded: 0,
            goals_scored: goals,
            assists: 0,
            red_cards: 0,
            yellow_cards: 0,
        }
    }

    #[test]
    fn sums_goals_against_each_opponent() {
        let records = vec![row("S", 1, "TeamA", 2), row("S", 1, "TeamA", 1), row("S", 1, "TeamB", 4)];
        let agg = GoalsConcededAggregate::build(&records);
        assert_eq!(agg.get("S", 1, "TeamA"), Some(3));
        assert_eq!(agg.get("S", 1, "TeamB"), Some(4));
        assert_eq!(agg.get("S", 2, "TeamA"), None);
        assert_eq!(agg.teams(), 2);
    }

    #[test]
    fn trailing_mean_needs_full_history() {
        let records: Vec<MatchRecord> = (1..=4).map(|gw| row("S", gw, "TeamA", gw as i32)).collect();
        let agg = GoalsConcededAggregate::build(&records);

        assert_eq!(agg.trailing_mean("TeamA", "S", 2, 2), OpponentHistory::UNAVAILABLE);
        let h = agg.trailing_mean("TeamA", "S", 3, 2);
        assert!(h.available);
        assert!((h.mean_goals_conceded - 1.5).abs() < 1e-12);
        let h = agg.trailing_mean("TeamA", "S", 4, 3);
        assert!((h.mean_goals_conceded - 2.0).abs() < 1e-12);
    }

    #[test]
    fn trailing_mean_crosses_seasons() {
        let records = vec![
            row("2019-20", 37, "TeamA", 1),
            row("2019-20", 38, "TeamA", 3),
            row("2020-21", 1, "TeamA", 0),
        ];
        let agg = GoalsConcededAggregate::build(&records);
        let seq = agg.sequence("TeamA");
        assert_eq!(seq[0].gameweek, 37);
        assert_eq!(seq[2].season, "2020-21");

        let h = agg.trailing_mean("TeamA", "2020-21", 1, 2);
        assert!(h.available);
        assert!((h.mean_goals_conceded - 2.0).abs() < 1e-12);
    }

    #[test]
    fn per_row_feature_follows_record_order() {
        let records = vec![row("S", 1, "TeamA", 1), row("S", 2, "TeamA", 0), row("S", 2, "TeamB", 0)];
        let agg = GoalsConcededAggregate::build(&records);
        let out = opponent_history(&records, &agg, 1, &mut NoopObserver);
        assert_eq!(out.len(), 3);
        assert!(!out[0].available);
        assert!(out[1].available);
        assert!((out[1].mean_goals_conceded - 1.0).abs() < 1e-12);
        assert!(!out[2].available);
    }
}
