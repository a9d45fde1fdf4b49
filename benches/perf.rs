use chrono::{Duration, TimeZone, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use fpl_features::features::FeatureRow;
use fpl_features::goals_conceded::{GoalsConcededAggregate, OpponentHistory, opponent_history};
use fpl_features::names::normalize_player_name;
use fpl_features::pipeline::derive_features;
use fpl_features::progress::NoopObserver;
use fpl_features::record::{MatchRecord, Position};
use fpl_features::window::{build_window_features, default_bins};

const TEAMS: usize = 20;
const PLAYERS_PER_TEAM: usize = 25;
const GAMEWEEKS: u32 = 38;

fn sample_records(seasons: &[&str]) -> Vec<MatchRecord> {
    let mut out = Vec::new();
    for (s, season) in seasons.iter().enumerate() {
        let start = Utc
            .with_ymd_and_hms(2016 + s as i32, 8, 10, 15, 0, 0)
            .unwrap();
        for gw in 1..=GAMEWEEKS {
            let kickoff = start + Duration::days(7 * i64::from(gw - 1));
            for team in 0..TEAMS {
                let opponent = (team + gw as usize) % TEAMS;
                for slot in 0..PLAYERS_PER_TEAM {
                    let name = format!("Player_{team:02}_{slot:02}_{}", team * 100 + slot);
                    let seed = (team * 31 + slot * 7 + gw as usize) as i32;
                    out.push(MatchRecord {
                        season: season.to_string(),
                        gameweek: gw,
                        name_cleaned: normalize_player_name(&name),
                        name,
                        position: match slot % 4 {
                            0 => Position::Goalkeeper,
                            1 => Position::Defender,
                            2 => Position::Midfielder,
                            _ => Position::Forward,
                        },
                        opponent_name: format!("Team {opponent:02}"),
                        opponent_team: opponent as i64 + 1,
                        kickoff_time: kickoff,
                        was_home: team % 2 == 0,
                        selected: 1_000 + i64::from(seed) * 10,
                        selected_weight: 1.0,
                        minutes: 90,
                        total_points: seed % 12,
                        saves: 0,
                        bonus: seed % 4,
                        clean_sheets: seed % 2,
                        goals_conceded: seed % 3,
                        goals_scored: i32::from(seed % 9 == 0),
                        assists: i32::from(seed % 11 == 0),
                        red_cards: 0,
                        yellow_cards: i32::from(seed % 13 == 0),
                    });
                }
            }
        }
    }
    out.sort_by(MatchRecord::load_order);
    out
}

fn bench_goals_conceded(c: &mut Criterion) {
    let records = sample_records(&["2019-20", "2020-21"]);
    c.bench_function("goals_conceded_history", |b| {
        b.iter(|| {
            let aggregate = GoalsConcededAggregate::build(black_box(&records));
            let history = opponent_history(&records, &aggregate, 5, &mut NoopObserver);
            black_box(history.len());
        })
    });
}

fn bench_window_features(c: &mut Criterion) {
    let rows: Vec<FeatureRow> = sample_records(&["2019-20", "2020-21"])
        .into_iter()
        .map(|record| FeatureRow {
            record,
            opponent: OpponentHistory::UNAVAILABLE,
        })
        .collect();
    let bins = default_bins();
    c.bench_function("window_features", |b| {
        b.iter(|| {
            let table =
                build_window_features(black_box(rows.clone()), &bins, &mut NoopObserver).unwrap();
            black_box(table.columns.len());
        })
    });
}

fn bench_derive_features(c: &mut Criterion) {
    let records = sample_records(&["2018-19", "2019-20", "2020-21"]);
    let bins = default_bins();
    c.bench_function("derive_features", |b| {
        b.iter(|| {
            let table =
                derive_features(black_box(records.clone()), &bins, 5, &mut NoopObserver).unwrap();
            black_box(table.len());
        })
    });
}

criterion_group!(
    perf,
    bench_goals_conceded,
    bench_window_features,
    bench_derive_features
);
criterion_main!(perf);
