use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::names::players_raw_key;
use crate::record::Position;
use crate::season::{PositionSource, SeasonSpec, TeamSource, master_team_list_path, start_year};

const FIRST_NAMES: [&str; 8] = [
    "Alex", "Ben", "Callum", "Danny", "Eddie", "Fabian", "George", "Harvey",
];
const TEAM_NAMES: [&str; 20] = [
    "Arsenal",
    "Aston Villa",
    "Bournemouth",
    "Brentford",
    "Brighton",
    "Burnley",
    "Chelsea",
    "Crystal Palace",
    "Everton",
    "Fulham",
    "Leeds",
    "Leicester",
    "Liverpool",
    "Man City",
    "Man Utd",
    "Newcastle",
    "Norwich",
    "Southampton",
    "Spurs",
    "West Ham",
];
const GAMEWEEK_HEADER: [&str; 18] = [
    "name",
    "element",
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
    "team",
];

/// Shape of a generated source tree. Everything is derived from `seed`, so two
/// runs with the same settings write identical files.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub seasons: Vec<SeasonSpec>,
    pub teams: usize,
    pub players_per_team: usize,
    pub gameweeks: u32,
    /// Extra rows per season with an empty `minutes` cell.
    pub blank_rows_per_season: usize,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seasons: ["2021-22", "2020-21", "2019-20"]
                .iter()
                .filter_map(|label| SeasonSpec::standard(label).ok())
                .collect(),
            teams: 4,
            players_per_team: 5,
            gameweeks: 6,
            blank_rows_per_season: 1,
            seed: 7,
        }
    }
}

impl SyntheticConfig {
    /// Rows that survive loading: every player in every fixture.
    pub fn complete_rows(&self) -> usize {
        self.seasons.len() * self.gameweeks as usize * self.teams * self.players_per_team
    }

    pub fn total_rows(&self) -> usize {
        self.complete_rows() + self.seasons.len() * self.blank_rows_per_season
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticSummary {
    pub seasons: usize,
    pub rows_written: usize,
}

struct Player {
    first_name: String,
    second_name: String,
    id: i64,
    team: usize,
    position: Position,
}

/// Writes master team list, per-season teams files, players tables and
/// gameweek tables under `<root>/data/`, following each season's layout.
pub fn write_source_tree(root: &Path, config: &SyntheticConfig) -> Result<SyntheticSummary> {
    if config.teams < 2 || config.teams % 2 != 0 || config.teams > TEAM_NAMES.len() {
        return Err(anyhow!(
            "synthetic seasons need an even number of teams between 2 and {}",
            TEAM_NAMES.len()
        ));
    }
    let mut rng = StdRng::seed_from_u64(config.seed);
    let players = roster(config);

    let master: Vec<&SeasonSpec> = config
        .seasons
        .iter()
        .filter(|s| s.teams == TeamSource::MasterList)
        .collect();
    if !master.is_empty() {
        write_master_team_list(root, &master, config.teams)?;
    }

    let mut rows_written = 0usize;
    for spec in &config.seasons {
        let dir = spec.season_dir(root);
        fs::create_dir_all(dir.join("gws"))
            .with_context(|| format!("create {}", dir.display()))?;
        if spec.teams == TeamSource::SeasonFile {
            write_season_teams(&spec.teams_path(root), config.teams)?;
        }
        if let PositionSource::PlayersRaw { .. } = spec.positions {
            write_players_raw(&spec.players_raw_path(root), &players)?;
        }
        rows_written += write_gameweeks(root, spec, config, &players, &mut rng)?;
    }

    Ok(SyntheticSummary {
        seasons: config.seasons.len(),
        rows_written,
    })
}

fn roster(config: &SyntheticConfig) -> Vec<Player> {
    let mut out = Vec::with_capacity(config.teams * config.players_per_team);
    for team in 0..config.teams {
        for slot in 0..config.players_per_team {
            let id = (out.len() + 1) as i64;
            out.push(Player {
                first_name: FIRST_NAMES[slot % FIRST_NAMES.len()].to_string(),
                second_name: format!("Squad{team:02}{slot:02}"),
                id,
                team,
                position: slot_position(slot),
            });
        }
    }
    out
}

fn slot_position(slot: usize) -> Position {
    match slot % 11 {
        0 => Position::Goalkeeper,
        1..=4 => Position::Defender,
        5..=8 => Position::Midfielder,
        _ => Position::Forward,
    }
}

fn element_type(position: Position) -> i64 {
    match position {
        Position::Goalkeeper => 1,
        Position::Defender => 2,
        Position::Midfielder => 3,
        Position::Forward => 4,
    }
}

/// Name as the season's gameweek table spells it.
fn raw_name(player: &Player, spec: &SeasonSpec) -> String {
    match spec.positions {
        PositionSource::PlayersRaw { keyed_by_id } => players_raw_key(
            &player.first_name,
            &player.second_name,
            keyed_by_id.then_some(player.id),
        ),
        PositionSource::Embedded => format!("{} {}", player.first_name, player.second_name),
    }
}

/// Team ids are 1-based and season-local.
fn team_id(team: usize) -> i64 {
    team as i64 + 1
}

fn write_master_team_list(root: &Path, seasons: &[&SeasonSpec], teams: usize) -> Result<()> {
    let path = master_team_list_path(root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let mut writer =
        csv::Writer::from_path(&path).with_context(|| format!("create {}", path.display()))?;
    writer.write_record(["season", "team", "team_name"])?;
    for spec in seasons {
        for team in 0..teams {
            writer.write_record([
                spec.label.clone(),
                team_id(team).to_string(),
                TEAM_NAMES[team].to_string(),
            ])?;
        }
    }
    writer.flush().context("flush master team list")?;
    Ok(())
}

fn write_season_teams(path: &Path, teams: usize) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    writer.write_record(["code", "id", "name", "short_name"])?;
    for team in 0..teams {
        let name = TEAM_NAMES[team];
        writer.write_record([
            (team + 100).to_string(),
            team_id(team).to_string(),
            name.to_string(),
            name[..3].to_uppercase(),
        ])?;
    }
    writer.flush().context("flush teams file")?;
    Ok(())
}

fn write_players_raw(path: &Path, players: &[Player]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    writer.write_record(["first_name", "second_name", "id", "element_type", "team"])?;
    for p in players {
        writer.write_record([
            p.first_name.clone(),
            p.second_name.clone(),
            p.id.to_string(),
            element_type(p.position).to_string(),
            team_id(p.team).to_string(),
        ])?;
    }
    writer.flush().context("flush players_raw")?;
    Ok(())
}

/// Circle-method pairing for `round`: every team plays exactly once.
fn fixtures(teams: usize, round: usize) -> Vec<(usize, usize)> {
    let mut order: Vec<usize> = (1..teams).collect();
    order.rotate_left(round % (teams - 1));
    let mut ring = vec![0];
    ring.extend(order);
    (0..teams / 2)
        .map(|i| {
            let (a, b) = (ring[i], ring[teams - 1 - i]);
            if round % 2 == 0 { (a, b) } else { (b, a) }
        })
        .collect()
}

fn write_gameweeks(
    root: &Path,
    spec: &SeasonSpec,
    config: &SyntheticConfig,
    players: &[Player],
    rng: &mut StdRng,
) -> Result<usize> {
    let path = spec.gameweeks_path(root);
    let embedded = spec.positions == PositionSource::Embedded;
    // Some seasons still spell goalkeepers `GK`.
    let keeper_code = if start_year(&spec.label)? <= 2021 { "GK" } else { "GKP" };
    let season_start = NaiveDate::from_ymd_opt(start_year(&spec.label)?, 8, 6)
        .and_then(|d| d.and_hms_opt(14, 0, 0))
        .ok_or_else(|| anyhow!("invalid season start for {}", spec.label))?;

    let mut by_team: BTreeMap<usize, Vec<&Player>> = BTreeMap::new();
    for p in players {
        by_team.entry(p.team).or_default().push(p);
    }

    let mut writer =
        csv::Writer::from_path(&path).with_context(|| format!("create {}", path.display()))?;
    let mut header: Vec<&str> = GAMEWEEK_HEADER.to_vec();
    if embedded {
        header.insert(1, "position");
    }
    writer.write_record(&header)?;

    let mut rows = 0usize;
    for gw in 1..=config.gameweeks {
        for (slot, (home, away)) in fixtures(config.teams, gw as usize - 1).into_iter().enumerate() {
            let kickoff = season_start
                + Duration::days(7 * i64::from(gw - 1))
                + Duration::hours(2 * slot as i64);
            let kickoff = kickoff.format("%Y-%m-%dT%H:%M:%SZ").to_string();
            let home_goals: i32 = rng.gen_range(0..4);
            let away_goals: i32 = rng.gen_range(0..4);

            for (team, opponent, was_home, scored, conceded) in [
                (home, away, true, home_goals, away_goals),
                (away, home, false, away_goals, home_goals),
            ] {
                let squad = by_team.get(&team).map(Vec::as_slice).unwrap_or(&[]);
                for (idx, p) in squad.iter().enumerate() {
                    let minutes: i32 = if rng.gen_bool(0.8) { 90 } else { rng.gen_range(0..90) };
                    let goals = if idx == squad.len() - 1 { scored } else { 0 };
                    let assists = i32::from(idx == 1 && scored > 0);
                    let clean_sheet = i32::from(conceded == 0 && minutes >= 60);
                    let bonus: i32 = if goals > 0 { rng.gen_range(0..=3) } else { 0 };
                    let points = 2 + 4 * goals + 3 * assists + 4 * clean_sheet + bonus;
                    let saves: i32 = if p.position == Position::Goalkeeper {
                        rng.gen_range(0..6)
                    } else {
                        0
                    };
                    let was_home = if was_home { "True" } else { "False" };
                    let position = if p.position == Position::Goalkeeper {
                        keeper_code.to_string()
                    } else {
                        p.position.code().to_string()
                    };
                    let mut record = vec![
                        raw_name(p, spec),
                        p.id.to_string(),
                        gw.to_string(),
                        team_id(opponent).to_string(),
                        kickoff.clone(),
                        was_home.to_string(),
                        rng.gen_range(1_000..200_000).to_string(),
                        minutes.to_string(),
                        points.to_string(),
                        saves.to_string(),
                        bonus.to_string(),
                        clean_sheet.to_string(),
                        conceded.to_string(),
                        goals.to_string(),
                        assists.to_string(),
                        "0".to_string(),
                        i32::from(rng.gen_bool(0.1)).to_string(),
                        TEAM_NAMES[team].to_string(),
                    ];
                    if embedded {
                        record.insert(1, position);
                    }
                    writer.write_record(&record)?;
                    rows += 1;
                }
            }
        }
    }

    for blank in 0..config.blank_rows_per_season {
        let mut record = vec![
            format!("Ghost Player{blank}"),
            "0".to_string(),
            "1".to_string(),
            team_id(0).to_string(),
            season_start.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            "True".to_string(),
            "1000".to_string(),
            String::new(),
            "0".to_string(),
            "0".to_string(),
            "0".to_string(),
            "0".to_string(),
            "0".to_string(),
            "0".to_string(),
            "0".to_string(),
            "0".to_string(),
            "0".to_string(),
            TEAM_NAMES[1].to_string(),
        ];
        if embedded {
            record.insert(1, "MID".to_string());
        }
        writer.write_record(&record)?;
        rows += 1;
    }
    writer
        .flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_pair_every_team_once() {
        for round in 0..5 {
            let pairs = fixtures(6, round);
            assert_eq!(pairs.len(), 3);
            let mut seen: Vec<usize> = pairs.iter().flat_map(|&(a, b)| [a, b]).collect();
            seen.sort_unstable();
            assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
        }
    }

    #[test]
    fn raw_names_follow_season_layout() {
        let p = Player {
            first_name: "Alex".to_string(),
            second_name: "Squad0000".to_string(),
            id: 3,
            team: 0,
            position: Position::Defender,
        };
        let early = SeasonSpec::standard("2017-18").unwrap();
        let keyed = SeasonSpec::standard("2019-20").unwrap();
        let late = SeasonSpec::standard("2021-22").unwrap();
        assert_eq!(raw_name(&p, &early), "Alex_Squad0000");
        assert_eq!(raw_name(&p, &keyed), "Alex_Squad0000_3");
        assert_eq!(raw_name(&p, &late), "Alex Squad0000");
    }

    #[test]
    fn row_counts_follow_shape() {
        let config = SyntheticConfig::default();
        assert_eq!(config.complete_rows(), 3 * 6 * 4 * 5);
        assert_eq!(config.total_rows(), config.complete_rows() + 3);
    }
}
