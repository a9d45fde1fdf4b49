use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::names::players_raw_key;
use crate::record::Position;
use crate::season::{PositionSource, SeasonSpec, TeamSource, TextEncoding};

/// Team id → display name for one season. Ids are season-local: they were
/// reset to 1..=20 once the per-season teams files took over.
#[derive(Debug, Clone, Default)]
pub struct TeamNameMap {
    season: String,
    by_id: HashMap<i64, String>,
}

#[derive(Debug, Deserialize)]
struct MasterTeamRow {
    season: String,
    team: i64,
    team_name: String,
}

#[derive(Debug, Deserialize)]
struct SeasonTeamRow {
    id: i64,
    name: String,
}

impl TeamNameMap {
    pub fn new(season: &str, by_id: HashMap<i64, String>) -> Self {
        Self {
            season: season.to_string(),
            by_id,
        }
    }

    pub fn load(spec: &SeasonSpec, data_dir: &Path) -> Result<Self> {
        let path = spec.teams_path(data_dir);
        let by_id = match spec.teams {
            TeamSource::MasterList => {
                let text = read_text(&path, TextEncoding::Utf8)?;
                parse_master_team_list(&text, &spec.label)
                    .with_context(|| format!("parse {}", path.display()))?
            }
            TeamSource::SeasonFile => {
                let text = read_text(&path, spec.encoding)?;
                parse_season_teams(&text).with_context(|| format!("parse {}", path.display()))?
            }
        };
        if by_id.is_empty() {
            return Err(anyhow!(
                "no teams for season {} in {}",
                spec.label,
                path.display()
            ));
        }
        Ok(Self::new(&spec.label, by_id))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn get(&self, team_id: i64) -> Option<&str> {
        self.by_id.get(&team_id).map(String::as_str)
    }

    /// Unknown ids are fatal: a fixture against a team we cannot name would
    /// poison the opponent aggregate.
    pub fn resolve(&self, team_id: i64) -> Result<&str> {
        self.get(team_id).ok_or_else(|| {
            anyhow!(
                "opponent team id {team_id} has no name in season {}",
                self.season
            )
        })
    }
}

pub fn parse_master_team_list(text: &str, season: &str) -> Result<HashMap<i64, String>> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let mut out = HashMap::new();
    for row in reader.deserialize::<MasterTeamRow>() {
        let row = row.context("read master team row")?;
        if row.season == season {
            out.insert(row.team, row.team_name);
        }
    }
    Ok(out)
}

pub fn parse_season_teams(text: &str) -> Result<HashMap<i64, String>> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let mut out = HashMap::new();
    for row in reader.deserialize::<SeasonTeamRow>() {
        let row = row.context("read season team row")?;
        out.insert(row.id, row.name);
    }
    Ok(out)
}

/// Raw player key (as it appears in the gameweek table) → position, for the
/// seasons where the gameweek table carries no position column.
#[derive(Debug, Clone, Default)]
pub struct PlayerPositionMap {
    by_key: HashMap<String, Position>,
}

#[derive(Debug, Deserialize)]
struct PlayersRawRow {
    first_name: String,
    second_name: String,
    id: i64,
    element_type: i64,
}

impl PlayerPositionMap {
    /// `Ok(None)` when the season embeds positions in its gameweek table.
    pub fn load(spec: &SeasonSpec, data_dir: &Path) -> Result<Option<Self>> {
        let PositionSource::PlayersRaw { keyed_by_id } = spec.positions else {
            return Ok(None);
        };
        let path = spec.players_raw_path(data_dir);
        let text = read_text(&path, TextEncoding::Utf8)?;
        let map = Self::parse(&text, keyed_by_id)
            .with_context(|| format!("parse {}", path.display()))?;
        Ok(Some(map))
    }

    pub fn parse(text: &str, keyed_by_id: bool) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let mut by_key = HashMap::new();
        for row in reader.deserialize::<PlayersRawRow>() {
            let row = row.context("read players_raw row")?;
            let position = Position::from_element_type(row.element_type).ok_or_else(|| {
                anyhow!(
                    "player {} {} has unknown element_type {}",
                    row.first_name,
                    row.second_name,
                    row.element_type
                )
            })?;
            let id = keyed_by_id.then_some(row.id);
            by_key.insert(
                players_raw_key(&row.first_name, &row.second_name, id),
                position,
            );
        }
        Ok(Self { by_key })
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn get(&self, raw_name: &str) -> Option<Position> {
        self.by_key.get(raw_name).copied()
    }
}

pub(crate) fn read_text(path: &Path, encoding: TextEncoding) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    encoding
        .decode(&bytes)
        .with_context(|| format!("decode {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_list_filters_by_season() {
        let text = "season,team,team_name\n2016-17,1,Arsenal\n2016-17,2,Bournemouth\n2017-18,1,Arsenal\n2017-18,2,Bournemouth\n2017-18,3,Brighton\n";
        let teams = parse_master_team_list(text, "2017-18").unwrap();
        assert_eq!(teams.len(), 3);
        assert_eq!(teams.get(&3).map(String::as_str), Some("Brighton"));
    }

    #[test]
    fn season_teams_ignore_extra_columns() {
        let text = "code,draw,id,name,short_name\n3,0,1,Arsenal,ARS\n7,0,2,Aston Villa,AVL\n";
        let map = TeamNameMap::new("2021-22", parse_season_teams(text).unwrap());
        assert_eq!(map.resolve(2).unwrap(), "Aston Villa");
        let err = map.resolve(99).unwrap_err().to_string();
        assert!(err.contains("99"));
        assert!(err.contains("2021-22"));
    }

    #[test]
    fn players_raw_key_formats_follow_season() {
        let text = "first_name,second_name,id,element_type,team\nAaron,Cresswell,7,2,19\nHarry,Kane,8,4,17\n";
        let keyed = PlayerPositionMap::parse(text, true).unwrap();
        assert_eq!(keyed.get("Aaron_Cresswell_7"), Some(Position::Defender));
        assert_eq!(keyed.get("Aaron_Cresswell"), None);

        let plain = PlayerPositionMap::parse(text, false).unwrap();
        assert_eq!(plain.get("Harry_Kane"), Some(Position::Forward));
    }

    #[test]
    fn unknown_element_type_is_fatal() {
        let text = "first_name,second_name,id,element_type\nA,B,1,9\n";
        assert!(PlayerPositionMap::parse(text, true).is_err());
    }
}
