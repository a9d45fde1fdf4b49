use std::path::PathBuf;

use fpl_features::loader::{load_all, load_season};
use fpl_features::progress::{NoopObserver, PipelineEvent};
use fpl_features::record::{MatchRecord, Position};
use fpl_features::season::{SeasonSpec, TextEncoding};

fn fixture_root() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("seasons");
    path
}

fn fixture_seasons() -> Vec<SeasonSpec> {
    vec![
        SeasonSpec::standard("2021-22").expect("valid label"),
        SeasonSpec::standard("2017-18").expect("valid label"),
    ]
}

fn find<'a>(records: &'a [MatchRecord], name_cleaned: &str, gameweek: u32) -> &'a MatchRecord {
    records
        .iter()
        .find(|r| r.name_cleaned == name_cleaned && r.gameweek == gameweek)
        .unwrap_or_else(|| panic!("{name_cleaned} gw{gameweek} should be loaded"))
}

#[test]
fn decodes_latin1_season_and_resolves_players_raw_positions() {
    let spec = SeasonSpec::standard("2017-18").unwrap();
    assert_eq!(spec.encoding, TextEncoding::Latin1);
    let rows = load_season(&spec, &fixture_root()).expect("fixture season should load");
    assert_eq!(rows.len(), 8);
    assert_eq!(rows.unresolved_positions, 0);

    let loaded = load_all(&fixture_root(), &[spec], &mut NoopObserver).unwrap();
    let bellerin = find(&loaded.records, "héctor bellerín", 1);
    assert_eq!(bellerin.name, "Héctor_Bellerín");
    assert_eq!(bellerin.position, Position::Defender);
    assert_eq!(bellerin.opponent_name, "Bournemouth");
    assert!(bellerin.was_home);
    assert_eq!(bellerin.selected_weight, 0.5);

    let cech = find(&loaded.records, "petr cech", 2);
    assert_eq!(cech.position, Position::Goalkeeper);
    assert_eq!(cech.selected_weight, 1.5);
}

#[test]
fn unifies_seasons_and_drops_incomplete_rows() {
    let mut events = Vec::new();
    let loaded = load_all(&fixture_root(), &fixture_seasons(), &mut |e: &PipelineEvent| {
        events.push(e.clone())
    })
    .expect("fixture seasons should load");

    // One blank minutes cell in 2017-18, one unknown position in 2021-22.
    assert_eq!(loaded.report.rows_before_drop, 13);
    assert_eq!(loaded.report.rows_after_drop, 11);
    assert_eq!(loaded.report.dropped(), 2);
    assert_eq!(loaded.report.duplicate_keys, 0);
    assert_eq!(loaded.report.seasons[0].unresolved_positions, 1);
    assert!(loaded.records.iter().all(|r| r.name_cleaned != "bukayo saka"));
    assert!(
        loaded
            .records
            .iter()
            .all(|r| !(r.name_cleaned == "junior stanislas" && r.gameweek == 2))
    );

    let mut sorted = loaded.records.clone();
    sorted.sort_by(MatchRecord::load_order);
    assert_eq!(sorted, loaded.records);
    assert_eq!(loaded.records[0].season, "2017-18");

    assert!(events.contains(&PipelineEvent::NullsDropped {
        before: 13,
        after: 11
    }));
    let seasons_loaded = events
        .iter()
        .filter(|e| matches!(e, PipelineEvent::SeasonLoaded { .. }))
        .count();
    assert_eq!(seasons_loaded, 2);
}

#[test]
fn folds_goalkeeper_code_in_embedded_seasons() {
    let loaded = load_all(&fixture_root(), &fixture_seasons(), &mut NoopObserver).unwrap();
    let gw1 = find(&loaded.records, "aaron ramsdale", 1);
    let gw2 = find(&loaded.records, "aaron ramsdale", 2);
    assert_eq!(gw1.position, Position::Goalkeeper);
    assert_eq!(gw2.position, Position::Goalkeeper);
    assert_eq!(gw1.opponent_name, "Brentford");
    assert!((gw1.selected_weight - 1000.0 / 1800.0).abs() < 1e-12);
}

#[test]
fn missing_season_directory_is_fatal() {
    let spec = SeasonSpec::standard("2019-20").unwrap();
    let err = load_all(&fixture_root(), &[spec], &mut NoopObserver).unwrap_err();
    assert!(format!("{err:#}").contains("2019-20"));
}
