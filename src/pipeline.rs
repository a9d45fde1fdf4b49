use anyhow::{Context, Result};

use crate::config::PipelineConfig;
use crate::features::{FeatureRow, FeatureTable};
use crate::goals_conceded::{GoalsConcededAggregate, opponent_history};
use crate::loader::{LoadReport, load_all};
use crate::one_hot::one_hot_encode;
use crate::progress::{PipelineEvent, ProgressObserver, Stage};
use crate::record::MatchRecord;
use crate::window::{WindowBin, build_window_features};

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub table: FeatureTable,
    pub report: LoadReport,
}

/// Load every configured season and derive the feature table.
pub fn run(config: &PipelineConfig, observer: &mut impl ProgressObserver) -> Result<PipelineOutput> {
    config.validate()?;
    let loaded = load_all(&config.data_dir, &config.seasons, observer)
        .with_context(|| format!("load seasons from {}", config.data_dir.display()))?;
    tracing::info!(
        rows = loaded.records.len(),
        dropped = loaded.report.dropped(),
        "data loaded"
    );
    let table = derive_features(
        loaded.records,
        &config.bins,
        config.opponent_history,
        observer,
    )?;
    Ok(PipelineOutput {
        table,
        report: loaded.report,
    })
}

/// Goals-conceded aggregate → opponent feature → trailing windows → one-hot.
/// Each step needs the columns of the one before it.
pub fn derive_features(
    records: Vec<MatchRecord>,
    bins: &[WindowBin],
    history: usize,
    observer: &mut impl ProgressObserver,
) -> Result<FeatureTable> {
    let aggregate = GoalsConcededAggregate::build(&records);
    observer.on_event(&PipelineEvent::StageFinished {
        stage: Stage::GoalsConceded,
    });
    tracing::debug!(teams = aggregate.teams(), "goals conceded aggregate built");

    let opponent = opponent_history(&records, &aggregate, history, observer);
    let rows: Vec<FeatureRow> = records
        .into_iter()
        .zip(opponent)
        .map(|(record, opponent)| FeatureRow { record, opponent })
        .collect();

    let mut table = build_window_features(rows, bins, observer)?;
    one_hot_encode(&mut table, observer)?;
    tracing::info!(
        rows = table.len(),
        columns = table.columns.len(),
        "features processed"
    );
    Ok(table)
}
