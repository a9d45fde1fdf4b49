use std::fmt;

/// Row-loop stages report progress every this many rows.
pub const PROGRESS_EVERY: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    GoalsConceded,
    OpponentHistory,
    TrailingWindows,
    OneHot,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Load => "load",
            Stage::GoalsConceded => "goals_conceded",
            Stage::OpponentHistory => "opponent_history",
            Stage::TrailingWindows => "trailing_windows",
            Stage::OneHot => "one_hot",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    SeasonLoaded { season: String, rows: usize },
    NullsDropped { before: usize, after: usize },
    RowsProcessed { stage: Stage, done: usize, total: usize },
    StageFinished { stage: Stage },
}

pub trait ProgressObserver {
    fn on_event(&mut self, event: &PipelineEvent);
}

impl<F> ProgressObserver for F
where
    F: FnMut(&PipelineEvent),
{
    fn on_event(&mut self, event: &PipelineEvent) {
        self(event)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_event(&mut self, _event: &PipelineEvent) {}
}

/// Forwards pipeline events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_event(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::SeasonLoaded { season, rows } => {
                tracing::info!(season = %season, rows, "season loaded");
            }
            PipelineEvent::NullsDropped { before, after } => {
                tracing::info!(
                    before,
                    after,
                    dropped = before.saturating_sub(*after),
                    "dropped rows with nulls"
                );
            }
            PipelineEvent::RowsProcessed { stage, done, total } => {
                tracing::info!(stage = %stage, done, total, "rows processed");
            }
            PipelineEvent::StageFinished { stage } => {
                tracing::info!(stage = %stage, "stage finished");
            }
        }
    }
}

pub(crate) fn report_row(observer: &mut impl ProgressObserver, stage: Stage, n: usize, total: usize) {
    if n % PROGRESS_EVERY == 0 {
        observer.on_event(&PipelineEvent::RowsProcessed {
            stage,
            done: n,
            total,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_observe_events() {
        let mut seen = Vec::new();
        {
            let mut obs = |e: &PipelineEvent| seen.push(e.clone());
            for n in 0..25_000 {
                report_row(&mut obs, Stage::TrailingWindows, n, 25_000);
            }
        }
        assert_eq!(seen.len(), 3);
        assert_eq!(
            seen[2],
            PipelineEvent::RowsProcessed {
                stage: Stage::TrailingWindows,
                done: 20_000,
                total: 25_000
            }
        );
    }
}
