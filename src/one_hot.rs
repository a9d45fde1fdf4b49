use std::collections::BTreeSet;

use anyhow::Result;

use crate::features::{
    ColumnValues, Encoding, FeatureColumn, FeatureDescriptor, FeatureKind, FeatureTable,
};
use crate::progress::{PipelineEvent, ProgressObserver, Stage};

/// Replaces every categorical column marked for one-hot encoding with one
/// 0/1 indicator column per observed value, named `<column><value>`.
/// Indicators follow the sorted order of the observed values.
pub fn one_hot_encode(table: &mut FeatureTable, observer: &mut impl ProgressObserver) -> Result<()> {
    let columns = std::mem::take(&mut table.columns);
    for column in columns {
        let is_target = column.descriptor.encoding == Encoding::OneHot;
        match column.values {
            ColumnValues::Categorical(values) if is_target => {
                for indicator in expand(&column.descriptor.name, &values) {
                    table.push_column(indicator)?;
                }
            }
            values => table.push_column(FeatureColumn {
                descriptor: column.descriptor,
                values,
            })?,
        }
    }
    observer.on_event(&PipelineEvent::StageFinished {
        stage: Stage::OneHot,
    });
    Ok(())
}

fn expand(source: &str, values: &[String]) -> Vec<FeatureColumn> {
    let distinct: BTreeSet<&str> = values.iter().map(String::as_str).collect();
    distinct
        .into_iter()
        .map(|value| {
            let indicator = values
                .iter()
                .map(|v| if v == value { 1.0 } else { 0.0 })
                .collect();
            FeatureColumn {
                descriptor: FeatureDescriptor::numeric(
                    format!("{source}{value}"),
                    FeatureKind::Indicator {
                        source: source.to_string(),
                        value: value.to_string(),
                    },
                ),
                values: ColumnValues::Numeric(indicator),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopObserver;

    fn table_with(values: &[&str], encoding: Encoding) -> FeatureTable {
        let mut table = FeatureTable::default();
        // Rows are irrelevant here; columns only need to agree with each other.
        table.columns.push(FeatureColumn {
            descriptor: FeatureDescriptor {
                name: "f|current|position|".to_string(),
                kind: FeatureKind::Current,
                encoding,
            },
            values: ColumnValues::Categorical(values.iter().map(|s| s.to_string()).collect()),
        });
        table
    }

    #[test]
    fn expands_into_one_indicator_per_value() {
        let values = ["MID", "GKP", "MID", "FWD"];
        let columns = expand("f|current|position|", &values.map(String::from));
        let names: Vec<&str> = columns.iter().map(|c| c.descriptor.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["f|current|position|FWD", "f|current|position|GKP", "f|current|position|MID"]
        );

        for row in 0..values.len() {
            let hot: f64 = columns
                .iter()
                .map(|c| match &c.values {
                    ColumnValues::Numeric(v) => v[row],
                    ColumnValues::Categorical(_) => 0.0,
                })
                .sum();
            assert_eq!(hot, 1.0);
        }
        assert_eq!(columns[2].values, ColumnValues::Numeric(vec![1.0, 0.0, 1.0, 0.0]));
    }

    #[test]
    fn unmarked_categoricals_are_left_alone() {
        let mut table = table_with(&[], Encoding::Numeric);
        one_hot_encode(&mut table, &mut NoopObserver).unwrap();
        assert_eq!(table.column_names(), vec!["f|current|position|"]);
    }

    #[test]
    fn marked_column_is_replaced() {
        let mut table = table_with(&[], Encoding::OneHot);
        one_hot_encode(&mut table, &mut NoopObserver).unwrap();
        assert!(table.columns.is_empty());
    }
}
