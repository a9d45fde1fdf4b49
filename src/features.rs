use anyhow::{Result, anyhow};
use serde::Serialize;

use crate::goals_conceded::OpponentHistory;
use crate::record::MatchRecord;
use crate::window::{TrackedStat, WindowBin};

/// How a derived column reaches the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Numeric,
    /// Expanded into one 0/1 indicator per observed value.
    OneHot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureKind {
    /// Property of the current fixture itself.
    Current,
    Windowed { stat: TrackedStat, bin: WindowBin },
    PlayerExists { bin: WindowBin },
    CurrentSeason { bin: WindowBin },
    Indicator { source: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub kind: FeatureKind,
    pub encoding: Encoding,
}

impl FeatureDescriptor {
    pub fn numeric(name: impl Into<String>, kind: FeatureKind) -> Self {
        Self {
            name: name.into(),
            kind,
            encoding: Encoding::Numeric,
        }
    }

    pub fn one_hot(name: impl Into<String>, kind: FeatureKind) -> Self {
        Self {
            name: name.into(),
            kind,
            encoding: Encoding::OneHot,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumn {
    pub descriptor: FeatureDescriptor,
    pub values: ColumnValues,
}

/// A loaded record plus its opponent-strength feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub record: MatchRecord,
    pub opponent: OpponentHistory,
}

/// The feature-engineered dataset: base rows plus derived columns aligned
/// with them by index.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    pub rows: Vec<FeatureRow>,
    pub columns: Vec<FeatureColumn>,
}

impl FeatureTable {
    pub fn new(rows: Vec<FeatureRow>) -> Self {
        Self {
            rows,
            columns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_column(&mut self, column: FeatureColumn) -> Result<()> {
        if column.values.len() != self.rows.len() {
            return Err(anyhow!(
                "column {} has {} values for {} rows",
                column.descriptor.name,
                column.values.len(),
                self.rows.len()
            ));
        }
        if self.column(&column.descriptor.name).is_some() {
            return Err(anyhow!("duplicate column {}", column.descriptor.name));
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&FeatureColumn> {
        self.columns.iter().find(|c| c.descriptor.name == name)
    }

    pub fn numeric(&self, name: &str) -> Option<&[f64]> {
        match &self.column(name)?.values {
            ColumnValues::Numeric(v) => Some(v),
            ColumnValues::Categorical(_) => None,
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|c| c.descriptor.name.as_str())
            .collect()
    }

    pub fn descriptors(&self) -> Vec<&FeatureDescriptor> {
        self.columns.iter().map(|c| &c.descriptor).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_misaligned_and_duplicate_columns() {
        let mut table = FeatureTable::new(Vec::new());
        let col = FeatureColumn {
            descriptor: FeatureDescriptor::numeric("f|x", FeatureKind::Current),
            values: ColumnValues::Numeric(vec![1.0]),
        };
        assert!(table.push_column(col).is_err());

        let empty = FeatureColumn {
            descriptor: FeatureDescriptor::numeric("f|x", FeatureKind::Current),
            values: ColumnValues::Numeric(Vec::new()),
        };
        table.push_column(empty.clone()).unwrap();
        assert!(table.push_column(empty).is_err());
        assert_eq!(table.column_names(), vec!["f|x"]);
        assert_eq!(table.numeric("f|x"), Some(&[][..]));
    }

    #[test]
    fn descriptors_serialize_with_kind_tag() {
        let d = FeatureDescriptor::one_hot("f|current|position|", FeatureKind::Current);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "current");
        assert_eq!(json["encoding"], "one_hot");
    }
}
