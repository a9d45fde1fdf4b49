use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use parquet::basic::{ConvertedType, Repetition, Type as PhysicalType};
use parquet::data_type::{BoolType, ByteArray, ByteArrayType, DoubleType, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::types::Type;
use serde::Serialize;

use crate::features::{ColumnValues, FeatureDescriptor, FeatureRow, FeatureTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Parquet,
}

impl ExportFormat {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "parquet" | "pq" => Ok(ExportFormat::Parquet),
            other => Err(anyhow!("unknown export format {other:?} (expected csv or parquet)")),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
        }
    }
}

/// The fixed projection every output carries ahead of the derived features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseColumn {
    Season,
    Gameweek,
    Name,
    Position,
    OpponentName,
    OpponentTeam,
    KickoffTime,
    WasHome,
    Selected,
    SelectedWeight,
    Minutes,
    TotalPoints,
    Saves,
    Bonus,
    CleanSheets,
    GoalsConceded,
    GoalsScored,
    Assists,
    RedCards,
    YellowCards,
    NameCleaned,
    OpponentGcHistory,
    OpponentGcHistoryAvailable,
}

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Cell {
    fn render(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Int(v) => v.to_string(),
            Cell::Float(v) => v.to_string(),
            Cell::Bool(v) => String::from(if *v { "True" } else { "False" }),
        }
    }
}

impl BaseColumn {
    pub const ALL: [BaseColumn; 23] = [
        BaseColumn::Season,
        BaseColumn::Gameweek,
        BaseColumn::Name,
        BaseColumn::Position,
        BaseColumn::OpponentName,
        BaseColumn::OpponentTeam,
        BaseColumn::KickoffTime,
        BaseColumn::WasHome,
        BaseColumn::Selected,
        BaseColumn::SelectedWeight,
        BaseColumn::Minutes,
        BaseColumn::TotalPoints,
        BaseColumn::Saves,
        BaseColumn::Bonus,
        BaseColumn::CleanSheets,
        BaseColumn::GoalsConceded,
        BaseColumn::GoalsScored,
        BaseColumn::Assists,
        BaseColumn::RedCards,
        BaseColumn::YellowCards,
        BaseColumn::NameCleaned,
        BaseColumn::OpponentGcHistory,
        BaseColumn::OpponentGcHistoryAvailable,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BaseColumn::Season => "season",
            BaseColumn::Gameweek => "GW",
            BaseColumn::Name => "name",
            BaseColumn::Position => "position",
            BaseColumn::OpponentName => "opponent_name",
            BaseColumn::OpponentTeam => "opponent_team",
            BaseColumn::KickoffTime => "kickoff_time",
            BaseColumn::WasHome => "was_home",
            BaseColumn::Selected => "selected",
            BaseColumn::SelectedWeight => "selected_weight",
            BaseColumn::Minutes => "minutes",
            BaseColumn::TotalPoints => "total_points",
            BaseColumn::Saves => "saves",
            BaseColumn::Bonus => "bonus",
            BaseColumn::CleanSheets => "clean_sheets",
            BaseColumn::GoalsConceded => "goals_conceded",
            BaseColumn::GoalsScored => "goals_scored",
            BaseColumn::Assists => "assists",
            BaseColumn::RedCards => "red_cards",
            BaseColumn::YellowCards => "yellow_cards",
            BaseColumn::NameCleaned => "name_cleaned",
            BaseColumn::OpponentGcHistory => "opponent_gc_history",
            BaseColumn::OpponentGcHistoryAvailable => "opponent_gc_history_available",
        }
    }

    fn cell(self, row: &FeatureRow) -> Cell {
        let r = &row.record;
        match self {
            BaseColumn::Season => Cell::Text(r.season.clone()),
            BaseColumn::Gameweek => Cell::Int(i64::from(r.gameweek)),
            BaseColumn::Name => Cell::Text(r.name.clone()),
            BaseColumn::Position => Cell::Text(r.position.code().to_string()),
            BaseColumn::OpponentName => Cell::Text(r.opponent_name.clone()),
            BaseColumn::OpponentTeam => Cell::Int(r.opponent_team),
            BaseColumn::KickoffTime => Cell::Text(r.kickoff_time.to_rfc3339()),
            BaseColumn::WasHome => Cell::Bool(r.was_home),
            BaseColumn::Selected => Cell::Int(r.selected),
            BaseColumn::SelectedWeight => Cell::Float(r.selected_weight),
            BaseColumn::Minutes => Cell::Int(i64::from(r.minutes)),
            BaseColumn::TotalPoints => Cell::Int(i64::from(r.total_points)),
            BaseColumn::Saves => Cell::Int(i64::from(r.saves)),
            BaseColumn::Bonus => Cell::Int(i64::from(r.bonus)),
            BaseColumn::CleanSheets => Cell::Int(i64::from(r.clean_sheets)),
            BaseColumn::GoalsConceded => Cell::Int(i64::from(r.goals_conceded)),
            BaseColumn::GoalsScored => Cell::Int(i64::from(r.goals_scored)),
            BaseColumn::Assists => Cell::Int(i64::from(r.assists)),
            BaseColumn::RedCards => Cell::Int(i64::from(r.red_cards)),
            BaseColumn::YellowCards => Cell::Int(i64::from(r.yellow_cards)),
            BaseColumn::NameCleaned => Cell::Text(r.name_cleaned.clone()),
            BaseColumn::OpponentGcHistory => Cell::Float(row.opponent.mean_goals_conceded),
            BaseColumn::OpponentGcHistoryAvailable => Cell::Bool(row.opponent.available),
        }
    }

    fn physical_type(self) -> PhysicalType {
        match self {
            BaseColumn::Season
            | BaseColumn::Name
            | BaseColumn::Position
            | BaseColumn::OpponentName
            | BaseColumn::KickoffTime
            | BaseColumn::NameCleaned => PhysicalType::BYTE_ARRAY,
            BaseColumn::WasHome | BaseColumn::OpponentGcHistoryAvailable => PhysicalType::BOOLEAN,
            BaseColumn::SelectedWeight | BaseColumn::OpponentGcHistory => PhysicalType::DOUBLE,
            _ => PhysicalType::INT64,
        }
    }
}

pub fn header(table: &FeatureTable) -> Vec<String> {
    BaseColumn::ALL
        .iter()
        .map(|c| c.name().to_string())
        .chain(table.columns.iter().map(|c| c.descriptor.name.clone()))
        .collect()
}

pub fn write(table: &FeatureTable, path: &Path, format: ExportFormat) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    match format {
        ExportFormat::Csv => write_csv(table, path),
        ExportFormat::Parquet => write_parquet(table, path),
    }
}

pub fn write_csv(table: &FeatureTable, path: &Path) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    writer.write_record(header(table)).context("write csv header")?;
    for (n, row) in table.rows.iter().enumerate() {
        let mut record: Vec<String> = BaseColumn::ALL
            .iter()
            .map(|c| c.cell(row).render())
            .collect();
        for column in &table.columns {
            record.push(match &column.values {
                ColumnValues::Numeric(v) => v[n].to_string(),
                ColumnValues::Categorical(v) => v[n].clone(),
            });
        }
        writer
            .write_record(&record)
            .with_context(|| format!("write csv row {n}"))?;
    }
    writer.flush().context("flush csv")?;
    Ok(())
}

enum ParquetColumn {
    Text(Vec<ByteArray>),
    Int(Vec<i64>),
    Float(Vec<f64>),
    Bool(Vec<bool>),
}

pub fn write_parquet(table: &FeatureTable, path: &Path) -> Result<()> {
    let mut fields = Vec::new();
    let mut columns = Vec::new();

    for base in BaseColumn::ALL {
        fields.push(Arc::new(primitive(base.name(), base.physical_type())?));
        let cells = table.rows.iter().map(|row| base.cell(row));
        columns.push(match base.physical_type() {
            PhysicalType::BYTE_ARRAY => ParquetColumn::Text(
                cells
                    .map(|c| ByteArray::from(c.render().as_str()))
                    .collect(),
            ),
            PhysicalType::BOOLEAN => {
                ParquetColumn::Bool(cells.map(|c| matches!(c, Cell::Bool(true))).collect())
            }
            PhysicalType::DOUBLE => ParquetColumn::Float(
                cells
                    .map(|c| match c {
                        Cell::Float(v) => v,
                        _ => f64::NAN,
                    })
                    .collect(),
            ),
            _ => ParquetColumn::Int(
                cells
                    .map(|c| match c {
                        Cell::Int(v) => v,
                        _ => 0,
                    })
                    .collect(),
            ),
        });
    }
    for column in &table.columns {
        match &column.values {
            ColumnValues::Numeric(v) => {
                fields.push(Arc::new(primitive(&column.descriptor.name, PhysicalType::DOUBLE)?));
                columns.push(ParquetColumn::Float(v.clone()));
            }
            ColumnValues::Categorical(v) => {
                fields.push(Arc::new(primitive(
                    &column.descriptor.name,
                    PhysicalType::BYTE_ARRAY,
                )?));
                columns.push(ParquetColumn::Text(
                    v.iter().map(|s| ByteArray::from(s.as_str())).collect(),
                ));
            }
        }
    }

    let schema = Type::group_type_builder("features")
        .with_fields(fields)
        .build()
        .context("build parquet schema")?;
    let props = WriterProperties::builder().build();
    let file = fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = SerializedFileWriter::new(file, Arc::new(schema), Arc::new(props))
        .context("open parquet writer")?;
    let mut row_group = writer.next_row_group().context("start row group")?;
    for column in &columns {
        let mut col = row_group
            .next_column()
            .context("next parquet column")?
            .ok_or_else(|| anyhow!("parquet schema has fewer columns than the table"))?;
        match column {
            ParquetColumn::Text(v) => col.typed::<ByteArrayType>().write_batch(v, None, None),
            ParquetColumn::Int(v) => col.typed::<Int64Type>().write_batch(v, None, None),
            ParquetColumn::Float(v) => col.typed::<DoubleType>().write_batch(v, None, None),
            ParquetColumn::Bool(v) => col.typed::<BoolType>().write_batch(v, None, None),
        }
        .context("write parquet column")?;
        col.close().context("close parquet column")?;
    }
    row_group.close().context("close row group")?;
    writer.close().context("close parquet file")?;
    Ok(())
}

fn primitive(name: &str, physical: PhysicalType) -> Result<Type> {
    let builder = Type::primitive_type_builder(name, physical).with_repetition(Repetition::REQUIRED);
    let builder = if physical == PhysicalType::BYTE_ARRAY {
        builder.with_converted_type(ConvertedType::UTF8)
    } else {
        builder
    };
    builder
        .build()
        .with_context(|| format!("parquet column {name}"))
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    rows: usize,
    base_columns: Vec<&'static str>,
    features: Vec<&'a FeatureDescriptor>,
}

/// JSON listing of the output columns and how each derived one was built.
pub fn write_manifest(table: &FeatureTable, path: &Path) -> Result<()> {
    let manifest = Manifest {
        rows: table.len(),
        base_columns: BaseColumn::ALL.iter().map(|c| c.name()).collect(),
        features: table.descriptors(),
    };
    let json = serde_json::to_string_pretty(&manifest).context("serialize feature manifest")?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
