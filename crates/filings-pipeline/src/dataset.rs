//! Wide per-period tables
//!
//! A [`CategoryDataset`] holds one row per `(entity, cik, date, year, quarter)`
//! key and one column per metric or derived ratio. Metrics with no fact for a
//! key are present as [`Cell::Null`], never absent.

use crate::error::{PipelineError, Result};
use crate::processing::{FiscalPeriod, PeriodFact};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

/// Key columns carried by every dataset, in file order
pub const KEY_COLUMNS: [&str; 5] = ["ENTITY", "CIK", "DATE", "Year", "Quarter"];

/// A single value in a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Wrap a float, mapping NaN and infinities to null
    pub fn number(value: f64) -> Self {
        if value.is_finite() {
            Self::Number(value)
        } else {
            Self::Null
        }
    }

    pub fn from_option(value: Option<f64>) -> Self {
        value.map_or(Self::Null, Self::number)
    }

    /// Parse a stored field: empty is null, numeric text is a number
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
            return Self::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(value) => Self::number(value),
            Err(_) => Self::Text(trimmed.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Null | Self::Text(_) => None,
        }
    }

    fn to_field(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Number(value) => value.to_string(),
            Self::Text(text) => text.clone(),
        }
    }
}

/// Unique row key of a dataset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodKey {
    pub entity: String,
    pub cik: u64,
    pub date: NaiveDate,
    pub year: i32,
    pub quarter: FiscalPeriod,
}

impl PeriodKey {
    fn from_fact(fact: &PeriodFact) -> Self {
        Self {
            entity: fact.entity_name.clone(),
            cik: fact.cik,
            date: fact.end,
            year: fact.year,
            quarter: fact.quarter,
        }
    }
}

/// One row: key plus cells aligned with the dataset's columns
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    pub key: PeriodKey,
    pub cells: Vec<Cell>,
}

/// A flattened `(entity, cik, date, metric, value)` observation
pub type Observation = (String, u64, NaiveDate, String, f64);

/// Wide table of metrics and derived ratios per period
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryDataset {
    columns: Vec<String>,
    rows: Vec<DatasetRow>,
}

impl CategoryDataset {
    /// Build a dataset from pre-aligned rows
    pub fn from_rows(columns: Vec<String>, rows: Vec<DatasetRow>) -> Result<Self> {
        if let Some(bad) = rows.iter().find(|row| row.cells.len() != columns.len()) {
            return Err(PipelineError::Validation(format!(
                "Row for {} has {} cells, expected {}",
                bad.key.date,
                bad.cells.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Pivot long-format facts into one column per requested metric
    ///
    /// Facts sharing a key and metric are averaged. Facts for metrics outside
    /// `metrics` are ignored.
    pub fn pivot(facts: &[PeriodFact], metrics: &[&str]) -> Self {
        let mut grouped: BTreeMap<PeriodKey, Vec<(f64, u32)>> = BTreeMap::new();

        for fact in facts {
            let Some(index) = metrics.iter().position(|m| *m == fact.metric) else {
                continue;
            };
            let sums = grouped
                .entry(PeriodKey::from_fact(fact))
                .or_insert_with(|| vec![(0.0, 0); metrics.len()]);
            sums[index].0 += fact.value;
            sums[index].1 += 1;
        }

        let rows = grouped
            .into_iter()
            .map(|(key, sums)| DatasetRow {
                key,
                cells: sums
                    .into_iter()
                    .map(|(sum, count)| {
                        if count == 0 {
                            Cell::Null
                        } else {
                            Cell::number(sum / f64::from(count))
                        }
                    })
                    .collect(),
            })
            .collect();

        Self {
            columns: metrics.iter().map(|m| (*m).to_string()).collect(),
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Numeric value of `column` in row `row`
    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.cells.get(index)?.as_f64()
    }

    /// Numeric view of one column, `None` when the column is absent
    pub fn numeric_column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row.cells[index].as_f64()).collect())
    }

    /// Divide every numeric cell of the named columns by `divisor`
    pub fn scale_columns(&mut self, columns: &[&str], divisor: f64) {
        let indices: Vec<usize> = columns.iter().filter_map(|c| self.column_index(c)).collect();
        for row in &mut self.rows {
            for &index in &indices {
                if let Cell::Number(value) = row.cells[index] {
                    row.cells[index] = Cell::number(value / divisor);
                }
            }
        }
    }

    /// Append or replace a column; `values` must have one entry per row
    pub fn push_column(&mut self, name: &str, values: Vec<Cell>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(PipelineError::Validation(format!(
                "Column {name} has {} values for {} rows",
                values.len(),
                self.rows.len()
            )));
        }

        match self.column_index(name) {
            Some(index) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.cells[index] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.cells.push(value);
                }
            }
        }
        Ok(())
    }

    /// Rename columns through `(from, to)` pairs; unmatched columns keep their name
    pub fn rename_columns(&mut self, renames: &[(&str, &str)]) {
        for column in &mut self.columns {
            if let Some((_, to)) = renames.iter().find(|(from, _)| from == column) {
                *column = (*to).to_string();
            }
        }
    }

    /// Re-flatten numeric cells into observations
    pub fn flatten(&self) -> Vec<Observation> {
        let mut observations = Vec::new();
        for row in &self.rows {
            for (column, cell) in self.columns.iter().zip(&row.cells) {
                if let Some(value) = cell.as_f64() {
                    observations.push((
                        row.key.entity.clone(),
                        row.key.cik,
                        row.key.date,
                        column.clone(),
                        value,
                    ));
                }
            }
        }
        observations
    }

    /// Serialize as CSV with the key columns first
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let header: Vec<&str> = KEY_COLUMNS
            .iter()
            .copied()
            .chain(self.columns.iter().map(String::as_str))
            .collect();
        writer.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![
                row.key.entity.clone(),
                row.key.cik.to_string(),
                row.key.date.format("%Y-%m-%d").to_string(),
                row.key.year.to_string(),
                row.key.quarter.to_string(),
            ];
            record.extend(row.cells.iter().map(Cell::to_field));
            writer.write_record(&record)?;
        }

        writer
            .into_inner()
            .map_err(|e| PipelineError::Storage(format!("Failed to flush CSV writer: {e}")))
    }

    /// Read a dataset written by [`CategoryDataset::to_csv`]
    ///
    /// Missing key columns fail validation. Rows whose key cannot be parsed are
    /// logged and skipped.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers()?.clone();

        let position = |name: &str| headers.iter().position(|h| h == name);
        let key_positions: Vec<Option<usize>> = KEY_COLUMNS.iter().map(|&k| position(k)).collect();
        let missing: Vec<&str> = KEY_COLUMNS
            .iter()
            .zip(&key_positions)
            .filter(|(_, p)| p.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::Validation(format!(
                "Missing required columns: {}",
                missing.join(", ")
            )));
        }
        let key_positions: Vec<usize> = key_positions.into_iter().flatten().collect();

        let value_positions: Vec<usize> = (0..headers.len())
            .filter(|i| !key_positions.contains(i))
            .collect();
        let columns: Vec<String> = value_positions
            .iter()
            .map(|&i| headers[i].to_string())
            .collect();

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let Some(key) = parse_key(&record, &key_positions) else {
                tracing::warn!("Skipping dataset row {}: unparsable key", line + 1);
                continue;
            };

            let cells = value_positions
                .iter()
                .map(|&i| Cell::parse(record.get(i).unwrap_or_default()))
                .collect();
            rows.push(DatasetRow { key, cells });
        }

        Ok(Self { columns, rows })
    }
}

fn parse_key(record: &csv::StringRecord, positions: &[usize]) -> Option<PeriodKey> {
    let field = |i: usize| record.get(positions[i]).unwrap_or_default().trim();
    Some(PeriodKey {
        entity: field(0).to_string(),
        cik: field(1).parse().ok()?,
        date: NaiveDate::parse_from_str(field(2), "%Y-%m-%d").ok()?,
        year: field(3).parse().ok()?,
        quarter: field(4).parse().ok()?,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn fact(metric: &str, end: &str, value: f64, year: i32, quarter: FiscalPeriod) -> PeriodFact {
        PeriodFact {
            entity_name: "ACME CORP".to_string(),
            cik: 12927,
            metric: metric.to_string(),
            start: None,
            end: end.parse().unwrap(),
            value,
            year,
            quarter,
        }
    }

    /// Three consecutive quarters of one or more series
    pub fn quarterly(series: &[(&str, [f64; 3])]) -> Vec<PeriodFact> {
        let periods = [
            ("2023-03-31", FiscalPeriod::Q1),
            ("2023-06-30", FiscalPeriod::Q2),
            ("2023-09-30", FiscalPeriod::Q3),
        ];
        let mut facts = Vec::new();
        for (metric, values) in series {
            for ((end, quarter), value) in periods.iter().zip(values) {
                facts.push(fact(metric, end, *value, 2023, *quarter));
            }
        }
        facts
    }
}
