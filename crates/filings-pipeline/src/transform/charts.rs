//! Line, bar and grid chart shapes

use super::payload::{BarRow, GridRow, LineSeries, Point};
use crate::dataset::{CategoryDataset, Cell};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Hue in `0..360` derived from a stable hash of the metric name
pub fn metric_hue(metric: &str) -> u16 {
    let hash = metric
        .bytes()
        .fold(FNV_OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME));
    u16::try_from(hash % 360).unwrap_or(0)
}

/// `hsl(h, 70%, 50%)` colour for a metric
pub fn metric_color(metric: &str) -> String {
    format!("hsl({}, 70%, 50%)", metric_hue(metric))
}

/// Month-resolution x label
pub fn format_month(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

fn cell_to_json(cell: &Cell) -> Value {
    match cell {
        Cell::Null => Value::Null,
        Cell::Number(value) => serde_json::Number::from_f64(*value).map_or(Value::Null, Value::Number),
        Cell::Text(text) => Value::String(text.clone()),
    }
}

fn optional_number(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

/// Numeric column, or all nulls when the dataset lacks it
fn column_or_nulls(dataset: &CategoryDataset, metric: &str) -> Vec<Option<f64>> {
    dataset.numeric_column(metric).unwrap_or_else(|| {
        tracing::warn!("Column {metric} missing from dataset, charting nulls");
        vec![None; dataset.len()]
    })
}

/// One series per metric, one point per row
pub fn line_chart(dataset: &CategoryDataset, metrics: &[&str]) -> Vec<LineSeries> {
    metrics
        .iter()
        .map(|metric| {
            let values = column_or_nulls(dataset, metric);
            LineSeries {
                id: (*metric).to_string(),
                color: metric_color(metric),
                points: dataset
                    .rows()
                    .iter()
                    .zip(values)
                    .map(|(row, y)| Point {
                        x: format_month(row.key.date),
                        y,
                    })
                    .collect(),
            }
        })
        .collect()
}

/// One row per distinct month; later rows overwrite earlier values for the same month
pub fn bar_chart(dataset: &CategoryDataset, metrics: &[&str]) -> Vec<BarRow> {
    let columns: Vec<Vec<Option<f64>>> = metrics
        .iter()
        .map(|metric| column_or_nulls(dataset, metric))
        .collect();

    let mut rows: Vec<BarRow> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (index, row) in dataset.rows().iter().enumerate() {
        let date = format_month(row.key.date);
        let position = *positions.entry(date.clone()).or_insert_with(|| {
            rows.push(BarRow {
                date,
                fields: serde_json::Map::new(),
            });
            rows.len() - 1
        });

        let fields = &mut rows[position].fields;
        for (metric, values) in metrics.iter().zip(&columns) {
            fields.insert(format!("{metric}Value"), optional_number(values[index]));
            fields.insert(format!("{metric}Color"), Value::String(metric_color(metric)));
        }
    }

    rows
}

/// One row per source record with every non-key column
pub fn data_grid(dataset: &CategoryDataset) -> Vec<GridRow> {
    dataset
        .rows()
        .iter()
        .enumerate()
        .map(|(index, row)| GridRow {
            id: index + 1,
            year: format_month(row.key.date),
            columns: dataset
                .columns()
                .iter()
                .zip(&row.cells)
                .map(|(column, cell)| (column.clone(), cell_to_json(cell)))
                .collect(),
        })
        .collect()
}
