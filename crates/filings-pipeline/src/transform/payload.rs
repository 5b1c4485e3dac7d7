//! Chart payload shapes

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single chart point; `y` is null where no value exists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: String,
    pub y: Option<f64>,
}

/// One named series of a line chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSeries {
    pub id: String,
    pub color: String,
    #[serde(rename = "data")]
    pub points: Vec<Point>,
}

/// One grouped-bar row: `{metric}Value` and `{metric}Color` per metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRow {
    pub date: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// One data grid row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRow {
    /// 1-based position in the source dataset
    pub id: usize,
    /// Formatted period date
    pub year: String,
    #[serde(flatten)]
    pub columns: serde_json::Map<String, serde_json::Value>,
}

/// Complementary series for a signed metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceSeriesPair {
    pub positive: LineSeries,
    pub negative: LineSeries,
}

/// Stored chart payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ChartPayload {
    Line(Vec<LineSeries>),
    Bar(Vec<BarRow>),
    DataGrid(Vec<GridRow>),
    Divergence(DivergenceSeriesPair),
}

impl ChartPayload {
    pub fn kind(&self) -> ChartKind {
        match self {
            Self::Line(_) => ChartKind::Line,
            Self::Bar(_) => ChartKind::Bar,
            Self::DataGrid(_) => ChartKind::DataGrid,
            Self::Divergence(_) => ChartKind::Divergence,
        }
    }

    /// Whether the payload carries nothing to draw
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Line(series) => series.iter().all(|s| s.points.is_empty()),
            Self::Bar(rows) => rows.is_empty(),
            Self::DataGrid(rows) => rows.is_empty(),
            Self::Divergence(pair) => pair.positive.points.is_empty() && pair.negative.points.is_empty(),
        }
    }
}

/// Chart kinds, also used as payload sub-folder names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChartKind {
    Line,
    Bar,
    DataGrid,
    Divergence,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [Self::Line, Self::Bar, Self::DataGrid, Self::Divergence];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Line => "line_chart",
            Self::Bar => "bar_chart",
            Self::DataGrid => "data_grid",
            Self::Divergence => "divergence_chart",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PipelineError::Query(format!("Unknown chart kind: '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_serializes_tagged() {
        let payload = ChartPayload::Line(vec![LineSeries {
            id: "CURRENT_RATIO".to_string(),
            color: "hsl(10, 70%, 50%)".to_string(),
            points: vec![Point { x: "2023-03".to_string(), y: None }],
        }]);

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "kind": "line",
                "data": [{"id": "CURRENT_RATIO", "color": "hsl(10, 70%, 50%)", "data": [{"x": "2023-03", "y": null}]}]
            })
        );

        let back: ChartPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_bar_row_flattens_fields() {
        let mut fields = serde_json::Map::new();
        fields.insert("REVENUESValue".to_string(), json!(12.5));
        fields.insert("REVENUESColor".to_string(), json!("hsl(1, 70%, 50%)"));
        let row = BarRow { date: "2023-03".to_string(), fields };

        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["date"], "2023-03");
        assert_eq!(value["REVENUESValue"], 12.5);
    }

    #[test]
    fn test_chart_kind_names() {
        assert_eq!(ChartKind::DataGrid.as_str(), "data_grid");
        assert_eq!("divergence_chart".parse::<ChartKind>().unwrap(), ChartKind::Divergence);
        assert!("pie_chart".parse::<ChartKind>().is_err());
    }
}
