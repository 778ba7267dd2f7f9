//! Bar chart data for numeric columns. Display only, never exported.

use serde::Serialize;

use crate::models::Table;

/// One bar series, one value per row (`None` for missing).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Bars grouped by row index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarChart {
    pub row_index: Vec<usize>,
    pub series: Vec<ChartSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChartData {
    Bar(BarChart),
    /// The working table has no numeric column.
    NothingToChart,
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        matches!(self, ChartData::NothingToChart)
    }
}

/// Take up to `max_series` numeric columns, in table order.
pub fn extract_chart(table: &Table, max_series: usize) -> ChartData {
    let series: Vec<ChartSeries> = table
        .numeric_columns()
        .take(max_series)
        .map(|column| ChartSeries {
            name: column.name.clone(),
            values: column.values.iter().map(|c| c.as_number()).collect(),
        })
        .collect();

    if series.is_empty() {
        return ChartData::NothingToChart;
    }

    ChartData::Bar(BarChart {
        row_index: (0..table.row_count()).collect(),
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;

    #[test]
    fn test_first_two_numeric_columns() {
        let table = Table::from_rows(
            vec!["label", "x", "y", "z"],
            vec![
                vec![Cell::Text("a".into()), Cell::Number(1.0), Cell::Number(2.0), Cell::Number(3.0)],
                vec![Cell::Text("b".into()), Cell::Missing, Cell::Number(5.0), Cell::Number(6.0)],
            ],
        );

        let chart = extract_chart(&table, 2);
        let ChartData::Bar(bar) = chart else {
            panic!("expected a bar chart");
        };
        assert_eq!(bar.row_index, vec![0, 1]);
        assert_eq!(bar.series.len(), 2);
        assert_eq!(bar.series[0].name, "x");
        assert_eq!(bar.series[0].values, vec![Some(1.0), None]);
        assert_eq!(bar.series[1].name, "y");
    }

    #[test]
    fn test_nothing_to_chart() {
        let table = Table::from_rows(vec!["label"], vec![vec![Cell::Text("a".into())]]);
        let chart = extract_chart(&table, 2);
        assert!(chart.is_empty());

        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["type"], "nothingToChart");
    }

    #[test]
    fn test_chart_serialization() {
        let table = Table::from_rows(vec!["v"], vec![vec![Cell::Number(4.0)]]);
        let json = serde_json::to_value(extract_chart(&table, 2)).unwrap();

        assert_eq!(json["type"], "bar");
        assert_eq!(json["rowIndex"], serde_json::json!([0]));
        assert_eq!(json["series"][0]["values"], serde_json::json!([4.0]));
    }
}
