//! Transformation module.
//!
//! - Steps: deduplication, mean imputation, column selection
//! - Chart: bar chart data for numeric columns
//! - Pipeline: the steps in order, plus load and export

pub mod chart;
pub mod pipeline;
pub mod steps;

pub use chart::{extract_chart, BarChart, ChartData, ChartSeries};
pub use pipeline::*;
pub use steps::{column_mean, fill_missing_with_mean, remove_duplicates, select_columns};
