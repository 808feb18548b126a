//! Chart specifications
//!
//! Renderer-neutral descriptions of the four comparison charts. A front end
//! maps these onto its plotting library; nothing here draws.

use super::ResultRow;
use crate::benchmark::ExecutionMode;
use serde::{Deserialize, Serialize};

/// Fixed color for each mode
pub fn mode_color(mode: ExecutionMode) -> &'static str {
    match mode {
        ExecutionMode::Serial => "#636EFA",
        ExecutionMode::SingleNode => "#EF553B",
        ExecutionMode::MultiNode => "#00CC96",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Lines with markers, one line per mode
    Line,
    /// Bars grouped by matrix size
    GroupedBar,
}

/// Points of one mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub mode: ExecutionMode,
    pub color: String,
    pub x: Vec<u32>,
    pub y: Vec<f64>,
}

/// Horizontal dashed line across the plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLine {
    pub y: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub kind: ChartKind,
    pub series: Vec<Series>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_line: Option<ReferenceLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_range: Option<[f64; 2]>,
}

impl ChartSpec {
    fn new(title: &str, y_label: &str, kind: ChartKind, series: Vec<Series>) -> Self {
        Self {
            title: title.to_string(),
            x_label: "Matrix Size".to_string(),
            y_label: y_label.to_string(),
            kind,
            series,
            reference_line: None,
            y_range: None,
        }
    }
}

/// One series per mode present in `rows`, in mode order
fn series_by_mode<'a>(
    rows: impl Iterator<Item = &'a ResultRow> + Clone,
    value: impl Fn(&ResultRow) -> f64,
) -> Vec<Series> {
    ExecutionMode::ALL
        .iter()
        .filter_map(|mode| {
            let points: Vec<&ResultRow> = rows.clone().filter(|r| r.mode == *mode).collect();
            if points.is_empty() {
                return None;
            }
            Some(Series {
                name: mode.title().to_string(),
                mode: *mode,
                color: mode_color(*mode).to_string(),
                x: points.iter().map(|r| r.matrix_size).collect(),
                y: points.iter().map(|&r| value(r)).collect(),
            })
        })
        .collect()
}

pub fn execution_time_chart(rows: &[ResultRow]) -> ChartSpec {
    ChartSpec::new(
        "Execution Time Comparison",
        "Time (seconds)",
        ChartKind::Line,
        series_by_mode(rows.iter(), |r| r.execution_time),
    )
}

pub fn speedup_chart(rows: &[ResultRow]) -> ChartSpec {
    ChartSpec::new(
        "Speedup Comparison",
        "Speedup (vs Serial)",
        ChartKind::GroupedBar,
        series_by_mode(rows.iter(), |r| r.speedup),
    )
}

/// Efficiency of the parallel modes; serial efficiency is undefined
pub fn efficiency_chart(rows: &[ResultRow]) -> ChartSpec {
    let mut chart = ChartSpec::new(
        "Parallel Efficiency",
        "Efficiency",
        ChartKind::GroupedBar,
        series_by_mode(rows.iter().filter(|r| r.mode.is_parallel()), |r| {
            r.efficiency
        }),
    );
    chart.reference_line = Some(ReferenceLine {
        y: 1.0,
        label: "Ideal Efficiency".to_string(),
    });
    chart.y_range = Some([0.0, 1.1]);
    chart
}

pub fn memory_chart(rows: &[ResultRow]) -> ChartSpec {
    ChartSpec::new(
        "Memory Usage Comparison",
        "Memory (MB)",
        ChartKind::GroupedBar,
        series_by_mode(rows.iter(), |r| r.memory_mb),
    )
}

/// Execution time, speedup, efficiency and memory charts
pub fn all_charts(rows: &[ResultRow]) -> Vec<ChartSpec> {
    vec![
        execution_time_chart(rows),
        speedup_chart(rows),
        efficiency_chart(rows),
        memory_chart(rows),
    ]
}
