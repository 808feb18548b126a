//! CSV export of a result table

use super::{flatten, ResultRow};
use crate::benchmark::ResultDocument;
use crate::Result;
use csv::Writer;

const HEADER: [&str; 7] = [
    "Mode",
    "Time (s)",
    "Speedup",
    "Efficiency",
    "Processes",
    "GFLOPS",
    "Memory (MB)",
];

/// Download name for a result table
pub fn csv_file_name(matrix_size: u32) -> String {
    format!("benchmark_results_{matrix_size}.csv")
}

fn format_row(row: &ResultRow) -> [String; 7] {
    [
        row.mode.title().to_string(),
        format!("{:.4}", row.execution_time),
        format!("{:.2}x", row.speedup),
        format!("{:.2}%", row.efficiency * 100.0),
        row.num_processes.to_string(),
        format!("{:.2}", row.gflops),
        format!("{:.2}", row.memory_mb),
    ]
}

/// Table of every successful run as CSV text
pub fn csv_table(document: &ResultDocument) -> Result<String> {
    let mut wtr = Writer::from_writer(vec![]);
    wtr.write_record(HEADER)?;
    for row in flatten(document) {
        wtr.write_record(format_row(&row))?;
    }

    let data = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(data)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
}
