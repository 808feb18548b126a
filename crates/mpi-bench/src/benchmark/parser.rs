//! Benchmark output parsing
//!
//! The matrix programs report their timings as free text. This is the only
//! place that knows the phrases they print.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Total Time Elapsed is ([\d.]+) seconds").unwrap());
static GFLOPS_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"GFLOPS: ([\d.]+)").unwrap());
static MEMORY_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"Memory: ([\d.]+) MB").unwrap());

/// Metrics found in program output; `None` when the phrase is absent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedOutput {
    pub execution_time: Option<f64>,
    pub gflops: Option<f64>,
    pub memory_mb: Option<f64>,
}

fn capture(pattern: &Regex, text: &str) -> Option<f64> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Extract the first occurrence of each metric phrase
pub fn parse_output(text: &str) -> ParsedOutput {
    ParsedOutput {
        execution_time: capture(&TIME_PATTERN, text),
        gflops: capture(&GFLOPS_PATTERN, text),
        memory_mb: capture(&MEMORY_PATTERN, text),
    }
}
