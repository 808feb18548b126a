//! Result persistence
//!
//! One pretty-printed JSON file per saved result in a flat directory.

use crate::benchmark::ResultDocument;
use crate::{BenchError, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Store for saved benchmark results
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    /// Store rooted at `dir`; the directory is created on first save
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate a file name and add `.json` unless it already ends in it
    pub fn normalize_name(name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(BenchError::InvalidResultName(name.to_string()));
        }
        if Path::new(name).extension().and_then(|e| e.to_str()) == Some("json") {
            Ok(name.to_string())
        } else {
            Ok(format!("{name}.json"))
        }
    }

    /// File name used when none is given
    pub fn auto_name() -> String {
        format!("benchmark_{}.json", Utc::now().timestamp())
    }

    /// Save a result, returning the path written
    pub fn save(&self, document: &ResultDocument, name: Option<&str>) -> Result<PathBuf> {
        let file_name = match name {
            Some(name) => Self::normalize_name(name)?,
            None => Self::auto_name(),
        };

        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&file_name);
        let content = serde_json::to_string_pretty(document)?;
        std::fs::write(&path, content)?;

        info!("Results saved to {:?}", path);
        Ok(path)
    }

    /// Load a saved result by file name
    pub fn load(&self, name: &str) -> Result<ResultDocument> {
        let file_name = Self::normalize_name(name)?;
        let path = self.dir.join(&file_name);
        if !path.is_file() {
            return Err(BenchError::ResultNotFound(file_name));
        }

        let content = std::fs::read_to_string(&path)?;
        debug!("Loaded {} bytes from {:?}", content.len(), path);
        Ok(serde_json::from_str(&content)?)
    }

    /// Names of saved `*.json` files, sorted
    pub fn list_saved(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new("data/results")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{
        BenchmarkRecord, ComparisonRecord, ExecutionMode, RunMetrics,
    };
    use tempfile::TempDir;

    fn record(mode: ExecutionMode, procs: u32, time: f64) -> BenchmarkRecord {
        BenchmarkRecord::completed(
            mode,
            "matrix_multiplication",
            500,
            procs,
            RunMetrics {
                execution_time: time,
                wall_time: time * 1.1,
                gflops: 0.125,
                memory_mb: 5.722045898437,
            },
            format!("Total Time Elapsed is {time:.6} seconds\n"),
        )
    }

    fn comparison() -> ComparisonRecord {
        let mut comparison = ComparisonRecord::new(500, 4);
        comparison
            .tests
            .insert(ExecutionMode::Serial, record(ExecutionMode::Serial, 1, 2.0));
        comparison
            .tests
            .insert(ExecutionMode::SingleNode, record(ExecutionMode::SingleNode, 4, 0.6));
        comparison.tests.insert(
            ExecutionMode::MultiNode,
            BenchmarkRecord::failed(
                ExecutionMode::MultiNode,
                "matrix_multiplication",
                500,
                4,
                "ssh: connect to host node02 port 22: Connection refused",
            ),
        );
        comparison.derive_ratios();
        comparison
    }

    #[test]
    fn test_roundtrip_single_record() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::new(dir.path().join("results"));
        let document: ResultDocument = record(ExecutionMode::Serial, 1, 1.0 / 3.0).into();

        let path = store.save(&document, Some("serial_run")).unwrap();
        assert!(path.ends_with("serial_run.json"));

        let loaded = store.load("serial_run.json").unwrap();
        assert_eq!(loaded, document);
    }

    #[test]
    fn test_roundtrip_comparison() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::new(dir.path());
        let document: ResultDocument = comparison().into();

        store.save(&document, Some("cmp.json")).unwrap();
        let loaded = store.load("cmp").unwrap();

        assert_eq!(loaded, document);
        let single = loaded.as_comparison().unwrap().get(ExecutionMode::SingleNode).unwrap();
        assert_eq!(single.speedup(), Some(2.0 / 0.6));
    }

    #[test]
    fn test_saved_file_is_pretty_json() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::new(dir.path());
        let path = store.save(&comparison().into(), Some("pretty")).unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("\n  \"matrix_size\": 500"));
    }

    #[test]
    fn test_auto_name() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::new(dir.path());
        let path = store.save(&comparison().into(), None).unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("benchmark_"));
        assert!(name.ends_with(".json"));
        let stamp = &name["benchmark_".len()..name.len() - ".json".len()];
        assert!(stamp.parse::<i64>().is_ok());
    }

    #[test]
    fn test_list_saved_sorted_json_only() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::new(dir.path());
        store.save(&comparison().into(), Some("b")).unwrap();
        store.save(&comparison().into(), Some("a")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        assert_eq!(store.list_saved().unwrap(), vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_dotted_name_is_listed() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::new(dir.path());

        let path = store.save(&comparison().into(), Some("bench_v1.2")).unwrap();
        assert!(path.ends_with("bench_v1.2.json"));
        assert_eq!(store.list_saved().unwrap(), vec!["bench_v1.2.json"]);
        assert!(store.load("bench_v1.2").is_ok());
    }

    #[test]
    fn test_missing_dir_lists_empty() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::new(dir.path().join("never-created"));
        assert!(store.list_saved().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_names_rejected() {
        for name in ["../etc/passwd", "a/b", "a\\b", "", ".."] {
            assert!(matches!(
                ResultStore::normalize_name(name),
                Err(BenchError::InvalidResultName(_))
            ));
        }
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::new(dir.path());
        assert!(matches!(
            store.load("nope"),
            Err(BenchError::ResultNotFound(name)) if name == "nope.json"
        ));
    }
}
