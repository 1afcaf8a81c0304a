//! Metrics reports written by worldtests as CI artifacts.
//!
//! Reports are plain JSON; every subsystem section is optional so a test only
//! fills in what it exercised.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Top-level metrics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Test identifier
    pub test_name: String,

    /// Collection time (RFC 3339)
    pub timestamp: String,

    /// Overall result
    pub result: TestResult,

    /// Terrain generation metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terrain: Option<TerrainMetrics>,

    /// Chunk streaming metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streaming: Option<StreamingMetrics>,

    /// Enemy AI metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiMetrics>,

    /// Persistence metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence: Option<PersistenceMetrics>,

    /// Test execution metrics
    pub test_execution: TestExecutionMetrics,
}

/// Overall test result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    /// All validations passed
    Pass,
    /// At least one validation failed
    Fail,
    /// Skipped
    Skip,
}

/// Terrain generation metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainMetrics {
    /// Chunks generated
    pub chunks_generated: usize,
    /// Tiles generated
    pub tiles_generated: usize,
    /// Average generation time per chunk (microseconds)
    pub avg_gen_time_us: f64,
    /// Share of each tile kind, keyed by kind name
    pub tile_histogram: Vec<(String, usize)>,
    /// Chunks whose regeneration differed (must be 0)
    pub mismatches: usize,
}

/// Chunk streaming metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingMetrics {
    /// Streaming passes run
    pub passes: usize,
    /// Chunks made resident
    pub loaded: usize,
    /// Chunks evicted
    pub unloaded: usize,
    /// Largest resident set observed
    pub peak_resident: usize,
    /// Chunks explored at the end of the run
    pub explored: usize,
}

/// Enemy AI metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiMetrics {
    /// Ticks simulated
    pub ticks: u64,
    /// State transitions observed
    pub transitions: usize,
    /// Hits landed by enemies
    pub attacks: usize,
}

/// Persistence metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceMetrics {
    /// Chunks written
    pub chunks_saved: usize,
    /// Chunks read back
    pub chunks_loaded: usize,
    /// Size of the store on disk
    pub bytes_written: u64,
}

/// Test execution metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestExecutionMetrics {
    /// Wall-clock duration (seconds)
    pub duration_seconds: f64,
    /// Validations passed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validations_passed: Option<usize>,
}

/// Builder for [`MetricsReport`]
pub struct MetricsReportBuilder {
    report: MetricsReport,
}

impl MetricsReportBuilder {
    /// Start a passing report named `test_name`
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            report: MetricsReport {
                test_name: test_name.into(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                result: TestResult::Pass,
                terrain: None,
                streaming: None,
                ai: None,
                persistence: None,
                test_execution: TestExecutionMetrics::default(),
            },
        }
    }

    /// Set test result
    pub fn result(mut self, result: TestResult) -> Self {
        self.report.result = result;
        self
    }

    /// Set terrain metrics
    pub fn terrain(mut self, metrics: TerrainMetrics) -> Self {
        self.report.terrain = Some(metrics);
        self
    }

    /// Set streaming metrics
    pub fn streaming(mut self, metrics: StreamingMetrics) -> Self {
        self.report.streaming = Some(metrics);
        self
    }

    /// Set AI metrics
    pub fn ai(mut self, metrics: AiMetrics) -> Self {
        self.report.ai = Some(metrics);
        self
    }

    /// Set persistence metrics
    pub fn persistence(mut self, metrics: PersistenceMetrics) -> Self {
        self.report.persistence = Some(metrics);
        self
    }

    /// Set execution metrics
    pub fn execution(mut self, metrics: TestExecutionMetrics) -> Self {
        self.report.test_execution = metrics;
        self
    }

    /// Finish the report
    pub fn build(self) -> MetricsReport {
        self.report
    }
}

/// Writes metrics reports to a JSON file.
pub struct MetricsSink {
    path: PathBuf,
}

impl MetricsSink {
    /// Sink at `path`, creating parent directories.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create metrics directory")?;
        }
        Ok(Self { path })
    }

    /// Write `report` as pretty JSON.
    pub fn write(&self, report: &MetricsReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        let mut file = File::create(&self.path)
            .with_context(|| format!("Failed to create {}", self.path.display()))?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_omits_unset_sections() {
        let report = MetricsReportBuilder::new("streaming_smoke")
            .streaming(StreamingMetrics {
                passes: 10,
                loaded: 25,
                unloaded: 4,
                peak_resident: 21,
                explored: 30,
            })
            .build();
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"streaming\""));
        assert!(json.contains("\"result\":\"pass\""));
        assert!(!json.contains("\"terrain\""));
        assert!(!json.contains("validations_passed"));
    }

    #[test]
    fn sink_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("metrics.json");
        let report = MetricsReportBuilder::new("ai_smoke")
            .ai(AiMetrics {
                ticks: 100,
                transitions: 3,
                attacks: 2,
            })
            .result(TestResult::Fail)
            .build();
        MetricsSink::create(&path).unwrap().write(&report).unwrap();

        let loaded: MetricsReport =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.result, TestResult::Fail);
        assert_eq!(loaded.ai.map(|a| a.attacks), Some(2));
    }
}
