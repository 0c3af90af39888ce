//! Experiment comparison: turns a compare-experiments query result into
//! table rows, one per dataset example, with a cell per selected experiment.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Result of the compare-experiments query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompareExperimentsPayload {
    pub comparisons: Vec<ExperimentComparison>,
    #[serde(default)]
    pub dataset: Option<DatasetExperiments>,
}

impl CompareExperimentsPayload {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentComparison {
    pub example: ComparedExample,
    #[serde(default)]
    pub run_comparison_items: Vec<RunComparisonItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparedExample {
    pub id: String,
    pub revision: ExampleRevision,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExampleRevision {
    #[serde(default)]
    pub input: Value,
    #[serde(default, alias = "output")]
    pub reference_output: Value,
}

/// All runs of one experiment on one example.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunComparisonItem {
    pub experiment_id: String,
    #[serde(default)]
    pub runs: Vec<ExperimentRun>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentRun {
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trace: Option<TraceRef>,
    #[serde(default)]
    pub annotations: AnnotationConnection,
}

impl ExperimentRun {
    /// Wall-clock latency, when both ends of the run are known.
    pub fn latency_ms(&self) -> Option<i64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }

    pub fn annotations(&self) -> impl Iterator<Item = &RunAnnotation> {
        self.annotations.edges.iter().map(|edge| &edge.annotation)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TraceRef {
    pub trace_id: String,
    pub project_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AnnotationConnection {
    #[serde(default)]
    pub edges: Vec<AnnotationEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnnotationEdge {
    pub annotation: RunAnnotation,
}

/// An evaluation attached to a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunAnnotation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub label: Option<String>,
    pub annotator_kind: String,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub trace: Option<TraceRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetExperiments {
    pub id: String,
    #[serde(default)]
    pub experiments: ExperimentConnection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExperimentConnection {
    #[serde(default)]
    pub edges: Vec<ExperimentEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentEdge {
    pub experiment: ExperimentNode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentNode {
    pub id: String,
    pub name: String,
    pub sequence_number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentInfo {
    pub name: String,
    pub sequence_number: u32,
}

/// Experiments of the dataset keyed by id. Empty when the payload carries no
/// dataset.
pub fn experiment_info_by_id(payload: &CompareExperimentsPayload) -> HashMap<String, ExperimentInfo> {
    payload
        .dataset
        .iter()
        .flat_map(|dataset| dataset.experiments.edges.iter())
        .map(|edge| {
            (
                edge.experiment.id.clone(),
                ExperimentInfo {
                    name: edge.experiment.name.clone(),
                    sequence_number: edge.experiment.sequence_number,
                },
            )
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareColumn {
    Input,
    ReferenceOutput,
    Experiment {
        id: String,
        name: Option<String>,
        /// 0 when the experiment is not part of the dataset payload.
        sequence_number: u32,
    },
}

impl CompareColumn {
    pub fn header(&self) -> String {
        match self {
            CompareColumn::Input => "input".to_string(),
            CompareColumn::ReferenceOutput => "reference output".to_string(),
            CompareColumn::Experiment {
                id,
                name,
                sequence_number,
            } => format!("#{} {}", sequence_number, name.as_deref().unwrap_or(id)),
        }
    }
}

/// One dataset example compared across experiments.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareRow {
    /// The example id.
    pub id: String,
    pub input: Value,
    pub reference_output: Value,
    pub run_comparison_map: HashMap<String, RunComparisonItem>,
}

impl CompareRow {
    fn from_comparison(comparison: &ExperimentComparison) -> Self {
        let run_comparison_map = comparison
            .run_comparison_items
            .iter()
            .map(|item| (item.experiment_id.clone(), item.clone()))
            .collect();
        Self {
            id: comparison.example.id.clone(),
            input: comparison.example.revision.input.clone(),
            reference_output: comparison.example.revision.reference_output.clone(),
            run_comparison_map,
        }
    }

    pub fn cell(&self, experiment_id: &str) -> RunCell<'_> {
        let runs = self
            .run_comparison_map
            .get(experiment_id)
            .map(|item| item.runs.as_slice())
            .unwrap_or_default();
        match runs {
            [] => RunCell::NotRun,
            [run] => match &run.error {
                Some(error) if !error.is_empty() => RunCell::Failed { error },
                _ => RunCell::Output {
                    output: &run.output,
                    latency_ms: run.latency_ms(),
                    annotations: run.annotations().collect(),
                    trace: run.trace.as_ref(),
                },
            },
            // Repetitions are only counted, not expanded.
            runs => RunCell::Repetitions(runs.len()),
        }
    }
}

/// What an experiment column shows for one example.
#[derive(Debug, Clone, PartialEq)]
pub enum RunCell<'a> {
    NotRun,
    Repetitions(usize),
    Failed {
        error: &'a str,
    },
    Output {
        output: &'a Value,
        latency_ms: Option<i64>,
        annotations: Vec<&'a RunAnnotation>,
        trace: Option<&'a TraceRef>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompareTable {
    pub columns: Vec<CompareColumn>,
    pub rows: Vec<CompareRow>,
}

impl CompareTable {
    /// Columns are `input`, `reference output`, then one per requested
    /// experiment in request order.
    pub fn build(payload: &CompareExperimentsPayload, experiment_ids: &[String]) -> Self {
        let info = experiment_info_by_id(payload);
        let mut columns = vec![CompareColumn::Input, CompareColumn::ReferenceOutput];
        columns.extend(experiment_ids.iter().map(|id| {
            let known = info.get(id);
            CompareColumn::Experiment {
                id: id.clone(),
                name: known.map(|i| i.name.clone()),
                sequence_number: known.map(|i| i.sequence_number).unwrap_or(0),
            }
        }));
        let rows = payload
            .comparisons
            .iter()
            .map(CompareRow::from_comparison)
            .collect();
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn experiment_ids(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter_map(|column| match column {
            CompareColumn::Experiment { id, .. } => Some(id.as_str()),
            CompareColumn::Input | CompareColumn::ReferenceOutput => None,
        })
    }
}

/// JSON text of a cell value: indented with two spaces when `full_text`,
/// single-line otherwise.
pub fn render_json(value: &Value, full_text: bool) -> String {
    if full_text {
        format!("{value:#}")
    } else {
        value.to_string()
    }
}
