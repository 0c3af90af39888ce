//! Tests for experiment comparison assembly.

use promptlab_core::compare::{experiment_info_by_id, CompareColumn};
use promptlab_core::{CompareExperimentsPayload, CompareTable, RunCell};
use serde_json::json;

fn payload() -> CompareExperimentsPayload {
    serde_json::from_value(json!({
        "comparisons": [
            {
                "example": {
                    "id": "ex-1",
                    "revision": {
                        "input": {"question": "2 + 2?"},
                        "referenceOutput": {"answer": "4"}
                    }
                },
                "runComparisonItems": [
                    {
                        "experimentId": "exp-a",
                        "runs": [{
                            "output": {"answer": "4"},
                            "error": null,
                            "startTime": "2024-05-01T12:00:00Z",
                            "endTime": "2024-05-01T12:00:00.420Z",
                            "trace": {"traceId": "t-1", "projectId": "p-1"},
                            "annotations": {"edges": [{
                                "annotation": {
                                    "id": "an-1",
                                    "name": "correctness",
                                    "score": 1.0,
                                    "label": "correct",
                                    "annotatorKind": "LLM",
                                    "explanation": null,
                                    "trace": null
                                }
                            }]}
                        }]
                    },
                    {
                        "experimentId": "exp-b",
                        "runs": [{
                            "output": null,
                            "error": "rate limited",
                            "startTime": "2024-05-01T12:00:00Z",
                            "endTime": null,
                            "trace": null,
                            "annotations": {"edges": []}
                        }]
                    }
                ]
            },
            {
                "example": {
                    "id": "ex-2",
                    "revision": {"input": "hello", "referenceOutput": "hi"}
                },
                "runComparisonItems": [
                    {"experimentId": "exp-a", "runs": []},
                    {
                        "experimentId": "exp-b",
                        "runs": [
                            {"output": "hi", "startTime": "2024-05-01T12:00:00Z"},
                            {"output": "hey", "startTime": "2024-05-01T12:00:01Z"}
                        ]
                    }
                ]
            }
        ],
        "dataset": {
            "id": "ds-1",
            "experiments": {"edges": [
                {"experiment": {"id": "exp-a", "name": "gpt-4o baseline", "sequenceNumber": 1}},
                {"experiment": {"id": "exp-b", "name": "new prompt", "sequenceNumber": 2}}
            ]}
        }
    }))
    .expect("payload should deserialize")
}

fn ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[test]
fn test_experiment_info_comes_from_dataset() {
    let info = experiment_info_by_id(&payload());
    assert_eq!(info.len(), 2);
    assert_eq!(info["exp-a"].name, "gpt-4o baseline");
    assert_eq!(info["exp-b"].sequence_number, 2);

    let mut without_dataset = payload();
    without_dataset.dataset = None;
    assert!(experiment_info_by_id(&without_dataset).is_empty());
}

#[test]
fn test_columns_follow_requested_experiments() {
    let table = CompareTable::build(&payload(), &ids(&["exp-b", "exp-a", "exp-zzz"]));
    let headers: Vec<String> = table.columns.iter().map(CompareColumn::header).collect();
    assert_eq!(
        headers,
        vec![
            "input",
            "reference output",
            "#2 new prompt",
            "#1 gpt-4o baseline",
            "#0 exp-zzz",
        ]
    );
    assert_eq!(
        table.experiment_ids().collect::<Vec<_>>(),
        vec!["exp-b", "exp-a", "exp-zzz"]
    );
}

#[test]
fn test_rows_carry_example_fields() {
    let table = CompareTable::build(&payload(), &ids(&["exp-a"]));
    assert_eq!(table.rows.len(), 2);
    let row = &table.rows[0];
    assert_eq!(row.id, "ex-1");
    assert_eq!(row.input, json!({"question": "2 + 2?"}));
    assert_eq!(row.reference_output, json!({"answer": "4"}));
    assert_eq!(row.run_comparison_map.len(), 2);
}

#[test]
fn test_cell_classification() {
    let table = CompareTable::build(&payload(), &ids(&["exp-a", "exp-b", "exp-c"]));
    let first = &table.rows[0];
    let second = &table.rows[1];

    match first.cell("exp-a") {
        RunCell::Output {
            output,
            latency_ms,
            annotations,
            trace,
        } => {
            assert_eq!(output, &json!({"answer": "4"}));
            assert_eq!(latency_ms, Some(420));
            assert_eq!(annotations.len(), 1);
            assert_eq!(annotations[0].label.as_deref(), Some("correct"));
            assert_eq!(trace.map(|t| t.trace_id.as_str()), Some("t-1"));
        }
        other => panic!("expected output cell, got {other:?}"),
    }
    assert_eq!(first.cell("exp-b"), RunCell::Failed { error: "rate limited" });
    assert_eq!(first.cell("exp-c"), RunCell::NotRun);

    assert_eq!(second.cell("exp-a"), RunCell::NotRun);
    assert_eq!(second.cell("exp-b"), RunCell::Repetitions(2));
}

#[test]
fn test_empty_error_string_is_not_a_failure() {
    let payload: CompareExperimentsPayload = serde_json::from_value(json!({
        "comparisons": [{
            "example": {"id": "ex-1", "revision": {"input": "q", "referenceOutput": "a"}},
            "runComparisonItems": [
                {"experimentId": "exp-a", "runs": [{"output": "a", "error": ""}]}
            ]
        }]
    }))
    .unwrap();
    let table = CompareTable::build(&payload, &ids(&["exp-a"]));
    match table.rows[0].cell("exp-a") {
        RunCell::Output { output, .. } => assert_eq!(output, &json!("a")),
        other => panic!("expected output cell, got {other:?}"),
    }
}

#[test]
fn test_empty_payload_gives_empty_table() {
    let payload = CompareExperimentsPayload::from_json(r#"{"comparisons": []}"#).unwrap();
    let table = CompareTable::build(&payload, &ids(&["exp-a"]));
    assert!(table.is_empty());
    assert_eq!(table.columns.len(), 3);
}
