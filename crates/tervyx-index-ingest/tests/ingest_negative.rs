// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::path::Path;

use tervyx_index_ingest::{
    ingest_entries, merge_shard_indexes, read_citations, read_index, read_index_meta,
    ArtifactParser, IndexFormat, IngestError, IngestOptions, ShardSpec, SkipReason,
};
use tempfile::tempdir;

const VALID_SIMULATION: &str = r#"{"seed": 1, "n_draws": 500, "P_effect_gt_delta": 0.9, "mu_hat": 0.2, "mu_CI95": [0.1, 0.3], "I2": 0.1, "tau2": 0.01}"#;

fn write_entry(root: &Path, rel: &str, entry: &str, simulation: Option<&str>) {
    let dir = root.join(rel);
    fs::create_dir_all(&dir).expect("mkdir");
    fs::write(dir.join("entry.jsonld"), entry).expect("entry");
    if let Some(sim) = simulation {
        fs::write(dir.join("simulation.json"), sim).expect("simulation");
    }
}

fn entry_json(id: &str, tier: &str, label: &str) -> String {
    format!(
        r#"{{"@id": "tervyx:entry:{id}", "tier": "{tier}", "label": "{label}", "gate_results": {{"phi": "PASS", "r": "PASS", "j": 0.5, "k": "PASS", "l": "PASS"}}, "policy_fingerprint": "sha256:abc"}}"#
    )
}

#[test]
fn string_citation_years_are_kept() {
    let dir = tempdir().expect("tmp");
    let path = dir.path().join("citations.json");
    fs::write(
        &path,
        r#"{"studies": [
            {"doi": "10.1/a", "year": 2021},
            {"doi": "10.1/b", "year": "2023"},
            {"doi": "", "year": "unknown"},
            {"doi": "10.1/c"}
        ]}"#,
    )
    .expect("citations");

    let summary = read_citations(&path).expect("parse").expect("present");
    assert_eq!(summary.n_studies, 4);
    assert_eq!(summary.years, vec![2021, 2023]);
    assert_eq!(summary.dois, vec!["10.1/a", "10.1/b", "10.1/c"]);
}

#[test]
fn malformed_primary_rejects_directory_even_with_valid_simulation() {
    let root = tempdir().expect("tmp");
    write_entry(root.path(), "a/b/c", "{not json", Some(VALID_SIMULATION));

    let parser = ArtifactParser::new(root.path());
    let err = parser
        .parse_dir(&root.path().join("a/b/c"))
        .expect_err("malformed primary must be rejected");
    assert!(matches!(err, SkipReason::Malformed { .. }), "unexpected: {err}");

    let opts = IngestOptions {
        root: root.path().to_path_buf(),
        output: root.path().join("out/index.jsonl"),
        ..IngestOptions::default()
    };
    let err = ingest_entries(&opts).expect_err("zero records must fail");
    assert_eq!(
        err,
        IngestError::NoValidRecords {
            shard_index: 0,
            shard_count: 1
        }
    );
    assert!(!opts.output.exists());
}

#[test]
fn missing_required_fields_are_reported_by_name() {
    let root = tempdir().expect("tmp");
    write_entry(
        root.path(),
        "x/no-tier",
        r#"{"@id": "tervyx:entry:x/no-tier", "label": "PASS", "gate_results": {}}"#,
        None,
    );
    write_entry(
        root.path(),
        "x/no-gates",
        r#"{"@id": "tervyx:entry:x/no-gates", "tier": "gold", "label": "PASS"}"#,
        None,
    );
    write_entry(
        root.path(),
        "x/bad-tier",
        r#"{"@id": "tervyx:entry:x/bad-tier", "tier": "platinum", "label": "PASS", "gate_results": {}}"#,
        None,
    );

    let parser = ArtifactParser::new(root.path());
    assert_eq!(
        parser.parse_dir(&root.path().join("x/no-tier")),
        Err(SkipReason::MissingField { field: "tier" })
    );
    assert_eq!(
        parser.parse_dir(&root.path().join("x/no-gates")),
        Err(SkipReason::MissingField {
            field: "gate_results"
        })
    );
    let err = parser
        .parse_dir(&root.path().join("x/bad-tier"))
        .expect_err("unknown tier");
    assert_eq!(err.code(), "invalid_field");
}

#[test]
fn malformed_simulation_only_blanks_simulation_columns() {
    let root = tempdir().expect("tmp");
    write_entry(
        root.path(),
        "n/zinc/cold",
        &entry_json("n/zinc/cold", "gold", "PASS"),
        Some("[1, 2"),
    );
    let record = ArtifactParser::new(root.path())
        .parse_dir(&root.path().join("n/zinc/cold"))
        .expect("primary is valid");
    assert_eq!(record.id, "n/zinc/cold");
    assert!(record.simulation.is_none());
}

#[test]
fn simulation_without_draw_count_uses_default() {
    let root = tempdir().expect("tmp");
    write_entry(
        root.path(),
        "n/iron/fatigue",
        &entry_json("n/iron/fatigue", "silver", "PASS"),
        Some(r#"{"P_effect_gt_delta": 0.7, "mu_CI95": [0.1]}"#),
    );
    let record = ArtifactParser::new(root.path())
        .parse_dir(&root.path().join("n/iron/fatigue"))
        .expect("record");
    let sim = record.simulation.expect("simulation present");
    assert_eq!(sim.n_draws, Some(10_000));
    assert_eq!(sim.mu_ci95_lower, None);
    assert_eq!(sim.mu_ci95_upper, None);
}

#[test]
fn missing_root_fails_before_any_output() {
    let tmp = tempdir().expect("tmp");
    let opts = IngestOptions {
        root: tmp.path().join("absent"),
        output: tmp.path().join("index.jsonl"),
        ..IngestOptions::default()
    };
    let err = ingest_entries(&opts).expect_err("missing root");
    assert_eq!(err, IngestError::MissingRoot(tmp.path().join("absent")));
}

#[test]
fn empty_root_reports_no_entries() {
    let tmp = tempdir().expect("tmp");
    let opts = IngestOptions {
        root: tmp.path().to_path_buf(),
        output: tmp.path().join("index.jsonl"),
        ..IngestOptions::default()
    };
    assert!(matches!(
        ingest_entries(&opts),
        Err(IngestError::NoEntriesFound(_))
    ));
}

#[test]
fn invalid_shard_parameters_are_rejected() {
    assert!(matches!(
        ShardSpec::new(2, 2),
        Err(IngestError::InvalidShard { index: 2, count: 2 })
    ));
    let err = ShardSpec::new(0, 0).expect_err("zero shards");
    assert!(err.to_string().contains("shard_count=0"));
}

#[test]
fn merge_concatenates_shards_in_input_order() {
    let root = tempdir().expect("tmp");
    for (i, id) in ["a/one", "b/two", "c/three", "d/four"].iter().enumerate() {
        let tier = if i % 2 == 0 { "gold" } else { "bronze" };
        let label = if i % 2 == 0 { "PASS" } else { "AMBER" };
        write_entry(root.path(), id, &entry_json(id, tier, label), Some(VALID_SIMULATION));
    }
    let mut shards = Vec::new();
    for index in 0..2 {
        let output = root.path().join(format!("shards/index_{index}.jsonl"));
        let opts = IngestOptions {
            root: root.path().to_path_buf(),
            output: output.clone(),
            shard: ShardSpec::new(index, 2).expect("shard"),
            ..IngestOptions::default()
        };
        ingest_entries(&opts).expect("shard ingest");
        shards.push(output);
    }

    let merged_path = root.path().join("merged.sqlite");
    let summary =
        merge_shard_indexes(&shards, &merged_path, IndexFormat::Sqlite).expect("merge");
    assert_eq!(summary.inputs, 2);
    assert_eq!(summary.rows, 4);

    let ids: Vec<String> = read_index(&merged_path)
        .expect("merged rows")
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["a/one", "c/three", "b/two", "d/four"]);

    let meta = read_index_meta(&merged_path).expect("merged meta");
    assert_eq!(meta.get("merged_from").map(String::as_str), Some("2"));
    assert_eq!(meta.get("row_count").map(String::as_str), Some("4"));
    assert!(!meta.contains_key("shard_index"));
}

#[test]
fn merge_rejects_foreign_column_set() {
    let tmp = tempdir().expect("tmp");
    let foreign = tmp.path().join("foreign.jsonl");
    fs::write(&foreign, "{\"id\": \"x\", \"score\": 1}\n").expect("write");
    let err = merge_shard_indexes(&[foreign], &tmp.path().join("merged.jsonl"), IndexFormat::Jsonl)
        .expect_err("column mismatch");
    match err {
        IngestError::ColumnMismatch {
            missing,
            unexpected,
            ..
        } => {
            assert!(missing.contains(&"tier".to_string()));
            assert_eq!(unexpected, vec!["score".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn merge_without_inputs_fails() {
    let tmp = tempdir().expect("tmp");
    assert_eq!(
        merge_shard_indexes(&[], &tmp.path().join("m.jsonl"), IndexFormat::Jsonl),
        Err(IngestError::NoInputs)
    );
}
