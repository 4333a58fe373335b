// SPDX-License-Identifier: Apache-2.0

use std::fs;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tervyx_index_ingest::{ingest_entries, IndexFormat, IngestOptions};
use tempfile::tempdir;

fn seed_entries(root: &std::path::Path, n: usize) {
    for i in 0..n {
        let dir = root.join(format!("category-{}/intervention-{i:04}/outcome", i % 7));
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(
            dir.join("entry.jsonld"),
            format!(
                r#"{{"@id": "tervyx:entry:bench/{i}", "tier": "silver", "label": "PASS", "gate_results": {{"phi": "PASS", "r": "PASS", "j": 0.6, "k": "PASS", "l": "PASS"}}, "policy_fingerprint": "sha256:bench"}}"#
            ),
        )
        .expect("entry");
        fs::write(
            dir.join("simulation.json"),
            r#"{"seed": 1, "n_draws": 10000, "P_effect_gt_delta": 0.8, "mu_hat": 0.2, "mu_CI95": [0.1, 0.3], "I2": 0.2, "tau2": 0.01}"#,
        )
        .expect("simulation");
    }
}

fn bench_parse_entries(c: &mut Criterion) {
    let root = tempdir().expect("tempdir");
    seed_entries(root.path(), 500);
    let mut group = c.benchmark_group("ingest_entries");
    for format in [IndexFormat::Jsonl, IndexFormat::Sqlite] {
        group.bench_function(format.as_str(), |b| {
            b.iter(|| {
                let out = tempdir().expect("out");
                let opts = IngestOptions {
                    root: root.path().to_path_buf(),
                    output: out.path().join("index"),
                    format,
                    progress_interval: 1_000,
                    ..IngestOptions::default()
                };
                black_box(ingest_entries(&opts).expect("ingest"));
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse_entries);
criterion_main!(benches);
