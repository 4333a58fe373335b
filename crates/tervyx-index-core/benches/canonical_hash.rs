// SPDX-License-Identifier: Apache-2.0

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use tervyx_index_core::canonical;

fn bench_policy_fingerprint_input(c: &mut Criterion) {
    let payload = json!({
        "tel5_levels": {
            "version": "1.2.0",
            "thresholds": {"gold": 0.80, "silver": 0.60, "bronze": 0.40, "red": 0.20}
        },
        "monte_carlo": {"version": "1.0.1-reml-grid", "n_draws": 10000, "seed": null},
        "journal_trust": {
            "snapshot_date": "2025-10-05",
            "sources": ["bealls_list", "retraction_watch"]
        }
    });

    c.bench_function("stable_json_bytes", |b| {
        b.iter(|| canonical::stable_json_bytes(black_box(&payload)).expect("stable json"))
    });
    c.bench_function("stable_json_hash_hex", |b| {
        b.iter(|| canonical::stable_json_hash_hex(black_box(&payload)).expect("stable hash"))
    });
}

criterion_group!(benches, bench_policy_fingerprint_input);
criterion_main!(benches);
