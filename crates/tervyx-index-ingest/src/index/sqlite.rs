// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, Connection, OpenFlags, Row};
use tervyx_index_model::{GateVerdict, IndexRow, JGate, Label, Tier, INDEX_COLUMNS, INDEX_SCHEMA_VERSION};

use super::{check_columns, IndexProvenance};
use crate::IngestError;

const CREATE_SCHEMA: &str = "
    PRAGMA journal_mode=OFF;
    PRAGMA synchronous=OFF;
    PRAGMA temp_store=MEMORY;
    CREATE TABLE entry_index (
      row_id INTEGER PRIMARY KEY,
      id TEXT NOT NULL,
      entry_path TEXT NOT NULL,
      tier TEXT NOT NULL,
      label TEXT NOT NULL,
      gate_phi TEXT,
      gate_r TEXT,
      gate_j,
      gate_k TEXT,
      gate_l TEXT,
      policy_fingerprint TEXT,
      tel5_version TEXT,
      mc_version TEXT,
      journal_snapshot TEXT,
      intervention_type TEXT,
      seed INTEGER,
      n_draws INTEGER,
      P_effect_gt_delta REAL,
      mu_hat REAL,
      mu_CI95_lower REAL,
      mu_CI95_upper REAL,
      I2 REAL,
      tau2 REAL,
      n_studies INTEGER,
      dois TEXT,
      years TEXT
    );
    CREATE TABLE index_meta (
      k TEXT PRIMARY KEY,
      v TEXT NOT NULL
    ) WITHOUT ROWID;
";

fn sql_err(e: rusqlite::Error) -> IngestError {
    IngestError::Io(format!("sqlite: {e}"))
}

pub(super) fn write_sqlite(
    path: &Path,
    rows: &[IndexRow],
    provenance: IndexProvenance,
) -> Result<(), IngestError> {
    let mut conn = Connection::open(path).map_err(sql_err)?;
    conn.execute_batch(CREATE_SCHEMA).map_err(sql_err)?;
    conn.execute_batch(&format!("PRAGMA user_version={INDEX_SCHEMA_VERSION};"))
        .map_err(sql_err)?;

    let tx = conn.transaction().map_err(sql_err)?;
    {
        let placeholders = (1..=INDEX_COLUMNS.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO entry_index ({}) VALUES ({placeholders})",
            INDEX_COLUMNS.join(", ")
        );
        let mut stmt = tx.prepare(&sql).map_err(sql_err)?;
        for row in rows {
            let dois = encode_list(row.dois.as_ref())?;
            let years = encode_list(row.years.as_ref())?;
            stmt.execute(params![
                row.id,
                row.entry_path,
                row.tier.as_str(),
                row.label.as_str(),
                row.gate_phi.map(GateVerdict::as_str),
                row.gate_r.map(GateVerdict::as_str),
                j_gate_to_sql(row.gate_j),
                row.gate_k.map(GateVerdict::as_str),
                row.gate_l.map(GateVerdict::as_str),
                row.policy_fingerprint,
                row.tel5_version,
                row.mc_version,
                row.journal_snapshot,
                row.intervention_type,
                row.seed,
                row.n_draws.map(|n| n as i64),
                row.p_effect_gt_delta,
                row.mu_hat,
                row.mu_ci95_lower,
                row.mu_ci95_upper,
                row.i2,
                row.tau2,
                row.n_studies.map(|n| n as i64),
                dois,
                years,
            ])
            .map_err(sql_err)?;
        }
        let mut meta = tx
            .prepare("INSERT INTO index_meta (k, v) VALUES (?1, ?2)")
            .map_err(sql_err)?;
        meta.execute(params!["schema_version", INDEX_SCHEMA_VERSION.to_string()])
            .map_err(sql_err)?;
        meta.execute(params!["row_count", rows.len().to_string()])
            .map_err(sql_err)?;
        for (key, value) in provenance.meta_entries() {
            meta.execute(params![key, value]).map_err(sql_err)?;
        }
    }
    tx.commit().map_err(sql_err)?;
    conn.close().map_err(|(_, e)| sql_err(e))
}

pub(super) fn read_sqlite(path: &Path) -> Result<Vec<IndexRow>, IngestError> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(sql_err)?;

    let mut info = conn
        .prepare("SELECT name FROM pragma_table_info('entry_index') WHERE name != 'row_id'")
        .map_err(sql_err)?;
    let columns = info
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(sql_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(sql_err)?;
    check_columns(path, columns.iter().map(String::as_str))?;

    let sql = format!(
        "SELECT {} FROM entry_index ORDER BY row_id",
        INDEX_COLUMNS.join(", ")
    );
    let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
    let mut rows = stmt.query([]).map_err(sql_err)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(sql_err)? {
        let position = out.len() + 1;
        let decoded = decode_row(row).map_err(|message| IngestError::Decode {
            path: path.to_path_buf(),
            row: position,
            message,
        })?;
        out.push(decoded);
    }
    Ok(out)
}

pub(super) fn read_sqlite_meta(path: &Path) -> Result<BTreeMap<String, String>, IngestError> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(sql_err)?;
    let mut stmt = conn.prepare("SELECT k, v FROM index_meta").map_err(sql_err)?;
    let entries = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(sql_err)?
        .collect::<Result<BTreeMap<_, _>, _>>()
        .map_err(sql_err)?;
    Ok(entries)
}

fn decode_row(row: &Row<'_>) -> Result<IndexRow, String> {
    let text = |i: usize| row.get::<_, Option<String>>(i).map_err(|e| e.to_string());
    let real = |i: usize| row.get::<_, Option<f64>>(i).map_err(|e| e.to_string());
    let int = |i: usize| row.get::<_, Option<i64>>(i).map_err(|e| e.to_string());
    let verdict = |i: usize| -> Result<Option<GateVerdict>, String> {
        text(i)?
            .map(|v| GateVerdict::parse(&v).map_err(|e| e.0))
            .transpose()
    };

    let id = text(0)?.ok_or("id is null")?;
    let entry_path = text(1)?.ok_or("entry_path is null")?;
    let tier = Tier::parse(&text(2)?.ok_or("tier is null")?).map_err(|e| e.0)?;
    let label = Label::parse(&text(3)?.ok_or("label is null")?).map_err(|e| e.0)?;
    let gate_j = match row.get_ref(6).map_err(|e| e.to_string())? {
        ValueRef::Null => None,
        ValueRef::Real(score) => Some(JGate::Score(score)),
        ValueRef::Integer(score) => Some(JGate::Score(score as f64)),
        ValueRef::Text(raw) => Some(
            JGate::parse_sentinel(&String::from_utf8_lossy(raw)).map_err(|e| e.0)?,
        ),
        ValueRef::Blob(_) => return Err("gate_j is a blob".to_string()),
    };

    Ok(IndexRow {
        id,
        entry_path,
        tier,
        label,
        gate_phi: verdict(4)?,
        gate_r: verdict(5)?,
        gate_j,
        gate_k: verdict(7)?,
        gate_l: verdict(8)?,
        policy_fingerprint: text(9)?,
        tel5_version: text(10)?,
        mc_version: text(11)?,
        journal_snapshot: text(12)?,
        intervention_type: text(13)?,
        seed: int(14)?,
        n_draws: int(15)?.map(|n| n as u64),
        p_effect_gt_delta: real(16)?,
        mu_hat: real(17)?,
        mu_ci95_lower: real(18)?,
        mu_ci95_upper: real(19)?,
        i2: real(20)?,
        tau2: real(21)?,
        n_studies: int(22)?.map(|n| n as u64),
        dois: decode_list(text(23)?)?,
        years: decode_list(text(24)?)?,
    })
}

fn j_gate_to_sql(gate: Option<JGate>) -> SqlValue {
    match gate {
        None => SqlValue::Null,
        Some(JGate::Score(score)) => SqlValue::Real(score),
        Some(JGate::Black) => SqlValue::Text(tervyx_index_model::J_GATE_BLACK.to_string()),
    }
}

fn encode_list<T: serde::Serialize>(items: Option<&Vec<T>>) -> Result<Option<String>, IngestError> {
    items
        .map(|v| serde_json::to_string(v).map_err(|e| IngestError::Encode(e.to_string())))
        .transpose()
}

fn decode_list<T: serde::de::DeserializeOwned>(raw: Option<String>) -> Result<Option<Vec<T>>, String> {
    raw.map(|s| serde_json::from_str(&s).map_err(|e| e.to_string()))
        .transpose()
}
