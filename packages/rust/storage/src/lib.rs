//! libSQL access to the structured side-effect table.
//!
//! The [`Storage`] struct wraps a local libSQL/SQLite database opened
//! read-only: the table is loaded once per question scope and validated
//! generated queries are executed against it. Any write fails at the
//! connection.
//!
//! **Normalization on read:**
//! - column names are trimmed and lower-cased
//! - `medication` is trimmed and lower-cased, `side_effect` trimmed
//! - rows with a blank medication or side effect are dropped

use std::path::Path;

use libsql::{Connection, Database, OpenFlags, Value, params};
use tracing::{debug, info, instrument};

use medsource_shared::{
    MEDICATION_COLUMN, MedSourceError, Result, SIDE_EFFECT_COLUMN, SideEffectRecord,
};

/// Read-only handle on the structured side-effect database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Storage {
    /// Open an existing database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MedSourceError::Storage(format!(
                "database not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .flags(OpenFlags::SQLITE_OPEN_READ_ONLY)
            .build()
            .await
            .map_err(|e| MedSourceError::Storage(format!("failed to open database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| MedSourceError::Storage(format!("failed to connect: {e}")))?;

        debug!(path = %path.display(), "opened database read-only");
        Ok(Self { db, conn })
    }

    /// Load every row of `table`.
    ///
    /// Fails with [`MedSourceError::Schema`] when the table lacks the
    /// `medication` or `side_effect` column.
    #[instrument(skip(self))]
    pub async fn load_side_effects(&self, table: &str) -> Result<Vec<SideEffectRecord>> {
        validate_identifier(table)?;

        let sql = format!("SELECT * FROM {table}");
        let (columns, records) = self.fetch_records(&sql, None).await?;
        require_columns(&columns).map_err(|missing| MedSourceError::Schema { missing })?;

        info!(table, rows = records.len(), "loaded structured side effects");
        Ok(records)
    }

    /// Execute a validated, read-only query and keep at most `limit` rows.
    ///
    /// A result set without the required columns is reported as
    /// [`MedSourceError::InvalidQuery`] so callers can fall back.
    pub async fn query_side_effects(
        &self,
        sql: &str,
        limit: usize,
    ) -> Result<Vec<SideEffectRecord>> {
        let (columns, records) = self.fetch_records(sql, Some(limit)).await?;
        require_columns(&columns).map_err(|missing| {
            MedSourceError::InvalidQuery(format!("query result lacks columns {missing:?}"))
        })?;

        debug!(rows = records.len(), "generated query executed");
        Ok(records)
    }

    /// Run `sql` and map rows to records. Returns the normalized column names too.
    async fn fetch_records(
        &self,
        sql: &str,
        limit: Option<usize>,
    ) -> Result<(Vec<String>, Vec<SideEffectRecord>)> {
        let mut rows = self
            .conn
            .query(sql, params![])
            .await
            .map_err(|e| MedSourceError::Storage(e.to_string()))?;

        let columns: Vec<String> = (0..rows.column_count())
            .map(|idx| {
                rows.column_name(idx)
                    .unwrap_or_default()
                    .trim()
                    .to_lowercase()
            })
            .collect();

        let mut records = Vec::new();
        let mut dropped = 0usize;

        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| MedSourceError::Storage(e.to_string()))?
        {
            if limit.is_some_and(|l| records.len() >= l) {
                break;
            }

            let mut values = Vec::with_capacity(columns.len());
            for (idx, name) in columns.iter().enumerate() {
                let value = row
                    .get_value(idx as i32)
                    .map_err(|e| MedSourceError::Storage(e.to_string()))?;
                values.push((name.as_str(), value_to_text(value)));
            }

            match SideEffectRecord::from_columns(values) {
                Some(record) => records.push(record),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            debug!(dropped, "dropped rows with blank medication or side effect");
        }

        Ok((columns, records))
    }
}

/// Render a SQLite value as text; NULL and BLOB values count as missing.
///
/// Whole reals keep their fractional digit (`54.0`, not `54`) so they stay
/// distinguishable from integer columns.
fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null | Value::Blob(_) => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) if f.is_finite() && f.fract() == 0.0 => Some(format!("{f:.1}")),
        Value::Real(f) => Some(f.to_string()),
        Value::Text(s) => Some(s),
    }
}

fn require_columns(columns: &[String]) -> std::result::Result<(), Vec<String>> {
    let missing: Vec<String> = [MEDICATION_COLUMN, SIDE_EFFECT_COLUMN]
        .into_iter()
        .filter(|required| !columns.iter().any(|c| c == required))
        .map(String::from)
        .collect();

    if missing.is_empty() { Ok(()) } else { Err(missing) }
}

/// Table names are interpolated into SQL, so only plain identifiers are allowed.
fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(MedSourceError::validation(format!(
            "invalid table name '{name}'"
        )))
    }
}
