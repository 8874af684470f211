//! Local CSV sink for dry runs and inspection.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use csv::WriterBuilder;
use serde_json::Value;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{InsertError, RowSink, TableId};

/// Appends rows to `<dir>/<table id>.csv`, one file per table.
///
/// Columns are the row's field names in the order the JSON object yields
/// them; the header is written only when the file is created.
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, table: &TableId) -> PathBuf {
        self.dir.join(format!("{table}.csv"))
    }
}

#[async_trait]
impl RowSink for CsvSink {
    async fn insert_all(&self, table: &TableId, rows: &[Value]) -> Result<Vec<InsertError>> {
        let path = self.path_for(table);
        let target = path.clone();
        let rows = rows.to_vec();

        tokio::task::spawn_blocking(move || append_rows(&target, &rows))
            .await
            .context("csv writer task failed")?
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(Vec::new())
    }
}

fn append_rows(path: &Path, rows: &[Value]) -> Result<()> {
    let Some(first) = rows.first() else {
        return Ok(());
    };
    let Value::Object(first) = first else {
        bail!("csv rows must be JSON objects");
    };
    let columns: Vec<&String> = first.keys().collect();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, rows = rows.len(), "Appending CSV rows");

    let file = OpenOptions::new().append(true).create(true).open(path)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

    if !file_exists {
        writer.write_record(&columns)?;
    }

    for row in rows {
        let Value::Object(fields) = row else {
            bail!("csv rows must be JSON objects");
        };
        writer.write_record(columns.iter().map(|c| cell(fields.get(c.as_str()))))?;
    }
    writer.flush()?;

    Ok(())
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
