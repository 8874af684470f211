//! Append-only tabular destinations for projected rows.
//!
//! [`RowSink`] is the seam the bulk writer talks to. [`bigquery::BigQuerySink`]
//! is the production sink; [`csv::CsvSink`] writes local files for dry runs.

pub mod bigquery;
pub mod csv;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fully qualified `project.dataset.table` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableId {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableId {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("expected a table id of the form project.dataset.table, got {0:?}")]
pub struct InvalidTableId(pub String);

impl FromStr for TableId {
    type Err = InvalidTableId;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            [project, dataset, table]
                if !project.is_empty() && !dataset.is_empty() && !table.is_empty() =>
            {
                Ok(TableId::new(*project, *dataset, *table))
            }
            _ => Err(InvalidTableId(s.to_string())),
        }
    }
}

/// A row the sink refused, with the sink's reasons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertError {
    /// Position of the row within the submitted chunk.
    pub index: usize,
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<String>,
}

/// Destination that accepts one chunk of JSON rows per call.
#[async_trait::async_trait]
pub trait RowSink: Send + Sync {
    /// Inserts `rows` into `table`.
    ///
    /// `Ok` carries per-row rejections (empty = every row accepted); `Err`
    /// means the call itself failed and nothing can be assumed about the chunk.
    async fn insert_all(
        &self,
        table: &TableId,
        rows: &[serde_json::Value],
    ) -> Result<Vec<InsertError>>;
}
