//! Chunked, sequential bulk writes with fail-fast on the first rejected chunk.

use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::WriteError;
use crate::sink::{RowSink, TableId};

/// Rows per insert call; keeps requests under the sink's payload ceiling.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

pub struct BulkWriter<S> {
    sink: S,
}

impl<S: RowSink> BulkWriter<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Writes `rows` to `table` in contiguous chunks of at most `chunk_size`,
    /// one chunk at a time, and returns the number of rows written.
    ///
    /// Empty input is a no-op that never touches the sink. The first chunk
    /// with any rejected row (or a failed call) stops the write; earlier
    /// chunks are already committed and are reported in
    /// [`WriteError::committed`]. A `chunk_size` of 0 is treated as 1.
    #[tracing::instrument(skip(self, rows), fields(table = %table, rows = rows.len()))]
    pub async fn write<R: Serialize + Sync>(
        &self,
        table: &TableId,
        rows: &[R],
        chunk_size: usize,
    ) -> Result<usize, WriteError> {
        if rows.is_empty() {
            debug!("No rows to write");
            return Ok(0);
        }

        let chunk_size = chunk_size.max(1);
        let mut committed = 0;

        for (n, chunk) in rows.chunks(chunk_size).enumerate() {
            let start = n * chunk_size;
            let end = start + chunk.len();
            let fail = |detail: String| WriteError {
                table: table.to_string(),
                start,
                end,
                committed,
                detail,
            };

            let values = chunk
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| fail(format!("row serialization failed: {e}")))?;

            let insert_errors = match self.sink.insert_all(table, &values).await {
                Ok(insert_errors) => insert_errors,
                Err(e) => {
                    error!(start, end, committed, error = %e, "Insert call failed, aborting write");
                    return Err(fail(format!("{e:#}")));
                }
            };

            if !insert_errors.is_empty() {
                error!(
                    start,
                    end,
                    committed,
                    rejected = insert_errors.len(),
                    "Sink rejected rows, aborting write"
                );
                let detail = serde_json::to_string(&insert_errors)
                    .unwrap_or_else(|_| format!("{insert_errors:?}"));
                return Err(fail(detail));
            }

            committed += chunk.len();
            debug!(start, end, committed, "Chunk written");
        }

        info!(written = committed, "Rows written");
        Ok(committed)
    }
}
