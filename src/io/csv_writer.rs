use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::error::IoError;
use crate::domain::{DynamicRecord, Entity, Value};

/// Writes hydrated records as CSV: `key,<field...>`
///
/// Columns come from the first non-empty chunk when no field list is given.
pub struct RecordWriter<W> {
    writer: W,
    fields: Vec<String>,
    header_written: bool,
}

impl<W> RecordWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W, fields: Vec<String>) -> Self {
        Self {
            writer,
            fields,
            header_written: false,
        }
    }

    /// Append one chunk of records
    pub async fn write_chunk(&mut self, records: &[DynamicRecord]) -> Result<(), IoError> {
        let Some(first) = records.first() else {
            return Ok(());
        };

        let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        if !self.header_written {
            if self.fields.is_empty() {
                self.fields = first.fields().to_vec();
            }
            csv_writer.write_field("key")?;
            csv_writer.write_record(&self.fields)?;
            self.header_written = true;
        }

        for record in records {
            let mut row = Vec::with_capacity(self.fields.len() + 1);
            row.push(Value::Text(record.key().to_string()));
            row.extend(
                self.fields
                    .iter()
                    .map(|field| record.get(field).cloned().unwrap_or(Value::Null)),
            );
            csv_writer.serialize(row)?;
        }

        let bytes = csv_writer
            .into_inner()
            .map_err(|err| IoError::Io(err.into_error()))?;
        self.writer.write_all(&bytes).await?;
        Ok(())
    }

    /// Flush and hand back the underlying writer
    pub async fn finish(mut self) -> Result<W, IoError> {
        self.writer.flush().await?;
        Ok(self.writer)
    }
}

/// Write one batch of records with a header
pub async fn write_records<W>(
    records: &[DynamicRecord],
    fields: Vec<String>,
    writer: W,
) -> Result<W, IoError>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut out = RecordWriter::new(writer, fields);
    out.write_chunk(records).await?;
    out.finish().await
}
