use std::path::Path;

use csv_async::AsyncReaderBuilder;
use futures::StreamExt;
use futures::io::AsyncRead;
use tokio::fs::File;
use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::debug;

use super::error::IoError;
use super::parse::RecordLayout;
use crate::store::MemoryStore;

/// Load every CSV row from `reader` into `store`, returning the row count
///
/// Rows are parsed in full before any is stored, so a bad row leaves the
/// store untouched. Rows with a key already present replace the stored record.
pub async fn load_records<R>(reader: R, store: &MemoryStore) -> Result<usize, IoError>
where
    R: AsyncRead + Unpin + Send,
{
    let mut csv_reader = AsyncReaderBuilder::new()
        .trim(csv_async::Trim::All)
        .flexible(true)
        .create_reader(reader);

    let layout = RecordLayout::from_headers(csv_reader.headers().await?)?;

    let mut parsed = Vec::new();
    let mut rows = csv_reader.records();
    while let Some(row) = rows.next().await {
        parsed.push(layout.parse(&row?)?);
    }

    let loaded = parsed.len();
    store.put_multi(parsed);
    debug!(loaded, "Loaded records");
    Ok(loaded)
}

/// Open `path` and load it with [`load_records`]
pub async fn load_file(path: impl AsRef<Path>, store: &MemoryStore) -> Result<usize, IoError> {
    let file = File::open(path.as_ref()).await?;
    load_records(file.compat(), store).await
}
