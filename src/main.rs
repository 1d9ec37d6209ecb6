use std::sync::Arc;

use futures::StreamExt;
use keychunk::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args = match Args::parse(std::env::args().collect()) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    CliApp::new("keychunk")
        .run(|writer, cancel| stream_records(writer, args, cancel))
        .await
}

/// Load the CSV into an in-memory store and stream the query result to stdout
async fn stream_records(
    writer: tokio::io::BufWriter<tokio::io::Stdout>,
    args: Args,
    cancel: CancellationToken,
) -> Result<(), AppError> {
    let store = Arc::new(MemoryStore::new());
    load_file(&args.input, &store).await?;

    let stub_fields = args.fields.clone();
    let mut options = Options::new(move |_, key, _| vec![DynamicRecord::stub(key, &stub_fields)])
        .with_chunk_size(args.chunk_size)
        .tolerate_field_mismatch(args.tolerate);
    if let Some(ancestor) = args.ancestor.clone() {
        options = options.with_ancestor(ancestor);
    }

    let mut units = Pipeline::new(store, options)
        .with_cancellation(cancel)
        .stream(args.query());

    let mut out = RecordWriter::new(writer, args.fields.clone());
    let mut streamed = 0;
    while let Some(unit) = units.next().await {
        let records = unit?;
        streamed += records.len();
        out.write_chunk(&records).await?;
    }
    out.finish().await?;

    info!(streamed, "Done");
    Ok(())
}
