use super::worker::Fetcher;
use crate::server::telemetry::increment_urls_fetched;
use fanfetch_core::{Error, Result, types::Resource};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Fetches a validated batch in chunks of at most `num_workers` URLs.
///
/// Chunks are processed strictly in batch order. Within a chunk, every URL is
/// fetched by its own task, and the next chunk is only dispatched once all of
/// them have reported, so no more than `num_workers` fetches are ever in
/// flight for one batch.
///
/// # Arguments
///
/// - `urls`: The validated batch.
/// - `fetcher`: Shared fetch implementation handed to every worker task.
/// - `num_workers`: Worker budget; the chunk size.
/// - `cancel`: Batch-scoped token. Each chunk runs under a child token of it.
///
/// # Behavior
///
/// - On success, returns one [`Resource`] per URL, grouped by chunk and in
///   input order within each chunk.
/// - On the first failed fetch, cancels the remaining workers of that chunk,
///   waits for them to stop, and returns that failure. No further chunks are
///   dispatched and no partial results are returned.
pub async fn collect_chunks<F: Fetcher>(
    urls: Vec<String>,
    fetcher: Arc<F>,
    num_workers: usize,
    cancel: &CancellationToken,
) -> Result<Vec<Resource>> {
    let mut collected = Vec::with_capacity(urls.len());

    for (_index, chunk) in urls.chunks(num_workers.max(1)).enumerate() {
        if cancel.is_cancelled() {
            return Err(Error::RequestCancelled);
        }

        #[cfg(feature = "tracing")]
        tracing::trace!("Dispatching chunk {_index} ({} urls)", chunk.len());

        let resources = fetch_chunk(chunk, &fetcher, cancel.child_token()).await?;
        increment_urls_fetched(resources.len() as u64);
        collected.extend(resources);
    }

    Ok(collected)
}

/// Runs one chunk to completion: one task per URL, then a full drain.
async fn fetch_chunk<F: Fetcher>(
    chunk: &[String],
    fetcher: &Arc<F>,
    chunk_token: CancellationToken,
) -> Result<Vec<Resource>> {
    let mut tasks = JoinSet::new();

    for (slot, url) in chunk.iter().enumerate() {
        let fetcher = Arc::clone(fetcher);
        let url = url.clone();
        let token = chunk_token.clone();
        tasks.spawn(async move { (slot, fetcher.fetch(url, token).await) });
    }

    let mut slots: Vec<Option<Resource>> = vec![None; chunk.len()];

    while let Some(joined) = tasks.join_next().await {
        let failure = match joined {
            Ok((slot, Ok(resource))) => {
                slots[slot] = Some(resource);
                continue;
            }
            Ok((_, Err(err))) => err,
            Err(join_err) => Error::Internal {
                context: format!("fetch task failed: {join_err}"),
            },
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Aborting chunk after failure ({} fetches outstanding): {failure}",
            tasks.len()
        );

        // Signal the siblings, then abort and reap them so none of their I/O
        // outlives the batch.
        chunk_token.cancel();
        tasks.shutdown().await;
        return Err(failure);
    }

    Ok(slots.into_iter().flatten().collect())
}
