use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::time::sleep;

use crate::{
    catalog::{Session, CHUNK_SIZE},
    error::{MutationError, MutationOp},
    metrics::METRICS,
    schema::{CollectionId, ItemId},
    util,
};

/// Appends `items` to `collection`, preserving their order.
pub async fn add_all(
    session: &Session<'_>,
    collection: &CollectionId,
    items: &[ItemId],
    pacing: Duration,
) -> Result<(), MutationError> {
    apply_chunked(session, collection, items, pacing, MutationOp::Add).await
}

/// Removes `items` from `collection`.
pub async fn remove_all(
    session: &Session<'_>,
    collection: &CollectionId,
    items: &[ItemId],
    pacing: Duration,
) -> Result<(), MutationError> {
    apply_chunked(session, collection, items, pacing, MutationOp::Remove).await
}

/// Sends one request per chunk of at most `CHUNK_SIZE` items.
///
/// GUARANTEES:
/// - Chunks go out strictly one after another, in input order
/// - `pacing` is waited between chunks, never after the last one
/// - Empty input sends nothing
///
/// FAILURE:
/// - The first failing chunk stops the call
/// - Chunks that already landed stay applied (no compensation)
async fn apply_chunked(
    session: &Session<'_>,
    collection: &CollectionId,
    items: &[ItemId],
    pacing: Duration,
    op: MutationOp,
) -> Result<(), MutationError> {
    let total = items.len();

    for (index, chunk) in items.chunks(CHUNK_SIZE).enumerate() {
        let start = index * CHUNK_SIZE;
        let range = util::batch_range(start, chunk.len(), total);

        let result = match op {
            MutationOp::Add => {
                log::info!("Adding batch of {} tracks ({range})", chunk.len());
                session.add_items(collection, chunk).await
            }
            MutationOp::Remove => {
                log::info!("Removing batch of {} tracks ({range})", chunk.len());
                session.remove_items(collection, chunk).await
            }
        };

        if let Err(source) = result {
            log::error!("Batch {range} failed on playlist {collection}: {source}");
            return Err(MutationError {
                op,
                collection: collection.clone(),
                chunk: index,
                applied: start,
                source,
            });
        }

        METRICS.chunks_applied.fetch_add(1, Ordering::Relaxed);
        let counter = match op {
            MutationOp::Add => &METRICS.items_added,
            MutationOp::Remove => &METRICS.items_removed,
        };
        counter.fetch_add(chunk.len(), Ordering::Relaxed);

        // Small delay to stay under the rate limit
        if start + chunk.len() < total {
            sleep(pacing).await;
        }
    }

    Ok(())
}
