use rand::Rng;

use crate::{
    catalog::Session,
    error::CatalogResult,
    schema::{CollectionId, ItemId},
};

use super::reader::read_all;

/// Picks `count` items uniformly at random, without replacement.
///
/// Works on a copy: the input is never reordered. When the input
/// holds fewer than `count` items the whole (shuffled) input comes
/// back, with no padding and no repetition.
pub fn sample<R>(items: &[ItemId], count: usize, rng: &mut R) -> Vec<ItemId>
where
    R: Rng + ?Sized,
{
    let mut shuffled = items.to_vec();

    // Fisher-Yates, last index down to 1
    for i in (1..shuffled.len()).rev() {
        let j = rng.random_range(0..=i);
        shuffled.swap(i, j);
    }

    shuffled.truncate(count.min(items.len()));
    shuffled
}

/// Reads a collection in full and samples from the snapshot.
///
/// A failed read is returned as-is; the orchestrator decides whether
/// that means "sample nothing" or "stop the run".
pub async fn sample_collection<R>(
    session: &Session<'_>,
    collection: &CollectionId,
    count: usize,
    rng: &mut R,
) -> CatalogResult<Vec<ItemId>>
where
    R: Rng + ?Sized,
{
    log::info!("Getting random tracks from playlist: {collection}");

    let snapshot = read_all(session, collection).await?;
    let selected = sample(&snapshot, count, rng);

    log::info!("Selected {} random tracks", selected.len());
    Ok(selected)
}
