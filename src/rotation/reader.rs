use std::sync::atomic::Ordering;

use crate::{
    catalog::{Session, PAGE_SIZE},
    error::CatalogResult,
    metrics::METRICS,
    schema::{CollectionId, ItemId},
};

/// Reads every live item of a collection, in catalog order.
///
/// PAGINATION:
/// - Fixed page size (`PAGE_SIZE`)
/// - The total reported by the FIRST page bounds the loop; later
///   pages are not allowed to move it. If the collection shrinks
///   mid-read we still issue the originally planned requests and
///   stop once offset >= first-seen total.
///
/// TOMBSTONES:
/// - Entries without an item are dropped, never retried.
///
/// FAILURE:
/// - Any failed page aborts the whole read. No partial result is
///   returned; the caller decides whether to degrade or abort.
pub async fn read_all(
    session: &Session<'_>,
    collection: &CollectionId,
) -> CatalogResult<Vec<ItemId>> {
    log::info!("Getting all tracks from playlist: {collection}");

    match read_pages(session, collection).await {
        Ok(items) => {
            log::info!("Found {} valid tracks in playlist {collection}", items.len());
            Ok(items)
        }
        Err(e) => {
            METRICS.read_failures.fetch_add(1, Ordering::Relaxed);
            log::error!("Error getting tracks from playlist {collection}: {e}");
            Err(e)
        }
    }
}

async fn read_pages(
    session: &Session<'_>,
    collection: &CollectionId,
) -> CatalogResult<Vec<ItemId>> {
    let mut items = Vec::new();
    let mut offset = 0;
    let mut total: Option<usize> = None;

    while total.is_none_or(|t| offset < t) {
        let page = session.list_items(collection, PAGE_SIZE, offset).await?;
        METRICS.pages_read.fetch_add(1, Ordering::Relaxed);

        let expected = *total.get_or_insert_with(|| {
            log::info!("Playlist {collection} has {} total tracks", page.total);
            page.total
        });

        log::info!(
            "Got batch of {} tracks (offset {offset}/{expected})",
            page.items.len()
        );

        let before = items.len();
        let received = page.items.len();
        items.extend(page.items.into_iter().flatten());

        let tombstones = received - (items.len() - before);
        if tombstones > 0 {
            METRICS.tombstones_dropped.fetch_add(tombstones, Ordering::Relaxed);
            log::debug!("Dropped {tombstones} unavailable entries at offset {offset}");
        }

        offset += PAGE_SIZE;
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::memory::{numbered, Call, MemoryCatalog};
    use crate::error::CatalogError;
    use crate::schema::AccessToken;

    fn list_offsets(catalog: &MemoryCatalog) -> Vec<usize> {
        catalog
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::List { offset, limit, .. } => {
                    assert_eq!(limit, PAGE_SIZE);
                    Some(offset)
                }
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn pages_until_first_reported_total() {
        let catalog = MemoryCatalog::new().with_collection("src", numbered("t", 237));
        let session = Session::new(&catalog, AccessToken::new("t"));

        let items = read_all(&session, &CollectionId::new("src")).await.unwrap();

        assert_eq!(items.len(), 237);
        assert_eq!(items, numbered("t", 237));
        assert_eq!(list_offsets(&catalog), vec![0, 100, 200]);
    }

    #[tokio::test]
    async fn tombstones_are_dropped_silently() {
        let mut entries: Vec<Option<ItemId>> = numbered("t", 237).into_iter().map(Some).collect();
        entries[5] = None;
        entries[150] = None;
        let catalog = MemoryCatalog::new().with_entries("src", entries);
        let session = Session::new(&catalog, AccessToken::new("t"));

        let items = read_all(&session, &CollectionId::new("src")).await.unwrap();

        assert_eq!(items.len(), 235);
        assert!(!items.contains(&ItemId::new("t5")));
        assert_eq!(list_offsets(&catalog), vec![0, 100, 200]);
    }

    #[tokio::test]
    async fn shrinking_collection_keeps_planned_request_count() {
        let catalog = MemoryCatalog::new()
            .with_collection("src", numbered("t", 237))
            .shrinking_after_first_page("src", 50);
        let session = Session::new(&catalog, AccessToken::new("t"));

        let items = read_all(&session, &CollectionId::new("src")).await.unwrap();

        assert_eq!(items.len(), 100);
        assert_eq!(list_offsets(&catalog), vec![0, 100, 200]);
    }

    #[tokio::test]
    async fn empty_collection_needs_one_request() {
        let catalog = MemoryCatalog::new().with_collection("src", vec![]);
        let session = Session::new(&catalog, AccessToken::new("t"));

        let items = read_all(&session, &CollectionId::new("src")).await.unwrap();

        assert!(items.is_empty());
        assert_eq!(list_offsets(&catalog), vec![0]);
    }

    #[tokio::test]
    async fn failure_on_a_later_page_discards_everything() {
        let catalog = MemoryCatalog::new()
            .with_collection("src", numbered("t", 237))
            .failing_reads_from("src", 200);
        let session = Session::new(&catalog, AccessToken::new("t"));

        let result = read_all(&session, &CollectionId::new("src")).await;

        assert!(matches!(result, Err(CatalogError::RateLimited { .. })));
        assert_eq!(list_offsets(&catalog), vec![0, 100, 200]);
    }

    #[tokio::test]
    async fn repeated_reads_are_identical() {
        let catalog = MemoryCatalog::new().with_collection("src", numbered("t", 150));
        let session = Session::new(&catalog, AccessToken::new("t"));
        let id = CollectionId::new("src");

        let first = read_all(&session, &id).await.unwrap();
        let second = read_all(&session, &id).await.unwrap();

        assert_eq!(first, second);
    }
}
