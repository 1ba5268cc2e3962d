use std::collections::HashSet;

use crate::schema::ItemId;

/// Destination entries that came from any of the given source snapshots.
///
/// Destination order is kept and every duplicate is matched on its
/// own, so `[a,b,c,a,d]` against `{a,c}` yields `[a,c,a]`.
pub fn items_to_remove(destination: &[ItemId], sources: &[&[ItemId]]) -> Vec<ItemId> {
    let sets: Vec<HashSet<&str>> = sources
        .iter()
        .map(|snapshot| snapshot.iter().map(ItemId::as_str).collect())
        .collect();

    destination
        .iter()
        .filter(|item| sets.iter().any(|set| set.contains(item.as_str())))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::memory::ids;

    #[test]
    fn keeps_order_and_duplicate_count() {
        let destination = ids(&["a", "b", "c", "a", "d"]);
        let source = ids(&["a", "c"]);

        let doomed = items_to_remove(&destination, &[&source]);

        assert_eq!(doomed, ids(&["a", "c", "a"]));
    }

    #[test]
    fn matches_against_any_source() {
        let destination = ids(&["p", "q", "r", "s"]);
        let first = ids(&["q"]);
        let second = ids(&["s", "zz"]);

        let doomed = items_to_remove(&destination, &[&first, &second]);

        assert_eq!(doomed, ids(&["q", "s"]));
    }

    #[test]
    fn no_sources_removes_nothing() {
        let destination = ids(&["p", "q"]);
        assert!(items_to_remove(&destination, &[]).is_empty());
    }

    #[test]
    fn empty_destination_removes_nothing() {
        let source = ids(&["a"]);
        assert!(items_to_remove(&[], &[&source]).is_empty());
    }
}
