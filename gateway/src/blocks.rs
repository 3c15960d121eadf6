use crate::{Block, Error};
use std::collections::{btree_map::Entry, BTreeMap};

/// Reduce the blocks accumulated across pages to the exact window `[min_height, ..]` with no
/// timestamp past `max_timestamp`, ordered by height.
///
/// A height delivered more than once is kept once. If the deliveries disagree on the timestamp,
/// the gateway is inconsistent and [Error::ConflictingBlock] is returned.
pub(crate) fn finalize(
    accumulated: Vec<Block>,
    min_height: u64,
    max_timestamp: u64,
) -> Result<Vec<Block>, Error> {
    let mut unique = BTreeMap::new();
    for block in accumulated {
        match unique.entry(block.height) {
            Entry::Vacant(entry) => {
                entry.insert(block);
            }
            Entry::Occupied(entry) => {
                if entry.get().timestamp != block.timestamp {
                    return Err(Error::ConflictingBlock {
                        height: block.height,
                    });
                }
            }
        }
    }
    Ok(unique
        .into_values()
        .filter(|block| block.height >= min_height && block.timestamp <= max_timestamp)
        .collect())
}
