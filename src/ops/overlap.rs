use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::BlockMap;
use crate::address::Span;

/// For each cut address, the `(id, bytes)` pieces every input map holds in
/// `[cut, next_cut)`, in input order.
pub type Overlaps<'a, K> = BTreeMap<u32, Vec<(K, &'a [u8])>>;

/// Partition several block maps at every block boundary and list, for each
/// resulting interval, which maps hold data there.
///
/// Pieces are views into the input maps. Intervals no map covers are omitted.
pub fn overlap_block_maps<'a, K, B>(maps: &[(K, &'a BlockMap<B>)]) -> Overlaps<'a, K>
where
    K: Clone,
    B: AsRef<[u8]> + 'a,
{
    let mut cuts: BTreeSet<u64> = BTreeSet::new();
    for (_, map) in maps {
        for (&addr, block) in *map {
            let span = Span::of_block(addr, block.as_ref().len());
            cuts.insert(span.start());
            cuts.insert(span.end());
        }
    }

    let cuts: Vec<u64> = cuts.into_iter().collect();
    let mut overlaps = Overlaps::new();

    for pair in cuts.windows(2) {
        let interval = Span::new(pair[0], pair[1]);
        // every cut but the last is a block start or an end below 2^32
        let cut = interval.start() as u32;

        let mut pieces = Vec::new();
        for (id, map) in maps {
            let Some((addr, block)) = map.floor(cut) else {
                continue;
            };
            let data = block.as_ref();
            let span = Span::of_block(addr, data.len());
            if let Some(covered) = span.intersection(&interval) {
                let start = (covered.start() - span.start()) as usize;
                let end = (covered.end() - span.start()) as usize;
                pieces.push((id.clone(), &data[start..end]));
            }
        }

        if !pieces.is_empty() {
            overlaps.insert(cut, pieces);
        }
    }

    debug!(
        "overlap: {} maps, {} cuts, {} intervals",
        maps.len(),
        cuts.len(),
        overlaps.len()
    );
    overlaps
}

/// Collapse each interval to the piece from the last map holding data there.
pub fn flatten_overlaps<'a, K>(overlaps: &Overlaps<'a, K>) -> BlockMap<&'a [u8]> {
    overlaps
        .iter()
        .filter_map(|(&addr, pieces)| pieces.last().map(|&(_, data)| (addr, data)))
        .collect()
}
